//! User-facing session strings in both supported languages.

use atlas_rs_protocol::Language;

pub fn greeting(language: Language) -> &'static str {
    match language {
        Language::Primary => "Hello! How can I help you today?",
        Language::Secondary => "مرحبا! كيف أستطيع مساعدتك؟",
    }
}

pub fn found_results(language: Language, count: usize) -> String {
    match language {
        Language::Primary => format!("Found {count} result(s)."),
        Language::Secondary => format!("تم العثور على {count} نتيجة."),
    }
}

pub fn no_answer(language: Language) -> &'static str {
    match language {
        Language::Primary => "No answer returned.",
        Language::Secondary => "لم يتم إرجاع أي إجابة.",
    }
}

pub fn empty_question(language: Language) -> &'static str {
    match language {
        Language::Primary => "Please type a question.",
        Language::Secondary => "يرجى كتابة سؤال.",
    }
}

pub fn server_error(language: Language, reason: &str) -> String {
    match language {
        Language::Primary => format!("Error: {reason}"),
        Language::Secondary => format!("خطأ: {reason}"),
    }
}

pub fn network_error(language: Language) -> &'static str {
    match language {
        Language::Primary => "Network error. Check your connection and try again.",
        Language::Secondary => "خطأ في الشبكة. تحقق من الاتصال وحاول مرة أخرى.",
    }
}
