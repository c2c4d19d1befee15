//! Match records returned by the answering service.

use crate::Language;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Backend identifier for a record, numeric or textual.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(value) => write!(f, "{value}"),
            RecordId::Text(value) => f.write_str(value),
        }
    }
}

/// A display string that is either plain or keyed by language code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayText {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl DisplayText {
    /// Resolve the text for a language, falling back to the other language and
    /// then to any available entry. Blank text never resolves.
    pub fn resolve(&self, language: Language) -> Option<&str> {
        match self {
            DisplayText::Plain(text) => (!text.trim().is_empty()).then_some(text.as_str()),
            DisplayText::Localized(map) => [language.code(), language.other().code()]
                .into_iter()
                .filter_map(|code| map.get(code))
                .chain(map.values())
                .map(String::as_str)
                .find(|text| !text.trim().is_empty()),
        }
    }
}

/// A candidate entity attached to an assistant reply.
///
/// Only the fields below are understood; everything else the backend sends
/// is kept in `extra` and passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    #[serde(
        default,
        deserialize_with = "lenient_display",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<DisplayText>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub specialty: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub availability: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub score: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MatchRecord {
    /// Build a record carrying only a plain name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(DisplayText::Plain(name.into())),
            ..Self::default()
        }
    }

    /// Name to show for the record in the given language.
    pub fn display_name(&self, language: Language) -> String {
        self.name
            .as_ref()
            .and_then(|name| name.resolve(language))
            .or_else(|| self.extra_str("full_name"))
            .unwrap_or("Unnamed")
            .to_string()
    }

    /// Short biography, preferring the one-sentence form.
    pub fn bio(&self) -> Option<&str> {
        self.extra_str("one_sentence_bio")
            .or_else(|| self.extra_str("bio"))
    }

    /// Phone number or other contact line, if the backend supplied one.
    pub fn contact(&self) -> Option<&str> {
        self.extra_str("phone")
            .or_else(|| self.extra_str("contact_if_available"))
    }

    /// Ranking score clamped into `[0, 1]` for display.
    pub fn score_fraction(&self) -> Option<f64> {
        self.score
            .filter(|score| score.is_finite())
            .map(|score| score.clamp(0.0, 1.0))
    }

    fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Integers stay numeric; other numbers and strings become text.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<RecordId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => Some(match number.as_i64() {
            Some(value) => RecordId::Number(value),
            None => RecordId::Text(number.to_string()),
        }),
        Some(Value::String(text)) => Some(RecordId::Text(text)),
        _ => None,
    })
}

fn lenient_display<'de, D>(deserializer: D) -> Result<Option<DisplayText>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(DisplayText::Plain(text)),
        Some(Value::Number(number)) => Some(DisplayText::Plain(number.to_string())),
        Some(Value::Object(map)) => {
            let entries: BTreeMap<String, String> = map
                .into_iter()
                .filter_map(|(code, text)| match text {
                    Value::String(text) => Some((code, text)),
                    _ => None,
                })
                .collect();
            (!entries.is_empty()).then_some(DisplayText::Localized(entries))
        }
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| value.as_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn plain_name_round_trips_without_extra_fields() {
        let record: MatchRecord = serde_json::from_value(json!({ "name": "A" })).expect("record");
        assert_eq!(record, MatchRecord::named("A"));
        assert_eq!(serde_json::to_value(&record).expect("ser"), json!({ "name": "A" }));
    }

    #[test]
    fn localized_name_resolves_with_fallback() {
        let record: MatchRecord = serde_json::from_value(json!({
            "id": 7,
            "name": { "en": "Dr. Sara", "ar": "" },
            "specialty": "Cardiology",
        }))
        .expect("record");
        assert_eq!(record.id, Some(RecordId::Number(7)));
        assert_eq!(record.display_name(Language::Primary), "Dr. Sara");
        assert_eq!(record.display_name(Language::Secondary), "Dr. Sara");
    }

    #[test]
    fn tolerates_oddly_typed_fields() {
        let record: MatchRecord = serde_json::from_value(json!({
            "name": "B",
            "specialty": ["not", "a", "string"],
            "availability": 5,
            "score": "high",
            "one_sentence_bio": "Treats hearts.",
            "phone": "555-0101",
        }))
        .expect("record");
        assert_eq!(record.specialty, None);
        assert_eq!(record.availability.as_deref(), Some("5"));
        assert_eq!(record.score, None);
        assert_eq!(record.bio(), Some("Treats hearts."));
        assert_eq!(record.contact(), Some("555-0101"));
    }

    #[test]
    fn oddly_typed_ids_and_names_are_kept() {
        let record: MatchRecord = serde_json::from_value(json!({ "name": 42, "id": 1.5 }))
            .expect("record");
        assert_eq!(record.id, Some(RecordId::Text("1.5".to_string())));
        assert_eq!(record.display_name(Language::Primary), "42");

        let record: MatchRecord =
            serde_json::from_value(json!({ "name": ["x"], "id": true })).expect("record");
        assert_eq!(record.id, None);
        assert_eq!(record.display_name(Language::Primary), "Unnamed");
    }

    #[test]
    fn blank_names_fall_back_to_full_name() {
        let record: MatchRecord =
            serde_json::from_value(json!({ "name": " ", "full_name": "Dr Z" })).expect("record");
        assert_eq!(record.display_name(Language::Primary), "Dr Z");

        let record: MatchRecord =
            serde_json::from_value(json!({ "name": { "en": "", "ar": "" } })).expect("record");
        assert_eq!(record.display_name(Language::Secondary), "Unnamed");
    }

    #[test]
    fn score_fraction_is_clamped() {
        let record = MatchRecord {
            score: Some(1.7),
            ..MatchRecord::default()
        };
        assert_eq!(record.score_fraction(), Some(1.0));
    }
}
