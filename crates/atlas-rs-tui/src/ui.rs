//! Rendering routines for the Atlas TUI.

use crate::app::{App, HealthState};
use atlas_rs_core::SlashCommand;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
    Wrap,
};

const PRIMARY: Color = Color::Rgb(236, 91, 43); // #EC5B2B
const SECONDARY: Color = Color::Rgb(238, 121, 72); // #EE7948
const TEXT: Color = Color::Rgb(238, 238, 238); // #eeeeee
const TEXT_MUTED: Color = Color::Rgb(128, 128, 128); // #808080
const BORDER: Color = Color::Rgb(60, 60, 60); // #3c3c3c
const BORDER_ACTIVE: Color = Color::Rgb(238, 121, 72); // #EE7948
const YELLOW: Color = Color::Rgb(229, 192, 123); // #e5c07b
const GREEN: Color = Color::Rgb(120, 220, 140);
const RED: Color = Color::Rgb(255, 110, 110);

const HEADER_HEIGHT: u16 = 4; // 2 inner lines + 2 border lines
const DETAIL_WIDTH: u16 = 40;
const HELP_WIDTH: u16 = 56;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const KEY_HELP: [(&str, &str); 13] = [
    ("Enter", "send"),
    ("Ctrl+D", "send through the debug endpoint"),
    ("Ctrl+R", "start or stop recording"),
    ("Ctrl+L", "clear the conversation"),
    ("Ctrl+Y", "copy the focused reply"),
    ("Ctrl+S", "read the focused reply aloud"),
    ("Alt+1..3", "ask a suggested question"),
    ("Tab/Shift+Tab", "focus next or previous match"),
    ("PgUp/PgDn", "scroll"),
    ("Home", "scroll to the top"),
    ("End", "jump to the latest message"),
    ("Esc", "close overlay or quit"),
    ("Ctrl+C", "quit"),
];

/// Draw the entire TUI frame.
pub fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let area = frame.area();
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT), // header bar
            Constraint::Min(0),                // chat + detail
            Constraint::Length(3),             // input
            Constraint::Length(1),             // suggestions
            Constraint::Length(1),             // status bar
        ])
        .split(area);

    draw_header(frame, app, root[0]);

    let body = if app.store.selected().is_some() && root[1].width > DETAIL_WIDTH * 2 {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(DETAIL_WIDTH)])
            .split(root[1]);
        draw_detail(frame, app, cols[1]);
        cols[0]
    } else {
        root[1]
    };
    draw_chat(frame, app, body);
    if app.input.is_command() {
        draw_slash_palette(frame, app, body);
    }

    draw_input(frame, app, root[2]);
    draw_suggestions(frame, app, root[3]);
    draw_status_bar(frame, app, root[4]);

    if app.show_help {
        draw_help(frame, area);
    }
}

/// Draw the header with service and session info.
fn draw_header(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let label_style = Style::default().fg(TEXT_MUTED);
    let value_style = Style::default().fg(TEXT);

    let title = Line::from(vec![
        Span::styled(
            " Atlas",
            Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  v{VERSION}"), label_style),
        Span::styled("  service ", label_style),
        Span::styled(app.base_url.clone(), value_style),
    ]);

    let (health_text, health_color) = match &app.health {
        HealthState::Checking => ("checking...".to_string(), YELLOW),
        HealthState::Reported(health) if health.is_ready() => {
            (format!("ready ({} docs)", health.docs_count), GREEN)
        }
        HealthState::Reported(health) if health.ok => ("index not built".to_string(), YELLOW),
        HealthState::Reported(_) => ("unhealthy".to_string(), RED),
        HealthState::Unreachable(_) => ("unreachable".to_string(), RED),
    };
    let language = app.language();
    let mut info = vec![
        Span::styled(" health ", label_style),
        Span::styled(health_text, Style::default().fg(health_color)),
        Span::styled("  language ", label_style),
        Span::styled(language.code(), value_style),
    ];
    if app.input.debug_enabled() {
        info.push(Span::styled(
            "  debug tools",
            Style::default().fg(YELLOW).add_modifier(Modifier::BOLD),
        ));
    }

    frame.render_widget(Paragraph::new(vec![title, Line::from(info)]), inner);
}

/// Draw the chat transcript with border, scrollbar and latest indicator.
fn draw_chat(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    let lines = app.render_lines();

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(" Chat ", Style::default().fg(TEXT_MUTED)));

    let missed = app.scroll.missed_count();
    if !app.scroll.pinned_to_bottom() && missed > 0 {
        block = block.title_bottom(
            Line::from(Span::styled(
                format!(" Latest ({missed}) End "),
                Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD),
            ))
            .right_aligned(),
        );
    }

    let inner = block.inner(area);
    let content_width = inner.width.saturating_sub(1); // -1 for scrollbar
    let content_height = inner.height as usize;

    let total_lines = Paragraph::new(lines.clone())
        .wrap(Wrap { trim: false })
        .line_count(content_width)
        .max(1);

    let max_scroll = total_lines.saturating_sub(content_height) as u16;
    app.scroll.update_bounds(max_scroll);
    let scroll = app.scroll.offset();

    let chat_inner = Rect {
        width: inner.width.saturating_sub(1),
        ..inner
    };

    let chat = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    frame.render_widget(block, area);
    frame.render_widget(chat, chat_inner);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::default()
            .content_length(total_lines)
            .position(scroll as usize)
            .viewport_content_length(content_height);
        let scrollbar_area = Rect {
            x: inner.x + inner.width.saturating_sub(1),
            y: inner.y,
            width: 1,
            height: inner.height,
        };
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .style(Style::default().fg(BORDER))
                .thumb_style(Style::default().fg(TEXT_MUTED)),
            scrollbar_area,
            &mut scrollbar_state,
        );
    }
}

/// Draw the focused match.
fn draw_detail(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(lines) = app.detail_lines() else {
        return;
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(" Match ", Style::default().fg(TEXT_MUTED)));
    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(block);
    frame.render_widget(panel, area);
}

/// Draw the input box with border and cursor.
fn draw_input(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let loading = app.store.loading();
    let recording = app.input.recording();
    let border_color = if loading { BORDER } else { BORDER_ACTIVE };
    let title = if recording {
        " Listening (Ctrl+R to stop) "
    } else if loading {
        " Waiting for answer "
    } else {
        " Input "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if recording { RED } else { border_color }))
        .title(Span::styled(
            title,
            Style::default().fg(if recording { RED } else { SECONDARY }),
        ));

    let inner = block.inner(area);

    let prompt_style = Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD);
    let buffer = app.input.buffer();
    let mut spans = vec![Span::styled(" ", prompt_style)];
    if buffer.is_empty() && app.input.interim().is_none() {
        spans.push(Span::styled(
            "Ask about a doctor, or / for commands...",
            Style::default().fg(TEXT_MUTED),
        ));
    } else {
        spans.push(Span::styled(buffer.to_string(), Style::default().fg(TEXT)));
    }
    if let Some(interim) = app.input.interim() {
        let separator = if buffer.is_empty() { "" } else { " " };
        spans.push(Span::styled(
            format!("{separator}{interim}"),
            Style::default()
                .fg(TEXT_MUTED)
                .add_modifier(Modifier::ITALIC),
        ));
    }

    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(Line::from(spans)), inner);

    if !loading && !recording {
        let cursor = buffer.chars().count() as u16;
        frame.set_cursor_position((inner.x + 1 + cursor, inner.y));
    }
}

fn draw_suggestions(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let mut spans = Vec::new();
    for (index, suggestion) in app.suggestions.iter().take(9).enumerate() {
        spans.push(Span::styled(
            format!(" Alt+{}", index + 1),
            Style::default().fg(TEXT_MUTED),
        ));
        spans.push(Span::styled(
            format!(" {suggestion} "),
            Style::default().fg(SECONDARY),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Draw the status bar at the bottom.
fn draw_status_bar(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let status_color = match app.status.as_str() {
        "waiting" | "recording" => PRIMARY,
        "copied" | "reading aloud" => GREEN,
        "idle" => TEXT_MUTED,
        _ => YELLOW,
    };

    let mut shortcuts = vec![
        Span::styled(" Ctrl+C", Style::default().fg(TEXT_MUTED)),
        Span::styled(" quit", Style::default().fg(BORDER)),
        Span::styled("  Ctrl+L", Style::default().fg(TEXT_MUTED)),
        Span::styled(" clear", Style::default().fg(BORDER)),
        Span::styled("  Ctrl+R", Style::default().fg(TEXT_MUTED)),
        Span::styled(" record", Style::default().fg(BORDER)),
    ];
    if app.input.debug_enabled() {
        shortcuts.push(Span::styled("  Ctrl+D", Style::default().fg(TEXT_MUTED)));
        shortcuts.push(Span::styled(" debug", Style::default().fg(BORDER)));
    }
    shortcuts.push(Span::styled("  /", Style::default().fg(TEXT_MUTED)));
    shortcuts.push(Span::styled(" commands", Style::default().fg(BORDER)));

    let right_text = format!(" {} ", app.status);
    let right_len = right_text.chars().count() as u16;
    let left_area = Rect {
        width: area.width.saturating_sub(right_len),
        ..area
    };
    let right_area = Rect {
        x: area.x + area.width.saturating_sub(right_len),
        width: right_len.min(area.width),
        ..area
    };

    frame.render_widget(Paragraph::new(Line::from(shortcuts)), left_area);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            right_text,
            Style::default().fg(status_color),
        ))),
        right_area,
    );
}

fn draw_slash_palette(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let cmd_style = Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(TEXT_MUTED);
    let hint_style = Style::default()
        .fg(TEXT_MUTED)
        .add_modifier(Modifier::ITALIC);

    let candidates = app.input.command_candidates();
    let mut lines = vec![Line::from(vec![])];
    if candidates.is_empty() {
        lines.push(Line::from(Span::styled("  No matching command", desc_style)));
    }
    for command in candidates {
        lines.push(palette_line(command, cmd_style, desc_style));
    }
    lines.push(Line::from(vec![]));
    lines.push(Line::from(Span::styled("  Esc to close", hint_style)));

    let height = (lines.len() as u16 + 2).min(area.height); // +2 for border
    let palette_area = Rect {
        x: area.x + 1,
        y: area.y + area.height.saturating_sub(height),
        width: area.width.saturating_sub(2).min(60),
        height,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(PRIMARY))
        .title(Span::styled(
            " Commands ",
            Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(Color::Rgb(20, 20, 20)));

    frame.render_widget(Clear, palette_area);
    frame.render_widget(Paragraph::new(lines).block(block), palette_area);
}

fn palette_line(command: SlashCommand, cmd_style: Style, desc_style: Style) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  /{:<14}", command.name()), cmd_style),
        Span::styled(command.description(), desc_style),
    ])
}

fn draw_help(frame: &mut Frame<'_>, area: Rect) {
    let key_style = Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(TEXT);
    let muted = Style::default().fg(TEXT_MUTED);

    let mut lines = vec![Line::from(Span::styled(" Keys", muted))];
    for (key, description) in KEY_HELP {
        lines.push(Line::from(vec![
            Span::styled(format!("  {key:<15}"), key_style),
            Span::styled(description, desc_style),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" Commands", muted)));
    for command in SlashCommand::ALL {
        lines.push(palette_line(command, key_style, desc_style));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Esc to close",
        muted.add_modifier(Modifier::ITALIC),
    )));

    let height = (lines.len() as u16 + 2).min(area.height);
    let width = HELP_WIDTH.min(area.width);
    let help_area = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(PRIMARY))
        .title(Span::styled(
            " Help ",
            Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(Color::Rgb(20, 20, 20)));

    frame.render_widget(Clear, help_area);
    frame.render_widget(Paragraph::new(lines).block(block), help_area);
}
