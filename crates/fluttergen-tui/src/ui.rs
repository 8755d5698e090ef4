use std::time::Instant;

use chrono::{Local, TimeZone};
use fluttergen_core::{ChatMessage, ChatRole, Provider, SUGGESTIONS};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, InputMode};

/// Input box height (lines), borders included
const INPUT_HEIGHT: u16 = 5;
const SIDEBAR_WIDTH: u16 = 34;
const FLUTTER_BLUE: Color = Color::Rgb(2, 125, 253);
const PLACEHOLDER: &str =
    "Describe your Flutter UI (e.g., 'A modern login screen with glassmorphism effect')...";

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            // Consume the second *
            chars.next();

            // Push any accumulated plain text
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Local HH:MM for an epoch-millis timestamp
fn format_time(timestamp: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp)
        .single()
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default()
}

/// Rebuild spans from a run of styled chars, merging neighbours that share a style
fn cells_to_line(cells: &[(char, Style)]) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut text = String::new();
    let mut current: Option<Style> = None;

    for &(c, style) in cells {
        match current {
            Some(prev) if prev != style => {
                spans.push(Span::styled(std::mem::take(&mut text), prev));
            }
            _ => {}
        }
        current = Some(style);
        text.push(c);
    }

    if let Some(style) = current {
        spans.push(Span::styled(text, style));
    }
    Line::from(spans)
}

/// Wrap a styled line into rows of at most `width` chars.
/// Breaks after the last space in a row, or mid-word when there is none.
/// The rows are rendered without further wrapping, so their count is the
/// exact scroll height.
fn wrap_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    let cells: Vec<(char, Style)> = line
        .spans
        .iter()
        .flat_map(|span| {
            let style = span.style;
            span.content.chars().map(move |c| (c, style))
        })
        .collect();

    if width == 0 || cells.len() <= width {
        return vec![line];
    }

    let mut rows = Vec::new();
    let mut rest: &[(char, Style)] = &cells;
    while rest.len() > width {
        let split = rest[..width]
            .iter()
            .rposition(|(c, _)| *c == ' ')
            .filter(|&i| i > 0)
            .map(|i| i + 1)
            .unwrap_or(width);

        rows.push(&rest[..split]);
        rest = &rest[split..];
    }
    if !rest.is_empty() {
        rows.push(rest);
    }

    rows.into_iter()
        .map(|cells| {
            let mut row = cells_to_line(cells);
            row.style = line.style;
            row.alignment = line.alignment;
            row
        })
        .collect()
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let main_area = if app.show_sidebar {
        let [sidebar_area, main_area] = Layout::horizontal([
            Constraint::Length(SIDEBAR_WIDTH.min(body_area.width / 2)),
            Constraint::Min(0),
        ])
        .areas(body_area);
        render_sidebar(frame, sidebar_area);
        main_area
    } else {
        body_area
    };

    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(INPUT_HEIGHT),
    ])
    .areas(main_area);

    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    // Render popups (in order of priority)
    if app.show_api_key_input {
        render_api_key_input(app, frame, area);
    } else if app.show_provider_picker {
        render_provider_picker(app, frame, area);
    } else if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let provider_name = match app.current_provider {
        Provider::Gemini => "Gemini",
        Provider::Claude => "Claude",
        Provider::OpenAI => "OpenAI",
        Provider::Ollama => "Ollama",
    };

    let title = Line::from(vec![
        Span::styled(" FlutterGen ", Style::default().fg(Color::White).bg(FLUTTER_BLUE).bold()),
        Span::styled(" Flutter Architect AI ", Style::default().fg(Color::White).bold()),
        Span::styled(
            format!("Powered by {}: {} ", provider_name, app.selected_model()),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(" Online ", Style::default().fg(Color::Green)),
        Span::styled(
            format!(" v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_sidebar(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" FlutterGen ");

    let heading = Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD);
    let lines = vec![
        Line::from(Span::styled("FEATURES", heading)),
        Line::from(vec![Span::styled("</> ", Style::default().fg(Color::Cyan)), Span::raw("Dart Generation")]),
        Line::from(vec![Span::styled("[#] ", Style::default().fg(Color::Magenta)), Span::raw("Material 3 Design")]),
        Line::from(vec![Span::styled(" ⚡ ", Style::default().fg(Color::Yellow)), Span::raw("Mock Data")]),
        Line::default(),
        Line::from(Span::styled("Pro Tip", Style::default().fg(Color::LightBlue).bold())),
        Line::from(Span::styled(
            "Be specific about colors and layout structure (e.g., \"Use a Stack for the hero image and a floating action button\").",
            Style::default().fg(Color::Blue),
        )),
    ];

    let sidebar = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(sidebar, area);
}

fn render_empty_state(frame: &mut Frame, area: Rect) {
    let mut lines = vec![
        Line::default(),
        Line::from(Span::styled(
            "What shall we build today?",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "I can generate complete, production-ready Flutter code using Material 3.",
            Style::default().fg(Color::Gray),
        )),
        Line::from(Span::styled(
            "Describe your UI, and I'll write the code for you.",
            Style::default().fg(Color::Gray),
        )),
        Line::default(),
    ];

    for (i, suggestion) in SUGGESTIONS.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!(" {} ", i + 1), Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(format!(" {}", suggestion)),
        ]));
    }

    let empty = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(empty, area);
}

/// Lines for one code block, framed, with its language label and copy state
fn code_block_lines(
    code: &str,
    language: &str,
    selected: bool,
    copied: bool,
    width: u16,
) -> Vec<Line<'static>> {
    let border = Style::default().fg(if selected { Color::Cyan } else { Color::DarkGray });
    let copy_label = if copied {
        Span::styled(" ✓ Copied! ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else if selected {
        Span::styled(" c Copy ", Style::default().fg(Color::White))
    } else {
        Span::styled(" Copy ", Style::default().fg(Color::Gray))
    };

    let label = format!(" >_ {} ", language);
    let used = 1 + label.chars().count() + copy_label.width() + 1;
    let fill = (width as usize).saturating_sub(used);

    let mut lines = vec![Line::from(vec![
        Span::styled("┌", border),
        Span::styled(label, Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
        Span::styled("─".repeat(fill), border),
        copy_label,
        Span::styled("┐", border),
    ])];

    for line in code.lines() {
        lines.push(Line::from(vec![
            Span::styled("│ ", border),
            Span::styled(line.replace('\t', "    "), Style::default().fg(Color::Gray)),
        ]));
    }

    lines.push(Line::from(Span::styled(
        format!("└{}┘", "─".repeat((width as usize).saturating_sub(2))),
        border,
    )));
    lines
}

fn message_lines(app: &App, msg: &ChatMessage, index: usize, width: u16, now: Instant) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let time = format_time(msg.timestamp);

    match msg.role {
        ChatRole::User => {
            lines.push(
                Line::from(vec![
                    Span::styled("You", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                    Span::styled(format!(" · {}", time), Style::default().fg(Color::DarkGray)),
                ])
                .alignment(Alignment::Right),
            );
            for line in msg.content.lines() {
                lines.push(
                    Line::from(Span::styled(line.to_string(), Style::default().fg(Color::White).bg(FLUTTER_BLUE)))
                        .alignment(Alignment::Right),
                );
            }
        }
        ChatRole::Assistant => {
            lines.push(Line::from(vec![
                Span::styled(
                    "Flutter Architect",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!(" · {}", time), Style::default().fg(Color::DarkGray)),
            ]));
            for line in msg.content.lines() {
                lines.push(parse_markdown_line(line));
            }
            if let Some(code) = msg.code() {
                let selected = app.selected_code == Some(index);
                let copied = app.is_copied(&msg.id, now);
                lines.extend(code_block_lines(code, &app.language, selected, copied, width));
            }
        }
    }

    lines.push(Line::default());
    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing
    app.chat_area = Some(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.input_mode == InputMode::Normal {
            Color::Cyan
        } else {
            Color::DarkGray
        }));
    let inner = block.inner(area);

    // Store chat dimensions for scroll calculations (inner size minus borders)
    app.chat_height = inner.height;
    app.chat_width = inner.width;

    if app.messages().is_empty() && !app.is_loading() {
        frame.render_widget(block, area);
        render_empty_state(frame, inner);
        app.total_chat_lines = 0;
        app.chat_scroll = 0;
        return;
    }

    let now = Instant::now();
    let mut lines: Vec<Line> = Vec::new();
    for (i, msg) in app.messages().iter().enumerate() {
        lines.extend(message_lines(app, msg, i, inner.width, now));
    }

    if app.is_loading() {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(vec![
            Span::styled(" ● ", Style::default().fg(Color::LightBlue)),
            Span::styled(
                format!("Generating Flutter code{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ),
        ]));
    }

    let rows: Vec<Line> = lines
        .into_iter()
        .flat_map(|line| wrap_line(line, inner.width as usize))
        .collect();
    app.total_chat_lines = rows.len();

    let max_scroll = rows.len().saturating_sub(inner.height as usize);
    if app.follow_tail {
        app.chat_scroll = max_scroll;
    } else {
        app.chat_scroll = app.chat_scroll.min(max_scroll);
    }

    // Only the visible window is handed to ratatui
    let visible: Vec<Line> = rows
        .into_iter()
        .skip(app.chat_scroll)
        .take(inner.height as usize)
        .collect();

    let chat = Paragraph::new(Text::from(visible)).block(block);

    frame.render_widget(chat, area);
}

/// Cursor row and column (in chars) within a possibly multi-line input
fn cursor_row_col(input: &str, cursor: usize) -> (usize, usize) {
    let before: String = input.chars().take(cursor).collect();
    let row = before.matches('\n').count();
    let col = before.rsplit('\n').next().map(|l| l.chars().count()).unwrap_or(0);
    (row, col)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let loading = app.is_loading();

    let border_color = if loading {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::Gray
    };

    let title = if loading { " Generating... " } else { " Describe your UI " };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title)
        .title_bottom(Line::from(Span::styled(
            " Try: \"Dashboard for a smart home app using GridView\" ",
            Style::default().fg(Color::DarkGray),
        )));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.input.is_empty() {
        let placeholder = Paragraph::new(PLACEHOLDER)
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true });
        frame.render_widget(placeholder, inner);
        if editing && !loading {
            frame.set_cursor_position((inner.x, inner.y));
        }
        return;
    }

    // Keep the cursor visible by scrolling both ways
    let width = inner.width as usize;
    let height = inner.height as usize;
    let (row, col) = cursor_row_col(&app.input, app.input_cursor);
    let row_offset = if height == 0 { 0 } else { (row + 1).saturating_sub(height) };
    let col_offset = if width == 0 { 0 } else { (col + 1).saturating_sub(width) };

    let style = Style::default().fg(if loading { Color::DarkGray } else { Color::Cyan });
    let visible: Vec<Line> = app
        .input
        .split('\n')
        .skip(row_offset)
        .take(height)
        .map(|line| {
            let text: String = line.chars().skip(col_offset).take(width).collect();
            Line::from(Span::styled(text, style))
        })
        .collect();

    frame.render_widget(Paragraph::new(visible), inner);

    // Show cursor when editing
    if editing && !loading {
        frame.set_cursor_position((
            inner.x + (col - col_offset) as u16,
            inner.y + (row - row_offset) as u16,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.input_mode {
        InputMode::Normal => " CHAT ",
        InputMode::Editing => " INPUT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(if app.is_loading() { " waiting " } else { " send " }, label_style),
            Span::styled(" Shift+Enter ", key_style),
            Span::styled(" newline ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        InputMode::Normal => {
            let mut hints = vec![
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
            ];
            if app.messages().is_empty() {
                hints.extend(vec![
                    Span::styled(" 1-4 ", key_style),
                    Span::styled(" suggestion ", label_style),
                ]);
            } else {
                hints.extend(vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" scroll ", label_style),
                    Span::styled(" [/] ", key_style),
                    Span::styled(" code ", label_style),
                    Span::styled(" c ", key_style),
                    Span::styled(" copy ", label_style),
                ]);
            }
            hints.extend(vec![
                Span::styled(" P ", key_style),
                Span::styled(" provider ", label_style),
                Span::styled(" M ", key_style),
                Span::styled(" model ", label_style),
                Span::styled(" ? ", key_style),
                Span::styled(" tips ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            hints
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

/// Centered popup rectangle, clamped to the screen
fn popup_rect(area: Rect, width: u16, height: u16) -> Rect {
    let popup_width = width.min(area.width.saturating_sub(4));
    let popup_height = height.min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    Rect::new(popup_x, popup_y, popup_width, popup_height)
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup_area = popup_rect(area, 44, app.available_models.len() as u16 + 2);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model (Enter to select, Esc to cancel) ");

    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|model| {
            let style = if model == app.selected_model() {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}

fn render_provider_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let providers = Provider::all();
    let popup_area = popup_rect(area, 45, providers.len() as u16 + 2);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Provider ");

    let items: Vec<ListItem> = providers
        .iter()
        .map(|provider| {
            let key_source = app.config.key_source(*provider);
            let is_current = *provider == app.current_provider;

            let status = match key_source {
                Some("env") => "(env var)",
                Some("config") => "(configured)",
                Some("local") => "(local)",
                _ => "(needs key)",
            };
            let prefix = if is_current { "* " } else { "  " };

            let style = if is_current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if key_source.is_some() {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(format!("{}{} {}", prefix, provider.display_name(), status)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.provider_picker_state);
}

/// Mask a key with asterisks, showing only its last four characters
fn mask_key(key: &str) -> String {
    let len = key.chars().count();
    if len <= 4 {
        "*".repeat(len)
    } else {
        let masked_len = len - 4;
        let last_four: String = key.chars().skip(masked_len).collect();
        format!("{}...{}", "*".repeat(masked_len.min(20)), last_four)
    }
}

/// Column in the `mask_key` output that corresponds to a cursor in the raw key
fn masked_cursor(key: &str, cursor: usize) -> usize {
    let len = key.chars().count();
    let cursor = cursor.min(len);
    if len <= 4 {
        return cursor;
    }

    let hidden = len - 4;
    let stars = hidden.min(20);
    if cursor < hidden {
        cursor.min(stars)
    } else {
        stars + 3 + (cursor - hidden)
    }
}

fn render_api_key_input(app: &App, frame: &mut Frame, area: Rect) {
    let provider_name = app.api_key_target_provider
        .map(|p| p.display_name())
        .unwrap_or("Provider");

    let popup_area = popup_rect(area, 60, 7);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(" Enter API Key for {} ", provider_name));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Paste your API key below. Press Enter to save, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let input = Paragraph::new(mask_key(&app.api_key_input))
        .style(Style::default().fg(Color::Cyan));
    frame.render_widget(input, input_area);

    let cursor_x = masked_cursor(&app.api_key_input, app.api_key_input_cursor)
        .min(input_area.width as usize) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    let status = Paragraph::new(format!("{} characters", app.api_key_input.chars().count()))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(status, Rect::new(inner.x, inner.y + 4, inner.width, 1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluttergen_core::{Config, GeneratedResult};
    use pretty_assertions::assert_eq;
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    fn test_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut config = Config::new();
        config.ollama_url = Some("http://127.0.0.1:9".to_string());
        App::new(config, Provider::Ollama, "test-model".to_string(), tx)
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        let mut text = String::new();
        for row in buffer.content.chunks(width) {
            for cell in row {
                text.push_str(cell.symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn bold_markdown_becomes_styled_span() {
        let line = parse_markdown_line("Uses a **Stack** here");

        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "Stack");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn unclosed_bold_stays_literal() {
        let line = parse_markdown_line("a **b");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "a **b");
    }

    #[test]
    fn masks_all_but_last_four() {
        assert_eq!(mask_key("abc"), "***");
        assert_eq!(mask_key("abcdefgh"), "****...efgh");
    }

    #[test]
    fn cursor_position_in_multiline_input() {
        assert_eq!(cursor_row_col("ab\ncde", 4), (1, 1));
        assert_eq!(cursor_row_col("ab\ncde", 2), (0, 2));
        assert_eq!(cursor_row_col("", 0), (0, 0));
    }

    fn row_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn wrap_breaks_after_last_space() {
        let rows = wrap_line(Line::from("abc def ghi"), 8);

        let texts: Vec<String> = rows.iter().map(row_text).collect();
        assert_eq!(texts, vec!["abc def ", "ghi"]);
    }

    #[test]
    fn wrap_splits_long_words_and_keeps_short_lines() {
        let texts: Vec<String> = wrap_line(Line::from("abcdefg"), 3).iter().map(row_text).collect();
        assert_eq!(texts, vec!["abc", "def", "g"]);

        assert_eq!(wrap_line(Line::from("abc"), 3).len(), 1);
        assert_eq!(wrap_line(Line::default(), 3).len(), 1);
    }

    #[test]
    fn wrap_keeps_styles_and_alignment() {
        let line = Line::from(vec![
            Span::raw("plain "),
            Span::styled("bold", Style::default().add_modifier(Modifier::BOLD)),
        ])
        .alignment(Alignment::Right);

        let rows = wrap_line(line, 7);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].alignment, Some(Alignment::Right));
        assert_eq!(row_text(&rows[1]), "bold");
        assert!(rows[1].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn key_cursor_follows_masked_text() {
        let key = "abcdefghijkl";
        let masked = mask_key(key);

        assert_eq!(masked_cursor(key, 12), masked.chars().count());
        assert_eq!(masked_cursor(key, 0), 0);
        assert_eq!(masked_cursor(key, 3), 3);
        // Start of the visible last four, just past the "..."
        assert_eq!(masked_cursor(key, 8), 8 + 3);
        assert_eq!(masked_cursor("abc", 2), 2);

        let long_key = "x".repeat(40);
        assert_eq!(masked_cursor(&long_key, 40), mask_key(&long_key).chars().count());
        assert_eq!(masked_cursor(&long_key, 30), 20);
    }

    #[test]
    fn code_block_has_label_and_every_line() {
        let lines = code_block_lines("a\nb", "dart", false, false, 30);

        assert_eq!(lines.len(), 4);
        let header: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(header.contains("dart"));
        assert!(header.contains("Copy"));
    }

    #[tokio::test]
    async fn empty_state_lists_suggestions() {
        let mut app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        terminal.draw(|f| render(&mut app, f)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("What shall we build today?"));
        for suggestion in SUGGESTIONS {
            assert!(text.contains(suggestion));
        }
    }

    #[tokio::test]
    async fn renders_reply_with_code_block_and_loading_state() {
        let mut app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();

        app.submit("Login screen");
        terminal.draw(|f| render(&mut app, f)).unwrap();
        assert!(screen_text(&terminal).contains("Generating Flutter code"));

        app.on_generated(Ok(GeneratedResult {
            explanation: "Here is a login screen.".to_string(),
            code: "class Login {}".to_string(),
        }));
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Here is a login screen."));
        assert!(text.contains("class Login {}"));
        assert!(text.contains("dart"));
        assert!(!text.contains("Generating Flutter code"));
    }

    #[tokio::test]
    async fn follow_tail_shows_code_below_wrapped_prose() {
        let mut app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(40, 20)).unwrap();

        app.submit("Login screen");
        app.on_generated(Ok(GeneratedResult {
            explanation: "abcdefghijklmnopqrst ".repeat(16),
            code: "class Login {}".to_string(),
        }));
        terminal.draw(|f| render(&mut app, f)).unwrap();

        assert!(app.follow_tail);
        assert_eq!(
            app.chat_scroll,
            app.total_chat_lines - app.chat_height as usize
        );
        assert!(screen_text(&terminal).contains("class Login {}"));
    }

    #[tokio::test]
    async fn very_long_session_still_reaches_the_bottom() {
        let mut app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();

        let mut code = "Text('row'),\n".repeat(70_000);
        code.push_str("class LastWidget {}");
        app.submit("Huge list");
        app.on_generated(Ok(GeneratedResult {
            explanation: "A very long file.".to_string(),
            code,
        }));
        terminal.draw(|f| render(&mut app, f)).unwrap();

        assert!(app.total_chat_lines > u16::MAX as usize);
        assert!(screen_text(&terminal).contains("class LastWidget {}"));

        app.scroll_to_top();
        terminal.draw(|f| render(&mut app, f)).unwrap();
        assert!(screen_text(&terminal).contains("A very long file."));
    }
}
