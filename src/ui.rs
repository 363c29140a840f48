use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Gauge, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
    },
    Frame,
};

use crate::app::{App, FocusPane, InputMode};
use crate::conversation::Sender;
use crate::params::Param;

const SETTINGS_PANEL_WIDTH: u16 = 34;

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

    // Body: chat column on the left, settings panel on the right
    let [chat_area, settings_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(SETTINGS_PANEL_WIDTH),
    ])
    .areas(body_area);

    render_chat_column(app, frame, chat_area);
    render_settings(app, frame, settings_area);

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let key_hint = if app.has_api_key {
        String::new()
    } else {
        " [no API key - set OPENAI_API_KEY] ".to_string()
    };

    let title = Line::from(vec![
        Span::styled(" promptdeck ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("{} ", app.model),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(key_hint, Style::default().fg(Color::Red).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Black),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat_column(app: &mut App, frame: &mut Frame, area: Rect) {
    let banner_height = if app.last_error.is_some() { 1 } else { 0 };

    let [transcript_area, banner_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(banner_height),
        Constraint::Length(3),
    ])
    .areas(area);

    render_transcript(app, frame, transcript_area);
    if let Some(message) = &app.last_error {
        let banner = Paragraph::new(Line::from(Span::styled(
            format!(" {message}"),
            Style::default().fg(Color::Red).bold(),
        )));
        frame.render_widget(banner, banner_area);
    }
    render_input(app, frame, input_area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Transcript;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let queued = app.queued_submissions();
    let title = if queued > 0 {
        format!(" Conversation ({queued} queued) ")
    } else {
        " Conversation ".to_string()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Store viewport dimensions for scroll calculations (inner size)
    let inner = block.inner(area);
    app.transcript_height = inner.height;
    app.transcript_width = inner.width;
    app.transcript_area = Some(area);

    let transcript = if app.conversation.is_empty() && !app.is_loading() {
        app.total_transcript_lines = 0;
        Text::from(Span::styled(
            "Type your message here",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for turn in app.conversation.turns() {
            match turn.sender {
                Sender::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
                    )));
                    for line in turn.text.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                    lines.push(Line::default());
                }
                Sender::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "AI:",
                        Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
                    )));
                    for line in turn.text.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                    lines.push(Line::default());
                }
            }
        }

        if app.is_loading() {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{dots}"),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        app.total_transcript_lines = lines.len() as u16;
        Text::from(lines)
    };

    let paragraph = Paragraph::new(transcript)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.transcript_scroll, 0));

    frame.render_widget(paragraph, area);

    if app.total_transcript_lines > app.transcript_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));

        let mut scrollbar_state = ScrollbarState::new(app.total_transcript_lines as usize)
            .position(app.transcript_scroll as usize);

        frame.render_stateful_widget(
            scrollbar,
            area.inner(ratatui::layout::Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing || app.focus == FocusPane::Input {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message (Enter to send) ");

    // Horizontal scroll keeps the cursor visible in long messages
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_settings(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Settings;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Configuration ");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Each control gets a label line, a gauge line and a spacer
    let mut constraints: Vec<Constraint> = Vec::new();
    for _ in Param::all() {
        constraints.push(Constraint::Length(1));
        constraints.push(Constraint::Length(1));
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(0));
    let rows = Layout::vertical(constraints).split(inner);

    for (i, param) in Param::all().into_iter().enumerate() {
        let selected = focused && i == app.selected_param;
        let label_style = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };

        let label = Paragraph::new(Line::from(vec![
            Span::styled(param.label(), label_style),
            Span::raw(": "),
            Span::styled(
                app.params.display_value(param),
                Style::default().fg(Color::Cyan),
            ),
        ]));
        frame.render_widget(label, rows[i * 3]);

        let gauge_color = if selected { Color::Yellow } else { Color::Blue };
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(gauge_color).bg(Color::DarkGray))
            .ratio(app.params.ratio(param))
            .label("");
        frame.render_widget(gauge, rows[i * 3 + 1]);
    }

    // Footer note inside the panel
    let note_area = rows[rows.len() - 1];
    if note_area.height > 0 {
        let note = Paragraph::new("Completions are billed per token;\nkeep Max Tokens modest.")
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true });
        frame.render_widget(note, note_area);
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" settings ", label_style),
        ],
        InputMode::Normal => {
            let mut hints = vec![
                Span::styled(" Tab ", key_style),
                Span::styled(" focus ", label_style),
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
            ];
            match app.focus {
                FocusPane::Transcript => hints.extend(vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" scroll ", label_style),
                    Span::styled(" g/G ", key_style),
                    Span::styled(" top/bottom ", label_style),
                ]),
                FocusPane::Settings => hints.extend(vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" select ", label_style),
                    Span::styled(" h/l ", key_style),
                    Span::styled(" adjust ", label_style),
                ]),
                FocusPane::Input => {}
            }
            hints.extend(vec![
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
