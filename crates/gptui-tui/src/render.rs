//! Pure view functions for the TUI.
//!
//! Functions here take `&AppState`, draw to a ratatui `Frame`, and never
//! mutate state or return effects.

use gptui_core::providers::ChatError;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout as RatatuiLayout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::layout::{HORIZONTAL_MARGIN, INPUT_HEIGHT, Layout};
use crate::state::{AppState, ChatMode};
use crate::statusline::status_line;
use crate::transcript::{LineKind, TranscriptLine};

/// Spinner frames shown in place of the editor while a turn runs.
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Ticks per spinner frame.
const SPINNER_SPEED_DIVISOR: usize = 2;

const SHORT_HELP: &str = "enter send · ctrl+l multi-line · ctrl+h help · esc cancel · ctrl+c quit";

const FULL_HELP: &[(&str, &str)] = &[
    ("enter", "send message"),
    ("alt+enter", "insert newline"),
    ("ctrl+l", "toggle multi-line input"),
    ("pgup / pgdn", "scroll transcript"),
    ("ctrl+home / ctrl+end", "jump to top / bottom"),
    ("esc", "cancel running request"),
    ("ctrl+h / F1", "toggle this help"),
    ("ctrl+c", "quit"),
];

/// Renders the entire TUI to the frame.
pub fn render(app: &AppState, frame: &mut Frame) {
    let area = frame.area();
    let Ok(layout) = Layout::compute(area.width, area.height) else {
        return;
    };

    let margin = HORIZONTAL_MARGIN / 2;
    let chunks = RatatuiLayout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),                        // Top margin
            Constraint::Length(layout.transcript_height), // Transcript
            Constraint::Length(1),                        // Gap
            Constraint::Length(1),                        // Error
            Constraint::Length(INPUT_HEIGHT + 2),         // Input (bordered)
            Constraint::Length(1),                        // Status
            Constraint::Length(1),                        // Help
            Constraint::Length(1),                        // Bottom margin
        ])
        .split(area);
    let inset = |rect: Rect| Rect {
        x: rect.x + margin,
        width: rect.width.saturating_sub(margin * 2),
        ..rect
    };

    let transcript_area = inset(chunks[1]);
    render_transcript(app, frame, transcript_area);
    render_error(app.last_error.as_ref(), frame, inset(chunks[3]));
    if app.mode.is_running() {
        render_spinner(app, frame, inset(chunks[4]));
    } else {
        render_input(app, frame, inset(chunks[4]));
    }
    render_status(app, frame, inset(chunks[5]));
    frame.render_widget(
        Paragraph::new(Span::styled(SHORT_HELP, Style::default().fg(Color::DarkGray))),
        inset(chunks[6]),
    );

    if app.show_help {
        render_help(frame, transcript_area);
    }
}

fn render_transcript(app: &AppState, frame: &mut Frame, area: Rect) {
    let lines = app.transcript_lines();
    let height = usize::from(area.height);
    let max_offset = lines.len().saturating_sub(height);
    let offset = if app.transcript.is_following() {
        max_offset
    } else {
        app.transcript.offset(height).min(max_offset)
    };

    let visible: Vec<Line<'static>> = lines
        .iter()
        .skip(offset)
        .take(height)
        .map(styled_line)
        .collect();

    // Content is already wrapped to the transcript width
    frame.render_widget(Paragraph::new(visible), area);
}

fn styled_line(line: &TranscriptLine) -> Line<'static> {
    let style = match line.kind {
        LineKind::Title => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        LineKind::Hint => Style::default().fg(Color::DarkGray),
        LineKind::UserLabel => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
        LineKind::AssistantLabel => Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
        LineKind::Body | LineKind::Blank => Style::default(),
    };
    Line::from(Span::styled(line.text.clone(), style))
}

fn render_error(error: Option<&ChatError>, frame: &mut Frame, area: Rect) {
    let Some(error) = error else {
        return;
    };
    let text = format!("Error: {error}");
    frame.render_widget(
        Paragraph::new(Span::styled(text, Style::default().fg(Color::Red))),
        area,
    );
}

fn render_input(app: &AppState, frame: &mut Frame, area: Rect) {
    let title = if app.input.multiline {
        " Message (multi-line) "
    } else {
        " Message "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(title);
    let inner = block.inner(area);

    let buffer = &app.input.buffer;
    let (row, col) = buffer.cursor();
    let lines = buffer.lines();
    let cursor_line = lines.get(row).copied().unwrap_or_default();
    let cursor_x = cursor_line
        .char_indices()
        .nth(col)
        .map_or(cursor_line, |(byte, _)| &cursor_line[..byte])
        .width();

    // Keep the cursor inside the inner area
    let scroll_y = row.saturating_sub(usize::from(inner.height.saturating_sub(1)));
    let scroll_x = cursor_x.saturating_sub(usize::from(inner.width.saturating_sub(1)));
    let scroll = (
        u16::try_from(scroll_y).unwrap_or(u16::MAX),
        u16::try_from(scroll_x).unwrap_or(u16::MAX),
    );

    let lines: Vec<Line<'_>> = lines.into_iter().map(Line::raw).collect();
    frame.render_widget(Paragraph::new(lines).block(block).scroll(scroll), area);

    if inner.width > 0 && inner.height > 0 {
        let x = u16::try_from(cursor_x - scroll_x).unwrap_or(u16::MAX);
        let y = u16::try_from(row - scroll_y).unwrap_or(u16::MAX);
        frame.set_cursor_position(Position::new(inner.x + x, inner.y + y));
    }
}

fn render_spinner(app: &AppState, frame: &mut Frame, area: Rect) {
    let index = (app.spinner_frame / SPINNER_SPEED_DIVISOR) % SPINNER_FRAMES.len();
    let (label, color) = match app.mode {
        ChatMode::Streaming { .. } => ("Streaming...", Color::Cyan),
        _ => ("Waiting for response...", Color::Yellow),
    };
    let line = Line::from(vec![
        Span::styled(SPINNER_FRAMES[index], Style::default().fg(color)),
        Span::raw(" "),
        Span::styled(label, Style::default().fg(color)),
        Span::raw("  "),
        Span::styled("esc", Style::default().fg(Color::DarkGray)),
        Span::raw(" to cancel"),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_status(app: &AppState, frame: &mut Frame, area: Rect) {
    let status = status_line(&app.settings, &app.history, app.last_usage.as_ref());
    let style = if status.over_budget {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    frame.render_widget(
        Paragraph::new(Span::styled(status.text, style)).alignment(Alignment::Left),
        area,
    );
}

fn render_help(frame: &mut Frame, area: Rect) {
    let key_width = FULL_HELP
        .iter()
        .map(|(key, _)| key.width())
        .max()
        .unwrap_or_default();
    let lines: Vec<Line<'static>> = FULL_HELP
        .iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(
                    format!("{key:<key_width$}  "),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(*action),
            ])
        })
        .collect();

    let content_width = lines.iter().map(Line::width).max().unwrap_or_default();
    let width = u16::try_from(content_width + 4)
        .unwrap_or(u16::MAX)
        .min(area.width);
    let height = u16::try_from(lines.len() + 2)
        .unwrap_or(u16::MAX)
        .min(area.height);
    let popup = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    );

    frame.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Keys ")
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

#[cfg(test)]
mod tests {
    use gptui_core::config::{ChatSettings, Config, Overrides};
    use gptui_core::providers::Message;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;

    fn app(history: Vec<Message>) -> AppState {
        let settings = ChatSettings::resolve_with_env(
            &Config::default(),
            Overrides {
                api_key: Some("sk-test".to_string()),
                ..Overrides::default()
            },
            |_| None,
        )
        .unwrap();
        let mut app = AppState::new(settings, history);
        app.layout = Layout::compute(80, 24).ok();
        app.refresh_transcript();
        app
    }

    fn draw(app: &AppState, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut screen = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                screen.push_str(buffer[(x, y)].symbol());
            }
            screen.push('\n');
        }
        screen
    }

    #[test]
    fn test_welcome_shown_for_empty_history() {
        let screen = draw(&app(Vec::new()), 80, 24);
        assert!(screen.contains("ChatGPT Terminal UI"));
        assert!(screen.contains("Model: gpt-3.5-turbo"));
        assert!(screen.contains("enter send"));
    }

    #[test]
    fn test_history_and_error_rendered() {
        let mut app = app(vec![Message::user("hello"), Message::assistant("Hi!")]);
        app.last_error = Some(ChatError::EmptyResponse);

        let screen = draw(&app, 80, 24);

        assert!(screen.contains("You"));
        assert!(screen.contains("Hi!"));
        assert!(screen.contains("Error: Response contained no choices"));
        assert!(!screen.contains("ChatGPT Terminal UI"));
    }

    #[test]
    fn test_latest_lines_visible_when_following() {
        let history: Vec<Message> = (0..30)
            .map(|i| Message::user(format!("message {i}")))
            .collect();
        let screen = draw(&app(history), 80, 24);
        assert!(screen.contains("message 29"));
        assert!(!screen.contains("message 0"));
    }

    #[test]
    fn test_help_popup() {
        let mut app = app(Vec::new());
        app.show_help = true;
        let screen = draw(&app, 80, 24);
        assert!(screen.contains("Keys"));
        assert!(screen.contains("toggle multi-line input"));
    }

    #[test]
    fn test_too_small_draws_nothing() {
        let screen = draw(&app(Vec::new()), 80, 10);
        assert!(screen.trim().is_empty());
    }
}
