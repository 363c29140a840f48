use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, InputMode};
use crate::openai::CompletionRequest;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

/// Hand the request to the completion service on a background task; the
/// main loop polls the handle and settles the exchange when it finishes.
pub fn dispatch(app: &mut App, request: CompletionRequest) {
    let client = app.client.clone();
    app.completion_task = Some(tokio::spawn(async move { client.complete(&request).await }));
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global quit, works in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Tab cycles focus: Transcript -> Input -> Settings -> Transcript
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Transcript => FocusPane::Input,
                FocusPane::Input => FocusPane::Settings,
                FocusPane::Settings => FocusPane::Transcript,
            };

            // Auto-enter editing mode when focusing input
            if app.focus == FocusPane::Input {
                app.input_mode = InputMode::Editing;
                app.input_cursor = app.input.chars().count();
            }
        }

        // Jump straight into the message box
        KeyCode::Char('i') => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
            app.input_cursor = app.input.chars().count();
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Transcript => app.scroll_down(),
            FocusPane::Settings => app.settings_next(),
            FocusPane::Input => {}
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Transcript => app.scroll_up(),
            FocusPane::Settings => app.settings_prev(),
            FocusPane::Input => {}
        },

        // Adjust the selected control
        KeyCode::Char('h') | KeyCode::Left => {
            if app.focus == FocusPane::Settings {
                app.adjust_current_param(-1);
            }
        }
        KeyCode::Char('l') | KeyCode::Right => {
            if app.focus == FocusPane::Settings {
                app.adjust_current_param(1);
            }
        }

        // Transcript jumps
        KeyCode::Char('g') => {
            if app.focus == FocusPane::Transcript {
                app.scroll_to_top();
            }
        }
        KeyCode::Char('G') => {
            if app.focus == FocusPane::Transcript {
                app.scroll_transcript_to_bottom();
            }
        }

        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if app.focus == FocusPane::Transcript {
                app.scroll_half_page_down();
            }
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if app.focus == FocusPane::Transcript {
                app.scroll_half_page_up();
            }
        }

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.focus = FocusPane::Settings;
        }
        KeyCode::Enter => {
            let text = std::mem::take(&mut app.input);
            app.input_cursor = 0;
            if let Some(request) = app.submit_user_text(text) {
                dispatch(app, request);
            }
            app.scroll_transcript_to_bottom();
        }
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_transcript = app
        .transcript_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_transcript {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            for _ in 0..3 {
                app.scroll_down();
            }
        }
        MouseEventKind::ScrollUp => {
            for _ in 0..3 {
                app.scroll_up();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_to_byte_index_handles_multibyte() {
        let s = "héllo";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 2), 3);
        assert_eq!(char_to_byte_index(s, 99), s.len());
    }

    #[test]
    fn test_point_in_rect() {
        let rect = Rect::new(2, 2, 4, 4);
        assert!(point_in_rect(2, 2, rect));
        assert!(point_in_rect(5, 5, rect));
        assert!(!point_in_rect(6, 2, rect));
        assert!(!point_in_rect(1, 3, rect));
    }
}
