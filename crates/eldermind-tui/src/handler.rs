use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, InputMode};
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

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('p') => {
                app.open_persona_picker();
                return;
            }
            _ => {}
        }
    }

    if app.show_persona_picker {
        handle_persona_picker(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_persona_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_persona_picker = false;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.persona_picker_nav_down();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.persona_picker_nav_up();
        }
        KeyCode::Enter => {
            app.select_persona();
        }
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Char('a') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.input_cursor = app.input.chars().count();
        }

        KeyCode::Char('p') => app.open_persona_picker(),

        // Chat scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(app.chat_height / 2);
        }
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            // Input is read-only while a reply is pending
            app.submit_input();
        }
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        _ if app.conversation.is_loading() => {}
        _ => edit_input(&mut app.input, &mut app.input_cursor, key.code),
    }
}

/// Apply one editing key to a controlled input line. Cursor is in chars.
fn edit_input(input: &mut String, cursor: &mut usize, code: KeyCode) {
    match code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = input.chars().count();
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = input.chars().count();
            *cursor = (*cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            *cursor = 0;
        }
        KeyCode::End => {
            *cursor = input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(input, *cursor);
            input.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_keys(codes: &[KeyCode]) -> (String, usize) {
        let mut input = String::new();
        let mut cursor = 0;
        for &code in codes {
            edit_input(&mut input, &mut cursor, code);
        }
        (input, cursor)
    }

    #[test]
    fn typing_inserts_at_cursor() {
        let (input, cursor) = type_keys(&[
            KeyCode::Char('V'),
            KeyCode::Char('c'),
            KeyCode::Left,
            KeyCode::Char('i'),
            KeyCode::Char('v'),
            KeyCode::Char('e'),
        ]);
        assert_eq!(input, "Vivec");
        assert_eq!(cursor, 4);
    }

    #[test]
    fn editing_is_utf8_safe() {
        let (input, cursor) = type_keys(&[
            KeyCode::Char('Ö'),
            KeyCode::Char('r'),
            KeyCode::Char('n'),
            KeyCode::Home,
            KeyCode::Delete,
            KeyCode::Char('A'),
            KeyCode::End,
            KeyCode::Backspace,
        ]);
        assert_eq!(input, "Ar");
        assert_eq!(cursor, 2);
    }

    #[test]
    fn cursor_stays_within_bounds() {
        let (input, cursor) = type_keys(&[
            KeyCode::Left,
            KeyCode::Backspace,
            KeyCode::Char('x'),
            KeyCode::Right,
            KeyCode::Right,
        ]);
        assert_eq!(input, "x");
        assert_eq!(cursor, 1);
    }

    #[test]
    fn char_to_byte_index_handles_multibyte() {
        assert_eq!(char_to_byte_index("Ölvir", 1), 2);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }
}
