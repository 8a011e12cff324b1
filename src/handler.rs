use crossterm::event::{
    KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::app::{App, FocusPane};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.focus {
        FocusPane::Input => handle_input_key(app, key),
        FocusPane::Suggestions => handle_chip_key(app, key),
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.should_quit = true,

        // Submit: whitespace-only input is dropped inside submit_input
        KeyCode::Enter => {
            if let Some(text) = app.submit_input() {
                app.spawn_send(text);
            }
        }

        // Move into the chip row when there is one
        KeyCode::Tab => {
            if !app.suggestions.is_empty() {
                app.focus = FocusPane::Suggestions;
                if app.selected_chip.is_none() {
                    app.selected_chip = Some(0);
                }
            }
        }

        // Line editing
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if app.cursor < app.input.chars().count() {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            app.cursor = (app.cursor + 1).min(app.input.chars().count());
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }

        // Transcript scrolling while typing
        KeyCode::Up => app.scroll_transcript_up(),
        KeyCode::Down => app.scroll_transcript_down(),

        // Cart panel scrolling
        KeyCode::PageUp => app.cart_scroll = app.cart_scroll.saturating_sub(1),
        KeyCode::PageDown => app.cart_scroll = app.cart_scroll.saturating_add(1),

        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

fn handle_chip_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => app.focus = FocusPane::Input,

        KeyCode::Left | KeyCode::Char('h') => app.chip_prev(),
        KeyCode::Right | KeyCode::Char('l') => app.chip_next(),

        // Quick-add the selected chip's product
        KeyCode::Enter => {
            if let Some(suggestion) = app.selected_suggestion() {
                let sku = suggestion.sku.clone();
                app.spawn_add(sku);
            }
        }

        KeyCode::Up => app.scroll_transcript_up(),
        KeyCode::Down => app.scroll_transcript_down(),

        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    match mouse.kind {
        // A click on a chip quick-adds that chip's product
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(idx) = app.chip_at(x, y) {
                app.selected_chip = Some(idx);
                let sku = app.suggestions[idx].sku.clone();
                app.spawn_add(sku);
            }
        }
        MouseEventKind::ScrollDown => {
            app.scroll_transcript_down();
            app.scroll_transcript_down();
            app.scroll_transcript_down();
        }
        MouseEventKind::ScrollUp => {
            app.scroll_transcript_up();
            app.scroll_transcript_up();
            app.scroll_transcript_up();
        }
        _ => {}
    }
}
