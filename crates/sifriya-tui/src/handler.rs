use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use sifriya_core::Screen;

use crate::app::{App, InputMode, View};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
        AppEvent::Task(result) => app.apply(result),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_search_editing(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    // Keys shared by every view
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('/') => {
            app.view = View::Search;
            app.input_mode = InputMode::Editing;
            return;
        }
        KeyCode::Char('o') => {
            app.view = if app.view == View::Outline { View::Browse } else { View::Outline };
            return;
        }
        KeyCode::Char('L') => {
            app.toggle_language();
            return;
        }
        KeyCode::Char('H') => {
            app.go_home();
            return;
        }
        KeyCode::Char('r') if !app.library_loading && app.nav.library().is_empty() => {
            app.load_library();
            return;
        }
        KeyCode::Char(c @ '1'..='5') => {
            app.open_recent(c as usize - '1' as usize);
            return;
        }
        KeyCode::F(n @ 1..=8) => {
            app.open_popular(usize::from(n) - 1);
            return;
        }
        _ => {}
    }

    match app.view {
        View::Browse if app.nav.screen() == Screen::Reading => handle_reading(app, key),
        View::Browse => handle_browse(app, key),
        View::Outline => handle_outline(app, key),
        View::Search => handle_search_results(app, key),
    }
}

fn handle_browse(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.list_down(),
        KeyCode::Char('k') | KeyCode::Up => app.list_up(),
        KeyCode::Char('g') => app.list_state.select(Some(0)),
        KeyCode::Char('G') => {
            let len = app.list_len();
            if len > 0 {
                app.list_state.select(Some(len - 1));
            }
        }
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.select_current(),
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace | KeyCode::Esc => app.go_back(),
        _ => {}
    }
}

fn handle_reading(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.verse_down(),
        KeyCode::Char('k') | KeyCode::Up => app.verse_up(),
        KeyCode::Char('g') => app.verse_cursor = 0,
        KeyCode::Char('G') => app.verse_cursor = app.verse_count().saturating_sub(1),
        KeyCode::Enter | KeyCode::Char(' ') => app.toggle_verse(),
        KeyCode::Char('n') => app.next_section(),
        KeyCode::Char('p') => app.prev_section(),
        KeyCode::Char(']') => app.jump_chapter(1),
        KeyCode::Char('[') => app.jump_chapter(-1),
        KeyCode::Char('m') => app.cycle_layout(),
        KeyCode::Char('v') => app.toggle_vowels(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.change_font(true),
        KeyCode::Char('-') => app.change_font(false),
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace | KeyCode::Esc => app.go_back(),
        _ => {}
    }
}

fn handle_outline(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.outline_down(),
        KeyCode::Char('k') | KeyCode::Up => app.outline_up(),
        KeyCode::Enter | KeyCode::Char(' ') => app.outline_activate(),
        KeyCode::Char('E') => app.outline_expand_all(),
        KeyCode::Char('C') => app.outline_collapse_all(),
        KeyCode::Esc => app.view = View::Browse,
        _ => {}
    }
}

fn handle_search_results(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.search_down(),
        KeyCode::Char('k') | KeyCode::Up => app.search_up(),
        KeyCode::Enter => app.open_search_hit(),
        KeyCode::Char('i') => app.input_mode = InputMode::Editing,
        KeyCode::Esc => app.view = View::Browse,
        _ => {}
    }
}

fn handle_search_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Down => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => {
            if app.search_input.pop().is_some() {
                app.search_input_changed();
            }
        }
        KeyCode::Char(c) => {
            app.search_input.push(c);
            app.search_input_changed();
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{offline_app, sample_library};
    use crate::app::TaskResult;
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn press(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    #[tokio::test]
    async fn test_view_switching() {
        let (mut app, _rx) = offline_app();
        handle_event(&mut app, press(KeyCode::Char('o')));
        assert_eq!(app.view, View::Outline);
        handle_event(&mut app, press(KeyCode::Char('o')));
        assert_eq!(app.view, View::Browse);

        handle_event(&mut app, press(KeyCode::Char('/')));
        assert_eq!(app.view, View::Search);
        assert_eq!(app.input_mode, InputMode::Editing);

        // While typing, shortcuts are just text
        handle_event(&mut app, press(KeyCode::Char('q')));
        assert!(!app.should_quit);
        assert_eq!(app.search_input, "q");
        assert!(app.search.is_pending());

        handle_event(&mut app, press(KeyCode::Backspace));
        assert_eq!(app.search_input, "");
        assert!(!app.search.is_pending());

        handle_event(&mut app, press(KeyCode::Esc));
        handle_event(&mut app, press(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_browse_keys_drive_navigation() {
        let (mut app, _rx) = offline_app();
        handle_event(&mut app, AppEvent::Task(TaskResult::Library(Ok(sample_library()))));

        handle_event(&mut app, press(KeyCode::Enter));
        handle_event(&mut app, press(KeyCode::Enter));
        assert_eq!(app.nav.breadcrumb(sifriya_core::Language::En), vec!["Tanakh", "Torah"]);

        handle_event(&mut app, press(KeyCode::Char('h')));
        handle_event(&mut app, press(KeyCode::Char('h')));
        assert!(app.nav.path().is_empty());

        handle_event(&mut app, press(KeyCode::Char('2')));
        assert_eq!(app.nav.screen(), Screen::Reading);
        assert_eq!(app.reader.requested(), Some("Psalms 23"));

        handle_event(&mut app, press(KeyCode::Esc));
        assert_eq!(app.nav.screen(), Screen::Library);

        handle_event(&mut app, press(KeyCode::F(6)));
        assert_eq!(app.reader.requested(), Some("Psalms 1:1"));
        handle_event(&mut app, press(KeyCode::F(9)));
        assert_eq!(app.reader.requested(), Some("Psalms 1:1"));
    }
}
