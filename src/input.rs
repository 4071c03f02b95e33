use crate::app::AppMode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    FocusPanel(u8),
    NextPanel,
    PrevPanel,
    Up,
    Down,
    Top,
    Bottom,
    PageUp,
    PageDown,
    HalfPageUp,
    HalfPageDown,
    StartSearch,
    Refresh,
    ToggleHelp,
    OpenContextPicker,
    OpenNamespacePicker,
    ToggleAllNamespaces,
    Select,
    Cancel,
    PanelKey(char),
    InputChar(char),
    Backspace,
    Delete,
    CursorLeft,
    CursorRight,
    CursorHome,
    CursorEnd,
    Submit,
    ConfirmYes,
    ConfirmNo,
    ChooseNo,
    ChooseYes,
    ToggleChoice,
    NextMatch,
    PrevMatch,
    SwitchContainer,
    PreviousLogs,
}

pub fn map_key(mode: AppMode, key: KeyEvent) -> Option<Action> {
    if is_ctrl(key, 'c') {
        return Some(Action::Quit);
    }

    match mode {
        AppMode::Normal => map_normal_mode_key(key),
        AppMode::SearchInput => map_search_key(key),
        AppMode::ConfirmModal => map_confirm_key(key),
        AppMode::InputModal => map_input_key(key),
        AppMode::YamlView | AppMode::HelpView => map_viewer_key(key),
        AppMode::DiffView => map_searchable_viewer_key(key),
        AppMode::LogView => match key.code {
            KeyCode::Char('c') if plain(key) => Some(Action::SwitchContainer),
            KeyCode::Char('p') if key.modifiers.is_empty() => Some(Action::PreviousLogs),
            _ => map_searchable_viewer_key(key),
        },
        AppMode::ContextPicker | AppMode::NamespacePicker => map_picker_key(key),
    }
}

fn is_ctrl(key: KeyEvent, c: char) -> bool {
    key.code == KeyCode::Char(c) && key.modifiers.contains(KeyModifiers::CONTROL)
}

fn plain(key: KeyEvent) -> bool {
    key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT
}

fn map_normal_mode_key(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('u') => Some(Action::HalfPageUp),
            KeyCode::Char('d') => Some(Action::HalfPageDown),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char(c @ '1'..='9') => Some(Action::FocusPanel(c as u8 - b'0')),
        KeyCode::Tab => Some(Action::NextPanel),
        KeyCode::BackTab => Some(Action::PrevPanel),
        KeyCode::Char('j') | KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::Up),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::Top),
        KeyCode::Char('G') | KeyCode::End => Some(Action::Bottom),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::Char('/') => Some(Action::StartSearch),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Char('c') => Some(Action::OpenContextPicker),
        KeyCode::Char('n') => Some(Action::OpenNamespacePicker),
        KeyCode::Char('a') => Some(Action::ToggleAllNamespaces),
        KeyCode::Enter => Some(Action::Select),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Char(c) if plain(key) => Some(Action::PanelKey(c)),
        _ => None,
    }
}

fn map_search_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c) if plain(key) => Some(Action::InputChar(c)),
        _ => None,
    }
}

fn map_confirm_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Left | KeyCode::Char('h') => Some(Action::ChooseNo),
        KeyCode::Right | KeyCode::Char('l') => Some(Action::ChooseYes),
        KeyCode::Tab | KeyCode::BackTab => Some(Action::ToggleChoice),
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Char('y') | KeyCode::Char('Y') => Some(Action::ConfirmYes),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(Action::ConfirmNo),
        _ => None,
    }
}

fn map_input_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Left => Some(Action::CursorLeft),
        KeyCode::Right => Some(Action::CursorRight),
        KeyCode::Home => Some(Action::CursorHome),
        KeyCode::End => Some(Action::CursorEnd),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Delete => Some(Action::Delete),
        KeyCode::Char(c) if plain(key) => Some(Action::InputChar(c)),
        _ => None,
    }
}

fn map_viewer_key(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('u') => Some(Action::HalfPageUp),
            KeyCode::Char('d') => Some(Action::HalfPageDown),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::Up),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::Top),
        KeyCode::Char('G') | KeyCode::End => Some(Action::Bottom),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::Esc | KeyCode::Char('q') => Some(Action::Cancel),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        _ => None,
    }
}

fn map_searchable_viewer_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('/') => Some(Action::StartSearch),
        KeyCode::Char('n') if key.modifiers.is_empty() => Some(Action::NextMatch),
        KeyCode::Char('N') if plain(key) => Some(Action::PrevMatch),
        _ => map_viewer_key(key),
    }
}

fn map_picker_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Up => Some(Action::Up),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Up),
        KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::Down)
        }
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c) if plain(key) => Some(Action::InputChar(c)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, map_key};
    use crate::app::AppMode;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn normal_mode_maps_quit() {
        assert_eq!(
            map_key(AppMode::Normal, key(KeyCode::Char('q'))),
            Some(Action::Quit)
        );
    }

    #[test]
    fn ctrl_c_quits_from_every_mode() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        for mode in [
            AppMode::Normal,
            AppMode::SearchInput,
            AppMode::ConfirmModal,
            AppMode::InputModal,
            AppMode::YamlView,
            AppMode::DiffView,
            AppMode::LogView,
            AppMode::HelpView,
            AppMode::ContextPicker,
            AppMode::NamespacePicker,
        ] {
            assert_eq!(map_key(mode, ctrl_c), Some(Action::Quit), "{mode:?}");
        }
    }

    #[test]
    fn digits_focus_panels() {
        assert_eq!(
            map_key(AppMode::Normal, key(KeyCode::Char('3'))),
            Some(Action::FocusPanel(3))
        );
        assert_eq!(
            map_key(AppMode::Normal, key(KeyCode::Char('0'))),
            Some(Action::PanelKey('0'))
        );
    }

    #[test]
    fn shifted_letters_reach_the_panel() {
        let shift_d = KeyEvent::new(KeyCode::Char('D'), KeyModifiers::SHIFT);
        assert_eq!(
            map_key(AppMode::Normal, shift_d),
            Some(Action::PanelKey('D'))
        );
        assert_eq!(
            map_key(AppMode::Normal, key(KeyCode::Char('l'))),
            Some(Action::PanelKey('l'))
        );
    }

    #[test]
    fn ctrl_shortcuts_in_normal_mode() {
        let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        assert_eq!(map_key(AppMode::Normal, ctrl('r')), Some(Action::Refresh));
        assert_eq!(
            map_key(AppMode::Normal, ctrl('d')),
            Some(Action::HalfPageDown)
        );
        assert_eq!(map_key(AppMode::Normal, ctrl('x')), None);
    }

    #[test]
    fn confirm_keys() {
        assert_eq!(
            map_key(AppMode::ConfirmModal, key(KeyCode::Char('y'))),
            Some(Action::ConfirmYes)
        );
        assert_eq!(
            map_key(AppMode::ConfirmModal, key(KeyCode::Esc)),
            Some(Action::ConfirmNo)
        );
        assert_eq!(
            map_key(AppMode::ConfirmModal, key(KeyCode::Char('h'))),
            Some(Action::ChooseNo)
        );
        assert_eq!(
            map_key(AppMode::ConfirmModal, key(KeyCode::Tab)),
            Some(Action::ToggleChoice)
        );
        assert_eq!(map_key(AppMode::ConfirmModal, key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn input_modes_take_characters() {
        assert_eq!(
            map_key(AppMode::InputModal, key(KeyCode::Char('q'))),
            Some(Action::InputChar('q'))
        );
        assert_eq!(
            map_key(AppMode::SearchInput, key(KeyCode::Char('n'))),
            Some(Action::InputChar('n'))
        );
        assert_eq!(
            map_key(AppMode::NamespacePicker, key(KeyCode::Char('k'))),
            Some(Action::InputChar('k'))
        );
    }

    #[test]
    fn log_view_keys() {
        assert_eq!(
            map_key(AppMode::LogView, key(KeyCode::Char('G'))),
            Some(Action::Bottom)
        );
        assert_eq!(
            map_key(AppMode::LogView, key(KeyCode::Char('n'))),
            Some(Action::NextMatch)
        );
        let shift_n = KeyEvent::new(KeyCode::Char('N'), KeyModifiers::SHIFT);
        assert_eq!(map_key(AppMode::LogView, shift_n), Some(Action::PrevMatch));
        assert_eq!(
            map_key(AppMode::LogView, key(KeyCode::Char('c'))),
            Some(Action::SwitchContainer)
        );
        assert_eq!(
            map_key(AppMode::LogView, key(KeyCode::Char('p'))),
            Some(Action::PreviousLogs)
        );
        assert_eq!(map_key(AppMode::YamlView, key(KeyCode::Char('c'))), None);
        assert_eq!(
            map_key(AppMode::DiffView, key(KeyCode::Char('/'))),
            Some(Action::StartSearch)
        );
    }
}
