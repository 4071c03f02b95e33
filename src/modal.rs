use crate::app::AppCommand;
use crate::diff::DiffViewer;
use crate::logs::LogViewer;
use crate::panel::ResourceTarget;
use crate::yaml::YamlViewer;
use std::time::{Duration, Instant};

/// The single non-toast overlay.
#[derive(Debug)]
pub enum Modal {
    Confirm(ConfirmModal),
    Input(InputModal),
    Yaml(YamlViewer),
    Diff(DiffViewer),
    Log(Box<LogViewer>),
    Help,
    ContextPicker(Picker),
    NamespacePicker(Picker),
}

/// `[No] [Yes]` prompt guarding a command.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmModal {
    prompt: String,
    command: AppCommand,
    yes: bool,
}

impl ConfirmModal {
    pub fn new(prompt: impl Into<String>, command: AppCommand) -> Self {
        Self {
            prompt: prompt.into(),
            command,
            yes: false,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn yes_selected(&self) -> bool {
        self.yes
    }

    pub fn select_no(&mut self) {
        self.yes = false;
    }

    pub fn select_yes(&mut self) {
        self.yes = true;
    }

    pub fn toggle(&mut self) {
        self.yes = !self.yes;
    }

    /// Consumes the modal, yielding the guarded command only when Yes was chosen.
    pub fn resolve(self, confirmed: bool) -> Option<AppCommand> {
        confirmed.then_some(self.command)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPurpose {
    Scale(ResourceTarget),
    HpaMin(ResourceTarget),
    HpaMax(ResourceTarget),
    PortForward { namespace: String, pod: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputValue {
    Count(i32),
    Ports { local: u16, remote: u16 },
}

/// Single-line text input with a validating submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputModal {
    title: String,
    value: String,
    cursor: usize,
    error: Option<String>,
    purpose: InputPurpose,
}

impl InputModal {
    pub fn new(title: impl Into<String>, value: impl Into<String>, purpose: InputPurpose) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self {
            title: title.into(),
            value,
            cursor,
            error: None,
            purpose,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn purpose(&self) -> &InputPurpose {
        &self.purpose
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.value
            .char_indices()
            .nth(chars)
            .map_or(self.value.len(), |(index, _)| index)
    }

    pub fn insert(&mut self, c: char) {
        let index = self.byte_index(self.cursor);
        self.value.insert(index, c);
        self.cursor += 1;
        self.error = None;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let index = self.byte_index(self.cursor - 1);
        self.value.remove(index);
        self.cursor -= 1;
        self.error = None;
    }

    pub fn delete(&mut self) {
        if self.cursor >= self.value.chars().count() {
            return;
        }
        let index = self.byte_index(self.cursor);
        self.value.remove(index);
        self.error = None;
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// Parses the value for its purpose; on failure the error is kept for display.
    pub fn validate(&mut self) -> Result<InputValue, String> {
        let result = parse_input(&self.purpose, self.value.trim());
        if let Err(error) = &result {
            self.error = Some(error.clone());
        }
        result
    }
}

fn parse_input(purpose: &InputPurpose, value: &str) -> Result<InputValue, String> {
    match purpose {
        InputPurpose::Scale(_) => match value.parse::<i32>() {
            Ok(replicas) if replicas >= 0 => Ok(InputValue::Count(replicas)),
            _ => Err(format!("'{value}' is not a valid replica count")),
        },
        InputPurpose::HpaMin(_) | InputPurpose::HpaMax(_) => match value.parse::<i32>() {
            Ok(replicas) if replicas >= 1 => Ok(InputValue::Count(replicas)),
            _ => Err(format!("'{value}' must be a whole number of at least 1")),
        },
        InputPurpose::PortForward { .. } => parse_port_mapping(value)
            .map(|(local, remote)| InputValue::Ports { local, remote })
            .ok_or_else(|| format!("'{value}' is not a local:remote port mapping")),
    }
}

pub fn parse_port_mapping(value: &str) -> Option<(u16, u16)> {
    let parse = |port: &str| port.trim().parse::<u16>().ok().filter(|port| *port > 0);
    match value.split_once(':') {
        Some((local, remote)) => Some((parse(local)?, parse(remote)?)),
        None => parse(value).map(|port| (port, port)),
    }
}

/// Type-to-filter list used for context and namespace selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picker {
    title: String,
    items: Vec<String>,
    current: Option<String>,
    filter: String,
    selected: usize,
}

impl Picker {
    pub fn new(title: impl Into<String>, items: Vec<String>, current: Option<String>) -> Self {
        let selected = current
            .as_ref()
            .and_then(|current| items.iter().position(|item| item == current))
            .unwrap_or(0);
        Self {
            title: title.into(),
            items,
            current,
            filter: String::new(),
            selected,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn filtered(&self) -> Vec<&str> {
        let needle = self.filter.to_lowercase();
        self.items
            .iter()
            .filter(|item| item.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }

    pub fn push_char(&mut self, c: char) {
        self.filter.push(c);
        self.selected = 0;
    }

    pub fn backspace(&mut self) {
        self.filter.pop();
        self.selected = 0;
    }

    pub fn move_by(&mut self, delta: isize) {
        let len = self.filtered().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let max_index = (len - 1) as isize;
        self.selected = (self.selected as isize + delta).clamp(0, max_index) as usize;
    }

    pub fn selected_item(&self) -> Option<String> {
        self.filtered().get(self.selected).map(|item| item.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastTone {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub tone: ToastTone,
    created: Instant,
}

impl Toast {
    pub fn new(message: impl Into<String>, tone: ToastTone) -> Self {
        Self {
            message: message.into(),
            tone,
            created: Instant::now(),
        }
    }

    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created) >= ttl
    }
}

pub fn help_lines() -> Vec<(&'static str, &'static str)> {
    vec![
        ("1-9", "focus panel"),
        ("tab / shift-tab", "next / previous panel"),
        ("j k / arrows", "move"),
        ("g G", "top / bottom"),
        ("ctrl-u ctrl-d", "page up / down"),
        ("/", "filter focused panel"),
        ("ctrl-r", "refresh"),
        ("a", "toggle all namespaces"),
        ("n", "pick namespace"),
        ("c", "pick context"),
        ("d y e D", "describe / yaml / edit / delete"),
        ("l x p", "pod logs / exec / port-forward"),
        ("s r V R", "scale / restart / diff / rollback"),
        ("t S", "trigger / suspend cronjob"),
        ("m M", "hpa min / max replicas"),
        ("enter", "use namespace"),
        ("logs: / n N G c", "search / next / prev / follow / container"),
        ("logs: p", "previous container instance"),
        ("esc", "close"),
        ("q ctrl-c", "quit"),
    ]
}

#[cfg(test)]
mod tests {
    use super::{
        ConfirmModal, InputModal, InputPurpose, InputValue, Picker, Toast, ToastTone,
        parse_port_mapping,
    };
    use crate::app::AppCommand;
    use crate::model::ResourceKind;
    use crate::panel::ResourceTarget;
    use std::time::{Duration, Instant};

    fn target() -> ResourceTarget {
        ResourceTarget {
            kind: ResourceKind::Deployments,
            namespace: Some("default".to_string()),
            name: "api".to_string(),
        }
    }

    #[test]
    fn confirm_defaults_to_no() {
        let mut modal = ConfirmModal::new("Delete?", AppCommand::LoadContexts);
        assert!(!modal.yes_selected());
        modal.toggle();
        assert!(modal.yes_selected());
        modal.select_no();
        assert_eq!(modal.clone().resolve(false), None);
        assert_eq!(modal.resolve(true), Some(AppCommand::LoadContexts));
    }

    #[test]
    fn input_edits_at_cursor() {
        let mut input = InputModal::new("Scale", "3", InputPurpose::Scale(target()));
        input.insert('0');
        assert_eq!(input.value(), "30");
        input.home();
        input.insert('1');
        assert_eq!(input.value(), "130");
        input.delete();
        assert_eq!(input.value(), "10");
        input.end();
        input.backspace();
        input.left();
        input.right();
        assert_eq!(input.value(), "1");
        assert_eq!(input.cursor(), 1);
    }

    #[test]
    fn invalid_replicas_keep_an_error() {
        let mut input = InputModal::new("Scale", "three", InputPurpose::Scale(target()));
        assert!(input.validate().is_err());
        assert!(input.error().is_some());
        input.backspace();
        assert!(input.error().is_none());

        let mut input = InputModal::new("Min", "0", InputPurpose::HpaMin(target()));
        assert!(input.validate().is_err());
        let mut input = InputModal::new("Min", " 5 ", InputPurpose::HpaMin(target()));
        assert_eq!(input.validate(), Ok(InputValue::Count(5)));
    }

    #[test]
    fn port_mappings() {
        assert_eq!(parse_port_mapping("8080:80"), Some((8080, 80)));
        assert_eq!(parse_port_mapping("9000"), Some((9000, 9000)));
        assert_eq!(parse_port_mapping("0:80"), None);
        assert_eq!(parse_port_mapping("x:80"), None);
    }

    #[test]
    fn picker_filters_and_clamps() {
        let mut picker = Picker::new(
            "Namespaces",
            vec![
                "default".to_string(),
                "kube-system".to_string(),
                "prod".to_string(),
            ],
            Some("prod".to_string()),
        );
        assert_eq!(picker.selected_item().as_deref(), Some("prod"));
        picker.push_char('k');
        assert_eq!(picker.filtered(), vec!["kube-system"]);
        picker.move_by(5);
        assert_eq!(picker.selected_item().as_deref(), Some("kube-system"));
        picker.push_char('z');
        assert_eq!(picker.selected_item(), None);
    }

    #[test]
    fn toast_expires_after_ttl() {
        let toast = Toast::new("Deleted pod: nginx", ToastTone::Info);
        let ttl = Duration::from_secs(3);
        assert!(!toast.is_expired(Instant::now(), ttl));
        assert!(toast.is_expired(Instant::now() + Duration::from_secs(4), ttl));
    }
}
