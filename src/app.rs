use crate::diff::DiffViewer;
use crate::input::Action;
use crate::k8s::{self, HpaBound};
use crate::logs::{LogRequest, LogViewer, StreamHandle};
use crate::modal::{
    ConfirmModal, InputModal, InputPurpose, InputValue, Modal, Picker, Toast, ToastTone,
};
use crate::model::{KubeObject, MetricsSnapshot, NamespaceScope, ResourceKind, ResourceRecord};
use crate::panel::{PanelAction, PanelState, ResourceTarget};
use crate::projection;
use crate::yaml::YamlViewer;
use chrono::Utc;
use k8s_openapi::api::batch::v1::Job;
use serde_json::Value;
use std::time::{Duration, Instant};

const MAX_STATUS_LEN: usize = 180;
const DEFAULT_PORT: i32 = 8080;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AppMode {
    Normal,
    SearchInput,
    ConfirmModal,
    InputModal,
    YamlView,
    DiffView,
    LogView,
    HelpView,
    ContextPicker,
    NamespacePicker,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    None,
    Batch(Vec<AppCommand>),
    Refresh {
        kind: ResourceKind,
        scope: NamespaceScope,
        seq: u64,
    },
    RefreshMetrics {
        scope: NamespaceScope,
    },
    Watch {
        kind: ResourceKind,
        scope: NamespaceScope,
    },
    Delete(ResourceTarget),
    Patch {
        target: ResourceTarget,
        patch: Value,
        success: String,
    },
    Scale {
        target: ResourceTarget,
        replicas: i32,
    },
    CreateJob {
        namespace: String,
        cronjob: String,
        job: Box<Job>,
    },
    Rollback {
        namespace: String,
        name: String,
    },
    LoadRevisionDiff {
        namespace: String,
        name: String,
    },
    StreamLogs {
        request: LogRequest,
        handle: StreamHandle,
    },
    LoadObject(ResourceTarget),
    LoadContexts,
    LoadNamespaces,
    SwitchContext(String),
    ExecShell {
        namespace: String,
        pod: String,
        container: Option<String>,
    },
    EditResource(ResourceTarget),
    StartPortForward {
        id: u64,
        namespace: String,
        pod: String,
        local: u16,
        remote: u16,
    },
}

impl AppCommand {
    fn batch(commands: Vec<AppCommand>) -> Self {
        let mut commands = commands
            .into_iter()
            .flat_map(|command| match command {
                AppCommand::Batch(inner) => inner,
                other => vec![other],
            })
            .filter(|command| *command != AppCommand::None)
            .collect::<Vec<_>>();
        match commands.len() {
            0 => AppCommand::None,
            1 => commands.remove(0),
            _ => AppCommand::Batch(commands),
        }
    }
}

#[derive(Debug)]
pub enum AppEvent {
    Refreshed {
        kind: ResourceKind,
        seq: u64,
        result: Result<Vec<ResourceRecord>, String>,
    },
    Metrics(MetricsSnapshot),
    WatchChanged(ResourceKind),
    LogLine {
        stream_id: u64,
        line: String,
    },
    LogStreamFailed {
        stream_id: u64,
        message: String,
    },
    LogStreamEnded {
        stream_id: u64,
    },
    MutationSucceeded {
        message: String,
        refresh: Vec<ResourceKind>,
    },
    MutationFailed {
        message: String,
        refresh: Vec<ResourceKind>,
    },
    DiffReady(Box<DiffViewer>),
    ObjectLoaded {
        target: ResourceTarget,
        result: Result<String, String>,
    },
    ContextsLoaded(Result<Vec<String>, String>),
    NamespacesLoaded(Result<Vec<String>, String>),
    PortForwardExited {
        id: u64,
        message: String,
    },
    Info(String),
    Error(String),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PortForwardSession {
    pub id: u64,
    pub namespace: String,
    pub pod: String,
    pub local: u16,
    pub remote: u16,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StatusLine {
    pub text: String,
    pub error: bool,
}

/// Startup values resolved from flags, config file and kubeconfig.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub context: String,
    pub namespace: String,
    pub all_namespaces: bool,
    pub kinds: Vec<ResourceKind>,
    pub log_capacity: usize,
    pub log_tail_lines: i64,
    pub toast_ttl: Duration,
    pub left_column_percent: u16,
}

pub struct App {
    running: bool,
    panels: Vec<PanelState>,
    focused: usize,
    modal: Option<Modal>,
    toast: Option<Toast>,
    panel_search: Option<String>,
    context: String,
    namespace: String,
    all_namespaces: bool,
    status: StatusLine,
    last_error: Option<String>,
    metrics: MetricsSnapshot,
    port_forwards: Vec<PortForwardSession>,
    next_stream_id: u64,
    next_session_id: u64,
    log_capacity: usize,
    log_tail_lines: i64,
    toast_ttl: Duration,
    left_column_percent: u16,
    overlay_height: usize,
}

impl App {
    pub fn new(settings: AppSettings) -> Self {
        let mut kinds = Vec::new();
        for kind in settings.kinds {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        if kinds.is_empty() {
            kinds = ResourceKind::ALL.to_vec();
        }
        let panels = kinds
            .into_iter()
            .map(|kind| PanelState::new(kind, settings.all_namespaces))
            .collect();

        Self {
            running: true,
            panels,
            focused: 0,
            modal: None,
            toast: None,
            panel_search: None,
            context: settings.context,
            namespace: settings.namespace,
            all_namespaces: settings.all_namespaces,
            status: StatusLine {
                text: "Ready".to_string(),
                error: false,
            },
            last_error: None,
            metrics: MetricsSnapshot::default(),
            port_forwards: Vec::new(),
            next_stream_id: 0,
            next_session_id: 0,
            log_capacity: settings.log_capacity,
            log_tail_lines: settings.log_tail_lines,
            toast_ttl: settings.toast_ttl,
            left_column_percent: settings.left_column_percent.clamp(15, 60),
            overlay_height: 20,
        }
    }

    /// Focuses the first panel, which loads it.
    pub fn start(&mut self) -> AppCommand {
        self.focus_panel(0)
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> AppMode {
        match &self.modal {
            Some(Modal::Confirm(_)) => AppMode::ConfirmModal,
            Some(Modal::Input(_)) => AppMode::InputModal,
            Some(Modal::Yaml(_)) => AppMode::YamlView,
            Some(Modal::Diff(viewer)) if viewer.search().typing() => AppMode::SearchInput,
            Some(Modal::Diff(_)) => AppMode::DiffView,
            Some(Modal::Log(viewer)) if viewer.search().typing() => AppMode::SearchInput,
            Some(Modal::Log(_)) => AppMode::LogView,
            Some(Modal::Help) => AppMode::HelpView,
            Some(Modal::ContextPicker(_)) => AppMode::ContextPicker,
            Some(Modal::NamespacePicker(_)) => AppMode::NamespacePicker,
            None if self.panel_search.is_some() => AppMode::SearchInput,
            None => AppMode::Normal,
        }
    }

    pub fn panels(&self) -> &[PanelState] {
        &self.panels
    }

    #[cfg(test)]
    pub fn focused_index(&self) -> usize {
        self.focused
    }

    pub fn focused_panel(&self) -> Option<&PanelState> {
        self.panels.get(self.focused)
    }

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn panel_search(&self) -> Option<&str> {
        self.panel_search.as_deref()
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    #[cfg(test)]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn namespace_label(&self) -> String {
        if self.all_namespaces {
            NamespaceScope::All.label()
        } else {
            self.namespace.clone()
        }
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn metrics(&self) -> &MetricsSnapshot {
        &self.metrics
    }

    pub fn port_forwards(&self) -> &[PortForwardSession] {
        &self.port_forwards
    }

    pub fn left_column_percent(&self) -> u16 {
        self.left_column_percent
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = StatusLine {
            text: normalize_status_text(status.into()),
            error: false,
        };
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        let error = error.into();
        let line = summarize_error_line(&error);
        self.last_error = Some(error);
        self.status = StatusLine {
            text: normalize_status_text(line.clone()),
            error: true,
        };
        self.toast = Some(Toast::new(line, ToastTone::Error));
    }

    fn notify(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.set_status(message.clone());
        self.toast = Some(Toast::new(message, ToastTone::Info));
    }

    /// Drops an expired toast.
    pub fn tick(&mut self, now: Instant) {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.is_expired(now, self.toast_ttl))
        {
            self.toast = None;
        }
    }

    /// Sizes panels and viewers from the terminal dimensions.
    pub fn resize(&mut self, width: u16, height: u16) {
        let body_height = height.saturating_sub(2);
        let left_width = (width as u32 * self.left_column_percent as u32 / 100) as u16;
        let summaries = self.panels.len().saturating_sub(1) as u16;
        let list_width = left_width.saturating_sub(2);
        for panel in &mut self.panels {
            let header = u16::from(list_width > 80);
            let list_height = body_height
                .saturating_sub(summaries)
                .saturating_sub(2 + header);
            panel.set_size(list_width, list_height);
        }

        self.overlay_height = (height as usize * 85 / 100).saturating_sub(3).max(1);
        let overlay_height = self.overlay_height;
        match &mut self.modal {
            Some(Modal::Yaml(viewer)) => viewer.set_height(overlay_height),
            Some(Modal::Diff(viewer)) => viewer.set_height(overlay_height),
            Some(Modal::Log(viewer)) => viewer.set_height(overlay_height),
            _ => {}
        }
    }

    fn open_modal(&mut self, mut modal: Modal) {
        match &mut modal {
            Modal::Yaml(viewer) => viewer.set_height(self.overlay_height),
            Modal::Diff(viewer) => viewer.set_height(self.overlay_height),
            Modal::Log(viewer) => viewer.set_height(self.overlay_height),
            _ => {}
        }
        self.panel_search = None;
        self.modal = Some(modal);
    }

    fn scope(&self) -> NamespaceScope {
        if self.all_namespaces {
            NamespaceScope::All
        } else {
            NamespaceScope::Named(self.namespace.clone())
        }
    }

    fn refresh_panel(&mut self, index: usize) -> AppCommand {
        let namespace = self.namespace.clone();
        let Some(panel) = self.panels.get_mut(index) else {
            return AppCommand::None;
        };
        let kind = panel.kind();
        let refresh = panel.refresh(&namespace);
        let metrics = if kind.supports_metrics() {
            AppCommand::RefreshMetrics {
                scope: self.scope(),
            }
        } else {
            AppCommand::None
        };
        AppCommand::batch(vec![refresh, metrics])
    }

    /// Periodic refresh of the focused panel.
    pub fn on_refresh_tick(&mut self) -> AppCommand {
        self.refresh_panel(self.focused)
    }

    fn refresh_kinds(&mut self, kinds: &[ResourceKind]) -> AppCommand {
        let indices = self
            .panels
            .iter()
            .enumerate()
            .filter(|(_, panel)| kinds.contains(&panel.kind()))
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        let commands = indices
            .into_iter()
            .map(|index| self.refresh_panel(index))
            .collect();
        AppCommand::batch(commands)
    }

    fn focus_panel(&mut self, index: usize) -> AppCommand {
        if index >= self.panels.len() {
            return AppCommand::None;
        }
        let changed = index != self.focused;
        self.focused = index;
        for (position, panel) in self.panels.iter_mut().enumerate() {
            panel.set_focused(position == index);
        }

        let panel = &self.panels[index];
        let kind = panel.kind();
        let watch = AppCommand::Watch {
            kind,
            scope: panel.scope(&self.namespace),
        };
        if !panel.loaded() && !panel.loading() {
            AppCommand::batch(vec![self.refresh_panel(index), watch])
        } else if changed {
            watch
        } else {
            AppCommand::None
        }
    }

    fn cycle_focus(&mut self, delta: isize) -> AppCommand {
        let len = self.panels.len() as isize;
        if len == 0 {
            return AppCommand::None;
        }
        let next = (self.focused as isize + delta).rem_euclid(len) as usize;
        self.focus_panel(next)
    }

    fn invalidate_panels(&mut self) {
        for panel in &mut self.panels {
            panel.set_all_namespaces(self.all_namespaces);
            panel.invalidate();
        }
        self.metrics = MetricsSnapshot::default();
    }

    fn reload_focused(&mut self) -> AppCommand {
        let index = self.focused;
        let panel = &self.panels[index];
        let watch = AppCommand::Watch {
            kind: panel.kind(),
            scope: panel.scope(&self.namespace),
        };
        AppCommand::batch(vec![self.refresh_panel(index), watch])
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if action == Action::Quit {
            self.running = false;
            self.modal = None;
            self.set_status("Exit requested");
            return AppCommand::None;
        }

        match self.mode() {
            AppMode::Normal => self.apply_normal_action(action),
            AppMode::SearchInput => self.apply_search_action(action),
            AppMode::ConfirmModal => self.apply_confirm_action(action),
            AppMode::InputModal => self.apply_input_action(action),
            AppMode::YamlView | AppMode::DiffView | AppMode::LogView | AppMode::HelpView => {
                self.apply_viewer_action(action)
            }
            AppMode::ContextPicker | AppMode::NamespacePicker => self.apply_picker_action(action),
        }
    }

    fn apply_normal_action(&mut self, action: Action) -> AppCommand {
        let index = self.focused;
        match action {
            Action::FocusPanel(number) => self.focus_panel(number.saturating_sub(1) as usize),
            Action::NextPanel => self.cycle_focus(1),
            Action::PrevPanel => self.cycle_focus(-1),
            Action::Up => self.with_panel(index, PanelState::move_up),
            Action::Down => self.with_panel(index, PanelState::move_down),
            Action::Top => self.with_panel(index, PanelState::move_top),
            Action::Bottom => self.with_panel(index, PanelState::move_bottom),
            Action::PageUp | Action::HalfPageUp => self.with_panel(index, PanelState::page_up),
            Action::PageDown | Action::HalfPageDown => {
                self.with_panel(index, PanelState::page_down)
            }
            Action::StartSearch => {
                let current = self
                    .focused_panel()
                    .map(|panel| panel.filter().to_string())
                    .unwrap_or_default();
                self.panel_search = Some(current);
                AppCommand::None
            }
            Action::Refresh => {
                self.set_status(format!(
                    "Refreshing {}",
                    self.panels[index].kind().title()
                ));
                self.refresh_panel(index)
            }
            Action::ToggleHelp => {
                self.open_modal(Modal::Help);
                AppCommand::None
            }
            Action::OpenContextPicker => AppCommand::LoadContexts,
            Action::OpenNamespacePicker => AppCommand::LoadNamespaces,
            Action::ToggleAllNamespaces => {
                self.all_namespaces = !self.all_namespaces;
                self.invalidate_panels();
                self.set_status(format!("Namespace: {}", self.namespace_label()));
                self.reload_focused()
            }
            Action::Select => {
                let kind = self.panels[index].kind();
                match PanelAction::for_enter(kind) {
                    Some(action) => self.panel_action(action),
                    None => AppCommand::None,
                }
            }
            Action::Cancel => {
                if let Some(panel) = self.panels.get_mut(index)
                    && !panel.filter().is_empty()
                {
                    panel.set_filter("");
                }
                AppCommand::None
            }
            Action::PanelKey(key) => {
                let kind = self.panels[index].kind();
                if kind == ResourceKind::Nodes && key == 'D' {
                    self.set_status("Cannot delete nodes");
                    return AppCommand::None;
                }
                match PanelAction::for_key(kind, key) {
                    Some(action) => self.panel_action(action),
                    None => AppCommand::None,
                }
            }
            _ => AppCommand::None,
        }
    }

    fn with_panel(&mut self, index: usize, operation: fn(&mut PanelState)) -> AppCommand {
        if let Some(panel) = self.panels.get_mut(index) {
            operation(panel);
        }
        AppCommand::None
    }

    fn apply_search_action(&mut self, action: Action) -> AppCommand {
        if let Some(viewer_search) = self.viewer_search_mut() {
            match action {
                Action::InputChar(c) => viewer_search.push_char(c),
                Action::Backspace => viewer_search.backspace(),
                Action::Cancel => viewer_search.cancel(),
                Action::Submit => self.commit_viewer_search(),
                _ => {}
            }
            return AppCommand::None;
        }

        let Some(query) = self.panel_search.as_mut() else {
            return AppCommand::None;
        };
        match action {
            Action::InputChar(c) => query.push(c),
            Action::Backspace => {
                query.pop();
            }
            Action::Submit => {
                self.panel_search = None;
                return AppCommand::None;
            }
            Action::Cancel => {
                self.panel_search = None;
                if let Some(panel) = self.panels.get_mut(self.focused) {
                    panel.set_filter("");
                }
                return AppCommand::None;
            }
            _ => return AppCommand::None,
        }

        let query = query.clone();
        if let Some(panel) = self.panels.get_mut(self.focused) {
            panel.set_filter(query);
        }
        AppCommand::None
    }

    fn viewer_search_mut(&mut self) -> Option<&mut crate::search::SearchState> {
        match &mut self.modal {
            Some(Modal::Diff(viewer)) if viewer.search().typing() => Some(viewer.search_mut()),
            Some(Modal::Log(viewer)) if viewer.search().typing() => Some(viewer.search_mut()),
            _ => None,
        }
    }

    fn commit_viewer_search(&mut self) {
        match &mut self.modal {
            Some(Modal::Diff(viewer)) => viewer.commit_search(),
            Some(Modal::Log(viewer)) => viewer.commit_search(),
            _ => {}
        }
    }

    fn apply_confirm_action(&mut self, action: Action) -> AppCommand {
        let Some(Modal::Confirm(confirm)) = self.modal.as_mut() else {
            return AppCommand::None;
        };
        let confirmed = match action {
            Action::ChooseNo => {
                confirm.select_no();
                return AppCommand::None;
            }
            Action::ChooseYes => {
                confirm.select_yes();
                return AppCommand::None;
            }
            Action::ToggleChoice => {
                confirm.toggle();
                return AppCommand::None;
            }
            Action::Submit => confirm.yes_selected(),
            Action::ConfirmYes => true,
            Action::ConfirmNo => false,
            _ => return AppCommand::None,
        };

        let Some(Modal::Confirm(confirm)) = self.modal.take() else {
            return AppCommand::None;
        };
        match confirm.resolve(confirmed) {
            Some(command) => command,
            None => {
                self.set_status("Action cancelled");
                AppCommand::None
            }
        }
    }

    fn apply_input_action(&mut self, action: Action) -> AppCommand {
        let Some(Modal::Input(input)) = self.modal.as_mut() else {
            return AppCommand::None;
        };
        match action {
            Action::InputChar(c) => input.insert(c),
            Action::Backspace => input.backspace(),
            Action::Delete => input.delete(),
            Action::CursorLeft => input.left(),
            Action::CursorRight => input.right(),
            Action::CursorHome => input.home(),
            Action::CursorEnd => input.end(),
            Action::Cancel => {
                self.modal = None;
                self.set_status("Action cancelled");
            }
            Action::Submit => {
                let Ok(value) = input.validate() else {
                    return AppCommand::None;
                };
                let purpose = input.purpose().clone();
                self.modal = None;
                return self.submit_input(purpose, value);
            }
            _ => {}
        }
        AppCommand::None
    }

    fn submit_input(&mut self, purpose: InputPurpose, value: InputValue) -> AppCommand {
        match (purpose, value) {
            (InputPurpose::Scale(target), InputValue::Count(replicas)) => {
                AppCommand::Scale { target, replicas }
            }
            (InputPurpose::HpaMin(target), InputValue::Count(replicas)) => {
                hpa_patch(target, HpaBound::Min, replicas)
            }
            (InputPurpose::HpaMax(target), InputValue::Count(replicas)) => {
                hpa_patch(target, HpaBound::Max, replicas)
            }
            (InputPurpose::PortForward { namespace, pod }, InputValue::Ports { local, remote }) => {
                self.next_session_id += 1;
                let id = self.next_session_id;
                self.port_forwards.push(PortForwardSession {
                    id,
                    namespace: namespace.clone(),
                    pod: pod.clone(),
                    local,
                    remote,
                });
                self.set_status(format!("Port-forward {pod} {local}:{remote} started"));
                AppCommand::StartPortForward {
                    id,
                    namespace,
                    pod,
                    local,
                    remote,
                }
            }
            _ => AppCommand::None,
        }
    }

    fn apply_viewer_action(&mut self, action: Action) -> AppCommand {
        if matches!(action, Action::Cancel)
            || (matches!(action, Action::ToggleHelp) && matches!(self.modal, Some(Modal::Help)))
        {
            self.modal = None;
            return AppCommand::None;
        }

        let tail_lines = self.log_tail_lines;
        let stream_id = self.next_stream_id + 1;
        match self.modal.as_mut() {
            Some(Modal::Yaml(viewer)) => {
                let page = viewer.half_page();
                match action {
                    Action::Up => viewer.scroll_by(-1),
                    Action::Down => viewer.scroll_by(1),
                    Action::Top => viewer.scroll_top(),
                    Action::Bottom => viewer.scroll_bottom(),
                    Action::HalfPageUp | Action::PageUp => viewer.scroll_by(-page),
                    Action::HalfPageDown | Action::PageDown => viewer.scroll_by(page),
                    _ => {}
                }
            }
            Some(Modal::Diff(viewer)) => {
                let page = viewer.half_page();
                match action {
                    Action::Up => viewer.scroll_by(-1),
                    Action::Down => viewer.scroll_by(1),
                    Action::Top => viewer.scroll_top(),
                    Action::Bottom => viewer.scroll_bottom(),
                    Action::HalfPageUp | Action::PageUp => viewer.scroll_by(-page),
                    Action::HalfPageDown | Action::PageDown => viewer.scroll_by(page),
                    Action::StartSearch => viewer.search_mut().begin(),
                    Action::NextMatch => viewer.next_match(),
                    Action::PrevMatch => viewer.prev_match(),
                    _ => {}
                }
            }
            Some(Modal::Log(viewer)) => {
                let page = viewer.half_page();
                match action {
                    Action::Up => viewer.scroll_up(1),
                    Action::Down => viewer.scroll_down(1),
                    Action::Top => viewer.scroll_top(),
                    Action::Bottom => viewer.scroll_bottom(),
                    Action::HalfPageUp | Action::PageUp => viewer.scroll_up(page),
                    Action::HalfPageDown | Action::PageDown => viewer.scroll_down(page),
                    Action::StartSearch => viewer.begin_search(),
                    Action::NextMatch => viewer.next_match(),
                    Action::PrevMatch => viewer.prev_match(),
                    Action::SwitchContainer => {
                        if viewer.next_container().is_some() {
                            let (request, handle) = viewer.start(stream_id, tail_lines, None);
                            self.next_stream_id = stream_id;
                            return AppCommand::StreamLogs { request, handle };
                        }
                    }
                    Action::PreviousLogs => {
                        let (request, handle) = viewer.start_previous(stream_id, tail_lines);
                        self.next_stream_id = stream_id;
                        return AppCommand::StreamLogs { request, handle };
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        AppCommand::None
    }

    fn apply_picker_action(&mut self, action: Action) -> AppCommand {
        let picker = match self.modal.as_mut() {
            Some(Modal::ContextPicker(picker) | Modal::NamespacePicker(picker)) => picker,
            _ => return AppCommand::None,
        };
        match action {
            Action::Up => picker.move_by(-1),
            Action::Down => picker.move_by(1),
            Action::InputChar(c) => picker.push_char(c),
            Action::Backspace => picker.backspace(),
            Action::Cancel => self.modal = None,
            Action::Submit => {
                let choice = picker.selected_item();
                let modal = self.modal.take();
                return match (modal, choice) {
                    (Some(Modal::ContextPicker(_)), Some(context)) => {
                        if context == self.context {
                            AppCommand::None
                        } else {
                            self.set_status(format!("Switching to context {context}"));
                            AppCommand::SwitchContext(context)
                        }
                    }
                    (Some(Modal::NamespacePicker(_)), Some(namespace)) => {
                        self.use_namespace(namespace)
                    }
                    _ => AppCommand::None,
                };
            }
            _ => {}
        }
        AppCommand::None
    }

    fn use_namespace(&mut self, namespace: String) -> AppCommand {
        self.namespace = namespace;
        self.all_namespaces = false;
        self.invalidate_panels();
        self.set_status(format!("Namespace: {}", self.namespace));
        self.reload_focused()
    }

    fn selected(&self) -> Option<&ResourceRecord> {
        self.panels.get(self.focused)?.selected_item()
    }

    fn panel_action(&mut self, action: PanelAction) -> AppCommand {
        let Some(record) = self.selected().cloned() else {
            self.set_status("Nothing selected");
            return AppCommand::None;
        };
        let target = ResourceTarget::of(&record);
        let namespace = record.namespace.clone().unwrap_or_default();

        match action {
            PanelAction::Describe => {
                let Some(text) = self.panels[self.focused].get_selected_describe() else {
                    return AppCommand::None;
                };
                let title = format!("describe {}", target.label());
                self.open_modal(Modal::Yaml(YamlViewer::plain(title, &text)));
                AppCommand::None
            }
            PanelAction::Yaml => {
                let Some(yaml) = self.panels[self.focused].get_selected_yaml() else {
                    return AppCommand::None;
                };
                self.open_modal(Modal::Yaml(YamlViewer::new(yaml_title(&target), &yaml)));
                AppCommand::LoadObject(target)
            }
            PanelAction::Edit => AppCommand::EditResource(target),
            PanelAction::Delete => {
                let Some(target) = self.panels[self.focused].delete() else {
                    return AppCommand::None;
                };
                let prompt = format!("Delete {}?", target.label());
                self.open_modal(Modal::Confirm(ConfirmModal::new(
                    prompt,
                    AppCommand::Delete(target),
                )));
                AppCommand::None
            }
            PanelAction::Logs => {
                let KubeObject::Pod(pod) = &record.object else {
                    return AppCommand::None;
                };
                let mut viewer = LogViewer::new(
                    namespace,
                    record.name.clone(),
                    projection::pod_containers(pod),
                    self.log_capacity,
                );
                self.next_stream_id += 1;
                let (request, handle) =
                    viewer.start(self.next_stream_id, self.log_tail_lines, None);
                self.open_modal(Modal::Log(Box::new(viewer)));
                AppCommand::StreamLogs { request, handle }
            }
            PanelAction::Exec => {
                let container = match &record.object {
                    KubeObject::Pod(pod) => projection::pod_containers(pod).into_iter().next(),
                    _ => None,
                };
                AppCommand::ExecShell {
                    namespace,
                    pod: record.name,
                    container,
                }
            }
            PanelAction::PortForward => {
                let port = match &record.object {
                    KubeObject::Pod(pod) => projection::first_container_port(pod),
                    _ => None,
                }
                .unwrap_or(DEFAULT_PORT);
                let title = format!("Port-forward {} (local:remote)", record.name);
                self.open_modal(Modal::Input(InputModal::new(
                    title,
                    format!("{port}:{port}"),
                    InputPurpose::PortForward {
                        namespace,
                        pod: record.name,
                    },
                )));
                AppCommand::None
            }
            PanelAction::Scale => {
                let current = projection::desired_replicas(&record.object).unwrap_or(1);
                let title = format!("Scale {} replicas", target.label());
                self.open_modal(Modal::Input(InputModal::new(
                    title,
                    current.to_string(),
                    InputPurpose::Scale(target),
                )));
                AppCommand::None
            }
            PanelAction::Restart => {
                let prompt = format!("Restart {}?", target.label());
                let success = format!("Restarted {}: {}", target.kind.singular(), target.name);
                let command = AppCommand::Patch {
                    target,
                    patch: k8s::restart_patch(Utc::now()),
                    success,
                };
                self.open_modal(Modal::Confirm(ConfirmModal::new(prompt, command)));
                AppCommand::None
            }
            PanelAction::VersionDiff => {
                self.set_status(format!("Loading revisions of {}", record.name));
                AppCommand::LoadRevisionDiff {
                    namespace,
                    name: record.name,
                }
            }
            PanelAction::Rollback => {
                let prompt = format!("Roll back {} to its previous revision?", target.label());
                let command = AppCommand::Rollback {
                    namespace,
                    name: record.name,
                };
                self.open_modal(Modal::Confirm(ConfirmModal::new(prompt, command)));
                AppCommand::None
            }
            PanelAction::Trigger => {
                let KubeObject::CronJob(cronjob) = &record.object else {
                    return AppCommand::None;
                };
                match k8s::manual_job_from_cronjob(cronjob) {
                    Some(job) => AppCommand::CreateJob {
                        namespace,
                        cronjob: record.name,
                        job: Box::new(job),
                    },
                    None => {
                        self.set_error(format!("cronjob {} has no uid", record.name));
                        AppCommand::None
                    }
                }
            }
            PanelAction::ToggleSuspend => {
                let KubeObject::CronJob(cronjob) = &record.object else {
                    return AppCommand::None;
                };
                let suspend = !projection::cronjob_suspended(cronjob);
                let verb = if suspend { "Suspended" } else { "Resumed" };
                AppCommand::Patch {
                    success: format!("{verb} cronjob: {}", target.name),
                    target,
                    patch: k8s::suspend_patch(suspend),
                }
            }
            PanelAction::EditHpaMin | PanelAction::EditHpaMax => {
                let KubeObject::Hpa(hpa) = &record.object else {
                    return AppCommand::None;
                };
                let (title, current, purpose) = if action == PanelAction::EditHpaMin {
                    (
                        "minReplicas",
                        projection::hpa_min_replicas(hpa),
                        InputPurpose::HpaMin(target),
                    )
                } else {
                    (
                        "maxReplicas",
                        projection::hpa_max_replicas(hpa),
                        InputPurpose::HpaMax(target),
                    )
                };
                self.open_modal(Modal::Input(InputModal::new(
                    format!("HPA {} {title}", record.name),
                    current.to_string(),
                    purpose,
                )));
                AppCommand::None
            }
            PanelAction::UseNamespace => self.use_namespace(record.name),
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) -> AppCommand {
        match event {
            AppEvent::Refreshed { kind, seq, result } => {
                let Some(panel) = self.panels.iter_mut().find(|panel| panel.kind() == kind)
                else {
                    return AppCommand::None;
                };
                match result {
                    Ok(rows) => {
                        panel.apply_refresh(seq, rows);
                    }
                    Err(error) => {
                        if panel.refresh_failed(seq, error.clone()) {
                            self.set_error(format!("{}: {error}", kind.title()));
                        }
                    }
                }
                AppCommand::None
            }
            AppEvent::Metrics(snapshot) => {
                self.metrics = snapshot;
                AppCommand::None
            }
            AppEvent::WatchChanged(kind) => {
                if self.panels.get(self.focused).map(PanelState::kind) == Some(kind) {
                    self.refresh_panel(self.focused)
                } else {
                    AppCommand::None
                }
            }
            AppEvent::LogLine { stream_id, line } => {
                if let Some(Modal::Log(viewer)) = self.modal.as_mut() {
                    viewer.append(stream_id, line);
                }
                AppCommand::None
            }
            AppEvent::LogStreamFailed { stream_id, message } => {
                if let Some(Modal::Log(viewer)) = self.modal.as_mut() {
                    viewer.stream_failed(stream_id, &message);
                }
                AppCommand::None
            }
            AppEvent::LogStreamEnded { stream_id } => {
                if let Some(Modal::Log(viewer)) = self.modal.as_mut() {
                    viewer.stream_ended(stream_id);
                }
                AppCommand::None
            }
            AppEvent::MutationSucceeded { message, refresh } => {
                self.notify(message);
                self.refresh_kinds(&refresh)
            }
            AppEvent::MutationFailed { message, refresh } => {
                self.set_error(message);
                self.refresh_kinds(&refresh)
            }
            AppEvent::DiffReady(viewer) => {
                if self.modal.is_none() {
                    let (added, removed) = viewer.summary();
                    self.set_status(format!("{}: +{added} -{removed}", viewer.title()));
                    self.open_modal(Modal::Diff(*viewer));
                }
                AppCommand::None
            }
            AppEvent::ObjectLoaded { target, result } => {
                let title = yaml_title(&target);
                let Some(Modal::Yaml(viewer)) = self.modal.as_mut() else {
                    return AppCommand::None;
                };
                if viewer.title() != title {
                    return AppCommand::None;
                }
                match result {
                    Ok(yaml) => {
                        let offset = viewer.offset();
                        viewer.set_content(&yaml);
                        viewer.scroll_by(offset as isize);
                    }
                    Err(error) => self.set_error(format!("{title}: {error}")),
                }
                AppCommand::None
            }
            AppEvent::ContextsLoaded(result) => {
                match result {
                    Ok(contexts) if self.modal.is_none() => {
                        let picker = Picker::new("Contexts", contexts, Some(self.context.clone()));
                        self.open_modal(Modal::ContextPicker(picker));
                    }
                    Ok(_) => {}
                    Err(error) => self.set_error(format!("failed to list contexts: {error}")),
                }
                AppCommand::None
            }
            AppEvent::NamespacesLoaded(result) => {
                match result {
                    Ok(namespaces) if self.modal.is_none() => {
                        let current = (!self.all_namespaces).then(|| self.namespace.clone());
                        let picker = Picker::new("Namespaces", namespaces, current);
                        self.open_modal(Modal::NamespacePicker(picker));
                    }
                    Ok(_) => {}
                    Err(error) => self.set_error(format!("failed to list namespaces: {error}")),
                }
                AppCommand::None
            }
            AppEvent::PortForwardExited { id, message } => {
                self.port_forwards.retain(|session| session.id != id);
                self.set_status(message);
                AppCommand::None
            }
            AppEvent::Info(message) => {
                self.set_status(message);
                AppCommand::None
            }
            AppEvent::Error(error) => {
                self.set_error(error);
                AppCommand::None
            }
        }
    }

    /// Adopts a freshly connected context and reloads the focused panel.
    pub fn context_switched(&mut self, context: String, namespace: String) -> AppCommand {
        self.context = context;
        self.namespace = namespace;
        self.modal = None;
        self.invalidate_panels();
        self.notify(format!("Switched to context {}", self.context));
        self.reload_focused()
    }

    /// Commands that reload the focused kind after an external edit.
    pub fn after_edit(&mut self, kind: ResourceKind) -> AppCommand {
        self.refresh_kinds(&[kind])
    }
}

fn yaml_title(target: &ResourceTarget) -> String {
    format!("yaml {}", target.label())
}

fn hpa_patch(target: ResourceTarget, bound: HpaBound, replicas: i32) -> AppCommand {
    AppCommand::Patch {
        success: format!("Updated HPA {}: {replicas}", bound.field()),
        target,
        patch: k8s::hpa_bound_patch(bound, replicas),
    }
}

pub fn summarize_error_line(error: &str) -> String {
    error
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| "unknown error".to_string())
}

pub fn normalize_status_text(status: String) -> String {
    if status.chars().count() <= MAX_STATUS_LEN {
        return status;
    }

    let mut shortened = status
        .chars()
        .take(MAX_STATUS_LEN.saturating_sub(1))
        .collect::<String>();
    shortened.push('…');
    shortened
}

#[cfg(test)]
mod tests {
    use super::{App, AppCommand, AppEvent, AppMode, AppSettings, normalize_status_text};
    use crate::diff::{DiffViewer, diff_lines};
    use crate::input::Action;
    use crate::modal::Modal;
    use crate::model::{KubeObject, NamespaceScope, ResourceKind, ResourceRecord};
    use crate::panel::ResourceTarget;
    use k8s_openapi::api::autoscaling::v2::{
        HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec,
    };
    use k8s_openapi::api::batch::v1::{CronJob, CronJobSpec, JobSpec, JobTemplateSpec};
    use k8s_openapi::api::core::v1::{
        Container, ContainerPort, Node, Pod, PodSpec, PodTemplateSpec,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn settings(kinds: Vec<ResourceKind>) -> AppSettings {
        AppSettings {
            context: "dev".to_string(),
            namespace: "default".to_string(),
            all_namespaces: false,
            kinds,
            log_capacity: 100,
            log_tail_lines: 100,
            toast_ttl: Duration::from_secs(3),
            left_column_percent: 25,
        }
    }

    fn meta(name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            uid: Some(format!("uid-{name}")),
            ..ObjectMeta::default()
        }
    }

    fn pod(name: &str) -> KubeObject {
        KubeObject::Pod(Pod {
            metadata: meta(name),
            spec: Some(PodSpec {
                containers: vec![
                    Container {
                        name: "app".to_string(),
                        ports: Some(vec![ContainerPort {
                            container_port: 3000,
                            ..ContainerPort::default()
                        }]),
                        ..Container::default()
                    },
                    Container {
                        name: "sidecar".to_string(),
                        ..Container::default()
                    },
                ],
                ..PodSpec::default()
            }),
            status: None,
        })
    }

    fn app_with(kind: ResourceKind, objects: Vec<KubeObject>) -> App {
        let mut app = App::new(settings(vec![kind, ResourceKind::Events]));
        let AppCommand::Batch(commands) = app.start() else {
            panic!("expected initial batch");
        };
        let Some(AppCommand::Refresh { seq, .. }) = commands.first().cloned() else {
            panic!("expected refresh first");
        };
        app.handle_event(AppEvent::Refreshed {
            kind,
            seq,
            result: Ok(objects
                .into_iter()
                .map(|object| ResourceRecord::project(object, 0))
                .collect()),
        });
        app
    }

    fn key(c: char) -> Action {
        Action::PanelKey(c)
    }

    #[test]
    fn start_refreshes_and_watches_first_panel() {
        let mut app = App::new(settings(vec![ResourceKind::Deployments]));
        assert_eq!(
            app.start(),
            AppCommand::Batch(vec![
                AppCommand::Refresh {
                    kind: ResourceKind::Deployments,
                    scope: NamespaceScope::Named("default".to_string()),
                    seq: 1,
                },
                AppCommand::Watch {
                    kind: ResourceKind::Deployments,
                    scope: NamespaceScope::Named("default".to_string()),
                },
            ])
        );
    }

    #[test]
    fn start_flattens_metrics_refresh_into_one_batch() {
        let mut app = App::new(settings(vec![ResourceKind::Pods]));
        let AppCommand::Batch(commands) = app.start() else {
            panic!("expected initial batch");
        };
        assert!(matches!(
            commands.first(),
            Some(AppCommand::Refresh {
                kind: ResourceKind::Pods,
                seq: 1,
                ..
            })
        ));
        assert!(
            commands
                .iter()
                .any(|command| matches!(command, AppCommand::RefreshMetrics { .. }))
        );
        assert!(
            commands
                .iter()
                .all(|command| !matches!(command, AppCommand::Batch(_) | AppCommand::None))
        );
    }

    #[test]
    fn delete_confirmation_dispatches_only_on_yes() {
        let mut app = app_with(ResourceKind::Pods, vec![pod("nginx")]);
        assert_eq!(app.apply_action(key('D')), AppCommand::None);
        assert_eq!(app.mode(), AppMode::ConfirmModal);
        let Some(Modal::Confirm(confirm)) = app.modal() else {
            panic!("confirm modal expected");
        };
        assert!(!confirm.yes_selected());

        let target = ResourceTarget {
            kind: ResourceKind::Pods,
            namespace: Some("default".to_string()),
            name: "nginx".to_string(),
        };
        assert_eq!(
            app.apply_action(Action::ConfirmYes),
            AppCommand::Delete(target)
        );
        assert_eq!(app.mode(), AppMode::Normal);

        let refresh = app.handle_event(AppEvent::MutationSucceeded {
            message: "Deleted pod: nginx".to_string(),
            refresh: vec![ResourceKind::Pods],
        });
        assert_eq!(app.status().text, "Deleted pod: nginx");
        assert!(!app.status().error);
        assert!(matches!(
            refresh,
            AppCommand::Batch(ref commands)
                if matches!(commands[0], AppCommand::Refresh { kind: ResourceKind::Pods, .. })
        ));

        app.apply_action(key('D'));
        assert_eq!(app.apply_action(Action::ConfirmNo), AppCommand::None);
        assert!(app.modal().is_none());
    }

    #[test]
    fn enter_commits_the_highlighted_choice() {
        let mut app = app_with(ResourceKind::Pods, vec![pod("nginx")]);
        app.apply_action(key('D'));
        assert_eq!(app.apply_action(Action::Submit), AppCommand::None);
        assert!(app.modal().is_none());

        app.apply_action(key('D'));
        app.apply_action(Action::ChooseYes);
        assert!(matches!(
            app.apply_action(Action::Submit),
            AppCommand::Delete(_)
        ));
    }

    #[test]
    fn nodes_cannot_be_deleted() {
        let node = KubeObject::Node(Node {
            metadata: ObjectMeta {
                name: Some("worker-1".to_string()),
                ..ObjectMeta::default()
            },
            ..Node::default()
        });
        let mut app = app_with(ResourceKind::Nodes, vec![node]);
        assert_eq!(app.apply_action(key('D')), AppCommand::None);
        assert!(app.modal().is_none());
        assert_eq!(app.status().text, "Cannot delete nodes");
    }

    #[test]
    fn cronjob_trigger_builds_manual_job() {
        let cronjob = KubeObject::CronJob(CronJob {
            metadata: ObjectMeta {
                uid: Some("u-1".to_string()),
                ..meta("report")
            },
            spec: Some(CronJobSpec {
                schedule: "0 * * * *".to_string(),
                job_template: JobTemplateSpec {
                    metadata: None,
                    spec: Some(JobSpec {
                        template: PodTemplateSpec {
                            metadata: None,
                            spec: Some(PodSpec {
                                containers: vec![Container {
                                    name: "report".to_string(),
                                    image: Some("busybox".to_string()),
                                    ..Container::default()
                                }],
                                ..PodSpec::default()
                            }),
                        },
                        ..JobSpec::default()
                    }),
                },
                ..CronJobSpec::default()
            }),
            status: None,
        });
        let mut app = app_with(ResourceKind::CronJobs, vec![cronjob]);
        let AppCommand::CreateJob {
            namespace,
            cronjob,
            job,
        } = app.apply_action(key('t'))
        else {
            panic!("expected create job");
        };
        assert_eq!(namespace, "default");
        assert_eq!(cronjob, "report");
        assert_eq!(job.metadata.generate_name.as_deref(), Some("report-manual-"));
        let owners = job.metadata.owner_references.clone().unwrap_or_default();
        assert_eq!(owners[0].uid, "u-1");
        let image = job
            .spec
            .as_ref()
            .and_then(|spec| spec.template.spec.as_ref())
            .and_then(|spec| spec.containers[0].image.clone());
        assert_eq!(image.as_deref(), Some("busybox"));

        assert!(matches!(
            app.apply_action(key('S')),
            AppCommand::Patch { ref patch, .. } if *patch == json!({"spec": {"suspend": true}})
        ));
    }

    #[test]
    fn hpa_min_edit_patches_and_refreshes() {
        let hpa = KubeObject::Hpa(HorizontalPodAutoscaler {
            metadata: meta("web"),
            spec: Some(HorizontalPodAutoscalerSpec {
                max_replicas: 10,
                ..HorizontalPodAutoscalerSpec::default()
            }),
            status: None,
        });
        let mut app = app_with(ResourceKind::Hpas, vec![hpa]);
        app.apply_action(key('m'));
        let Some(Modal::Input(input)) = app.modal() else {
            panic!("input modal expected");
        };
        assert_eq!(input.value(), "1");

        app.apply_action(Action::Backspace);
        app.apply_action(Action::InputChar('5'));
        let AppCommand::Patch {
            target,
            patch,
            success,
        } = app.apply_action(Action::Submit)
        else {
            panic!("expected patch");
        };
        assert_eq!(target.name, "web");
        assert_eq!(patch, json!({"spec": {"minReplicas": 5}}));

        let refresh = app.handle_event(AppEvent::MutationSucceeded {
            message: success,
            refresh: vec![ResourceKind::Hpas],
        });
        assert_eq!(
            app.toast().map(|toast| toast.message.as_str()),
            Some("Updated HPA minReplicas: 5")
        );
        assert!(matches!(
            refresh,
            AppCommand::Refresh {
                kind: ResourceKind::Hpas,
                ..
            }
        ));
    }

    #[test]
    fn invalid_input_keeps_modal_open() {
        let mut app = app_with(ResourceKind::Pods, vec![pod("api")]);
        app.apply_action(key('p'));
        let Some(Modal::Input(input)) = app.modal() else {
            panic!("input modal expected");
        };
        assert_eq!(input.value(), "3000:3000");

        app.apply_action(Action::InputChar('x'));
        assert_eq!(app.apply_action(Action::Submit), AppCommand::None);
        assert_eq!(app.mode(), AppMode::InputModal);

        app.apply_action(Action::Backspace);
        let AppCommand::StartPortForward { local, remote, .. } = app.apply_action(Action::Submit)
        else {
            panic!("expected port-forward");
        };
        assert_eq!((local, remote), (3000, 3000));
        assert_eq!(app.port_forwards().len(), 1);
    }

    #[test]
    fn panel_search_filters_live_and_escape_clears() {
        let mut app = app_with(
            ResourceKind::Pods,
            vec![pod("alpha"), pod("beta"), pod("gamma")],
        );
        app.apply_action(Action::StartSearch);
        assert_eq!(app.mode(), AppMode::SearchInput);
        app.apply_action(Action::InputChar('m'));
        assert_eq!(app.focused_panel().map(|panel| panel.filtered_len()), Some(1));
        app.apply_action(Action::Submit);
        assert_eq!(app.mode(), AppMode::Normal);
        assert_eq!(app.focused_panel().map(|panel| panel.filter()), Some("m"));

        app.apply_action(Action::StartSearch);
        app.apply_action(Action::Cancel);
        assert_eq!(app.focused_panel().map(|panel| panel.filter()), Some(""));
    }

    #[test]
    fn digits_focus_and_load_panels_once() {
        let mut app = App::new(settings(vec![ResourceKind::Pods, ResourceKind::Services]));
        app.start();
        let command = app.apply_action(Action::FocusPanel(2));
        assert!(matches!(
            command,
            AppCommand::Batch(ref commands)
                if matches!(commands[0], AppCommand::Refresh { kind: ResourceKind::Services, .. })
        ));
        assert_eq!(app.focused_index(), 1);
        assert_eq!(app.apply_action(Action::FocusPanel(2)), AppCommand::None);
        assert_eq!(app.apply_action(Action::FocusPanel(9)), AppCommand::None);
        assert_eq!(app.focused_index(), 1);
        app.apply_action(Action::NextPanel);
        assert_eq!(app.focused_index(), 0);
    }

    #[test]
    fn stale_refresh_is_ignored_and_failure_posts_error() {
        let mut app = App::new(settings(vec![ResourceKind::Pods]));
        app.start();
        let AppCommand::Batch(commands) = app.on_refresh_tick() else {
            panic!("expected refresh batch");
        };
        let Some(AppCommand::Refresh { seq, .. }) = commands.first().cloned() else {
            panic!("expected refresh");
        };
        app.handle_event(AppEvent::Refreshed {
            kind: ResourceKind::Pods,
            seq,
            result: Ok(vec![ResourceRecord::project(pod("new"), 0)]),
        });
        app.handle_event(AppEvent::Refreshed {
            kind: ResourceKind::Pods,
            seq: seq - 1,
            result: Ok(Vec::new()),
        });
        assert_eq!(
            app.focused_panel().and_then(|panel| panel.selected_name()),
            Some("new".to_string())
        );

        let AppCommand::Batch(commands) = app.on_refresh_tick() else {
            panic!("expected refresh batch");
        };
        let Some(AppCommand::Refresh { seq, .. }) = commands.first().cloned() else {
            panic!("expected refresh");
        };
        app.handle_event(AppEvent::Refreshed {
            kind: ResourceKind::Pods,
            seq,
            result: Err("connection refused".to_string()),
        });
        assert!(app.status().error);
        assert_eq!(app.focused_panel().map(|panel| panel.rows().len()), Some(1));
    }

    #[test]
    fn log_viewer_follows_streamed_lines() {
        let mut app = app_with(ResourceKind::Pods, vec![pod("api")]);
        let AppCommand::StreamLogs { request, handle } = app.apply_action(key('l')) else {
            panic!("expected stream command");
        };
        assert!(request.follow);
        assert_eq!(request.tail_lines, Some(100));
        assert_eq!(request.container.as_deref(), Some("app"));
        assert_eq!(app.mode(), AppMode::LogView);

        for index in 0..30 {
            app.handle_event(AppEvent::LogLine {
                stream_id: handle.id(),
                line: format!("line {index}"),
            });
        }
        let Some(Modal::Log(viewer)) = app.modal() else {
            panic!("log viewer expected");
        };
        assert_eq!(viewer.len(), 30);
        assert_eq!(viewer.offset(), viewer.max_offset());

        let AppCommand::StreamLogs {
            request: next,
            handle: next_handle,
        } = app.apply_action(Action::SwitchContainer)
        else {
            panic!("expected new stream");
        };
        assert_eq!(next.container.as_deref(), Some("sidecar"));
        assert!(handle.is_cancelled());

        app.apply_action(Action::Cancel);
        assert!(app.modal().is_none());
        assert!(next_handle.is_cancelled());
    }

    #[test]
    fn modal_is_exclusive_and_diff_waits_for_it() {
        let mut app = app_with(ResourceKind::Pods, vec![pod("api")]);
        app.apply_action(key('y'));
        assert_eq!(app.mode(), AppMode::YamlView);
        app.handle_event(AppEvent::DiffReady(Box::new(DiffViewer::new(
            "diff",
            "a",
            "b",
            diff_lines("x\n", "y\n"),
        ))));
        assert_eq!(app.mode(), AppMode::YamlView);
        app.apply_action(Action::Cancel);
        assert_eq!(app.mode(), AppMode::Normal);
    }

    #[test]
    fn yaml_view_is_replaced_by_live_manifest() {
        let mut app = app_with(ResourceKind::Pods, vec![pod("api")]);
        let AppCommand::LoadObject(target) = app.apply_action(key('y')) else {
            panic!("expected live fetch");
        };
        assert_eq!(target.name, "api");

        let mut other = target.clone();
        other.name = "web".to_string();
        app.handle_event(AppEvent::ObjectLoaded {
            target: other,
            result: Ok("kind: Other\n".to_string()),
        });
        app.handle_event(AppEvent::ObjectLoaded {
            target,
            result: Ok("kind: Pod\nmetadata:\n  name: api\n  resourceVersion: '42'\n".to_string()),
        });

        let Some(Modal::Yaml(viewer)) = app.modal() else {
            panic!("expected yaml viewer");
        };
        assert_eq!(viewer.lines().first().map(String::as_str), Some("kind: Pod"));
        assert!(viewer.lines().iter().any(|line| line.contains("resourceVersion")));
    }

    #[test]
    fn describe_uses_selected_row() {
        let mut app = app_with(ResourceKind::Pods, vec![pod("api")]);
        assert_eq!(app.apply_action(key('d')), AppCommand::None);
        let Some(Modal::Yaml(viewer)) = app.modal() else {
            panic!("expected describe viewer");
        };
        assert!(viewer.title().starts_with("describe"));
        assert!(viewer.lines().iter().any(|line| line.contains("api")));
    }

    #[test]
    fn use_namespace_reloads_with_new_scope() {
        let namespace = KubeObject::Namespace(k8s_openapi::api::core::v1::Namespace {
            metadata: ObjectMeta {
                name: Some("prod".to_string()),
                ..ObjectMeta::default()
            },
            ..Default::default()
        });
        let mut app = app_with(ResourceKind::Namespaces, vec![namespace]);
        let command = app.apply_action(Action::Select);
        assert_eq!(app.namespace(), "prod");
        assert!(matches!(command, AppCommand::Batch(_)));
        assert!(app.focused_panel().is_some_and(|panel| panel.loading()));
    }

    fn refresh_seq(command: &AppCommand) -> Option<u64> {
        match command {
            AppCommand::Refresh { seq, .. } => Some(*seq),
            AppCommand::Batch(commands) => commands.iter().find_map(refresh_seq),
            _ => None,
        }
    }

    #[test]
    fn namespace_switch_drops_rows_from_previous_namespace() {
        let mut app = app_with(ResourceKind::Pods, vec![pod("web")]);
        let Some(before) = refresh_seq(&app.on_refresh_tick()) else {
            panic!("expected tick refresh");
        };
        let Some(after) = refresh_seq(&app.use_namespace("prod".to_string())) else {
            panic!("expected reload after namespace switch");
        };
        assert!(after > before);

        app.handle_event(AppEvent::Refreshed {
            kind: ResourceKind::Pods,
            seq: before,
            result: Ok(vec![ResourceRecord::project(pod("from-default"), 0)]),
        });
        app.handle_event(AppEvent::Refreshed {
            kind: ResourceKind::Pods,
            seq: after,
            result: Err("forbidden".to_string()),
        });

        let panel = app.focused_panel().expect("focused panel");
        assert!(panel.rows().is_empty());
        assert_eq!(panel.last_error(), Some("forbidden"));
    }

    #[test]
    fn context_switch_clears_rows_until_reload_lands() {
        let mut app = app_with(ResourceKind::Pods, vec![pod("web")]);
        let command = app.context_switched("staging".to_string(), "default".to_string());
        assert!(app.focused_panel().is_some_and(|panel| panel.rows().is_empty()));
        let Some(seq) = refresh_seq(&command) else {
            panic!("expected reload after context switch");
        };
        app.handle_event(AppEvent::Refreshed {
            kind: ResourceKind::Pods,
            seq,
            result: Ok(vec![ResourceRecord::project(pod("api"), 0)]),
        });
        assert_eq!(
            app.focused_panel().and_then(|panel| panel.selected_name()),
            Some("api".to_string())
        );
    }

    #[test]
    fn toast_expires_on_tick() {
        let mut app = App::new(settings(vec![ResourceKind::Pods]));
        app.handle_event(AppEvent::Error("boom".to_string()));
        assert!(app.toast().is_some());
        app.tick(Instant::now() + Duration::from_secs(5));
        assert!(app.toast().is_none());
        assert!(app.status().error);
    }

    #[test]
    fn long_status_is_truncated() {
        let status = "x".repeat(300);
        let normalized = normalize_status_text(status);
        assert_eq!(normalized.chars().count(), 180);
        assert!(normalized.ends_with('…'));
    }
}
