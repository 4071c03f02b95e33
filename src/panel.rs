use crate::app::AppCommand;
use crate::format::{format_bytes, format_bytes_compact, format_cpu, pad_right, truncate};
use crate::model::{
    KubeObject, MetricsSample, MetricsSnapshot, NamespaceScope, ResourceKind, ResourceRecord,
    StatusTone,
};
use crate::projection::{self, ContainerRow};
use chrono::{DateTime, Local};

const STATUS_WIDTH: usize = 14;
const READY_WIDTH: usize = 7;
const RESTARTS_WIDTH: usize = 9;
const AGE_WIDTH: usize = 8;
const NAMESPACE_WIDTH: usize = 16;
const CPU_WIDTH: usize = 7;
const MEM_WIDTH: usize = 9;
const MIN_NAME_WIDTH: usize = 10;
const WIDE_MODE_MIN_WIDTH: usize = 80;

/// Width left for the name column once the fixed columns are reserved.
pub fn name_column_width(width: usize, has_metrics: bool, all_namespaces: bool) -> usize {
    let mut reserved = STATUS_WIDTH;
    if width > WIDE_MODE_MIN_WIDTH {
        reserved += READY_WIDTH + RESTARTS_WIDTH + AGE_WIDTH;
        if all_namespaces {
            reserved += NAMESPACE_WIDTH;
        }
    }
    if has_metrics {
        reserved += CPU_WIDTH + MEM_WIDTH;
    }
    width.saturating_sub(reserved).max(MIN_NAME_WIDTH)
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PanelAction {
    Describe,
    Yaml,
    Edit,
    Delete,
    Logs,
    Exec,
    PortForward,
    Scale,
    Restart,
    VersionDiff,
    Rollback,
    Trigger,
    ToggleSuspend,
    EditHpaMin,
    EditHpaMax,
    UseNamespace,
}

impl PanelAction {
    pub fn for_key(kind: ResourceKind, key: char) -> Option<Self> {
        let common = match key {
            'd' => Some(Self::Describe),
            'y' => Some(Self::Yaml),
            'e' if kind.supports_edit() => Some(Self::Edit),
            'D' if kind != ResourceKind::Events => Some(Self::Delete),
            _ => None,
        };
        if common.is_some() {
            return common;
        }

        match (kind, key) {
            (ResourceKind::Pods, 'l') => Some(Self::Logs),
            (ResourceKind::Pods, 'x') => Some(Self::Exec),
            (ResourceKind::Pods, 'p') => Some(Self::PortForward),
            (ResourceKind::Deployments | ResourceKind::StatefulSets, 's') => Some(Self::Scale),
            (
                ResourceKind::Deployments | ResourceKind::StatefulSets | ResourceKind::DaemonSets,
                'r',
            ) => Some(Self::Restart),
            (ResourceKind::Deployments, 'V') => Some(Self::VersionDiff),
            (ResourceKind::Deployments, 'R') => Some(Self::Rollback),
            (ResourceKind::CronJobs, 't') => Some(Self::Trigger),
            (ResourceKind::CronJobs, 'S') => Some(Self::ToggleSuspend),
            (ResourceKind::Hpas, 'm') => Some(Self::EditHpaMin),
            (ResourceKind::Hpas, 'M') => Some(Self::EditHpaMax),
            _ => None,
        }
    }

    pub fn for_enter(kind: ResourceKind) -> Option<Self> {
        (kind == ResourceKind::Namespaces).then_some(Self::UseNamespace)
    }

    /// Key bindings shown in the detail pane footer.
    pub fn hints(kind: ResourceKind) -> Vec<(&'static str, &'static str)> {
        let mut hints: Vec<(&'static str, &'static str)> = match kind {
            ResourceKind::Pods => vec![("l", "logs"), ("x", "exec"), ("p", "port-forward")],
            ResourceKind::Deployments => vec![
                ("s", "scale"),
                ("r", "restart"),
                ("V", "diff"),
                ("R", "rollback"),
            ],
            ResourceKind::StatefulSets => vec![("s", "scale"), ("r", "restart")],
            ResourceKind::DaemonSets => vec![("r", "restart")],
            ResourceKind::CronJobs => vec![("t", "trigger"), ("S", "suspend/resume")],
            ResourceKind::Hpas => vec![("m", "min replicas"), ("M", "max replicas")],
            ResourceKind::Namespaces => vec![("enter", "use namespace")],
            _ => Vec::new(),
        };
        hints.push(("d", "describe"));
        hints.push(("y", "yaml"));
        if kind.supports_edit() {
            hints.push(("e", "edit"));
        }
        if !matches!(kind, ResourceKind::Events | ResourceKind::Nodes) {
            hints.push(("D", "delete"));
        }
        hints
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResourceTarget {
    pub kind: ResourceKind,
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceTarget {
    pub fn of(record: &ResourceRecord) -> Self {
        Self {
            kind: record.kind(),
            namespace: record.namespace.clone(),
            name: record.name.clone(),
        }
    }

    pub fn label(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{} {namespace}/{}", self.kind.singular(), self.name),
            None => format!("{} {}", self.kind.singular(), self.name),
        }
    }
}

/// One rendered list row; the status cell is split out so it can be styled by tone.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ListRow {
    pub lead: String,
    pub status: String,
    pub tone: StatusTone,
    pub trail: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ListView {
    pub header: Option<String>,
    pub rows: Vec<ListRow>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DetailView {
    pub title: String,
    pub fields: Vec<(&'static str, String)>,
    pub containers: Vec<ContainerRow>,
    pub images: Vec<String>,
    pub hints: Vec<(&'static str, &'static str)>,
}

#[derive(Debug, Clone)]
pub struct PanelState {
    kind: ResourceKind,
    rows: Vec<ResourceRecord>,
    filter: String,
    cursor: usize,
    focused: bool,
    width: u16,
    height: u16,
    all_namespaces: bool,
    loading: bool,
    loaded: bool,
    issued_seq: u64,
    applied_seq: u64,
    last_refreshed: Option<DateTime<Local>>,
    last_error: Option<String>,
}

impl PanelState {
    pub fn new(kind: ResourceKind, all_namespaces: bool) -> Self {
        Self {
            kind,
            rows: Vec::new(),
            filter: String::new(),
            cursor: 0,
            focused: false,
            width: 80,
            height: 20,
            all_namespaces,
            loading: false,
            loaded: false,
            issued_seq: 0,
            applied_seq: 0,
            last_refreshed: None,
            last_error: None,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn rows(&self) -> &[ResourceRecord] {
        &self.rows
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn focused(&self) -> bool {
        self.focused
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Local>> {
        self.last_refreshed
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn filtered(&self) -> Vec<&ResourceRecord> {
        self.rows
            .iter()
            .filter(|row| row.matches_filter(&self.filter))
            .collect()
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered().len()
    }

    fn clamp_cursor(&mut self) {
        let len = self.filtered_len();
        self.cursor = if len == 0 {
            0
        } else {
            self.cursor.min(len - 1)
        };
    }

    fn move_by(&mut self, delta: isize) {
        let len = self.filtered_len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let max_index = (len - 1) as isize;
        let current = self.cursor.min(len - 1) as isize;
        self.cursor = (current + delta).clamp(0, max_index) as usize;
    }

    fn page_step(&self) -> isize {
        self.height.saturating_sub(1).max(1) as isize
    }

    pub fn move_up(&mut self) {
        self.move_by(-1);
    }

    pub fn move_down(&mut self) {
        self.move_by(1);
    }

    pub fn move_top(&mut self) {
        self.cursor = 0;
    }

    pub fn move_bottom(&mut self) {
        self.cursor = self.filtered_len().saturating_sub(1);
    }

    pub fn page_up(&mut self) {
        self.move_by(-self.page_step());
    }

    pub fn page_down(&mut self) {
        self.move_by(self.page_step());
    }

    pub fn set_filter(&mut self, query: impl Into<String>) {
        self.filter = query.into();
        self.clamp_cursor();
    }

    pub fn set_all_namespaces(&mut self, all_namespaces: bool) {
        self.all_namespaces = all_namespaces;
    }

    pub fn set_size(&mut self, width: u16, height: u16) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    /// Drops the rows and fences off every refresh issued so far, so a
    /// response for the old namespace or context can never be applied.
    pub fn invalidate(&mut self) {
        self.applied_seq = self.issued_seq;
        self.rows.clear();
        self.cursor = 0;
        self.loaded = false;
        self.loading = false;
        self.last_refreshed = None;
        self.last_error = None;
    }

    pub fn scope(&self, namespace: &str) -> NamespaceScope {
        if self.all_namespaces || !self.kind.namespaced() {
            NamespaceScope::All
        } else {
            NamespaceScope::Named(namespace.to_string())
        }
    }

    /// Tags a new refresh and returns the command that loads it.
    pub fn refresh(&mut self, namespace: &str) -> AppCommand {
        self.issued_seq += 1;
        self.loading = true;
        AppCommand::Refresh {
            kind: self.kind,
            scope: self.scope(namespace),
            seq: self.issued_seq,
        }
    }

    /// Applies a refresh result unless a newer one was already applied.
    pub fn apply_refresh(&mut self, seq: u64, mut rows: Vec<ResourceRecord>) -> bool {
        if seq <= self.applied_seq {
            return false;
        }

        let selected_key = self.selected_item().map(ResourceRecord::key);
        projection::sort_records(self.kind, &mut rows);
        self.rows = rows;
        self.applied_seq = seq;
        self.loading = seq < self.issued_seq;
        self.loaded = true;
        self.last_refreshed = Some(Local::now());
        self.last_error = None;

        let index = selected_key.and_then(|key| {
            self.filtered()
                .iter()
                .position(|record| record.key() == key)
        });
        if let Some(index) = index {
            self.cursor = index;
        }
        self.clamp_cursor();
        true
    }

    /// Records a failed refresh; previous rows stay visible.
    pub fn refresh_failed(&mut self, seq: u64, error: impl Into<String>) -> bool {
        if seq <= self.applied_seq {
            return false;
        }
        self.applied_seq = seq;
        self.loading = seq < self.issued_seq;
        self.last_error = Some(error.into());
        true
    }

    pub fn selected_item(&self) -> Option<&ResourceRecord> {
        self.filtered().get(self.cursor).copied()
    }

    #[cfg(test)]
    pub fn selected_name(&self) -> Option<String> {
        self.selected_item().map(|record| record.name.clone())
    }

    pub fn selected_target(&self) -> Option<ResourceTarget> {
        self.selected_item().map(ResourceTarget::of)
    }

    /// Target for a delete, or `None` when nothing is selected or the kind forbids it.
    pub fn delete(&self) -> Option<ResourceTarget> {
        if matches!(self.kind, ResourceKind::Nodes | ResourceKind::Events) {
            return None;
        }
        self.selected_target()
    }

    pub fn get_selected_yaml(&self) -> Option<String> {
        self.selected_item().map(|record| record.object.to_yaml())
    }

    pub fn get_selected_describe(&self) -> Option<String> {
        self.selected_item().map(projection::describe)
    }

    fn has_metrics(&self, metrics: &MetricsSnapshot) -> bool {
        self.kind.supports_metrics()
            && self
                .rows
                .iter()
                .any(|record| metrics.sample_for(record).is_some())
    }

    pub fn name_width(&self, metrics: &MetricsSnapshot) -> usize {
        name_column_width(
            self.width as usize,
            self.has_metrics(metrics),
            self.all_namespaces && self.kind.namespaced(),
        )
    }

    pub fn view_rows(&self, metrics: &MetricsSnapshot) -> ListView {
        let has_metrics = self.has_metrics(metrics);
        let wide = self.width as usize > WIDE_MODE_MIN_WIDTH;
        let show_namespace = wide && self.all_namespaces && self.kind.namespaced();
        let name_width = self.name_width(metrics);

        let header = wide.then(|| {
            let mut lead = String::new();
            if show_namespace {
                lead.push_str(&pad_right("NAMESPACE", NAMESPACE_WIDTH));
            }
            lead.push_str(&pad_right("NAME", name_width));
            lead.push_str(&pad_right("STATUS", STATUS_WIDTH));
            lead.push_str(&pad_right("READY", READY_WIDTH));
            lead.push_str(&pad_right("RESTARTS", RESTARTS_WIDTH));
            lead.push_str(&pad_right("AGE", AGE_WIDTH));
            if has_metrics {
                lead.push_str(&pad_right("CPU", CPU_WIDTH));
                lead.push_str(&pad_right("MEM", MEM_WIDTH));
            }
            lead.trim_end().to_string()
        });

        let rows = self
            .filtered()
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let mut lead = String::new();
                if show_namespace {
                    lead.push_str(&pad_right(
                        record.namespace.as_deref().unwrap_or("-"),
                        NAMESPACE_WIDTH,
                    ));
                }
                lead.push_str(&pad_right(&record.name, name_width));

                let mut trail = String::new();
                if wide {
                    trail.push_str(&pad_right(&record.ready, READY_WIDTH));
                    trail.push_str(&pad_right(&record.restarts, RESTARTS_WIDTH));
                    trail.push_str(&pad_right(&record.age, AGE_WIDTH));
                }
                if has_metrics {
                    match metrics.sample_for(record) {
                        Some(sample) => {
                            trail.push_str(&pad_right(
                                &format_cpu(sample.cpu_millicores),
                                CPU_WIDTH,
                            ));
                            trail.push_str(&pad_right(
                                &format_bytes_compact(sample.memory_bytes),
                                MEM_WIDTH,
                            ));
                        }
                        None => trail.push_str(&" ".repeat(CPU_WIDTH + MEM_WIDTH)),
                    }
                }

                ListRow {
                    lead,
                    status: pad_right(&record.status, STATUS_WIDTH),
                    tone: StatusTone::of(&record.status),
                    trail: trail.trim_end().to_string(),
                    selected: index == self.cursor,
                }
            })
            .collect();

        ListView { header, rows }
    }

    pub fn detail_view(&self, metrics: &MetricsSnapshot) -> Option<DetailView> {
        let record = self.selected_item()?;
        let mut fields = projection::detail_fields(record);
        if let Some(MetricsSample {
            cpu_millicores,
            memory_bytes,
        }) = metrics.sample_for(record)
        {
            fields.push(("CPU", format_cpu(cpu_millicores)));
            fields.push(("Memory", format_bytes(memory_bytes)));
        }

        let containers = match &record.object {
            KubeObject::Pod(pod) => projection::container_rows(pod),
            _ => Vec::new(),
        };

        Some(DetailView {
            title: format!(
                "{} {}",
                self.kind.singular(),
                truncate(&record.name, self.width.max(20) as usize)
            ),
            fields,
            containers,
            images: projection::template_images(&record.object),
            hints: PanelAction::hints(self.kind),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{PanelAction, PanelState, ResourceTarget, name_column_width};
    use crate::app::AppCommand;
    use crate::model::{
        KubeObject, MetricsSample, MetricsSnapshot, NamespaceScope, ResourceKind, ResourceRecord,
    };
    use k8s_openapi::api::core::v1::{Node, Pod};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn pod(name: &str) -> ResourceRecord {
        ResourceRecord::project(
            KubeObject::Pod(Pod {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    namespace: Some("default".to_string()),
                    ..ObjectMeta::default()
                },
                ..Pod::default()
            }),
            0,
        )
    }

    fn loaded_panel(names: &[&str]) -> PanelState {
        let mut panel = PanelState::new(ResourceKind::Pods, false);
        let AppCommand::Refresh { seq, .. } = panel.refresh("default") else {
            panic!("expected refresh command");
        };
        assert!(panel.apply_refresh(seq, names.iter().map(|name| pod(name)).collect()));
        panel
    }

    fn names(panel: &PanelState) -> Vec<String> {
        panel
            .filtered()
            .iter()
            .map(|record| record.name.clone())
            .collect()
    }

    #[test]
    fn filter_then_move_clamps_cursor() {
        let mut panel = loaded_panel(&["alpha", "beta", "gamma"]);
        panel.set_filter("a");
        assert_eq!(names(&panel), vec!["alpha", "beta", "gamma"]);

        panel.set_filter("ALPHA");
        assert_eq!(names(&panel), vec!["alpha"]);

        let mut panel = loaded_panel(&["alpha", "beta", "gamma"]);
        panel.set_filter("m");
        assert_eq!(names(&panel), vec!["gamma"]);

        let mut panel = loaded_panel(&["alpha", "bet", "gamma"]);
        panel.set_filter("a");
        assert_eq!(names(&panel), vec!["alpha", "gamma"]);
        panel.move_down();
        panel.move_down();
        assert_eq!(panel.cursor(), 1);
        assert_eq!(panel.selected_name().as_deref(), Some("gamma"));
    }

    #[test]
    fn cursor_stays_in_bounds_across_operations() {
        let mut panel = loaded_panel(&["a1", "a2", "b1", "b2", "c1"]);
        let check = |panel: &PanelState| {
            let len = panel.filtered_len();
            assert!(
                (len == 0 && panel.cursor() == 0) || panel.cursor() < len,
                "cursor {} len {len}",
                panel.cursor()
            );
        };

        panel.move_bottom();
        check(&panel);
        panel.set_filter("b");
        check(&panel);
        panel.set_filter("zzz");
        check(&panel);
        panel.move_down();
        panel.move_bottom();
        check(&panel);
        panel.set_filter("");
        panel.move_bottom();
        let seq = match panel.refresh("default") {
            AppCommand::Refresh { seq, .. } => seq,
            other => panic!("unexpected {other:?}"),
        };
        panel.apply_refresh(seq, vec![pod("only")]);
        check(&panel);
        panel.move_up();
        panel.page_down();
        check(&panel);
        assert!(!panel.apply_refresh(seq, Vec::new()));
        check(&panel);
    }

    #[test]
    fn stale_refresh_results_are_dropped() {
        let mut panel = PanelState::new(ResourceKind::Pods, false);
        let first = panel.refresh("default");
        let second = panel.refresh("default");
        let (AppCommand::Refresh { seq: first, .. }, AppCommand::Refresh { seq: second, .. }) =
            (first, second)
        else {
            panic!("expected refresh commands");
        };

        assert!(panel.apply_refresh(second, vec![pod("new")]));
        assert!(!panel.loading());
        assert!(!panel.apply_refresh(first, vec![pod("old")]));
        assert_eq!(names(&panel), vec!["new"]);
    }

    #[test]
    fn failed_refresh_keeps_previous_rows() {
        let mut panel = loaded_panel(&["web"]);
        let AppCommand::Refresh { seq, .. } = panel.refresh("default") else {
            panic!("expected refresh command");
        };
        assert!(panel.loading());
        assert!(panel.refresh_failed(seq, "connection refused"));
        assert!(!panel.loading());
        assert_eq!(panel.last_error(), Some("connection refused"));
        assert_eq!(names(&panel), vec!["web"]);
    }

    #[test]
    fn invalidate_fences_refreshes_issued_before_it() {
        let mut panel = loaded_panel(&["from-default"]);
        let AppCommand::Refresh { seq: before, .. } = panel.refresh("default") else {
            panic!("expected refresh command");
        };
        panel.invalidate();
        assert!(panel.rows().is_empty());
        assert!(!panel.loaded());

        let AppCommand::Refresh { seq: after, .. } = panel.refresh("prod") else {
            panic!("expected refresh command");
        };
        assert!(!panel.apply_refresh(before, vec![pod("from-default")]));
        assert!(!panel.refresh_failed(before, "late failure"));
        assert!(panel.refresh_failed(after, "forbidden"));
        assert!(panel.rows().is_empty());
        assert_eq!(panel.last_error(), Some("forbidden"));
    }

    #[test]
    fn failure_blocks_older_pending_success() {
        let mut panel = PanelState::new(ResourceKind::Pods, false);
        let AppCommand::Refresh { seq: first, .. } = panel.refresh("default") else {
            panic!("expected refresh command");
        };
        let AppCommand::Refresh { seq: second, .. } = panel.refresh("default") else {
            panic!("expected refresh command");
        };
        assert!(panel.refresh_failed(second, "timeout"));
        assert!(!panel.apply_refresh(first, vec![pod("old")]));
        assert!(panel.rows().is_empty());
    }

    #[test]
    fn refresh_keeps_selection_by_identity() {
        let mut panel = loaded_panel(&["a", "b", "c"]);
        panel.move_down();
        let AppCommand::Refresh { seq, .. } = panel.refresh("default") else {
            panic!("expected refresh command");
        };
        panel.apply_refresh(seq, vec![pod("z"), pod("a"), pod("b")]);
        assert_eq!(panel.selected_name().as_deref(), Some("b"));
    }

    #[test]
    fn scope_follows_namespace_flag_and_kind() {
        let mut panel = PanelState::new(ResourceKind::Pods, false);
        assert_eq!(
            panel.scope("prod"),
            NamespaceScope::Named("prod".to_string())
        );
        panel.set_all_namespaces(true);
        assert_eq!(panel.scope("prod"), NamespaceScope::All);
        assert_eq!(
            PanelState::new(ResourceKind::Nodes, false).scope("prod"),
            NamespaceScope::All
        );
    }

    #[test]
    fn name_column_has_a_floor() {
        assert_eq!(name_column_width(60, false, false), 46);
        assert_eq!(name_column_width(100, false, false), 100 - 14 - 24);
        assert_eq!(name_column_width(100, true, true), 100 - 14 - 24 - 16 - 16);
        assert_eq!(name_column_width(20, true, false), 10);
    }

    #[test]
    fn wide_mode_adds_header_and_metrics_only_for_sampled_rows() {
        let mut panel = loaded_panel(&["web", "db"]);
        panel.set_size(120, 10);
        let mut metrics = MetricsSnapshot::default();
        metrics.pods.insert(
            "default/web".to_string(),
            MetricsSample {
                cpu_millicores: 250,
                memory_bytes: 64 * 1_048_576,
            },
        );

        let view = panel.view_rows(&metrics);
        let header = view.header.expect("wide header");
        assert!(header.contains("READY"));
        assert!(header.contains("CPU"));
        assert!(!header.contains("NAMESPACE"));
        assert!(view.rows[0].trail.contains("250m"));
        assert!(view.rows[0].trail.contains("64Mi"));
        assert!(!view.rows[1].trail.contains('m'));
        assert!(view.rows[0].selected);

        panel.set_size(60, 10);
        assert!(panel.view_rows(&MetricsSnapshot::default()).header.is_none());
    }

    #[test]
    fn per_kind_action_keys() {
        assert_eq!(
            PanelAction::for_key(ResourceKind::Pods, 'l'),
            Some(PanelAction::Logs)
        );
        assert_eq!(PanelAction::for_key(ResourceKind::Services, 'l'), None);
        assert_eq!(
            PanelAction::for_key(ResourceKind::Deployments, 'R'),
            Some(PanelAction::Rollback)
        );
        assert_eq!(PanelAction::for_key(ResourceKind::StatefulSets, 'V'), None);
        assert_eq!(
            PanelAction::for_key(ResourceKind::DaemonSets, 'r'),
            Some(PanelAction::Restart)
        );
        assert_eq!(PanelAction::for_key(ResourceKind::DaemonSets, 's'), None);
        assert_eq!(PanelAction::for_key(ResourceKind::Events, 'D'), None);
        assert_eq!(PanelAction::for_key(ResourceKind::Events, 'e'), None);
        assert_eq!(
            PanelAction::for_key(ResourceKind::Events, 'y'),
            Some(PanelAction::Yaml)
        );
        assert_eq!(
            PanelAction::for_key(ResourceKind::Nodes, 'D'),
            Some(PanelAction::Delete)
        );
        assert_eq!(
            PanelAction::for_enter(ResourceKind::Namespaces),
            Some(PanelAction::UseNamespace)
        );
        assert_eq!(PanelAction::for_enter(ResourceKind::Pods), None);
    }

    #[test]
    fn hints_match_available_actions() {
        let hints = PanelAction::hints(ResourceKind::Nodes);
        assert!(hints.iter().all(|(key, _)| *key != "D"));
        let hints = PanelAction::hints(ResourceKind::Events);
        assert_eq!(hints, vec![("d", "describe"), ("y", "yaml")]);
        let hints = PanelAction::hints(ResourceKind::CronJobs);
        assert!(hints.contains(&("t", "trigger")));
    }

    #[test]
    fn delete_targets_selected_row_only_when_allowed() {
        let panel = loaded_panel(&["nginx"]);
        assert_eq!(
            panel.delete(),
            Some(ResourceTarget {
                kind: ResourceKind::Pods,
                namespace: Some("default".to_string()),
                name: "nginx".to_string(),
            })
        );
        assert_eq!(PanelState::new(ResourceKind::Pods, false).delete(), None);

        let mut nodes = PanelState::new(ResourceKind::Nodes, false);
        let AppCommand::Refresh { seq, .. } = nodes.refresh("default") else {
            panic!("expected refresh command");
        };
        nodes.apply_refresh(
            seq,
            vec![ResourceRecord::project(
                KubeObject::Node(Node {
                    metadata: ObjectMeta {
                        name: Some("worker".to_string()),
                        ..ObjectMeta::default()
                    },
                    ..Node::default()
                }),
                0,
            )],
        );
        assert_eq!(nodes.selected_name().as_deref(), Some("worker"));
        assert_eq!(nodes.delete(), None);
    }

    #[test]
    fn detail_view_includes_metrics_and_hints() {
        let panel = loaded_panel(&["web"]);
        let mut metrics = MetricsSnapshot::default();
        metrics.pods.insert(
            "default/web".to_string(),
            MetricsSample {
                cpu_millicores: 1_500,
                memory_bytes: 1_048_576,
            },
        );
        let detail = panel.detail_view(&metrics).expect("detail");
        assert!(detail.fields.contains(&("CPU", "1.5".to_string())));
        assert!(detail.fields.contains(&("Memory", "1.00Mi".to_string())));
        assert!(detail.hints.contains(&("l", "logs")));
        assert!(panel.get_selected_yaml().is_some_and(|yaml| yaml.contains("name: web")));
        assert!(
            panel
                .get_selected_describe()
                .is_some_and(|text| text.contains("web"))
        );
    }
}
