use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Event, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod, Secret,
    Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Pods,
    Deployments,
    StatefulSets,
    DaemonSets,
    ReplicaSets,
    Jobs,
    CronJobs,
    Hpas,
    Services,
    Ingresses,
    ConfigMaps,
    Secrets,
    PersistentVolumeClaims,
    PersistentVolumes,
    ServiceAccounts,
    Namespaces,
    Nodes,
    Events,
}

impl ResourceKind {
    pub const ALL: [Self; 18] = [
        Self::Pods,
        Self::Deployments,
        Self::StatefulSets,
        Self::DaemonSets,
        Self::ReplicaSets,
        Self::Jobs,
        Self::CronJobs,
        Self::Hpas,
        Self::Services,
        Self::Ingresses,
        Self::ConfigMaps,
        Self::Secrets,
        Self::PersistentVolumeClaims,
        Self::PersistentVolumes,
        Self::ServiceAccounts,
        Self::Namespaces,
        Self::Nodes,
        Self::Events,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Pods => "Pods",
            Self::Deployments => "Deployments",
            Self::StatefulSets => "StatefulSets",
            Self::DaemonSets => "DaemonSets",
            Self::ReplicaSets => "ReplicaSets",
            Self::Jobs => "Jobs",
            Self::CronJobs => "CronJobs",
            Self::Hpas => "HPAs",
            Self::Services => "Services",
            Self::Ingresses => "Ingresses",
            Self::ConfigMaps => "ConfigMaps",
            Self::Secrets => "Secrets",
            Self::PersistentVolumeClaims => "PVCs",
            Self::PersistentVolumes => "PVs",
            Self::ServiceAccounts => "ServiceAccounts",
            Self::Namespaces => "Namespaces",
            Self::Nodes => "Nodes",
            Self::Events => "Events",
        }
    }

    /// Lower-case noun used in status messages, e.g. `Deleted pod: web`.
    pub fn singular(self) -> &'static str {
        match self {
            Self::Pods => "pod",
            Self::Deployments => "deployment",
            Self::StatefulSets => "statefulset",
            Self::DaemonSets => "daemonset",
            Self::ReplicaSets => "replicaset",
            Self::Jobs => "job",
            Self::CronJobs => "cronjob",
            Self::Hpas => "hpa",
            Self::Services => "service",
            Self::Ingresses => "ingress",
            Self::ConfigMaps => "configmap",
            Self::Secrets => "secret",
            Self::PersistentVolumeClaims => "pvc",
            Self::PersistentVolumes => "pv",
            Self::ServiceAccounts => "serviceaccount",
            Self::Namespaces => "namespace",
            Self::Nodes => "node",
            Self::Events => "event",
        }
    }

    pub fn kubectl_resource(self) -> &'static str {
        match self {
            Self::Pods => "pods",
            Self::Deployments => "deployments",
            Self::StatefulSets => "statefulsets",
            Self::DaemonSets => "daemonsets",
            Self::ReplicaSets => "replicasets",
            Self::Jobs => "jobs",
            Self::CronJobs => "cronjobs",
            Self::Hpas => "horizontalpodautoscalers",
            Self::Services => "services",
            Self::Ingresses => "ingresses",
            Self::ConfigMaps => "configmaps",
            Self::Secrets => "secrets",
            Self::PersistentVolumeClaims => "persistentvolumeclaims",
            Self::PersistentVolumes => "persistentvolumes",
            Self::ServiceAccounts => "serviceaccounts",
            Self::Namespaces => "namespaces",
            Self::Nodes => "nodes",
            Self::Events => "events",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "po" | "pod" | "pods" => Some(Self::Pods),
            "deploy" | "deployment" | "deployments" => Some(Self::Deployments),
            "sts" | "statefulset" | "statefulsets" => Some(Self::StatefulSets),
            "ds" | "daemonset" | "daemonsets" => Some(Self::DaemonSets),
            "rs" | "replicaset" | "replicasets" => Some(Self::ReplicaSets),
            "job" | "jobs" => Some(Self::Jobs),
            "cj" | "cronjob" | "cronjobs" => Some(Self::CronJobs),
            "hpa" | "hpas" | "horizontalpodautoscaler" | "horizontalpodautoscalers" => {
                Some(Self::Hpas)
            }
            "svc" | "service" | "services" => Some(Self::Services),
            "ing" | "ingress" | "ingresses" => Some(Self::Ingresses),
            "cm" | "configmap" | "configmaps" => Some(Self::ConfigMaps),
            "secret" | "secrets" => Some(Self::Secrets),
            "pvc" | "pvcs" | "persistentvolumeclaim" | "persistentvolumeclaims" => {
                Some(Self::PersistentVolumeClaims)
            }
            "pv" | "pvs" | "persistentvolume" | "persistentvolumes" => {
                Some(Self::PersistentVolumes)
            }
            "sa" | "serviceaccount" | "serviceaccounts" => Some(Self::ServiceAccounts),
            "ns" | "namespace" | "namespaces" => Some(Self::Namespaces),
            "no" | "node" | "nodes" => Some(Self::Nodes),
            "ev" | "event" | "events" => Some(Self::Events),
            _ => None,
        }
    }

    pub fn namespaced(self) -> bool {
        !matches!(
            self,
            Self::PersistentVolumes | Self::Namespaces | Self::Nodes
        )
    }

    pub fn supports_metrics(self) -> bool {
        matches!(self, Self::Pods | Self::Nodes)
    }

    pub fn supports_edit(self) -> bool {
        self != Self::Events
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NamespaceScope {
    All,
    Named(String),
}

impl NamespaceScope {
    pub fn label(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Named(namespace) => namespace.clone(),
        }
    }
}

impl Display for NamespaceScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Named(namespace) => write!(f, "{namespace}"),
        }
    }
}

/// A cluster object of one of the supported kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum KubeObject {
    Pod(Pod),
    Deployment(Deployment),
    StatefulSet(StatefulSet),
    DaemonSet(DaemonSet),
    ReplicaSet(ReplicaSet),
    Job(Job),
    CronJob(CronJob),
    Hpa(HorizontalPodAutoscaler),
    Service(Service),
    Ingress(Ingress),
    ConfigMap(ConfigMap),
    Secret(Secret),
    PersistentVolumeClaim(PersistentVolumeClaim),
    PersistentVolume(PersistentVolume),
    ServiceAccount(ServiceAccount),
    Namespace(Namespace),
    Node(Node),
    Event(Event),
}

impl KubeObject {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Pod(_) => ResourceKind::Pods,
            Self::Deployment(_) => ResourceKind::Deployments,
            Self::StatefulSet(_) => ResourceKind::StatefulSets,
            Self::DaemonSet(_) => ResourceKind::DaemonSets,
            Self::ReplicaSet(_) => ResourceKind::ReplicaSets,
            Self::Job(_) => ResourceKind::Jobs,
            Self::CronJob(_) => ResourceKind::CronJobs,
            Self::Hpa(_) => ResourceKind::Hpas,
            Self::Service(_) => ResourceKind::Services,
            Self::Ingress(_) => ResourceKind::Ingresses,
            Self::ConfigMap(_) => ResourceKind::ConfigMaps,
            Self::Secret(_) => ResourceKind::Secrets,
            Self::PersistentVolumeClaim(_) => ResourceKind::PersistentVolumeClaims,
            Self::PersistentVolume(_) => ResourceKind::PersistentVolumes,
            Self::ServiceAccount(_) => ResourceKind::ServiceAccounts,
            Self::Namespace(_) => ResourceKind::Namespaces,
            Self::Node(_) => ResourceKind::Nodes,
            Self::Event(_) => ResourceKind::Events,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Pod(value) => &value.metadata,
            Self::Deployment(value) => &value.metadata,
            Self::StatefulSet(value) => &value.metadata,
            Self::DaemonSet(value) => &value.metadata,
            Self::ReplicaSet(value) => &value.metadata,
            Self::Job(value) => &value.metadata,
            Self::CronJob(value) => &value.metadata,
            Self::Hpa(value) => &value.metadata,
            Self::Service(value) => &value.metadata,
            Self::Ingress(value) => &value.metadata,
            Self::ConfigMap(value) => &value.metadata,
            Self::Secret(value) => &value.metadata,
            Self::PersistentVolumeClaim(value) => &value.metadata,
            Self::PersistentVolume(value) => &value.metadata,
            Self::ServiceAccount(value) => &value.metadata,
            Self::Namespace(value) => &value.metadata,
            Self::Node(value) => &value.metadata,
            Self::Event(value) => &value.metadata,
        }
    }

    pub fn name(&self) -> String {
        self.metadata().name.clone().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<String> {
        if !self.kind().namespaced() {
            return None;
        }
        self.metadata().namespace.clone()
    }

    fn to_value(&self) -> serde_json::Result<Value> {
        match self {
            Self::Pod(value) => serde_json::to_value(value),
            Self::Deployment(value) => serde_json::to_value(value),
            Self::StatefulSet(value) => serde_json::to_value(value),
            Self::DaemonSet(value) => serde_json::to_value(value),
            Self::ReplicaSet(value) => serde_json::to_value(value),
            Self::Job(value) => serde_json::to_value(value),
            Self::CronJob(value) => serde_json::to_value(value),
            Self::Hpa(value) => serde_json::to_value(value),
            Self::Service(value) => serde_json::to_value(value),
            Self::Ingress(value) => serde_json::to_value(value),
            Self::ConfigMap(value) => serde_json::to_value(value),
            Self::Secret(value) => serde_json::to_value(value),
            Self::PersistentVolumeClaim(value) => serde_json::to_value(value),
            Self::PersistentVolume(value) => serde_json::to_value(value),
            Self::ServiceAccount(value) => serde_json::to_value(value),
            Self::Namespace(value) => serde_json::to_value(value),
            Self::Node(value) => serde_json::to_value(value),
            Self::Event(value) => serde_json::to_value(value),
        }
    }

    /// YAML manifest without `metadata.managedFields`.
    pub fn to_yaml(&self) -> String {
        let mut value = match self.to_value() {
            Ok(value) => value,
            Err(error) => return format!("# failed to serialize object: {error}\n"),
        };
        if let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) {
            metadata.remove("managedFields");
        }
        serde_yaml::to_string(&value)
            .unwrap_or_else(|error| format!("# failed to format object: {error}\n"))
    }
}

/// One panel row: the object plus its derived projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    pub object: KubeObject,
    pub name: String,
    pub namespace: Option<String>,
    pub status: String,
    pub ready: String,
    pub restarts: String,
    pub age: String,
    pub searchable: String,
    pub sort_key: i64,
}

impl ResourceRecord {
    pub fn kind(&self) -> ResourceKind {
        self.object.kind()
    }

    pub fn key(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}/{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn matches_filter(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }
        self.searchable
            .to_lowercase()
            .contains(&query.to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct MetricsSample {
    pub cpu_millicores: u64,
    pub memory_bytes: u64,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MetricsSnapshot {
    /// Keyed by `namespace/name`.
    pub pods: HashMap<String, MetricsSample>,
    pub nodes: HashMap<String, MetricsSample>,
}

impl MetricsSnapshot {
    pub fn sample_for(&self, record: &ResourceRecord) -> Option<MetricsSample> {
        match record.kind() {
            ResourceKind::Pods => self.pods.get(&record.key()).copied(),
            ResourceKind::Nodes => self.nodes.get(&record.name).copied(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty() && self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StatusTone {
    Good,
    Warn,
    Bad,
    Neutral,
}

impl StatusTone {
    pub fn of(status: &str) -> Self {
        match status {
            "Running" | "Ready" | "Active" | "Available" | "Bound" | "Complete" | "Succeeded"
            | "Normal" => Self::Good,
            "Pending" | "ContainerCreating" | "PodInitializing" | "Terminating"
            | "Progressing" | "Suspended" | "Released" | "Scaled Down" | "Updating" => {
                Self::Warn
            }
            "Failed" | "Error" | "CrashLoopBackOff" | "ImagePullBackOff" | "ErrImagePull"
            | "OOMKilled" | "NotReady" | "Warning" | "Lost" | "Evicted" => Self::Bad,
            _ => Self::Neutral,
        }
    }
}
