use crate::logs::LogRequest;
use crate::model::{KubeObject, MetricsSample, NamespaceScope, ResourceKind};
use crate::panel::ResourceTarget;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::BoxStream;
use futures::{AsyncBufReadExt, StreamExt, TryStreamExt, future};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::{CronJob, Job, JobSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, Event, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod,
    PodTemplateSpec, Secret, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ListMeta, ObjectMeta, OwnerReference};
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::api::{DeleteParams, ListParams, LogParams, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::runtime::watcher::{self, watcher};
use kube::{Api, Client, Config, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub const REVISION_ANNOTATION: &str = "deployment.kubernetes.io/revision";
const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";
const INSTANTIATE_ANNOTATION: &str = "cronjob.kubernetes.io/instantiate";
const LIST_PAGE_SIZE: u32 = 500;
const POD_TEMPLATE_HASH_LABEL: &str = "pod-template-hash";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{0}")]
    Transient(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("kubeconfig: {0}")]
    Config(String),
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<kube::Error> for GatewayError {
    fn from(error: kube::Error) -> Self {
        match &error {
            kube::Error::Api(response) => match response.code {
                401 | 403 => Self::Permission(response.message.clone()),
                404 => Self::NotFound(response.message.clone()),
                400 | 409 | 422 => Self::Invalid(response.message.clone()),
                _ => Self::Transient(response.message.clone()),
            },
            _ => Self::Transient(error.to_string()),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// One owned ReplicaSet of a Deployment, identified by its rollout revision.
#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    pub number: i64,
    pub replica_set: String,
    pub template: PodTemplateSpec,
}

/// Everything the dashboard asks of a cluster.
#[async_trait]
pub trait ClusterGateway: Send + Sync {
    fn context(&self) -> &str;
    fn namespace(&self) -> &str;

    async fn list(
        &self,
        kind: ResourceKind,
        scope: &NamespaceScope,
    ) -> GatewayResult<Vec<KubeObject>>;
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> GatewayResult<KubeObject>;
    /// Yields once per observed change of `kind` within `scope`.
    fn watch(
        &self,
        kind: ResourceKind,
        scope: &NamespaceScope,
    ) -> BoxStream<'static, GatewayResult<()>>;
    async fn delete(&self, target: &ResourceTarget) -> GatewayResult<()>;
    /// Strategic merge patch.
    async fn patch(&self, target: &ResourceTarget, patch: &Value) -> GatewayResult<()>;
    async fn scale(&self, target: &ResourceTarget, replicas: i32) -> GatewayResult<()>;
    /// Creates the job and returns the server-assigned name.
    async fn create_job(&self, namespace: &str, job: &Job) -> GatewayResult<String>;
    async fn stream_logs(
        &self,
        request: &LogRequest,
    ) -> GatewayResult<BoxStream<'static, GatewayResult<String>>>;
    async fn snapshot_logs(&self, request: &LogRequest) -> GatewayResult<String>;
    async fn pod_metrics(
        &self,
        scope: &NamespaceScope,
    ) -> GatewayResult<HashMap<String, MetricsSample>>;
    async fn node_metrics(&self) -> GatewayResult<HashMap<String, MetricsSample>>;
    /// Revisions oldest first.
    async fn deployment_revisions(
        &self,
        namespace: &str,
        name: &str,
    ) -> GatewayResult<Vec<Revision>>;
    /// Restores the previous revision's pod template and returns its number.
    async fn rollback_deployment(&self, namespace: &str, name: &str) -> GatewayResult<i64>;
    async fn list_contexts(&self) -> GatewayResult<Vec<String>>;
    async fn switch_context(&self, context: &str) -> GatewayResult<Arc<dyn ClusterGateway>>;
}

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
    default_namespace: String,
    kubeconfig_path: Option<PathBuf>,
}

impl KubeGateway {
    pub async fn connect(
        kubeconfig_path: Option<PathBuf>,
        context: Option<String>,
    ) -> GatewayResult<Self> {
        let explicit = kubeconfig_path.is_some();
        let kubeconfig_path = resolve_kubeconfig_path(kubeconfig_path);
        let kubeconfig = match (&kubeconfig_path, explicit) {
            (Some(path), true) => Some(Kubeconfig::read_from(path).map_err(|error| {
                GatewayError::Config(format!("failed to read {}: {error}", path.display()))
            })?),
            _ => Kubeconfig::read().ok(),
        };

        let config = if let Some(kubeconfig_value) = kubeconfig.clone() {
            let options = KubeConfigOptions {
                context: context.clone(),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig_value, &options)
                .await
                .map_err(|error| GatewayError::Config(error.to_string()))?
        } else {
            if context.is_some() {
                return Err(GatewayError::Config(
                    "kubeconfig not found; context selection is unavailable".to_string(),
                ));
            }
            Config::infer()
                .await
                .map_err(|error| GatewayError::Config(error.to_string()))?
        };

        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config).map_err(|error| {
            GatewayError::Config(format!("failed to initialize Kubernetes client: {error}"))
        })?;

        let active_context = context
            .or_else(|| {
                kubeconfig
                    .as_ref()
                    .and_then(|cfg| cfg.current_context.clone())
            })
            .unwrap_or_else(|| "in-cluster".to_string());
        info!(context = %active_context, namespace = %default_namespace, "connected");

        Ok(Self {
            client,
            context: active_context,
            default_namespace,
            kubeconfig_path: kubeconfig_path.filter(|path| path.exists()),
        })
    }

    fn namespaced<K>(&self, namespace: Option<&str>) -> GatewayResult<Api<K>>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        let namespace = namespace
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| GatewayError::Invalid("namespace is required".to_string()))?;
        Ok(Api::namespaced(self.client.clone(), namespace))
    }

    fn cluster<K>(&self) -> Api<K>
    where
        K: Resource<Scope = ClusterResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::all(self.client.clone())
    }

    fn scoped<K>(&self, scope: &NamespaceScope) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        match scope {
            NamespaceScope::All => Api::all(self.client.clone()),
            NamespaceScope::Named(namespace) => Api::namespaced(self.client.clone(), namespace),
        }
    }

    async fn list_namespaced<K>(&self, scope: &NamespaceScope) -> GatewayResult<Vec<K>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        Ok(list_all(&self.scoped::<K>(scope)).await?)
    }

    async fn list_cluster<K>(&self) -> GatewayResult<Vec<K>>
    where
        K: Resource<Scope = ClusterResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        Ok(list_all(&self.cluster::<K>()).await?)
    }

    fn watch_namespaced<K>(&self, scope: &NamespaceScope) -> BoxStream<'static, GatewayResult<()>>
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug
            + Send
            + 'static,
        <K as Resource>::DynamicType: Default + Eq + Hash + Clone + Send,
    {
        change_notifications(self.scoped::<K>(scope))
    }

    fn watch_cluster<K>(&self) -> BoxStream<'static, GatewayResult<()>>
    where
        K: Resource<Scope = ClusterResourceScope>
            + Clone
            + DeserializeOwned
            + Debug
            + Send
            + 'static,
        <K as Resource>::DynamicType: Default + Eq + Hash + Clone + Send,
    {
        change_notifications(self.cluster::<K>())
    }

    async fn metrics_list(
        &self,
        kind: &str,
        plural: &str,
        scope: &NamespaceScope,
    ) -> GatewayResult<Option<Vec<DynamicObject>>> {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", kind);
        let resource = ApiResource::from_gvk_with_plural(&gvk, plural);
        let api: Api<DynamicObject> = match scope {
            NamespaceScope::All => Api::all_with(self.client.clone(), &resource),
            NamespaceScope::Named(namespace) => {
                Api::namespaced_with(self.client.clone(), namespace, &resource)
            }
        };

        let outcome = metrics_outcome(list_all(&api).await);
        if matches!(outcome, Ok(None)) {
            debug!("metrics API not available for {kind}");
        }
        outcome
    }
}

async fn delete_with<K>(api: Api<K>, name: &str) -> GatewayResult<()>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let _ = api.delete(name, &DeleteParams::default()).await?;
    Ok(())
}

async fn patch_with<K>(api: Api<K>, name: &str, patch: &Value) -> GatewayResult<()>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let _ = api
        .patch(name, &PatchParams::default(), &Patch::Strategic(patch))
        .await?;
    Ok(())
}

async fn scale_with<K>(api: Api<K>, name: &str, replicas: i32) -> GatewayResult<()>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let patch = json!({ "spec": { "replicas": replicas } });
    let _ = api
        .patch_scale(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

fn change_notifications<K>(api: Api<K>) -> BoxStream<'static, GatewayResult<()>>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + 'static,
    <K as Resource>::DynamicType: Default + Eq + Hash + Clone + Send,
{
    watcher(api, watcher::Config::default())
        .filter_map(|event| {
            future::ready(match event {
                Ok(watcher::Event::Apply(_) | watcher::Event::Delete(_))
                | Ok(watcher::Event::InitDone) => Some(Ok(())),
                Ok(watcher::Event::Init | watcher::Event::InitApply(_)) => None,
                Err(error) => Some(Err(GatewayError::Transient(error.to_string()))),
            })
        })
        .boxed()
}

#[async_trait]
impl ClusterGateway for KubeGateway {
    fn context(&self) -> &str {
        &self.context
    }

    fn namespace(&self) -> &str {
        &self.default_namespace
    }

    async fn list(
        &self,
        kind: ResourceKind,
        scope: &NamespaceScope,
    ) -> GatewayResult<Vec<KubeObject>> {
        debug!(%kind, %scope, "listing");
        let objects = match kind {
            ResourceKind::Pods => wrap(self.list_namespaced::<Pod>(scope).await?, KubeObject::Pod),
            ResourceKind::Deployments => wrap(
                self.list_namespaced::<Deployment>(scope).await?,
                KubeObject::Deployment,
            ),
            ResourceKind::StatefulSets => wrap(
                self.list_namespaced::<StatefulSet>(scope).await?,
                KubeObject::StatefulSet,
            ),
            ResourceKind::DaemonSets => wrap(
                self.list_namespaced::<DaemonSet>(scope).await?,
                KubeObject::DaemonSet,
            ),
            ResourceKind::ReplicaSets => wrap(
                self.list_namespaced::<ReplicaSet>(scope).await?,
                KubeObject::ReplicaSet,
            ),
            ResourceKind::Jobs => wrap(self.list_namespaced::<Job>(scope).await?, KubeObject::Job),
            ResourceKind::CronJobs => wrap(
                self.list_namespaced::<CronJob>(scope).await?,
                KubeObject::CronJob,
            ),
            ResourceKind::Hpas => wrap(
                self.list_namespaced::<HorizontalPodAutoscaler>(scope)
                    .await?,
                KubeObject::Hpa,
            ),
            ResourceKind::Services => wrap(
                self.list_namespaced::<Service>(scope).await?,
                KubeObject::Service,
            ),
            ResourceKind::Ingresses => wrap(
                self.list_namespaced::<Ingress>(scope).await?,
                KubeObject::Ingress,
            ),
            ResourceKind::ConfigMaps => wrap(
                self.list_namespaced::<ConfigMap>(scope).await?,
                KubeObject::ConfigMap,
            ),
            ResourceKind::Secrets => wrap(
                self.list_namespaced::<Secret>(scope).await?,
                KubeObject::Secret,
            ),
            ResourceKind::PersistentVolumeClaims => wrap(
                self.list_namespaced::<PersistentVolumeClaim>(scope).await?,
                KubeObject::PersistentVolumeClaim,
            ),
            ResourceKind::PersistentVolumes => wrap(
                self.list_cluster::<PersistentVolume>().await?,
                KubeObject::PersistentVolume,
            ),
            ResourceKind::ServiceAccounts => wrap(
                self.list_namespaced::<ServiceAccount>(scope).await?,
                KubeObject::ServiceAccount,
            ),
            ResourceKind::Namespaces => wrap(
                self.list_cluster::<Namespace>().await?,
                KubeObject::Namespace,
            ),
            ResourceKind::Nodes => wrap(self.list_cluster::<Node>().await?, KubeObject::Node),
            ResourceKind::Events => wrap(
                self.list_namespaced::<Event>(scope).await?,
                KubeObject::Event,
            ),
        };
        Ok(objects)
    }

    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> GatewayResult<KubeObject> {
        let object = match kind {
            ResourceKind::Pods => KubeObject::Pod(self.namespaced(namespace)?.get(name).await?),
            ResourceKind::Deployments => {
                KubeObject::Deployment(self.namespaced(namespace)?.get(name).await?)
            }
            ResourceKind::StatefulSets => {
                KubeObject::StatefulSet(self.namespaced(namespace)?.get(name).await?)
            }
            ResourceKind::DaemonSets => {
                KubeObject::DaemonSet(self.namespaced(namespace)?.get(name).await?)
            }
            ResourceKind::ReplicaSets => {
                KubeObject::ReplicaSet(self.namespaced(namespace)?.get(name).await?)
            }
            ResourceKind::Jobs => KubeObject::Job(self.namespaced(namespace)?.get(name).await?),
            ResourceKind::CronJobs => {
                KubeObject::CronJob(self.namespaced(namespace)?.get(name).await?)
            }
            ResourceKind::Hpas => KubeObject::Hpa(self.namespaced(namespace)?.get(name).await?),
            ResourceKind::Services => {
                KubeObject::Service(self.namespaced(namespace)?.get(name).await?)
            }
            ResourceKind::Ingresses => {
                KubeObject::Ingress(self.namespaced(namespace)?.get(name).await?)
            }
            ResourceKind::ConfigMaps => {
                KubeObject::ConfigMap(self.namespaced(namespace)?.get(name).await?)
            }
            ResourceKind::Secrets => {
                KubeObject::Secret(self.namespaced(namespace)?.get(name).await?)
            }
            ResourceKind::PersistentVolumeClaims => {
                KubeObject::PersistentVolumeClaim(self.namespaced(namespace)?.get(name).await?)
            }
            ResourceKind::PersistentVolumes => {
                KubeObject::PersistentVolume(self.cluster().get(name).await?)
            }
            ResourceKind::ServiceAccounts => {
                KubeObject::ServiceAccount(self.namespaced(namespace)?.get(name).await?)
            }
            ResourceKind::Namespaces => KubeObject::Namespace(self.cluster().get(name).await?),
            ResourceKind::Nodes => KubeObject::Node(self.cluster().get(name).await?),
            ResourceKind::Events => KubeObject::Event(self.namespaced(namespace)?.get(name).await?),
        };
        Ok(object)
    }

    fn watch(
        &self,
        kind: ResourceKind,
        scope: &NamespaceScope,
    ) -> BoxStream<'static, GatewayResult<()>> {
        match kind {
            ResourceKind::Pods => self.watch_namespaced::<Pod>(scope),
            ResourceKind::Deployments => self.watch_namespaced::<Deployment>(scope),
            ResourceKind::StatefulSets => self.watch_namespaced::<StatefulSet>(scope),
            ResourceKind::DaemonSets => self.watch_namespaced::<DaemonSet>(scope),
            ResourceKind::ReplicaSets => self.watch_namespaced::<ReplicaSet>(scope),
            ResourceKind::Jobs => self.watch_namespaced::<Job>(scope),
            ResourceKind::CronJobs => self.watch_namespaced::<CronJob>(scope),
            ResourceKind::Hpas => self.watch_namespaced::<HorizontalPodAutoscaler>(scope),
            ResourceKind::Services => self.watch_namespaced::<Service>(scope),
            ResourceKind::Ingresses => self.watch_namespaced::<Ingress>(scope),
            ResourceKind::ConfigMaps => self.watch_namespaced::<ConfigMap>(scope),
            ResourceKind::Secrets => self.watch_namespaced::<Secret>(scope),
            ResourceKind::PersistentVolumeClaims => {
                self.watch_namespaced::<PersistentVolumeClaim>(scope)
            }
            ResourceKind::PersistentVolumes => self.watch_cluster::<PersistentVolume>(),
            ResourceKind::ServiceAccounts => self.watch_namespaced::<ServiceAccount>(scope),
            ResourceKind::Namespaces => self.watch_cluster::<Namespace>(),
            ResourceKind::Nodes => self.watch_cluster::<Node>(),
            ResourceKind::Events => self.watch_namespaced::<Event>(scope),
        }
    }

    async fn delete(&self, target: &ResourceTarget) -> GatewayResult<()> {
        let namespace = target.namespace.as_deref();
        let name = target.name.as_str();
        info!(target = %target.label(), "deleting");
        match target.kind {
            ResourceKind::Pods => delete_with(self.namespaced::<Pod>(namespace)?, name).await,
            ResourceKind::Deployments => {
                delete_with(self.namespaced::<Deployment>(namespace)?, name).await
            }
            ResourceKind::StatefulSets => {
                delete_with(self.namespaced::<StatefulSet>(namespace)?, name).await
            }
            ResourceKind::DaemonSets => {
                delete_with(self.namespaced::<DaemonSet>(namespace)?, name).await
            }
            ResourceKind::ReplicaSets => {
                delete_with(self.namespaced::<ReplicaSet>(namespace)?, name).await
            }
            ResourceKind::Jobs => delete_with(self.namespaced::<Job>(namespace)?, name).await,
            ResourceKind::CronJobs => {
                delete_with(self.namespaced::<CronJob>(namespace)?, name).await
            }
            ResourceKind::Hpas => {
                delete_with(self.namespaced::<HorizontalPodAutoscaler>(namespace)?, name).await
            }
            ResourceKind::Services => {
                delete_with(self.namespaced::<Service>(namespace)?, name).await
            }
            ResourceKind::Ingresses => {
                delete_with(self.namespaced::<Ingress>(namespace)?, name).await
            }
            ResourceKind::ConfigMaps => {
                delete_with(self.namespaced::<ConfigMap>(namespace)?, name).await
            }
            ResourceKind::Secrets => delete_with(self.namespaced::<Secret>(namespace)?, name).await,
            ResourceKind::PersistentVolumeClaims => {
                delete_with(self.namespaced::<PersistentVolumeClaim>(namespace)?, name).await
            }
            ResourceKind::PersistentVolumes => {
                delete_with(self.cluster::<PersistentVolume>(), name).await
            }
            ResourceKind::ServiceAccounts => {
                delete_with(self.namespaced::<ServiceAccount>(namespace)?, name).await
            }
            ResourceKind::Namespaces => delete_with(self.cluster::<Namespace>(), name).await,
            ResourceKind::Nodes | ResourceKind::Events => Err(GatewayError::Invalid(format!(
                "delete is not supported for {}",
                target.kind.title()
            ))),
        }
    }

    async fn patch(&self, target: &ResourceTarget, patch: &Value) -> GatewayResult<()> {
        let namespace = target.namespace.as_deref();
        let name = target.name.as_str();
        info!(target = %target.label(), "patching");
        match target.kind {
            ResourceKind::Deployments => {
                patch_with(self.namespaced::<Deployment>(namespace)?, name, patch).await
            }
            ResourceKind::StatefulSets => {
                patch_with(self.namespaced::<StatefulSet>(namespace)?, name, patch).await
            }
            ResourceKind::DaemonSets => {
                patch_with(self.namespaced::<DaemonSet>(namespace)?, name, patch).await
            }
            ResourceKind::CronJobs => {
                patch_with(self.namespaced::<CronJob>(namespace)?, name, patch).await
            }
            ResourceKind::Hpas => {
                patch_with(
                    self.namespaced::<HorizontalPodAutoscaler>(namespace)?,
                    name,
                    patch,
                )
                .await
            }
            other => Err(GatewayError::Invalid(format!(
                "patch is not supported for {}",
                other.title()
            ))),
        }
    }

    async fn scale(&self, target: &ResourceTarget, replicas: i32) -> GatewayResult<()> {
        let namespace = target.namespace.as_deref();
        let name = target.name.as_str();
        info!(target = %target.label(), replicas, "scaling");
        match target.kind {
            ResourceKind::Deployments => {
                scale_with(self.namespaced::<Deployment>(namespace)?, name, replicas).await
            }
            ResourceKind::StatefulSets => {
                scale_with(self.namespaced::<StatefulSet>(namespace)?, name, replicas).await
            }
            ResourceKind::ReplicaSets => {
                scale_with(self.namespaced::<ReplicaSet>(namespace)?, name, replicas).await
            }
            other => Err(GatewayError::Invalid(format!(
                "scale is not supported for {}",
                other.title()
            ))),
        }
    }

    async fn create_job(&self, namespace: &str, job: &Job) -> GatewayResult<String> {
        let api: Api<Job> = self.namespaced(Some(namespace))?;
        let created = api.create(&PostParams::default(), job).await?;
        Ok(created.name_any())
    }

    async fn stream_logs(
        &self,
        request: &LogRequest,
    ) -> GatewayResult<BoxStream<'static, GatewayResult<String>>> {
        let api: Api<Pod> = self.namespaced(Some(&request.namespace))?;
        let reader = api
            .log_stream(&request.pod, &log_params(request))
            .await?;
        Ok(reader
            .lines()
            .map_err(|error| GatewayError::Transient(error.to_string()))
            .boxed())
    }

    async fn snapshot_logs(&self, request: &LogRequest) -> GatewayResult<String> {
        let api: Api<Pod> = self.namespaced(Some(&request.namespace))?;
        Ok(api.logs(&request.pod, &log_params(request)).await?)
    }

    async fn pod_metrics(
        &self,
        scope: &NamespaceScope,
    ) -> GatewayResult<HashMap<String, MetricsSample>> {
        let Some(items) = self.metrics_list("PodMetrics", "pods", scope).await? else {
            return Ok(HashMap::new());
        };
        Ok(items
            .into_iter()
            .map(|metric| {
                let namespace = metric.namespace().unwrap_or_else(|| "-".to_string());
                let key = format!("{namespace}/{}", metric.name_any());
                (key, parse_pod_metrics_usage(&metric.data))
            })
            .collect())
    }

    async fn node_metrics(&self) -> GatewayResult<HashMap<String, MetricsSample>> {
        let Some(items) = self
            .metrics_list("NodeMetrics", "nodes", &NamespaceScope::All)
            .await?
        else {
            return Ok(HashMap::new());
        };
        Ok(items
            .into_iter()
            .map(|metric| {
                let sample = parse_usage_from_value(&metric.data["usage"]);
                (metric.name_any(), sample)
            })
            .collect())
    }

    async fn deployment_revisions(
        &self,
        namespace: &str,
        name: &str,
    ) -> GatewayResult<Vec<Revision>> {
        let deployments: Api<Deployment> = self.namespaced(Some(namespace))?;
        let deployment = deployments.get(name).await?;
        let uid = deployment.metadata.uid.clone().unwrap_or_default();
        let replica_sets: Api<ReplicaSet> = self.namespaced(Some(namespace))?;
        let owned = list_all(&replica_sets).await?;
        Ok(owned_revisions(&uid, owned))
    }

    async fn rollback_deployment(&self, namespace: &str, name: &str) -> GatewayResult<i64> {
        let revisions = self.deployment_revisions(namespace, name).await?;
        let Some(previous) = revisions.iter().rev().nth(1) else {
            return Err(GatewayError::Invalid(format!(
                "deployment {name} has no previous revision"
            )));
        };

        let api: Api<Deployment> = self.namespaced(Some(namespace))?;
        let mut deployment = api.get(name).await?;
        let Some(spec) = deployment.spec.as_mut() else {
            return Err(GatewayError::Invalid(format!("deployment {name} has no spec")));
        };
        spec.template = rollback_template(&previous.template);
        let _ = api
            .replace(name, &PostParams::default(), &deployment)
            .await?;
        info!(deployment = name, revision = previous.number, "rolled back");
        Ok(previous.number)
    }

    async fn list_contexts(&self) -> GatewayResult<Vec<String>> {
        let kubeconfig = match &self.kubeconfig_path {
            Some(path) => Kubeconfig::read_from(path),
            None => Kubeconfig::read(),
        }
        .map_err(|error| GatewayError::Config(error.to_string()))?;
        Ok(context_names(&kubeconfig))
    }

    async fn switch_context(&self, context: &str) -> GatewayResult<Arc<dyn ClusterGateway>> {
        let gateway =
            KubeGateway::connect(self.kubeconfig_path.clone(), Some(context.to_string())).await?;
        if let Some(path) = &self.kubeconfig_path {
            persist_current_context(path, context).await?;
        }
        Ok(Arc::new(gateway))
    }
}

fn wrap<K>(items: Vec<K>, variant: fn(K) -> KubeObject) -> Vec<KubeObject> {
    items.into_iter().map(variant).collect()
}

fn list_params() -> ListParams {
    ListParams::default().limit(LIST_PAGE_SIZE)
}

/// Lists every item, following continue tokens page by page.
async fn list_all<K>(api: &Api<K>) -> Result<Vec<K>, kube::Error>
where
    K: Clone + DeserializeOwned + Debug,
{
    let mut items = Vec::new();
    let mut params = list_params();
    loop {
        let page = api.list(&params).await?;
        items.extend(page.items);
        match next_continue(&page.metadata) {
            Some(token) => params = list_params().continue_token(&token),
            None => return Ok(items),
        }
    }
}

fn next_continue(metadata: &ListMeta) -> Option<String> {
    metadata
        .continue_
        .clone()
        .filter(|token| !token.is_empty())
}

/// A missing or unready metrics API means no samples, not a failure.
fn metrics_outcome<T>(result: Result<T, kube::Error>) -> GatewayResult<Option<T>> {
    match result {
        Ok(items) => Ok(Some(items)),
        Err(kube::Error::Api(status)) if matches!(status.code, 404 | 503) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

fn log_params(request: &LogRequest) -> LogParams {
    LogParams {
        container: request.container.clone(),
        follow: request.follow,
        tail_lines: request.tail_lines,
        since_seconds: request.since_seconds,
        previous: request.previous,
        timestamps: request.timestamps,
        ..LogParams::default()
    }
}

fn resolve_kubeconfig_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit
        .or_else(|| {
            std::env::var_os("KUBECONFIG")
                .and_then(|value| {
                    std::env::split_paths(&value).find(|path| !path.as_os_str().is_empty())
                })
        })
        .or_else(|| {
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".kube").join("config"))
        })
}

pub fn context_names(kubeconfig: &Kubeconfig) -> Vec<String> {
    let mut names = kubeconfig
        .contexts
        .iter()
        .map(|named| named.name.clone())
        .collect::<Vec<_>>();
    names.sort();
    names.dedup();
    names
}

/// Rewrites `current-context` in a kubeconfig document.
pub fn set_current_context(document: &str, context: &str) -> Result<String, serde_yaml::Error> {
    let mut value: serde_yaml::Value = serde_yaml::from_str(document)?;
    if let serde_yaml::Value::Mapping(mapping) = &mut value {
        mapping.insert(
            serde_yaml::Value::String("current-context".to_string()),
            serde_yaml::Value::String(context.to_string()),
        );
    }
    serde_yaml::to_string(&value)
}

async fn persist_current_context(path: &Path, context: &str) -> GatewayResult<()> {
    let config_error =
        |error: &dyn std::fmt::Display| GatewayError::Config(format!("{}: {error}", path.display()));
    let document = tokio::fs::read_to_string(path)
        .await
        .map_err(|error| config_error(&error))?;
    let updated = set_current_context(&document, context).map_err(|error| config_error(&error))?;
    tokio::fs::write(path, updated)
        .await
        .map_err(|error| config_error(&error))?;
    info!(context, "persisted current-context");
    Ok(())
}

/// Strategic merge patch that bumps the pod template and triggers a rollout.
pub fn restart_patch(now: DateTime<Utc>) -> Value {
    json!({
        "spec": {
            "template": {
                "metadata": {
                    "annotations": {
                        RESTARTED_AT_ANNOTATION: now.to_rfc3339_opts(SecondsFormat::Secs, true)
                    }
                }
            }
        }
    })
}

pub fn suspend_patch(suspend: bool) -> Value {
    json!({ "spec": { "suspend": suspend } })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpaBound {
    Min,
    Max,
}

impl HpaBound {
    pub fn field(self) -> &'static str {
        match self {
            Self::Min => "minReplicas",
            Self::Max => "maxReplicas",
        }
    }
}

pub fn hpa_bound_patch(bound: HpaBound, replicas: i32) -> Value {
    let mut spec = serde_json::Map::new();
    spec.insert(bound.field().to_string(), json!(replicas));
    json!({ "spec": spec })
}

/// Builds the Job a manual trigger of `cronjob` creates, or `None` without a uid.
pub fn manual_job_from_cronjob(cronjob: &CronJob) -> Option<Job> {
    let name = cronjob.metadata.name.clone()?;
    let uid = cronjob.metadata.uid.clone()?;
    let template = cronjob
        .spec
        .as_ref()
        .map(|spec| spec.job_template.clone())
        .unwrap_or_default();
    let template_metadata = template.metadata.unwrap_or_default();

    let mut annotations = template_metadata.annotations.unwrap_or_default();
    annotations.insert(INSTANTIATE_ANNOTATION.to_string(), "manual".to_string());

    Some(Job {
        metadata: ObjectMeta {
            generate_name: Some(format!("{name}-manual-")),
            namespace: cronjob.metadata.namespace.clone(),
            labels: template_metadata.labels,
            annotations: Some(annotations),
            owner_references: Some(vec![OwnerReference {
                api_version: "batch/v1".to_string(),
                kind: "CronJob".to_string(),
                name,
                uid,
                controller: Some(true),
                block_owner_deletion: Some(true),
            }]),
            ..ObjectMeta::default()
        },
        spec: Some(template.spec.unwrap_or_else(JobSpec::default)),
        status: None,
    })
}

/// ReplicaSets controlled by the deployment with `uid`, oldest revision first.
pub fn owned_revisions(uid: &str, replica_sets: Vec<ReplicaSet>) -> Vec<Revision> {
    let mut revisions = replica_sets
        .into_iter()
        .filter(|replica_set| {
            replica_set
                .metadata
                .owner_references
                .iter()
                .flatten()
                .any(|owner| owner.kind == "Deployment" && owner.uid == uid)
        })
        .filter_map(|replica_set| {
            let number = replica_set
                .metadata
                .annotations
                .as_ref()
                .and_then(|annotations| annotations.get(REVISION_ANNOTATION))
                .and_then(|value| value.parse::<i64>().ok())?;
            let template = replica_set.spec.as_ref()?.template.clone()?;
            Some(Revision {
                number,
                replica_set: replica_set.name_any(),
                template,
            })
        })
        .collect::<Vec<_>>();
    revisions.sort_by_key(|revision| revision.number);
    revisions
}

/// The stored template minus the label the ReplicaSet controller adds.
pub fn rollback_template(template: &PodTemplateSpec) -> PodTemplateSpec {
    let mut template = template.clone();
    if let Some(metadata) = template.metadata.as_mut()
        && let Some(labels) = metadata.labels.as_mut()
    {
        labels.remove(POD_TEMPLATE_HASH_LABEL);
    }
    template
}

/// YAML of a revision's template as shown in the version diff.
pub fn template_yaml(template: &PodTemplateSpec) -> String {
    let template = rollback_template(template);
    serde_yaml::to_string(&template).unwrap_or_else(|error| format!("# {error}\n"))
}

fn parse_pod_metrics_usage(data: &Value) -> MetricsSample {
    data.get("containers")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .fold(MetricsSample::default(), |total, container| {
            let usage = container
                .get("usage")
                .map(parse_usage_from_value)
                .unwrap_or_default();
            MetricsSample {
                cpu_millicores: total.cpu_millicores.saturating_add(usage.cpu_millicores),
                memory_bytes: total.memory_bytes.saturating_add(usage.memory_bytes),
            }
        })
}

fn parse_usage_from_value(value: &Value) -> MetricsSample {
    MetricsSample {
        cpu_millicores: value
            .get("cpu")
            .and_then(Value::as_str)
            .and_then(parse_cpu_millicores)
            .unwrap_or(0),
        memory_bytes: value
            .get("memory")
            .and_then(Value::as_str)
            .and_then(parse_memory_bytes)
            .unwrap_or(0),
    }
}

pub fn parse_cpu_millicores(value: &str) -> Option<u64> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    let (number, multiplier) = if let Some(number) = raw.strip_suffix('m') {
        (number, 1.0)
    } else if let Some(number) = raw.strip_suffix('u') {
        (number, 0.001)
    } else if let Some(number) = raw.strip_suffix('n') {
        (number, 0.000001)
    } else {
        (raw, 1000.0)
    };

    scaled(number, multiplier)
}

pub fn parse_memory_bytes(value: &str) -> Option<u64> {
    const UNITS: [(&str, f64); 12] = [
        ("Ei", 1_152_921_504_606_846_976.0),
        ("Pi", 1_125_899_906_842_624.0),
        ("Ti", 1_099_511_627_776.0),
        ("Gi", 1_073_741_824.0),
        ("Mi", 1_048_576.0),
        ("Ki", 1_024.0),
        ("E", 1_000_000_000_000_000_000.0),
        ("P", 1_000_000_000_000_000.0),
        ("T", 1_000_000_000_000.0),
        ("G", 1_000_000_000.0),
        ("M", 1_000_000.0),
        ("k", 1_000.0),
    ];

    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    for (suffix, multiplier) in UNITS {
        if let Some(number) = raw.strip_suffix(suffix) {
            return scaled(number, multiplier);
        }
    }
    if let Some(number) = raw.strip_suffix('K') {
        return scaled(number, 1_000.0);
    }
    if let Some(number) = raw.strip_suffix('m') {
        return scaled(number, 0.001);
    }
    scaled(raw, 1.0)
}

fn scaled(number: &str, multiplier: f64) -> Option<u64> {
    let numeric = number.parse::<f64>().ok()?;
    let value = (numeric * multiplier).round();
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value as u64)
}


#[cfg(test)]
mod tests {
    use super::{
        GatewayError, HpaBound, hpa_bound_patch, manual_job_from_cronjob, metrics_outcome,
        next_continue, owned_revisions, parse_cpu_millicores, parse_memory_bytes,
        parse_pod_metrics_usage, restart_patch, rollback_template, set_current_context,
        suspend_patch,
    };
    use chrono::{TimeZone, Utc};
    use k8s_openapi::api::apps::v1::{ReplicaSet, ReplicaSetSpec};
    use k8s_openapi::api::batch::v1::{CronJob, CronJobSpec, JobSpec, JobTemplateSpec};
    use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ListMeta, ObjectMeta, OwnerReference};
    use kube::core::Status;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn api_error(code: u16, message: &str) -> kube::Error {
        kube::Error::Api(Status::failure(message, "Failure").with_code(code).boxed())
    }

    #[test]
    fn missing_metrics_api_yields_no_samples() {
        let not_found = api_error(404, "the server could not find the requested resource");
        assert_eq!(metrics_outcome::<Vec<u8>>(Err(not_found)), Ok(None));
        assert_eq!(
            metrics_outcome::<Vec<u8>>(Err(api_error(503, "service unavailable"))),
            Ok(None)
        );
        assert_eq!(metrics_outcome(Ok(vec![1u8])), Ok(Some(vec![1u8])));
    }

    #[test]
    fn other_metrics_failures_keep_their_class() {
        assert_eq!(
            metrics_outcome::<Vec<u8>>(Err(api_error(403, "metrics forbidden"))),
            Err(GatewayError::Permission("metrics forbidden".to_string()))
        );
        assert_eq!(
            metrics_outcome::<Vec<u8>>(Err(api_error(500, "etcd timeout"))),
            Err(GatewayError::Transient("etcd timeout".to_string()))
        );
    }

    #[test]
    fn continue_token_is_followed_only_when_present() {
        let page = |token: Option<&str>| ListMeta {
            continue_: token.map(str::to_string),
            ..ListMeta::default()
        };
        assert_eq!(
            next_continue(&page(Some("eyJ2IjoibWV0YSJ9"))).as_deref(),
            Some("eyJ2IjoibWV0YSJ9")
        );
        assert_eq!(next_continue(&page(Some(""))), None);
        assert_eq!(next_continue(&page(None)), None);
    }

    fn pod_template(image: &str) -> PodTemplateSpec {
        PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: Some(BTreeMap::from([
                    ("app".to_string(), "api".to_string()),
                    ("pod-template-hash".to_string(), "abc123".to_string()),
                ])),
                ..ObjectMeta::default()
            }),
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "main".to_string(),
                    image: Some(image.to_string()),
                    ..Container::default()
                }],
                ..PodSpec::default()
            }),
        }
    }

    fn replica_set(name: &str, revision: &str, owner_uid: &str, image: &str) -> ReplicaSet {
        ReplicaSet {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                annotations: Some(BTreeMap::from([(
                    "deployment.kubernetes.io/revision".to_string(),
                    revision.to_string(),
                )])),
                owner_references: Some(vec![OwnerReference {
                    api_version: "apps/v1".to_string(),
                    kind: "Deployment".to_string(),
                    name: "api".to_string(),
                    uid: owner_uid.to_string(),
                    ..OwnerReference::default()
                }]),
                ..ObjectMeta::default()
            },
            spec: Some(ReplicaSetSpec {
                template: Some(pod_template(image)),
                ..ReplicaSetSpec::default()
            }),
            status: None,
        }
    }

    #[test]
    fn restart_patch_is_byte_exact() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).single();
        let patch = restart_patch(now.unwrap_or_default());
        assert_eq!(
            patch.to_string(),
            r#"{"spec":{"template":{"metadata":{"annotations":{"kubectl.kubernetes.io/restartedAt":"2024-03-09T14:05:07Z"}}}}}"#
        );
    }

    #[test]
    fn suspend_and_hpa_patches() {
        assert_eq!(suspend_patch(true).to_string(), r#"{"spec":{"suspend":true}}"#);
        assert_eq!(
            hpa_bound_patch(HpaBound::Min, 5).to_string(),
            r#"{"spec":{"minReplicas":5}}"#
        );
        assert_eq!(
            hpa_bound_patch(HpaBound::Max, 10).to_string(),
            r#"{"spec":{"maxReplicas":10}}"#
        );
    }

    #[test]
    fn manual_job_copies_the_template() {
        let job_spec = JobSpec {
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
        };
        let cronjob = CronJob {
            metadata: ObjectMeta {
                name: Some("report".to_string()),
                namespace: Some("default".to_string()),
                uid: Some("u-1".to_string()),
                ..ObjectMeta::default()
            },
            spec: Some(CronJobSpec {
                schedule: "*/5 * * * *".to_string(),
                job_template: JobTemplateSpec {
                    metadata: None,
                    spec: Some(job_spec.clone()),
                },
                ..CronJobSpec::default()
            }),
            status: None,
        };

        let job = manual_job_from_cronjob(&cronjob);
        let Some(job) = job else {
            panic!("expected a job");
        };
        assert_eq!(job.metadata.generate_name.as_deref(), Some("report-manual-"));
        assert_eq!(
            job.metadata
                .annotations
                .as_ref()
                .and_then(|annotations| annotations.get("cronjob.kubernetes.io/instantiate"))
                .map(String::as_str),
            Some("manual")
        );
        let owners = job.metadata.owner_references.clone().unwrap_or_default();
        let owner = &owners[0];
        assert_eq!(owner.kind, "CronJob");
        assert_eq!(owner.api_version, "batch/v1");
        assert_eq!(owner.name, "report");
        assert_eq!(owner.uid, "u-1");
        assert_eq!(owner.controller, Some(true));
        assert_eq!(owner.block_owner_deletion, Some(true));
        assert_eq!(job.spec, Some(job_spec));

        let mut without_uid = cronjob;
        without_uid.metadata.uid = None;
        assert!(manual_job_from_cronjob(&without_uid).is_none());
    }

    #[test]
    fn revisions_follow_owner_and_annotation() {
        let revisions = owned_revisions(
            "d-1",
            vec![
                replica_set("api-3", "3", "d-1", "api:3"),
                replica_set("api-1", "1", "d-1", "api:1"),
                replica_set("other-9", "9", "d-2", "other:9"),
                replica_set("api-2", "2", "d-1", "api:2"),
            ],
        );
        let numbers = revisions.iter().map(|rev| rev.number).collect::<Vec<_>>();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(revisions[2].replica_set, "api-3");
    }

    #[test]
    fn rollback_template_drops_hash_label() {
        let template = rollback_template(&pod_template("api:1"));
        let labels = template
            .metadata
            .and_then(|metadata| metadata.labels)
            .unwrap_or_default();
        assert!(labels.contains_key("app"));
        assert!(!labels.contains_key("pod-template-hash"));
    }

    #[test]
    fn parses_quantities() {
        assert_eq!(parse_cpu_millicores("250m"), Some(250));
        assert_eq!(parse_cpu_millicores("2"), Some(2000));
        assert_eq!(parse_cpu_millicores("1500000n"), Some(2));
        assert_eq!(parse_cpu_millicores(""), None);
        assert_eq!(parse_memory_bytes("128Mi"), Some(134_217_728));
        assert_eq!(parse_memory_bytes("1G"), Some(1_000_000_000));
        assert_eq!(parse_memory_bytes("2048"), Some(2048));
        assert_eq!(parse_memory_bytes("abc"), None);
    }

    #[test]
    fn pod_usage_sums_containers() {
        let data = json!({
            "containers": [
                { "name": "a", "usage": { "cpu": "100m", "memory": "10Mi" } },
                { "name": "b", "usage": { "cpu": "50m", "memory": "6Mi" } }
            ]
        });
        let sample = parse_pod_metrics_usage(&data);
        assert_eq!(sample.cpu_millicores, 150);
        assert_eq!(sample.memory_bytes, 16 * 1_048_576);
    }

    #[test]
    fn current_context_is_rewritten() {
        let document = "apiVersion: v1\ncurrent-context: dev\ncontexts: []\n";
        let updated = set_current_context(document, "prod");
        let Ok(updated) = updated else {
            panic!("valid yaml");
        };
        assert!(updated.contains("current-context: prod"));
        assert!(updated.contains("apiVersion: v1"));
    }
}
