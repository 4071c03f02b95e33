use crate::format::{age_since, format_age, format_timestamp};
use crate::model::{KubeObject, ResourceKind, ResourceRecord};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{ContainerStatus, Event, Node, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ContainerRow {
    pub name: String,
    pub ready: bool,
    pub status: String,
    pub restarts: i32,
}

impl ResourceRecord {
    /// Derives the row projection; depends only on `object` and `now_seconds`.
    pub fn project(object: KubeObject, now_seconds: i64) -> Self {
        let name = object.name();
        let namespace = object.namespace();
        let metadata = object.metadata();
        let age = age_since(metadata.creation_timestamp.as_ref(), now_seconds);
        let created = metadata
            .creation_timestamp
            .as_ref()
            .map(|time| time.0.as_second())
            .unwrap_or(0);

        let (status, ready, restarts) = match &object {
            KubeObject::Pod(pod) => {
                let (ready, total) = pod_ready(pod);
                (
                    pod_status(pod),
                    format!("{ready}/{total}"),
                    pod_restarts(pod).to_string(),
                )
            }
            KubeObject::Deployment(deployment) => {
                let desired = deployment
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.replicas)
                    .unwrap_or(1);
                let status = deployment.status.as_ref();
                let ready = status.and_then(|status| status.ready_replicas).unwrap_or(0);
                let available = status
                    .and_then(|status| status.available_replicas)
                    .unwrap_or(0);
                (
                    rollout_status(desired, available),
                    format!("{ready}/{desired}"),
                    "-".to_string(),
                )
            }
            KubeObject::StatefulSet(statefulset) => {
                let desired = statefulset
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.replicas)
                    .unwrap_or(1);
                let ready = statefulset
                    .status
                    .as_ref()
                    .and_then(|status| status.ready_replicas)
                    .unwrap_or(0);
                (
                    rollout_status(desired, ready),
                    format!("{ready}/{desired}"),
                    "-".to_string(),
                )
            }
            KubeObject::DaemonSet(daemonset) => {
                let (desired, ready) = daemonset
                    .status
                    .as_ref()
                    .map(|status| (status.desired_number_scheduled, status.number_ready))
                    .unwrap_or((0, 0));
                (
                    rollout_status(desired, ready),
                    format!("{ready}/{desired}"),
                    "-".to_string(),
                )
            }
            KubeObject::ReplicaSet(replicaset) => {
                let desired = replicaset
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.replicas)
                    .unwrap_or(1);
                let ready = replicaset
                    .status
                    .as_ref()
                    .and_then(|status| status.ready_replicas)
                    .unwrap_or(0);
                (
                    rollout_status(desired, ready),
                    format!("{ready}/{desired}"),
                    "-".to_string(),
                )
            }
            KubeObject::Job(job) => {
                let completions = job
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.completions)
                    .unwrap_or(1);
                let succeeded = job
                    .status
                    .as_ref()
                    .and_then(|status| status.succeeded)
                    .unwrap_or(0);
                (
                    job_status(job),
                    format!("{succeeded}/{completions}"),
                    "-".to_string(),
                )
            }
            KubeObject::CronJob(cronjob) => (
                cronjob_status(cronjob),
                cronjob_active(cronjob).to_string(),
                "-".to_string(),
            ),
            KubeObject::Hpa(hpa) => {
                let current = hpa
                    .status
                    .as_ref()
                    .and_then(|status| status.current_replicas)
                    .unwrap_or(0);
                (
                    format!("{}-{}", hpa_min_replicas(hpa), hpa_max_replicas(hpa)),
                    format!("{current}/{}", hpa_desired_replicas(hpa)),
                    "-".to_string(),
                )
            }
            KubeObject::Service(service) => {
                let spec = service.spec.as_ref();
                (
                    spec.and_then(|spec| spec.type_.clone())
                        .unwrap_or_else(|| "ClusterIP".to_string()),
                    spec.and_then(|spec| spec.cluster_ip.clone())
                        .unwrap_or_else(|| "-".to_string()),
                    "-".to_string(),
                )
            }
            KubeObject::Ingress(ingress) => {
                let address = ingress
                    .status
                    .as_ref()
                    .and_then(|status| status.load_balancer.as_ref())
                    .and_then(|balancer| balancer.ingress.as_ref())
                    .and_then(|entries| entries.first())
                    .and_then(|entry| entry.ip.clone().or_else(|| entry.hostname.clone()));
                let class = ingress
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.ingress_class_name.clone())
                    .unwrap_or_else(|| "-".to_string());
                (
                    address.unwrap_or_else(|| "Pending".to_string()),
                    class,
                    "-".to_string(),
                )
            }
            KubeObject::ConfigMap(configmap) => {
                let keys = configmap.data.as_ref().map_or(0, BTreeMap::len)
                    + configmap.binary_data.as_ref().map_or(0, BTreeMap::len);
                (format!("{keys} keys"), "-".to_string(), "-".to_string())
            }
            KubeObject::Secret(secret) => {
                let keys = secret.data.as_ref().map_or(0, BTreeMap::len);
                (
                    secret.type_.clone().unwrap_or_else(|| "Opaque".to_string()),
                    format!("{keys} keys"),
                    "-".to_string(),
                )
            }
            KubeObject::PersistentVolumeClaim(claim) => {
                let capacity = claim
                    .status
                    .as_ref()
                    .and_then(|status| status.capacity.as_ref())
                    .and_then(storage_quantity)
                    .unwrap_or_else(|| "-".to_string());
                (
                    claim
                        .status
                        .as_ref()
                        .and_then(|status| status.phase.clone())
                        .unwrap_or_else(|| "Pending".to_string()),
                    capacity,
                    "-".to_string(),
                )
            }
            KubeObject::PersistentVolume(volume) => {
                let capacity = volume
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.capacity.as_ref())
                    .and_then(storage_quantity)
                    .unwrap_or_else(|| "-".to_string());
                (
                    volume
                        .status
                        .as_ref()
                        .and_then(|status| status.phase.clone())
                        .unwrap_or_else(|| "Pending".to_string()),
                    capacity,
                    "-".to_string(),
                )
            }
            KubeObject::ServiceAccount(account) => (
                "Active".to_string(),
                format!(
                    "{} secrets",
                    account.secrets.as_ref().map_or(0, Vec::len)
                ),
                "-".to_string(),
            ),
            KubeObject::Namespace(namespace) => (
                namespace
                    .status
                    .as_ref()
                    .and_then(|status| status.phase.clone())
                    .unwrap_or_else(|| "Active".to_string()),
                "-".to_string(),
                "-".to_string(),
            ),
            KubeObject::Node(node) => (node_status(node), "-".to_string(), "-".to_string()),
            KubeObject::Event(event) => (
                event.type_.clone().unwrap_or_else(|| "Normal".to_string()),
                event.reason.clone().unwrap_or_else(|| "-".to_string()),
                event.count.unwrap_or(1).to_string(),
            ),
        };

        let (searchable, sort_key, age) = match &object {
            KubeObject::Event(event) => {
                let last_seen = event_last_seen(event);
                let age = if last_seen > 0 {
                    format_age(now_seconds - last_seen)
                } else {
                    age
                };
                (event_searchable(event), last_seen, age)
            }
            _ => (name.clone(), created, age),
        };

        Self {
            object,
            name,
            namespace,
            status,
            ready,
            restarts,
            age,
            searchable,
            sort_key,
        }
    }
}

/// Events newest first; every other kind keeps server order.
pub fn sort_records(kind: ResourceKind, records: &mut [ResourceRecord]) {
    if kind == ResourceKind::Events {
        records.sort_by(|left, right| right.sort_key.cmp(&left.sort_key));
    }
}

fn rollout_status(desired: i32, ready: i32) -> String {
    if desired == 0 {
        "Scaled Down".to_string()
    } else if ready >= desired {
        "Available".to_string()
    } else {
        "Progressing".to_string()
    }
}

pub fn pod_status(pod: &Pod) -> String {
    if pod.metadata.deletion_timestamp.is_some() {
        return "Terminating".to_string();
    }

    let Some(status) = pod.status.as_ref() else {
        return "Unknown".to_string();
    };

    let ready = status
        .conditions
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .any(|condition| condition.type_ == "Ready" && condition.status == "True");
    if ready {
        return "Running".to_string();
    }

    let containers = status.container_statuses.as_deref().unwrap_or(&[]);
    let waiting = containers.iter().find_map(|container| {
        container
            .state
            .as_ref()
            .and_then(|state| state.waiting.as_ref())
            .and_then(|waiting| waiting.reason.clone())
            .filter(|reason| !reason.is_empty())
    });
    if let Some(reason) = waiting {
        return reason;
    }

    let terminated = containers.iter().find_map(|container| {
        container
            .state
            .as_ref()
            .and_then(|state| state.terminated.as_ref())
            .and_then(|terminated| terminated.reason.clone())
            .filter(|reason| !reason.is_empty())
    });
    if let Some(reason) = terminated {
        return reason;
    }

    status.phase.clone().unwrap_or_else(|| "Unknown".to_string())
}

/// `(ready containers, declared containers)`.
pub fn pod_ready(pod: &Pod) -> (usize, usize) {
    let total = pod.spec.as_ref().map_or(0, |spec| spec.containers.len());
    let ready = pod
        .status
        .as_ref()
        .and_then(|status| status.container_statuses.as_ref())
        .map_or(0, |statuses| statuses.iter().filter(|status| status.ready).count());
    (ready, total)
}

pub fn pod_restarts(pod: &Pod) -> i32 {
    pod.status
        .as_ref()
        .and_then(|status| status.container_statuses.as_ref())
        .map_or(0, |statuses| {
            statuses.iter().map(|status| status.restart_count).sum()
        })
}

pub fn pod_containers(pod: &Pod) -> Vec<String> {
    pod.spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .map(|container| container.name.clone())
                .collect()
        })
        .unwrap_or_default()
}

pub fn first_container_port(pod: &Pod) -> Option<i32> {
    pod.spec
        .as_ref()?
        .containers
        .iter()
        .filter_map(|container| container.ports.as_ref())
        .flatten()
        .map(|port| port.container_port)
        .next()
}

pub fn container_rows(pod: &Pod) -> Vec<ContainerRow> {
    let statuses = pod
        .status
        .as_ref()
        .and_then(|status| status.container_statuses.as_deref())
        .unwrap_or(&[]);

    pod_containers(pod)
        .into_iter()
        .map(|name| match statuses.iter().find(|status| status.name == name) {
            Some(status) => ContainerRow {
                name,
                ready: status.ready,
                status: container_state(status),
                restarts: status.restart_count,
            },
            None => ContainerRow {
                name,
                ready: false,
                status: "Pending".to_string(),
                restarts: 0,
            },
        })
        .collect()
}

fn container_state(container: &ContainerStatus) -> String {
    let Some(state) = container.state.as_ref() else {
        return "Unknown".to_string();
    };
    if state.running.is_some() {
        return "Running".to_string();
    }
    if let Some(waiting) = state.waiting.as_ref() {
        return waiting
            .reason
            .clone()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "Waiting".to_string());
    }
    if let Some(terminated) = state.terminated.as_ref() {
        return terminated
            .reason
            .clone()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| format!("Exit({})", terminated.exit_code));
    }
    "Unknown".to_string()
}

pub fn node_status(node: &Node) -> String {
    node.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .and_then(|conditions| {
            conditions
                .iter()
                .find(|condition| condition.type_ == "Ready")
        })
        .map(|condition| match condition.status.as_str() {
            "True" => "Ready",
            "False" => "NotReady",
            _ => "Unknown",
        })
        .unwrap_or("Unknown")
        .to_string()
}

pub fn cronjob_suspended(cronjob: &CronJob) -> bool {
    cronjob
        .spec
        .as_ref()
        .and_then(|spec| spec.suspend)
        .unwrap_or(false)
}

pub fn cronjob_status(cronjob: &CronJob) -> String {
    if cronjob_suspended(cronjob) {
        "Suspended".to_string()
    } else {
        "Active".to_string()
    }
}

fn cronjob_active(cronjob: &CronJob) -> usize {
    cronjob
        .status
        .as_ref()
        .and_then(|status| status.active.as_ref())
        .map_or(0, Vec::len)
}

fn job_status(job: &Job) -> String {
    let Some(status) = job.status.as_ref() else {
        return "Pending".to_string();
    };

    let condition = status.conditions.as_deref().unwrap_or(&[]).iter().find(|condition| {
        condition.status == "True" && matches!(condition.type_.as_str(), "Complete" | "Failed")
    });
    if let Some(condition) = condition {
        return condition.type_.clone();
    }
    if status.active.unwrap_or(0) > 0 {
        return "Running".to_string();
    }
    "Pending".to_string()
}

pub fn hpa_min_replicas(hpa: &HorizontalPodAutoscaler) -> i32 {
    hpa.spec
        .as_ref()
        .and_then(|spec| spec.min_replicas)
        .unwrap_or(1)
}

pub fn hpa_max_replicas(hpa: &HorizontalPodAutoscaler) -> i32 {
    hpa.spec.as_ref().map_or(0, |spec| spec.max_replicas)
}

fn hpa_desired_replicas(hpa: &HorizontalPodAutoscaler) -> i32 {
    hpa.status
        .as_ref()
        .map_or(0, |status| status.desired_replicas)
}

/// Current `spec.replicas` for kinds behind the scale subresource.
pub fn desired_replicas(object: &KubeObject) -> Option<i32> {
    match object {
        KubeObject::Deployment(deployment) => Some(
            deployment
                .spec
                .as_ref()
                .and_then(|spec| spec.replicas)
                .unwrap_or(1),
        ),
        KubeObject::StatefulSet(statefulset) => Some(
            statefulset
                .spec
                .as_ref()
                .and_then(|spec| spec.replicas)
                .unwrap_or(1),
        ),
        _ => None,
    }
}

/// Last-seen seconds, falling back to `eventTime` when unset.
pub fn event_last_seen(event: &Event) -> i64 {
    let last_seen = event
        .last_timestamp
        .as_ref()
        .map(|time| time.0.as_second())
        .unwrap_or(0);
    if last_seen != 0 {
        return last_seen;
    }
    event
        .event_time
        .as_ref()
        .map(|time| time.0.as_second())
        .unwrap_or(0)
}

fn event_searchable(event: &Event) -> String {
    [
        event.reason.as_deref().unwrap_or_default(),
        event.message.as_deref().unwrap_or_default(),
        event.involved_object.name.as_deref().unwrap_or_default(),
    ]
    .join(" ")
}

fn storage_quantity(values: &BTreeMap<String, Quantity>) -> Option<String> {
    values.get("storage").map(|quantity| quantity.0.clone())
}

fn pod_template_spec(object: &KubeObject) -> Option<&PodSpec> {
    match object {
        KubeObject::Deployment(value) => value.spec.as_ref()?.template.spec.as_ref(),
        KubeObject::StatefulSet(value) => value.spec.as_ref()?.template.spec.as_ref(),
        KubeObject::DaemonSet(value) => value.spec.as_ref()?.template.spec.as_ref(),
        KubeObject::ReplicaSet(value) => value.spec.as_ref()?.template.as_ref()?.spec.as_ref(),
        KubeObject::Job(value) => value.spec.as_ref()?.template.spec.as_ref(),
        KubeObject::CronJob(value) => value
            .spec
            .as_ref()?
            .job_template
            .spec
            .as_ref()?
            .template
            .spec
            .as_ref(),
        _ => None,
    }
}

/// Images of the pod template, `container=image` per entry.
pub fn template_images(object: &KubeObject) -> Vec<String> {
    pod_template_spec(object)
        .map(|spec| {
            spec.containers
                .iter()
                .map(|container| {
                    format!(
                        "{}={}",
                        container.name,
                        container.image.as_deref().unwrap_or("-")
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Labelled fields for the detail pane.
pub fn detail_fields(record: &ResourceRecord) -> Vec<(&'static str, String)> {
    let metadata = record.object.metadata();
    let mut fields = vec![("Name", record.name.clone())];
    if let Some(namespace) = record.namespace.as_ref() {
        fields.push(("Namespace", namespace.clone()));
    }
    fields.push(("Status", record.status.clone()));
    fields.push(("Age", record.age.clone()));
    fields.push((
        "Created",
        format_timestamp(metadata.creation_timestamp.as_ref()),
    ));

    match &record.object {
        KubeObject::Pod(pod) => {
            let spec = pod.spec.as_ref();
            let status = pod.status.as_ref();
            fields.push(("Ready", record.ready.clone()));
            fields.push(("Restarts", record.restarts.clone()));
            fields.push((
                "Node",
                spec.and_then(|spec| spec.node_name.clone())
                    .unwrap_or_else(|| "-".to_string()),
            ));
            fields.push((
                "Pod IP",
                status
                    .and_then(|status| status.pod_ip.clone())
                    .unwrap_or_else(|| "-".to_string()),
            ));
            fields.push((
                "QoS",
                status
                    .and_then(|status| status.qos_class.clone())
                    .unwrap_or_else(|| "-".to_string()),
            ));
        }
        KubeObject::Deployment(deployment) => {
            let status = deployment.status.as_ref();
            fields.push(("Ready", record.ready.clone()));
            fields.push((
                "Updated",
                status
                    .and_then(|status| status.updated_replicas)
                    .unwrap_or(0)
                    .to_string(),
            ));
            fields.push((
                "Available",
                status
                    .and_then(|status| status.available_replicas)
                    .unwrap_or(0)
                    .to_string(),
            ));
            fields.push((
                "Strategy",
                deployment
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.strategy.as_ref())
                    .and_then(|strategy| strategy.type_.clone())
                    .unwrap_or_else(|| "RollingUpdate".to_string()),
            ));
        }
        KubeObject::StatefulSet(_) | KubeObject::DaemonSet(_) | KubeObject::ReplicaSet(_) => {
            fields.push(("Ready", record.ready.clone()));
        }
        KubeObject::Job(job) => {
            let status = job.status.as_ref();
            fields.push(("Completions", record.ready.clone()));
            fields.push((
                "Failed",
                status
                    .and_then(|status| status.failed)
                    .unwrap_or(0)
                    .to_string(),
            ));
            fields.push((
                "Started",
                format_timestamp(status.and_then(|status| status.start_time.as_ref())),
            ));
            fields.push((
                "Completed",
                format_timestamp(status.and_then(|status| status.completion_time.as_ref())),
            ));
        }
        KubeObject::CronJob(cronjob) => {
            let spec = cronjob.spec.as_ref();
            fields.push((
                "Schedule",
                spec.map(|spec| spec.schedule.clone())
                    .unwrap_or_else(|| "-".to_string()),
            ));
            fields.push((
                "Last Schedule",
                format_timestamp(
                    cronjob
                        .status
                        .as_ref()
                        .and_then(|status| status.last_schedule_time.as_ref()),
                ),
            ));
            fields.push(("Active", cronjob_active(cronjob).to_string()));
            fields.push((
                "Concurrency",
                spec.and_then(|spec| spec.concurrency_policy.clone())
                    .unwrap_or_else(|| "Allow".to_string()),
            ));
            fields.push((
                "Suspend",
                if cronjob_suspended(cronjob) { "Yes" } else { "No" }.to_string(),
            ));
        }
        KubeObject::Hpa(hpa) => {
            let target = hpa
                .spec
                .as_ref()
                .map(|spec| {
                    format!(
                        "{}/{}",
                        spec.scale_target_ref.kind, spec.scale_target_ref.name
                    )
                })
                .unwrap_or_else(|| "-".to_string());
            fields.push(("Target", target));
            fields.push(("Min Replicas", hpa_min_replicas(hpa).to_string()));
            fields.push(("Max Replicas", hpa_max_replicas(hpa).to_string()));
            fields.push(("Current/Desired", record.ready.clone()));
        }
        KubeObject::Service(service) => {
            fields.push(("Cluster IP", record.ready.clone()));
            let ports = service
                .spec
                .as_ref()
                .and_then(|spec| spec.ports.as_ref())
                .map(|ports| {
                    ports
                        .iter()
                        .map(|port| {
                            format!(
                                "{}/{}",
                                port.port,
                                port.protocol.as_deref().unwrap_or("TCP")
                            )
                        })
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "-".to_string());
            fields.push(("Ports", ports));
        }
        KubeObject::Ingress(ingress) => {
            fields.push(("Class", record.ready.clone()));
            let hosts = ingress
                .spec
                .as_ref()
                .and_then(|spec| spec.rules.as_ref())
                .map(|rules| {
                    rules
                        .iter()
                        .filter_map(|rule| rule.host.clone())
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "*".to_string());
            fields.push(("Hosts", hosts));
        }
        KubeObject::ConfigMap(configmap) => {
            let keys = configmap
                .data
                .as_ref()
                .map(|data| data.keys().cloned().collect::<Vec<_>>().join(","))
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "-".to_string());
            fields.push(("Keys", keys));
        }
        KubeObject::Secret(_) => fields.push(("Data", record.ready.clone())),
        KubeObject::PersistentVolumeClaim(claim) => {
            let spec = claim.spec.as_ref();
            fields.push(("Capacity", record.ready.clone()));
            fields.push((
                "Volume",
                spec.and_then(|spec| spec.volume_name.clone())
                    .unwrap_or_else(|| "-".to_string()),
            ));
            fields.push((
                "Storage Class",
                spec.and_then(|spec| spec.storage_class_name.clone())
                    .unwrap_or_else(|| "-".to_string()),
            ));
        }
        KubeObject::PersistentVolume(volume) => {
            let spec = volume.spec.as_ref();
            fields.push(("Capacity", record.ready.clone()));
            fields.push((
                "Claim",
                spec.and_then(|spec| spec.claim_ref.as_ref())
                    .map(|claim| {
                        format!(
                            "{}/{}",
                            claim.namespace.as_deref().unwrap_or("-"),
                            claim.name.as_deref().unwrap_or("-")
                        )
                    })
                    .unwrap_or_else(|| "-".to_string()),
            ));
            fields.push((
                "Reclaim Policy",
                spec.and_then(|spec| spec.persistent_volume_reclaim_policy.clone())
                    .unwrap_or_else(|| "-".to_string()),
            ));
        }
        KubeObject::ServiceAccount(_) => fields.push(("Secrets", record.ready.clone())),
        KubeObject::Namespace(_) => {}
        KubeObject::Node(node) => {
            let status = node.status.as_ref();
            fields.push((
                "Kubelet",
                status
                    .and_then(|status| status.node_info.as_ref())
                    .map(|info| info.kubelet_version.clone())
                    .unwrap_or_else(|| "-".to_string()),
            ));
            fields.push((
                "Internal IP",
                status
                    .and_then(|status| status.addresses.as_ref())
                    .and_then(|addresses| {
                        addresses
                            .iter()
                            .find(|address| address.type_ == "InternalIP")
                    })
                    .map(|address| address.address.clone())
                    .unwrap_or_else(|| "-".to_string()),
            ));
            fields.push((
                "Schedulable",
                if node
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.unschedulable)
                    .unwrap_or(false)
                {
                    "No"
                } else {
                    "Yes"
                }
                .to_string(),
            ));
        }
        KubeObject::Event(event) => {
            fields.push(("Reason", record.ready.clone()));
            fields.push(("Count", record.restarts.clone()));
            fields.push((
                "Object",
                format!(
                    "{}/{}",
                    event.involved_object.kind.as_deref().unwrap_or("-"),
                    event.involved_object.name.as_deref().unwrap_or("-")
                ),
            ));
            fields.push((
                "Message",
                event.message.clone().unwrap_or_else(|| "-".to_string()),
            ));
        }
    }

    let labels = metadata.labels.as_ref().map_or(0, BTreeMap::len);
    fields.push(("Labels", labels.to_string()));
    fields
}

/// Plain-text summary in the spirit of `kubectl describe`.
pub fn describe(record: &ResourceRecord) -> String {
    let metadata = record.object.metadata();
    let mut out = String::new();
    for (label, value) in detail_fields(record) {
        if label == "Labels" {
            continue;
        }
        out.push_str(&format!("{:<16}{value}\n", format!("{label}:")));
    }

    push_map(&mut out, "Labels", metadata.labels.as_ref());
    push_map(&mut out, "Annotations", metadata.annotations.as_ref());

    if let KubeObject::Pod(pod) = &record.object {
        out.push_str("Containers:\n");
        for row in container_rows(pod) {
            out.push_str(&format!(
                "  {}: ready={} status={} restarts={}\n",
                row.name, row.ready, row.status, row.restarts
            ));
        }
    }

    let images = template_images(&record.object);
    if !images.is_empty() {
        out.push_str("Images:\n");
        for image in images {
            out.push_str(&format!("  {image}\n"));
        }
    }

    out
}

fn push_map(out: &mut String, label: &str, values: Option<&BTreeMap<String, String>>) {
    match values.filter(|values| !values.is_empty()) {
        None => out.push_str(&format!("{:<16}<none>\n", format!("{label}:"))),
        Some(values) => {
            out.push_str(&format!("{label}:\n"));
            for (key, value) in values {
                if key == "kubectl.kubernetes.io/last-applied-configuration" {
                    continue;
                }
                out.push_str(&format!("  {key}={value}\n"));
            }
        }
    }
}
