use crate::app::{AppCommand, AppEvent};
use crate::diff::{DiffViewer, diff_lines};
use crate::k8s::{self, ClusterGateway, GatewayError};
use crate::logs::{LogRequest, StreamHandle};
use crate::model::{KubeObject, MetricsSnapshot, NamespaceScope, ResourceKind, ResourceRecord};
use crate::panel::ResourceTarget;
use chrono::Utc;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub type EventSender = mpsc::UnboundedSender<AppEvent>;
pub type SharedGateway = Arc<dyn ClusterGateway>;

const WATCH_THROTTLE: Duration = Duration::from_millis(350);
const WATCH_RECONNECT_DELAY: Duration = Duration::from_millis(900);

/// Runs every command that only needs the gateway on its own task.
///
/// Commands tied to the terminal or the owner loop (watch, exec, edit, port-forward,
/// context switch) are returned untouched so the caller can handle them.
pub fn spawn_command(
    gateway: &SharedGateway,
    command: AppCommand,
    tx: &EventSender,
) -> Vec<AppCommand> {
    let mut foreground = Vec::new();
    spawn_into(gateway, command, tx, &mut foreground);
    foreground
}

fn spawn_into(
    gateway: &SharedGateway,
    command: AppCommand,
    tx: &EventSender,
    foreground: &mut Vec<AppCommand>,
) {
    let gateway = gateway.clone();
    let sender = tx.clone();
    match command {
        AppCommand::None => {}
        AppCommand::Batch(commands) => {
            for command in commands {
                spawn_into(&gateway, command, tx, foreground);
            }
        }
        AppCommand::Refresh { kind, scope, seq } => {
            tokio::spawn(async move {
                let event = refresh(gateway.as_ref(), kind, &scope, seq).await;
                let _ = sender.send(event);
            });
        }
        AppCommand::RefreshMetrics { scope } => {
            tokio::spawn(async move {
                if let Some(snapshot) = metrics(gateway.as_ref(), &scope).await {
                    let _ = sender.send(AppEvent::Metrics(snapshot));
                }
            });
        }
        AppCommand::StreamLogs { request, handle } => {
            spawn_log_stream(gateway, request, handle, sender);
        }
        AppCommand::LoadRevisionDiff { namespace, name } => {
            tokio::spawn(async move {
                let event = revision_diff(gateway.as_ref(), &namespace, &name).await;
                let _ = sender.send(event);
            });
        }
        AppCommand::LoadObject(target) => {
            tokio::spawn(async move {
                let event = load_object(gateway.as_ref(), target).await;
                let _ = sender.send(event);
            });
        }
        AppCommand::LoadContexts => {
            tokio::spawn(async move {
                let result = gateway
                    .list_contexts()
                    .await
                    .map_err(|error| error.to_string());
                let _ = sender.send(AppEvent::ContextsLoaded(result));
            });
        }
        AppCommand::LoadNamespaces => {
            tokio::spawn(async move {
                let result = namespace_names(gateway.as_ref())
                    .await
                    .map_err(|error| error.to_string());
                let _ = sender.send(AppEvent::NamespacesLoaded(result));
            });
        }
        command @ (AppCommand::Delete(_)
        | AppCommand::Patch { .. }
        | AppCommand::Scale { .. }
        | AppCommand::CreateJob { .. }
        | AppCommand::Rollback { .. }) => {
            tokio::spawn(async move {
                if let Some(event) = mutate(gateway.as_ref(), command).await {
                    let _ = sender.send(event);
                }
            });
        }
        command @ (AppCommand::Watch { .. }
        | AppCommand::SwitchContext(_)
        | AppCommand::ExecShell { .. }
        | AppCommand::EditResource(_)
        | AppCommand::StartPortForward { .. }) => foreground.push(command),
    }
}

/// Lists one kind and projects the rows against the current clock.
pub async fn refresh(
    gateway: &dyn ClusterGateway,
    kind: ResourceKind,
    scope: &NamespaceScope,
    seq: u64,
) -> AppEvent {
    let result = match gateway.list(kind, scope).await {
        Ok(objects) => {
            let now = Utc::now().timestamp();
            Ok(objects
                .into_iter()
                .map(|object| ResourceRecord::project(object, now))
                .collect())
        }
        Err(error) => {
            warn!("refresh of {kind} in {scope} failed: {error}");
            Err(error.to_string())
        }
    };
    AppEvent::Refreshed { kind, seq, result }
}

/// Fetches pod and node usage; `None` when both lookups failed.
pub async fn metrics(gateway: &dyn ClusterGateway, scope: &NamespaceScope) -> Option<MetricsSnapshot> {
    let (pods, nodes) = tokio::join!(gateway.pod_metrics(scope), gateway.node_metrics());
    if let (Err(pod_error), Err(node_error)) = (&pods, &nodes) {
        debug!("metrics unavailable: {pod_error}; {node_error}");
        return None;
    }
    Some(MetricsSnapshot {
        pods: pods.unwrap_or_default(),
        nodes: nodes.unwrap_or_default(),
    })
}

/// Fetches the live manifest of one object for the YAML viewer.
pub async fn load_object(gateway: &dyn ClusterGateway, target: ResourceTarget) -> AppEvent {
    let result = gateway
        .get(target.kind, target.namespace.as_deref(), &target.name)
        .await
        .map(|object| object.to_yaml())
        .map_err(|error| {
            debug!("get of {} failed: {error}", target.label());
            error.to_string()
        });
    AppEvent::ObjectLoaded { target, result }
}

async fn namespace_names(gateway: &dyn ClusterGateway) -> Result<Vec<String>, GatewayError> {
    let mut names = gateway
        .list(ResourceKind::Namespaces, &NamespaceScope::All)
        .await?
        .iter()
        .map(KubeObject::name)
        .collect::<Vec<_>>();
    names.sort();
    Ok(names)
}

/// Applies one mutation and reports its outcome.
pub async fn mutate(gateway: &dyn ClusterGateway, command: AppCommand) -> Option<AppEvent> {
    let event = match command {
        AppCommand::Delete(target) => outcome(
            gateway.delete(&target).await,
            &target,
            "delete",
            |()| format!("Deleted {}: {}", target.kind.singular(), target.name),
            vec![target.kind],
        ),
        AppCommand::Patch {
            target,
            patch,
            success,
        } => outcome(
            gateway.patch(&target, &patch).await,
            &target,
            "update",
            |()| success.clone(),
            vec![target.kind],
        ),
        AppCommand::Scale { target, replicas } => outcome(
            gateway.scale(&target, replicas).await,
            &target,
            "scale",
            |()| {
                format!(
                    "Scaled {} {} to {replicas}",
                    target.kind.singular(),
                    target.name
                )
            },
            vec![target.kind],
        ),
        AppCommand::CreateJob {
            namespace,
            cronjob,
            job,
        } => {
            let target = ResourceTarget {
                kind: ResourceKind::CronJobs,
                namespace: Some(namespace.clone()),
                name: cronjob.clone(),
            };
            outcome(
                gateway.create_job(&namespace, &job).await,
                &target,
                "trigger",
                |name| format!("Triggered cronjob {cronjob}: job {name}"),
                vec![ResourceKind::Jobs, ResourceKind::CronJobs],
            )
        }
        AppCommand::Rollback { namespace, name } => {
            let target = ResourceTarget {
                kind: ResourceKind::Deployments,
                namespace: Some(namespace.clone()),
                name: name.clone(),
            };
            outcome(
                gateway.rollback_deployment(&namespace, &name).await,
                &target,
                "roll back",
                |revision| format!("Rolled back deployment {name} to revision {revision}"),
                vec![ResourceKind::Deployments, ResourceKind::ReplicaSets],
            )
        }
        _ => return None,
    };
    Some(event)
}

fn outcome<T>(
    result: Result<T, GatewayError>,
    target: &ResourceTarget,
    verb: &str,
    success: impl FnOnce(T) -> String,
    refresh: Vec<ResourceKind>,
) -> AppEvent {
    match result {
        Ok(value) => {
            let message = success(value);
            info!("{message}");
            AppEvent::MutationSucceeded { message, refresh }
        }
        Err(error) => {
            warn!("failed to {verb} {}: {error}", target.label());
            let refresh = if error.is_not_found() {
                vec![target.kind]
            } else {
                Vec::new()
            };
            AppEvent::MutationFailed {
                message: format!("Failed to {verb} {}: {error}", target.label()),
                refresh,
            }
        }
    }
}

/// Diffs the pod templates of the two newest revisions of a deployment.
pub async fn revision_diff(gateway: &dyn ClusterGateway, namespace: &str, name: &str) -> AppEvent {
    let revisions = match gateway.deployment_revisions(namespace, name).await {
        Ok(revisions) => revisions,
        Err(error) => {
            return AppEvent::Error(format!(
                "Failed to load revisions of deployment {name}: {error}"
            ));
        }
    };

    let [.., previous, current] = revisions.as_slice() else {
        return AppEvent::Info(format!("Deployment {name} has no previous revision"));
    };
    let viewer = DiffViewer::new(
        format!("deployment {namespace}/{name}"),
        &format!("revision {} ({})", previous.number, previous.replica_set),
        &format!("revision {} ({})", current.number, current.replica_set),
        diff_lines(
            &k8s::template_yaml(&previous.template),
            &k8s::template_yaml(&current.template),
        ),
    );
    AppEvent::DiffReady(Box::new(viewer))
}

/// Forwards log lines until the stream ends, fails or the handle is cancelled.
pub fn spawn_log_stream(
    gateway: SharedGateway,
    request: LogRequest,
    handle: StreamHandle,
    tx: EventSender,
) -> JoinHandle<()> {
    let token = handle.token();
    let stream_id = handle.id();
    tokio::spawn(async move {
        if !request.follow {
            let snapshot = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                snapshot = gateway.snapshot_logs(&request) => snapshot,
            };
            let event = match snapshot {
                Ok(text) => {
                    for line in text.lines() {
                        if tx
                            .send(AppEvent::LogLine {
                                stream_id,
                                line: line.to_string(),
                            })
                            .is_err()
                        {
                            return;
                        }
                    }
                    AppEvent::LogStreamEnded { stream_id }
                }
                Err(error) => AppEvent::LogStreamFailed {
                    stream_id,
                    message: error.to_string(),
                },
            };
            let _ = tx.send(event);
            return;
        }

        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            opened = gateway.stream_logs(&request) => opened,
        };
        let mut lines = match opened {
            Ok(lines) => lines,
            Err(error) => {
                let _ = tx.send(AppEvent::LogStreamFailed {
                    stream_id,
                    message: error.to_string(),
                });
                return;
            }
        };
        debug!("log stream {stream_id} opened for {}/{}", request.namespace, request.pod);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                next = lines.next() => match next {
                    Some(Ok(line)) => {
                        if tx.send(AppEvent::LogLine { stream_id, line }).is_err() {
                            break;
                        }
                    }
                    Some(Err(error)) => {
                        let _ = tx.send(AppEvent::LogStreamFailed {
                            stream_id,
                            message: error.to_string(),
                        });
                        break;
                    }
                    None => {
                        let _ = tx.send(AppEvent::LogStreamEnded { stream_id });
                        break;
                    }
                },
            }
        }
        debug!("log stream {stream_id} closed");
    })
}

/// The single watch on the focused kind.
#[derive(Default)]
pub struct FocusWatch {
    current: Option<(ResourceKind, NamespaceScope, CancellationToken)>,
}

impl FocusWatch {
    /// Watches `kind` in `scope`, replacing any other watch; no-op when already watching it.
    pub fn ensure(
        &mut self,
        gateway: &SharedGateway,
        kind: ResourceKind,
        scope: NamespaceScope,
        tx: mpsc::UnboundedSender<ResourceKind>,
    ) {
        if let Some((current_kind, current_scope, _)) = &self.current
            && *current_kind == kind
            && *current_scope == scope
        {
            return;
        }
        self.stop();
        let token = CancellationToken::new();
        spawn_watch_task(gateway.clone(), kind, scope.clone(), tx, token.clone());
        self.current = Some((kind, scope, token));
    }

    pub fn stop(&mut self) {
        if let Some((_, _, token)) = self.current.take() {
            token.cancel();
        }
    }

    pub fn kind(&self) -> Option<ResourceKind> {
        self.current.as_ref().map(|(kind, _, _)| *kind)
    }
}

impl Drop for FocusWatch {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_watch_task(
    gateway: SharedGateway,
    kind: ResourceKind,
    scope: NamespaceScope,
    tx: mpsc::UnboundedSender<ResourceKind>,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while !token.is_cancelled() {
            let mut events = gateway.watch(kind, &scope);
            loop {
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    next = events.next() => next,
                };
                match next {
                    Some(Ok(())) => {
                        if tx.send(kind).is_err() {
                            return;
                        }
                    }
                    Some(Err(error)) => {
                        warn!("watch stream error for {}: {error}", kind.title());
                        break;
                    }
                    None => break,
                }
            }
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(WATCH_RECONNECT_DELAY) => {}
            }
        }
    })
}

pub fn should_process_watch_event(
    kind: ResourceKind,
    throttle: &mut HashMap<ResourceKind, Instant>,
) -> bool {
    let now = Instant::now();
    let Some(last) = throttle.get(&kind) else {
        throttle.insert(kind, now);
        return true;
    };

    if now.duration_since(*last) >= WATCH_THROTTLE {
        throttle.insert(kind, now);
        true
    } else {
        false
    }
}

pub fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}
