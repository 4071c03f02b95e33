use crate::app::{AppEvent, PortForwardSession};
use crate::panel::ResourceTarget;
use crate::tasks::EventSender;
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command as TokioCommand;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const DEFAULT_SHELL: &str = "sh";

/// `kubectl` bound to the dashboard's kubeconfig and context.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Kubectl {
    kubeconfig: Option<PathBuf>,
    context: String,
}

impl Kubectl {
    pub fn new(kubeconfig: Option<PathBuf>, context: impl Into<String>) -> Self {
        Self {
            kubeconfig,
            context: context.into(),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Same kubeconfig, pointed at another context.
    pub fn with_context(&self, context: impl Into<String>) -> Self {
        Self::new(self.kubeconfig.clone(), context)
    }

    fn base_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(path) = &self.kubeconfig {
            args.push(OsString::from("--kubeconfig"));
            args.push(path.clone().into_os_string());
        }
        if !self.context.is_empty() {
            args.push(OsString::from("--context"));
            args.push(OsString::from(&self.context));
        }
        args
    }

    pub fn exec_args(&self, namespace: &str, pod: &str, container: Option<&str>) -> Vec<OsString> {
        let mut args = self.base_args();
        args.extend(["exec", "-it", "-n", namespace, pod].map(OsString::from));
        if let Some(container) = container {
            args.push(OsString::from("-c"));
            args.push(OsString::from(container));
        }
        args.extend(["--", DEFAULT_SHELL].map(OsString::from));
        args
    }

    pub fn edit_args(&self, target: &ResourceTarget) -> Vec<OsString> {
        let mut args = self.base_args();
        args.push(OsString::from("edit"));
        args.push(OsString::from(target.kind.kubectl_resource()));
        args.push(OsString::from(&target.name));
        if let Some(namespace) = &target.namespace {
            args.push(OsString::from("-n"));
            args.push(OsString::from(namespace));
        }
        args
    }

    pub fn port_forward_args(&self, session: &PortForwardSession) -> Vec<OsString> {
        let mut args = self.base_args();
        args.extend(
            [
                "port-forward".to_string(),
                "-n".to_string(),
                session.namespace.clone(),
                format!("pod/{}", session.pod),
                format!("{}:{}", session.local, session.remote),
            ]
            .map(OsString::from),
        );
        args
    }

    /// Runs `kubectl` attached to the terminal and waits for it.
    pub async fn run_interactive(&self, args: Vec<OsString>) -> Result<ExitStatus> {
        let mut cmd = TokioCommand::new("kubectl");
        cmd.args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(editor) = kube_editor(
            std::env::var_os("KUBE_EDITOR"),
            std::env::var_os("EDITOR"),
        ) {
            cmd.env("KUBE_EDITOR", editor);
        }
        debug!("running kubectl {args:?}");
        cmd.status()
            .await
            .context("failed to run kubectl; is it installed and on PATH?")
    }

    /// Starts a background port-forward that ends when `token` is cancelled.
    pub fn spawn_port_forward(
        &self,
        session: PortForwardSession,
        token: CancellationToken,
        tx: EventSender,
    ) -> Result<JoinHandle<()>> {
        let mut child = TokioCommand::new("kubectl")
            .args(self.port_forward_args(&session))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| {
                format!(
                    "failed to spawn port-forward for {}/{}",
                    session.namespace, session.pod
                )
            })?;
        info!(
            "port-forward {} {}/{} {}:{} started",
            session.id, session.namespace, session.pod, session.local, session.remote
        );

        Ok(tokio::spawn(async move {
            let status = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                status = child.wait() => Some(status),
            };
            let target = format!(
                "{}/{} {}:{}",
                session.namespace, session.pod, session.local, session.remote
            );
            let message = match status {
                None => {
                    let _ = child.kill().await;
                    format!("Port-forward stopped: {target}")
                }
                Some(Ok(status)) if status.success() => format!("Port-forward closed: {target}"),
                Some(Ok(status)) => format!("Port-forward exited ({status}) for {target}"),
                Some(Err(error)) => format!("Port-forward failed for {target}: {error}"),
            };
            let _ = tx.send(AppEvent::PortForwardExited {
                id: session.id,
                message,
            });
        }))
    }
}

/// Editor handed to `kubectl edit`: an explicit `KUBE_EDITOR` wins, then `EDITOR`.
fn kube_editor(kube_editor: Option<OsString>, editor: Option<OsString>) -> Option<OsString> {
    kube_editor.or(editor).filter(|value| !value.is_empty())
}
