mod app;
mod cli;
mod config;
mod diff;
mod format;
mod input;
mod k8s;
mod kubectl;
mod logs;
mod modal;
mod model;
mod panel;
mod projection;
mod search;
mod tasks;
mod ui;
mod yaml;

use anyhow::{Context, Result};
use app::{App, AppCommand, AppEvent, AppSettings, PortForwardSession};
use clap::Parser;
use cli::CliArgs;
use config::RuntimeConfig;
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::StreamExt;
use k8s::KubeGateway;
use kubectl::Kubectl;
use model::ResourceKind;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::collections::{HashMap, VecDeque};
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tasks::{EventSender, FocusWatch, SharedGateway, compact_error, should_process_watch_event};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;
const UI_TICK: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let config = RuntimeConfig::load(args.config.as_deref())?;
    if let Some(source) = &config.source {
        info!("loaded runtime config from {}", source.display());
    }

    let gateway = KubeGateway::connect(args.kubeconfig.clone(), args.context.clone())
        .await
        .context("failed to connect to the cluster")?;
    let gateway: SharedGateway = Arc::new(gateway);

    if args.all_namespaces && args.namespace.is_some() {
        warn!("both --all-namespaces and --namespace were provided, using all namespaces");
    }

    let settings = AppSettings {
        context: gateway.context().to_string(),
        namespace: args
            .namespace
            .clone()
            .unwrap_or_else(|| gateway.namespace().to_string()),
        all_namespaces: args.all_namespaces,
        kinds: config.panels.clone(),
        log_capacity: config.log_buffer_lines,
        log_tail_lines: config.log_tail_lines,
        toast_ttl: config.toast_ttl,
        left_column_percent: config.left_column_percent,
    };
    let refresh_secs = args.refresh_secs.unwrap_or(config.refresh_secs).max(1);

    let mut app = App::new(settings);
    let kubectl = Kubectl::new(args.kubeconfig.clone(), gateway.context());
    run(&mut app, gateway, kubectl, refresh_secs).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    // The terminal owns stdout, so tracing goes to a file or nowhere.
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::sink).try_init();
        }
    }

    Ok(())
}

async fn run(
    app: &mut App,
    gateway: SharedGateway,
    kubectl: Kubectl,
    refresh_secs: u64,
) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, gateway, kubectl, refresh_secs).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

fn suspend_terminal_for_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode for subprocess")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen for subprocess")?;
    terminal
        .show_cursor()
        .context("failed to show cursor for subprocess")?;
    Ok(())
}

fn resume_terminal_after_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    enable_raw_mode().context("failed to re-enable raw mode after subprocess")?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)
        .context("failed to re-enter alternate screen after subprocess")?;
    terminal
        .clear()
        .context("failed to clear terminal after subprocess")?;
    Ok(())
}

/// Everything the owner loop needs besides the app and the terminal.
struct Runtime {
    gateway: SharedGateway,
    kubectl: Kubectl,
    events: EventSender,
    watch_tx: mpsc::UnboundedSender<ResourceKind>,
    swap_tx: mpsc::UnboundedSender<(String, SharedGateway)>,
    watch: FocusWatch,
    watch_throttle: HashMap<ResourceKind, Instant>,
    forwards: HashMap<u64, CancellationToken>,
}

impl Runtime {
    fn shutdown(&mut self) {
        self.watch.stop();
        for (id, token) in self.forwards.drain() {
            debug!("cancelling port-forward {id}");
            token.cancel();
        }
    }
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    gateway: SharedGateway,
    kubectl: Kubectl,
    refresh_secs: u64,
) -> Result<()> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (watch_tx, mut watch_rx) = mpsc::unbounded_channel::<ResourceKind>();
    let (swap_tx, mut swap_rx) = mpsc::unbounded_channel::<(String, SharedGateway)>();
    let mut runtime = Runtime {
        gateway,
        kubectl,
        events: events_tx,
        watch_tx,
        swap_tx,
        watch: FocusWatch::default(),
        watch_throttle: HashMap::new(),
        forwards: HashMap::new(),
    };

    let command = app.start();
    dispatch(terminal, app, &mut runtime, command).await?;

    let mut reader = EventStream::new();
    let mut ui_ticker = interval(UI_TICK);
    ui_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut refresh_ticker = interval(Duration::from_secs(refresh_secs));
    refresh_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    refresh_ticker.reset();

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        let command = tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        match input::map_key(app.mode(), key) {
                            Some(action) => {
                                debug!("action={action:?}");
                                app.apply_action(action)
                            }
                            None => AppCommand::None,
                        }
                    }
                    Some(Ok(Event::Resize(width, height))) => {
                        app.resize(width, height);
                        AppCommand::None
                    }
                    Some(Ok(_)) => AppCommand::None,
                    Some(Err(error)) => {
                        app.set_error(format!("terminal event error: {error}"));
                        AppCommand::None
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            _ = ui_ticker.tick() => {
                app.tick(Instant::now());
                AppCommand::None
            }
            _ = refresh_ticker.tick() => app.on_refresh_tick(),
            Some(event) = events_rx.recv() => {
                if let AppEvent::PortForwardExited { id, .. } = &event {
                    runtime.forwards.remove(id);
                }
                app.handle_event(event)
            }
            Some(kind) = watch_rx.recv() => {
                if runtime.watch.kind() == Some(kind)
                    && should_process_watch_event(kind, &mut runtime.watch_throttle)
                {
                    app.handle_event(AppEvent::WatchChanged(kind))
                } else {
                    AppCommand::None
                }
            }
            Some((context, gateway)) = swap_rx.recv() => {
                info!("switched to context {context}");
                let namespace = gateway.namespace().to_string();
                runtime.kubectl = runtime.kubectl.with_context(context.clone());
                debug!("kubectl now targets {}", runtime.kubectl.context());
                runtime.gateway = gateway;
                runtime.watch.stop();
                runtime.watch_throttle.clear();
                app.context_switched(context, namespace)
            }
        };

        dispatch(terminal, app, &mut runtime, command).await?;
    }

    runtime.shutdown();
    Ok(())
}

/// Hands gateway work to background tasks and runs the rest in place.
async fn dispatch(
    terminal: &mut TuiTerminal,
    app: &mut App,
    runtime: &mut Runtime,
    command: AppCommand,
) -> Result<()> {
    let mut pending = VecDeque::from([command]);
    while let Some(command) = pending.pop_front() {
        for foreground in tasks::spawn_command(&runtime.gateway, command, &runtime.events) {
            let follow_up = run_foreground(terminal, app, runtime, foreground).await?;
            pending.push_back(follow_up);
        }
    }
    Ok(())
}

async fn run_foreground(
    terminal: &mut TuiTerminal,
    app: &mut App,
    runtime: &mut Runtime,
    command: AppCommand,
) -> Result<AppCommand> {
    match command {
        AppCommand::Watch { kind, scope } => {
            runtime
                .watch
                .ensure(&runtime.gateway, kind, scope, runtime.watch_tx.clone());
            Ok(AppCommand::None)
        }
        AppCommand::SwitchContext(context) => {
            let gateway = runtime.gateway.clone();
            let swap_tx = runtime.swap_tx.clone();
            let events = runtime.events.clone();
            tokio::spawn(async move {
                match gateway.switch_context(&context).await {
                    Ok(next) => {
                        let _ = swap_tx.send((context, next));
                    }
                    Err(error) => {
                        let _ = events.send(AppEvent::Error(format!(
                            "Failed to switch to context {context}: {error}"
                        )));
                    }
                }
            });
            Ok(AppCommand::None)
        }
        AppCommand::ExecShell {
            namespace,
            pod,
            container,
        } => {
            let args = runtime
                .kubectl
                .exec_args(&namespace, &pod, container.as_deref());
            let result = run_attached(terminal, &runtime.kubectl, args).await?;
            match result {
                Ok(status) if status.success() => app.set_status(format!("Shell in {pod} closed")),
                Ok(status) => app.set_status(format!("Shell in {pod} exited ({status})")),
                Err(error) => app.set_error(compact_error(&error)),
            }
            Ok(AppCommand::None)
        }
        AppCommand::EditResource(target) => {
            let args = runtime.kubectl.edit_args(&target);
            let result = run_attached(terminal, &runtime.kubectl, args).await?;
            match result {
                Ok(status) if status.success() => {
                    app.set_status(format!("Edited {}", target.label()));
                    Ok(app.after_edit(target.kind))
                }
                Ok(status) => {
                    app.set_error(format!("kubectl edit exited with {status}"));
                    Ok(AppCommand::None)
                }
                Err(error) => {
                    app.set_error(compact_error(&error));
                    Ok(AppCommand::None)
                }
            }
        }
        AppCommand::StartPortForward {
            id,
            namespace,
            pod,
            local,
            remote,
        } => {
            let session = PortForwardSession {
                id,
                namespace,
                pod,
                local,
                remote,
            };
            let token = CancellationToken::new();
            match runtime
                .kubectl
                .spawn_port_forward(session, token.clone(), runtime.events.clone())
            {
                Ok(_) => {
                    runtime.forwards.insert(id, token);
                    Ok(AppCommand::None)
                }
                Err(error) => {
                    let message = compact_error(&error);
                    app.handle_event(AppEvent::PortForwardExited {
                        id,
                        message: message.clone(),
                    });
                    app.set_error(message);
                    Ok(AppCommand::None)
                }
            }
        }
        other => {
            warn!("unexpected foreground command {other:?}");
            Ok(AppCommand::None)
        }
    }
}

/// Gives the terminal to `kubectl` for the duration of an interactive command.
///
/// The outer error covers the terminal itself; the inner one is the subprocess.
async fn run_attached(
    terminal: &mut TuiTerminal,
    kubectl: &Kubectl,
    args: Vec<std::ffi::OsString>,
) -> Result<Result<std::process::ExitStatus>> {
    suspend_terminal_for_subprocess(terminal)?;
    let result = kubectl.run_interactive(args).await;
    resume_terminal_after_subprocess(terminal)?;
    Ok(result)
}
