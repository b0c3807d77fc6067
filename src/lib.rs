pub mod application;
pub mod domain;
pub mod infrastructure;

use application::commands::{
    control_timer_impl, end_session_impl, login_impl, logout_impl, timer_state_impl,
    toggle_timer_impl, AppState,
};
use application::loopback::LoopbackProductivityClient;
use application::persistence_bridge::{
    BridgeOutcome, ChannelFeedback, Feedback, SessionPersistenceBridge,
};
use application::presentation::{
    ControlAction, ControlButtons, MiniTimer, SessionSummary, TimerDisplay, TimerView,
};
use application::timer_service::TimerService;
use domain::format::format_full_secs;
use infrastructure::config::auth_session_from_lookup;
use infrastructure::credential_store::{
    CredentialStore, InMemoryCredentialStore, KeyringCredentialStore,
};
use infrastructure::error::InfraError;
use infrastructure::notifier::DesktopNotifier;
use infrastructure::productivity_client::{ProductivityApiClient, ReqwestProductivityClient};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

const HELP: &str = "commands: start | pause | resume | stop | toggle | end | status | totals \
                    | login <user> <token> | logout | help | quit";
const SUBMISSION_GRACE: Duration = Duration::from_secs(5);

type ShellBridge = SessionPersistenceBridge<dyn CredentialStore, dyn ProductivityApiClient>;

enum ShellFlow {
    Continue,
    Quit,
}

struct Shell {
    state: Arc<AppState>,
    timer: TimerService,
    bridge: Arc<ShellBridge>,
    credentials: Arc<dyn CredentialStore>,
    pending: Vec<JoinHandle<BridgeOutcome>>,
}

fn print_toast(toast: Feedback) {
    match toast {
        Feedback::Success(message) => println!("✔ {message}"),
        Feedback::Error(message) => eprintln!("✖ {message}"),
    }
}

fn print_view(view: &TimerView) {
    println!("{}  {}", TimerDisplay::text(view), ControlButtons::for_view(view).render());
    if let Some(mini) = MiniTimer::render(view) {
        println!("  {mini}");
    }
    println!("  {}", SessionSummary::text(view));
}

impl Shell {
    fn track(&mut self, submission: Option<JoinHandle<BridgeOutcome>>) {
        self.pending.retain(|handle| !handle.is_finished());
        self.pending.extend(submission);
    }

    async fn handle_line(&mut self, line: &str) -> Result<ShellFlow, String> {
        let state = self.state.as_ref();
        let words = line.split_whitespace().collect::<Vec<_>>();
        let command = words.first().map(|word| word.to_ascii_lowercase()).unwrap_or_default();

        if let Some(action) = ControlAction::parse(&command) {
            let current = timer_state_impl(state, &self.timer).map_err(|error| error.to_string())?;
            if !ControlButtons::for_view(&current).allows(action) {
                return Err(format!(
                    "{} is not available while {}",
                    action.label(),
                    current.status.as_str()
                ));
            }
            let outcome =
                control_timer_impl(state, &self.timer, action).map_err(|error| error.to_string())?;
            print_view(&outcome.view);
            self.track(outcome.submission);
            return Ok(ShellFlow::Continue);
        }

        match (command.as_str(), words.get(1..).unwrap_or(&[])) {
            ("", _) => {}
            ("toggle", _) => {
                let outcome =
                    toggle_timer_impl(state, &self.timer).map_err(|error| error.to_string())?;
                print_view(&outcome.view);
                self.track(outcome.submission);
            }
            ("end", _) => {
                let outcome =
                    end_session_impl(state, &self.timer).map_err(|error| error.to_string())?;
                print_view(&outcome.view);
                self.track(outcome.submission);
            }
            ("status", _) => {
                let view = timer_state_impl(state, &self.timer).map_err(|error| error.to_string())?;
                print_view(&view);
            }
            ("totals", _) => {
                let totals = self
                    .bridge
                    .daily_totals()
                    .await
                    .map_err(|error| state.command_error("daily_totals", &error))?;
                if totals.is_empty() {
                    println!("no recorded focus time yet");
                }
                for total in totals {
                    println!("{}  {}", total.date, format_full_secs(total.total_duration));
                }
            }
            ("login", [user_id, access_token]) => {
                let session = login_impl(state, self.credentials.as_ref(), user_id, access_token)
                    .map_err(|error| error.to_string())?;
                println!("signed in as {}", session.user_id);
            }
            ("login", _) => return Err("usage: login <user> <token>".to_string()),
            ("logout", _) => {
                logout_impl(state, self.credentials.as_ref()).map_err(|error| error.to_string())?;
                println!("signed out");
            }
            ("help", _) => println!("{HELP}"),
            ("quit" | "exit", _) => return Ok(ShellFlow::Quit),
            (other, _) => return Err(format!("unknown command '{other}'. {HELP}")),
        }
        Ok(ShellFlow::Continue)
    }

    /// Gives uploads started by the last controls a short grace period before exit.
    async fn drain(&mut self, toasts: &mut UnboundedReceiver<Feedback>) {
        for handle in self.pending.drain(..) {
            match tokio::time::timeout(SUBMISSION_GRACE, handle).await {
                Ok(Ok(_)) => {}
                Ok(Err(error)) => warn!("interval upload task failed: {error}"),
                Err(_) => warn!("interval upload still pending at exit, giving up"),
            }
        }
        while let Ok(toast) = toasts.try_recv() {
            print_toast(toast);
        }
    }
}

async fn run_shell() -> Result<(), InfraError> {
    let workspace_root = std::env::current_dir()?;
    let state = Arc::new(AppState::new(workspace_root)?);
    let config = state.config().clone();

    let credentials: Arc<dyn CredentialStore> =
        match auth_session_from_lookup(|key| std::env::var(key).ok()) {
            Some(session) => Arc::new(InMemoryCredentialStore::with_session(session)),
            None => Arc::new(KeyringCredentialStore::default()),
        };
    match credentials.load_session() {
        Ok(Some(session)) => state.trust_session(&session)?,
        Ok(None) => warn!("no signed-in user; intervals will not be recorded"),
        Err(error) => warn!("could not read credentials: {error}"),
    }

    let client: Arc<dyn ProductivityApiClient> = if config.embedded_backend {
        Arc::new(LoopbackProductivityClient::new(Arc::clone(&state)))
    } else {
        Arc::new(ReqwestProductivityClient::new(&config.backend_url)?)
    };

    let (feedback, mut toasts) = ChannelFeedback::channel();
    let bridge: Arc<ShellBridge> =
        Arc::new(SessionPersistenceBridge::new(Arc::clone(&credentials), client).with_feedback(Arc::new(feedback)));
    let timer = TimerService::new(
        Arc::new(state.session_store()),
        bridge.clone(),
        Arc::new(DesktopNotifier::new(
            config.app_name.clone(),
            config.notifications_enabled,
        )),
        config.limits(),
    );
    timer.mount();
    info!("workspace database at {}", state.database_path().display());

    let mut views = timer.subscribe();
    let phase_task = tokio::spawn(async move {
        let mut phase = views.borrow_and_update().phase;
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            if view.phase != phase {
                phase = view.phase;
                println!("{}", TimerDisplay::text(&view));
            }
        }
    });

    println!("{}", config.app_name);
    print_view(&timer_state_impl(&state, &timer)?);
    println!("{HELP}");

    let mut shell = Shell {
        state,
        timer,
        bridge,
        credentials,
        pending: Vec::new(),
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match shell.handle_line(&line).await {
                    Ok(ShellFlow::Continue) => {}
                    Ok(ShellFlow::Quit) => break,
                    Err(message) => eprintln!("{message}"),
                }
            }
            Some(toast) = toasts.recv() => print_toast(toast),
        }
    }

    shell.timer.shutdown();
    shell.drain(&mut toasts).await;
    phase_task.abort();
    Ok(())
}

/// Terminal front end: bootstraps the workspace in the current directory and reads
/// timer commands from stdin until `quit` or end of input.
pub fn run() -> Result<(), InfraError> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_shell())
}
