use crate::application::bootstrap::bootstrap_workspace;
use crate::application::presentation::{ControlAction, TimerView};
use crate::application::productivity::ProductivityService;
use crate::application::timer_service::{ControlOutcome, TimerService};
use crate::domain::models::AuthSession;
use crate::infrastructure::config::{load_app_config, AppConfig};
use crate::infrastructure::credential_store::CredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::identity::{bearer_token, StaticTokenVerifier, TokenVerifier};
use crate::infrastructure::productivity_repository::SqliteProductivityRepository;
use crate::infrastructure::session_store::SqliteSessionStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const DUPLICATE_MESSAGE: &str = "Already data present";
const RECORDED_MESSAGE: &str = "Time has been added";
const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

pub struct AppState {
    database_path: PathBuf,
    logs_dir: PathBuf,
    config: AppConfig,
    productivity: ProductivityService<SqliteProductivityRepository>,
    verifier: StaticTokenVerifier,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        Self::with_lookup(workspace_root, |key| std::env::var(key).ok())
    }

    /// Like `new`, with `TASKAI_*` overrides read through `lookup`.
    pub fn with_lookup<F>(workspace_root: PathBuf, lookup: F) -> Result<Self, InfraError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config = load_app_config(&bootstrap.config_dir)?.with_overrides(lookup)?;

        Ok(Self {
            productivity: ProductivityService::new(std::sync::Arc::new(
                SqliteProductivityRepository::new(&bootstrap.database_path),
            )),
            database_path: bootstrap.database_path,
            logs_dir: bootstrap.logs_dir,
            config,
            verifier: StaticTokenVerifier::default(),
            log_guard: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn session_store(&self) -> SqliteSessionStore {
        SqliteSessionStore::new(&self.database_path)
    }

    /// Lets the in-process routes accept `session`'s bearer token.
    pub fn trust_session(&self, session: &AuthSession) -> Result<(), InfraError> {
        self.verifier.register(&session.access_token, &session.user_id)
    }

    pub fn revoke_session(&self, session: &AuthSession) -> Result<(), InfraError> {
        self.verifier.revoke(&session.access_token)
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

/// Status code plus JSON body, ready for whatever transport serves the routes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn failure(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "success": false, "message": message }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    /// Client-side view of the response: the body on 2xx, an error otherwise.
    pub fn into_result(self) -> Result<Value, InfraError> {
        if self.is_success() {
            return Ok(self.body);
        }
        if self.status == 401 {
            return Err(InfraError::Unauthenticated);
        }
        Err(InfraError::Http(format!(
            "productivity api error: http {}; {}",
            self.status,
            self.message().unwrap_or("no message")
        )))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordIntervalRequest {
    #[serde(default)]
    start_time: Option<f64>,
    #[serde(default)]
    end_time: Option<f64>,
}

fn authenticate(
    state: &AppState,
    command: &str,
    authorization: Option<&str>,
) -> Result<String, ApiResponse> {
    let Some(token) = bearer_token(authorization) else {
        state.log_error(command, "missing bearer token");
        return Err(ApiResponse::failure(401, UNAUTHORIZED_MESSAGE));
    };
    match state.verifier.verify(token) {
        Ok(Some(user_id)) => Ok(user_id),
        Ok(None) => {
            state.log_error(command, "unknown bearer token");
            Err(ApiResponse::failure(401, UNAUTHORIZED_MESSAGE))
        }
        Err(error) => {
            state.command_error(command, &error);
            Err(ApiResponse::failure(500, INTERNAL_ERROR_MESSAGE))
        }
    }
}

/// `POST /productivity/intervals`
pub fn record_interval_impl(state: &AppState, authorization: Option<&str>, body: &str) -> ApiResponse {
    const COMMAND: &str = "record_interval";
    let user_id = match authenticate(state, COMMAND, authorization) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    let request = match serde_json::from_str::<RecordIntervalRequest>(body) {
        Ok(request) => request,
        Err(error) => {
            state.log_error(COMMAND, &format!("malformed body: {error}"));
            return ApiResponse::failure(400, "Invalid request body");
        }
    };

    match state
        .productivity
        .record_interval(&user_id, request.start_time, request.end_time)
    {
        Ok(stored) => {
            state.log_info(
                COMMAND,
                &format!("{}s on {} for {}", stored.duration_seconds, stored.date, user_id),
            );
            ApiResponse::ok(json!({ "success": true, "message": RECORDED_MESSAGE }))
        }
        Err(InfraError::InvalidInterval(message)) => {
            state.log_error(COMMAND, &message);
            ApiResponse::failure(400, &message)
        }
        Err(InfraError::DuplicateInterval) => {
            state.log_error(COMMAND, DUPLICATE_MESSAGE);
            ApiResponse::failure(400, DUPLICATE_MESSAGE)
        }
        Err(InfraError::Unauthenticated) => ApiResponse::failure(401, UNAUTHORIZED_MESSAGE),
        Err(error) => {
            state.command_error(COMMAND, &error);
            ApiResponse::failure(500, INTERNAL_ERROR_MESSAGE)
        }
    }
}

/// `GET /productivity/daily-totals`
pub fn daily_totals_impl(state: &AppState, authorization: Option<&str>) -> ApiResponse {
    const COMMAND: &str = "daily_totals";
    let user_id = match authenticate(state, COMMAND, authorization) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    match state.productivity.daily_totals(&user_id) {
        Ok(totals) => ApiResponse::ok(json!({ "success": true, "dailyTotals": totals })),
        Err(error) => {
            state.command_error(COMMAND, &error);
            ApiResponse::failure(500, INTERNAL_ERROR_MESSAGE)
        }
    }
}

fn run_control<F>(
    state: &AppState,
    command: &str,
    control: F,
) -> Result<ControlOutcome, InfraError>
where
    F: FnOnce() -> Result<ControlOutcome, InfraError>,
{
    match control() {
        Ok(outcome) => {
            state.log_info(
                command,
                &format!(
                    "{} {} work={}s break={}s session={}s",
                    outcome.view.status.as_str(),
                    outcome.view.phase.as_str(),
                    outcome.view.work_seconds,
                    outcome.view.break_seconds,
                    outcome.view.session_work_seconds
                ),
            );
            Ok(outcome)
        }
        Err(error) => {
            state.command_error(command, &error);
            Err(error)
        }
    }
}

/// Runs one of the on-screen control buttons.
pub fn control_timer_impl(
    state: &AppState,
    timer: &TimerService,
    action: ControlAction,
) -> Result<ControlOutcome, InfraError> {
    let command = format!("{}_timer", action.label().to_ascii_lowercase());
    run_control(state, &command, || action.apply(timer))
}

pub fn toggle_timer_impl(state: &AppState, timer: &TimerService) -> Result<ControlOutcome, InfraError> {
    run_control(state, "toggle_timer", || timer.toggle())
}

pub fn end_session_impl(state: &AppState, timer: &TimerService) -> Result<ControlOutcome, InfraError> {
    run_control(state, "end_session", || timer.end_session())
}

pub fn timer_state_impl(state: &AppState, timer: &TimerService) -> Result<TimerView, InfraError> {
    timer.view().map_err(|error| {
        state.command_error("timer_state", &error);
        error
    })
}

/// Stores the identity issued by the auth provider and trusts it on the in-process routes.
pub fn login_impl(
    state: &AppState,
    credentials: &dyn CredentialStore,
    user_id: &str,
    access_token: &str,
) -> Result<AuthSession, InfraError> {
    const COMMAND: &str = "login";
    let (user_id, access_token) = (user_id.trim(), access_token.trim());
    if user_id.is_empty() || access_token.is_empty() {
        let error = InfraError::Credential("user id and access token are required".to_string());
        state.command_error(COMMAND, &error);
        return Err(error);
    }

    let session = AuthSession {
        user_id: user_id.to_string(),
        access_token: access_token.to_string(),
        expires_at: None,
    };
    credentials
        .save_session(&session)
        .and_then(|_| state.trust_session(&session))
        .map_err(|error| {
            state.command_error(COMMAND, &error);
            error
        })?;
    state.log_info(COMMAND, &format!("signed in as {user_id}"));
    Ok(session)
}

pub fn logout_impl(state: &AppState, credentials: &dyn CredentialStore) -> Result<(), InfraError> {
    const COMMAND: &str = "logout";
    let result = credentials.load_session().and_then(|session| {
        credentials.delete_session()?;
        match session {
            Some(session) => state.revoke_session(&session),
            None => Ok(()),
        }
    });
    match result {
        Ok(()) => {
            state.log_info(COMMAND, "signed out");
            Ok(())
        }
        Err(error) => {
            state.command_error(COMMAND, &error);
            Err(error)
        }
    }
}
