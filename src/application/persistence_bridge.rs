use crate::application::NowProvider;
use crate::domain::models::{CompletedInterval, DailyTotal};
use crate::infrastructure::credential_store::CredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::productivity_client::ProductivityApiClient;
use async_trait::async_trait;
use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const SAVE_FAILED_MESSAGE: &str = "Error while saving time";
pub const STOP_SAVED_MESSAGE: &str = "Work session saved!";

/// What closed the segment being uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionTrigger {
    Pause,
    Stop,
}

impl SubmissionTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Stop => "stop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutcome {
    Recorded,
    Failed(String),
}

impl BridgeOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded)
    }
}

/// User-facing toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Success(String),
    Error(String),
}

pub trait FeedbackSink: Send + Sync {
    fn show(&self, feedback: Feedback);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedback;

impl FeedbackSink for LogFeedback {
    fn show(&self, feedback: Feedback) {
        match feedback {
            Feedback::Success(message) => info!("{message}"),
            Feedback::Error(message) => error!("{message}"),
        }
    }
}

/// Forwards toasts to whoever renders them.
#[derive(Debug, Clone)]
pub struct ChannelFeedback {
    sender: mpsc::UnboundedSender<Feedback>,
}

impl ChannelFeedback {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Feedback>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl FeedbackSink for ChannelFeedback {
    fn show(&self, feedback: Feedback) {
        if self.sender.send(feedback).is_err() {
            warn!("feedback receiver dropped");
        }
    }
}

/// Seam between the timer controller and whatever uploads closed segments.
#[async_trait]
pub trait IntervalRecorder: Send + Sync {
    async fn submit(&self, interval: CompletedInterval, trigger: SubmissionTrigger) -> BridgeOutcome;
}

/// Uploads completed running segments to the productivity API. One attempt per segment;
/// failures become an error toast and are otherwise dropped.
pub struct SessionPersistenceBridge<A, C>
where
    A: CredentialStore + ?Sized,
    C: ProductivityApiClient + ?Sized,
{
    credentials: Arc<A>,
    client: Arc<C>,
    feedback: Arc<dyn FeedbackSink>,
    now_provider: NowProvider,
}

impl<A, C> SessionPersistenceBridge<A, C>
where
    A: CredentialStore + ?Sized,
    C: ProductivityApiClient + ?Sized,
{
    pub fn new(credentials: Arc<A>, client: Arc<C>) -> Self {
        Self {
            credentials,
            client,
            feedback: Arc::new(LogFeedback),
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_feedback(mut self, feedback: Arc<dyn FeedbackSink>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    fn access_token(&self) -> Result<String, InfraError> {
        self.credentials
            .current_token((self.now_provider)())?
            .ok_or(InfraError::Unauthenticated)
    }

    pub async fn record_interval(&self, interval: &CompletedInterval) -> Result<(), InfraError> {
        interval.validate().map_err(InfraError::InvalidInterval)?;
        let token = self.access_token()?;
        self.client.record_interval(&token, interval).await
    }

    pub async fn daily_totals(&self) -> Result<Vec<DailyTotal>, InfraError> {
        let token = self.access_token()?;
        self.client.fetch_daily_totals(&token).await
    }
}

#[async_trait]
impl<A, C> IntervalRecorder for SessionPersistenceBridge<A, C>
where
    A: CredentialStore + ?Sized,
    C: ProductivityApiClient + ?Sized,
{
    async fn submit(&self, interval: CompletedInterval, trigger: SubmissionTrigger) -> BridgeOutcome {
        match self.record_interval(&interval).await {
            Ok(()) => {
                info!(
                    "recorded {}s interval after {}",
                    interval.duration_seconds(),
                    trigger.as_str()
                );
                if trigger == SubmissionTrigger::Stop {
                    self.feedback
                        .show(Feedback::Success(STOP_SAVED_MESSAGE.to_string()));
                }
                BridgeOutcome::Recorded
            }
            Err(error) => {
                warn!("failed to record interval after {}: {error}", trigger.as_str());
                self.feedback
                    .show(Feedback::Error(SAVE_FAILED_MESSAGE.to_string()));
                BridgeOutcome::Failed(error.to_string())
            }
        }
    }
}
