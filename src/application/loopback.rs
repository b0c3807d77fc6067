use crate::application::commands::{daily_totals_impl, record_interval_impl, ApiResponse, AppState};
use crate::domain::models::{CompletedInterval, DailyTotal};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::productivity_client::ProductivityApiClient;
use async_trait::async_trait;
use std::sync::Arc;

/// Calls the productivity routes in-process, for running without a remote backend.
pub struct LoopbackProductivityClient {
    state: Arc<AppState>,
}

impl LoopbackProductivityClient {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Routes hit SQLite, so they run on the blocking pool.
    async fn call<F>(&self, route: F) -> Result<ApiResponse, InfraError>
    where
        F: FnOnce(&AppState) -> ApiResponse + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        tokio::task::spawn_blocking(move || route(&state))
            .await
            .map_err(|error| InfraError::Http(format!("loopback route failed: {error}")))
    }
}

#[async_trait]
impl ProductivityApiClient for LoopbackProductivityClient {
    async fn record_interval(
        &self,
        access_token: &str,
        interval: &CompletedInterval,
    ) -> Result<(), InfraError> {
        let body = serde_json::to_string(interval)?;
        let authorization = format!("Bearer {access_token}");
        self.call(move |state| record_interval_impl(state, Some(&authorization), &body))
            .await?
            .into_result()
            .map(|_| ())
    }

    async fn fetch_daily_totals(&self, access_token: &str) -> Result<Vec<DailyTotal>, InfraError> {
        let authorization = format!("Bearer {access_token}");
        let mut body = self
            .call(move |state| daily_totals_impl(state, Some(&authorization)))
            .await?
            .into_result()?;
        let totals = body
            .get_mut("dailyTotals")
            .map(serde_json::Value::take)
            .unwrap_or_default();
        if totals.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(totals)?)
    }
}
