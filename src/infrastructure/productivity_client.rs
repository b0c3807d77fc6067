use crate::domain::models::{CompletedInterval, DailyTotal};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

const INTERVALS_PATH: [&str; 2] = ["productivity", "intervals"];
const DAILY_TOTALS_PATH: [&str; 2] = ["productivity", "daily-totals"];

#[async_trait]
pub trait ProductivityApiClient: Send + Sync {
    async fn record_interval(
        &self,
        access_token: &str,
        interval: &CompletedInterval,
    ) -> Result<(), InfraError>;

    async fn fetch_daily_totals(&self, access_token: &str) -> Result<Vec<DailyTotal>, InfraError>;
}

#[derive(Debug, serde::Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ApiEnvelope {
    success: Option<bool>,
    message: Option<String>,
    daily_totals: Option<Vec<DailyTotal>>,
}

#[derive(Debug, Clone)]
pub struct ReqwestProductivityClient {
    client: Client,
    base_url: Url,
}

impl ReqwestProductivityClient {
    pub fn new(base_url: &str) -> Result<Self, InfraError> {
        let mut base_url = Url::parse(base_url.trim())
            .map_err(|error| InfraError::InvalidConfig(format!("invalid backend url: {error}")))?;
        if base_url.cannot_be_a_base() {
            return Err(InfraError::InvalidConfig(
                "backend url cannot be a base".to_string(),
            ));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    fn ensure_token(access_token: &str) -> Result<(), InfraError> {
        if access_token.trim().is_empty() {
            return Err(InfraError::Unauthenticated);
        }
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, InfraError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| InfraError::InvalidConfig("backend url cannot be a base".to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn api_error(status: StatusCode, body: &str) -> InfraError {
        if status == StatusCode::UNAUTHORIZED {
            return InfraError::Unauthenticated;
        }
        let message = serde_json::from_str::<ApiEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.message)
            .filter(|message| !message.trim().is_empty());
        match message {
            Some(message) => InfraError::Http(format!(
                "productivity api error: http {}; {message}",
                status.as_u16()
            )),
            None if body.trim().is_empty() => {
                InfraError::Http(format!("productivity api error: http {}", status.as_u16()))
            }
            None => InfraError::Http(format!(
                "productivity api error: http {}; body={body}",
                status.as_u16()
            )),
        }
    }

    fn parse_envelope(body: &str) -> Result<ApiEnvelope, InfraError> {
        if body.trim().is_empty() {
            return Ok(ApiEnvelope::default());
        }
        serde_json::from_str(body).map_err(|error| {
            InfraError::Http(format!("invalid productivity api payload: {error}; body={body}"))
        })
    }
}

#[async_trait]
impl ProductivityApiClient for ReqwestProductivityClient {
    async fn record_interval(
        &self,
        access_token: &str,
        interval: &CompletedInterval,
    ) -> Result<(), InfraError> {
        Self::ensure_token(access_token)?;

        let response = self
            .client
            .post(self.endpoint(&INTERVALS_PATH)?)
            .bearer_auth(access_token)
            .json(interval)
            .send()
            .await
            .map_err(|error| InfraError::Http(format!("network error while recording interval: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Http(format!("failed reading record response: {error}")))?;

        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }

        let envelope = Self::parse_envelope(&body)?;
        if envelope.success == Some(false) {
            return Err(InfraError::Http(format!(
                "productivity api rejected interval: {}",
                envelope.message.unwrap_or_else(|| "no message".to_string())
            )));
        }
        Ok(())
    }

    async fn fetch_daily_totals(&self, access_token: &str) -> Result<Vec<DailyTotal>, InfraError> {
        Self::ensure_token(access_token)?;

        let response = self
            .client
            .get(self.endpoint(&DAILY_TOTALS_PATH)?)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| InfraError::Http(format!("network error while fetching totals: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Http(format!("failed reading totals response: {error}")))?;

        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }

        Ok(Self::parse_envelope(&body)?.daily_totals.unwrap_or_default())
    }
}
