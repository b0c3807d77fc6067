use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
}

impl TimerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    #[default]
    Work,
    Break,
}

impl TimerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Break => "break",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Work => Self::Break,
            Self::Break => Self::Work,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "work" => Some(Self::Work),
            "break" => Some(Self::Break),
            _ => None,
        }
    }
}

/// Phase thresholds in whole seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerLimits {
    pub work_limit_seconds: u64,
    pub break_limit_seconds: u64,
}

impl Default for TimerLimits {
    fn default() -> Self {
        Self {
            work_limit_seconds: 30 * 60,
            break_limit_seconds: 5 * 60,
        }
    }
}

impl TimerLimits {
    pub fn validate(&self) -> Result<(), String> {
        if self.work_limit_seconds == 0 {
            return Err("limits.work_limit_seconds must be > 0".to_string());
        }
        if self.break_limit_seconds == 0 {
            return Err("limits.break_limit_seconds must be > 0".to_string());
        }
        Ok(())
    }

    pub fn limit_for(&self, phase: TimerPhase) -> u64 {
        match phase {
            TimerPhase::Work => self.work_limit_seconds,
            TimerPhase::Break => self.break_limit_seconds,
        }
    }
}

/// Committed (non-live) timer fields that survive a reload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PersistedAccumulators {
    #[serde(default)]
    pub phase: TimerPhase,
    pub work_time_accum_seconds: u64,
    pub break_time_accum_seconds: u64,
    pub session_total_work_seconds: u64,
    pub session_iterations: f64,
}

impl PersistedAccumulators {
    /// Iterations as a whole number of half-cycles. Garbage values read back as zero.
    pub fn half_cycles(&self) -> u64 {
        let doubled = self.session_iterations * 2.0;
        if doubled.is_finite() && doubled >= 0.0 {
            doubled.round() as u64
        } else {
            0
        }
    }
}

/// One continuous running segment, `[start_time, end_time)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedInterval {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
}

impl CompletedInterval {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Option<Self> {
        if end_time <= start_time {
            return None;
        }
        Some(Self {
            start_time,
            end_time,
        })
    }

    pub fn from_millis(start_ms: i64, end_ms: i64) -> Option<Self> {
        let start_time = Utc.timestamp_millis_opt(start_ms).single()?;
        let end_time = Utc.timestamp_millis_opt(end_ms).single()?;
        Self::new(start_time, end_time)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.end_time <= self.start_time {
            return Err("interval.end_time must be after interval.start_time".to_string());
        }
        Ok(())
    }

    pub fn start_ms(&self) -> i64 {
        self.start_time.timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end_time.timestamp_millis()
    }

    pub fn duration_seconds(&self) -> u64 {
        let millis = (self.end_time - self.start_time).num_milliseconds();
        (millis.max(0) / 1000) as u64
    }

    /// UTC calendar day of the interval start, `YYYY-MM-DD`.
    pub fn day_bucket(&self) -> String {
        self.start_time.format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredInterval {
    pub user_id: String,
    pub interval: CompletedInterval,
    pub duration_seconds: u64,
    pub date: String,
}

impl StoredInterval {
    pub fn for_user(user_id: &str, interval: CompletedInterval) -> Self {
        Self {
            user_id: user_id.to_string(),
            duration_seconds: interval.duration_seconds(),
            date: interval.day_bucket(),
            interval,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotal {
    pub date: String,
    pub total_duration: u64,
}

/// Identity handed out by the authentication provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: String,
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthSession {
    pub fn is_valid_at(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        if self.access_token.trim().is_empty() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => expires_at > now + chrono::Duration::seconds(leeway_seconds),
            None => true,
        }
    }
}
