//! Text renderers for the timer. Every component reads the same `TimerView` snapshot
//! published by the controller, so they always agree with each other.

use crate::application::timer_service::{ControlOutcome, TimerService};
use crate::domain::format::{format_compact_secs, format_full_secs};
use crate::domain::models::{TimerLimits, TimerPhase, TimerStatus};
use crate::domain::timer::TimerSession;
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerView {
    pub status: TimerStatus,
    pub phase: TimerPhase,
    pub work_seconds: u64,
    pub break_seconds: u64,
    pub phase_seconds: u64,
    pub phase_limit_seconds: u64,
    pub session_work_seconds: u64,
    pub session_iterations: f64,
}

impl TimerView {
    pub fn capture(session: &TimerSession, limits: &TimerLimits, now: DateTime<Utc>) -> Self {
        Self {
            status: session.status(),
            phase: session.phase(),
            work_seconds: session.work_time(now),
            break_seconds: session.break_time(now),
            phase_seconds: session.phase_time(now),
            phase_limit_seconds: limits.limit_for(session.phase()),
            session_work_seconds: session.session_total_work_time(now),
            session_iterations: session.session_iterations(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == TimerStatus::Idle
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }
}

fn phase_label(phase: TimerPhase) -> &'static str {
    match phase {
        TimerPhase::Work => "Work",
        TimerPhase::Break => "Break",
    }
}

pub struct TimerDisplay;

impl TimerDisplay {
    pub fn text(view: &TimerView) -> String {
        format!(
            "{} {} / {}",
            phase_label(view.phase),
            format_compact_secs(view.phase_seconds),
            format_compact_secs(view.phase_limit_seconds)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl ControlAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Pause => "Pause",
            Self::Resume => "Resume",
            Self::Stop => "Stop",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "pause" => Some(Self::Pause),
            "resume" => Some(Self::Resume),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }

    pub fn apply(self, service: &TimerService) -> Result<ControlOutcome, InfraError> {
        match self {
            Self::Start | Self::Resume => service.start(),
            Self::Pause => service.pause(),
            Self::Stop => service.stop(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlButtons {
    pub actions: Vec<ControlAction>,
}

impl ControlButtons {
    pub fn for_view(view: &TimerView) -> Self {
        let actions = match view.status {
            TimerStatus::Idle => vec![ControlAction::Start],
            TimerStatus::Running => vec![ControlAction::Stop, ControlAction::Pause],
            TimerStatus::Paused => vec![ControlAction::Stop, ControlAction::Resume],
        };
        Self { actions }
    }

    pub fn allows(&self, action: ControlAction) -> bool {
        self.actions.contains(&action)
    }

    pub fn render(&self) -> String {
        self.actions
            .iter()
            .map(|action| format!("[{}]", action.label()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Compact always-on-top readout; hidden while idle.
pub struct MiniTimer;

impl MiniTimer {
    pub fn render(view: &TimerView) -> Option<String> {
        let marker = match view.status {
            TimerStatus::Idle => return None,
            TimerStatus::Running => "▶",
            TimerStatus::Paused => "⏸",
        };
        Some(format!("{} {marker}", format_compact_secs(view.phase_seconds)))
    }
}

pub struct SessionSummary;

impl SessionSummary {
    pub fn text(view: &TimerView) -> String {
        format!(
            "Session work {} | iterations {}",
            format_full_secs(view.session_work_seconds),
            view.session_iterations
        )
    }
}
