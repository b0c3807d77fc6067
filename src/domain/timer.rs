//! Work/break cycle state machine.
//!
//! Time is never counted by ticks. Every method takes the current instant and derives
//! live time from `now - live_segment_start`, so missed or late ticks catch up on the
//! next evaluation. Accumulators hold whole seconds.

use crate::domain::models::{
    CompletedInterval, PersistedAccumulators, TimerLimits, TimerPhase, TimerStatus,
};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSwitch {
    pub from: TimerPhase,
    pub to: TimerPhase,
    /// Live seconds folded into the outgoing phase.
    pub committed_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Started,
    Paused(Option<CompletedInterval>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimerSession {
    status: TimerStatus,
    phase: TimerPhase,
    work_accum: u64,
    break_accum: u64,
    session_work_accum: u64,
    half_cycles: u64,
    live_segment_start: Option<DateTime<Utc>>,
}

fn elapsed_seconds(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    ((now - start).num_milliseconds().max(0) / 1000) as u64
}

impl TimerSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a session after a reload. Live time since the last commit is gone, so the
    /// session comes back paused when a phase block was in progress and idle otherwise.
    pub fn restore(persisted: &PersistedAccumulators) -> Self {
        let work_accum = persisted.work_time_accum_seconds;
        let break_accum = persisted.break_time_accum_seconds;
        let status = if work_accum > 0 || break_accum > 0 {
            TimerStatus::Paused
        } else {
            TimerStatus::Idle
        };

        Self {
            status,
            phase: persisted.phase,
            work_accum,
            break_accum,
            session_work_accum: persisted.session_total_work_seconds,
            half_cycles: persisted.half_cycles(),
            live_segment_start: None,
        }
    }

    pub fn persisted(&self) -> PersistedAccumulators {
        PersistedAccumulators {
            phase: self.phase,
            work_time_accum_seconds: self.work_accum,
            break_time_accum_seconds: self.break_accum,
            session_total_work_seconds: self.session_work_accum,
            session_iterations: self.session_iterations(),
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn live_segment_start(&self) -> Option<DateTime<Utc>> {
        self.live_segment_start
    }

    pub fn work_accum(&self) -> u64 {
        self.work_accum
    }

    pub fn break_accum(&self) -> u64 {
        self.break_accum
    }

    pub fn session_work_accum(&self) -> u64 {
        self.session_work_accum
    }

    pub fn session_iterations(&self) -> f64 {
        self.half_cycles as f64 / 2.0
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn live_seconds(&self, now: DateTime<Utc>) -> u64 {
        match (self.status, self.live_segment_start) {
            (TimerStatus::Running, Some(start)) => elapsed_seconds(start, now),
            _ => 0,
        }
    }

    pub fn work_time(&self, now: DateTime<Utc>) -> u64 {
        match self.phase {
            TimerPhase::Work => self.work_accum + self.live_seconds(now),
            TimerPhase::Break => self.work_accum,
        }
    }

    pub fn break_time(&self, now: DateTime<Utc>) -> u64 {
        match self.phase {
            TimerPhase::Break => self.break_accum + self.live_seconds(now),
            TimerPhase::Work => self.break_accum,
        }
    }

    /// Time of the block currently shown on the display.
    pub fn phase_time(&self, now: DateTime<Utc>) -> u64 {
        match self.phase {
            TimerPhase::Work => self.work_time(now),
            TimerPhase::Break => self.break_time(now),
        }
    }

    pub fn session_total_work_time(&self, now: DateTime<Utc>) -> u64 {
        match self.phase {
            TimerPhase::Work => self.session_work_accum + self.live_seconds(now),
            TimerPhase::Break => self.session_work_accum,
        }
    }

    /// Opens a live segment. Returns false when already running.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == TimerStatus::Running {
            return false;
        }
        self.status = TimerStatus::Running;
        self.live_segment_start = Some(now);
        true
    }

    /// Commits the live segment into the current phase block and freezes the timer.
    /// Without an open segment this only marks the timer paused.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<CompletedInterval> {
        let open = match self.status {
            TimerStatus::Running => self.live_segment_start.take(),
            _ => None,
        };
        self.status = TimerStatus::Paused;
        self.live_segment_start = None;

        let start = open?;
        let elapsed = elapsed_seconds(start, now);
        match self.phase {
            TimerPhase::Work => {
                self.work_accum += elapsed;
                self.session_work_accum += elapsed;
            }
            TimerPhase::Break => {
                self.break_accum += elapsed;
            }
        }
        CompletedInterval::new(start, now)
    }

    /// Ends the current cycle. Open work time still counts toward the session total, but
    /// both phase blocks are discarded. Session aggregates survive a stop.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<CompletedInterval> {
        let open = match self.status {
            TimerStatus::Running => self.live_segment_start.take(),
            _ => None,
        };

        let closed = open.and_then(|start| {
            if self.phase == TimerPhase::Work {
                self.session_work_accum += elapsed_seconds(start, now);
            }
            CompletedInterval::new(start, now)
        });

        self.status = TimerStatus::Idle;
        self.phase = TimerPhase::Work;
        self.work_accum = 0;
        self.break_accum = 0;
        self.live_segment_start = None;
        closed
    }

    pub fn toggle(&mut self, now: DateTime<Utc>) -> ToggleOutcome {
        if self.status == TimerStatus::Running {
            ToggleOutcome::Paused(self.pause(now))
        } else {
            self.start(now);
            ToggleOutcome::Started
        }
    }

    /// Clears the session aggregates. Only meaningful once the timer is idle.
    pub fn end_session(&mut self, now: DateTime<Utc>) -> Option<CompletedInterval> {
        let closed = self.stop(now);
        self.session_work_accum = 0;
        self.half_cycles = 0;
        closed
    }

    /// Phase-switch check, run on every tick while running. At most one switch happens
    /// per call; the next phase is re-anchored at `now` in the same step so no second is
    /// counted twice or dropped.
    pub fn evaluate(&mut self, now: DateTime<Utc>, limits: &TimerLimits) -> Option<PhaseSwitch> {
        if self.status != TimerStatus::Running {
            return None;
        }
        let anchor = self.live_segment_start?;
        let live = elapsed_seconds(anchor, now);

        let from = self.phase;
        match from {
            TimerPhase::Work => {
                if self.work_accum + live < limits.work_limit_seconds {
                    return None;
                }
                self.session_work_accum += live;
                self.work_accum = 0;
            }
            TimerPhase::Break => {
                if self.break_accum + live < limits.break_limit_seconds {
                    return None;
                }
                self.break_accum = 0;
            }
        }

        let to = from.next();
        self.phase = to;
        self.live_segment_start = Some(now);
        self.half_cycles += 1;

        Some(PhaseSwitch {
            from,
            to,
            committed_seconds: live,
        })
    }
}
