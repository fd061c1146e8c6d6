// Countdown state machine - pure, no clocks or tasks
pub mod runner;

use serde::{Deserialize, Serialize};

use crate::config::TimerConfig;

pub use runner::{CompletedSession, TimerEvent, TimerHandle, TimerRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Idle,
    Running,
}

/// What a countdown is for. Only focus sessions count toward stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Focus,
    ShortBreak,
    LongBreak,
}

impl SessionKind {
    pub fn preset_secs(self, config: &TimerConfig) -> u32 {
        match self {
            SessionKind::Focus => config.focus_secs,
            SessionKind::ShortBreak => config.short_break_secs,
            SessionKind::LongBreak => config.long_break_secs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still running with this many seconds left.
    Remaining(u32),
    /// Reached zero; the timer is Idle again and rewound to its duration.
    Finished { duration_secs: u32, kind: SessionKind },
    /// Tick arrived while Idle.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub kind: SessionKind,
    pub duration_secs: u32,
    pub remaining_secs: u32,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    duration_secs: u32,
    remaining_secs: u32,
    kind: SessionKind,
    state: TimerState,
}

impl Timer {
    pub fn new(duration_secs: u32, kind: SessionKind) -> Self {
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            kind,
            state: TimerState::Idle,
        }
    }

    pub fn from_config(config: &TimerConfig) -> Self {
        Self::new(config.focus_secs, SessionKind::Focus)
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Returns false when the request was dropped (running, or zero length).
    pub fn select_duration(&mut self, secs: u32) -> bool {
        self.select(secs, SessionKind::Focus)
    }

    pub fn select_preset(&mut self, kind: SessionKind, config: &TimerConfig) -> bool {
        self.select(kind.preset_secs(config), kind)
    }

    fn select(&mut self, secs: u32, kind: SessionKind) -> bool {
        if self.is_running() || secs == 0 {
            return false;
        }
        self.duration_secs = secs;
        self.remaining_secs = secs;
        self.kind = kind;
        true
    }

    /// Returns false if already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.state = TimerState::Running;
        true
    }

    pub fn tick(&mut self) -> Tick {
        if !self.is_running() {
            return Tick::Ignored;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return Tick::Remaining(self.remaining_secs);
        }
        self.remaining_secs = self.duration_secs;
        self.state = TimerState::Idle;
        Tick::Finished {
            duration_secs: self.duration_secs,
            kind: self.kind,
        }
    }

    /// Freezes the countdown where it is.
    pub fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = TimerState::Idle;
        true
    }

    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.remaining_secs = self.duration_secs;
    }

    pub fn display(&self) -> String {
        format_clock(self.remaining_secs)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state,
            kind: self.kind,
            duration_secs: self.duration_secs,
            remaining_secs: self.remaining_secs,
            display: self.display(),
        }
    }
}

/// `MM:SS`, both halves zero-padded. Minutes are not capped at 59.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
