use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::auth::events::{SessionChange, SessionEvents};
use crate::config::TimerConfig;
use crate::timer::{SessionKind, Tick, Timer, TimerSnapshot};

const TICK_PERIOD: Duration = Duration::from_secs(1);
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "timer", rename_all = "snake_case")]
pub enum TimerEvent {
    Updated(TimerSnapshot),
    TimesUp(TimerSnapshot),
}

/// Sent to the stats recorder when a focus countdown runs out.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedSession {
    pub user_id: String,
    pub duration_secs: u32,
    pub finished_at: DateTime<Utc>,
}

struct Inner {
    timer: Timer,
    ticker: Option<JoinHandle<()>>,
    /// Bumped whenever a ticker is started or cancelled; stale tickers exit.
    generation: u64,
}

impl Inner {
    fn cancel_ticker(&mut self) {
        self.generation += 1;
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

/// One user's countdown plus the single ticker task driving it.
#[derive(Clone)]
pub struct TimerHandle {
    user_id: Arc<str>,
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<TimerEvent>,
    completions: Option<mpsc::UnboundedSender<CompletedSession>>,
    config: TimerConfig,
}

impl TimerHandle {
    pub fn new(
        user_id: &str,
        config: TimerConfig,
        completions: Option<mpsc::UnboundedSender<CompletedSession>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            user_id: Arc::from(user_id),
            inner: Arc::new(Mutex::new(Inner {
                timer: Timer::from_config(&config),
                ticker: None,
                generation: 0,
            })),
            events,
            completions,
            config,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        self.inner.lock().await.timer.snapshot()
    }

    /// Returns the resulting snapshot and whether the change was applied.
    pub async fn select_duration(&self, secs: u32) -> (TimerSnapshot, bool) {
        let mut inner = self.inner.lock().await;
        let applied = inner.timer.select_duration(secs);
        self.after_select(&inner.timer, applied)
    }

    pub async fn select_preset(&self, kind: SessionKind) -> (TimerSnapshot, bool) {
        let mut inner = self.inner.lock().await;
        let applied = inner.timer.select_preset(kind, &self.config);
        self.after_select(&inner.timer, applied)
    }

    fn after_select(&self, timer: &Timer, applied: bool) -> (TimerSnapshot, bool) {
        let snapshot = timer.snapshot();
        if applied {
            self.publish(TimerEvent::Updated(snapshot.clone()));
        } else {
            tracing::debug!(user = %self.user_id, "Duration change ignored");
        }
        (snapshot, applied)
    }

    pub async fn start(&self) -> TimerSnapshot {
        let mut inner = self.inner.lock().await;
        if !inner.timer.start() {
            return inner.timer.snapshot();
        }

        inner.cancel_ticker();
        let generation = inner.generation;
        let handle = self.clone();
        inner.ticker = Some(tokio::spawn(async move {
            handle.run_ticker(generation).await;
        }));

        let snapshot = inner.timer.snapshot();
        tracing::debug!(user = %self.user_id, remaining = snapshot.remaining_secs, "Timer started");
        self.publish(TimerEvent::Updated(snapshot.clone()));
        snapshot
    }

    pub async fn stop(&self) -> TimerSnapshot {
        let mut inner = self.inner.lock().await;
        inner.cancel_ticker();
        if inner.timer.stop() {
            let snapshot = inner.timer.snapshot();
            self.publish(TimerEvent::Updated(snapshot.clone()));
            return snapshot;
        }
        inner.timer.snapshot()
    }

    pub async fn reset(&self) -> TimerSnapshot {
        let mut inner = self.inner.lock().await;
        inner.cancel_ticker();
        inner.timer.reset();
        let snapshot = inner.timer.snapshot();
        self.publish(TimerEvent::Updated(snapshot.clone()));
        snapshot
    }

    /// Whether a ticker task currently exists.
    pub async fn has_ticker(&self) -> bool {
        self.inner.lock().await.ticker.is_some()
    }

    async fn run_ticker(&self, generation: u64) {
        let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                return;
            }

            match inner.timer.tick() {
                Tick::Remaining(_) => {
                    self.publish(TimerEvent::Updated(inner.timer.snapshot()));
                }
                Tick::Finished {
                    duration_secs,
                    kind,
                } => {
                    inner.ticker = None;
                    tracing::info!(user = %self.user_id, ?kind, duration_secs, "Time's up");
                    self.publish(TimerEvent::TimesUp(inner.timer.snapshot()));
                    if kind == SessionKind::Focus {
                        self.report_completion(duration_secs);
                    }
                    return;
                }
                Tick::Ignored => {
                    inner.ticker = None;
                    return;
                }
            }
        }
    }

    fn report_completion(&self, duration_secs: u32) {
        let Some(completions) = &self.completions else {
            return;
        };
        let session = CompletedSession {
            user_id: self.user_id.to_string(),
            duration_secs,
            finished_at: Utc::now(),
        };
        if completions.send(session).is_err() {
            tracing::warn!(user = %self.user_id, "Stats recorder is gone; completion dropped");
        }
    }

    fn publish(&self, event: TimerEvent) {
        // No subscribers is normal when nobody has the page open.
        let _ = self.events.send(event);
    }
}

/// Timers keyed by user id, created lazily.
#[derive(Clone)]
pub struct TimerRegistry {
    timers: Arc<Mutex<HashMap<String, TimerHandle>>>,
    config: TimerConfig,
    completions: Option<mpsc::UnboundedSender<CompletedSession>>,
}

impl TimerRegistry {
    pub fn new(
        config: TimerConfig,
        completions: Option<mpsc::UnboundedSender<CompletedSession>>,
    ) -> Self {
        Self {
            timers: Arc::new(Mutex::new(HashMap::new())),
            config,
            completions,
        }
    }

    pub async fn timer_for(&self, user_id: &str) -> TimerHandle {
        let mut timers = self.timers.lock().await;
        timers
            .entry(user_id.to_string())
            .or_insert_with(|| {
                TimerHandle::new(user_id, self.config.clone(), self.completions.clone())
            })
            .clone()
    }

    /// Cancels and forgets a user's timer. Event subscribers see their stream
    /// end once the last clone of the handle is dropped.
    pub async fn discard(&self, user_id: &str) {
        let removed = self.timers.lock().await.remove(user_id);
        if let Some(handle) = removed {
            handle.reset().await;
            tracing::debug!(user = %user_id, "Timer discarded");
        }
    }

    pub async fn len(&self) -> usize {
        self.timers.lock().await.len()
    }

    /// Drops a user's timer once their last session signs out.
    pub fn follow_sessions(&self, events: &SessionEvents) -> JoinHandle<()> {
        let mut changes = events.subscribe();
        let registry = self.clone();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(SessionChange::SignedOut {
                        user_id,
                        active_sessions: 0,
                    }) => registry.discard(&user_id).await,
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!("Timer registry missed {} session events", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        })
    }
}
