use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;
use crate::timer::{SessionKind, TimerEvent, TimerSnapshot};

// --- Request / response types ---

/// Either an explicit length in seconds or one of the presets.
#[derive(Deserialize)]
pub struct DurationRequest {
    pub secs: Option<u32>,
    pub preset: Option<SessionKind>,
}

#[derive(Serialize)]
pub struct TimerResponse {
    #[serde(flatten)]
    pub timer: TimerSnapshot,
    pub applied: bool,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/timer", get(show))
        .route("/api/timer/duration", post(select_duration))
        .route("/api/timer/start", post(start))
        .route("/api/timer/stop", post(stop))
        .route("/api/timer/reset", post(reset))
        .route("/api/timer/events", get(events))
}

// --- Handlers ---

async fn show(State(state): State<AppState>, user: CurrentUser) -> Json<TimerSnapshot> {
    let timer = state.timers.timer_for(&user.id).await;
    Json(timer.snapshot().await)
}

async fn select_duration(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<DurationRequest>,
) -> AppResult<Json<TimerResponse>> {
    let timer = state.timers.timer_for(&user.id).await;
    let (snapshot, applied) = match (req.secs, req.preset) {
        (Some(secs), None) => timer.select_duration(secs).await,
        (None, Some(kind)) => timer.select_preset(kind).await,
        _ => {
            return Err(AppError::BadRequest(
                "Provide exactly one of secs or preset".into(),
            ))
        }
    };
    Ok(Json(TimerResponse {
        timer: snapshot,
        applied,
    }))
}

async fn start(State(state): State<AppState>, user: CurrentUser) -> Json<TimerSnapshot> {
    let timer = state.timers.timer_for(&user.id).await;
    Json(timer.start().await)
}

async fn stop(State(state): State<AppState>, user: CurrentUser) -> Json<TimerSnapshot> {
    let timer = state.timers.timer_for(&user.id).await;
    Json(timer.stop().await)
}

async fn reset(State(state): State<AppState>, user: CurrentUser) -> Json<TimerSnapshot> {
    let timer = state.timers.timer_for(&user.id).await;
    Json(timer.reset().await)
}

/// SSE stream of the caller's timer: the current state first, then every change.
async fn events(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let timer = state.timers.timer_for(&user.id).await;
    let receiver = timer.subscribe();
    let current = TimerEvent::Updated(timer.snapshot().await);

    let user_id = user.id;
    let updates = BroadcastStream::new(receiver).filter_map(move |event| match event {
        Ok(event) => Some(event),
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            tracing::warn!(user = %user_id, "Timer stream skipped {} events", missed);
            None
        }
    });

    let stream = tokio_stream::once(current)
        .chain(updates)
        .map(|event| Ok(sse_event(&event)));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn sse_event(event: &TimerEvent) -> Event {
    let name = match event {
        TimerEvent::Updated(_) => "updated",
        TimerEvent::TimesUp(_) => "times_up",
    };
    Event::default()
        .event(name)
        .json_data(event)
        .unwrap_or_else(|e| {
            tracing::error!("Timer event serialization failed: {}", e);
            Event::default().comment("serialization error")
        })
}
