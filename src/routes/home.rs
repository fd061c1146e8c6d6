use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::state::AppState;
use crate::stats::{self, LeaderboardEntry};
use crate::timer::{format_clock, SessionKind, TimerSnapshot};

pub struct PresetView {
    pub key: &'static str,
    pub label: &'static str,
    pub display: String,
}

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub display_name: Option<String>,
    pub timer: Option<TimerSnapshot>,
    pub idle_display: String,
    pub presets: Vec<PresetView>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

pub async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Html<HomeTemplate>> {
    let leaderboard = {
        let conn = state.db.get()?;
        stats::leaderboard(&conn, state.config.forum.leaderboard_size, stats::today())?
    };

    let timer = match &user {
        Some(u) => Some(state.timers.timer_for(&u.id).await.snapshot().await),
        None => None,
    };

    let presets = [
        (SessionKind::Focus, "focus", "Focus"),
        (SessionKind::ShortBreak, "short_break", "Short break"),
        (SessionKind::LongBreak, "long_break", "Long break"),
    ]
    .into_iter()
    .map(|(kind, key, label)| PresetView {
        key,
        label,
        display: format_clock(kind.preset_secs(&state.config.timer)),
    })
    .collect();

    Ok(Html(HomeTemplate {
        display_name: user.map(|u| u.display_name),
        timer,
        idle_display: format_clock(state.config.timer.focus_secs),
        presets,
        leaderboard,
    }))
}
