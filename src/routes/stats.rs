use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::UserStats;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;
use crate::stats::{self, LeaderboardEntry};

const MAX_LEADERBOARD: usize = 100;

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stats/me", get(my_stats))
        .route("/api/leaderboard", get(leaderboard))
}

async fn my_stats(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<UserStats>> {
    let conn = state.db.get()?;
    let mut record = stats::get_user_stats(&conn, &user.id)?.ok_or(AppError::NotFound)?;
    record.streak = stats::live_streak(&record, stats::today());
    Ok(Json(record))
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> AppResult<Json<Vec<LeaderboardEntry>>> {
    let limit = query
        .limit
        .unwrap_or(state.config.forum.leaderboard_size)
        .clamp(1, MAX_LEADERBOARD);
    let conn = state.db.get()?;
    Ok(Json(stats::leaderboard(&conn, limit, stats::today())?))
}
