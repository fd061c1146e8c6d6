use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::gateway::SignedIn;
use crate::config::AuthConfig;
use crate::db::models::{User, UserStats};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, SessionToken};
use crate::state::AppState;
use crate::stats;

// -- Request types --

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct FederatedRequest {
    pub credential: String,
}

#[derive(Serialize)]
pub struct SignedInResponse {
    pub user: User,
    pub created: bool,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub stats: Option<UserStats>,
}

// -- Cookie helpers --

fn session_cookie(config: &AuthConfig, token: &str) -> String {
    let max_age_secs = config.session_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        config.cookie_name, token, max_age_secs
    )
}

fn clear_session_cookie(config: &AuthConfig) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        config.cookie_name
    )
}

fn signed_in_response(config: &AuthConfig, signed_in: SignedIn) -> Response {
    let status = if signed_in.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (
        status,
        [(header::SET_COOKIE, session_cookie(config, &signed_in.token))],
        Json(SignedInResponse {
            user: signed_in.user,
            created: signed_in.created,
        }),
    )
        .into_response()
}

// -- Handlers --

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> AppResult<Response> {
    let signed_in = state.accounts.register(&req.email, &req.password).await?;
    Ok(signed_in_response(&state.config.auth, signed_in))
}

/// POST /auth/login - signs in, or creates the account if the email is new
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> AppResult<Response> {
    let signed_in = state
        .accounts
        .register_or_sign_in(&req.email, &req.password)
        .await?;
    Ok(signed_in_response(&state.config.auth, signed_in))
}

/// POST /auth/federated
pub async fn federated(
    State(state): State<AppState>,
    Json(req): Json<FederatedRequest>,
) -> AppResult<Response> {
    if req.credential.trim().is_empty() {
        return Err(AppError::BadRequest("Credential required".into()));
    }
    let signed_in = state.accounts.sign_in_federated(&req.credential).await?;
    Ok(signed_in_response(&state.config.auth, signed_in))
}

/// POST /auth/logout - delete session and clear the cookie
pub async fn logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> AppResult<Response> {
    if let Some(token) = token {
        state.accounts.sign_out(&token).await?;
    }

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_session_cookie(&state.config.auth))],
    )
        .into_response())
}

/// GET /auth/me
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<MeResponse>> {
    let conn = state.db.get()?;
    let stats = stats::get_user_stats(&conn, &user.id)?.map(|mut s| {
        s.streak = stats::live_streak(&s, stats::today());
        s
    });

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        display_name: user.display_name,
        stats,
    }))
}
