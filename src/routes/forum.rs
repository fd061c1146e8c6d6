use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::models::Comment;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::forum::controller::OpenPost;
use crate::forum::repository::toggle_vote;
use crate::forum::view::{time_ago, PostCard};
use crate::forum::{Author, Page, PostDetail, SortKey};
use crate::state::AppState;
use crate::stats;

// --- Queries and bodies ---

#[derive(Deserialize)]
pub struct ListQuery {
    pub sort: Option<String>,
    pub cursor: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub body: String,
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub body: String,
}

// --- Responses ---

#[derive(Serialize)]
pub struct PostDetailResponse {
    #[serde(flatten)]
    pub detail: PostDetail,
    pub time_ago: String,
    pub viewer_voted: bool,
    pub can_delete: bool,
}

#[derive(Serialize)]
pub struct VoteResponse {
    pub post_id: String,
    pub vote_count: i64,
    pub voted: bool,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/posts/search", get(search_posts))
        .route("/api/posts/{id}", get(get_post).delete(delete_post))
        .route("/api/posts/{id}/comments", post(add_comment))
        .route("/api/posts/{id}/vote", put(upvote).delete(remove_upvote))
        .route("/api/posts/{id}/vote/toggle", post(toggle))
}

/// Name and live streak to stamp onto new posts and comments.
fn author_for(state: &AppState, user: &CurrentUser) -> AppResult<Author> {
    let conn = state.db.get()?;
    let streak = stats::current_streak(&conn, &user.id, stats::today())?;
    Ok(Author {
        id: user.id.clone(),
        name: user.display_name.clone(),
        streak,
    })
}

// --- Handlers ---

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Page<PostCard>>> {
    let sort = match query.sort.as_deref() {
        Some(raw) => raw.parse::<SortKey>()?,
        None => SortKey::default(),
    };
    let page = state.forum.list_posts(sort, query.cursor.as_deref()).await?;

    let now = Utc::now();
    Ok(Json(Page {
        items: page
            .items
            .into_iter()
            .map(|post| PostCard::new(post, now))
            .collect(),
        next_cursor: page.next_cursor,
        has_more: page.has_more,
    }))
}

async fn search_posts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<PostCard>>> {
    let posts = state.forum.search_posts(&query.q).await?;
    let now = Utc::now();
    Ok(Json(
        posts.into_iter().map(|post| PostCard::new(post, now)).collect(),
    ))
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<Response> {
    let author = author_for(&state, &user)?;
    let post = state.forum.create_post(&author, &req.title, &req.body).await?;
    Ok((StatusCode::CREATED, Json(PostCard::new(post, Utc::now()))).into_response())
}

async fn get_post(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<PostDetailResponse>> {
    let viewer_id = user.as_ref().map(|u| u.id.as_str());
    let open = OpenPost::hydrate(state.forum.get_post(&id).await?, viewer_id);
    Ok(Json(PostDetailResponse {
        time_ago: time_ago(&open.detail.post.created_at, Utc::now()),
        can_delete: open.can_delete(viewer_id),
        viewer_voted: open.voted,
        detail: open.detail,
    }))
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let open = OpenPost::hydrate(state.forum.get_post(&id).await?, Some(user.id.as_str()));
    if !open.can_delete(Some(user.id.as_str())) {
        tracing::warn!(post = %id, user = %user.id, "Delete refused for non-author");
        return Err(AppError::Forbidden);
    }
    state.forum.delete_post(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<Response> {
    let author = author_for(&state, &user)?;
    let comment: Comment = state.forum.add_comment(&id, &author, &req.body).await?;
    Ok((StatusCode::CREATED, Json(comment)).into_response())
}

async fn upvote(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<VoteResponse>> {
    let post = state.forum.upvote(&id, &user.id).await?;
    Ok(Json(VoteResponse {
        post_id: post.id,
        vote_count: post.vote_count,
        voted: true,
    }))
}

async fn remove_upvote(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<VoteResponse>> {
    let post = state.forum.remove_upvote(&id, &user.id).await?;
    Ok(Json(VoteResponse {
        post_id: post.id,
        vote_count: post.vote_count,
        voted: false,
    }))
}

async fn toggle(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<VoteResponse>> {
    let (post, voted) = toggle_vote(state.forum.as_ref(), &id, &user.id).await?;
    Ok(Json(VoteResponse {
        post_id: post.id,
        vote_count: post.vote_count,
        voted,
    }))
}
