use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::models::Post;

pub const PREVIEW_CHARS: usize = 150;

/// A post as shown in the feed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PostCard {
    #[serde(flatten)]
    pub post: Post,
    pub preview: String,
    pub time_ago: String,
}

impl PostCard {
    pub fn new(post: Post, now: DateTime<Utc>) -> Self {
        Self {
            preview: preview(&post.body),
            time_ago: time_ago(&post.created_at, now),
            post,
        }
    }
}

pub fn preview(body: &str) -> String {
    if body.chars().count() <= PREVIEW_CHARS {
        return body.to_string();
    }
    let cut: String = body.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}...")
}

/// "just now", "5m ago", "3h ago", "2d ago", "1w ago", then the date.
pub fn time_ago(created_at: &str, now: DateTime<Utc>) -> String {
    let Ok(created) = created_at.parse::<DateTime<Utc>>() else {
        return created_at.to_string();
    };
    let seconds = (now - created).num_seconds().max(0);

    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let weeks = days / 7;
    if seconds < 60 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else if weeks < 4 {
        format!("{weeks}w ago")
    } else {
        created.format("%Y-%m-%d").to_string()
    }
}
