// Forum domain types - posts, comments, sort orders and cursors
pub mod controller;
pub mod repository;
pub mod view;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db::models::{Comment, Post};
use repository::RepositoryError;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_BODY_CHARS: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    New,
    Top,
}

impl FromStr for SortKey {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(SortKey::New),
            "top" => Ok(SortKey::Top),
            other => Err(RepositoryError::Invalid(format!("Unknown sort key: {other}"))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::New => write!(f, "new"),
            SortKey::Top => write!(f, "top"),
        }
    }
}

/// Position of the last post on a page, under one sort order.
/// Travels to clients as opaque hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub sort: SortKey,
    pub vote_count: i64,
    pub created_at: String,
    pub id: String,
}

impl Cursor {
    pub fn after(post: &Post, sort: SortKey) -> Self {
        Self {
            sort,
            vote_count: post.vote_count,
            created_at: post.created_at.clone(),
            id: post.id.clone(),
        }
    }

    pub fn encode(&self) -> String {
        // Serializing plain strings and integers cannot fail.
        hex::encode(serde_json::to_vec(self).unwrap_or_default())
    }

    pub fn decode(raw: &str) -> Result<Self, RepositoryError> {
        let invalid = || RepositoryError::Invalid("Invalid cursor".into());
        let bytes = hex::decode(raw).map_err(|_| invalid())?;
        serde_json::from_slice(&bytes).map_err(|_| invalid())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Who is writing, as shown next to posts and comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub streak: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
    pub votes: HashMap<String, bool>,
}

impl PostDetail {
    pub fn has_voted(&self, user_id: &str) -> bool {
        self.votes.get(user_id).copied().unwrap_or(false)
    }
}

/// Trimmed, non-empty, bounded text.
pub fn clean_text(field: &str, value: &str, max_chars: usize) -> Result<String, RepositoryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RepositoryError::Invalid(format!("{field} cannot be empty")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(RepositoryError::Invalid(format!(
            "{field} must be {max_chars} characters or less"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_parses_known_values_only() {
        assert_eq!("new".parse::<SortKey>().unwrap(), SortKey::New);
        assert_eq!("top".parse::<SortKey>().unwrap(), SortKey::Top);
        assert!("hot".parse::<SortKey>().is_err());
        assert_eq!(SortKey::Top.to_string(), "top");
    }

    #[test]
    fn cursor_is_opaque_and_decodable() {
        let cursor = Cursor {
            sort: SortKey::Top,
            vote_count: -3,
            created_at: "2026-01-01T00:00:00.000000Z".into(),
            id: "abc".into(),
        };
        let encoded = cursor.encode();
        assert!(encoded.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(Cursor::decode(&encoded).unwrap(), cursor);
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        assert!(Cursor::decode("zz").is_err());
        assert!(Cursor::decode(&hex::encode(b"{\"nope\":1}")).is_err());
    }

    #[test]
    fn clean_text_trims_and_bounds() {
        assert_eq!(clean_text("Title", "  hi  ", 10).unwrap(), "hi");
        assert!(clean_text("Title", "   ", 10).is_err());
        assert!(clean_text("Title", "elevenchars", 10).is_err());
        assert!(clean_text("Title", "ñññññññññ", 10).is_ok());
    }
}
