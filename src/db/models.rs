use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserStats {
    pub uid: String,
    pub email: String,
    pub seconds_focused: i64,
    pub timers_finished: i64,
    pub streak: i64,
    pub last_focus_day: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub author_streak: i64,
    pub title: String,
    pub body: String,
    pub vote_count: i64,
    pub comment_count: i64,
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_name: String,
    pub author_streak: i64,
    pub body: String,
    pub created_at: String,
}
