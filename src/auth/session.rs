use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::User;

/// Create a new session for a user. Returns the session token.
pub fn create_session(conn: &Connection, user_id: &str, hours: u64) -> Result<String, rusqlite::Error> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Delete a session by token. Returns the owner if the session existed.
pub fn delete_session(conn: &Connection, token: &str) -> Result<Option<String>, rusqlite::Error> {
    let user_id: Option<String> = conn
        .query_row(
            "SELECT user_id FROM sessions WHERE token = ?1",
            params![token],
            |row| row.get(0),
        )
        .optional()?;

    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(user_id)
}

/// Resolve a live session to its user.
pub fn lookup_session(conn: &Connection, token: &str) -> Result<Option<User>, rusqlite::Error> {
    conn.query_row(
        "SELECT u.id, u.email, u.display_name, u.created_at FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token = ?1 AND s.expires_at > datetime('now')",
        params![token],
        |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
                display_name: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn count_active_sessions(conn: &Connection, user_id: &str) -> Result<usize, rusqlite::Error> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sessions WHERE user_id = ?1 AND expires_at > datetime('now')",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Remove expired sessions. Returns how many were deleted.
/// Users holding at least one expired session.
pub fn expired_session_owners(conn: &Connection) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT user_id FROM sessions WHERE expires_at <= datetime('now')",
    )?;
    let owners = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(owners)
}

pub fn purge_expired(conn: &Connection) -> Result<usize, rusqlite::Error> {
    conn.execute("DELETE FROM sessions WHERE expires_at <= datetime('now')", [])
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}
