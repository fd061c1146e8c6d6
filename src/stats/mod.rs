// Per-user focus stats, streaks and the leaderboard
use chrono::{Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::db::models::UserStats;
use crate::db::{now_timestamp, write_transaction};
use crate::state::DbPool;
use crate::timer::CompletedSession;

const DAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub uid: String,
    pub display_name: String,
    pub seconds_focused: i64,
    pub timers_finished: i64,
    pub streak: i64,
}

/// Create the stats row with zero counters unless it already exists.
/// Returns true when a row was created.
pub fn ensure_user_stats(conn: &Connection, uid: &str, email: &str) -> Result<bool, rusqlite::Error> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO user_stats (uid, email, updated_at) VALUES (?1, ?2, ?3)",
        params![uid, email, now_timestamp()],
    )?;
    if inserted > 0 {
        tracing::info!(uid, "Created stats record");
    }
    Ok(inserted > 0)
}

pub fn get_user_stats(conn: &Connection, uid: &str) -> Result<Option<UserStats>, rusqlite::Error> {
    conn.query_row(
        "SELECT uid, email, seconds_focused, timers_finished, streak, last_focus_day
         FROM user_stats WHERE uid = ?1",
        params![uid],
        |row| {
            Ok(UserStats {
                uid: row.get(0)?,
                email: row.get(1)?,
                seconds_focused: row.get(2)?,
                timers_finished: row.get(3)?,
                streak: row.get(4)?,
                last_focus_day: row.get(5)?,
            })
        },
    )
    .optional()
}

/// Streak after focusing on `today`, given the last day focused.
pub fn next_streak(last_day: Option<NaiveDate>, streak: i64, today: NaiveDate) -> i64 {
    match last_day {
        Some(day) if day == today => streak.max(1),
        Some(day) if day + Duration::days(1) == today => streak + 1,
        _ => 1,
    }
}

/// Streak as of `today`: it lapses once a whole day passes without focus.
pub fn live_streak(stats: &UserStats, today: NaiveDate) -> i64 {
    let Some(last) = parse_day(stats.last_focus_day.as_deref()) else {
        return 0;
    };
    if last == today || last + Duration::days(1) == today {
        stats.streak
    } else {
        0
    }
}

pub fn current_streak(conn: &Connection, uid: &str, today: NaiveDate) -> Result<i64, rusqlite::Error> {
    Ok(get_user_stats(conn, uid)?
        .map(|stats| live_streak(&stats, today))
        .unwrap_or(0))
}

/// Fold one finished focus session into the user's record.
/// Returns None if the user has no stats record.
pub fn record_completed_session(
    conn: &Connection,
    uid: &str,
    seconds: u32,
    day: NaiveDate,
) -> Result<Option<UserStats>, rusqlite::Error> {
    let tx = write_transaction(conn)?;

    let Some(stats) = get_user_stats(&tx, uid)? else {
        return Ok(None);
    };
    let streak = next_streak(parse_day(stats.last_focus_day.as_deref()), stats.streak, day);

    tx.execute(
        "UPDATE user_stats
         SET seconds_focused = seconds_focused + ?2,
             timers_finished = timers_finished + 1,
             streak = ?3,
             last_focus_day = ?4,
             updated_at = ?5
         WHERE uid = ?1",
        params![
            uid,
            seconds as i64,
            streak,
            day.format(DAY_FORMAT).to_string(),
            now_timestamp()
        ],
    )?;
    let updated = get_user_stats(&tx, uid)?;
    tx.commit()?;
    Ok(updated)
}

pub fn leaderboard(
    conn: &Connection,
    limit: usize,
    today: NaiveDate,
) -> Result<Vec<LeaderboardEntry>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT s.uid, u.display_name, s.seconds_focused, s.timers_finished, s.streak,
                s.last_focus_day, s.email
         FROM user_stats s JOIN users u ON u.id = s.uid
         ORDER BY s.seconds_focused DESC, s.timers_finished DESC, u.display_name ASC
         LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit as i64], |row| {
        let stats = UserStats {
            uid: row.get(0)?,
            email: row.get(6)?,
            seconds_focused: row.get(2)?,
            timers_finished: row.get(3)?,
            streak: row.get(4)?,
            last_focus_day: row.get(5)?,
        };
        let display_name: String = row.get(1)?;
        Ok((stats, display_name))
    })?;

    let mut entries = Vec::new();
    for (index, row) in rows.enumerate() {
        let (stats, display_name) = row?;
        entries.push(LeaderboardEntry {
            rank: index + 1,
            streak: live_streak(&stats, today),
            uid: stats.uid,
            display_name,
            seconds_focused: stats.seconds_focused,
            timers_finished: stats.timers_finished,
        });
    }
    Ok(entries)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn parse_day(day: Option<&str>) -> Option<NaiveDate> {
    day.and_then(|d| NaiveDate::parse_from_str(d, DAY_FORMAT).ok())
}

/// Persist completions coming off the timers until the channel closes.
pub fn spawn_recorder(
    pool: DbPool,
    mut completions: mpsc::UnboundedReceiver<CompletedSession>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(session) = completions.recv().await {
            let day = session.finished_at.date_naive();
            let result = pool.get().map_err(|e| e.to_string()).and_then(|conn| {
                record_completed_session(&conn, &session.user_id, session.duration_secs, day)
                    .map_err(|e| e.to_string())
            });
            match result {
                Ok(Some(stats)) => tracing::info!(
                    uid = %session.user_id,
                    seconds_focused = stats.seconds_focused,
                    streak = stats.streak,
                    "Recorded focus session"
                ),
                Ok(None) => tracing::warn!(uid = %session.user_id, "No stats record for completed session"),
                Err(e) => tracing::error!(uid = %session.user_id, "Failed to record focus session: {}", e),
            }
        }
    })
}
