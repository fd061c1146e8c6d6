use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tokio::sync::mpsc;

use crate::auth::events::SessionEvents;
use crate::auth::gateway::AccountGateway;
use crate::config::Config;
use crate::forum::repository::{ForumRepository, SqliteForumRepository};
use crate::stats;
use crate::timer::TimerRegistry;

pub type DbPool = Pool<SqliteConnectionManager>;

const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub accounts: AccountGateway,
    pub forum: Arc<dyn ForumRepository>,
    pub timers: TimerRegistry,
}

impl AppState {
    /// Wire up services and spawn the background tasks they need
    /// (stats recorder, session expiry, timer clean-up on sign-out).
    /// Requires a Tokio runtime.
    pub fn build(db: DbPool, config: Config) -> Self {
        let events = SessionEvents::new();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        stats::spawn_recorder(db.clone(), completions_rx);
        let timers = TimerRegistry::new(config.timer.clone(), Some(completions_tx));
        timers.follow_sessions(&events);

        let accounts = AccountGateway::new(db.clone(), events, config.auth.clone());
        accounts.spawn_session_sweeper(SESSION_SWEEP_PERIOD);
        let forum = Arc::new(SqliteForumRepository::new(
            db.clone(),
            config.forum.page_size,
            config.forum.search_window,
        ));

        Self {
            db,
            config,
            accounts,
            forum,
            timers,
        }
    }
}
