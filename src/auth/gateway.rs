use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::auth::events::{SessionChange, SessionEvents};
use crate::auth::{password, session};
use crate::config::AuthConfig;
use crate::db::models::User;
use crate::db::{now_timestamp, write_transaction};
use crate::state::DbPool;
use crate::stats;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No account for that email")]
    NoSuchAccount,

    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Email already registered")]
    EmailTaken,

    #[error("{0}")]
    Invalid(String),

    #[error("Federated sign-in rejected: {0}")]
    FederationRejected(String),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// An identity vouched for by an external provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederatedIdentity {
    pub provider: String,
    pub subject: String,
    pub email: String,
    /// Whether the provider has confirmed the caller owns `email`.
    #[serde(default)]
    pub email_verified: bool,
    pub display_name: Option<String>,
}

/// Turns a provider credential (e.g. an ID token) into a verified identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<FederatedIdentity, AuthError>;
}

/// Default verifier: federated sign-in is switched off.
pub struct FederationDisabled;

#[async_trait]
impl IdentityVerifier for FederationDisabled {
    async fn verify(&self, _credential: &str) -> Result<FederatedIdentity, AuthError> {
        Err(AuthError::FederationRejected(
            "federated sign-in is not configured".into(),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    pub token: String,
    /// True when this call created the account.
    pub created: bool,
}

/// Sign-up, sign-in and sign-out over the local user store.
#[derive(Clone)]
pub struct AccountGateway {
    pool: DbPool,
    events: SessionEvents,
    verifier: Arc<dyn IdentityVerifier>,
    config: AuthConfig,
}

impl AccountGateway {
    pub fn new(pool: DbPool, events: SessionEvents, config: AuthConfig) -> Self {
        Self {
            pool,
            events,
            verifier: Arc::new(FederationDisabled),
            config,
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<SignedIn, AuthError> {
        let email = normalize_email(email)?;
        self.check_password(password)?;
        let hash = password::hash_password(password, self.config.bcrypt_cost)?;

        let conn = self.pool.get()?;
        let tx = write_transaction(&conn)?;
        if find_user_by_email(&tx, &email)?.is_some() {
            return Err(AuthError::EmailTaken);
        }
        let user = insert_user(&tx, &email, &default_display_name(&email), Some(&hash))?;
        let signed_in = self.open_session(&tx, user, true)?;
        tx.commit()?;

        tracing::info!(user = %signed_in.user.id, "Account registered");
        self.announce(&signed_in);
        Ok(signed_in)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AuthError> {
        let email = normalize_email(email)?;

        let conn = self.pool.get()?;
        let (user, hash) = find_user_by_email(&conn, &email)?.ok_or(AuthError::NoSuchAccount)?;
        let verified = hash
            .as_deref()
            .map(|h| password::verify_password(password, h))
            .unwrap_or(false);
        if !verified {
            tracing::warn!(user = %user.id, "Password sign-in failed");
            return Err(AuthError::InvalidCredential);
        }

        let tx = write_transaction(&conn)?;
        let signed_in = self.open_session(&tx, user, false)?;
        tx.commit()?;

        self.announce(&signed_in);
        Ok(signed_in)
    }

    /// Sign in, creating the account only when the email is unknown.
    /// A wrong password for an existing account stays an error.
    pub async fn register_or_sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignedIn, AuthError> {
        match self.sign_in(email, password).await {
            Err(AuthError::NoSuchAccount) => self.register(email, password).await,
            other => other,
        }
    }

    pub async fn sign_in_federated(&self, credential: &str) -> Result<SignedIn, AuthError> {
        let identity = self.verifier.verify(credential).await?;
        let email = normalize_email(&identity.email)?;

        let conn = self.pool.get()?;
        let tx = write_transaction(&conn)?;

        let linked: Option<String> = tx
            .query_row(
                "SELECT user_id FROM social_accounts WHERE provider = ?1 AND subject = ?2",
                params![identity.provider, identity.subject],
                |row| row.get(0),
            )
            .optional()?;

        let (user, created) = match linked {
            Some(user_id) => (find_user_by_id(&tx, &user_id)?, false),
            None => {
                // The email becomes the account key, so it must be vouched for.
                if !identity.email_verified {
                    tracing::warn!(provider = %identity.provider, "Federated email not verified");
                    return Err(AuthError::FederationRejected(
                        "provider has not verified this email".into(),
                    ));
                }
                let (user, created) = match find_user_by_email(&tx, &email)? {
                    Some((user, _)) => (user, false),
                    None => {
                        let name = identity
                            .display_name
                            .as_deref()
                            .map(str::trim)
                            .filter(|n| !n.is_empty())
                            .map(str::to_string)
                            .unwrap_or_else(|| default_display_name(&email));
                        (insert_user(&tx, &email, &name, None)?, true)
                    }
                };
                tx.execute(
                    "INSERT INTO social_accounts (provider, subject, user_id) VALUES (?1, ?2, ?3)",
                    params![identity.provider, identity.subject, user.id],
                )?;
                tracing::info!(user = %user.id, provider = %identity.provider, "Linked federated identity");
                (user, created)
            }
        };

        let signed_in = self.open_session(&tx, user, created)?;
        tx.commit()?;

        self.announce(&signed_in);
        Ok(signed_in)
    }

    /// Returns false if the token did not name a session.
    pub async fn sign_out(&self, token: &str) -> Result<bool, AuthError> {
        let conn = self.pool.get()?;
        let Some(user_id) = session::delete_session(&conn, token)? else {
            return Ok(false);
        };
        let active_sessions = session::count_active_sessions(&conn, &user_id)?;

        tracing::info!(user = %user_id, active_sessions, "Signed out");
        self.events.publish(SessionChange::SignedOut {
            user_id,
            active_sessions,
        });
        Ok(true)
    }

    /// Delete expired sessions and announce each affected user's remaining count.
    /// Returns how many sessions were removed.
    pub async fn expire_sessions(&self) -> Result<usize, AuthError> {
        let conn = self.pool.get()?;
        let tx = write_transaction(&conn)?;
        let owners = session::expired_session_owners(&tx)?;
        let purged = session::purge_expired(&tx)?;
        let mut signed_out = Vec::with_capacity(owners.len());
        for user_id in owners {
            let active_sessions = session::count_active_sessions(&tx, &user_id)?;
            signed_out.push((user_id, active_sessions));
        }
        tx.commit()?;

        for (user_id, active_sessions) in signed_out {
            tracing::debug!(user = %user_id, active_sessions, "Session expired");
            self.events.publish(SessionChange::SignedOut {
                user_id,
                active_sessions,
            });
        }
        Ok(purged)
    }

    /// Periodically expire sessions. The first sweep runs immediately.
    pub fn spawn_session_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let gateway = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match gateway.expire_sessions().await {
                    Ok(0) => {}
                    Ok(purged) => tracing::info!("Expired {} sessions", purged),
                    Err(e) => tracing::error!("Session sweep failed: {}", e),
                }
            }
        })
    }

    pub async fn current_user(&self, token: &str) -> Result<Option<User>, AuthError> {
        let conn = self.pool.get()?;
        Ok(session::lookup_session(&conn, token)?)
    }

    fn open_session(&self, conn: &Connection, user: User, created: bool) -> Result<SignedIn, AuthError> {
        stats::ensure_user_stats(conn, &user.id, &user.email)?;
        let token = session::create_session(conn, &user.id, self.config.session_hours)?;
        Ok(SignedIn {
            user,
            token,
            created,
        })
    }

    fn announce(&self, signed_in: &SignedIn) {
        self.events.publish(SessionChange::SignedIn {
            user_id: signed_in.user.id.clone(),
        });
    }

    fn check_password(&self, password: &str) -> Result<(), AuthError> {
        if password.chars().count() < self.config.min_password_len {
            return Err(AuthError::Invalid(format!(
                "Password must be at least {} characters",
                self.config.min_password_len
            )));
        }
        Ok(())
    }
}

pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AuthError::Invalid("A valid email address is required".into()));
    }
    Ok(email)
}

fn default_display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

fn insert_user(
    conn: &Connection,
    email: &str,
    display_name: &str,
    password_hash: Option<&str>,
) -> Result<User, rusqlite::Error> {
    let user = User {
        id: uuid::Uuid::now_v7().to_string(),
        email: email.to_string(),
        display_name: display_name.to_string(),
        created_at: now_timestamp(),
    };
    conn.execute(
        "INSERT INTO users (id, email, display_name, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user.id, user.email, user.display_name, password_hash, user.created_at],
    )?;
    Ok(user)
}

fn find_user_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<(User, Option<String>)>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, email, display_name, created_at, password_hash FROM users WHERE email = ?1",
        params![email],
        |row| {
            Ok((
                User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    display_name: row.get(2)?,
                    created_at: row.get(3)?,
                },
                row.get(4)?,
            ))
        },
    )
    .optional()
}

fn find_user_by_id(conn: &Connection, id: &str) -> Result<User, rusqlite::Error> {
    conn.query_row(
        "SELECT id, email, display_name, created_at FROM users WHERE id = ?1",
        params![id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
                display_name: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    )
}
