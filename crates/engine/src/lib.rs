// ============================
// crates/engine/src/lib.rs
// ============================
//! Authorization relationship engine with a brute-force detection ledger.
//!
//! The [`RelationGraph`] owns the many-to-many graph between users, roles
//! and permissions; the [`AttemptLedger`] aggregates authentication
//! attempts over trailing time windows. Both read and write through the
//! storage traits in [`storage`], so the relational backend stays an
//! external collaborator.

pub mod config;
pub mod error;
pub mod graph;
pub mod ledger;
pub mod metrics;
pub mod password;
pub mod provider;
pub mod resolver;
pub mod storage;
pub mod validation;

pub use config::Settings;
pub use error::AuthError;
pub use graph::RelationGraph;
pub use ledger::AttemptLedger;
pub use resolver::{PermissionRef, Resolver, RoleRef, UserRef};
pub use storage::{MemoryStore, Store};

use crate::config::PasswordRequirements;
use crate::password::{
    hash_password_secure, validate_password_strength, Argon2Service, PasswordService,
};
use crate::provider::{Clock, RandomUuidSource, SystemClock, UuidSource};
use crate::validation::{validate_email, validate_entity_name};
use gatekeeper_common::User;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a login verification.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Credentials matched an active user.
    Granted(User),
    /// Unknown user, wrong password, or deactivated account. The attempt
    /// has been recorded in the ledger.
    InvalidCredentials,
    /// Too many recent attempts for this user, session or ip.
    Throttled,
}

/// Engine state wiring the graph, the ledger and their collaborators
/// around one storage backend.
pub struct Engine {
    settings: Arc<Settings>,
    store: Arc<dyn Store>,
    graph: Arc<RelationGraph>,
    ledger: Arc<AttemptLedger>,
    passwords: Arc<dyn PasswordService>,
    uuids: Arc<dyn UuidSource>,
}

impl Engine {
    /// Create an engine with the default collaborators: system clock,
    /// random uuids, argon2 hashing.
    pub fn new(store: Arc<dyn Store>, settings: Settings) -> Result<Self, AuthError> {
        Self::with_providers(
            store,
            settings,
            Arc::new(SystemClock),
            Arc::new(RandomUuidSource),
            Arc::new(Argon2Service),
        )
    }

    /// Create an engine with explicit collaborators, for deterministic
    /// tests or alternative hashing backends.
    pub fn with_providers(
        store: Arc<dyn Store>,
        settings: Settings,
        clock: Arc<dyn Clock>,
        uuids: Arc<dyn UuidSource>,
        passwords: Arc<dyn PasswordService>,
    ) -> Result<Self, AuthError> {
        settings.validate()?;
        let graph = Arc::new(RelationGraph::new(store.clone()));
        let ledger = Arc::new(AttemptLedger::new(store.clone(), clock));
        Ok(Self {
            settings: Arc::new(settings),
            store,
            graph,
            ledger,
            passwords,
            uuids,
        })
    }

    /// In-memory engine with default settings.
    pub fn in_memory() -> Result<Self, AuthError> {
        Self::new(Arc::new(MemoryStore::new()), Settings::default())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn graph(&self) -> &RelationGraph {
        &self.graph
    }

    pub fn ledger(&self) -> &AttemptLedger {
        &self.ledger
    }

    pub fn password_requirements(&self) -> &PasswordRequirements {
        &self.settings.password_requirements
    }

    /// Validate, hash and persist a new active user.
    pub async fn register_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        validate_entity_name("user name", name)?;
        validate_email(email)?;
        if !validate_password_strength(password, &self.settings.password_requirements) {
            return Err(AuthError::Validation {
                field: "password",
                reason: "does not meet complexity requirements".to_string(),
            });
        }

        let mut plain = password.to_string();
        let hash = hash_password_secure(self.passwords.as_ref(), &mut plain)
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        let mut user = User::new(self.uuids.next_uuid(), name);
        user.email = email.to_string();
        user.password_hash = hash;
        self.store.save_user(&mut user).await?;

        info!(name, "registered user");
        Ok(user)
    }

    /// Check credentials against the store, with brute-force throttling
    /// from the ledger. Failed attempts are recorded; successful ones are
    /// not.
    pub async fn verify_login(
        &self,
        name: &str,
        password: &str,
        session_id: &str,
        ip_address: IpAddr,
    ) -> Result<LoginOutcome, AuthError> {
        let window = self.settings.attempt_window_secs;
        let over_limit = self.ledger.count_with_same_user(name, window).await?
            >= self.settings.max_attempts_per_user
            || self.ledger.count_with_same_session(session_id, window).await?
                >= self.settings.max_attempts_per_session
            || self.ledger.count_with_same_ip(ip_address, window).await?
                >= self.settings.max_attempts_per_ip;
        if over_limit {
            warn!(name, %ip_address, "login throttled");
            return Ok(LoginOutcome::Throttled);
        }

        match self.store.fetch_user_by_name(name).await? {
            Some(user) if user.active && self.passwords.verify(&user.password_hash, password) => {
                Ok(LoginOutcome::Granted(user))
            }
            _ => {
                self.ledger.record(name, session_id, ip_address).await?;
                Ok(LoginOutcome::InvalidCredentials)
            }
        }
    }
}

/// Initialize the tracing subscriber from settings; `RUST_LOG` wins when
/// present. Safe to call more than once.
pub fn init_logging(settings: &Settings) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(settings.log_level.clone()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FixedClock;
    use chrono::Utc;

    fn test_engine() -> Engine {
        Engine::with_providers(
            Arc::new(MemoryStore::new()),
            Settings::default(),
            Arc::new(FixedClock::new(Utc::now())),
            Arc::new(RandomUuidSource),
            Arc::new(Argon2Service),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let engine = test_engine();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        let user = engine
            .register_user("root", "root@example.com", "S3cure-enough!")
            .await
            .unwrap();
        assert!(user.is_stored());
        assert!(!user.uuid.is_empty());
        assert_ne!(user.password_hash, "S3cure-enough!");

        let outcome = engine
            .verify_login("root", "S3cure-enough!", "session-a", ip)
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::Granted(u) if u.name == "root"));

        let outcome = engine
            .verify_login("root", "wrong-password", "session-a", ip)
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::InvalidCredentials));
    }

    #[tokio::test]
    async fn weak_passwords_are_rejected_before_hashing() {
        let engine = test_engine();
        let err = engine
            .register_user("root", "root@example.com", "weak")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation { field: "password", .. }));
    }

    #[tokio::test]
    async fn duplicate_registration_surfaces_constraint() {
        let engine = test_engine();
        engine
            .register_user("root", "root@example.com", "S3cure-enough!")
            .await
            .unwrap();
        let err = engine
            .register_user("root", "other@example.com", "S3cure-enough!")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateName { .. }));
    }

    #[tokio::test]
    async fn repeated_failures_throttle_the_user() {
        let engine = test_engine();
        let ip: IpAddr = "192.168.1.2".parse().unwrap();
        engine
            .register_user("root", "root@example.com", "S3cure-enough!")
            .await
            .unwrap();

        let limit = engine.settings().max_attempts_per_user;
        for _ in 0..limit {
            let outcome = engine
                .verify_login("root", "wrong-password", "session-a", ip)
                .await
                .unwrap();
            assert!(matches!(outcome, LoginOutcome::InvalidCredentials));
        }

        // even the right password is throttled now
        let outcome = engine
            .verify_login("root", "S3cure-enough!", "session-a", ip)
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::Throttled));
    }
}
