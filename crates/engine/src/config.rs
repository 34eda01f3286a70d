// ============================
// crates/engine/src/config.rs
// ============================
//! Configuration management.
use crate::error::AuthError;
use serde::Deserialize;

/// Engine settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log level for the tracing subscriber
    pub log_level: String,
    /// Trailing window for brute-force attempt counting, in seconds
    pub attempt_window_secs: i64,
    /// Attempts tolerated per user name within the window
    pub max_attempts_per_user: u64,
    /// Attempts tolerated per session id within the window
    pub max_attempts_per_session: u64,
    /// Attempts tolerated per ip address within the window
    pub max_attempts_per_ip: u64,
    /// Password complexity requirements
    pub password_requirements: PasswordRequirements,
}

/// Password complexity requirements.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordRequirements {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            attempt_window_secs: 900,
            max_attempts_per_user: 5,
            max_attempts_per_session: 10,
            max_attempts_per_ip: 20,
            password_requirements: PasswordRequirements::default(),
        }
    }
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: 10,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
        }
    }
}

impl Settings {
    /// Load settings from `gatekeeper.{toml,yaml,json}` in the working
    /// directory, then `GATEKEEPER_*` environment variables on top.
    pub fn load() -> Result<Self, AuthError> {
        Self::load_from("gatekeeper")
    }

    /// Load settings with an explicit config file base name or path.
    pub fn load_from(name: &str) -> Result<Self, AuthError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(name).required(false))
            .add_source(config::Environment::with_prefix("GATEKEEPER").separator("__"))
            .build()?;

        let settings: Settings = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings consistency.
    pub fn validate(&self) -> Result<(), AuthError> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.as_str()) {
            return Err(AuthError::Config(format!(
                "unknown log level: {}",
                self.log_level
            )));
        }
        if self.attempt_window_secs <= 0 {
            return Err(AuthError::Config(
                "attempt_window_secs must be positive".to_string(),
            ));
        }
        if self.max_attempts_per_user == 0
            || self.max_attempts_per_session == 0
            || self.max_attempts_per_ip == 0
        {
            return Err(AuthError::Config(
                "attempt limits must be at least 1".to_string(),
            ));
        }
        if self.password_requirements.min_length < 8 {
            return Err(AuthError::Config(
                "password min_length must be at least 8".to_string(),
            ));
        }
        Ok(())
    }
}
