// ================
// common/src/lib.rs
// ================
//! Domain records shared between the gatekeeper engine and its callers.
//!
//! These are plain data carriers. Relationship semantics (role membership,
//! permission grants, attempt counting) live in the engine crate. A record
//! with `id: None` has not been persisted yet, or has been demoted by a
//! `delete` and must be treated as dead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Store-assigned primary key. Ids are monotonic and unique per table and
/// never reassigned.
pub type RecordId = i64;

/// An account that can hold role memberships and direct permission grants.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    /// Primary key, `None` until first save.
    pub id: Option<RecordId>,
    /// Client-generated opaque unique identifier.
    pub uuid: String,
    /// Unique account name.
    pub name: String,
    pub description: String,
    pub email: String,
    /// Opaque hash produced by the password service; never plaintext.
    pub password_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

impl User {
    /// Build an unsaved user. The uuid comes from the caller's uuid source.
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            uuid: uuid.into(),
            name: name.into(),
            description: String::new(),
            email: String::new(),
            password_hash: String::new(),
            active: true,
            created_at: now,
            last_update: now,
        }
    }

    pub fn is_stored(&self) -> bool {
        self.id.is_some()
    }
}

/// A named bundle of permissions users can be members of.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Role {
    pub id: Option<RecordId>,
    /// Unique role name.
    pub name: String,
    pub description: String,
    pub active: bool,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            active: true,
        }
    }

    pub fn is_stored(&self) -> bool {
        self.id.is_some()
    }
}

/// Leaf entity: referenced by users and roles, owns nothing itself.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Permission {
    pub id: Option<RecordId>,
    /// Unique permission name.
    pub name: String,
    pub description: String,
}

impl Permission {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn is_stored(&self) -> bool {
        self.id.is_some()
    }
}

/// One authentication attempt. Append-only: once persisted the record is a
/// fact and the store refuses updates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoginAttempt {
    pub id: Option<RecordId>,
    pub user_name: String,
    pub session_id: String,
    pub ip_address: IpAddr,
    pub created_at: DateTime<Utc>,
}

impl LoginAttempt {
    pub fn new(
        user_name: impl Into<String>,
        session_id: impl Into<String>,
        ip_address: IpAddr,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            user_name: user_name.into(),
            session_id: session_id.into(),
            ip_address,
            created_at,
        }
    }

    pub fn is_stored(&self) -> bool {
        self.id.is_some()
    }
}
