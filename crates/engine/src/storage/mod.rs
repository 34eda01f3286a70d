// ============================
// crates/engine/src/storage/mod.rs
// ============================
//! Storage abstraction: typed CRUD per entity plus the three join tables.
//!
//! The engine consumes this contract; the relational backend behind it is a
//! collaborator, not something reimplemented here. [`memory::MemoryStore`]
//! is the bundled reference implementation.
pub mod memory;

pub use memory::MemoryStore;

use crate::error::AuthError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatekeeper_common::{LoginAttempt, Permission, RecordId, Role, User};
use std::net::IpAddr;

/// The three join tables the relationship graph operates on.
///
/// `forward` walks left-to-right (e.g. user id -> permission ids),
/// `reverse` walks right-to-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Relation {
    /// (user id, role id)
    UserRole,
    /// (user id, permission id)
    UserPermission,
    /// (role id, permission id)
    RolePermission,
}

/// Selector for windowed login-attempt counts.
#[derive(Debug, Clone, Copy)]
pub enum AttemptSelector<'a> {
    UserName(&'a str),
    SessionId(&'a str),
    Ip(IpAddr),
}

/// Typed CRUD over users.
///
/// Single-row lookups return `Ok(None)` on a miss; that is the not-found
/// sentinel, not an error. `save` with `id: None` inserts and writes the
/// assigned id back; with `id: Some` it updates in place. `delete` removes
/// the row and demotes the handle to `id: None`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn fetch_user_by_id(&self, id: RecordId) -> Result<Option<User>, AuthError>;
    async fn fetch_user_by_name(&self, name: &str) -> Result<Option<User>, AuthError>;
    /// All users ordered by id ascending.
    async fn fetch_users(&self) -> Result<Vec<User>, AuthError>;
    /// Exactly `row_count` users starting at `offset` in id order; fewer
    /// only when the table is exhausted.
    async fn fetch_users_limit(
        &self,
        offset: usize,
        row_count: usize,
    ) -> Result<Vec<User>, AuthError>;
    async fn save_user(&self, user: &mut User) -> Result<(), AuthError>;
    async fn delete_user(&self, user: &mut User) -> Result<(), AuthError>;
}

/// Typed CRUD over roles. Same conventions as [`UserStore`].
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn fetch_role_by_id(&self, id: RecordId) -> Result<Option<Role>, AuthError>;
    async fn fetch_role_by_name(&self, name: &str) -> Result<Option<Role>, AuthError>;
    async fn fetch_roles(&self) -> Result<Vec<Role>, AuthError>;
    async fn fetch_roles_limit(
        &self,
        offset: usize,
        row_count: usize,
    ) -> Result<Vec<Role>, AuthError>;
    async fn save_role(&self, role: &mut Role) -> Result<(), AuthError>;
    async fn delete_role(&self, role: &mut Role) -> Result<(), AuthError>;
}

/// Typed CRUD over permissions. Same conventions as [`UserStore`].
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn fetch_permission_by_id(&self, id: RecordId) -> Result<Option<Permission>, AuthError>;
    async fn fetch_permission_by_name(&self, name: &str)
        -> Result<Option<Permission>, AuthError>;
    async fn fetch_permissions(&self) -> Result<Vec<Permission>, AuthError>;
    async fn fetch_permissions_limit(
        &self,
        offset: usize,
        row_count: usize,
    ) -> Result<Vec<Permission>, AuthError>;
    async fn save_permission(&self, permission: &mut Permission) -> Result<(), AuthError>;
    async fn delete_permission(&self, permission: &mut Permission) -> Result<(), AuthError>;
}

/// Append-only storage for login attempts.
///
/// `save_attempt` on an already-persisted record fails with
/// [`AuthError::UpdateNotSupported`]: attempts are facts, not mutable rows.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn fetch_attempt_by_id(&self, id: RecordId) -> Result<Option<LoginAttempt>, AuthError>;
    async fn fetch_attempts(&self) -> Result<Vec<LoginAttempt>, AuthError>;
    async fn fetch_attempts_limit(
        &self,
        offset: usize,
        row_count: usize,
    ) -> Result<Vec<LoginAttempt>, AuthError>;
    async fn save_attempt(&self, attempt: &mut LoginAttempt) -> Result<(), AuthError>;
    async fn delete_attempt(&self, attempt: &mut LoginAttempt) -> Result<(), AuthError>;
    /// Count attempts matching `selector` with `created_at >= since`.
    async fn count_attempts(
        &self,
        selector: AttemptSelector<'_>,
        since: DateTime<Utc>,
    ) -> Result<u64, AuthError>;
    /// Delete attempts with `created_at < cutoff`; returns rows removed.
    /// A cutoff in the future is valid and empties the table.
    async fn delete_attempts_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError>;
}

/// Join-table primitives. Insert/delete report whether they changed
/// anything so callers get idempotence for free.
#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Insert the pair if absent. Returns true if a row was created.
    async fn link(
        &self,
        relation: Relation,
        left: RecordId,
        right: RecordId,
    ) -> Result<bool, AuthError>;
    /// Delete the pair if present. Returns true if a row was removed.
    async fn unlink(
        &self,
        relation: Relation,
        left: RecordId,
        right: RecordId,
    ) -> Result<bool, AuthError>;
    async fn linked(
        &self,
        relation: Relation,
        left: RecordId,
        right: RecordId,
    ) -> Result<bool, AuthError>;
    /// Right-side ids paired with `left`, ascending.
    async fn forward(&self, relation: Relation, left: RecordId)
        -> Result<Vec<RecordId>, AuthError>;
    /// Left-side ids paired with `right`, ascending.
    async fn reverse(
        &self,
        relation: Relation,
        right: RecordId,
    ) -> Result<Vec<RecordId>, AuthError>;
}

/// The full storage surface the engine is wired against.
pub trait Store:
    UserStore + RoleStore + PermissionStore + AttemptStore + RelationStore
{
}

impl<T: UserStore + RoleStore + PermissionStore + AttemptStore + RelationStore> Store for T {}
