// ==============
// crates/engine/src/metrics.rs

//! Central place for metric keys
pub const PERMISSION_GRANTED: &str = "rbac.permission.granted";
pub const PERMISSION_REVOKED: &str = "rbac.permission.revoked";
pub const ROLE_ASSIGNED: &str = "rbac.role.assigned";
pub const ROLE_REMOVED: &str = "rbac.role.removed";
pub const CACHE_REBUILD: &str = "rbac.cache.rebuild";
pub const ATTEMPT_RECORDED: &str = "ledger.attempt.recorded";
pub const ATTEMPT_PURGED: &str = "ledger.attempt.purged";
