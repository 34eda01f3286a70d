// ============================
// crates/engine/src/storage/memory.rs
// ============================
//! In-memory reference implementation of the storage contract.
//!
//! Tables are ordered maps so `fetch_all` / `fetch_limit` come back in id
//! order without extra sorting. Each operation takes its table lock once,
//! so a mutation is observed atomically by concurrent readers.
use crate::error::AuthError;
use crate::storage::{
    AttemptSelector, AttemptStore, PermissionStore, Relation, RelationStore, RoleStore, UserStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatekeeper_common::{LoginAttempt, Permission, RecordId, Role, User};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, Ordering};

type Table<T> = RwLock<BTreeMap<RecordId, T>>;
type JoinTable = RwLock<BTreeSet<(RecordId, RecordId)>>;

/// In-memory store backing the engine in tests and embedded use.
#[derive(Default)]
pub struct MemoryStore {
    users: Table<User>,
    roles: Table<Role>,
    permissions: Table<Permission>,
    attempts: Table<LoginAttempt>,

    user_roles: JoinTable,
    user_permissions: JoinTable,
    role_permissions: JoinTable,

    user_seq: AtomicI64,
    role_seq: AtomicI64,
    permission_seq: AtomicI64,
    attempt_seq: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn join_table(&self, relation: Relation) -> &JoinTable {
        match relation {
            Relation::UserRole => &self.user_roles,
            Relation::UserPermission => &self.user_permissions,
            Relation::RolePermission => &self.role_permissions,
        }
    }

    fn next_id(seq: &AtomicI64) -> RecordId {
        seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn ensure_unique_name<T>(
        table: &BTreeMap<RecordId, T>,
        entity: &'static str,
        name: &str,
        own_id: Option<RecordId>,
        name_of: impl Fn(&T) -> &str,
    ) -> Result<(), AuthError> {
        let clash = table
            .iter()
            .any(|(id, row)| name_of(row) == name && Some(*id) != own_id);
        if clash {
            return Err(AuthError::DuplicateName {
                entity,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn window<T: Clone>(table: &BTreeMap<RecordId, T>, offset: usize, row_count: usize) -> Vec<T> {
        table.values().skip(offset).take(row_count).cloned().collect()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn fetch_user_by_id(&self, id: RecordId) -> Result<Option<User>, AuthError> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn fetch_user_by_name(&self, name: &str) -> Result<Option<User>, AuthError> {
        Ok(self.users.read().values().find(|u| u.name == name).cloned())
    }

    async fn fetch_users(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.users.read().values().cloned().collect())
    }

    async fn fetch_users_limit(
        &self,
        offset: usize,
        row_count: usize,
    ) -> Result<Vec<User>, AuthError> {
        Ok(Self::window(&self.users.read(), offset, row_count))
    }

    async fn save_user(&self, user: &mut User) -> Result<(), AuthError> {
        let mut users = self.users.write();
        Self::ensure_unique_name(&users, "user", &user.name, user.id, |u| &u.name)?;
        match user.id {
            None => {
                let id = Self::next_id(&self.user_seq);
                user.id = Some(id);
                users.insert(id, user.clone());
            }
            Some(id) => {
                if !users.contains_key(&id) {
                    return Err(AuthError::not_found("user", id.to_string()));
                }
                user.last_update = Utc::now();
                users.insert(id, user.clone());
            }
        }
        Ok(())
    }

    async fn delete_user(&self, user: &mut User) -> Result<(), AuthError> {
        if let Some(id) = user.id.take() {
            self.users.write().remove(&id);
            // relational backends cascade the join rows; so do we
            self.user_roles.write().retain(|&(uid, _)| uid != id);
            self.user_permissions.write().retain(|&(uid, _)| uid != id);
        }
        Ok(())
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn fetch_role_by_id(&self, id: RecordId) -> Result<Option<Role>, AuthError> {
        Ok(self.roles.read().get(&id).cloned())
    }

    async fn fetch_role_by_name(&self, name: &str) -> Result<Option<Role>, AuthError> {
        Ok(self.roles.read().values().find(|r| r.name == name).cloned())
    }

    async fn fetch_roles(&self) -> Result<Vec<Role>, AuthError> {
        Ok(self.roles.read().values().cloned().collect())
    }

    async fn fetch_roles_limit(
        &self,
        offset: usize,
        row_count: usize,
    ) -> Result<Vec<Role>, AuthError> {
        Ok(Self::window(&self.roles.read(), offset, row_count))
    }

    async fn save_role(&self, role: &mut Role) -> Result<(), AuthError> {
        let mut roles = self.roles.write();
        Self::ensure_unique_name(&roles, "role", &role.name, role.id, |r| &r.name)?;
        match role.id {
            None => {
                let id = Self::next_id(&self.role_seq);
                role.id = Some(id);
                roles.insert(id, role.clone());
            }
            Some(id) => {
                if !roles.contains_key(&id) {
                    return Err(AuthError::not_found("role", id.to_string()));
                }
                roles.insert(id, role.clone());
            }
        }
        Ok(())
    }

    async fn delete_role(&self, role: &mut Role) -> Result<(), AuthError> {
        if let Some(id) = role.id.take() {
            self.roles.write().remove(&id);
            self.user_roles.write().retain(|&(_, rid)| rid != id);
            self.role_permissions.write().retain(|&(rid, _)| rid != id);
        }
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn fetch_permission_by_id(&self, id: RecordId) -> Result<Option<Permission>, AuthError> {
        Ok(self.permissions.read().get(&id).cloned())
    }

    async fn fetch_permission_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Permission>, AuthError> {
        Ok(self
            .permissions
            .read()
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn fetch_permissions(&self) -> Result<Vec<Permission>, AuthError> {
        Ok(self.permissions.read().values().cloned().collect())
    }

    async fn fetch_permissions_limit(
        &self,
        offset: usize,
        row_count: usize,
    ) -> Result<Vec<Permission>, AuthError> {
        Ok(Self::window(&self.permissions.read(), offset, row_count))
    }

    async fn save_permission(&self, permission: &mut Permission) -> Result<(), AuthError> {
        let mut permissions = self.permissions.write();
        Self::ensure_unique_name(
            &permissions,
            "permission",
            &permission.name,
            permission.id,
            |p| &p.name,
        )?;
        match permission.id {
            None => {
                let id = Self::next_id(&self.permission_seq);
                permission.id = Some(id);
                permissions.insert(id, permission.clone());
            }
            Some(id) => {
                if !permissions.contains_key(&id) {
                    return Err(AuthError::not_found("permission", id.to_string()));
                }
                permissions.insert(id, permission.clone());
            }
        }
        Ok(())
    }

    async fn delete_permission(&self, permission: &mut Permission) -> Result<(), AuthError> {
        if let Some(id) = permission.id.take() {
            self.permissions.write().remove(&id);
            self.user_permissions.write().retain(|&(_, pid)| pid != id);
            self.role_permissions.write().retain(|&(_, pid)| pid != id);
        }
        Ok(())
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn fetch_attempt_by_id(&self, id: RecordId) -> Result<Option<LoginAttempt>, AuthError> {
        Ok(self.attempts.read().get(&id).cloned())
    }

    async fn fetch_attempts(&self) -> Result<Vec<LoginAttempt>, AuthError> {
        Ok(self.attempts.read().values().cloned().collect())
    }

    async fn fetch_attempts_limit(
        &self,
        offset: usize,
        row_count: usize,
    ) -> Result<Vec<LoginAttempt>, AuthError> {
        Ok(Self::window(&self.attempts.read(), offset, row_count))
    }

    async fn save_attempt(&self, attempt: &mut LoginAttempt) -> Result<(), AuthError> {
        if attempt.id.is_some() {
            return Err(AuthError::UpdateNotSupported("LoginAttempt"));
        }
        let id = Self::next_id(&self.attempt_seq);
        attempt.id = Some(id);
        self.attempts.write().insert(id, attempt.clone());
        Ok(())
    }

    async fn delete_attempt(&self, attempt: &mut LoginAttempt) -> Result<(), AuthError> {
        if let Some(id) = attempt.id.take() {
            self.attempts.write().remove(&id);
        }
        Ok(())
    }

    async fn count_attempts(
        &self,
        selector: AttemptSelector<'_>,
        since: DateTime<Utc>,
    ) -> Result<u64, AuthError> {
        let attempts = self.attempts.read();
        let count = attempts
            .values()
            .filter(|a| a.created_at >= since)
            .filter(|a| match selector {
                AttemptSelector::UserName(name) => a.user_name == name,
                AttemptSelector::SessionId(session) => a.session_id == session,
                AttemptSelector::Ip(ip) => a.ip_address == ip,
            })
            .count();
        Ok(count as u64)
    }

    async fn delete_attempts_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut attempts = self.attempts.write();
        let before = attempts.len();
        attempts.retain(|_, a| a.created_at >= cutoff);
        Ok((before - attempts.len()) as u64)
    }
}

#[async_trait]
impl RelationStore for MemoryStore {
    async fn link(
        &self,
        relation: Relation,
        left: RecordId,
        right: RecordId,
    ) -> Result<bool, AuthError> {
        Ok(self.join_table(relation).write().insert((left, right)))
    }

    async fn unlink(
        &self,
        relation: Relation,
        left: RecordId,
        right: RecordId,
    ) -> Result<bool, AuthError> {
        Ok(self.join_table(relation).write().remove(&(left, right)))
    }

    async fn linked(
        &self,
        relation: Relation,
        left: RecordId,
        right: RecordId,
    ) -> Result<bool, AuthError> {
        Ok(self.join_table(relation).read().contains(&(left, right)))
    }

    async fn forward(
        &self,
        relation: Relation,
        left: RecordId,
    ) -> Result<Vec<RecordId>, AuthError> {
        let table = self.join_table(relation).read();
        Ok(table
            .range((left, RecordId::MIN)..=(left, RecordId::MAX))
            .map(|&(_, right)| right)
            .collect())
    }

    async fn reverse(
        &self,
        relation: Relation,
        right: RecordId,
    ) -> Result<Vec<RecordId>, AuthError> {
        let table = self.join_table(relation).read();
        Ok(table
            .iter()
            .filter(|&&(_, r)| r == right)
            .map(|&(left, _)| left)
            .collect())
    }
}
