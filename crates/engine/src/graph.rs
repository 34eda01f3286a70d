// ============================
// crates/engine/src/graph.rs
// ============================
//! Relationship graph engine.
//!
//! Owns the User/Role, User/Permission and Role/Permission join tables.
//! Grants and revokes are idempotent set-membership toggles: the presence
//! of a join row *is* the grant, absence is revocation. A per-user cached
//! permission set answers `user_can` without re-walking the graph.
//!
//! Cache coherence rule: every mutation path routes through one
//! invalidation entry point before returning, so no caller can observe a
//! grant without the matching cache state.
use crate::error::AuthError;
use crate::metrics as metric_keys;
use crate::resolver::{PermissionRef, Resolver, RoleRef, UserRef};
use crate::storage::{Relation, Store};
use dashmap::DashMap;
use gatekeeper_common::{Permission, RecordId, Role, User};
use metrics::counter;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Cached effective permissions for one user. The epoch counts
/// invalidations; a rebuild that started under an older epoch raced a
/// mutation and must not be cached.
#[derive(Default)]
struct CacheSlot {
    epoch: u64,
    set: Option<Arc<HashSet<RecordId>>>,
}

/// Graph engine over the three join tables, with a per-user permission
/// membership cache.
pub struct RelationGraph {
    store: Arc<dyn Store>,
    resolver: Resolver,
    /// user id -> direct grants unioned with role-inherited grants
    cache: DashMap<RecordId, CacheSlot>,
}

impl RelationGraph {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let resolver = Resolver::new(store.clone());
        Self {
            store,
            resolver,
            cache: DashMap::new(),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    // ==== cache ====

    /// The single invalidation entry point. Direct grants, role membership
    /// changes, role-permission changes and entity deletions all funnel
    /// through here. Bumping the epoch under the entry lock kills any
    /// rebuild still in flight for this user.
    fn invalidate_user(&self, user_id: RecordId) {
        let mut slot = self.cache.entry(user_id).or_default();
        slot.epoch += 1;
        slot.set = None;
    }

    /// Invalidate every member of a role after its permission set changed.
    async fn invalidate_role_members(&self, role_id: RecordId) -> Result<(), AuthError> {
        for user_id in self.store.reverse(Relation::UserRole, role_id).await? {
            self.invalidate_user(user_id);
        }
        Ok(())
    }

    /// Cached permission set for a user, rebuilt from the store on miss.
    ///
    /// The rebuild is not atomic with the store reads, so the slot's epoch
    /// is sampled first and re-checked under the entry lock before caching.
    /// An epoch mismatch means an invalidation landed mid-rebuild; the
    /// stale set is thrown away and the rebuild starts over against the
    /// mutated state.
    async fn permission_set(
        &self,
        user_id: RecordId,
    ) -> Result<Arc<HashSet<RecordId>>, AuthError> {
        loop {
            let epoch = match self.cache.get(&user_id) {
                Some(slot) => {
                    if let Some(set) = &slot.set {
                        return Ok(Arc::clone(set));
                    }
                    slot.epoch
                }
                None => 0,
            };

            let mut set: HashSet<RecordId> = self
                .store
                .forward(Relation::UserPermission, user_id)
                .await?
                .into_iter()
                .collect();
            for role_id in self.store.forward(Relation::UserRole, user_id).await? {
                set.extend(
                    self.store
                        .forward(Relation::RolePermission, role_id)
                        .await?,
                );
            }

            counter!(metric_keys::CACHE_REBUILD).increment(1);
            debug!(user_id, permissions = set.len(), "rebuilt permission cache");

            let set = Arc::new(set);
            let mut slot = self.cache.entry(user_id).or_default();
            if slot.epoch == epoch {
                slot.set = Some(Arc::clone(&set));
                return Ok(set);
            }
        }
    }

    // ==== user permission grants ====

    /// Grant a permission directly to a user. Granting an already-granted
    /// permission is a no-op success.
    pub async fn grant_user_permission<'a>(
        &self,
        user: impl Into<UserRef<'a>>,
        permission: impl Into<PermissionRef<'a>>,
    ) -> Result<(), AuthError> {
        let user_id = self.resolver.user_id(user.into()).await?;
        let permission_id = self.resolver.permission_id(permission.into()).await?;

        if self
            .store
            .link(Relation::UserPermission, user_id, permission_id)
            .await?
        {
            counter!(metric_keys::PERMISSION_GRANTED).increment(1);
            debug!(user_id, permission_id, "granted user permission");
        }
        self.invalidate_user(user_id);
        Ok(())
    }

    /// Revoke a direct user permission. Revoking an ungranted permission is
    /// a no-op success.
    pub async fn revoke_user_permission<'a>(
        &self,
        user: impl Into<UserRef<'a>>,
        permission: impl Into<PermissionRef<'a>>,
    ) -> Result<(), AuthError> {
        let user_id = self.resolver.user_id(user.into()).await?;
        let permission_id = self.resolver.permission_id(permission.into()).await?;

        if self
            .store
            .unlink(Relation::UserPermission, user_id, permission_id)
            .await?
        {
            counter!(metric_keys::PERMISSION_REVOKED).increment(1);
            debug!(user_id, permission_id, "revoked user permission");
        }
        self.invalidate_user(user_id);
        Ok(())
    }

    /// True iff the user holds the permission directly or through any of
    /// their roles.
    pub async fn user_can<'a>(
        &self,
        user: impl Into<UserRef<'a>>,
        permission: impl Into<PermissionRef<'a>>,
    ) -> Result<bool, AuthError> {
        let Some(user_id) = self.resolver.try_user_id(user.into()).await? else {
            return Ok(false);
        };
        let Some(permission_id) = self.resolver.try_permission_id(permission.into()).await? else {
            return Ok(false);
        };
        Ok(self.permission_set(user_id).await?.contains(&permission_id))
    }

    // ==== role permission grants ====

    /// Grant a permission to a role; every member inherits it.
    pub async fn grant_role_permission<'a>(
        &self,
        role: impl Into<RoleRef<'a>>,
        permission: impl Into<PermissionRef<'a>>,
    ) -> Result<(), AuthError> {
        let role_id = self.resolver.role_id(role.into()).await?;
        let permission_id = self.resolver.permission_id(permission.into()).await?;

        if self
            .store
            .link(Relation::RolePermission, role_id, permission_id)
            .await?
        {
            counter!(metric_keys::PERMISSION_GRANTED).increment(1);
            debug!(role_id, permission_id, "granted role permission");
        }
        self.invalidate_role_members(role_id).await
    }

    /// Revoke a role permission. No-op success if it was never granted.
    pub async fn revoke_role_permission<'a>(
        &self,
        role: impl Into<RoleRef<'a>>,
        permission: impl Into<PermissionRef<'a>>,
    ) -> Result<(), AuthError> {
        let role_id = self.resolver.role_id(role.into()).await?;
        let permission_id = self.resolver.permission_id(permission.into()).await?;

        if self
            .store
            .unlink(Relation::RolePermission, role_id, permission_id)
            .await?
        {
            counter!(metric_keys::PERMISSION_REVOKED).increment(1);
            debug!(role_id, permission_id, "revoked role permission");
        }
        self.invalidate_role_members(role_id).await
    }

    /// True iff the role itself holds the permission.
    pub async fn role_can<'a>(
        &self,
        role: impl Into<RoleRef<'a>>,
        permission: impl Into<PermissionRef<'a>>,
    ) -> Result<bool, AuthError> {
        let Some(role_id) = self.resolver.try_role_id(role.into()).await? else {
            return Ok(false);
        };
        let Some(permission_id) = self.resolver.try_permission_id(permission.into()).await? else {
            return Ok(false);
        };
        self.store
            .linked(Relation::RolePermission, role_id, permission_id)
            .await
    }

    // ==== role membership ====

    /// Add a user to a role. Idempotent.
    pub async fn add_role<'a>(
        &self,
        user: impl Into<UserRef<'a>>,
        role: impl Into<RoleRef<'a>>,
    ) -> Result<(), AuthError> {
        let user_id = self.resolver.user_id(user.into()).await?;
        let role_id = self.resolver.role_id(role.into()).await?;

        if self.store.link(Relation::UserRole, user_id, role_id).await? {
            counter!(metric_keys::ROLE_ASSIGNED).increment(1);
            debug!(user_id, role_id, "added role to user");
        }
        self.invalidate_user(user_id);
        Ok(())
    }

    /// Remove a user from a role. No-op success if not a member.
    pub async fn remove_role<'a>(
        &self,
        user: impl Into<UserRef<'a>>,
        role: impl Into<RoleRef<'a>>,
    ) -> Result<(), AuthError> {
        let user_id = self.resolver.user_id(user.into()).await?;
        let role_id = self.resolver.role_id(role.into()).await?;

        if self
            .store
            .unlink(Relation::UserRole, user_id, role_id)
            .await?
        {
            counter!(metric_keys::ROLE_REMOVED).increment(1);
            debug!(user_id, role_id, "removed role from user");
        }
        self.invalidate_user(user_id);
        Ok(())
    }

    /// Role-side spelling of [`add_role`](Self::add_role); both sides write
    /// the same join row.
    pub async fn add_user<'a>(
        &self,
        role: impl Into<RoleRef<'a>>,
        user: impl Into<UserRef<'a>>,
    ) -> Result<(), AuthError> {
        self.add_role(user, role).await
    }

    /// Role-side spelling of [`remove_role`](Self::remove_role).
    pub async fn remove_user<'a>(
        &self,
        role: impl Into<RoleRef<'a>>,
        user: impl Into<UserRef<'a>>,
    ) -> Result<(), AuthError> {
        self.remove_role(user, role).await
    }

    /// True iff the user is a member of the role.
    pub async fn has_role<'a>(
        &self,
        user: impl Into<UserRef<'a>>,
        role: impl Into<RoleRef<'a>>,
    ) -> Result<bool, AuthError> {
        let Some(user_id) = self.resolver.try_user_id(user.into()).await? else {
            return Ok(false);
        };
        let Some(role_id) = self.resolver.try_role_id(role.into()).await? else {
            return Ok(false);
        };
        self.store.linked(Relation::UserRole, user_id, role_id).await
    }

    // ==== entity removal ====
    //
    // Deleting an entity through the store cascades its join rows but the
    // store knows nothing about this cache. These wrappers capture the
    // affected users first, delete, then invalidate, so a primed
    // `user_can` cannot keep answering from grants that no longer exist.

    /// Delete a user and drop their cached permission set.
    pub async fn delete_user(&self, user: &mut User) -> Result<(), AuthError> {
        let user_id = user.id;
        self.store.delete_user(user).await?;
        if let Some(user_id) = user_id {
            self.invalidate_user(user_id);
        }
        Ok(())
    }

    /// Delete a role, invalidating every member's inherited permissions.
    pub async fn delete_role(&self, role: &mut Role) -> Result<(), AuthError> {
        let members = match role.id {
            Some(role_id) => self.store.reverse(Relation::UserRole, role_id).await?,
            None => Vec::new(),
        };
        self.store.delete_role(role).await?;
        for user_id in members {
            self.invalidate_user(user_id);
        }
        Ok(())
    }

    /// Delete a permission, invalidating direct holders and every member
    /// of a role that held it.
    pub async fn delete_permission(
        &self,
        permission: &mut Permission,
    ) -> Result<(), AuthError> {
        let mut affected = Vec::new();
        if let Some(permission_id) = permission.id {
            affected = self
                .store
                .reverse(Relation::UserPermission, permission_id)
                .await?;
            for role_id in self
                .store
                .reverse(Relation::RolePermission, permission_id)
                .await?
            {
                affected.extend(self.store.reverse(Relation::UserRole, role_id).await?);
            }
        }
        self.store.delete_permission(permission).await?;
        for user_id in affected {
            self.invalidate_user(user_id);
        }
        Ok(())
    }

    // ==== traversal queries ====
    //
    // These are queries, not primary-key lookups: an unknown filter
    // identity yields an empty collection, never an error.

    /// Users who are members of the role, ordered by id.
    pub async fn users_by_role<'a>(
        &self,
        role: impl Into<RoleRef<'a>>,
    ) -> Result<Vec<User>, AuthError> {
        let Some(role_id) = self.resolver.try_role_id(role.into()).await? else {
            return Ok(Vec::new());
        };
        let ids = self.store.reverse(Relation::UserRole, role_id).await?;
        self.load_users(ids).await
    }

    /// Users holding the permission, directly or through a role, ordered
    /// by id.
    pub async fn users_by_permission<'a>(
        &self,
        permission: impl Into<PermissionRef<'a>>,
    ) -> Result<Vec<User>, AuthError> {
        let Some(permission_id) = self.resolver.try_permission_id(permission.into()).await? else {
            return Ok(Vec::new());
        };

        let mut ids: Vec<RecordId> = self
            .store
            .reverse(Relation::UserPermission, permission_id)
            .await?;
        for role_id in self
            .store
            .reverse(Relation::RolePermission, permission_id)
            .await?
        {
            ids.extend(self.store.reverse(Relation::UserRole, role_id).await?);
        }
        ids.sort_unstable();
        ids.dedup();
        self.load_users(ids).await
    }

    /// Roles the user is a member of, ordered by id.
    pub async fn roles_by_user<'a>(
        &self,
        user: impl Into<UserRef<'a>>,
    ) -> Result<Vec<Role>, AuthError> {
        let Some(user_id) = self.resolver.try_user_id(user.into()).await? else {
            return Ok(Vec::new());
        };
        let ids = self.store.forward(Relation::UserRole, user_id).await?;
        self.load_roles(ids).await
    }

    /// Roles holding the permission, ordered by id.
    pub async fn roles_by_permission<'a>(
        &self,
        permission: impl Into<PermissionRef<'a>>,
    ) -> Result<Vec<Role>, AuthError> {
        let Some(permission_id) = self.resolver.try_permission_id(permission.into()).await? else {
            return Ok(Vec::new());
        };
        let ids = self
            .store
            .reverse(Relation::RolePermission, permission_id)
            .await?;
        self.load_roles(ids).await
    }

    /// Permissions the user holds, direct and role-inherited, ordered by id.
    pub async fn permissions_by_user<'a>(
        &self,
        user: impl Into<UserRef<'a>>,
    ) -> Result<Vec<Permission>, AuthError> {
        let Some(user_id) = self.resolver.try_user_id(user.into()).await? else {
            return Ok(Vec::new());
        };
        let mut ids: Vec<RecordId> = self.permission_set(user_id).await?.iter().copied().collect();
        ids.sort_unstable();
        self.load_permissions(ids).await
    }

    /// Permissions granted to the role, ordered by id.
    pub async fn permissions_by_role<'a>(
        &self,
        role: impl Into<RoleRef<'a>>,
    ) -> Result<Vec<Permission>, AuthError> {
        let Some(role_id) = self.resolver.try_role_id(role.into()).await? else {
            return Ok(Vec::new());
        };
        let ids = self.store.forward(Relation::RolePermission, role_id).await?;
        self.load_permissions(ids).await
    }

    // ==== loading helpers ====

    async fn load_users(&self, ids: Vec<RecordId>) -> Result<Vec<User>, AuthError> {
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = self.store.fetch_user_by_id(id).await? {
                users.push(user);
            }
        }
        Ok(users)
    }

    async fn load_roles(&self, ids: Vec<RecordId>) -> Result<Vec<Role>, AuthError> {
        let mut roles = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(role) = self.store.fetch_role_by_id(id).await? {
                roles.push(role);
            }
        }
        Ok(roles)
    }

    async fn load_permissions(&self, ids: Vec<RecordId>) -> Result<Vec<Permission>, AuthError> {
        let mut permissions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(permission) = self.store.fetch_permission_by_id(id).await? {
                permissions.push(permission);
            }
        }
        Ok(permissions)
    }
}
