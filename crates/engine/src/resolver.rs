// ============================
// crates/engine/src/resolver.rs
// ============================
//! Identity-variant resolution.
//!
//! Every relationship operation can address a related entity three ways:
//! the full object, the numeric id, or the unique name. The `From` impls
//! let public APIs take `impl Into<XRef>` so the historical triplicated
//! entry points (`grant`, `grant_by_id`, `grant_by_name`) collapse into one
//! implementation against the resolved id.
use crate::error::AuthError;
use crate::storage::Store;
use gatekeeper_common::{Permission, RecordId, Role, User};
use std::sync::Arc;

macro_rules! entity_ref {
    ($name:ident, $entity:ty) => {
        /// One of the three equivalent ways to address an entity.
        #[derive(Debug, Clone, Copy)]
        pub enum $name<'a> {
            Object(&'a $entity),
            Id(RecordId),
            Name(&'a str),
        }

        impl<'a> From<&'a $entity> for $name<'a> {
            fn from(value: &'a $entity) -> Self {
                Self::Object(value)
            }
        }

        impl From<RecordId> for $name<'_> {
            fn from(value: RecordId) -> Self {
                Self::Id(value)
            }
        }

        impl<'a> From<&'a str> for $name<'a> {
            fn from(value: &'a str) -> Self {
                Self::Name(value)
            }
        }

        impl $name<'_> {
            fn describe(&self) -> String {
                match self {
                    Self::Object(obj) => match obj.id {
                        Some(id) => format!("id:{id}"),
                        None => "unsaved object".to_string(),
                    },
                    Self::Id(id) => format!("id:{id}"),
                    Self::Name(name) => format!("name:{name}"),
                }
            }
        }
    };
}

entity_ref!(UserRef, User);
entity_ref!(RoleRef, Role);
entity_ref!(PermissionRef, Permission);

/// Maps identity variants to canonical ids against the store.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn Store>,
}

macro_rules! resolve_impl {
    ($strict:ident, $soft:ident, $reference:ident, $fetch_by_id:ident, $fetch_by_name:ident, $entity:literal) => {
        /// Strict resolution for mutations: a reference that resolves to
        /// nothing aborts the operation before any write.
        pub async fn $strict(&self, reference: $reference<'_>) -> Result<RecordId, AuthError> {
            let miss = || AuthError::Resolution {
                entity: $entity,
                reference: reference.describe(),
            };
            match reference {
                $reference::Object(obj) => obj.id.ok_or_else(miss),
                $reference::Id(id) => {
                    self.store.$fetch_by_id(id).await?.ok_or_else(miss)?;
                    Ok(id)
                }
                $reference::Name(name) => {
                    let found = self.store.$fetch_by_name(name).await?.ok_or_else(miss)?;
                    // fetch_by_name only returns persisted rows
                    found.id.ok_or_else(miss)
                }
            }
        }

        /// Soft resolution for queries: a miss yields `None` and the caller
        /// answers with an empty result set.
        pub async fn $soft(
            &self,
            reference: $reference<'_>,
        ) -> Result<Option<RecordId>, AuthError> {
            match reference {
                $reference::Object(obj) => Ok(obj.id),
                $reference::Id(id) => Ok(Some(id)),
                $reference::Name(name) => Ok(self
                    .store
                    .$fetch_by_name(name)
                    .await?
                    .and_then(|found| found.id)),
            }
        }
    };
}

impl Resolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    resolve_impl!(
        user_id,
        try_user_id,
        UserRef,
        fetch_user_by_id,
        fetch_user_by_name,
        "user"
    );
    resolve_impl!(
        role_id,
        try_role_id,
        RoleRef,
        fetch_role_by_id,
        fetch_role_by_name,
        "role"
    );
    resolve_impl!(
        permission_id,
        try_permission_id,
        PermissionRef,
        fetch_permission_by_id,
        fetch_permission_by_name,
        "permission"
    );
}
