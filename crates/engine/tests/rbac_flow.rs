// ============================
// crates/engine/tests/rbac_flow.rs
// ============================
//! End-to-end relationship graph scenarios over a seeded directory:
//! seven users, three roles, six permissions.
use gatekeeper_common::{Permission, Role, User};
use gatekeeper_engine::storage::{MemoryStore, PermissionStore, RoleStore, UserStore};
use gatekeeper_engine::RelationGraph;
use std::sync::Arc;

const USERS: [&str; 7] = [
    "root", "User_0", "User_1", "User_2", "User_3", "User_4", "User_5",
];
const ROLES: [&str; 3] = ["Administrator", "Power Users", "Users"];
const PERMISSIONS: [&str; 6] = [
    "see users",
    "update user",
    "delete user",
    "create user",
    "enable user",
    "disable user",
];

/// Seed the fixture directory:
/// - root is an Administrator (all six permissions),
/// - User_0 and User_1 are Power Users (see/update/enable/disable),
/// - User_2..User_5 are plain Users (see users),
/// - User_0 additionally holds delete/create directly,
/// - User_2 and User_3 additionally hold enable/disable directly.
async fn seed() -> (Arc<MemoryStore>, RelationGraph) {
    let store = Arc::new(MemoryStore::new());

    for name in USERS {
        let mut user = User::new(format!("uuid-{name}"), name);
        store.save_user(&mut user).await.unwrap();
    }
    for name in ROLES {
        let mut role = Role::new(name);
        store.save_role(&mut role).await.unwrap();
    }
    for name in PERMISSIONS {
        let mut permission = Permission::new(name);
        store.save_permission(&mut permission).await.unwrap();
    }

    let graph = RelationGraph::new(store.clone());

    graph.add_role("root", "Administrator").await.unwrap();
    for user in ["User_0", "User_1"] {
        graph.add_role(user, "Power Users").await.unwrap();
    }
    for user in ["User_2", "User_3", "User_4", "User_5"] {
        graph.add_role(user, "Users").await.unwrap();
    }

    for permission in PERMISSIONS {
        graph
            .grant_role_permission("Administrator", permission)
            .await
            .unwrap();
    }
    for permission in ["see users", "update user", "enable user", "disable user"] {
        graph
            .grant_role_permission("Power Users", permission)
            .await
            .unwrap();
    }
    graph
        .grant_role_permission("Users", "see users")
        .await
        .unwrap();

    for permission in ["delete user", "create user"] {
        graph
            .grant_user_permission("User_0", permission)
            .await
            .unwrap();
    }
    for user in ["User_2", "User_3"] {
        for permission in ["enable user", "disable user"] {
            graph.grant_user_permission(user, permission).await.unwrap();
        }
    }

    (store, graph)
}

#[tokio::test]
async fn fetch_by_id_and_name_with_sentinel_misses() {
    let (store, _) = seed().await;

    for id in 1..=7 {
        let user = store.fetch_user_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.id, Some(id));
    }
    assert!(store.fetch_user_by_id(8).await.unwrap().is_none());

    for name in USERS {
        let user = store.fetch_user_by_name(name).await.unwrap().unwrap();
        assert_eq!(user.name, name);
    }
    assert!(store.fetch_user_by_name("bad_user").await.unwrap().is_none());
}

#[tokio::test]
async fn fetch_all_and_limit_windows() {
    let (store, _) = seed().await;

    assert_eq!(store.fetch_users().await.unwrap().len(), 7);
    assert_eq!(store.fetch_roles().await.unwrap().len(), 3);
    assert_eq!(store.fetch_permissions().await.unwrap().len(), 6);

    for (offset, expected) in USERS.iter().enumerate() {
        let page = store.fetch_users_limit(offset, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(&page[0].name, expected);
    }

    let page = store.fetch_roles_limit(1, 1).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name, "Power Users");
    assert!(store.fetch_roles_limit(3, 5).await.unwrap().is_empty());

    let page = store.fetch_permissions_limit(2, 2).await.unwrap();
    let names: Vec<_> = page.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["delete user", "create user"]);
}

#[tokio::test]
async fn users_by_permission_counts_direct_and_inherited() {
    let (store, graph) = seed().await;

    let expected = [
        ("see users", 7),
        ("update user", 3),
        ("delete user", 2),
        ("create user", 2),
        ("enable user", 5),
        ("disable user", 5),
        ("unknown permission", 0),
    ];
    for (name, count) in expected {
        assert_eq!(
            graph.users_by_permission(name).await.unwrap().len(),
            count,
            "{name}"
        );
    }

    // same answers when filtering by id or by object
    for (id, count) in [(1, 7), (2, 3), (3, 2), (4, 2), (5, 5), (6, 5), (7, 0)] {
        assert_eq!(
            graph.users_by_permission(id).await.unwrap().len(),
            count,
            "permission id {id}"
        );
    }
    let permission = store
        .fetch_permission_by_name("update user")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(graph.users_by_permission(&permission).await.unwrap().len(), 3);
}

#[tokio::test]
async fn users_by_role_counts() {
    let (store, graph) = seed().await;

    for (name, count) in [("Administrator", 1), ("Power Users", 2), ("Users", 4), ("Other", 0)] {
        assert_eq!(graph.users_by_role(name).await.unwrap().len(), count, "{name}");
    }
    for (id, count) in [(1, 1), (2, 2), (3, 4), (4, 0)] {
        assert_eq!(graph.users_by_role(id).await.unwrap().len(), count);
    }
    let role = store.fetch_role_by_name("Users").await.unwrap().unwrap();
    let members = graph.users_by_role(&role).await.unwrap();
    let names: Vec<_> = members.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["User_2", "User_3", "User_4", "User_5"]);
}

#[tokio::test]
async fn roles_and_permissions_traversals() {
    let (_, graph) = seed().await;

    assert_eq!(graph.permissions_by_user("root").await.unwrap().len(), 6);
    assert_eq!(graph.permissions_by_role("Power Users").await.unwrap().len(), 4);
    assert_eq!(graph.roles_by_user("User_0").await.unwrap().len(), 1);
    assert_eq!(graph.roles_by_permission("see users").await.unwrap().len(), 3);
    assert_eq!(graph.roles_by_permission("delete user").await.unwrap().len(), 1);

    // User_4 sees users only through the Users role
    assert!(graph.user_can("User_4", "see users").await.unwrap());
    let permissions = graph.permissions_by_user("User_4").await.unwrap();
    assert_eq!(permissions.len(), 1);
    assert_eq!(permissions[0].name, "see users");
}

#[tokio::test]
async fn grant_and_revoke_by_each_identity_variant() {
    let (store, graph) = seed().await;
    let user = store.fetch_user_by_id(7).await.unwrap().unwrap();
    let permission = store.fetch_permission_by_id(6).await.unwrap().unwrap();

    // by object
    graph.grant_user_permission(&user, &permission).await.unwrap();
    assert!(graph.user_can(&user, &permission).await.unwrap());
    graph.revoke_user_permission(&user, &permission).await.unwrap();
    assert!(!graph.user_can(&user, &permission).await.unwrap());

    // by id
    graph.grant_user_permission(7, 6).await.unwrap();
    assert!(graph.user_can(7, 6).await.unwrap());
    graph.revoke_user_permission(7, 6).await.unwrap();
    assert!(!graph.user_can(7, 6).await.unwrap());

    // by name
    graph
        .grant_user_permission("User_5", "disable user")
        .await
        .unwrap();
    assert!(graph.user_can("User_5", "disable user").await.unwrap());
    graph
        .revoke_user_permission("User_5", "disable user")
        .await
        .unwrap();
    assert!(!graph.user_can("User_5", "disable user").await.unwrap());
}

#[tokio::test]
async fn add_and_remove_role_by_each_identity_variant() {
    let (store, graph) = seed().await;
    let user = store.fetch_user_by_id(7).await.unwrap().unwrap();
    let role = store.fetch_role_by_id(1).await.unwrap().unwrap();

    assert!(!graph.has_role(&user, &role).await.unwrap());
    graph.add_role(&user, &role).await.unwrap();
    assert!(graph.has_role(&user, &role).await.unwrap());
    graph.remove_role(&user, &role).await.unwrap();
    assert!(!graph.has_role(&user, &role).await.unwrap());

    graph.add_role(7, 1).await.unwrap();
    assert!(graph.has_role(7, 1).await.unwrap());
    graph.remove_role(7, 1).await.unwrap();
    assert!(!graph.has_role(7, 1).await.unwrap());

    graph.add_role("User_5", "Administrator").await.unwrap();
    assert!(graph.has_role("User_5", "Administrator").await.unwrap());
    // membership grants the role's whole permission set
    assert!(graph.user_can("User_5", "delete user").await.unwrap());
    graph.remove_role("User_5", "Administrator").await.unwrap();
    assert!(!graph.has_role("User_5", "Administrator").await.unwrap());
    assert!(!graph.user_can("User_5", "delete user").await.unwrap());
}

#[tokio::test]
async fn deleting_a_user_drops_their_join_rows() {
    let (store, graph) = seed().await;
    let mut user = store.fetch_user_by_id(3).await.unwrap().unwrap();

    assert_eq!(graph.users_by_role("Power Users").await.unwrap().len(), 2);
    store.delete_user(&mut user).await.unwrap();
    assert!(!user.is_stored());
    assert_eq!(graph.users_by_role("Power Users").await.unwrap().len(), 1);
}
