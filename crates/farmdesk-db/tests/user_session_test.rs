//! Integration tests for users, sessions and verification tokens.

use chrono::{Duration, Utc};
use farmdesk_core::FarmdeskError;
use farmdesk_core::models::session::CreateSession;
use farmdesk_core::models::user::{CreateUser, PlatformRole, UpdateUser};
use farmdesk_core::models::verification::CreateVerification;
use farmdesk_core::repository::{
    Pagination, SessionRepository, UserFilter, UserRepository, VerificationRepository,
};
use farmdesk_db::repository::{
    SurrealSessionRepository, SurrealUserRepository, SurrealVerificationRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    farmdesk_db::run_migrations(&db).await.unwrap();
    db
}

fn user_input(email: &str, name: &str) -> CreateUser {
    CreateUser {
        email: email.into(),
        name: name.into(),
        password_hash: "$argon2id$placeholder".into(),
        role: PlatformRole::User,
        email_verified: false,
    }
}

fn session_input(user_id: Uuid, token_hash: &str, expires_in: Duration) -> CreateSession {
    CreateSession {
        user_id,
        token_hash: token_hash.into(),
        ip_address: Some("10.0.0.1".into()),
        user_agent: None,
        impersonated_by: None,
        expires_at: Utc::now() + expires_in,
    }
}

#[tokio::test]
async fn email_is_normalized_and_unique() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    let user = repo
        .create(user_input("  Ada@Example.com ", "Ada"))
        .await
        .unwrap();
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.role, PlatformRole::User);
    assert!(!user.banned);

    let found = repo.get_by_email("ADA@example.COM").await.unwrap();
    assert_eq!(found.id, user.id);

    let err = repo
        .create(user_input("ada@example.com", "Other Ada"))
        .await
        .unwrap_err();
    assert!(matches!(err, FarmdeskError::AlreadyExists { .. }));
}

#[tokio::test]
async fn ban_fields_can_be_set_and_cleared() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);
    let user = repo.create(user_input("bo@example.com", "Bo")).await.unwrap();
    let until = Utc::now() + Duration::days(1);

    let banned = repo
        .update(
            user.id,
            UpdateUser {
                banned: Some(true),
                ban_reason: Some(Some("spam".into())),
                ban_expires: Some(Some(until)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(banned.banned);
    assert_eq!(banned.ban_reason.as_deref(), Some("spam"));
    assert!(banned.ban_expires.is_some());

    let cleared = repo
        .update(
            user.id,
            UpdateUser {
                banned: Some(false),
                ban_reason: Some(None),
                ban_expires: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!cleared.banned);
    assert!(cleared.ban_reason.is_none());
    assert!(cleared.ban_expires.is_none());
}

#[tokio::test]
async fn list_users_filters_by_search_and_role() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    repo.create(user_input("grace@example.com", "Grace Hopper"))
        .await
        .unwrap();
    repo.create(user_input("linus@example.com", "Linus"))
        .await
        .unwrap();
    let mut admin = user_input("root@example.com", "Root");
    admin.role = PlatformRole::Admin;
    repo.create(admin).await.unwrap();

    let hopper = repo
        .list(
            UserFilter {
                search: Some("HOPPER".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(hopper.total, 1);
    assert_eq!(hopper.items[0].email, "grace@example.com");

    let admins = repo
        .list(
            UserFilter {
                role: Some(PlatformRole::Admin),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(admins.total, 1);

    let everyone = repo
        .list(UserFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(everyone.total, 3);
}

#[tokio::test]
async fn session_lookup_and_invalidation() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let sessions = SurrealSessionRepository::new(db);
    let user = users.create(user_input("cy@example.com", "Cy")).await.unwrap();

    let first = sessions
        .create(session_input(user.id, "hash-1", Duration::hours(1)))
        .await
        .unwrap();
    let second = sessions
        .create(session_input(user.id, "hash-2", Duration::hours(1)))
        .await
        .unwrap();
    sessions
        .create(session_input(user.id, "hash-3", Duration::hours(1)))
        .await
        .unwrap();

    let by_hash = sessions.get_by_token_hash("hash-2").await.unwrap();
    assert_eq!(by_hash.id, second.id);
    assert_eq!(by_hash.ip_address.as_deref(), Some("10.0.0.1"));

    assert_eq!(sessions.list_by_user(user.id).await.unwrap().len(), 3);

    sessions.invalidate(first.id).await.unwrap();
    let err = sessions.get_by_id(first.id).await.unwrap_err();
    assert!(matches!(err, FarmdeskError::NotFound { .. }));

    sessions
        .invalidate_user_sessions(user.id, Some(second.id))
        .await
        .unwrap();
    let remaining = sessions.list_by_user(user.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, second.id);

    sessions.invalidate_user_sessions(user.id, None).await.unwrap();
    assert!(sessions.list_by_user(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn impersonation_marker_round_trips() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let sessions = SurrealSessionRepository::new(db);
    let user = users.create(user_input("dee@example.com", "Dee")).await.unwrap();
    let admin_id = Uuid::new_v4();

    let mut input = session_input(user.id, "imp-hash", Duration::hours(1));
    input.impersonated_by = Some(admin_id);
    let session = sessions.create(input).await.unwrap();

    let fetched = sessions.get_by_id(session.id).await.unwrap();
    assert_eq!(fetched.impersonated_by, Some(admin_id));
}

#[tokio::test]
async fn cleanup_removes_only_expired_sessions() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let sessions = SurrealSessionRepository::new(db);
    let user = users.create(user_input("eve@example.com", "Eve")).await.unwrap();

    sessions
        .create(session_input(user.id, "old", -Duration::minutes(5)))
        .await
        .unwrap();
    sessions
        .create(session_input(user.id, "live", Duration::hours(2)))
        .await
        .unwrap();

    let removed = sessions.cleanup_expired().await.unwrap();
    assert_eq!(removed, 1);
    assert!(sessions.get_by_token_hash("live").await.is_ok());
}

#[tokio::test]
async fn deleting_user_removes_sessions_and_tokens() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let sessions = SurrealSessionRepository::new(db.clone());
    let verifications = SurrealVerificationRepository::new(db);
    let user = users.create(user_input("fay@example.com", "Fay")).await.unwrap();

    sessions
        .create(session_input(user.id, "fay-session", Duration::hours(1)))
        .await
        .unwrap();
    verifications
        .create(CreateVerification {
            user_id: user.id,
            token_hash: "fay-reset".into(),
            expires_at: Utc::now() + Duration::hours(1),
        })
        .await
        .unwrap();

    users.delete(user.id).await.unwrap();

    assert!(sessions.list_by_user(user.id).await.unwrap().is_empty());
    assert!(verifications.get_by_token_hash("fay-reset").await.is_err());
    let err = users.delete(user.id).await.unwrap_err();
    assert!(matches!(err, FarmdeskError::NotFound { .. }));
}

#[tokio::test]
async fn verification_tokens_are_looked_up_by_hash() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let verifications = SurrealVerificationRepository::new(db);
    let user = users.create(user_input("gus@example.com", "Gus")).await.unwrap();

    let token = verifications
        .create(CreateVerification {
            user_id: user.id,
            token_hash: "reset-hash".into(),
            expires_at: Utc::now() + Duration::hours(1),
        })
        .await
        .unwrap();

    let found = verifications.get_by_token_hash("reset-hash").await.unwrap();
    assert_eq!(found.id, token.id);
    assert_eq!(found.user_id, user.id);

    verifications.delete(token.id).await.unwrap();
    assert!(verifications.get_by_token_hash("reset-hash").await.is_err());
}
