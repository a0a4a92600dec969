//! Integration tests for organization-scoped data: memberships, farmers,
//! farmer groups, and the audit log.

use farmdesk_core::FarmdeskError;
use farmdesk_core::models::audit::{AuditOutcome, CreateAuditLogEntry};
use farmdesk_core::models::farmer::{CreateFarmer, UpdateFarmer};
use farmdesk_core::models::farmer_group::CreateFarmerGroup;
use farmdesk_core::models::membership::{CreateMembership, OrgRole};
use farmdesk_core::models::organization::CreateOrganization;
use farmdesk_core::models::tenant::CreateTenant;
use farmdesk_core::models::user::{CreateUser, PlatformRole};
use farmdesk_core::repository::{
    AuditLogFilter, AuditLogRepository, FarmerGroupRepository, FarmerRepository,
    MembershipRepository, OrganizationRepository, Pagination, TenantRepository, UserRepository,
};
use farmdesk_db::repository::{
    SurrealAuditLogRepository, SurrealFarmerGroupRepository, SurrealFarmerRepository,
    SurrealMembershipRepository, SurrealOrganizationRepository, SurrealTenantRepository,
    SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// In-memory DB with one tenant, two organizations and one user.
async fn setup() -> (Surreal<Db>, Uuid, Uuid, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    farmdesk_db::run_migrations(&db).await.unwrap();

    let tenant = SurrealTenantRepository::new(db.clone())
        .create(CreateTenant {
            name: "Agri Holdings".into(),
            slug: None,
            metadata: None,
        })
        .await
        .unwrap();

    let orgs = SurrealOrganizationRepository::new(db.clone());
    let mut org_ids = Vec::new();
    for name in ["North", "South"] {
        let org = orgs
            .create(CreateOrganization {
                tenant_id: tenant.id,
                name: name.into(),
                slug: None,
                metadata: None,
            })
            .await
            .unwrap();
        org_ids.push(org.id);
    }

    let user = SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            email: "officer@example.com".into(),
            name: "Field Officer".into(),
            password_hash: "$argon2id$placeholder".into(),
            role: PlatformRole::User,
            email_verified: true,
        })
        .await
        .unwrap();

    (db, org_ids[0], org_ids[1], user.id)
}

fn farmer(organization_id: Uuid, name: &str, group_id: Option<Uuid>) -> CreateFarmer {
    CreateFarmer {
        organization_id,
        full_name: name.into(),
        phone: Some("+256700000000".into()),
        village: Some("Gulu".into()),
        group_id,
        metadata: None,
    }
}

#[tokio::test]
async fn membership_lifecycle() {
    let (db, north, south, user_id) = setup().await;
    let repo = SurrealMembershipRepository::new(db);

    let membership = repo
        .add(CreateMembership {
            organization_id: north,
            user_id,
            role: OrgRole::Member,
        })
        .await
        .unwrap();
    assert_eq!(membership.role, OrgRole::Member);

    let err = repo
        .add(CreateMembership {
            organization_id: north,
            user_id,
            role: OrgRole::Admin,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, FarmdeskError::AlreadyExists { .. }), "{err:?}");

    assert!(repo.get(south, user_id).await.unwrap().is_none());

    assert_eq!(repo.count_with_role(north, OrgRole::Owner).await.unwrap(), 0);
    let promoted = repo.update_role(north, user_id, OrgRole::Owner).await.unwrap();
    assert_eq!(promoted.role, OrgRole::Owner);
    assert_eq!(repo.count_with_role(north, OrgRole::Owner).await.unwrap(), 1);
    assert_eq!(repo.count_with_role(south, OrgRole::Owner).await.unwrap(), 0);

    let members = repo.list_by_organization(north, Pagination::default()).await.unwrap();
    assert_eq!(members.total, 1);
    assert_eq!(repo.list_by_user(user_id).await.unwrap().len(), 1);

    repo.remove(north, user_id).await.unwrap();
    assert!(repo.get(north, user_id).await.unwrap().is_none());
    assert!(repo.remove(north, user_id).await.is_err());
}

#[tokio::test]
async fn membership_requires_existing_user() {
    let (db, north, _, _) = setup().await;
    let repo = SurrealMembershipRepository::new(db);

    let err = repo
        .add(CreateMembership {
            organization_id: north,
            user_id: Uuid::new_v4(),
            role: OrgRole::Member,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, FarmdeskError::NotFound { ref entity, .. } if entity == "user"));
}

#[tokio::test]
async fn farmers_are_isolated_per_organization() {
    let (db, north, south, _) = setup().await;
    let repo = SurrealFarmerRepository::new(db);

    let a = repo.create(farmer(north, "Amina", None)).await.unwrap();
    repo.create(farmer(north, "Baraka", None)).await.unwrap();
    let c = repo.create(farmer(south, "Chebet", None)).await.unwrap();

    let north_page = repo.list(north, None, Pagination::default()).await.unwrap();
    assert_eq!(north_page.total, 2);
    assert!(north_page.items.iter().all(|f| f.organization_id == north));

    // Cross-organization access looks exactly like a missing record.
    let err = repo.get_by_id(south, a.id).await.unwrap_err();
    assert!(matches!(err, FarmdeskError::NotFound { .. }));
    let err = repo
        .update(
            north,
            c.id,
            UpdateFarmer {
                full_name: Some("Hijacked".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FarmdeskError::NotFound { .. }));
    assert!(repo.delete(north, c.id).await.is_err());
    assert_eq!(repo.get_by_id(south, c.id).await.unwrap().full_name, "Chebet");

    let all = repo.list_all(Pagination::default()).await.unwrap();
    assert_eq!(all.total, 3);
}

#[tokio::test]
async fn farmer_update_clears_optional_fields() {
    let (db, north, _, _) = setup().await;
    let repo = SurrealFarmerRepository::new(db);
    let f = repo.create(farmer(north, "Dalia", None)).await.unwrap();

    let updated = repo
        .update(
            north,
            f.id,
            UpdateFarmer {
                phone: Some(None),
                village: Some(Some("Lira".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.phone.is_none());
    assert_eq!(updated.village.as_deref(), Some("Lira"));
    assert_eq!(updated.full_name, "Dalia");
}

#[tokio::test]
async fn blank_farmer_name_is_rejected() {
    let (db, north, _, _) = setup().await;
    let repo = SurrealFarmerRepository::new(db);
    let err = repo.create(farmer(north, "   ", None)).await.unwrap_err();
    assert!(matches!(err, FarmdeskError::Validation { .. }));
}

#[tokio::test]
async fn groups_belong_to_one_organization() {
    let (db, north, south, _) = setup().await;
    let groups = SurrealFarmerGroupRepository::new(db.clone());
    let farmers = SurrealFarmerRepository::new(db);

    let group = groups
        .create(CreateFarmerGroup {
            organization_id: north,
            name: "Maize Growers".into(),
            slug: None,
            description: "Maize smallholders".into(),
        })
        .await
        .unwrap();
    assert_eq!(group.slug, "maize-growers");

    // Same slug in another organization is fine.
    groups
        .create(CreateFarmerGroup {
            organization_id: south,
            name: "Maize Growers".into(),
            slug: None,
            description: String::new(),
        })
        .await
        .unwrap();

    // A south farmer cannot join a north group.
    let err = farmers
        .create(farmer(south, "Esi", Some(group.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, FarmdeskError::NotFound { ref entity, .. } if entity == "farmer_group"));

    let member = farmers
        .create(farmer(north, "Femi", Some(group.id)))
        .await
        .unwrap();
    farmers.create(farmer(north, "Gita", None)).await.unwrap();

    let in_group = farmers
        .list(north, Some(group.id), Pagination::default())
        .await
        .unwrap();
    assert_eq!(in_group.total, 1);

    assert!(groups.get_by_id(south, group.id).await.is_err());

    groups.delete(north, group.id).await.unwrap();
    let detached = farmers.get_by_id(north, member.id).await.unwrap();
    assert!(detached.group_id.is_none());
}

#[tokio::test]
async fn audit_log_is_filtered_and_newest_first() {
    let (db, north, _, user_id) = setup().await;
    let repo = SurrealAuditLogRepository::new(db);

    for (action, outcome) in [
        ("auth.sign_in", AuditOutcome::Failure),
        ("auth.sign_in", AuditOutcome::Success),
        ("admin.ban_user", AuditOutcome::Success),
    ] {
        repo.append(CreateAuditLogEntry {
            actor_id: Some(user_id),
            action: action.into(),
            organization_id: None,
            target_id: None,
            outcome,
            ip_address: None,
            metadata: None,
        })
        .await
        .unwrap();
    }
    repo.append(CreateAuditLogEntry {
        actor_id: None,
        action: "access.denied".into(),
        organization_id: Some(north),
        target_id: None,
        outcome: AuditOutcome::Denied,
        ip_address: Some("10.1.1.1".into()),
        metadata: Some(serde_json::json!({"action": "Manage"})),
    })
    .await
    .unwrap();

    let sign_ins = repo
        .list(
            AuditLogFilter {
                action: Some("auth.sign_in".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(sign_ins.total, 2);
    assert!(sign_ins.items[0].timestamp >= sign_ins.items[1].timestamp);

    let denied = repo
        .list(
            AuditLogFilter {
                organization_id: Some(north),
                outcome: Some(AuditOutcome::Denied),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(denied.total, 1);
    assert_eq!(denied.items[0].metadata["action"], "Manage");

    let all = repo
        .list(AuditLogFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 4);
}
