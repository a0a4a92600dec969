//! Integration tests for the Tenant and Organization repositories.

use farmdesk_core::FarmdeskError;
use farmdesk_core::models::farmer::CreateFarmer;
use farmdesk_core::models::organization::{CreateOrganization, UpdateOrganization};
use farmdesk_core::models::tenant::{CreateTenant, UpdateTenant};
use farmdesk_core::repository::{
    FarmerRepository, OrganizationRepository, Pagination, TenantRepository,
};
use farmdesk_db::repository::{
    SurrealFarmerRepository, SurrealOrganizationRepository, SurrealTenantRepository,
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

fn tenant_input(name: &str) -> CreateTenant {
    CreateTenant {
        name: name.into(),
        slug: None,
        metadata: None,
    }
}

#[tokio::test]
async fn create_tenant_derives_slug() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    let tenant = repo.create(tenant_input("Green Valley Co-op")).await.unwrap();
    assert_eq!(tenant.slug, "green-valley-co-op");
    assert!(tenant.metadata.is_object());

    let fetched = repo.get_by_slug("green-valley-co-op").await.unwrap();
    assert_eq!(fetched.id, tenant.id);
    let fetched = repo.get_by_id(tenant.id).await.unwrap();
    assert_eq!(fetched.name, "Green Valley Co-op");
}

#[tokio::test]
async fn duplicate_tenant_slug_is_already_exists() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.create(tenant_input("Acme")).await.unwrap();
    let err = repo.create(tenant_input("ACME")).await.unwrap_err();
    assert!(matches!(err, FarmdeskError::AlreadyExists { .. }), "{err:?}");
}

#[tokio::test]
async fn update_and_list_tenants() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    let a = repo.create(tenant_input("Alpha")).await.unwrap();
    repo.create(tenant_input("Beta")).await.unwrap();
    repo.create(tenant_input("Gamma")).await.unwrap();

    let updated = repo
        .update(
            a.id,
            UpdateTenant {
                name: Some("Alpha Farms".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Alpha Farms");
    assert_eq!(updated.slug, "alpha");

    let page = repo
        .list(Pagination {
            offset: 0,
            limit: 2,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
}

#[tokio::test]
async fn tenant_with_organizations_cannot_be_deleted() {
    let db = setup().await;
    let tenants = SurrealTenantRepository::new(db.clone());
    let orgs = SurrealOrganizationRepository::new(db);

    let tenant = tenants.create(tenant_input("Holding")).await.unwrap();
    let org = orgs
        .create(CreateOrganization {
            tenant_id: tenant.id,
            name: "North Cooperative".into(),
            slug: None,
            metadata: None,
        })
        .await
        .unwrap();

    let err = tenants.delete(tenant.id).await.unwrap_err();
    assert!(matches!(err, FarmdeskError::Validation { .. }));

    orgs.delete(org.id).await.unwrap();
    tenants.delete(tenant.id).await.unwrap();
    let err = tenants.get_by_id(tenant.id).await.unwrap_err();
    assert!(matches!(err, FarmdeskError::NotFound { .. }));
}

#[tokio::test]
async fn organization_requires_existing_tenant() {
    let db = setup().await;
    let orgs = SurrealOrganizationRepository::new(db);

    let err = orgs
        .create(CreateOrganization {
            tenant_id: Uuid::new_v4(),
            name: "Orphan".into(),
            slug: None,
            metadata: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, FarmdeskError::NotFound { ref entity, .. } if entity == "tenant"));
}

#[tokio::test]
async fn organization_slug_is_unique_per_tenant_only() {
    let db = setup().await;
    let tenants = SurrealTenantRepository::new(db.clone());
    let orgs = SurrealOrganizationRepository::new(db);

    let t1 = tenants.create(tenant_input("One")).await.unwrap();
    let t2 = tenants.create(tenant_input("Two")).await.unwrap();

    let input = |tenant_id| CreateOrganization {
        tenant_id,
        name: "Field Office".into(),
        slug: None,
        metadata: None,
    };

    orgs.create(input(t1.id)).await.unwrap();
    orgs.create(input(t2.id)).await.unwrap();
    let err = orgs.create(input(t1.id)).await.unwrap_err();
    assert!(matches!(err, FarmdeskError::AlreadyExists { .. }));

    let found = orgs.get_by_slug(t2.id, "field-office").await.unwrap();
    assert_eq!(found.tenant_id, t2.id);

    let only_t1 = orgs.list(Some(t1.id), Pagination::default()).await.unwrap();
    assert_eq!(only_t1.total, 1);
    let all = orgs.list(None, Pagination::default()).await.unwrap();
    assert_eq!(all.total, 2);
}

#[tokio::test]
async fn update_organization_normalizes_slug() {
    let db = setup().await;
    let tenants = SurrealTenantRepository::new(db.clone());
    let orgs = SurrealOrganizationRepository::new(db);

    let tenant = tenants.create(tenant_input("Parent")).await.unwrap();
    let org = orgs
        .create(CreateOrganization {
            tenant_id: tenant.id,
            name: "Depot".into(),
            slug: Some("North Depot!".into()),
            metadata: None,
        })
        .await
        .unwrap();
    assert_eq!(org.slug, "north-depot");

    let updated = orgs
        .update(
            org.id,
            UpdateOrganization {
                slug: Some("  South  Depot ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.slug, "south-depot");

    let err = orgs
        .update(
            org.id,
            UpdateOrganization {
                slug: Some("???".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FarmdeskError::Validation { .. }));
}

#[tokio::test]
async fn deleting_organization_removes_its_farmers() {
    let db = setup().await;
    let tenants = SurrealTenantRepository::new(db.clone());
    let orgs = SurrealOrganizationRepository::new(db.clone());
    let farmers = SurrealFarmerRepository::new(db);

    let tenant = tenants.create(tenant_input("Parent")).await.unwrap();
    let org = orgs
        .create(CreateOrganization {
            tenant_id: tenant.id,
            name: "Depot".into(),
            slug: None,
            metadata: None,
        })
        .await
        .unwrap();
    farmers
        .create(CreateFarmer {
            organization_id: org.id,
            full_name: "Amina Okello".into(),
            phone: None,
            village: None,
            group_id: None,
            metadata: None,
        })
        .await
        .unwrap();

    orgs.delete(org.id).await.unwrap();

    let all = farmers.list_all(Pagination::default()).await.unwrap();
    assert_eq!(all.total, 0);
    let err = orgs.delete(org.id).await.unwrap_err();
    assert!(matches!(err, FarmdeskError::NotFound { .. }));
}
