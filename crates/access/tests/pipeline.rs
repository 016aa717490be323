use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{Value, json};

use stockwise_access::{AccessConfig, AccessError, AccessPipeline};
use stockwise_auth::{InMemoryPermissionSource, Permission, RequiresPermissions, Role, UserPermissions};
use stockwise_core::{TenantId, TenantKind, UserId};
use stockwise_query::{AllowedFilter, AllowedSpec, InMemoryDataSource, QuerySpec, SortKey};
use stockwise_tenancy::{InMemoryActiveTenants, InMemoryTenantContextStore, TenantState};

type Pipeline = AccessPipeline<
    Arc<InMemoryPermissionSource>,
    Arc<InMemoryTenantContextStore>,
    Arc<InMemoryActiveTenants>,
>;

struct Harness {
    pipeline: Pipeline,
    grants: Arc<InMemoryPermissionSource>,
    contexts: Arc<InMemoryTenantContextStore>,
    tenants: Arc<InMemoryActiveTenants>,
    data: InMemoryDataSource,
}

const MANAGER: UserId = UserId::new(1);
const CLERK: UserId = UserId::new(2);
const STRANGER: UserId = UserId::new(3);

fn harness() -> Harness {
    stockwise_observability::tracing::init_for_tests();

    let grants = Arc::new(InMemoryPermissionSource::new());
    let contexts = Arc::new(InMemoryTenantContextStore::new());
    let tenants = Arc::new(InMemoryActiveTenants::new());

    let manager_role = Role::new("manager").with_permissions([
        Permission::new("product_view"),
        Permission::new("product_edit"),
        Permission::new("brand_view"),
    ]);
    grants
        .insert(UserPermissions::new(MANAGER).with_role(manager_role))
        .unwrap();
    grants
        .insert(
            UserPermissions::new(CLERK)
                .with_role(Role::new("staff").grant(Permission::new("product_view")))
                .with_permission(Permission::new("report_export")),
        )
        .unwrap();

    tenants.set(MANAGER, TenantKind::Warehouse, vec![TenantId::new(5), TenantId::new(9)]).unwrap();
    tenants.set(MANAGER, TenantKind::Store, vec![TenantId::new(1)]).unwrap();
    tenants.set(CLERK, TenantKind::Warehouse, vec![TenantId::new(9)]).unwrap();

    let data = InMemoryDataSource::new()
        .with_rows(
            "products",
            [
                json!({"id": 1, "name": "Box A", "warehouse_id": 5, "brand": {"name": "Acme"}}),
                json!({"id": 2, "name": "Toy", "warehouse_id": 5, "brand": {"name": "Play"}}),
                json!({"id": 3, "name": "Box C", "warehouse_id": 9, "brand": {"name": "Acme"}}),
            ],
        )
        .unwrap()
        .with_rows(
            "brands",
            [json!({"id": 10, "name": "Acme"}), json!({"id": 11, "name": "Play"})],
        )
        .unwrap();

    let pipeline = AccessPipeline::new(
        &AccessConfig::default(),
        grants.clone(),
        contexts.clone(),
        tenants.clone(),
    );

    Harness {
        pipeline,
        grants,
        contexts,
        tenants,
        data,
    }
}

fn products() -> AllowedSpec {
    AllowedSpec::new("products", "name")
        .filter(AllowedFilter::partial("name"))
        .sorts(["name", "id"])
        .includes(["brand"])
        .searchable(["name", "brand.name"])
        .tenant_scoped("warehouse_id", TenantKind::Warehouse)
}

fn ids(rows: &[Value]) -> Vec<u64> {
    rows.iter().filter_map(|r| r["id"].as_u64()).collect()
}

#[test]
fn begin_aggregates_and_selects_tenants() {
    let h = harness();
    let ctx = h.pipeline.begin(MANAGER).unwrap();

    assert_eq!(ctx.user_id(), MANAGER);
    assert_eq!(ctx.permissions().highest_role.as_ref().unwrap().name, "manager");
    assert!(ctx.matrix().contains("product_*"));
    assert_eq!(ctx.tenant(TenantKind::Warehouse), Some(TenantId::new(5)));
    assert_eq!(ctx.tenant(TenantKind::Store), Some(TenantId::new(1)));
}

#[test]
fn second_request_does_not_rewrite_context() {
    let h = harness();
    h.pipeline.begin(MANAGER).unwrap();
    let writes = h.contexts.writes(MANAGER).unwrap();
    assert_eq!(writes, 2);

    h.pipeline.begin(MANAGER).unwrap();
    assert_eq!(h.contexts.writes(MANAGER).unwrap(), writes);
}

#[test]
fn listing_is_scoped_to_current_warehouse() {
    let h = harness();
    let ctx = h.pipeline.begin(MANAGER).unwrap();

    let query = QuerySpec::new()
        .filter("warehouse_id", 9)
        .filter("global", "box");
    let page = h
        .pipeline
        .list_authorized(&ctx, &["product_view"], &h.data, &products(), &query)
        .unwrap();
    assert_eq!(ids(&page.data), [1]);
    assert_eq!(page.meta.total, 1);
}

#[test]
fn switching_changes_scope_for_this_and_later_requests() {
    let h = harness();
    let mut ctx = h.pipeline.begin(MANAGER).unwrap();

    let state = h
        .pipeline
        .switch_tenant(&mut ctx, TenantKind::Warehouse, TenantId::new(9))
        .unwrap();
    assert_eq!(state, TenantState::Active(TenantId::new(9)));

    let page = h.pipeline.list(&ctx, &h.data, &products(), &QuerySpec::new()).unwrap();
    assert_eq!(ids(&page.data), [3]);

    let next = h.pipeline.begin(MANAGER).unwrap();
    assert_eq!(next.tenant(TenantKind::Warehouse), Some(TenantId::new(9)));
}

#[test]
fn invalid_switch_is_rejected_and_context_kept() {
    let h = harness();
    let mut ctx = h.pipeline.begin(CLERK).unwrap();

    let err = h
        .pipeline
        .switch_tenant(&mut ctx, TenantKind::Warehouse, TenantId::new(5))
        .unwrap_err();
    assert_eq!(
        err,
        AccessError::InvalidTenant {
            user_id: CLERK,
            kind: TenantKind::Warehouse,
            tenant_id: TenantId::new(5),
        }
    );
    assert_eq!(ctx.tenant(TenantKind::Warehouse), Some(TenantId::new(9)));
    assert_eq!(
        h.pipeline.resolver().current(CLERK).unwrap().current_warehouse_id,
        Some(TenantId::new(9))
    );
}

#[test]
fn denial_stops_before_listing() {
    let h = harness();
    let ctx = h.pipeline.begin(CLERK).unwrap();

    let err = h
        .pipeline
        .list_authorized(&ctx, &["product_view", "product_edit"], &h.data, &products(), &QuerySpec::new())
        .unwrap_err();
    assert!(matches!(err, AccessError::Denied(_)));
    assert_eq!(err.status_hint(), 403);
    assert!(ctx.require_any(&["product_edit", "report_export"]).is_ok());
}

#[test]
fn user_without_tenant_gets_empty_scoped_listing() {
    let h = harness();
    h.grants
        .insert(UserPermissions::new(STRANGER).with_permission(Permission::new("product_view")))
        .unwrap();
    let ctx = h.pipeline.begin(STRANGER).unwrap();
    assert_eq!(ctx.tenant(TenantKind::Warehouse), None);

    let page = h.pipeline.list(&ctx, &h.data, &products(), &QuerySpec::new()).unwrap();
    assert!(page.data.is_empty());
    assert_eq!(page.meta.from, None);
    assert_eq!(page.meta.to, None);

    // Entities without a tenant column are listed regardless.
    let brands = AllowedSpec::new("brands", "name").sorts(["name"]);
    let page = h
        .pipeline
        .list(&ctx, &h.data, &brands, &QuerySpec::new().sort_by(SortKey::desc("name")))
        .unwrap();
    assert_eq!(ids(&page.data), [11, 10]);
}

#[test]
fn role_edits_apply_on_next_request() {
    let h = harness();
    let ctx = h.pipeline.begin(CLERK).unwrap();
    assert!(ctx.require("product_edit").is_err());

    h.grants
        .insert(
            UserPermissions::new(CLERK)
                .with_role(Role::new("manager").grant(Permission::new("product_edit"))),
        )
        .unwrap();

    // The earlier context keeps its snapshot; a new request sees the edit.
    assert!(ctx.require("product_edit").is_err());
    assert!(h.pipeline.begin(CLERK).unwrap().require("product_edit").is_ok());
}

#[test]
fn deactivated_warehouse_is_replaced_after_cleanup() {
    let h = harness();
    h.pipeline.begin(MANAGER).unwrap();

    h.tenants.deactivate(TenantKind::Warehouse, TenantId::new(5)).unwrap();
    assert!(
        h.pipeline
            .resolver()
            .clear_if_deactivated(MANAGER, TenantKind::Warehouse)
            .unwrap()
    );

    let ctx = h.pipeline.begin(MANAGER).unwrap();
    assert_eq!(ctx.tenant(TenantKind::Warehouse), Some(TenantId::new(9)));
}

struct EditProduct;

impl RequiresPermissions for EditProduct {
    fn required_permissions(&self) -> &[&'static str] {
        &["product_view", "product_edit"]
    }
}

#[test]
fn actions_declare_their_permissions() {
    let h = harness();
    assert!(h.pipeline.begin(MANAGER).unwrap().authorize_action(&EditProduct).is_ok());
    assert!(h.pipeline.begin(CLERK).unwrap().authorize_action(&EditProduct).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    /// A rejected switch never touches the persisted context or the scope.
    #[test]
    fn switch_outside_active_list_changes_nothing(tenant in 10u64..1_000) {
        let h = harness();
        let mut ctx = h.pipeline.begin(MANAGER).unwrap();
        let writes = h.contexts.writes(MANAGER).unwrap();

        let result = h
            .pipeline
            .switch_tenant(&mut ctx, TenantKind::Warehouse, TenantId::new(tenant));
        prop_assert!(
            matches!(result, Err(AccessError::InvalidTenant { .. })),
            "expected InvalidTenant"
        );
        prop_assert_eq!(h.contexts.writes(MANAGER).unwrap(), writes);
        prop_assert_eq!(ctx.tenant(TenantKind::Warehouse), Some(TenantId::new(5)));
    }
}
