use marketplace_nav::{
    CatalogLoader, MockModuleLoader, ModuleRef, ModuleResolver, ModuleState, RouteTable,
    error::ResolveError,
};
use std::{sync::Arc, time::Duration};

// --- Helper Functions ---

fn resolver_over(loader: &MockModuleLoader) -> Arc<ModuleResolver> {
    Arc::new(ModuleResolver::new(Arc::new(loader.clone())))
}

const DASHBOARD: ModuleRef = ModuleRef::from_static("admin/dashboard");

// --- Tests ---

#[tokio::test]
async fn test_untouched_ref_is_unresolved_and_not_fetched() {
    let loader = MockModuleLoader::new();
    let resolver = resolver_over(&loader);

    assert!(matches!(resolver.state(&DASHBOARD), ModuleState::Unresolved));
    tokio::task::yield_now().await;
    assert_eq!(loader.calls(), 0);
}

#[tokio::test]
async fn test_resolve_returns_immediately_with_resolving_state() {
    let loader = MockModuleLoader::gated();
    let resolver = resolver_over(&loader);

    // The gate is closed, so the load cannot finish; resolve must not wait for it.
    assert!(matches!(resolver.resolve(&DASHBOARD), ModuleState::Resolving));
    assert!(matches!(resolver.state(&DASHBOARD), ModuleState::Resolving));

    loader.open_gate();
    let implementation = resolver.resolved(&DASHBOARD).await.expect("resolves");
    assert_eq!(implementation.component, "AdminDashboard");
    assert!(matches!(resolver.state(&DASHBOARD), ModuleState::Resolved(_)));
}

#[tokio::test]
async fn test_concurrent_resolution_is_single_flight() {
    let loader = MockModuleLoader::gated();
    let resolver = resolver_over(&loader);

    let first = {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move { resolver.resolved(&DASHBOARD).await })
    };
    let second = {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move { resolver.resolved(&DASHBOARD).await })
    };
    tokio::task::yield_now().await;
    loader.open_gate();

    let first = first.await.unwrap().expect("first caller resolves");
    let second = second.await.unwrap().expect("second caller resolves");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn test_resolved_module_is_memoized() {
    let loader = MockModuleLoader::new();
    let resolver = resolver_over(&loader);

    let first = resolver.resolved(&DASHBOARD).await.unwrap();
    let again = resolver.resolve(&DASHBOARD);
    let second = resolver.resolved(&DASHBOARD).await.unwrap();

    match again {
        ModuleState::Resolved(cached) => assert!(Arc::ptr_eq(&cached, &first)),
        other => panic!("expected cached module, got {:?}", other),
    }
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn test_failure_is_terminal_until_retried() {
    let loader = MockModuleLoader::new();
    loader.fail(&DASHBOARD);
    let resolver = resolver_over(&loader);

    let error = resolver.resolved(&DASHBOARD).await.unwrap_err();
    assert!(matches!(error, ResolveError::LoadFailed { .. }));

    // Neither resolve nor resolved re-fetch a failed ref.
    assert!(matches!(resolver.resolve(&DASHBOARD), ModuleState::Failed(_)));
    assert_eq!(resolver.resolved(&DASHBOARD).await.unwrap_err(), error);
    assert_eq!(loader.calls(), 1);

    loader.heal(&DASHBOARD);
    assert!(matches!(resolver.retry(&DASHBOARD), ModuleState::Resolving));
    let implementation = resolver.resolved(&DASHBOARD).await.expect("retry succeeds");
    assert_eq!(implementation.id, DASHBOARD);
    assert_eq!(loader.calls(), 2);
}

#[tokio::test]
async fn test_retry_leaves_healthy_refs_alone() {
    let loader = MockModuleLoader::new();
    let resolver = resolver_over(&loader);

    resolver.resolved(&DASHBOARD).await.unwrap();
    assert!(matches!(resolver.retry(&DASHBOARD), ModuleState::Resolved(_)));
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn test_panicking_loader_settles_as_failed() {
    let loader = MockModuleLoader::new();
    loader.panic_on(&DASHBOARD);
    let resolver = resolver_over(&loader);

    let error = resolver.resolved(&DASHBOARD).await.unwrap_err();
    assert_eq!(error, ResolveError::Panicked("admin/dashboard".to_string()));
}

#[tokio::test]
async fn test_catalog_loader_serves_table_modules_only() {
    let table = RouteTable::builtin();
    let resolver = ModuleResolver::new(Arc::new(CatalogLoader::for_table(
        table,
        Duration::from_millis(5),
    )));

    let edit = ModuleRef::from_static("seller/product-edit");
    let implementation = resolver.resolved(&edit).await.expect("known module");
    assert_eq!(implementation.component, "SellerProductEdit");

    let unknown = ModuleRef::new("legacy/cms".to_string());
    assert_eq!(
        resolver.resolved(&unknown).await.unwrap_err(),
        ResolveError::UnknownModule("legacy/cms".to_string())
    );
}
