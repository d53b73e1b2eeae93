use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use marketplace_nav::{
    AppConfig, AppState, MockModuleLoader, ModuleRef, create_router,
    models::{ClientCreated, RedirectKind, RoutesResponse, SessionResponse, ViewResponse},
};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceExt;

pub struct TestApp {
    pub address: String,
    pub loader: MockModuleLoader,
}

async fn spawn_app() -> TestApp {
    spawn_app_with(MockModuleLoader::new()).await
}

async fn spawn_app_with(loader: MockModuleLoader) -> TestApp {
    let state = AppState::with_loader(AppConfig::default(), Arc::new(loader.clone()));
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, loader }
}

async fn create_client(app: &TestApp, client: &reqwest::Client) -> String {
    let response = client
        .post(format!("{}/clients", app.address))
        .send()
        .await
        .expect("create fail");
    assert_eq!(response.status(), 201);
    let created: ClientCreated = response.json().await.unwrap();
    created.client_id.to_string()
}

async fn put_session(
    app: &TestApp,
    client: &reqwest::Client,
    id: &str,
    body: serde_json::Value,
) -> SessionResponse {
    let response = client
        .put(format!("{}/clients/{}/session", app.address, id))
        .json(&body)
        .send()
        .await
        .expect("session fail");
    assert_eq!(response.status(), 200);
    response.json().await.unwrap()
}

async fn navigate(
    app: &TestApp,
    client: &reqwest::Client,
    id: &str,
    path: &str,
    wait: bool,
) -> ViewResponse {
    let response = client
        .post(format!("{}/clients/{}/navigate", app.address, id))
        .json(&json!({ "path": path, "wait": wait }))
        .send()
        .await
        .expect("navigate fail");
    assert_eq!(response.status(), 200);
    response.json().await.unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_admin_login_lands_and_renders() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let id = create_client(&app, &client).await;

    // A fresh client sits on the root, so becoming an admin triggers the landing redirect.
    let update = put_session(
        &app,
        &client,
        &id,
        json!({ "is_authenticated": true, "role": "admin", "profile": { "name": "Ada" } }),
    )
    .await;
    assert_eq!(update.phase, "authenticated");
    match update.view {
        Some(ViewResponse::Redirect { to, reason, .. }) => {
            assert_eq!(to, "/admin");
            assert_eq!(reason, RedirectKind::Landing);
        }
        other => panic!("expected landing redirect, got {:?}", other),
    }

    match navigate(&app, &client, &id, "/admin/users", true).await {
        ViewResponse::Render {
            module, component, ..
        } => {
            assert_eq!(module, "admin/user-list");
            assert_eq!(component, "AdminUserList");
        }
        other => panic!("expected render, got {:?}", other),
    }

    let response = client
        .get(format!("{}/clients/{}/view", app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let current: Option<ViewResponse> = response.json().await.unwrap();
    assert!(matches!(current, Some(ViewResponse::Render { .. })));
}

#[tokio::test]
async fn test_buyer_is_redirected_away_from_admin() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let id = create_client(&app, &client).await;
    put_session(
        &app,
        &client,
        &id,
        json!({ "is_authenticated": true, "role": "buyer" }),
    )
    .await;

    let raw = client
        .post(format!("{}/clients/{}/navigate", app.address, id))
        .json(&json!({ "path": "/admin" }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(raw["kind"], "redirect");
    assert_eq!(raw["to"], "/");
    assert_eq!(raw["reason"], "unauthorized");
}

#[tokio::test]
async fn test_routes_reflect_session_phase() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let id = create_client(&app, &client).await;
    put_session(
        &app,
        &client,
        &id,
        json!({ "is_authenticated": true, "role": "admin" }),
    )
    .await;

    let routes: RoutesResponse = client
        .get(format!("{}/clients/{}/routes", app.address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(routes.phase, "authenticated");
    assert!(routes.paths.contains(&"/admin/users/:userId".to_string()));
    assert!(routes.paths.contains(&"/products".to_string()));
    assert!(routes.paths.iter().all(|p| !p.starts_with("/seller")));
    assert!(routes.paths.iter().all(|p| !p.contains('*')));

    let logged_out: SessionResponse = client
        .delete(format!("{}/clients/{}/session", app.address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(logged_out.phase, "unauthenticated");
    assert!(logged_out.role.is_none());
    assert!(logged_out.view.is_none());

    let routes: RoutesResponse = client
        .get(format!("{}/clients/{}/routes", app.address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(routes.paths.iter().all(|p| !p.starts_with("/admin")));
}

#[tokio::test]
async fn test_failed_module_retry_flow() {
    let app = spawn_app().await;
    let shop = ModuleRef::from_static("seller/shop-profile");
    app.loader.fail(&shop);

    let client = reqwest::Client::new();
    let id = create_client(&app, &client).await;
    put_session(
        &app,
        &client,
        &id,
        json!({ "is_authenticated": true, "role": "seller" }),
    )
    .await;

    // Nothing has failed yet.
    let response = client
        .post(format!("{}/clients/{}/retry", app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    match navigate(&app, &client, &id, "/seller/shop", true).await {
        ViewResponse::Failed { module, message, .. } => {
            assert_eq!(module, "seller/shop-profile");
            assert!(message.contains("failed to load"));
        }
        other => panic!("expected error view, got {:?}", other),
    }

    app.loader.heal(&shop);
    let response = client
        .post(format!("{}/clients/{}/retry", app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    match navigate(&app, &client, &id, "/seller/shop", true).await {
        ViewResponse::Render { component, .. } => assert_eq!(component, "SellerShopProfile"),
        other => panic!("expected render after retry, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_client_is_not_found() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let id = uuid::Uuid::new_v4();

    let response = client
        .post(format!("{}/clients/{}/navigate", app.address, id))
        .json(&json!({ "path": "/" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let response = client
        .delete(format!("{}/clients/{}", app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_deleted_client_is_gone() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let id = create_client(&app, &client).await;

    let response = client
        .delete(format!("{}/clients/{}", app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/clients/{}/view", app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_in_process_anonymous_root_renders_home() {
    let state = AppState::with_loader(AppConfig::default(), Arc::new(MockModuleLoader::new()));
    let router = create_router(state);

    let response = router
        .clone()
        .oneshot(Request::post("/clients").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let created: ClientCreated = serde_json::from_slice(&bytes).unwrap();

    // No session published yet: the bootstrap phase dispatches like an anonymous visitor.
    let request = Request::post(format!("/clients/{}/navigate", created.client_id))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "path": "/", "wait": true }).to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    match serde_json::from_slice::<ViewResponse>(&bytes).unwrap() {
        ViewResponse::Render { module, .. } => assert_eq!(module, "public/home"),
        other => panic!("expected public home, got {:?}", other),
    }
}

#[tokio::test]
async fn test_in_process_malformed_session_is_rejected() {
    let router = create_router(AppState::with_loader(
        AppConfig::default(),
        Arc::new(MockModuleLoader::new()),
    ));
    let id = uuid::Uuid::new_v4();

    let request = Request::put(format!("/clients/{}/session", id))
        .header("content-type", "application/json")
        .body(Body::from(r#"{"is_authenticated": true, "role": "superuser"}"#))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_waiting_navigation_returns_superseded_after_next_navigation() {
    let app = spawn_app_with(MockModuleLoader::gated()).await;
    let client = reqwest::Client::new();
    let id = create_client(&app, &client).await;
    put_session(
        &app,
        &client,
        &id,
        json!({ "is_authenticated": true, "role": "admin" }),
    )
    .await;

    // This implementation never loads while the gate is closed.
    let waiting = {
        let (client, address, id) = (client.clone(), app.address.clone(), id.clone());
        tokio::spawn(async move {
            client
                .post(format!("{}/clients/{}/navigate", address, id))
                .json(&json!({ "path": "/admin/reports", "wait": true }))
                .send()
                .await
                .unwrap()
                .json::<ViewResponse>()
                .await
                .unwrap()
        })
    };

    // Wait until the first navigation is the active, pending target.
    let mut active = false;
    for _ in 0..100 {
        let current: Option<ViewResponse> = client
            .get(format!("{}/clients/{}/view", app.address, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if matches!(&current, Some(ViewResponse::Pending { path, .. }) if path == "/admin/reports") {
            active = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(active, "first navigation never became active");

    match navigate(&app, &client, &id, "/about", false).await {
        ViewResponse::Pending { path, .. } => assert_eq!(path, "/about"),
        other => panic!("expected pending placeholder, got {:?}", other),
    }

    let first = tokio::time::timeout(Duration::from_secs(2), waiting)
        .await
        .expect("waiting request released by the newer navigation")
        .unwrap();
    assert_eq!(
        first,
        ViewResponse::Superseded {
            path: "/admin/reports".to_string()
        }
    );
}
