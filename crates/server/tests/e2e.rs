use std::{net::SocketAddr, time::Duration};

use axum::Router;
use reqwest::StatusCode as HttpStatusCode;
use serde_json::json;
use tokio::{net::TcpListener, sync::oneshot};
use uuid::Uuid;

struct TestApp {
    base_url: String,
    stop: oneshot::Sender<()>,
    server: tokio::task::JoinHandle<anyhow::Result<()>>,
}

/// Full startup wiring over the in-memory store (no `database.url`).
async fn start_server() -> anyhow::Result<TestApp> {
    let mut cfg = configs::AppConfig::default();
    cfg.auth.jwt_secret = "e2e-secret".into();

    let app: Router = server::build_app(&cfg).await?;
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(server::serve(listener, app, async move {
        let _ = stopped.await;
    }));

    Ok(TestApp { base_url, stop, server })
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().pool_max_idle_per_host(0).build().expect("reqwest client")
}

#[tokio::test]
async fn e2e_public_health() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client().get(format!("{}/api/health/", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body, json!({"status": "ok", "service": "Msitiri API", "version": "1.0.0"}));
    Ok(())
}

#[tokio::test]
async fn e2e_register_login_refresh_logout() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();
    let email = format!("user_{}@example.com", Uuid::new_v4().simple());
    let password = "S3curePass!";

    // Register
    let res = c.post(format!("{}/api/auth/register/", app.base_url))
        .json(&json!({
            "email": email,
            "password": password,
            "confirm_password": password,
            "first_name": "Test",
            "last_name": "User"
        }))
        .send().await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);

    // Login
    let res = c.post(format!("{}/api/auth/login/", app.base_url))
        .json(&json!({"email": email, "password": password}))
        .send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    let access = body["access"].as_str().unwrap_or_default().to_string();
    let refresh = body["refresh"].as_str().unwrap_or_default().to_string();

    // Profile with bearer
    let res = c.get(format!("{}/api/auth/profile/", app.base_url)).bearer_auth(&access).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["user"]["email"], email.as_str());

    // Refresh, then logout and refresh again
    let res = c.post(format!("{}/api/token/refresh/", app.base_url)).json(&json!({"refresh": refresh})).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);

    let res = c.post(format!("{}/api/auth/logout/", app.base_url))
        .bearer_auth(&access)
        .json(&json!({"refresh": refresh}))
        .send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);

    let res = c.post(format!("{}/api/token/refresh/", app.base_url)).json(&json!({"refresh": refresh})).send().await?;
    assert_eq!(res.status(), HttpStatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn e2e_protected_without_token_denied() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client().get(format!("{}/api/auth/profile/", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key("www-authenticate"));
    Ok(())
}

#[tokio::test]
async fn e2e_openapi_document_is_served() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client().get(format!("{}/api-docs/openapi.json", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let doc = res.json::<serde_json::Value>().await?;
    assert!(doc["paths"].get("/api/auth/register/").is_some());
    Ok(())
}

#[tokio::test]
async fn e2e_shutdown_signal_stops_the_server() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client().get(format!("{}/api/health/", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);

    app.stop.send(()).map_err(|_| anyhow::anyhow!("server already gone"))?;
    let finished = tokio::time::timeout(Duration::from_secs(5), app.server).await??;
    assert!(finished.is_ok());

    assert!(client().get(format!("{}/api/health/", app.base_url)).send().await.is_err());
    Ok(())
}

#[tokio::test]
async fn e2e_in_flight_request_completes_during_shutdown() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();
    let email = format!("drain_{}@example.com", Uuid::new_v4().simple());

    // registration spends its time hashing, so the stop lands while it is open
    let request = tokio::spawn(
        c.post(format!("{}/api/auth/register/", app.base_url))
            .json(&json!({
                "email": email,
                "password": "S3curePass!",
                "confirm_password": "S3curePass!",
                "first_name": "Drain",
                "last_name": "Test"
            }))
            .send(),
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    app.stop.send(()).map_err(|_| anyhow::anyhow!("server already gone"))?;

    let res = request.await??;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    tokio::time::timeout(Duration::from_secs(5), app.server).await???;
    Ok(())
}
