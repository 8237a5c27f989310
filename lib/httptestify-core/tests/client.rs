#![allow(missing_docs, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use http::{Method, StatusCode};
use rstest::{fixture, rstest};

use httptestify_core::server::{LifecycleKind, RequestApp, SharedServer};
use httptestify_core::{RequestClient, RequestError, request};

mod common;
use self::common::*;

static PORTS: Ports = Ports::starting_at(41000);

#[fixture]
fn client() -> RequestClient {
    PORTS.fixture_client()
}

#[rstest]
#[tokio::test]
async fn test_resolve_any_status(
    client: RequestClient,
    #[values(Method::GET, Method::DELETE)] method: Method,
    #[values(200, 300, 400, 500)] status: u16,
) -> anyhow::Result<()> {
    let path = format!("/{}/0/{status}", method.as_str().to_lowercase());

    let response = client.call(method, path).await?;

    assert_eq!(response.status_code(), status);
    assert!(!client.lifecycle().is_listening().await);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_post_with_a_json_body(client: RequestClient) -> anyhow::Result<()> {
    let response = client.post("/post").json(&Delayed::new(0, 200)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.as_json::<Message>()?,
        Message {
            message: NORMAL_RESPONSE.to_string()
        }
    );
    assert!(!client.lifecycle().is_listening().await);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_resolve_any_status_with_a_body(
    client: RequestClient,
    #[values(Method::POST, Method::PUT, Method::PATCH)] method: Method,
    #[values(200, 300, 400, 500)] status: u16,
) -> anyhow::Result<()> {
    let path = format!("/{}", method.as_str().to_lowercase());

    let response = client
        .call(method, path)
        .json(&Delayed::new(0, status))
        .await?;

    assert_eq!(response.status_code(), status);
    assert_eq!(response.as_json::<Message>()?.message, NORMAL_RESPONSE);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_reject_on_timeout(client: RequestClient) -> anyhow::Result<()> {
    let error = client
        .get("/get/50/200")
        .with_timeout(Duration::from_millis(1))
        .await
        .expect_err("the call should time out");

    assert!(error.is_timeout());
    assert!(error.response().is_none());
    insta::assert_snapshot!(error.to_string(), @"timeout of 1ms exceeded");
    assert!(!client.lifecycle().is_listening().await);
    Ok(())
}

#[tokio::test]
async fn test_use_configured_timeout() -> anyhow::Result<()> {
    init_tracing();
    let config = PORTS.config().with_timeout(Duration::from_millis(5));
    let client = request(fixture_router(), config)?;

    let result = client.get("/get/100/200").await;

    assert!(result.is_err_and(|error| error.is_timeout()));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_keep_the_server_running_when_connected(client: RequestClient) -> anyhow::Result<()> {
    client.stay_connected().await?;
    assert!(client.lifecycle().is_listening().await);

    let first = client.get("/get/0/200").await?;
    assert!(client.lifecycle().is_listening().await);
    let second = client.delete("/delete/0/204").await?;
    assert!(client.lifecycle().is_listening().await);

    assert_eq!(first.status_code(), 200);
    assert_eq!(second.status_code(), 204);

    client.close_connection().await?;
    assert!(!client.lifecycle().is_listening().await);

    // back to one server per call
    let third = client.get("/get/0/200").await?;
    assert_eq!(third.status_code(), 200);
    assert!(!client.lifecycle().is_listening().await);
    Ok(())
}

#[tokio::test]
async fn test_reuse_an_existing_server() -> anyhow::Result<()> {
    init_tracing();
    let server = Arc::new(FixtureServer::default());
    let client = request(SharedServer::from_arc(Arc::clone(&server)), PORTS.config())?;
    assert_eq!(client.lifecycle().kind(), LifecycleKind::Server);

    client.get("/get/0/200").await?;
    client.post("/post").json(&Delayed::new(0, 201)).await?;

    assert_eq!(server.launches(), 2);
    assert!(!client.lifecycle().is_listening().await);
    Ok(())
}

#[tokio::test]
async fn test_call_a_server_managed_elsewhere() -> anyhow::Result<()> {
    init_tracing();
    let standalone = StandaloneServer::start().await;
    let client = request(standalone.base_url.as_str(), PORTS.config())?;
    assert_eq!(client.lifecycle().kind(), LifecycleKind::Url);
    assert_eq!(client.base_url(), Some(standalone.base_url.as_str()));

    let first = client.get("/get/0/200").await?;
    // ending the lifecycle leaves the server alone
    let second = client.get("/get/0/202").await?;

    assert_eq!(first.status_code(), 200);
    assert_eq!(second.status_code(), 202);
    Ok(())
}

#[rstest]
#[case::not_a_url("not a url")]
#[case::empty("")]
#[tokio::test]
async fn test_malformed_url_fails_when_called(#[case] base_url: &str) -> anyhow::Result<()> {
    init_tracing();
    let client = request(base_url, PORTS.config())?;
    assert_eq!(client.lifecycle().kind(), LifecycleKind::Url);

    let error = client
        .get("/get/0/200")
        .await
        .expect_err("the base URL is malformed");

    assert!(matches!(error, RequestError::UrlError(_)));
    Ok(())
}

#[tokio::test]
async fn test_wrap_a_handler_function() -> anyhow::Result<()> {
    init_tracing();
    let app = RequestApp::handler(|| async { (StatusCode::ACCEPTED, "queued") });
    let client = request(app, PORTS.config())?;

    let response = client.put("/anything/at/all").await?;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.as_text()?, "queued");
    Ok(())
}

#[tokio::test]
async fn test_fail_without_base_url() -> anyhow::Result<()> {
    init_tracing();
    let client = request(None::<&str>, PORTS.config())?;
    assert_eq!(client.lifecycle().kind(), LifecycleKind::Detached);

    let error = client
        .get("/get/0/200")
        .await
        .expect_err("nothing to call");

    assert!(matches!(error, RequestError::MissingBaseUrl { .. }));
    Ok(())
}

#[tokio::test]
async fn test_report_connection_failures() -> anyhow::Result<()> {
    init_tracing();
    // nothing listens on this port
    let config = PORTS.config();
    let base_url = format!("http://127.0.0.1:{}", config.port);
    let client = request(base_url, config)?;

    let error = client
        .get("/get/0/200")
        .await
        .expect_err("connection refused");

    assert!(matches!(error, RequestError::ReqwestError(_)));
    Ok(())
}

#[tokio::test]
async fn test_fail_when_the_port_is_taken() -> anyhow::Result<()> {
    init_tracing();
    let config = PORTS.config();
    let _taken = std::net::TcpListener::bind(("127.0.0.1", config.port))
        .context("bind the port first")?;
    let client = request(fixture_router(), config)?;

    let error = client
        .get("/get/0/200")
        .await
        .expect_err("the port is taken");

    assert!(matches!(error, RequestError::LifecycleError(_)));
    Ok(())
}
