#![allow(missing_docs, clippy::expect_used, clippy::indexing_slicing)]

use std::time::Duration;

use http::StatusCode;
use rstest::{fixture, rstest};

use httptestify_core::{CallResponse, RequestCall, RequestClient, RequestError, request};

mod common;
use self::common::*;

static PORTS: Ports = Ports::starting_at(42000);

#[fixture]
fn client() -> RequestClient {
    PORTS.fixture_client()
}

fn statuses(responses: &[CallResponse]) -> Vec<u16> {
    responses.iter().map(CallResponse::status_code).collect()
}

#[rstest]
#[tokio::test]
async fn test_resolve_all_in_call_order(client: RequestClient) -> anyhow::Result<()> {
    let responses = client
        .all(|client| {
            [
                client.post("/post").json(&Delayed::new(50, 201)),
                client.get("/get/0/202"),
            ]
        })
        .await?;

    assert_eq!(statuses(&responses), vec![201, 202]);
    assert!(!client.lifecycle().is_listening().await);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_keep_call_order_when_slower_calls_come_first(
    client: RequestClient,
) -> anyhow::Result<()> {
    let responses = client
        .all(|client| {
            [
                client.get("/get/100/200"),
                client.get("/get/50/202"),
                client.get("/get/0/201"),
            ]
        })
        .await?;

    assert_eq!(statuses(&responses), vec![200, 202, 201]);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_reject_all_on_server_error(client: RequestClient) -> anyhow::Result<()> {
    let error = client
        .all(|client| [client.get("/get/0/200"), client.get("/get/0/500")])
        .await
        .expect_err("a call answered 500");

    let response = error.response().expect("the failure carries a response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.as_json::<Message>()?.message, NORMAL_RESPONSE);
    assert!(!client.lifecycle().is_listening().await);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_resolve_all_with_no_call(client: RequestClient) -> anyhow::Result<()> {
    let responses = client.all(|_| Vec::<RequestCall>::new()).await?;

    assert!(responses.is_empty());
    assert!(!client.lifecycle().is_listening().await);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_settle_every_call(client: RequestClient) -> anyhow::Result<()> {
    let settled = client
        .all_settled(|client| {
            [
                client.get("/get/0/200"),
                client
                    .get("/get/50/200")
                    .with_timeout(Duration::from_millis(1)),
            ]
        })
        .await?;

    assert_eq!(settled.len(), 2);
    assert!(settled[0].is_fulfilled());
    assert_eq!(
        settled[0].response().map(CallResponse::status_code),
        Some(200)
    );
    assert!(settled[1].is_rejected());
    assert!(settled[1].error().is_some_and(RequestError::is_timeout));
    assert!(!client.lifecycle().is_listening().await);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_settle_failures_carrying_responses(client: RequestClient) -> anyhow::Result<()> {
    let settled = client
        .all_settled(|client| [client.get("/get/0/404"), client.delete("/delete/0/204")])
        .await?;

    assert!(settled[0].is_rejected());
    assert_eq!(
        settled[0].response().map(CallResponse::status),
        Some(StatusCode::NOT_FOUND)
    );
    assert!(settled[1].is_fulfilled());
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_race_to_the_fastest_call(client: RequestClient) -> anyhow::Result<()> {
    let response = client
        .race(|client| [client.get("/get/300/200"), client.get("/get/0/201")])
        .await?;

    assert_eq!(response.status_code(), 201);
    assert!(!client.lifecycle().is_listening().await);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_reject_race_when_the_fastest_call_fails(client: RequestClient) -> anyhow::Result<()> {
    let error = client
        .race(|client| [client.get("/get/300/200"), client.get("/get/0/503")])
        .await
        .expect_err("the fastest call answered 503");

    assert_eq!(
        error.response().map(CallResponse::status),
        Some(StatusCode::SERVICE_UNAVAILABLE)
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_reject_an_empty_race(client: RequestClient) -> anyhow::Result<()> {
    let error = client
        .race(|_| Vec::<RequestCall>::new())
        .await
        .expect_err("nothing to race");

    assert!(matches!(error, RequestError::EmptyRace));
    insta::assert_snapshot!(error.to_string(), @"Cannot race an empty list of calls");
    assert!(!client.lifecycle().is_listening().await);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_call_again_after_a_race(client: RequestClient) -> anyhow::Result<()> {
    client
        .race(|client| [client.get("/get/200/200"), client.get("/get/0/200")])
        .await?;
    let response = client.get("/get/0/200").await?;

    assert_eq!(response.status_code(), 200);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_leave_a_connected_server_running(client: RequestClient) -> anyhow::Result<()> {
    client.stay_connected().await?;

    let responses = client
        .all(|client| [client.get("/get/0/200"), client.patch("/patch")])
        .await?;

    assert_eq!(statuses(&responses), vec![200, 200]);
    assert!(client.lifecycle().is_listening().await);

    client.close_connection().await?;
    assert!(!client.lifecycle().is_listening().await);
    Ok(())
}

#[tokio::test]
async fn test_run_combinators_against_a_server_managed_elsewhere() -> anyhow::Result<()> {
    init_tracing();
    let standalone = StandaloneServer::start().await;
    let client = request(standalone.base_url.clone(), PORTS.config())?;

    let responses = client
        .all(|client| {
            [
                client.get("/get/20/200"),
                client.put("/put").json(&Delayed::new(0, 201)),
            ]
        })
        .await?;

    assert_eq!(statuses(&responses), vec![200, 201]);
    Ok(())
}

#[tokio::test]
async fn test_fail_combinators_without_base_url() -> anyhow::Result<()> {
    init_tracing();
    let client = request(None::<String>, PORTS.config())?;

    let settled = client
        .all_settled(|client| [client.get("/get/0/200")])
        .await?;

    assert!(matches!(
        settled[0].error(),
        Some(RequestError::MissingBaseUrl { .. })
    ));
    Ok(())
}

async fn explode() -> Result<CallResponse, RequestError> {
    panic!("call exploded")
}

#[rstest]
#[tokio::test]
async fn test_stop_the_server_when_a_call_panics(client: RequestClient) -> anyhow::Result<()> {
    let batch = tokio::spawn({
        let client = client.clone();
        async move { client.all(|_| [explode()]).await }
    });

    let joined = batch.await;

    assert!(joined.is_err_and(|error| error.is_panic()));
    assert!(!client.lifecycle().is_listening().await);
    Ok(())
}
