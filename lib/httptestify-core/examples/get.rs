use std::time::Duration;

use axum::Json;
use axum::extract::Path;
use axum::routing::get;
use httptestify_core::{RequestConfig, request};
use serde::{Deserialize, Serialize};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().pretty().init();

    let app = axum::Router::new().route("/greet/{name}", get(greet));
    let client = request(app, RequestConfig::default().with_port(8088))?;

    // Simple call, the server only runs during the call
    let greeting = client.get("/greet/world").await?.as_json::<Greeting>()?;
    println!("{}", greeting.message);

    // Concurrent calls sharing one server start
    let settled = client
        .all_settled(|client| {
            [
                client.get("/greet/alice"),
                client
                    .get("/greet/bob")
                    .with_timeout(Duration::from_millis(1)),
            ]
        })
        .await?;
    for outcome in settled {
        match outcome.into_result() {
            Ok(response) => println!("{}", response.as_json::<Greeting>()?.message),
            Err(error) => println!("failed: {error}"),
        }
    }

    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
struct Greeting {
    message: String,
}

async fn greet(Path(name): Path<String>) -> Json<Greeting> {
    Json(Greeting {
        message: format!("Hello, {name}!"),
    })
}
