//! # HTTPtestify Core
//!
//! Call an HTTP application from your tests without managing its server.
//!
//! The same client API works whatever you give it:
//! - an [`axum::Router`] or a handler function, served on a local port,
//! - an existing [`TestServer`](server::TestServer), started and stopped in place,
//! - a base URL of a server managed elsewhere,
//! - nothing at all, see [`RequestApp::Detached`](server::RequestApp::Detached).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::Json;
//! use axum::routing::post;
//! use httptestify_core::{RequestConfig, request};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = axum::Router::new().route(
//!         "/post",
//!         post(|| async { (http::StatusCode::CREATED, Json(json!({ "message": "created" }))) }),
//!     );
//!     let client = request(app, RequestConfig::default())?;
//!
//!     // the server is started before the call and stopped right after
//!     let response = client.post("/post").json(&json!({ "name": "Alice" })).await?;
//!     assert_eq!(response.status_code(), 201);
//!     Ok(())
//! }
//! ```
//!
//! ## Status codes
//!
//! The client returned by [`request`] resolves every response, whatever its
//! status: asserting on the status is the job of the test. Only failures
//! without response are errors, such as a [timeout](RequestError::Timeout).
//!
//! Inside the combinators, a response outside the
//! [expected status codes](ExpectedStatusCodes) is a failure carrying the
//! response, so [`all`](RequestClient::all) fails on a `500`.
//!
//! ## Concurrent calls
//!
//! [`RequestClient::all`], [`RequestClient::all_settled`] and
//! [`RequestClient::race`] start the server once, run the calls concurrently,
//! then stop the server once:
//!
//! ```rust,no_run
//! # async fn example(client: httptestify_core::RequestClient) -> Result<(), httptestify_core::RequestError> {
//! let settled = client
//!     .all_settled(|client| {
//!         [
//!             client.get("/get/0/200"),
//!             client.get("/get/50/200").with_timeout(std::time::Duration::from_millis(1)),
//!         ]
//!     })
//!     .await?;
//! assert!(settled[0].is_fulfilled());
//! assert!(settled[1].is_rejected());
//! # Ok(())
//! # }
//! ```
//!
//! ## Keeping the server running
//!
//! [`RequestClient::stay_connected`] starts the server and keeps it running
//! across calls, until [`RequestClient::close_connection`].
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events: lifecycle transitions at `info`,
//! requests and responses at `debug`. Install any subscriber to see them.

mod client;
mod config;

pub mod server;

pub use self::client::{
    CallResponse, ExpectedStatusCodes, HttpClient, HttpClientBuilder, RequestCall, RequestClient,
    RequestError, Settled,
};
pub use self::config::{
    DEFAULT_HEALTH_CHECK_ATTEMPTS, DEFAULT_PORT, DEFAULT_TIMEOUT, RequestConfig,
};

/// Creates a client for the application, managing its server around each call.
///
/// Nothing is started until the first call.
///
/// # Errors
///
/// Fails if the underlying HTTP client cannot be created.
pub fn request(
    app: impl Into<server::RequestApp>,
    config: RequestConfig,
) -> Result<RequestClient, RequestError> {
    RequestClient::new(app, config)
}

/// Creates an [`ExpectedStatusCodes`] from a list of codes and ranges.
///
/// # Syntax
///
/// - Single codes: `200`, `201`, `404`
/// - Inclusive ranges: `200-299`
/// - Exclusive ranges: `200..300`
///
/// ```rust
/// use httptestify_core::expected_status_codes;
///
/// let codes = expected_status_codes!(200-204, 301, 400..500);
/// assert!(codes.contains(204));
/// assert!(codes.contains(301));
/// assert!(codes.contains(404));
/// assert!(!codes.contains(500));
/// ```
#[macro_export]
macro_rules! expected_status_codes {
    () => {
        $crate::ExpectedStatusCodes::default()
    };

    ($start:literal - $end:literal $($rest:tt)*) => {
        $crate::expected_status_codes!(
            @add $crate::ExpectedStatusCodes::from_inclusive_range($start..=$end); $($rest)*
        )
    };
    ($start:literal .. $end:literal $($rest:tt)*) => {
        $crate::expected_status_codes!(
            @add $crate::ExpectedStatusCodes::from_exclusive_range($start..$end); $($rest)*
        )
    };
    ($single:literal $($rest:tt)*) => {
        $crate::expected_status_codes!(
            @add $crate::ExpectedStatusCodes::from_single($single); $($rest)*
        )
    };

    (@add $codes:expr;) => {
        $codes
    };
    (@add $codes:expr; , $($rest:tt)*) => {
        $crate::expected_status_codes!(@add $codes; $($rest)*)
    };
    (@add $codes:expr; $start:literal - $end:literal $($rest:tt)*) => {
        $crate::expected_status_codes!(@add $codes.add_inclusive_range($start..=$end); $($rest)*)
    };
    (@add $codes:expr; $start:literal .. $end:literal $($rest:tt)*) => {
        $crate::expected_status_codes!(@add $codes.add_exclusive_range($start..$end); $($rest)*)
    };
    (@add $codes:expr; $single:literal $($rest:tt)*) => {
        $crate::expected_status_codes!(@add $codes.add_single($single); $($rest)*)
    };
}
