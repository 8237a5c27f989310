use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use headers::{ContentType, HeaderMapExt};
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use reqwest::{Body, Request};
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::{CallResponse, ExpectedStatusCodes, HttpClient, RequestError};

/// A single HTTP call, sent when awaited.
///
/// Builder methods never fail: an invalid header or a body that cannot be
/// serialized is reported when the call is awaited. This keeps call lists
/// given to the combinators free of `?`.
///
/// ```rust,no_run
/// # async fn example(client: httptestify_core::RequestClient) -> Result<(), httptestify_core::RequestError> {
/// let response = client
///     .post("/post")
///     .json(&serde_json::json!({ "name": "Alice" }))
///     .with_header("x-request-id", "42")
///     .await?;
/// assert_eq!(response.status_code(), 201);
/// # Ok(())
/// # }
/// ```
#[derive(derive_more::Debug)]
pub struct RequestCall {
    #[debug(skip)]
    client: HttpClient,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<CallBody>,
    timeout: Option<Duration>,
    expected_status_codes: Option<ExpectedStatusCodes>,
    pending_error: Option<RequestError>,
}

#[derive(Debug)]
struct CallBody {
    content_type: ContentType,
    data: Bytes,
}

impl RequestCall {
    pub(super) fn build(client: HttpClient, method: Method, path: String) -> Self {
        Self {
            client,
            method,
            path,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
            expected_status_codes: None,
            pending_error: None,
        }
    }

    /// Sends `value` as a JSON body.
    #[must_use]
    pub fn json<T>(mut self, value: &T) -> Self
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_vec(value) {
            Ok(data) => {
                self.body = Some(CallBody {
                    content_type: ContentType::json(),
                    data: Bytes::from(data),
                });
            }
            Err(error) => self.defer_error(error.into()),
        }
        self
    }

    /// Sends a plain text body.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        let text: String = text.into();
        self.body = Some(CallBody {
            content_type: ContentType::text_utf8(),
            data: Bytes::from(text),
        });
        self
    }

    /// Adds a request header.
    ///
    /// An explicit `Content-Type` takes precedence over the one implied by the body.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(RequestError::from)
            .and_then(|name| Ok((name, HeaderValue::from_str(value)?)));
        match header {
            Ok((name, value)) => {
                self.headers.append(name, value);
            }
            Err(error) => self.defer_error(error),
        }
        self
    }

    /// Overrides the client timeout for this call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the client expected status codes for this call.
    #[must_use]
    pub fn with_expected_status_codes(mut self, expected: impl Into<ExpectedStatusCodes>) -> Self {
        self.expected_status_codes = Some(expected.into());
        self
    }

    fn defer_error(&mut self, error: RequestError) {
        if self.pending_error.is_none() {
            self.pending_error = Some(error);
        }
    }

    async fn exchange(self) -> Result<CallResponse, RequestError> {
        let Self {
            client,
            method,
            path,
            headers,
            body,
            timeout,
            expected_status_codes,
            pending_error,
        } = self;

        if let Some(error) = pending_error {
            return Err(error);
        }

        let timeout = timeout.unwrap_or(client.timeout);
        let expected_status_codes =
            expected_status_codes.unwrap_or_else(|| client.expected_status_codes.clone());

        let url = Self::build_url(client.base_url.as_deref(), &path)?;
        let request = Self::build_request(method, url, headers, body, timeout);

        client.interceptors.before_call().await?;
        let outcome = Self::send(&client.client, request, timeout, &expected_status_codes).await;
        client.interceptors.after_call(outcome).await
    }

    fn build_url(base_url: Option<&str>, path: &str) -> Result<Url, RequestError> {
        let Some(base_url) = base_url else {
            return Err(RequestError::MissingBaseUrl {
                path: path.to_string(),
            });
        };
        let url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let url = Url::parse(&url)?;
        Ok(url)
    }

    fn build_request(
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<CallBody>,
        timeout: Duration,
    ) -> Request {
        let mut request = Request::new(method, url);
        *request.timeout_mut() = Some(timeout);
        request.headers_mut().extend(headers);

        if let Some(CallBody { content_type, data }) = body {
            if !request.headers().contains_key(CONTENT_TYPE) {
                request.headers_mut().typed_insert(content_type);
            }
            *request.body_mut() = Some(Body::from(data));
        }

        request
    }

    async fn send(
        client: &reqwest::Client,
        request: Request,
        timeout: Duration,
        expected_status_codes: &ExpectedStatusCodes,
    ) -> Result<CallResponse, RequestError> {
        let transport_error = |error: reqwest::Error| {
            if error.is_timeout() {
                RequestError::Timeout { timeout }
            } else {
                RequestError::ReqwestError(error)
            }
        };

        debug!(?request, "sending...");
        let response = client.execute(request).await.map_err(transport_error)?;
        let response = CallResponse::receive(response)
            .await
            .map_err(transport_error)?;
        debug!(status = %response.status(), "...receiving");

        if expected_status_codes.contains_status_code(response.status()) {
            Ok(response)
        } else {
            Err(RequestError::UnexpectedStatus {
                response: Box::new(response),
            })
        }
    }
}

impl IntoFuture for RequestCall {
    type Output = Result<CallResponse, RequestError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.exchange())
    }
}
