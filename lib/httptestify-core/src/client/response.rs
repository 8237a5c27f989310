use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use super::RequestError;

/// A fully received HTTP response.
///
/// The body is read eagerly so the response can be inspected several times,
/// stored in [`Settled`](crate::Settled) results, or carried by errors.
#[derive(Debug, Clone)]
pub struct CallResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl CallResponse {
    pub(crate) fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub(crate) async fn receive(response: reqwest::Response) -> reqwest::Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self::new(status, headers, body))
    }

    /// The response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response status as a number.
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The `Content-Type` header, if present and readable.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// The raw body.
    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Consume the response, keeping the body.
    pub fn into_bytes(self) -> Bytes {
        self.body
    }

    /// The body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Fails if the body is not valid UTF-8.
    pub fn as_text(&self) -> Result<&str, RequestError> {
        let text = std::str::from_utf8(&self.body)?;
        Ok(text)
    }

    /// Deserialize the JSON body.
    ///
    /// # Errors
    ///
    /// Fails if the body cannot be deserialized into `T`, the error reports
    /// the JSON path where deserialization stopped.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # async fn example(client: httptestify_core::RequestClient) -> Result<(), Box<dyn std::error::Error>> {
    /// let message: serde_json::Value = client.get("/get/0/200").await?.as_json()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn as_json<T>(&self) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
    {
        let deserializer = &mut serde_json::Deserializer::from_slice(&self.body);
        serde_path_to_error::deserialize(deserializer).map_err(|err| RequestError::JsonError {
            path: err.path().to_string(),
            error: err.into_inner(),
            body: String::from_utf8_lossy(&self.body).into_owned(),
        })
    }
}
