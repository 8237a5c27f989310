use std::sync::Arc;

use tracing::{debug, error};

use super::{CallResponse, RequestError};
use crate::server::ServerLifecycle;

/// Hooks composed around the transport call of every [`RequestCall`](super::RequestCall).
///
/// The default set does nothing: failures propagate as they are. The
/// implicit-lifecycle set starts the server before the call, stops it after,
/// and resolves failures carrying a response with that response.
#[derive(Debug, Clone, Default)]
pub(crate) struct Interceptors {
    lifecycle: Option<Arc<ServerLifecycle>>,
    recover_responses: bool,
}

impl Interceptors {
    pub(crate) fn implicit(lifecycle: Arc<ServerLifecycle>) -> Self {
        Self {
            lifecycle: Some(lifecycle),
            recover_responses: true,
        }
    }

    pub(crate) async fn before_call(&self) -> Result<(), RequestError> {
        if let Some(lifecycle) = &self.lifecycle {
            lifecycle.start().await?;
        }
        Ok(())
    }

    pub(crate) async fn after_call(
        &self,
        outcome: Result<CallResponse, RequestError>,
    ) -> Result<CallResponse, RequestError> {
        let cleanup = match &self.lifecycle {
            Some(lifecycle) => lifecycle.end().await,
            None => Ok(()),
        };

        let outcome = match outcome {
            Ok(response) => Ok(response),
            Err(RequestError::UnexpectedStatus { response }) if self.recover_responses => {
                debug!(status = %response.status(), "resolving the failed call with its response");
                Ok(*response)
            }
            Err(error) => Err(error),
        };

        match (outcome, cleanup) {
            (outcome, Ok(())) => outcome,
            (Ok(_), Err(cleanup_error)) => Err(cleanup_error.into()),
            (Err(error), Err(cleanup_error)) => {
                error!(?cleanup_error, "fail to stop the server after a failed call");
                Err(error)
            }
        }
    }
}
