//! Concurrent calls sharing a single server start.
//!
//! The three combinators follow the same sequence: the server is started
//! once, the callback builds the calls against a fresh [`HttpClient`], the
//! calls run concurrently, the results are aggregated, then the server is
//! stopped once, whatever the outcome.
//!
//! Calls still in flight when the aggregate settles keep running in the
//! background, their results are discarded.

use std::any::Any;
use std::collections::HashMap;
use std::future::{Future, IntoFuture};
use std::panic;

use tokio::task::{self, AbortHandle, JoinSet};
use tracing::{debug, error};

use super::{CallResponse, HttpClient, RequestClient, RequestError};

type Indexed = (usize, Result<CallResponse, RequestError>);

/// The outcome of a call run by [`RequestClient::all_settled`].
#[derive(Debug)]
pub enum Settled {
    /// The call succeeded.
    Fulfilled(CallResponse),
    /// The call failed.
    Rejected(RequestError),
}

impl Settled {
    /// Whether the call succeeded.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    /// Whether the call failed.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// The response, from the success or carried by the failure.
    pub fn response(&self) -> Option<&CallResponse> {
        match self {
            Self::Fulfilled(response) => Some(response),
            Self::Rejected(error) => error.response(),
        }
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&RequestError> {
        match self {
            Self::Fulfilled(_) => None,
            Self::Rejected(error) => Some(error),
        }
    }

    /// Back to a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the failure of a rejected call.
    pub fn into_result(self) -> Result<CallResponse, RequestError> {
        match self {
            Self::Fulfilled(response) => Ok(response),
            Self::Rejected(error) => Err(error),
        }
    }
}

impl From<Result<CallResponse, RequestError>> for Settled {
    fn from(outcome: Result<CallResponse, RequestError>) -> Self {
        match outcome {
            Ok(response) => Self::Fulfilled(response),
            Err(error) => Self::Rejected(error),
        }
    }
}

impl RequestClient {
    /// Runs the calls concurrently, every one must succeed.
    ///
    /// The responses are in the order of the calls. A response outside the
    /// expected status codes is a failure here.
    ///
    /// ```rust,no_run
    /// # async fn example(client: httptestify_core::RequestClient) -> Result<(), httptestify_core::RequestError> {
    /// let responses = client
    ///     .all(|client| [client.post("/post"), client.get("/get/0/200")])
    ///     .await?;
    /// assert_eq!(responses.len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Fails with the first failure to occur, or if the server cannot be
    /// started or stopped.
    pub async fn all<F, I>(&self, calls: F) -> Result<Vec<CallResponse>, RequestError>
    where
        F: FnOnce(&HttpClient) -> I,
        I: IntoIterator,
        I::Item: IntoFuture<Output = Result<CallResponse, RequestError>>,
        <I::Item as IntoFuture>::IntoFuture: Send + 'static,
    {
        self.batch(calls, settle_all).await
    }

    /// Runs the calls concurrently and waits for every one to settle.
    ///
    /// The outcomes are in the order of the calls.
    ///
    /// # Errors
    ///
    /// Fails only if the server cannot be started or stopped.
    pub async fn all_settled<F, I>(&self, calls: F) -> Result<Vec<Settled>, RequestError>
    where
        F: FnOnce(&HttpClient) -> I,
        I: IntoIterator,
        I::Item: IntoFuture<Output = Result<CallResponse, RequestError>>,
        <I::Item as IntoFuture>::IntoFuture: Send + 'static,
    {
        self.batch(calls, settle_each).await
    }

    /// Runs the calls concurrently, the first to settle wins.
    ///
    /// # Errors
    ///
    /// Fails if the first call to settle failed, if there is no call, or if
    /// the server cannot be started or stopped.
    pub async fn race<F, I>(&self, calls: F) -> Result<CallResponse, RequestError>
    where
        F: FnOnce(&HttpClient) -> I,
        I: IntoIterator,
        I::Item: IntoFuture<Output = Result<CallResponse, RequestError>>,
        <I::Item as IntoFuture>::IntoFuture: Send + 'static,
    {
        self.batch(calls, settle_first).await
    }

    async fn batch<F, I, A, Fut, T>(&self, calls: F, aggregate: A) -> Result<T, RequestError>
    where
        F: FnOnce(&HttpClient) -> I,
        I: IntoIterator,
        I::Item: IntoFuture<Output = Result<CallResponse, RequestError>>,
        <I::Item as IntoFuture>::IntoFuture: Send + 'static,
        A: FnOnce(InFlight) -> Fut,
        Fut: Future<Output = Result<T, Interrupted>>,
    {
        let client = self.batch_client()?;
        self.lifecycle().start().await?;

        let mut in_flight = InFlight::default();
        for (index, call) in calls(&client).into_iter().enumerate() {
            in_flight.spawn(index, call.into_future());
        }
        debug!(calls = in_flight.len(), "calls issued");

        let result = aggregate(in_flight).await;
        let cleanup = self.lifecycle().end().await;

        let result = match result {
            Ok(value) => Ok(value),
            Err(Interrupted::Failed(error)) => Err(error),
            Err(Interrupted::Panicked(payload)) => {
                if let Err(cleanup_error) = &cleanup {
                    error!(?cleanup_error, "fail to stop the server after a panic");
                }
                panic::resume_unwind(payload);
            }
        };

        match (result, cleanup) {
            (result, Ok(())) => result,
            (Ok(_), Err(cleanup_error)) => Err(cleanup_error.into()),
            (Err(error), Err(cleanup_error)) => {
                error!(?cleanup_error, "fail to stop the server after failed calls");
                Err(error)
            }
        }
    }
}

/// Why an aggregate stopped early.
///
/// A panic is only re-raised once the server is stopped.
#[derive(Debug)]
enum Interrupted {
    Failed(RequestError),
    Panicked(Box<dyn Any + Send>),
}

impl From<RequestError> for Interrupted {
    fn from(error: RequestError) -> Self {
        Self::Failed(error)
    }
}

/// The spawned calls, each tagged with its position.
#[derive(Debug, Default)]
struct InFlight {
    calls: JoinSet<Indexed>,
    // a cancelled task loses its tag, its id remains
    indexes: HashMap<task::Id, usize>,
}

impl InFlight {
    fn spawn<Fut>(&mut self, index: usize, call: Fut) -> AbortHandle
    where
        Fut: Future<Output = Result<CallResponse, RequestError>> + Send + 'static,
    {
        let handle = self.calls.spawn(async move { (index, call.await) });
        self.indexes.insert(handle.id(), index);
        handle
    }

    fn len(&self) -> usize {
        self.calls.len()
    }

    fn detach_all(&mut self) {
        self.calls.detach_all();
    }

    /// The next call to settle, `None` once every call has settled.
    async fn next(&mut self) -> Option<Result<Indexed, Interrupted>> {
        let joined = match self.calls.join_next().await? {
            Ok(indexed) => Ok(indexed),
            Err(error) if error.is_panic() => Err(Interrupted::Panicked(error.into_panic())),
            Err(error) => match self.indexes.get(&error.id()) {
                Some(&index) => Ok((index, Err(RequestError::JoinError(error)))),
                None => Err(Interrupted::Failed(RequestError::JoinError(error))),
            },
        };
        Some(joined)
    }
}

async fn settle_all(mut in_flight: InFlight) -> Result<Vec<CallResponse>, Interrupted> {
    let mut responses: Vec<Option<CallResponse>> = (0..in_flight.len()).map(|_| None).collect();

    while let Some(joined) = in_flight.next().await {
        let outcome = joined.and_then(|(index, outcome)| Ok((index, outcome?)));
        match outcome {
            Ok((index, response)) => {
                if let Some(slot) = responses.get_mut(index) {
                    *slot = Some(response);
                }
            }
            Err(interrupted) => {
                debug!(pending = in_flight.len(), "a call failed, detach the others");
                in_flight.detach_all();
                return Err(interrupted);
            }
        }
    }

    Ok(responses.into_iter().flatten().collect())
}

async fn settle_each(mut in_flight: InFlight) -> Result<Vec<Settled>, Interrupted> {
    let mut settled: Vec<Option<Settled>> = (0..in_flight.len()).map(|_| None).collect();

    while let Some(joined) = in_flight.next().await {
        let (index, outcome) = match joined {
            Ok(indexed) => indexed,
            Err(interrupted) => {
                in_flight.detach_all();
                return Err(interrupted);
            }
        };
        if let Some(slot) = settled.get_mut(index) {
            *slot = Some(Settled::from(outcome));
        }
    }

    Ok(settled.into_iter().flatten().collect())
}

async fn settle_first(mut in_flight: InFlight) -> Result<CallResponse, Interrupted> {
    let Some(joined) = in_flight.next().await else {
        return Err(RequestError::EmptyRace.into());
    };
    debug!(pending = in_flight.len(), "race settled, detach the others");
    in_flight.detach_all();

    let (_, outcome) = joined?;
    Ok(outcome?)
}
