//! Transport adapter contract plus the built-in reqwest-backed adapters.
//!
//! The coordinator never talks to the network itself. It hands each [`RequestContext`] to a
//! [`TransportAdapter`], which executes it and reports either a response or an error that can
//! describe itself through [`FailureDetails`]. Adapters must honour
//! [`RequestContext::cancellation`] by aborting in-flight work promptly.

#[cfg(feature = "reqwest")] pub mod graphql;
#[cfg(feature = "reqwest")] pub mod http;

#[cfg(feature = "reqwest")] pub use graphql::{GraphQlOperation, GraphQlResponse, GraphQlTransport};
#[cfg(feature = "reqwest")] pub use http::{HttpRequest, HttpResponse, HttpTransport};

// self
use crate::{_prelude::*, classify::FailureDetails, request::RequestContext};

/// Boxed future returned by [`TransportAdapter::run`].
pub type TransportFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + 'a + Send>>;

/// Executes one request over a concrete transport.
///
/// Implementations are shared behind `Arc` by the coordinator and may be called concurrently,
/// including replays of requests that previously failed. Each call must be independent: a replay
/// carries the same payload with [`RequestContext::is_retry`] set.
pub trait TransportAdapter
where
	Self: 'static + Send + Sync,
{
	/// Transport-specific request description.
	type Request: 'static + Send + Sync;
	/// Successful result of a request.
	type Response: 'static + Send;
	/// Failure reported by the transport.
	type Error: 'static + Send + Sync + StdError + FailureDetails;

	/// Executes `request`, aborting once its cancellation signal fires.
	fn run<'a>(
		&'a self,
		request: &'a RequestContext<Self::Request>,
	) -> TransportFuture<'a, Self::Response, Self::Error>;
}

/// Attaches the current credential to an outbound request.
///
/// Adapters invoke the signer on every run, so a request replayed after a renewal picks up the
/// renewed credential instead of the one it originally failed with.
pub trait RequestSigner<Request>
where
	Self: Send + Sync,
{
	/// Returns `request` with authorization state attached.
	fn sign(&self, request: Request) -> Request;
}
impl<Request, F> RequestSigner<Request> for F
where
	F: Send + Sync + Fn(Request) -> Request,
{
	fn sign(&self, request: Request) -> Request {
		self(request)
	}
}
