//! Scripted backend, transport and refresher shared by the coordinator integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::HashMap,
	io,
	sync::{
		Arc,
		atomic::{AtomicU64, AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use parking_lot::Mutex;
use thiserror::Error as ThisError;
// self
use token_renewal::{
	RefreshError,
	classify::{ErrorEntry, FailureDetails, FailureView},
	refresh::{CredentialRefresher, RefreshFuture},
	request::RequestContext,
	transport::{TransportAdapter, TransportFuture},
};

/// Latency of a transport call unless overridden per request.
pub const CALL_LATENCY: Duration = Duration::from_millis(10);
/// Latency of a refresh call.
pub const REFRESH_LATENCY: Duration = Duration::from_millis(50);

/// One transport call observed by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
	pub name: &'static str,
	pub retried: bool,
}

/// Failure returned by [`MockTransport`].
#[derive(Clone, Debug, ThisError)]
#[error("Mock backend rejected the request with status {status:?}.")]
pub struct MockError {
	pub status: Option<u16>,
	pub entries: Vec<ErrorEntry>,
}
impl MockError {
	pub fn status(status: u16) -> Self {
		Self { status: Some(status), entries: Vec::new() }
	}

	pub fn entry(entry: ErrorEntry) -> Self {
		Self { status: None, entries: vec![entry] }
	}
}
impl FailureDetails for MockError {
	fn failure_view(&self) -> FailureView<'_> {
		FailureView { status: self.status, entries: &self.entries }
	}
}

/// Session-backed fake server: a call succeeds only when the credential it was sent with is the
/// one the server currently accepts.
#[derive(Debug)]
pub struct Backend {
	server_token: AtomicU64,
	client_token: AtomicU64,
	refreshes: AtomicUsize,
	calls: Mutex<Vec<Call>>,
	latencies: Mutex<HashMap<&'static str, Duration>>,
	overrides: Mutex<HashMap<&'static str, MockError>>,
}
impl Backend {
	/// Creates a backend whose client credential is valid.
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			server_token: AtomicU64::new(1),
			client_token: AtomicU64::new(1),
			refreshes: AtomicUsize::new(0),
			calls: Mutex::new(Vec::new()),
			latencies: Mutex::new(HashMap::new()),
			overrides: Mutex::new(HashMap::new()),
		})
	}

	/// Creates a backend whose client credential has already expired.
	pub fn expired() -> Arc<Self> {
		let backend = Self::new();

		backend.expire_session();

		backend
	}

	/// Rotates the server-side credential so the client's current one is rejected.
	pub fn expire_session(&self) {
		self.server_token.fetch_add(1, Ordering::SeqCst);
	}

	/// Hands the client the credential the server currently accepts.
	pub fn renew(&self) {
		self.client_token.store(self.server_token.load(Ordering::SeqCst), Ordering::SeqCst);
	}

	/// Overrides the latency of every call named `name`.
	pub fn set_latency(&self, name: &'static str, latency: Duration) {
		self.latencies.lock().insert(name, latency);
	}

	/// Makes every call named `name` fail with `error`.
	pub fn fail_with(&self, name: &'static str, error: MockError) {
		self.overrides.lock().insert(name, error);
	}

	pub fn refreshes(&self) -> usize {
		self.refreshes.load(Ordering::SeqCst)
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	/// Retry markers of every call named `name`, in call order.
	pub fn attempts_of(&self, name: &str) -> Vec<bool> {
		self.calls.lock().iter().filter(|call| call.name == name).map(|call| call.retried).collect()
	}

	/// Names of the replayed calls, in call order.
	pub fn replay_order(&self) -> Vec<&'static str> {
		self.calls.lock().iter().filter(|call| call.retried).map(|call| call.name).collect()
	}

	fn latency_of(&self, name: &str) -> Duration {
		self.latencies.lock().get(name).copied().unwrap_or(CALL_LATENCY)
	}
}

/// Transport whose requests are plain names; responses echo the name.
#[derive(Clone, Debug)]
pub struct MockTransport(pub Arc<Backend>);
impl TransportAdapter for MockTransport {
	type Error = MockError;
	type Request = &'static str;
	type Response = String;

	fn run<'a>(
		&'a self,
		request: &'a RequestContext<Self::Request>,
	) -> TransportFuture<'a, Self::Response, Self::Error> {
		Box::pin(async move {
			let backend = &self.0;
			let name = *request.payload();
			let sent_with = backend.client_token.load(Ordering::SeqCst);

			backend.calls.lock().push(Call { name, retried: request.is_retry() });

			if request
				.cancellation()
				.run_until_cancelled(tokio::time::sleep(backend.latency_of(name)))
				.await
				.is_none()
			{
				return Err(MockError::status(499));
			}
			if let Some(error) = backend.overrides.lock().get(name).cloned() {
				return Err(error);
			}
			if sent_with != backend.server_token.load(Ordering::SeqCst) {
				return Err(MockError::status(401));
			}

			Ok(format!("{name}: ok"))
		})
	}
}

/// How [`MockRefresher`] behaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshMode {
	/// Renews the client credential and reports success.
	Renew,
	/// Reports success without renewing anything.
	Stale,
	/// Reports `false`.
	Reject,
	/// Raises an error.
	Raise,
	/// Panics on the first call, then behaves like [`RefreshMode::Renew`].
	PanicFirst,
}

#[derive(Debug)]
pub struct MockRefresher {
	backend: Arc<Backend>,
	mode: RefreshMode,
}
impl MockRefresher {
	pub fn new(backend: &Arc<Backend>, mode: RefreshMode) -> Self {
		Self { backend: backend.clone(), mode }
	}
}
impl CredentialRefresher for MockRefresher {
	fn refresh(&self) -> RefreshFuture<'_> {
		Box::pin(async move {
			let call = self.backend.refreshes.fetch_add(1, Ordering::SeqCst);

			tokio::time::sleep(REFRESH_LATENCY).await;

			match self.mode {
				RefreshMode::PanicFirst if call == 0 => panic!("Session store crashed mid-renewal."),
				RefreshMode::Renew | RefreshMode::PanicFirst => {
					self.backend.renew();

					Ok(true)
				},
				RefreshMode::Stale => Ok(true),
				RefreshMode::Reject => Ok(false),
				RefreshMode::Raise =>
					Err(RefreshError::failed(io::Error::other("Refresh endpoint is unreachable."))),
			}
		})
	}
}
