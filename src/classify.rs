//! Authorization-failure classification.
//!
//! Transport errors describe themselves through [`FailureDetails`], producing a [`FailureView`]
//! with the transport-level status and any application-level error entries. An
//! [`AuthClassifier`] decides whether that view warrants a credential renewal. The coordinator
//! only ever consults the configured classifier, so the HTTP-style and GraphQL-style adapters
//! share one policy.

// self
use crate::_prelude::*;

/// Machine-readable code carried by application-level errors for an expired or missing credential.
pub const UNAUTHENTICATED_CODE: &str = "UNAUTHENTICATED";

const UNAUTHORIZED_STATUS: u16 = 401;
const UNAUTHORIZED_MARKERS: [&str; 2] = ["Unauthorized", "UNAUTHENTICATED"];

/// Application-level error entry (e.g., one element of a GraphQL `errors` array).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
	/// Machine-readable error code, when the server supplied one.
	pub code: Option<String>,
	/// Human-readable message.
	pub message: String,
}
impl ErrorEntry {
	/// Creates an entry with only a message.
	pub fn new(message: impl Into<String>) -> Self {
		Self { code: None, message: message.into() }
	}

	/// Attaches a machine-readable code.
	pub fn with_code(mut self, code: impl Into<String>) -> Self {
		self.code = Some(code.into());

		self
	}
}

/// Borrowed description of a failed request handed to an [`AuthClassifier`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FailureView<'a> {
	/// Transport-level status code (HTTP status), if the failure carried one.
	pub status: Option<u16>,
	/// Application-level error entries reported alongside the failure.
	pub entries: &'a [ErrorEntry],
}
impl<'a> FailureView<'a> {
	/// View carrying only a transport-level status.
	pub fn status(status: u16) -> Self {
		Self { status: Some(status), entries: &[] }
	}

	/// View carrying only application-level entries.
	pub fn entries(entries: &'a [ErrorEntry]) -> Self {
		Self { status: None, entries }
	}
}

/// Implemented by transport error types so their failures can be classified.
pub trait FailureDetails {
	/// Describes the failure for classification.
	fn failure_view(&self) -> FailureView<'_>;
}

/// Decides whether a failure is an authorization failure worth renewing the credential for.
pub trait AuthClassifier
where
	Self: Send + Sync,
{
	/// Returns `true` when the failure should trigger a credential renewal.
	fn is_auth_failure(&self, failure: &FailureView<'_>) -> bool;
}
impl<F> AuthClassifier for F
where
	F: Send + Sync + Fn(&FailureView<'_>) -> bool,
{
	fn is_auth_failure(&self, failure: &FailureView<'_>) -> bool {
		self(failure)
	}
}

/// Baseline policy: a 401 status, an `UNAUTHENTICATED` code, or a message mentioning
/// `Unauthorized`/`UNAUTHENTICATED` (case-sensitive).
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAuthClassifier;
impl AuthClassifier for DefaultAuthClassifier {
	fn is_auth_failure(&self, failure: &FailureView<'_>) -> bool {
		failure.status == Some(UNAUTHORIZED_STATUS) || failure.entries.iter().any(entry_is_auth)
	}
}

fn entry_is_auth(entry: &ErrorEntry) -> bool {
	entry.code.as_deref() == Some(UNAUTHENTICATED_CODE)
		|| UNAUTHORIZED_MARKERS.iter().any(|marker| entry.message.contains(marker))
}
