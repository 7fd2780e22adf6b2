//! Request context carried through the coordinator.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, cancel::CancelSignal};

/// Loosely typed per-request flag bag (e.g., a GraphQL operation context or the extra fields of
/// an HTTP client's request config).
pub type FlagMap = serde_json::Map<String, Value>;

/// Names under which the retry marker and the bypass flag appear in a [`FlagMap`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagKeys {
	/// Key of the retry marker.
	pub retry: String,
	/// Key of the bypass flag.
	pub skip_auth: String,
}
impl FlagKeys {
	/// Default key of the retry marker.
	pub const DEFAULT_RETRY: &'static str = "_retry";
	/// Default key of the bypass flag.
	pub const DEFAULT_SKIP_AUTH: &'static str = "_skipAuth";

	/// Creates keys with custom names.
	pub fn new(retry: impl Into<String>, skip_auth: impl Into<String>) -> Self {
		Self { retry: retry.into(), skip_auth: skip_auth.into() }
	}
}
impl Default for FlagKeys {
	fn default() -> Self {
		Self::new(Self::DEFAULT_RETRY, Self::DEFAULT_SKIP_AUTH)
	}
}

/// One unit of work submitted to the coordinator.
///
/// The payload is opaque to the coordinator. The retry marker starts unset and is set exactly
/// once, right before the request is replayed after a successful refresh.
#[derive(Debug)]
pub struct RequestContext<P> {
	payload: P,
	retried: bool,
	skip_auth: bool,
	cancellation: CancelSignal,
}
impl<P> RequestContext<P> {
	/// Wraps a payload with a fresh cancellation signal and no flags set.
	pub fn new(payload: P) -> Self {
		Self { payload, retried: false, skip_auth: false, cancellation: CancelSignal::new() }
	}

	/// Builds a context whose flags are read from `flags` under the configured `keys`.
	pub fn from_flags(payload: P, flags: &FlagMap, keys: &FlagKeys) -> Self {
		let mut context = Self::new(payload);

		context.retried = flag_set(flags, &keys.retry);
		context.skip_auth = flag_set(flags, &keys.skip_auth);

		context
	}

	/// Marks the request as bypassing renewal entirely.
	pub fn skip_auth(mut self) -> Self {
		self.skip_auth = true;

		self
	}

	/// Overrides the bypass flag.
	pub fn with_skip_auth(mut self, skip_auth: bool) -> Self {
		self.skip_auth = skip_auth;

		self
	}

	/// Uses the provided cancellation signal instead of a fresh one.
	pub fn with_cancellation(mut self, signal: CancelSignal) -> Self {
		self.cancellation = signal;

		self
	}

	/// Transport-specific payload.
	pub fn payload(&self) -> &P {
		&self.payload
	}

	/// Mutable access to the payload.
	pub fn payload_mut(&mut self) -> &mut P {
		&mut self.payload
	}

	/// Consumes the context and returns the payload.
	pub fn into_payload(self) -> P {
		self.payload
	}

	/// Whether the request is a replay after a credential renewal.
	pub fn is_retry(&self) -> bool {
		self.retried
	}

	/// Whether failures of this request bypass the coordinator.
	pub fn is_skip_auth(&self) -> bool {
		self.skip_auth
	}

	/// Cancellation signal shared with the caller.
	pub fn cancellation(&self) -> &CancelSignal {
		&self.cancellation
	}

	/// Writes both flags into `flags` under the configured `keys`.
	pub fn write_flags(&self, flags: &mut FlagMap, keys: &FlagKeys) {
		flags.insert(keys.retry.clone(), Value::Bool(self.retried));
		flags.insert(keys.skip_auth.clone(), Value::Bool(self.skip_auth));
	}

	pub(crate) fn mark_retry(&mut self) {
		self.retried = true;
	}
}

fn flag_set(flags: &FlagMap, key: &str) -> bool {
	flags.get(key).is_some_and(is_truthy)
}

fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(flag) => *flag,
		Value::Number(number) => number.as_f64().is_some_and(|n| n != 0. && !n.is_nan()),
		Value::String(text) => !text.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}
