//! Error types surfaced by the renewal coordinator and its collaborators.

// std
use std::any::Any;
// self
use crate::_prelude::*;

/// Result alias returned by [`RenewalCoordinator::execute`](crate::RenewalCoordinator::execute).
pub type RenewalResult<T, E> = std::result::Result<T, Error<E>>;

/// Terminal outcome reported to a caller of the coordinator.
///
/// `E` is the transport adapter's own error type. Non-authorization failures are surfaced
/// untouched through [`Error::Transport`].
#[derive(Debug, ThisError)]
pub enum Error<E> {
	/// Transport failure that is not an authorization failure, or any failure of a bypassed
	/// request.
	#[error(transparent)]
	Transport(E),
	/// The request already went through one renewal and failed authorization again.
	#[error("Authorization failed after retry.")]
	AuthFailedAfterRetry {
		/// Failure reported by the replayed request.
		#[source]
		source: E,
	},
	/// Credential refresh failed for the wave this request was waiting on.
	#[error(transparent)]
	Refresh(#[from] RefreshError),
	/// The caller cancelled the request before it settled.
	#[error("Request was cancelled.")]
	Cancelled,
}
impl<E> Error<E> {
	/// Returns `true` when the error is a cancellation.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}

	/// Returns the transport error for pass-through failures.
	pub fn transport(&self) -> Option<&E> {
		match self {
			Self::Transport(inner) | Self::AuthFailedAfterRetry { source: inner } => Some(inner),
			_ => None,
		}
	}
}

/// Failure of a credential refresh, shared by every waiter of the wave.
#[derive(Clone, Debug, ThisError)]
pub enum RefreshError {
	/// The refresh operation completed but reported that renewal did not succeed.
	#[error("Token refresh failed.")]
	Rejected,
	/// The refresh operation itself raised an error.
	#[error("Token refresh raised an error.")]
	Failed {
		/// Underlying refresh failure.
		#[source]
		source: Arc<dyn StdError + Send + Sync>,
	},
}
impl RefreshError {
	/// Wraps an arbitrary refresh failure.
	pub fn failed(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Failed { source: Arc::new(src) }
	}
}

/// Panic raised while a refresh was in flight, surfaced as [`RefreshError::Failed`].
#[derive(Debug, ThisError)]
#[error("Refresher panicked: {message}.")]
pub struct RefresherPanicked {
	/// Panic message, when the payload was a string.
	pub message: String,
}
impl RefresherPanicked {
	pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
		let message = match payload.downcast::<String>() {
			Ok(message) => *message,
			Err(payload) => payload
				.downcast_ref::<&'static str>()
				.map_or_else(|| "non-string panic payload".into(), |message| (*message).into()),
		};

		Self { message }
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::io;
	// self
	use super::*;

	#[test]
	fn refresh_error_exposes_source() {
		let err = RefreshError::failed(io::Error::other("refresh endpoint unreachable"));
		let source = StdError::source(&err).expect("Failed refresh should expose its source.");

		assert_eq!(source.to_string(), "refresh endpoint unreachable");
		assert_eq!(err.to_string(), "Token refresh raised an error.");
	}

	#[test]
	fn refresh_error_converts_into_coordinator_error() {
		let err: Error<io::Error> = RefreshError::Rejected.into();

		assert!(matches!(err, Error::Refresh(RefreshError::Rejected)));
		assert_eq!(err.to_string(), "Token refresh failed.");
		assert!(err.transport().is_none());
	}

	#[test]
	fn auth_failed_after_retry_keeps_transport_source() {
		let err = Error::AuthFailedAfterRetry { source: io::Error::other("401 Unauthorized") };

		assert_eq!(err.to_string(), "Authorization failed after retry.");
		assert_eq!(
			err.transport().map(ToString::to_string).as_deref(),
			Some("401 Unauthorized")
		);
		assert!(!err.is_cancelled());
	}

	#[test]
	fn panic_payloads_keep_their_message() {
		let owned = RefresherPanicked::from_payload(Box::new(String::from("store poisoned")));
		let borrowed = RefresherPanicked::from_payload(Box::new("store poisoned"));
		let opaque = RefresherPanicked::from_payload(Box::new(7_u8));

		assert_eq!(owned.message, "store poisoned");
		assert_eq!(borrowed.message, "store poisoned");
		assert_eq!(opaque.message, "non-string panic payload");
		assert_eq!(owned.to_string(), "Refresher panicked: store poisoned.");
	}
}
