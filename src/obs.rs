//! Optional observability helpers for the renewal coordinator.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to wrap every call in a `token_renewal.request` span, every refresh wave in a
//!   `token_renewal.wave` span, and emit structured [`RenewalEvent`]s (unless the coordinator is
//!   configured as `silent`).
//! - Enable `metrics` to increment `token_renewal_request_total` (labeled by `outcome`) for every
//!   settled call and `token_renewal_wave_total` (labeled by `outcome`) for every settled wave.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// How a call to the coordinator settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Succeeded on the first attempt.
	Succeeded,
	/// Succeeded after a renewal and replay.
	Replayed,
	/// Bypassed the coordinator (`skip_auth`), whatever its result.
	Bypassed,
	/// Failed with a non-authorization transport error.
	TransportFailed,
	/// Failed authorization again after a replay.
	LoopBroken,
	/// Failed because the wave's refresh failed.
	RefreshFailed,
	/// Cancelled by the caller.
	Cancelled,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Succeeded => "succeeded",
			RequestOutcome::Replayed => "replayed",
			RequestOutcome::Bypassed => "bypassed",
			RequestOutcome::TransportFailed => "transport_failed",
			RequestOutcome::LoopBroken => "loop_broken",
			RequestOutcome::RefreshFailed => "refresh_failed",
			RequestOutcome::Cancelled => "cancelled",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How a refresh wave settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveOutcomeKind {
	/// The credential was renewed.
	Renewed,
	/// The refresh returned `false`.
	Rejected,
	/// The refresh raised an error.
	Errored,
}
impl WaveOutcomeKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			WaveOutcomeKind::Renewed => "renewed",
			WaveOutcomeKind::Rejected => "rejected",
			WaveOutcomeKind::Errored => "errored",
		}
	}

	/// Classifies a wave result.
	pub fn of(outcome: &Result<(), RefreshError>) -> Self {
		match outcome {
			Ok(()) => Self::Renewed,
			Err(RefreshError::Rejected) => Self::Rejected,
			Err(RefreshError::Failed { .. }) => Self::Errored,
		}
	}
}
impl Display for WaveOutcomeKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
