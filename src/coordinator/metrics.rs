// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{_prelude::*, flight::WaveId, obs::WaveOutcomeKind};

/// Thread-safe counters for one coordinator and its clones.
#[derive(Debug, Default)]
pub struct RenewalMetrics {
	refresh_calls: AtomicU64,
	waves_renewed: AtomicU64,
	waves_failed: AtomicU64,
	replays: AtomicU64,
	cancelled_waiters: AtomicU64,
	loop_breaks: AtomicU64,
	bypasses: AtomicU64,
}
impl RenewalMetrics {
	/// Returns the number of times the refresh operation was invoked.
	pub fn refresh_calls(&self) -> u64 {
		self.refresh_calls.load(Ordering::Relaxed)
	}

	/// Returns the number of waves whose refresh succeeded.
	pub fn waves_renewed(&self) -> u64 {
		self.waves_renewed.load(Ordering::Relaxed)
	}

	/// Returns the number of waves whose refresh returned `false` or raised an error.
	pub fn waves_failed(&self) -> u64 {
		self.waves_failed.load(Ordering::Relaxed)
	}

	/// Returns the number of replayed requests.
	pub fn replays(&self) -> u64 {
		self.replays.load(Ordering::Relaxed)
	}

	/// Returns the number of waiters withdrawn before their wave settled.
	pub fn cancelled_waiters(&self) -> u64 {
		self.cancelled_waiters.load(Ordering::Relaxed)
	}

	/// Returns the number of requests that failed authorization after a replay.
	pub fn loop_breaks(&self) -> u64 {
		self.loop_breaks.load(Ordering::Relaxed)
	}

	/// Returns the number of requests that bypassed renewal.
	pub fn bypasses(&self) -> u64 {
		self.bypasses.load(Ordering::Relaxed)
	}

	pub(crate) fn record_refresh_call(&self) {
		self.refresh_calls.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_wave(&self, outcome: WaveOutcomeKind) {
		match outcome {
			WaveOutcomeKind::Renewed => self.waves_renewed.fetch_add(1, Ordering::Relaxed),
			WaveOutcomeKind::Rejected | WaveOutcomeKind::Errored =>
				self.waves_failed.fetch_add(1, Ordering::Relaxed),
		};
	}

	pub(crate) fn record_replay(&self) {
		self.replays.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cancelled_waiter(&self) {
		self.cancelled_waiters.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_loop_break(&self) {
		self.loop_breaks.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_bypass(&self) {
		self.bypasses.fetch_add(1, Ordering::Relaxed);
	}
}

/// Snapshot of the most recently settled refresh wave.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveSummary {
	/// Wave identifier.
	pub wave: WaveId,
	/// Number of waiters drained when the wave settled.
	pub waiters: usize,
	/// How the refresh settled.
	pub outcome: WaveOutcomeKind,
	/// Instant the refresh operation was invoked.
	pub started_at: OffsetDateTime,
	/// Instant the refresh operation returned.
	pub settled_at: OffsetDateTime,
}
