// self
use crate::{_prelude::*, flight::WaveId, queue::WaiterId};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type Instrumented<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type Instrumented<F> = F;

/// A span builder used by the coordinator.
#[derive(Clone, Debug)]
pub struct RenewalSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RenewalSpan {
	/// Span covering one `execute` call.
	pub fn request(stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			Self { span: tracing::info_span!("token_renewal.request", stage) }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self {}
		}
	}

	/// Span covering one refresh wave, including its drain.
	pub fn wave(wave: WaveId) -> Self {
		#[cfg(feature = "tracing")]
		{
			Self { span: tracing::info_span!("token_renewal.wave", wave = wave.get()) }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = wave;

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Diagnostic events emitted by the coordinator.
#[derive(Clone, Copy)]
pub enum RenewalEvent<'a> {
	/// A failure was classified as an authorization failure.
	AuthFailure {
		/// Whether the request had already been replayed.
		retried: bool,
		/// Failure description.
		detail: &'a dyn Display,
	},
	/// A failure was not an authorization failure and is passed to the caller.
	PassThrough {
		/// Failure description.
		detail: &'a dyn Display,
	},
	/// A new refresh wave was started.
	WaveStarted {
		/// Wave identifier.
		wave: WaveId,
	},
	/// A waiter was parked on a wave.
	WaveJoined {
		/// Wave identifier.
		wave: WaveId,
		/// Queue depth after enqueueing.
		queue_depth: usize,
	},
	/// The refresh succeeded and the queue is being replayed.
	RefreshSucceeded {
		/// Wave identifier.
		wave: WaveId,
		/// Number of drained waiters.
		waiters: usize,
	},
	/// The refresh failed and the queue is being rejected.
	RefreshFailed {
		/// Wave identifier.
		wave: WaveId,
		/// Number of drained waiters.
		waiters: usize,
		/// Refresh failure shared by the wave.
		error: &'a RefreshError,
	},
	/// A drained waiter is being replayed.
	Replaying {
		/// Wave identifier.
		wave: WaveId,
		/// Arrival position of the waiter within its wave.
		position: usize,
	},
	/// A waiter was cancelled while parked.
	WaiterCancelled {
		/// Wave identifier.
		wave: WaveId,
		/// Cancelled waiter.
		waiter: WaiterId,
	},
	/// A lifecycle hook panicked; the wave carried on without it.
	HookPanicked {
		/// Wave identifier.
		wave: WaveId,
		/// Hook name (`start`, `success` or `failure`).
		hook: &'static str,
	},
	/// A replayed request failed authorization again.
	LoopBroken {
		/// Failure description.
		detail: &'a dyn Display,
	},
}
impl Debug for RenewalEvent<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.name())
	}
}
impl RenewalEvent<'_> {
	/// Returns a stable event name.
	pub const fn name(&self) -> &'static str {
		match self {
			Self::AuthFailure { .. } => "auth_failure",
			Self::PassThrough { .. } => "pass_through",
			Self::WaveStarted { .. } => "wave_started",
			Self::WaveJoined { .. } => "wave_joined",
			Self::RefreshSucceeded { .. } => "refresh_succeeded",
			Self::RefreshFailed { .. } => "refresh_failed",
			Self::Replaying { .. } => "replaying",
			Self::WaiterCancelled { .. } => "waiter_cancelled",
			Self::HookPanicked { .. } => "hook_panicked",
			Self::LoopBroken { .. } => "loop_broken",
		}
	}
}

/// Emits `event` through `tracing` unless `silent` is set.
pub fn emit(event: RenewalEvent<'_>, silent: bool) {
	#[cfg(feature = "tracing")]
	{
		if silent {
			return;
		}

		let name = event.name();

		match event {
			RenewalEvent::AuthFailure { retried, detail } => {
				tracing::info!(event = name, retried, %detail, "Authorization failure detected.")
			},
			RenewalEvent::PassThrough { detail } => {
				tracing::debug!(event = name, %detail, "Passing non-authorization failure through.")
			},
			RenewalEvent::WaveStarted { wave } => {
				tracing::info!(event = name, wave = wave.get(), "Starting credential refresh.")
			},
			RenewalEvent::WaveJoined { wave, queue_depth } => tracing::info!(
				event = name,
				wave = wave.get(),
				queue_depth,
				"Request queued behind credential refresh."
			),
			RenewalEvent::RefreshSucceeded { wave, waiters } => tracing::info!(
				event = name,
				wave = wave.get(),
				waiters,
				"Credential refresh succeeded; replaying queued requests."
			),
			RenewalEvent::RefreshFailed { wave, waiters, error } => tracing::warn!(
				event = name,
				wave = wave.get(),
				waiters,
				%error,
				"Credential refresh failed; rejecting queued requests."
			),
			RenewalEvent::Replaying { wave, position } => tracing::debug!(
				event = name,
				wave = wave.get(),
				position,
				"Replaying queued request."
			),
			RenewalEvent::WaiterCancelled { wave, waiter } => tracing::info!(
				event = name,
				wave = wave.get(),
				waiter = waiter.get(),
				"Queued request cancelled."
			),
			RenewalEvent::HookPanicked { wave, hook } => tracing::error!(
				event = name,
				wave = wave.get(),
				hook,
				"Refresh lifecycle hook panicked."
			),
			RenewalEvent::LoopBroken { detail } => {
				tracing::warn!(event = name, %detail, "Authorization failed after retry.")
			},
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (event, silent);
	}
}
