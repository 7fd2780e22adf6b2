//! Single-flight refresh guard and the waiter queue it owns.
//!
//! [`RefreshFlight`] tracks whether a refresh wave is in flight and which waiters belong to it.
//! Starting a wave, joining it, withdrawing a waiter, and completing the wave each happen under
//! one short-lived lock; the wave future itself runs outside the lock. Completing a wave flips the
//! state back to [`RefreshState::Idle`] and drains the queue in the same critical section, so a
//! request that fails after that point always lands in the next wave.

// crates.io
use futures::future::{BoxFuture, FutureExt, Shared};
// self
use crate::{
	_prelude::*,
	queue::{WaiterId, WaiterQueue},
};

/// Result of a refresh wave, cloned to every party awaiting it.
pub type WaveOutcome = Result<(), RefreshError>;
/// Boxed wave future produced by the wave starter.
pub type WaveFuture = BoxFuture<'static, WaveOutcome>;
/// Handle to an in-flight wave; every clone drives and observes the same refresh.
pub type WaveHandle = Shared<WaveFuture>;

/// Sequence number of a refresh wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaveId(u64);
impl WaveId {
	/// Raw sequence number; the first wave is `1`.
	pub const fn get(self) -> u64 {
		self.0
	}
}
impl Display for WaveId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "wave#{}", self.0)
	}
}

/// Whether a refresh is currently in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefreshState {
	/// No refresh in flight; the queue is empty.
	#[default]
	Idle,
	/// A refresh wave is in flight.
	Refreshing,
}
impl RefreshState {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshState::Idle => "idle",
			RefreshState::Refreshing => "refreshing",
		}
	}
}
impl Display for RefreshState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Receipt returned by [`RefreshFlight::trigger`].
#[derive(Clone)]
pub struct Trigger {
	/// Wave the caller is attached to.
	pub wave: WaveId,
	/// Shared handle resolving when the wave settles.
	pub handle: WaveHandle,
	/// `true` when this call started the wave.
	pub started: bool,
}
impl Debug for Trigger {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Trigger").field("wave", &self.wave).field("started", &self.started).finish()
	}
}

/// Receipt returned by [`RefreshFlight::join`].
#[derive(Clone, Debug)]
pub struct Ticket {
	/// Wave the waiter belongs to.
	pub trigger: Trigger,
	/// Identity of the queued waiter, used for withdrawal.
	pub waiter: WaiterId,
	/// Queue depth right after enqueueing.
	pub queue_depth: usize,
}

struct FlightState<W> {
	active: Option<(WaveId, WaveHandle)>,
	queue: WaiterQueue<W>,
	last_wave: u64,
}
impl<W> FlightState<W> {
	fn trigger<F>(&mut self, start: F) -> Trigger
	where
		F: FnOnce(WaveId) -> WaveFuture,
	{
		if let Some((wave, handle)) = &self.active {
			return Trigger { wave: *wave, handle: handle.clone(), started: false };
		}

		self.last_wave += 1;

		let wave = WaveId(self.last_wave);
		let handle = start(wave).shared();

		self.active = Some((wave, handle.clone()));

		Trigger { wave, handle, started: true }
	}
}

/// Single-flight guard for credential refreshes plus the FIFO queue of waiters.
pub struct RefreshFlight<W>(Mutex<FlightState<W>>);
impl<W> RefreshFlight<W> {
	/// Creates an idle guard with an empty queue.
	pub fn new() -> Self {
		Self(Mutex::new(FlightState { active: None, queue: WaiterQueue::new(), last_wave: 0 }))
	}

	/// Current refresh state.
	pub fn state(&self) -> RefreshState {
		if self.0.lock().active.is_some() { RefreshState::Refreshing } else { RefreshState::Idle }
	}

	/// Wave currently in flight, if any.
	pub fn active_wave(&self) -> Option<WaveId> {
		self.0.lock().active.as_ref().map(|(wave, _)| *wave)
	}

	/// Number of waiters parked on the active wave.
	pub fn queue_depth(&self) -> usize {
		self.0.lock().queue.len()
	}

	/// Attaches to the in-flight wave, or starts one with `start` when idle.
	///
	/// `start` runs under the lock and must only build the future, never poll it.
	pub fn trigger<F>(&self, start: F) -> Trigger
	where
		F: FnOnce(WaveId) -> WaveFuture,
	{
		self.0.lock().trigger(start)
	}

	/// Enqueues `waiter` on the active wave (starting one if idle) in a single atomic step.
	pub fn join<F>(&self, waiter: W, start: F) -> Ticket
	where
		F: FnOnce(WaveId) -> WaveFuture,
	{
		let mut state = self.0.lock();
		let trigger = state.trigger(start);
		let waiter = state.queue.enqueue(waiter);

		Ticket { trigger, waiter, queue_depth: state.queue.len() }
	}

	/// Removes a queued waiter without settling it.
	///
	/// Returns `None` when the waiter was already drained by its wave.
	pub fn withdraw(&self, waiter: WaiterId) -> Option<W> {
		self.0.lock().queue.remove(waiter)
	}

	/// Ends `wave`: flips to [`RefreshState::Idle`] and drains its waiters in arrival order.
	///
	/// Completing a wave that is not the active one is a no-op.
	pub fn complete(&self, wave: WaveId) -> Vec<W> {
		let mut state = self.0.lock();

		match &state.active {
			Some((active, _)) if *active == wave => {
				state.active = None;

				state.queue.drain_all()
			},
			_ => Vec::new(),
		}
	}
}
impl<W> Default for RefreshFlight<W> {
	fn default() -> Self {
		Self::new()
	}
}
impl<W> Debug for RefreshFlight<W> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.0.lock();

		f.debug_struct("RefreshFlight")
			.field("active_wave", &state.active.as_ref().map(|(wave, _)| *wave))
			.field("queue_depth", &state.queue.len())
			.finish()
	}
}
