//! FIFO waiter queue with constant-time removal by identity.

// self
use crate::_prelude::*;

/// Identity of a queued waiter. Ids are never reused within a queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaiterId(u64);
impl WaiterId {
	/// Raw sequence number (arrival order).
	pub const fn get(self) -> u64 {
		self.0
	}
}
impl Display for WaiterId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "waiter#{}", self.0)
	}
}

/// Arrival-ordered waiter storage.
///
/// Removal leaves a tombstone in the order list instead of shifting it; tombstones are skipped
/// and discarded on [`drain_all`](Self::drain_all).
#[derive(Debug)]
pub struct WaiterQueue<W> {
	order: VecDeque<WaiterId>,
	slots: HashMap<WaiterId, W>,
	next: u64,
}
impl<W> WaiterQueue<W> {
	/// Creates an empty queue.
	pub fn new() -> Self {
		Self { order: VecDeque::new(), slots: HashMap::new(), next: 0 }
	}

	/// Appends a waiter and returns its identity.
	pub fn enqueue(&mut self, waiter: W) -> WaiterId {
		let id = WaiterId(self.next);

		self.next += 1;
		self.order.push_back(id);
		self.slots.insert(id, waiter);

		id
	}

	/// Removes a waiter without settling it. Returns `None` if it was already drained or removed.
	pub fn remove(&mut self, id: WaiterId) -> Option<W> {
		let waiter = self.slots.remove(&id)?;

		if self.slots.is_empty() {
			self.order.clear();
		}

		Some(waiter)
	}

	/// Empties the queue, returning the remaining waiters in arrival order.
	pub fn drain_all(&mut self) -> Vec<W> {
		let slots = &mut self.slots;
		let drained = self.order.drain(..).filter_map(|id| slots.remove(&id)).collect();

		debug_assert!(self.slots.is_empty());

		drained
	}

	/// Number of waiters currently queued.
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	/// Returns `true` when no waiter is queued.
	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}
}
impl<W> Default for WaiterQueue<W> {
	fn default() -> Self {
		Self::new()
	}
}
