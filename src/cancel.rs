//! Per-request cancellation signal.
//!
//! A [`CancelSignal`] is cloned freely between the caller, the coordinator and the transport
//! adapter. Triggering any clone cancels them all; there is no way to "un-cancel".

// crates.io
use futures::future::{self, Either};
use tokio::sync::watch;
// self
use crate::_prelude::*;

/// Cloneable cancellation handle shared by everyone working on one request.
#[derive(Clone)]
pub struct CancelSignal(Arc<watch::Sender<bool>>);
impl CancelSignal {
	/// Creates a signal that has not been triggered.
	pub fn new() -> Self {
		let (tx, _) = watch::channel(false);

		Self(Arc::new(tx))
	}

	/// Triggers cancellation. Idempotent.
	pub fn cancel(&self) {
		self.0.send_replace(true);
	}

	/// Returns `true` once [`cancel`](Self::cancel) has been called on any clone.
	pub fn is_cancelled(&self) -> bool {
		*self.0.borrow()
	}

	/// Resolves once the signal is triggered; resolves immediately if it already was.
	pub fn cancelled(&self) -> impl Future<Output = ()> + Send + 'static {
		let tx = Arc::clone(&self.0);

		async move {
			let mut rx = tx.subscribe();

			// `tx` is held for the whole wait, so the channel cannot close underneath us.
			let _ = rx.wait_for(|cancelled| *cancelled).await;
		}
	}

	/// Drives `fut` until it completes or the signal fires, whichever comes first.
	///
	/// Returns `None` when cancelled; `fut` is dropped at that point, aborting its work.
	pub async fn run_until_cancelled<F>(&self, fut: F) -> Option<F::Output>
	where
		F: Future,
	{
		if self.is_cancelled() {
			return None;
		}

		let fut = std::pin::pin!(fut);
		let cancelled = std::pin::pin!(self.cancelled());

		match future::select(fut, cancelled).await {
			Either::Left((output, _)) => Some(output),
			Either::Right(((), _)) => None,
		}
	}
}
impl Default for CancelSignal {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for CancelSignal {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("CancelSignal").field(&self.is_cancelled()).finish()
	}
}
