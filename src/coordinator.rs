//! Request coordinator: run, classify, share one refresh per wave, replay.
//!
//! [`RenewalCoordinator::execute`] runs a request through the configured [`TransportAdapter`].
//! When the adapter reports an authorization failure, the request is parked on the current
//! refresh wave (starting one if none is in flight). Every parked request awaits the same shared
//! refresh; when it settles, the wave flips the coordinator back to idle, drains the queue, and
//! either replays each request once with its retry marker set or rejects all of them with the
//! wave's [`RefreshError`].
//!
//! Each wave runs on its own Tokio task, so it settles even when every waiter has been cancelled.
//! Waiters only await their own settlement.

mod metrics;

pub use metrics::{RenewalMetrics, WaveSummary};

// std
use std::panic::{self, AssertUnwindSafe};
// crates.io
use futures::{
	channel::oneshot,
	future::{self, Either, FutureExt},
};
// self
use crate::{
	_prelude::*,
	classify::FailureDetails,
	error::RefresherPanicked,
	config::RenewalConfig,
	flight::{RefreshFlight, RefreshState, WaveId, WaveOutcome},
	obs::{self, RenewalEvent, RenewalSpan, RequestOutcome, WaveOutcomeKind},
	queue::WaiterId,
	refresh::CredentialRefresher,
	request::{FlagMap, RequestContext},
	transport::TransportAdapter,
};

type Settlement<T> =
	RenewalResult<<T as TransportAdapter>::Response, <T as TransportAdapter>::Error>;

struct Waiter<T>
where
	T: TransportAdapter,
{
	request: RequestContext<T::Request>,
	settle: oneshot::Sender<Settlement<T>>,
}

/// Coordinates credential renewal for every request issued through one transport integration.
///
/// Clones share the same state; independent coordinators share nothing.
pub struct RenewalCoordinator<T>
where
	T: TransportAdapter,
{
	inner: Arc<Inner<T>>,
}
impl<T> RenewalCoordinator<T>
where
	T: TransportAdapter,
{
	/// Creates a coordinator with the default configuration.
	pub fn new(transport: T, refresher: impl CredentialRefresher) -> Self {
		Self::with_config(transport, refresher, RenewalConfig::default())
	}

	/// Creates a coordinator with an explicit configuration.
	pub fn with_config(
		transport: T,
		refresher: impl CredentialRefresher,
		config: RenewalConfig,
	) -> Self {
		Self {
			inner: Arc::new(Inner {
				transport,
				refresher: Arc::new(refresher),
				config,
				flight: RefreshFlight::new(),
				metrics: RenewalMetrics::default(),
				last_wave: Mutex::new(None),
			}),
		}
	}

	/// Runs `request`, renewing the credential and replaying once on an authorization failure.
	///
	/// # Errors
	///
	/// - [`Error::Transport`] when the adapter fails with a non-authorization failure (or with
	///   any failure for `skip_auth` requests).
	/// - [`Error::AuthFailedAfterRetry`] when an already replayed request fails authorization.
	/// - [`Error::Refresh`] when the wave the request was parked on failed to renew.
	/// - [`Error::Cancelled`] when the request's cancellation signal fired first.
	///
	/// # Panics
	///
	/// Panics when a request that starts a refresh wave is polled outside a Tokio runtime.
	pub async fn execute(
		&self,
		request: RequestContext<T::Request>,
	) -> RenewalResult<T::Response, T::Error> {
		let span = RenewalSpan::request("execute");

		span.instrument(self.inner.execute(request)).await
	}

	/// Wraps `payload` in a fresh context.
	pub fn context(&self, payload: T::Request) -> RequestContext<T::Request> {
		RequestContext::new(payload)
	}

	/// Builds a context whose flags are read from `flags` under the configured keys.
	pub fn context_from_flags(
		&self,
		payload: T::Request,
		flags: &FlagMap,
	) -> RequestContext<T::Request> {
		RequestContext::from_flags(payload, flags, &self.inner.config.flag_keys)
	}

	/// Current refresh state.
	pub fn refresh_state(&self) -> RefreshState {
		self.inner.flight.state()
	}

	/// Wave currently in flight, if any.
	pub fn active_wave(&self) -> Option<WaveId> {
		self.inner.flight.active_wave()
	}

	/// Number of requests parked on the in-flight wave.
	pub fn queue_depth(&self) -> usize {
		self.inner.flight.queue_depth()
	}

	/// Counters shared by this coordinator and its clones.
	pub fn metrics(&self) -> &RenewalMetrics {
		&self.inner.metrics
	}

	/// Summary of the most recently settled wave.
	pub fn last_wave(&self) -> Option<WaveSummary> {
		self.inner.last_wave.lock().clone()
	}

	/// Configuration in effect.
	pub fn config(&self) -> &RenewalConfig {
		&self.inner.config
	}

	/// Adapter every attempt is issued through.
	pub fn transport(&self) -> &T {
		&self.inner.transport
	}
}
impl<T> Clone for RenewalCoordinator<T>
where
	T: TransportAdapter,
{
	fn clone(&self) -> Self {
		Self { inner: self.inner.clone() }
	}
}
impl<T> Debug for RenewalCoordinator<T>
where
	T: TransportAdapter,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RenewalCoordinator")
			.field("flight", &self.inner.flight)
			.field("config", &self.inner.config)
			.finish()
	}
}

struct Inner<T>
where
	T: TransportAdapter,
{
	transport: T,
	refresher: Arc<dyn CredentialRefresher>,
	config: RenewalConfig,
	flight: RefreshFlight<Waiter<T>>,
	metrics: RenewalMetrics,
	last_wave: Mutex<Option<WaveSummary>>,
}
impl<T> Inner<T>
where
	T: TransportAdapter,
{
	async fn execute(self: &Arc<Self>, request: RequestContext<T::Request>) -> Settlement<T> {
		if request.is_skip_auth() {
			self.metrics.record_bypass();
			obs::record_request_outcome(RequestOutcome::Bypassed);

			return self.transport.run(&request).await.map_err(Error::Transport);
		}

		let result = match self.attempt(&request).await {
			None => Err(Error::Cancelled),
			Some(Ok(response)) => Ok(response),
			Some(Err(error)) => {
				let retried = request.is_retry();

				if !self.is_auth_failure(&error, retried) {
					Err(Error::Transport(error))
				} else if retried {
					Err(self.break_loop(error))
				} else {
					return self.park(request).await;
				}
			},
		};

		record_settlement(&result, false);

		result
	}

	async fn park(self: &Arc<Self>, request: RequestContext<T::Request>) -> Settlement<T> {
		let cancellation = request.cancellation().clone();
		let (settle, settled) = oneshot::channel();
		let ticket = self
			.flight
			.join(Waiter { request, settle }, |wave| self.clone().run_wave(wave).boxed());
		let wave = ticket.trigger.wave;

		if ticket.trigger.started {
			obs::emit(RenewalEvent::WaveStarted { wave }, self.config.silent);

			// Detached: the wave clears itself from the flight when it settles.
			tokio::spawn(ticket.trigger.handle);
		}

		obs::emit(
			RenewalEvent::WaveJoined { wave, queue_depth: ticket.queue_depth },
			self.config.silent,
		);

		// Withdraws the waiter if this future is cancelled or dropped while still queued.
		let _parked = Parked { inner: self, wave, waiter: ticket.waiter };
		let result = match cancellation.run_until_cancelled(settled).await {
			Some(Ok(settlement)) => settlement,
			Some(Err(oneshot::Canceled)) | None => Err(Error::Cancelled),
		};

		record_settlement(&result, true);

		result
	}

	async fn run_wave(self: Arc<Self>, wave: WaveId) -> WaveOutcome {
		let span = RenewalSpan::wave(wave);

		span.instrument(async move {
			let silent = self.config.silent;
			let started_at = OffsetDateTime::now_utc();

			self.fire_hook(wave, "start", || self.config.handlers.start());
			self.metrics.record_refresh_call();

			let refreshed =
				AssertUnwindSafe(async { self.refresher.refresh().await }).catch_unwind().await;
			let outcome = match refreshed {
				Ok(Ok(true)) => Ok(()),
				Ok(Ok(false)) => Err(RefreshError::Rejected),
				Ok(Err(e)) => Err(e),
				Err(payload) => Err(RefreshError::failed(RefresherPanicked::from_payload(payload))),
			};
			let settled_at = OffsetDateTime::now_utc();
			let waiters = self.flight.complete(wave);
			let kind = WaveOutcomeKind::of(&outcome);

			self.metrics.record_wave(kind);
			obs::record_wave_outcome(kind);

			*self.last_wave.lock() =
				Some(WaveSummary { wave, waiters: waiters.len(), outcome: kind, started_at, settled_at });

			match &outcome {
				Ok(()) => {
					self.fire_hook(wave, "success", || self.config.handlers.success());
					obs::emit(RenewalEvent::RefreshSucceeded { wave, waiters: waiters.len() }, silent);

					let replays = waiters
						.into_iter()
						.enumerate()
						.map(|(position, waiter)| self.replay(wave, position, waiter));

					future::join_all(replays).await;
				},
				Err(error) => {
					self.fire_hook(wave, "failure", || self.config.handlers.failure(error));
					obs::emit(
						RenewalEvent::RefreshFailed { wave, waiters: waiters.len(), error },
						silent,
					);

					for waiter in waiters {
						let _ = waiter.settle.send(Err(Error::Refresh(error.clone())));
					}
				},
			}

			outcome
		})
		.await
	}

	async fn replay(&self, wave: WaveId, position: usize, waiter: Waiter<T>) {
		let Waiter { mut request, mut settle } = waiter;

		// Caller is gone.
		if settle.is_canceled() {
			return;
		}

		request.mark_retry();
		self.metrics.record_replay();
		obs::emit(RenewalEvent::Replaying { wave, position }, self.config.silent);

		let attempt = {
			let run = std::pin::pin!(self.attempt(&request));

			match future::select(run, settle.cancellation()).await {
				Either::Left((attempt, _)) => attempt,
				// The caller dropped its `execute` future mid-replay.
				Either::Right(((), _)) => return,
			}
		};
		let settlement = match attempt {
			None => Err(Error::Cancelled),
			Some(Ok(response)) => Ok(response),
			Some(Err(error)) =>
				if self.is_auth_failure(&error, true) {
					Err(self.break_loop(error))
				} else {
					Err(Error::Transport(error))
				},
		};

		let _ = settle.send(settlement);
	}

	/// Runs one transport attempt unless the request is already cancelled.
	async fn attempt(
		&self,
		request: &RequestContext<T::Request>,
	) -> Option<Result<T::Response, T::Error>> {
		let cancellation = request.cancellation();

		if cancellation.is_cancelled() {
			return None;
		}

		cancellation.run_until_cancelled(self.transport.run(request)).await
	}

	fn fire_hook(&self, wave: WaveId, hook: &'static str, call: impl FnOnce()) {
		if panic::catch_unwind(AssertUnwindSafe(call)).is_err() {
			obs::emit(RenewalEvent::HookPanicked { wave, hook }, self.config.silent);
		}
	}

	fn is_auth_failure(&self, error: &T::Error, retried: bool) -> bool {
		let auth = self.config.is_auth_failure(&error.failure_view());

		if auth {
			obs::emit(RenewalEvent::AuthFailure { retried, detail: error }, self.config.silent);
		} else {
			obs::emit(RenewalEvent::PassThrough { detail: error }, self.config.silent);
		}

		auth
	}

	fn break_loop(&self, error: T::Error) -> Error<T::Error> {
		self.metrics.record_loop_break();
		obs::emit(RenewalEvent::LoopBroken { detail: &error }, self.config.silent);

		Error::AuthFailedAfterRetry { source: error }
	}
}

struct Parked<'a, T>
where
	T: TransportAdapter,
{
	inner: &'a Arc<Inner<T>>,
	wave: WaveId,
	waiter: WaiterId,
}
impl<T> Drop for Parked<'_, T>
where
	T: TransportAdapter,
{
	fn drop(&mut self) {
		if self.inner.flight.withdraw(self.waiter).is_some() {
			self.inner.metrics.record_cancelled_waiter();
			obs::emit(
				RenewalEvent::WaiterCancelled { wave: self.wave, waiter: self.waiter },
				self.inner.config.silent,
			);
		}
	}
}

fn record_settlement<R, E>(result: &RenewalResult<R, E>, replayed: bool) {
	let outcome = match result {
		Ok(_) if replayed => RequestOutcome::Replayed,
		Ok(_) => RequestOutcome::Succeeded,
		Err(Error::Transport(_)) => RequestOutcome::TransportFailed,
		Err(Error::AuthFailedAfterRetry { .. }) => RequestOutcome::LoopBroken,
		Err(Error::Refresh(_)) => RequestOutcome::RefreshFailed,
		Err(Error::Cancelled) => RequestOutcome::Cancelled,
	};

	obs::record_request_outcome(outcome);
}
