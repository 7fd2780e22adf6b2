//! Demonstrates plugging a non-HTTP transport into the coordinator.
//!
//! 1. Implement [`TransportAdapter`] for the transport and [`FailureDetails`] for its error type.
//! 2. Teach the coordinator which failures mean "credential expired" with a classifier override.
//! 3. Fire several calls at once against an expired session and watch a single renewal serve all
//!    of them, while a cancelled call drops out without disturbing the rest.

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	time::Duration,
};
// crates.io
use color_eyre::Result;
use thiserror::Error as ThisError;
// self
use token_renewal::{
	RenewalCoordinator,
	cancel::CancelSignal,
	classify::{ErrorEntry, FailureDetails, FailureView},
	config::{RenewalConfig, RenewalHandlers},
	request::RequestContext,
	transport::{TransportAdapter, TransportFuture},
};

const SESSION_EXPIRED: &str = "SESSION_EXPIRED";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let ledger = Arc::new(Ledger::default());

	// The server rotated its session; the client still holds the previous one.
	ledger.server_session.fetch_add(1, Ordering::SeqCst);

	let refresher = {
		let ledger = ledger.clone();

		move || {
			let ledger = ledger.clone();

			async move {
				tokio::time::sleep(Duration::from_millis(50)).await;
				ledger
					.client_session
					.store(ledger.server_session.load(Ordering::SeqCst), Ordering::SeqCst);

				true
			}
		}
	};
	let config = RenewalConfig::default()
		.with_classifier(|failure: &FailureView<'_>| {
			failure.entries.iter().any(|entry| entry.code.as_deref() == Some(SESSION_EXPIRED))
		})
		.with_handlers(
			RenewalHandlers::default()
				.on_start(|| println!("Renewing the ledger session."))
				.on_success(|| println!("Ledger session renewed.")),
		);
	let coordinator =
		RenewalCoordinator::with_config(LedgerTransport(ledger.clone()), refresher, config);
	let abandoned = CancelSignal::new();
	let (alice, bob, carol, ()) = tokio::join!(
		coordinator.execute(coordinator.context(Balance("alice"))),
		coordinator.execute(coordinator.context(Balance("bob")).with_cancellation(abandoned.clone())),
		coordinator.execute(coordinator.context(Balance("carol"))),
		async {
			tokio::time::sleep(Duration::from_millis(20)).await;
			abandoned.cancel();
		},
	);

	println!("alice: {}", alice?);
	println!("carol: {}", carol?);

	match bob {
		Ok(balance) => println!("bob unexpectedly completed with {balance}."),
		Err(e) => println!("bob gave up: {e}"),
	}

	let metrics = coordinator.metrics();

	println!(
		"Refresh calls: {}, replays: {}, cancelled waiters: {}.",
		metrics.refresh_calls(),
		metrics.replays(),
		metrics.cancelled_waiters(),
	);

	if let Some(summary) = coordinator.last_wave() {
		println!(
			"Last wave {} settled as {} with {} waiter(s).",
			summary.wave, summary.outcome, summary.waiters
		);
	}

	Ok(())
}

#[derive(Debug, Default)]
struct Ledger {
	server_session: AtomicU64,
	client_session: AtomicU64,
}

#[derive(Debug)]
struct Balance(&'static str);

#[derive(Debug, ThisError)]
#[error("Ledger call failed: {}.", .0.message)]
struct LedgerError(ErrorEntry);
impl FailureDetails for LedgerError {
	fn failure_view(&self) -> FailureView<'_> {
		FailureView::entries(std::slice::from_ref(&self.0))
	}
}

struct LedgerTransport(Arc<Ledger>);
impl TransportAdapter for LedgerTransport {
	type Error = LedgerError;
	type Request = Balance;
	type Response = u64;

	fn run<'a>(
		&'a self,
		request: &'a RequestContext<Self::Request>,
	) -> TransportFuture<'a, Self::Response, Self::Error> {
		Box::pin(async move {
			let ledger = &self.0;
			let call = tokio::time::sleep(Duration::from_millis(10));

			if request.cancellation().run_until_cancelled(call).await.is_none() {
				return Err(LedgerError(ErrorEntry::new("Call was abandoned.")));
			}
			if ledger.client_session.load(Ordering::SeqCst)
				!= ledger.server_session.load(Ordering::SeqCst)
			{
				return Err(LedgerError(
					ErrorEntry::new("Session is no longer valid.").with_code(SESSION_EXPIRED),
				));
			}

			Ok(request.payload().0.len() as u64 * 100)
		})
	}
}
