//! Demonstrates renewing a bearer token for a plain HTTP client.
//!
//! An in-process mock server rejects the stale token with `401` and accepts the rotated one. The
//! coordinator routes the three concurrent `401`s into one refresh call, installs the new token
//! through the refresher, and replays each request once.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use parking_lot::Mutex;
// self
use token_renewal::{
	RenewalCoordinator,
	refresh::{CredentialRefresher, EndpointRefresher},
	reqwest::RequestBuilder,
	transport::{HttpRequest, HttpTransport},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/orders").header("authorization", "Bearer stale");
			then.status(401).body("token expired");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/orders").header("authorization", "Bearer rotated");
			then.status(200).header("content-type", "application/json").body(r#"[1,2,3]"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.delay(Duration::from_millis(100))
				.body(r#"{"success":true}"#);
		})
		.await;

	let token = Arc::new(Mutex::new(String::from("stale")));
	let transport = HttpTransport::default().with_signer({
		let token = token.clone();

		move |builder: RequestBuilder| builder.bearer_auth(token.lock().as_str())
	});
	let endpoint = EndpointRefresher::new(Url::parse(&server.url("/auth/refresh"))?);
	let refresher = {
		let token = token.clone();

		move || {
			let endpoint = endpoint.clone();
			let token = token.clone();

			async move {
				let renewed = endpoint.refresh().await.unwrap_or(false);

				if renewed {
					*token.lock() = "rotated".into();
				}

				renewed
			}
		}
	};
	let coordinator = RenewalCoordinator::new(transport, refresher);
	let orders = Url::parse(&server.url("/orders"))?;
	let request = || coordinator.context(HttpRequest::get(orders.clone()));
	let (first, second, third) = tokio::join!(
		coordinator.execute(request()),
		coordinator.execute(request()),
		coordinator.execute(request()),
	);

	for response in [first?, second?, third?] {
		println!("HTTP {}: {:?}", response.status, response.json::<Vec<u32>>()?);
	}

	println!(
		"Refresh calls: {}, replays: {}.",
		coordinator.metrics().refresh_calls(),
		coordinator.metrics().replays()
	);

	Ok(())
}
