//! Credential refresh contract consumed by the coordinator.
//!
//! The coordinator treats the refresh as a black box: it calls
//! [`CredentialRefresher::refresh`] at most once per wave and only inspects the boolean outcome.
//! `Ok(false)` and `Err(_)` are both renewal failures; the former becomes
//! [`RefreshError::Rejected`].

// self
use crate::_prelude::*;

/// Boxed future returned by [`CredentialRefresher::refresh`].
pub type RefreshFuture<'a> = Pin<Box<dyn Future<Output = Result<bool, RefreshError>> + 'a + Send>>;

/// Renews the credential used by the transport.
pub trait CredentialRefresher
where
	Self: 'static + Send + Sync,
{
	/// Attempts one renewal. Returns `Ok(true)` on success.
	fn refresh(&self) -> RefreshFuture<'_>;
}
impl<F, Fut> CredentialRefresher for F
where
	F: 'static + Send + Sync + Fn() -> Fut,
	Fut: 'static + Send + Future<Output = bool>,
{
	fn refresh(&self) -> RefreshFuture<'_> {
		let fut = self();

		Box::pin(async move { Ok(fut.await) })
	}
}

#[cfg(feature = "reqwest")]
pub use endpoint::*;
#[cfg(feature = "reqwest")]
mod endpoint {
	// self
	use super::*;

	#[derive(Debug, Deserialize)]
	struct RefreshAck {
		#[serde(default)]
		success: bool,
	}

	/// Refreshes by `POST`ing to an endpoint that answers `{"success": bool}`.
	///
	/// The endpoint is expected to rotate the credential out-of-band (e.g., a `Set-Cookie`
	/// header), so the client should share its cookie store with the transport adapter.
	#[derive(Clone, Debug)]
	pub struct EndpointRefresher {
		client: ReqwestClient,
		endpoint: Url,
	}
	impl EndpointRefresher {
		/// Creates a refresher with a default client.
		pub fn new(endpoint: Url) -> Self {
			Self::with_client(ReqwestClient::default(), endpoint)
		}

		/// Creates a refresher reusing an existing client.
		pub fn with_client(client: ReqwestClient, endpoint: Url) -> Self {
			Self { client, endpoint }
		}

		/// Refresh endpoint.
		pub fn endpoint(&self) -> &Url {
			&self.endpoint
		}
	}
	impl CredentialRefresher for EndpointRefresher {
		fn refresh(&self) -> RefreshFuture<'_> {
			Box::pin(async move {
				let response = self
					.client
					.post(self.endpoint.clone())
					.send()
					.await
					.map_err(RefreshError::failed)?;
				let status = response.status();
				let body = response.bytes().await.map_err(RefreshError::failed)?;
				let mut de = serde_json::Deserializer::from_slice(&body);

				match serde_path_to_error::deserialize::<_, RefreshAck>(&mut de) {
					Ok(ack) => Ok(ack.success && status.is_success()),
					Err(_) if !status.is_success() => Ok(false),
					Err(err) => Err(RefreshError::failed(err)),
				}
			})
		}
	}
}
