//! Plain HTTP adapter over [`reqwest`].
//!
//! Every non-2xx response is reported as a failure carrying its status, so a `401` reaches the
//! classifier the same way it would through an axios-style response interceptor.

// crates.io
use reqwest::{
	Method, RequestBuilder,
	header::{HeaderMap, HeaderName, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	classify::{FailureDetails, FailureView},
	request::RequestContext,
	transport::{RequestSigner, TransportAdapter, TransportFuture},
};

/// Replayable description of an HTTP request.
#[derive(Clone, Debug)]
pub struct HttpRequest {
	/// Request method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Extra headers sent with every attempt.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl HttpRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// Shorthand for a `POST` request.
	pub fn post(url: Url) -> Self {
		Self::new(Method::POST, url)
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets a raw body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `value` as the JSON body and sets the content type.
	pub fn json<T>(mut self, value: &T) -> Result<Self, serde_json::Error>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(value)?);
		self.headers.insert(
			reqwest::header::CONTENT_TYPE,
			HeaderValue::from_static("application/json"),
		);

		Ok(self)
	}
}

/// Buffered HTTP response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Decodes the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
	where
		T: serde::de::DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
	}
}

/// Failures reported by [`HttpTransport`].
#[derive(Debug, ThisError)]
pub enum HttpTransportError {
	/// Server answered with a non-success status.
	#[error("Request failed with HTTP status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Response body, lossily decoded.
		body: String,
	},
	/// Network failure before a response was received.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Underlying reqwest failure.
		#[source]
		source: ReqwestError,
	},
	/// Request was cancelled by its caller.
	#[error("Request was cancelled.")]
	Cancelled,
}
impl FailureDetails for HttpTransportError {
	fn failure_view(&self) -> FailureView<'_> {
		match self {
			Self::Status { status, .. } => FailureView::status(*status),
			Self::Network { .. } | Self::Cancelled => FailureView::default(),
		}
	}
}
impl From<ReqwestError> for HttpTransportError {
	fn from(source: ReqwestError) -> Self {
		Self::Network { source }
	}
}

/// reqwest-backed [`TransportAdapter`] for plain HTTP calls.
#[derive(Clone, Default)]
pub struct HttpTransport {
	client: ReqwestClient,
	signer: Option<Arc<dyn RequestSigner<RequestBuilder>>>,
}
impl HttpTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, signer: None }
	}

	/// Signs every attempt (including replays) with `signer`.
	pub fn with_signer(mut self, signer: impl 'static + RequestSigner<RequestBuilder>) -> Self {
		self.signer = Some(Arc::new(signer));

		self
	}

	async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, HttpTransportError> {
		let mut builder = self
			.client
			.request(request.method.clone(), request.url.clone())
			.headers(request.headers.clone());

		if let Some(body) = &request.body {
			builder = builder.body(body.clone());
		}
		if let Some(signer) = &self.signer {
			builder = signer.sign(builder);
		}

		let response = builder.send().await?;
		let status = response.status();
		let headers = response.headers().to_owned();
		let body = response.bytes().await?.to_vec();

		if !status.is_success() {
			return Err(HttpTransportError::Status {
				status: status.as_u16(),
				body: String::from_utf8_lossy(&body).into_owned(),
			});
		}

		Ok(HttpResponse { status: status.as_u16(), headers, body })
	}
}
impl TransportAdapter for HttpTransport {
	type Error = HttpTransportError;
	type Request = HttpRequest;
	type Response = HttpResponse;

	fn run<'a>(
		&'a self,
		request: &'a RequestContext<Self::Request>,
	) -> TransportFuture<'a, Self::Response, Self::Error> {
		Box::pin(async move {
			request
				.cancellation()
				.run_until_cancelled(self.send(request.payload()))
				.await
				.unwrap_or(Err(HttpTransportError::Cancelled))
		})
	}
}
impl Debug for HttpTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpTransport").field("signed", &self.signer.is_some()).finish()
	}
}
