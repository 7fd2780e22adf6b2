//! GraphQL-over-HTTP adapter over [`reqwest`].
//!
//! A response whose `errors` array is non-empty is a failure carrying one [`ErrorEntry`] per
//! error (`message` plus `extensions.code`). A non-2xx status is a failure carrying the status and
//! whatever error entries the body contained.

// crates.io
use reqwest::RequestBuilder;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	classify::{ErrorEntry, FailureDetails, FailureView},
	request::RequestContext,
	transport::{RequestSigner, TransportAdapter, TransportFuture},
};

/// GraphQL operation sent as the JSON request body.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlOperation {
	/// Query or mutation document.
	pub query: String,
	/// Operation variables; omitted when `null`.
	#[serde(skip_serializing_if = "Value::is_null")]
	pub variables: Value,
	/// Operation name for multi-operation documents.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub operation_name: Option<String>,
}
impl GraphQlOperation {
	/// Creates an operation without variables.
	pub fn new(query: impl Into<String>) -> Self {
		Self { query: query.into(), variables: Value::Null, operation_name: None }
	}

	/// Sets the operation variables.
	pub fn with_variables(mut self, variables: Value) -> Self {
		self.variables = variables;

		self
	}

	/// Sets the operation name.
	pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
		self.operation_name = Some(name.into());

		self
	}
}

/// Successful GraphQL result.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphQlResponse {
	/// The `data` member of the response (`null` when absent).
	pub data: Value,
}

#[derive(Debug, Deserialize)]
struct Envelope {
	#[serde(default)]
	data: Value,
	#[serde(default)]
	errors: Vec<RawError>,
}

#[derive(Debug, Deserialize)]
struct RawError {
	#[serde(default)]
	message: String,
	#[serde(default)]
	extensions: Option<RawExtensions>,
}

#[derive(Debug, Deserialize)]
struct RawExtensions {
	#[serde(default)]
	code: Option<String>,
}

impl From<RawError> for ErrorEntry {
	fn from(raw: RawError) -> Self {
		Self { code: raw.extensions.and_then(|ext| ext.code), message: raw.message }
	}
}

/// Failures reported by [`GraphQlTransport`].
#[derive(Debug, ThisError)]
pub enum GraphQlTransportError {
	/// Endpoint answered with a non-success status.
	#[error("GraphQL endpoint returned HTTP status {status}.")]
	Http {
		/// HTTP status code.
		status: u16,
		/// Error entries found in the body, if it was a GraphQL response.
		entries: Vec<ErrorEntry>,
	},
	/// Operation executed but the response carried errors.
	#[error("GraphQL operation failed: {}.", join_messages(.entries))]
	Operation {
		/// Reported errors, in response order.
		entries: Vec<ErrorEntry>,
	},
	/// A 2xx response body could not be decoded.
	#[error("GraphQL endpoint returned a malformed response.")]
	Decode {
		/// HTTP status code.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Network failure before a response was received.
	#[error("Network error occurred while calling the GraphQL endpoint.")]
	Network {
		/// Underlying reqwest failure.
		#[source]
		source: ReqwestError,
	},
	/// Request was cancelled by its caller.
	#[error("Request was cancelled.")]
	Cancelled,
}
impl FailureDetails for GraphQlTransportError {
	fn failure_view(&self) -> FailureView<'_> {
		match self {
			Self::Http { status, entries } => FailureView { status: Some(*status), entries },
			Self::Operation { entries } => FailureView::entries(entries),
			Self::Decode { status, .. } => FailureView::status(*status),
			Self::Network { .. } | Self::Cancelled => FailureView::default(),
		}
	}
}
impl From<ReqwestError> for GraphQlTransportError {
	fn from(source: ReqwestError) -> Self {
		Self::Network { source }
	}
}

fn join_messages(entries: &[ErrorEntry]) -> String {
	entries.iter().map(|entry| entry.message.as_str()).collect::<Vec<_>>().join(", ")
}

fn decode(body: &[u8]) -> Result<Envelope, serde_path_to_error::Error<serde_json::Error>> {
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de)
}

/// reqwest-backed [`TransportAdapter`] posting GraphQL operations to one endpoint.
#[derive(Clone)]
pub struct GraphQlTransport {
	client: ReqwestClient,
	endpoint: Url,
	signer: Option<Arc<dyn RequestSigner<RequestBuilder>>>,
}
impl GraphQlTransport {
	/// Creates an adapter with a default client.
	pub fn new(endpoint: Url) -> Self {
		Self::with_client(ReqwestClient::default(), endpoint)
	}

	/// Creates an adapter reusing an existing client.
	pub fn with_client(client: ReqwestClient, endpoint: Url) -> Self {
		Self { client, endpoint, signer: None }
	}

	/// Signs every attempt (including replays) with `signer`.
	pub fn with_signer(mut self, signer: impl 'static + RequestSigner<RequestBuilder>) -> Self {
		self.signer = Some(Arc::new(signer));

		self
	}

	/// GraphQL endpoint.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	async fn send(
		&self,
		operation: &GraphQlOperation,
	) -> Result<GraphQlResponse, GraphQlTransportError> {
		let mut builder = self.client.post(self.endpoint.clone()).json(operation);

		if let Some(signer) = &self.signer {
			builder = signer.sign(builder);
		}

		let response = builder.send().await?;
		let status = response.status();
		let body = response.bytes().await?;

		if !status.is_success() {
			let entries: Vec<ErrorEntry> = decode(&body)
				.map(|envelope| envelope.errors.into_iter().map(ErrorEntry::from).collect())
				.unwrap_or_default();

			return Err(GraphQlTransportError::Http { status: status.as_u16(), entries });
		}

		let envelope = decode(&body)
			.map_err(|source| GraphQlTransportError::Decode { status: status.as_u16(), source })?;

		if !envelope.errors.is_empty() {
			return Err(GraphQlTransportError::Operation {
				entries: envelope.errors.into_iter().map(ErrorEntry::from).collect(),
			});
		}

		Ok(GraphQlResponse { data: envelope.data })
	}
}
impl TransportAdapter for GraphQlTransport {
	type Error = GraphQlTransportError;
	type Request = GraphQlOperation;
	type Response = GraphQlResponse;

	fn run<'a>(
		&'a self,
		request: &'a RequestContext<Self::Request>,
	) -> TransportFuture<'a, Self::Response, Self::Error> {
		Box::pin(async move {
			request
				.cancellation()
				.run_until_cancelled(self.send(request.payload()))
				.await
				.unwrap_or(Err(GraphQlTransportError::Cancelled))
		})
	}
}
impl Debug for GraphQlTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GraphQlTransport")
			.field("endpoint", &self.endpoint.as_str())
			.field("signed", &self.signer.is_some())
			.finish()
	}
}
