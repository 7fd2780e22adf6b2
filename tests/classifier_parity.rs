#![cfg(feature = "reqwest")]

// self
use token_renewal::{
	classify::{
		AuthClassifier, DefaultAuthClassifier, ErrorEntry, FailureDetails, UNAUTHENTICATED_CODE,
	},
	transport::{graphql::GraphQlTransportError, http::HttpTransportError},
};

fn is_auth(error: &impl FailureDetails) -> bool {
	DefaultAuthClassifier.is_auth_failure(&error.failure_view())
}

fn operation(entry: ErrorEntry) -> GraphQlTransportError {
	GraphQlTransportError::Operation { entries: vec![entry] }
}

#[test]
fn both_adapters_agree_on_a_401() {
	let http = HttpTransportError::Status { status: 401, body: String::new() };
	let graphql = GraphQlTransportError::Http { status: 401, entries: Vec::new() };

	assert!(is_auth(&http));
	assert!(is_auth(&graphql));
}

#[test]
fn both_adapters_agree_on_non_auth_statuses() {
	for status in [400, 403, 404, 500, 503] {
		let http = HttpTransportError::Status { status, body: String::new() };
		let graphql = GraphQlTransportError::Http { status, entries: Vec::new() };

		assert_eq!(is_auth(&http), is_auth(&graphql), "Adapters disagree on status {status}.");
		assert!(!is_auth(&http));
	}
}

#[test]
fn graphql_entries_follow_the_shared_policy() {
	assert!(is_auth(&operation(ErrorEntry::new("Session expired").with_code(UNAUTHENTICATED_CODE))));
	assert!(is_auth(&operation(ErrorEntry::new("Unauthorized: token expired"))));
	assert!(is_auth(&operation(ErrorEntry::new("UNAUTHENTICATED"))));
	assert!(!is_auth(&operation(ErrorEntry::new("unauthorized"))));
	assert!(!is_auth(&operation(ErrorEntry::new("Not allowed").with_code("FORBIDDEN"))));
}
