//! Transport-agnostic token renewal: single-flight credential refresh, FIFO waiter queues, and
//! cancellation-safe replay of requests that failed with an expired credential.
//!
//! Wrap any [`transport::TransportAdapter`] in a [`coordinator::RenewalCoordinator`] and route
//! every request through [`coordinator::RenewalCoordinator::execute`]. When a request fails with an
//! authorization error the coordinator parks it, refreshes the credential once for all concurrent
//! failures, and replays each parked request exactly once.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cancel;
pub mod classify;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod flight;
pub mod obs;
pub mod queue;
pub mod refresh;
pub mod request;
pub mod transport;

mod _prelude {
	pub use std::{
		collections::{HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	#[cfg(feature = "reqwest")]
	pub use url::Url;

	pub use crate::error::{Error, RefreshError, RenewalResult};
}

pub use coordinator::RenewalCoordinator;
pub use error::{Error, RefreshError, RenewalResult};
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
