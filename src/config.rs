//! Coordinator configuration: flag keys, classifier override, lifecycle hooks, log suppression.

// self
use crate::{
	_prelude::*,
	classify::{AuthClassifier, DefaultAuthClassifier, FailureView},
	request::FlagKeys,
};

/// Hook invoked without arguments (refresh start/success).
pub type LifecycleHook = Arc<dyn Fn() + Send + Sync>;
/// Hook invoked with the wave's refresh error.
pub type FailureHook = Arc<dyn Fn(&RefreshError) + Send + Sync>;

/// Refresh lifecycle hooks, each fired at most once per wave.
#[derive(Clone, Default)]
pub struct RenewalHandlers {
	start: Option<LifecycleHook>,
	success: Option<LifecycleHook>,
	failure: Option<FailureHook>,
}
impl RenewalHandlers {
	/// Runs right before the refresh operation is invoked.
	pub fn on_start(mut self, hook: impl 'static + Send + Sync + Fn()) -> Self {
		self.start = Some(Arc::new(hook));

		self
	}

	/// Runs after the refresh reported success.
	pub fn on_success(mut self, hook: impl 'static + Send + Sync + Fn()) -> Self {
		self.success = Some(Arc::new(hook));

		self
	}

	/// Runs after the refresh returned `false` or raised an error.
	pub fn on_failure(mut self, hook: impl 'static + Send + Sync + Fn(&RefreshError)) -> Self {
		self.failure = Some(Arc::new(hook));

		self
	}

	pub(crate) fn start(&self) {
		if let Some(hook) = &self.start {
			hook();
		}
	}

	pub(crate) fn success(&self) {
		if let Some(hook) = &self.success {
			hook();
		}
	}

	pub(crate) fn failure(&self, error: &RefreshError) {
		if let Some(hook) = &self.failure {
			hook(error);
		}
	}
}
impl Debug for RenewalHandlers {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RenewalHandlers")
			.field("start", &self.start.is_some())
			.field("success", &self.success.is_some())
			.field("failure", &self.failure.is_some())
			.finish()
	}
}

/// Options recognized by [`RenewalCoordinator`](crate::RenewalCoordinator).
#[derive(Clone)]
pub struct RenewalConfig {
	/// Keys of the retry marker and bypass flag in a [`FlagMap`](crate::request::FlagMap).
	pub flag_keys: FlagKeys,
	/// Authorization-failure predicate.
	pub classifier: Arc<dyn AuthClassifier>,
	/// Refresh lifecycle hooks.
	pub handlers: RenewalHandlers,
	/// Suppresses diagnostic log events when `true`.
	pub silent: bool,
}
impl RenewalConfig {
	/// Replaces the flag keys.
	pub fn with_flag_keys(mut self, keys: FlagKeys) -> Self {
		self.flag_keys = keys;

		self
	}

	/// Replaces the authorization-failure predicate.
	pub fn with_classifier(mut self, classifier: impl 'static + AuthClassifier) -> Self {
		self.classifier = Arc::new(classifier);

		self
	}

	/// Replaces the lifecycle hooks.
	pub fn with_handlers(mut self, handlers: RenewalHandlers) -> Self {
		self.handlers = handlers;

		self
	}

	/// Enables or disables diagnostic logging.
	pub fn with_silent(mut self, silent: bool) -> Self {
		self.silent = silent;

		self
	}

	pub(crate) fn is_auth_failure(&self, failure: &FailureView<'_>) -> bool {
		self.classifier.is_auth_failure(failure)
	}
}
impl Default for RenewalConfig {
	fn default() -> Self {
		Self {
			flag_keys: FlagKeys::default(),
			classifier: Arc::new(DefaultAuthClassifier),
			handlers: RenewalHandlers::default(),
			silent: false,
		}
	}
}
impl Debug for RenewalConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RenewalConfig")
			.field("flag_keys", &self.flag_keys)
			.field("handlers", &self.handlers)
			.field("silent", &self.silent)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	#[test]
	fn default_config_uses_baseline_policy() {
		let config = RenewalConfig::default();

		assert!(config.is_auth_failure(&FailureView::status(401)));
		assert!(!config.is_auth_failure(&FailureView::status(403)));
		assert_eq!(config.flag_keys, FlagKeys::default());
		assert!(!config.silent);
	}

	#[test]
	fn classifier_override_replaces_baseline() {
		let config = RenewalConfig::default()
			.with_classifier(|failure: &FailureView<'_>| failure.status == Some(419))
			.with_silent(true);

		assert!(config.is_auth_failure(&FailureView::status(419)));
		assert!(!config.is_auth_failure(&FailureView::status(401)));
		assert!(config.silent);
	}

	#[test]
	fn handlers_fire_only_when_set() {
		let calls = Arc::new(AtomicUsize::new(0));
		let failures = Arc::new(AtomicUsize::new(0));
		let handlers = RenewalHandlers::default()
			.on_start({
				let calls = calls.clone();

				move || {
					calls.fetch_add(1, Ordering::SeqCst);
				}
			})
			.on_failure({
				let failures = failures.clone();

				move |err: &RefreshError| {
					assert!(matches!(err, RefreshError::Rejected));
					failures.fetch_add(1, Ordering::SeqCst);
				}
			});

		handlers.start();
		handlers.success();
		handlers.failure(&RefreshError::Rejected);

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(failures.load(Ordering::SeqCst), 1);
		assert_eq!(
			format!("{handlers:?}"),
			"RenewalHandlers { start: true, success: false, failure: true }"
		);
	}
}
