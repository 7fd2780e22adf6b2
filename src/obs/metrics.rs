// self
use crate::obs::{RequestOutcome, WaveOutcomeKind};

/// Records a settled call via the global metrics recorder (when enabled).
pub fn record_request_outcome(outcome: RequestOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("token_renewal_request_total", "outcome" => outcome.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

/// Records a settled wave via the global metrics recorder (when enabled).
pub fn record_wave_outcome(outcome: WaveOutcomeKind) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("token_renewal_wave_total", "outcome" => outcome.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}
