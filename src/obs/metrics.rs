// self
use crate::{
	_prelude::*,
	obs::{FlowKind, FlowOutcome},
};

/// Records a flow outcome on `factus_broker_flow_total` (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"factus_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a failed flow: the `failure` outcome plus
/// `factus_broker_flow_errors_total{flow, error}` labeled by [`error_label`].
pub fn record_flow_failure(kind: FlowKind, error: &Error) {
	record_flow_outcome(kind, FlowOutcome::Failure);

	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"factus_broker_flow_errors_total",
			"flow" => kind.as_str(),
			"error" => error_label(error)
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = error;
	}
}

/// Stable label for the error class.
pub fn error_label(error: &Error) -> &'static str {
	match error {
		Error::Authentication { .. } => "authentication",
		Error::Upstream { .. } => "upstream",
		Error::UpstreamTimeout { .. } => "timeout",
		Error::NotFound { .. } => "not_found",
		Error::Validation(_) => "validation",
		Error::Transport(_) => "transport",
		Error::Config(_) => "config",
		Error::Cache(_) => "cache",
	}
}
