//! Optional observability helpers for broker flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `factus_broker.flow` with the `flow`
//!   (operation) and `stage` (call site) fields, plus `debug` events for cache reuse and
//!   renewals and `warn` events for failures.
//! - Enable `metrics` to increment the `factus_broker_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, and
//!   `factus_broker_flow_errors_total` for failures, labeled by `flow` + `error` class.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Broker operations observed by the spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Cached token evaluation and renewal.
	EnsureToken,
	/// Invoice preview or submission.
	CreateInvoice,
	/// Single invoice lookup.
	GetInvoiceStatus,
	/// Filtered invoice listing.
	ListInvoices,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::EnsureToken => "ensure_token",
			FlowKind::CreateInvoice => "create_invoice",
			FlowKind::GetInvoiceStatus => "get_invoice_status",
			FlowKind::ListInvoices => "list_invoices",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a broker helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
