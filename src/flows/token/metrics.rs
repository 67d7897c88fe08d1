// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for token evaluations.
#[derive(Debug, Default)]
pub struct RenewalMetrics {
	attempts: AtomicU64,
	reuses: AtomicU64,
	renewals: AtomicU64,
	failures: AtomicU64,
}
impl RenewalMetrics {
	/// Returns the total number of token evaluations.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns how many evaluations reused the cached token without a network call.
	pub fn reuses(&self) -> u64 {
		self.reuses.load(Ordering::Relaxed)
	}

	/// Returns how many evaluations completed an authentication exchange.
	pub fn renewals(&self) -> u64 {
		self.renewals.load(Ordering::Relaxed)
	}

	/// Returns the number of failed evaluations.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_reuse(&self) {
		self.reuses.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_renewal(&self) {
		self.renewals.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
