// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for acquire outcomes.
#[derive(Debug, Default)]
pub struct AcquireMetrics {
	hits: AtomicU64,
	exchanges: AtomicU64,
	failures: AtomicU64,
}
impl AcquireMetrics {
	/// Returns the number of acquires served from the cache without an exchange.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Returns the number of exchange rounds led against the issuing authority.
	pub fn exchanges(&self) -> u64 {
		self.exchanges.load(Ordering::Relaxed)
	}

	/// Returns the number of acquires that surfaced an error.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_exchange(&self) {
		self.exchanges.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
