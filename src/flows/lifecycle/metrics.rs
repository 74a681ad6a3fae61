// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for lifecycle decisions.
#[derive(Debug, Default)]
pub struct LifecycleMetrics {
	cache_hits: AtomicU64,
	refreshes: AtomicU64,
	authorizations: AtomicU64,
	exchanges: AtomicU64,
	failures: AtomicU64,
}
impl LifecycleMetrics {
	/// Number of requests served from a still-valid cached record.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Number of successful refresh-token rotations.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Number of successful interactive authorizations (code exchanged).
	pub fn authorizations(&self) -> u64 {
		self.authorizations.load(Ordering::Relaxed)
	}

	/// Number of successful subject token exchanges.
	pub fn exchanges(&self) -> u64 {
		self.exchanges.load(Ordering::Relaxed)
	}

	/// Number of acquisitions that returned an error.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_authorization(&self) {
		self.authorizations.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_exchange(&self) {
		self.exchanges.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
