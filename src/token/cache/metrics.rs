// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for token cache lookups.
#[derive(Debug, Default)]
pub struct TokenCacheMetrics {
	hits: AtomicU64,
	fetches: AtomicU64,
	failures: AtomicU64,
}
impl TokenCacheMetrics {
	/// Returns the number of lookups served from the cache.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Returns the number of token endpoint calls that produced a cached token.
	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::Relaxed)
	}

	/// Returns the number of lookups that failed.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_fetch(&self) {
		self.fetches.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
