//! The credential broker: a per-key token cache with singleflight refresh.
//!
//! [`Broker::acquire`] looks up the cache entry for an (identity, scope) key. A fresh
//! token is returned immediately with no suspension and no I/O. On a miss or a stale
//! entry the first caller to take the key's refresh lock becomes the round leader: it
//! fetches a proof-of-identity assertion, presents it to the issuing authority, and
//! installs the resulting token. Every other caller for the same key suspends on that
//! lock and receives the leader's token or its error for the round, so the authority
//! sees at most one outstanding exchange per key regardless of caller fan-out. Refreshes
//! for different keys proceed in parallel; nothing orders them.

mod entry;
mod metrics;

pub use metrics::AcquireMetrics;

use entry::Entry;

// self
use crate::{
	_prelude::*,
	auth::{Scope, Token, WorkloadId},
	clock::{Clock, SystemClock},
	obs::{self, OpKind, OpOutcome, OpSpan},
	strategy::CredentialStrategy,
};

/// Default freshness margin subtracted from every token's expiry.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::minutes(5);
/// Default upper bound on one assertion-fetch + exchange round.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::seconds(10);

/// Cache key pairing a workload identity with one requested scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
	/// Identity component of the key.
	pub identity: WorkloadId,
	/// Scope component of the key.
	pub scope: Scope,
}
impl CacheKey {
	/// Builds a key from borrowed components.
	pub fn new(identity: &WorkloadId, scope: &Scope) -> Self {
		Self { identity: identity.clone(), scope: scope.clone() }
	}
}

/// Process-wide credential broker and token cache.
///
/// Construct one instance at startup and pass it explicitly (`Arc<Broker>`) to every
/// component that needs downstream tokens; the broker replaces ambient global credential
/// state. Cache entries are created on first request for a key and live until process
/// teardown or an explicit [`invalidate`](Self::invalidate).
///
/// The broker never retries an exchange internally and runs no background refresh loop.
/// Retry policy belongs to the caller, which knows whether it is serving an interactive
/// request or a background job; [`Error::is_transient`] tells the caller which failures
/// are worth a backoff.
pub struct Broker {
	strategy: CredentialStrategy,
	clock: Arc<dyn Clock>,
	safety_margin: Duration,
	exchange_timeout: Duration,
	entries: Mutex<HashMap<CacheKey, Arc<Entry>>>,
	metrics: Arc<AcquireMetrics>,
}
impl Broker {
	/// Creates a broker with the wall clock and default margin/timeout settings.
	pub fn new(strategy: CredentialStrategy) -> Self {
		Self {
			strategy,
			clock: Arc::new(SystemClock),
			safety_margin: DEFAULT_SAFETY_MARGIN,
			exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
			entries: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Overrides the freshness margin (negative values clamp to zero).
	///
	/// The margin is fixed per broker so concurrent callers near an expiry boundary
	/// agree on staleness instead of thrashing on clock skew.
	pub fn with_safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Overrides the per-round exchange deadline (negative values clamp to zero).
	pub fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
		self.exchange_timeout = if timeout.is_negative() { Duration::ZERO } else { timeout };

		self
	}

	/// Replaces the clock; tests install a [`ManualClock`](crate::clock::ManualClock).
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Shared acquire counters.
	pub fn metrics(&self) -> Arc<AcquireMetrics> {
		self.metrics.clone()
	}

	/// Returns a token guaranteed fresh at the instant of return.
	///
	/// A cache hit resolves immediately; otherwise the call joins (or leads) the key's
	/// refresh round as described in the module docs. On failure the prior cache state is
	/// left intact and the round's error is returned to the leader and every waiter;
	/// calling `acquire` again is the way to retry.
	///
	/// Cancelling a waiting caller affects nobody else. If the leader itself is cancelled
	/// mid-exchange, the refresh lock is released and the next waiter promotes itself to
	/// leader, so followers are never stranded.
	pub async fn acquire(&self, identity: &WorkloadId, scope: &Scope) -> Result<Token> {
		let span = OpSpan::new(OpKind::Acquire, "acquire");

		obs::record_op_outcome(OpKind::Acquire, OpOutcome::Attempt);

		let result = span.instrument(self.acquire_inner(identity, scope)).await;

		match &result {
			Ok(_) => obs::record_op_outcome(OpKind::Acquire, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(OpKind::Acquire, OpOutcome::Failure),
		}

		result
	}

	/// Revoked-permission signal: drops the cached token for the key so the next
	/// [`acquire`](Self::acquire) performs a fresh exchange.
	///
	/// The broker has no push channel for revocation. A token already handed out stays
	/// usable until its stated expiry (the downstream resource is the one that rejects
	/// it); this call merely stops the broker from serving the cached value to new
	/// callers. An in-flight round for the key is unaffected.
	pub fn invalidate(&self, identity: &WorkloadId, scope: &Scope) {
		let _guard = OpSpan::new(OpKind::Invalidate, "invalidate").entered();

		if let Some(entry) = self.entries.lock().get(&CacheKey::new(identity, scope)) {
			entry.invalidate();
		}

		obs::record_op_outcome(OpKind::Invalidate, OpOutcome::Success);
	}

	async fn acquire_inner(&self, identity: &WorkloadId, scope: &Scope) -> Result<Token> {
		let entry = self.entry(&CacheKey::new(identity, scope));

		// Fast path: a fresh token never suspends.
		if let Some(token) = entry.fresh_token(self.clock.now(), self.safety_margin) {
			self.metrics.record_hit();

			return Ok(token);
		}

		self.refresh(&entry, scope).await
	}

	async fn refresh(&self, entry: &Entry, scope: &Scope) -> Result<Token> {
		let observed = entry.observed_rounds();
		let _leadership = entry.lead().await;

		// Re-check under the lock: the leader of the round we waited on may already
		// have installed a fresh token.
		if let Some(token) = entry.fresh_token(self.clock.now(), self.safety_margin) {
			self.metrics.record_hit();

			return Ok(token);
		}
		// A round completed while we waited and failed; its error is ours too.
		if let Some(error) = entry.failure_since(observed) {
			self.metrics.record_failure();

			return Err(error);
		}

		// No round resolved our wait, so this caller leads one.
		self.metrics.record_exchange();
		obs::record_op_outcome(OpKind::Exchange, OpOutcome::Attempt);

		match self.exchange(scope).await {
			Ok(token) => {
				entry.complete_success(token.clone());
				obs::record_op_outcome(OpKind::Exchange, OpOutcome::Success);

				Ok(token)
			},
			Err(error) => {
				entry.complete_failure(error.clone());
				self.metrics.record_failure();
				obs::record_op_outcome(OpKind::Exchange, OpOutcome::Failure);

				Err(error)
			},
		}
	}

	async fn exchange(&self, scope: &Scope) -> Result<Token> {
		let deadline =
			std::time::Duration::try_from(self.exchange_timeout).unwrap_or_default();
		let issued = match tokio::time::timeout(deadline, self.strategy.mint(scope)).await {
			Ok(outcome) => outcome?,
			Err(_) =>
				return Err(Error::unavailable(format!(
					"exchange deadline of {} elapsed",
					self.exchange_timeout
				))),
		};

		if issued.expires_in <= self.safety_margin {
			return Err(Error::unavailable(format!(
				"issued token lifetime {} does not outlast the safety margin {}",
				issued.expires_in, self.safety_margin
			)));
		}

		let issued_at = self.clock.now();

		Ok(Token::new(issued.value, scope.clone(), issued_at, issued_at + issued.expires_in))
	}

	fn entry(&self, key: &CacheKey) -> Arc<Entry> {
		// The map lock is held only for the lookup; per-key refresh locks do the real
		// exclusion, so unrelated keys never contend.
		self.entries.lock().entry(key.clone()).or_insert_with(|| Arc::new(Entry::new())).clone()
	}
}
impl Debug for Broker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("strategy", &self.strategy.label())
			.field("safety_margin", &self.safety_margin)
			.field("exchange_timeout", &self.exchange_timeout)
			.field("entries", &self.entries.lock().len())
			.finish()
	}
}
