//! Per-key cache entry state and refresh-round bookkeeping.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use async_lock::MutexGuard;
// self
use crate::{_prelude::*, auth::Token};

/// Cache entry owning the current token and the refresh coordination state for one
/// (identity, scope) key.
///
/// The async `refresh` mutex is the leader election: whoever holds it owns the in-flight
/// round for this key. The `rounds` counter lets a waiter tell whether a round completed
/// while it was suspended, so every follower of a failed round receives that round's
/// error instead of launching its own exchange.
pub(crate) struct Entry {
	/// Current token, if any; replaced wholesale by a round leader.
	token: RwLock<Option<Token>>,
	/// Serializes exchanges for this key.
	refresh: AsyncMutex<()>,
	/// Count of completed refresh rounds.
	rounds: AtomicU64,
	/// Error published by the most recent failed round, tagged with its round number.
	last_failure: Mutex<Option<(u64, Error)>>,
}
impl Entry {
	pub(crate) fn new() -> Self {
		Self {
			token: RwLock::new(None),
			refresh: AsyncMutex::new(()),
			rounds: AtomicU64::new(0),
			last_failure: Mutex::new(None),
		}
	}

	/// Returns the cached token when it is still fresh at `now`.
	pub(crate) fn fresh_token(&self, now: OffsetDateTime, margin: Duration) -> Option<Token> {
		self.token.read().as_ref().filter(|token| token.is_fresh_at(now, margin)).cloned()
	}

	/// Rounds completed so far; sampled before waiting for the refresh lock.
	pub(crate) fn observed_rounds(&self) -> u64 {
		self.rounds.load(Ordering::Acquire)
	}

	/// Error from a round that completed after `observed`, if that round failed.
	pub(crate) fn failure_since(&self, observed: u64) -> Option<Error> {
		self.last_failure
			.lock()
			.as_ref()
			.filter(|(round, _)| *round > observed)
			.map(|(_, error)| error.clone())
	}

	/// Waits for (and takes) leadership of this key's refresh round.
	pub(crate) async fn lead(&self) -> MutexGuard<'_, ()> {
		self.refresh.lock().await
	}

	/// Publishes a successful round: installs the token and clears stale failures.
	pub(crate) fn complete_success(&self, token: Token) {
		*self.token.write() = Some(token);
		*self.last_failure.lock() = None;
		self.rounds.fetch_add(1, Ordering::Release);
	}

	/// Publishes a failed round.
	///
	/// The previous token stays in place even when stale, so a later caller retries
	/// without rediscovering the key.
	pub(crate) fn complete_failure(&self, error: Error) {
		let completing = self.rounds.load(Ordering::Acquire) + 1;

		*self.last_failure.lock() = Some((completing, error));
		self.rounds.fetch_add(1, Ordering::Release);
	}

	/// Drops the cached token so the next acquire performs a fresh exchange.
	pub(crate) fn invalidate(&self) {
		*self.token.write() = None;
	}
}
impl Debug for Entry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Entry")
			.field("has_token", &self.token.read().is_some())
			.field("rounds", &self.rounds.load(Ordering::Relaxed))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::{Scope, TokenSecret};

	fn fixture_token() -> Token {
		Token::new(
			TokenSecret::new("bearer"),
			Scope::new("storage-read").expect("Scope fixture should be valid."),
			macros::datetime!(2026-01-01 00:00 UTC),
			macros::datetime!(2026-01-01 01:00 UTC),
		)
	}

	#[test]
	fn failure_is_scoped_to_rounds_after_the_observation() {
		let entry = Entry::new();
		let observed = entry.observed_rounds();

		entry.complete_failure(Error::unavailable("boom"));

		// A waiter from before the round sees the failure; a fresh caller does not.
		assert!(entry.failure_since(observed).is_some());
		assert!(entry.failure_since(entry.observed_rounds()).is_none());
	}

	#[test]
	fn success_clears_prior_failures_and_installs_the_token() {
		let entry = Entry::new();
		let observed = entry.observed_rounds();

		entry.complete_failure(Error::unavailable("boom"));
		entry.complete_success(fixture_token());

		assert!(entry.failure_since(observed).is_none());
		assert!(
			entry
				.fresh_token(macros::datetime!(2026-01-01 00:01 UTC), Duration::minutes(5))
				.is_some()
		);
	}

	#[test]
	fn invalidate_drops_the_token_but_keeps_the_entry() {
		let entry = Entry::new();

		entry.complete_success(fixture_token());
		entry.invalidate();

		assert!(
			entry
				.fresh_token(macros::datetime!(2026-01-01 00:01 UTC), Duration::minutes(5))
				.is_none()
		);
	}
}
