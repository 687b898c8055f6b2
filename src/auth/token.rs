//! Immutable token leases and the redacted secret wrapper.

pub mod secret;

pub use secret::TokenSecret;

// self
use crate::{_prelude::*, auth::Scope};

/// Immutable leased credential returned by the broker.
///
/// A refresh always produces a new `Token` value, never a mutation of an existing one.
/// The broker stops handing a token to new callers once its safety margin elapses, but a
/// caller already holding it may keep using it until [`expires_at`](Self::expires_at);
/// the margin exists precisely so a freshly returned token never expires mid-call.
/// Callers must not cache the token beyond that instant—re-calling
/// [`Broker::acquire`](crate::broker::Broker::acquire) is the only correct way to obtain
/// a later one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Bearer secret; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Scope the token was issued for.
	pub scope: Scope,
	/// Instant the broker installed the token.
	pub issued_at: OffsetDateTime,
	/// Absolute expiry instant derived from the issuer's grant.
	pub expires_at: OffsetDateTime,
}
impl Token {
	/// Assembles a token lease from its parts.
	pub fn new(
		secret: TokenSecret,
		scope: Scope,
		issued_at: OffsetDateTime,
		expires_at: OffsetDateTime,
	) -> Self {
		Self { secret, scope, issued_at, expires_at }
	}

	/// Returns `true` while `instant < expires_at - margin`.
	///
	/// A token that fails this check is stale: still usable by current holders, but the
	/// broker must not hand it to new callers.
	pub fn is_fresh_at(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		instant < self.expires_at - margin
	}

	/// Returns `true` once the token passed its true expiry instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Remaining lifetime at `instant`; negative once expired.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		self.expires_at - instant
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("secret", &"<redacted>")
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn lease() -> Token {
		Token::new(
			TokenSecret::new("bearer-value"),
			Scope::new("storage-read").expect("Scope fixture should be valid."),
			macros::datetime!(2026-01-01 00:00 UTC),
			macros::datetime!(2026-01-01 01:00 UTC),
		)
	}

	#[test]
	fn freshness_respects_the_margin() {
		let token = lease();
		let margin = Duration::minutes(5);

		assert!(token.is_fresh_at(macros::datetime!(2026-01-01 00:54 UTC), margin));
		// Exactly at expiry - margin the token is already stale.
		assert!(!token.is_fresh_at(macros::datetime!(2026-01-01 00:55 UTC), margin));
		// Stale is not expired; current holders may keep using it.
		assert!(!token.is_expired_at(macros::datetime!(2026-01-01 00:55 UTC)));
		assert!(token.is_expired_at(macros::datetime!(2026-01-01 01:00 UTC)));
	}

	#[test]
	fn remaining_lifetime_goes_negative() {
		let token = lease();

		assert_eq!(
			token.remaining_at(macros::datetime!(2026-01-01 00:30 UTC)),
			Duration::minutes(30)
		);
		assert_eq!(
			token.remaining_at(macros::datetime!(2026-01-01 01:10 UTC)),
			Duration::minutes(-10)
		);
	}

	#[test]
	fn debug_redacts_the_secret() {
		let rendered = format!("{:?}", lease());

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("bearer-value"));
	}
}
