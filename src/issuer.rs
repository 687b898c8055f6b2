//! Token issuing authority contract consumed by the broker.

#[cfg(feature = "reqwest")] pub mod http;
#[cfg(feature = "reqwest")] pub use http::HttpTokenIssuer;

// self
use crate::{
	_prelude::*,
	auth::{Scope, TokenSecret},
	source::Assertion,
};

/// Successful exchange payload: the bearer value plus its relative lifetime.
///
/// The lifetime is relative so the broker can stamp absolute instants from its own
/// clock, keeping freshness checks immune to issuer clock skew.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
	/// Bearer value minted by the authority.
	pub value: TokenSecret,
	/// Lifetime granted to the token, relative to the exchange instant.
	pub expires_in: Duration,
}

/// Failure modes reported by a token issuing authority.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ExchangeError {
	/// Authoritative rejection: revoked grant, unknown scope, or a bad assertion.
	#[error("Issuer rejected the exchange: {reason}.")]
	Rejected {
		/// Issuer-supplied reason string.
		reason: String,
	},
	/// Transient failure: network, 5xx, rate limiting, or a malformed response.
	#[error("Issuer is unavailable: {reason}.")]
	Unavailable {
		/// Issuer- or transport-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}
impl ExchangeError {
	/// Builds an [`Unavailable`](Self::Unavailable) error carrying only a reason.
	pub fn unavailable(reason: impl Into<String>) -> Self {
		Self::Unavailable { reason: reason.into(), status: None, retry_after: None }
	}
}
impl From<ExchangeError> for Error {
	fn from(e: ExchangeError) -> Self {
		match e {
			ExchangeError::Rejected { reason } => Self::Unauthorized { reason },
			ExchangeError::Unavailable { reason, status, retry_after } =>
				Self::IssuerUnavailable { reason, status, retry_after },
		}
	}
}

/// Boxed future returned by [`TokenIssuer::exchange`].
pub type ExchangeFuture<'a> =
	Pin<Box<dyn Future<Output = Result<IssuedToken, ExchangeError>> + 'a + Send>>;

/// Exchanges a proof-of-identity assertion for a scope-bound access token.
///
/// Implementations are external collaborators (the broker never interprets the assertion
/// beyond passing it through) and must be safe to share across concurrent refresh rounds
/// for disjoint cache keys.
pub trait TokenIssuer
where
	Self: Send + Sync,
{
	/// Presents `assertion` to the authority, requesting a token valid for `scope`.
	fn exchange<'a>(&'a self, assertion: &'a Assertion, scope: &'a Scope) -> ExchangeFuture<'a>;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn exchange_errors_map_into_broker_taxonomy() {
		let rejected: Error = ExchangeError::Rejected { reason: "grant revoked".into() }.into();

		assert!(matches!(rejected, Error::Unauthorized { .. }));

		let unavailable: Error = ExchangeError::Unavailable {
			reason: "HTTP 503".into(),
			status: Some(503),
			retry_after: Some(Duration::seconds(7)),
		}
		.into();

		assert!(unavailable.is_transient());
		assert!(matches!(
			unavailable,
			Error::IssuerUnavailable { status: Some(503), retry_after: Some(_), .. }
		));
	}
}
