//! Broker error taxonomy shared across sources, issuers, and the cache core.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical broker error exposed by [`Broker::acquire`](crate::broker::Broker::acquire).
///
/// Every variant is cheaply cloneable so the leader of a refresh round can hand the same
/// failure to every caller that waited on it. The broker never retries internally; use
/// [`is_transient`](Self::is_transient) to decide whether a caller-side retry with backoff
/// is appropriate.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum Error {
	/// Caller-supplied identity or scope failed validation; not retryable as-is.
	#[error(transparent)]
	InvalidRequest(#[from] RequestError),
	/// The proof-of-identity source could not produce a valid assertion.
	///
	/// Usually an environment or configuration problem (e.g., the workload is not running
	/// in a trusted context); retryable once an operator fixes the environment.
	#[error("Workload identity could not be verified: {reason}.")]
	IdentityUnverifiable {
		/// Source-supplied reason string.
		reason: String,
	},
	/// The token issuing authority rejected the assertion for this scope.
	///
	/// Authoritative (e.g., permission was revoked); surface it to the caller's caller
	/// instead of retrying blindly.
	#[error("Issuer rejected the exchange for this scope: {reason}.")]
	Unauthorized {
		/// Issuer- or broker-supplied reason string.
		reason: String,
	},
	/// Transient issuer or transport failure; safe to retry with backoff at the
	/// application layer.
	#[error("Issuer is unavailable: {reason}.")]
	IssuerUnavailable {
		/// Issuer- or broker-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}
impl Error {
	/// Returns `true` when the failure is safe to retry with backoff.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::IssuerUnavailable { .. })
	}

	pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
		Self::IssuerUnavailable { reason: reason.into(), status: None, retry_after: None }
	}
}
impl From<crate::auth::IdentifierError> for Error {
	fn from(e: crate::auth::IdentifierError) -> Self {
		Self::InvalidRequest(e.into())
	}
}
impl From<crate::auth::ScopeError> for Error {
	fn from(e: crate::auth::ScopeError) -> Self {
		Self::InvalidRequest(e.into())
	}
}

/// Validation failures for caller-supplied request components.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RequestError {
	/// Identity component failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
	/// Scope failed validation.
	#[error(transparent)]
	Scope(#[from] crate::auth::ScopeError),
}
