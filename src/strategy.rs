//! Credential strategies selected once at configuration time.
//!
//! Instead of a boolean flag branched on inside business logic, the choice between a
//! platform-verified identity and a pre-shared key is a tagged variant wired into the
//! broker when the process starts.

// self
use crate::{
	_prelude::*,
	auth::{Scope, TokenSecret},
	issuer::{IssuedToken, TokenIssuer},
	source::IdentitySource,
};

/// How the broker obtains bearer material for a refresh round.
pub enum CredentialStrategy {
	/// Platform-verified identity: fetch an assertion, then exchange it with the issuer.
	ManagedIdentity {
		/// Proof-of-identity source (possibly a [`SourceChain`](crate::source::SourceChain)).
		source: Arc<dyn IdentitySource>,
		/// Token issuing authority consulted for every exchange.
		issuer: Arc<dyn TokenIssuer>,
	},
	/// Pre-shared key minted locally as a fixed-lifetime token; no network involved.
	StaticKey {
		/// The pre-shared bearer value.
		key: TokenSecret,
		/// Lifetime stamped onto every minted token.
		lifetime: Duration,
	},
}
impl CredentialStrategy {
	/// Builds the managed-identity variant.
	pub fn managed(source: Arc<dyn IdentitySource>, issuer: Arc<dyn TokenIssuer>) -> Self {
		Self::ManagedIdentity { source, issuer }
	}

	/// Builds the static-key variant.
	pub fn static_key(key: impl Into<String>, lifetime: Duration) -> Self {
		Self::StaticKey { key: TokenSecret::new(key), lifetime }
	}

	/// Stable label used in instrumentation.
	pub fn label(&self) -> &'static str {
		match self {
			Self::ManagedIdentity { .. } => "managed_identity",
			Self::StaticKey { .. } => "static_key",
		}
	}

	/// Performs one acquisition round for `scope`.
	pub(crate) async fn mint(&self, scope: &Scope) -> Result<IssuedToken> {
		match self {
			Self::ManagedIdentity { source, issuer } => {
				let assertion = source.assertion().await?;

				Ok(issuer.exchange(&assertion, scope).await?)
			},
			Self::StaticKey { key, lifetime } =>
				Ok(IssuedToken { value: key.clone(), expires_in: *lifetime }),
		}
	}
}
impl Debug for CredentialStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::ManagedIdentity { source, .. } => f
				.debug_struct("CredentialStrategy::ManagedIdentity")
				.field("source", &source.label())
				.finish(),
			Self::StaticKey { lifetime, .. } => f
				.debug_struct("CredentialStrategy::StaticKey")
				.field("key", &"<redacted>")
				.field("lifetime", lifetime)
				.finish(),
		}
	}
}
