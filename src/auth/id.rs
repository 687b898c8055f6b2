//! Strongly typed workload identifiers.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! identifier {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				check_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				check_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (namespace, account).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (namespace, account).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (namespace, account).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

identifier! { NamespaceId, "Namespace component of a workload identity (e.g., a cluster namespace or resource group).", "Namespace" }
identifier! { AccountId, "Account component of a workload identity (e.g., a service account or client identifier).", "Account" }

/// Opaque reference to the calling workload.
///
/// A `WorkloadId` names who is asking for a token; it never carries credentials itself
/// and is immutable once constructed. Together with a [`Scope`](crate::auth::Scope) it
/// forms the broker's cache key.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadId {
	/// Namespace component.
	pub namespace: NamespaceId,
	/// Account component.
	pub account: AccountId,
}
impl WorkloadId {
	/// Builds an identity from already-validated components.
	pub fn new(namespace: NamespaceId, account: AccountId) -> Self {
		Self { namespace, account }
	}

	/// Validates and builds an identity from raw string components.
	pub fn parse(
		namespace: impl AsRef<str>,
		account: impl AsRef<str>,
	) -> Result<Self, IdentifierError> {
		Ok(Self { namespace: NamespaceId::new(namespace)?, account: AccountId::new(account)? })
	}
}
impl Debug for WorkloadId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "WorkloadId({}/{})", self.namespace, self.account)
	}
}
impl Display for WorkloadId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}/{}", self.namespace, self.account)
	}
}

fn check_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}
