//! Scope modeling for downstream resource permissions.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const SCOPE_MAX_LEN: usize = 256;

/// Errors emitted when validating a scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum ScopeError {
	/// Empty scopes are not allowed.
	#[error("Scope cannot be empty.")]
	Empty,
	/// Scopes cannot contain whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
	/// The scope exceeded the allowed character count.
	#[error("Scope exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Names the downstream resource or permission set a token is valid for.
///
/// One scope per downstream API (e.g., `storage-read`, `model-serving`). Scopes are
/// opaque to the broker beyond validation; the issuer decides what they mean. A
/// [`WorkloadId`](crate::auth::WorkloadId) plus a `Scope` form a cache key, and keys
/// carry no ordering between them.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Scope(String);
impl Scope {
	/// Creates a scope after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, ScopeError> {
		let view = value.as_ref();

		if view.is_empty() {
			return Err(ScopeError::Empty);
		}
		if view.chars().any(char::is_whitespace) {
			return Err(ScopeError::ContainsWhitespace { scope: view.to_owned() });
		}
		if view.len() > SCOPE_MAX_LEN {
			return Err(ScopeError::TooLong { max: SCOPE_MAX_LEN });
		}

		Ok(Self(view.to_owned()))
	}

	/// Returns the scope as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Deref for Scope {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for Scope {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for Scope {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<Scope> for String {
	fn from(value: Scope) -> Self {
		value.0
	}
}
impl TryFrom<String> for Scope {
	type Error = ScopeError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(&value)
	}
}
impl FromStr for Scope {
	type Err = ScopeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for Scope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Scope({})", self.0)
	}
}
impl Display for Scope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
