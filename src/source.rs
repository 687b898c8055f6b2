//! Proof-of-identity sources supplying the signed assertion presented during exchanges.
//!
//! The broker treats every source as a black box with a single capability: produce the
//! assertion that identifies the calling workload. [`SourceChain`] replaces
//! environment-sniffing credential chains with an explicit ordered list—each candidate is
//! tried in sequence and the first one that succeeds is pinned for the process lifetime.

// std
use std::{
	path::{Path, PathBuf},
	sync::OnceLock,
};
// self
use crate::_prelude::*;

/// Signed proof-of-identity assertion.
///
/// Opaque to the broker; it is passed through to the issuer without interpretation and
/// redacted in all formatting output.
#[derive(Clone, PartialEq, Eq)]
pub struct Assertion(String);
impl Assertion {
	/// Wraps a raw assertion string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw assertion. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for Assertion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Assertion").field(&"<redacted>").finish()
	}
}
impl Display for Assertion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Failure modes for assertion acquisition.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SourceError {
	/// The source could not produce an assertion in the current environment.
	#[error("Proof-of-identity source is unavailable: {reason}.")]
	Unavailable {
		/// Source-supplied reason string.
		reason: String,
	},
}
impl SourceError {
	/// Builds an [`Unavailable`](Self::Unavailable) error from any reason.
	pub fn unavailable(reason: impl Into<String>) -> Self {
		Self::Unavailable { reason: reason.into() }
	}
}
impl From<SourceError> for Error {
	fn from(e: SourceError) -> Self {
		match e {
			SourceError::Unavailable { reason } => Self::IdentityUnverifiable { reason },
		}
	}
}

/// Boxed future returned by [`IdentitySource::assertion`].
pub type SourceFuture<'a> = Pin<Box<dyn Future<Output = Result<Assertion, SourceError>> + 'a + Send>>;

/// Supplier of the signed assertion identifying the calling workload.
pub trait IdentitySource
where
	Self: Send + Sync,
{
	/// Produces a fresh assertion, or reports why the environment cannot.
	fn assertion(&self) -> SourceFuture<'_>;

	/// Stable label used in error reasons and instrumentation.
	fn label(&self) -> &'static str;
}

/// Source backed by a fixed, pre-configured assertion value.
#[derive(Clone, Debug)]
pub struct StaticAssertionSource(Assertion);
impl StaticAssertionSource {
	/// Wraps a configured assertion.
	pub fn new(assertion: impl Into<String>) -> Self {
		Self(Assertion::new(assertion))
	}
}
impl IdentitySource for StaticAssertionSource {
	fn assertion(&self) -> SourceFuture<'_> {
		let assertion = self.0.clone();

		Box::pin(async move { Ok(assertion) })
	}

	fn label(&self) -> &'static str {
		"static"
	}
}

/// Source reading a platform-projected assertion file (e.g., a federated identity token
/// mounted into the workload).
///
/// The file is re-read on every call because platforms rotate the projected document in
/// place; trailing whitespace is stripped.
#[derive(Clone, Debug)]
pub struct FileAssertionSource {
	path: PathBuf,
}
impl FileAssertionSource {
	/// Creates a source reading from the provided path.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Path the source reads from.
	pub fn path(&self) -> &Path {
		&self.path
	}
}
impl IdentitySource for FileAssertionSource {
	fn assertion(&self) -> SourceFuture<'_> {
		Box::pin(async move {
			let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
				SourceError::unavailable(format!(
					"failed to read {}: {e}",
					self.path.display()
				))
			})?;
			let trimmed = raw.trim_end();

			if trimmed.is_empty() {
				return Err(SourceError::unavailable(format!(
					"assertion file {} is empty",
					self.path.display()
				)));
			}

			Ok(Assertion::new(trimmed))
		})
	}

	fn label(&self) -> &'static str {
		"file"
	}
}

/// Ordered list of identity sources tried in sequence.
///
/// The first source that succeeds is pinned and used exclusively for the rest of the
/// process lifetime; later failures of the pinned source surface as-is rather than
/// re-probing the list, so the selected strategy stays deterministic.
pub struct SourceChain {
	sources: Vec<Arc<dyn IdentitySource>>,
	pinned: OnceLock<usize>,
}
impl SourceChain {
	/// Builds a chain from an ordered list of candidates.
	pub fn new(sources: impl IntoIterator<Item = Arc<dyn IdentitySource>>) -> Self {
		Self { sources: sources.into_iter().collect(), pinned: OnceLock::new() }
	}

	/// Index of the pinned source, once one has succeeded.
	pub fn pinned_index(&self) -> Option<usize> {
		self.pinned.get().copied()
	}

	async fn probe(&self) -> Result<Assertion, SourceError> {
		let mut reasons = Vec::with_capacity(self.sources.len());

		for (index, source) in self.sources.iter().enumerate() {
			match source.assertion().await {
				Ok(assertion) => {
					// Another caller may have pinned concurrently; first write wins and
					// the assertion we already hold is still valid to return.
					let _ = self.pinned.set(index);

					return Ok(assertion);
				},
				Err(SourceError::Unavailable { reason }) =>
					reasons.push(format!("{}: {reason}", source.label())),
			}
		}

		if reasons.is_empty() {
			return Err(SourceError::unavailable("no identity sources are configured"));
		}

		Err(SourceError::unavailable(reasons.join("; ")))
	}
}
impl IdentitySource for SourceChain {
	fn assertion(&self) -> SourceFuture<'_> {
		Box::pin(async move {
			if let Some(index) = self.pinned.get() {
				return self.sources[*index].assertion().await;
			}

			self.probe().await
		})
	}

	fn label(&self) -> &'static str {
		"chain"
	}
}
impl Debug for SourceChain {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SourceChain")
			.field("sources", &self.sources.iter().map(|s| s.label()).collect::<Vec<_>>())
			.field("pinned", &self.pinned.get())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn assertion_formatters_redact() {
		let assertion = Assertion::new("signed-proof");

		assert_eq!(format!("{assertion:?}"), "Assertion(\"<redacted>\")");
		assert_eq!(format!("{assertion}"), "<redacted>");
	}

	#[tokio::test]
	async fn static_source_returns_configured_value() {
		let source = StaticAssertionSource::new("signed-proof");
		let assertion =
			source.assertion().await.expect("Static source should always produce an assertion.");

		assert_eq!(assertion.expose(), "signed-proof");
	}

	#[tokio::test]
	async fn empty_chain_reports_unavailable() {
		let chain = SourceChain::new([]);
		let err = chain.assertion().await.expect_err("Empty chain must fail.");

		assert!(matches!(err, SourceError::Unavailable { .. }));
	}

	#[tokio::test]
	async fn file_source_reports_missing_file() {
		let source = FileAssertionSource::new("/nonexistent/assertion-token");
		let err = source.assertion().await.expect_err("Missing file must fail.");
		let SourceError::Unavailable { reason } = err;

		assert!(reason.contains("/nonexistent/assertion-token"));
	}
}
