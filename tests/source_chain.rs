// std
use std::{
	path::PathBuf,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
};
// self
use credential_broker::source::{
	Assertion, FileAssertionSource, IdentitySource, SourceChain, SourceError, SourceFuture,
};

/// Source double with a fixed outcome and a call counter.
struct ProbeSource {
	label: &'static str,
	calls: AtomicU64,
	outcome: Result<&'static str, &'static str>,
}
impl ProbeSource {
	fn succeeding(label: &'static str, assertion: &'static str) -> Arc<Self> {
		Arc::new(Self { label, calls: AtomicU64::new(0), outcome: Ok(assertion) })
	}

	fn failing(label: &'static str, reason: &'static str) -> Arc<Self> {
		Arc::new(Self { label, calls: AtomicU64::new(0), outcome: Err(reason) })
	}

	fn calls(&self) -> u64 {
		self.calls.load(Ordering::SeqCst)
	}
}
impl IdentitySource for ProbeSource {
	fn assertion(&self) -> SourceFuture<'_> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let outcome = self.outcome;

		Box::pin(async move {
			match outcome {
				Ok(assertion) => Ok(Assertion::new(assertion)),
				Err(reason) => Err(SourceError::unavailable(reason)),
			}
		})
	}

	fn label(&self) -> &'static str {
		self.label
	}
}

#[tokio::test]
async fn chain_pins_the_first_successful_source() {
	let platform = ProbeSource::failing("platform", "no projected token");
	let file = ProbeSource::succeeding("file", "file-assertion");
	let fallback = ProbeSource::succeeding("fallback", "fallback-assertion");
	let chain = SourceChain::new([
		platform.clone() as Arc<dyn IdentitySource>,
		file.clone() as Arc<dyn IdentitySource>,
		fallback.clone() as Arc<dyn IdentitySource>,
	]);
	let first = chain.assertion().await.expect("Chain with a working source should succeed.");

	assert_eq!(first.expose(), "file-assertion");
	assert_eq!(chain.pinned_index(), Some(1));
	assert_eq!(fallback.calls(), 0, "Probing must stop at the first success.");

	let second = chain.assertion().await.expect("Pinned source should keep succeeding.");

	assert_eq!(second.expose(), "file-assertion");
	assert_eq!(platform.calls(), 1, "Earlier sources are not re-probed once pinned.");
	assert_eq!(file.calls(), 2);
}

#[tokio::test]
async fn pinned_source_failures_surface_without_reprobing() {
	let flaky = ProbeSource::succeeding("flaky", "assertion");
	let backup = ProbeSource::succeeding("backup", "backup-assertion");
	let chain = SourceChain::new([
		flaky.clone() as Arc<dyn IdentitySource>,
		backup.clone() as Arc<dyn IdentitySource>,
	]);

	chain.assertion().await.expect("First probe should pin the flaky source.");

	assert_eq!(chain.pinned_index(), Some(0));
	// The pin is for the process lifetime; the backup stays untouched even
	// across further calls.
	chain.assertion().await.expect("Pinned source should be used directly.");

	assert_eq!(backup.calls(), 0);
}

#[tokio::test]
async fn chain_aggregates_every_failure_reason() {
	let platform = ProbeSource::failing("platform", "no projected token");
	let env = ProbeSource::failing("env", "variable unset");
	let chain = SourceChain::new([
		platform as Arc<dyn IdentitySource>,
		env as Arc<dyn IdentitySource>,
	]);
	let SourceError::Unavailable { reason } =
		chain.assertion().await.expect_err("Chain of failing sources must fail.");

	assert!(reason.contains("platform: no projected token"));
	assert!(reason.contains("env: variable unset"));
	assert_eq!(chain.pinned_index(), None);
}

/// Fixture file with a process-unique name, removed even when an assertion fails.
struct FixtureFile(PathBuf);
impl FixtureFile {
	fn new(name: &str, contents: &str) -> Self {
		let path =
			std::env::temp_dir().join(format!("credential-broker-{name}-{}", std::process::id()));

		std::fs::write(&path, contents).expect("Test fixture file should be writable.");

		Self(path)
	}
}
impl Drop for FixtureFile {
	fn drop(&mut self) {
		let _ = std::fs::remove_file(&self.0);
	}
}

#[tokio::test]
async fn file_source_reads_and_trims_the_projected_token() {
	let fixture = FixtureFile::new("file-source-test", "projected-assertion\n");
	let source = FileAssertionSource::new(&fixture.0);
	let assertion = source.assertion().await.expect("Readable file should yield an assertion.");

	assert_eq!(assertion.expose(), "projected-assertion");
}

#[tokio::test]
async fn file_source_rejects_an_empty_file() {
	let fixture = FixtureFile::new("empty-file-test", "\n");
	let source = FileAssertionSource::new(&fixture.0);
	let SourceError::Unavailable { reason } =
		source.assertion().await.expect_err("Empty assertion file must be rejected.");

	assert!(reason.contains("empty"));
}
