#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use time::Duration;
// self
use credential_broker::{
	auth::{Scope, WorkloadId},
	broker::Broker,
	issuer::{ExchangeError, HttpTokenIssuer, TokenIssuer},
	source::{Assertion, StaticAssertionSource},
	strategy::CredentialStrategy,
	url::Url,
};

fn build_issuer(server: &MockServer) -> HttpTokenIssuer {
	let endpoint =
		Url::parse(&server.url("/token")).expect("Mock token endpoint should parse successfully.");

	HttpTokenIssuer::new(endpoint).expect("HTTP issuer client should build successfully.")
}

fn scope() -> Scope {
	Scope::new("storage-read").expect("Scope fixture should be valid.")
}

#[tokio::test]
async fn exchange_posts_assertion_and_scope_as_form_fields() {
	let server = MockServer::start_async().await;
	let issuer = build_issuer(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.body("assertion=signed-proof&scope=storage-read");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"minted-token\",\"expires_in\":3600}");
		})
		.await;
	let issued = issuer
		.exchange(&Assertion::new("signed-proof"), &scope())
		.await
		.expect("Well-formed exchange should succeed.");

	assert_eq!(issued.value.expose(), "minted-token");
	assert_eq!(issued.expires_in, Duration::hours(1));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn client_errors_map_to_rejected_with_the_issuer_reason() {
	let server = MockServer::start_async().await;
	let issuer = build_issuer(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(403).header("content-type", "application/json").body(
				"{\"error\":\"invalid_grant\",\"error_description\":\"permission revoked\"}",
			);
		})
		.await;

	let error = issuer
		.exchange(&Assertion::new("signed-proof"), &scope())
		.await
		.expect_err("Rejected exchange must fail.");

	assert_eq!(error, ExchangeError::Rejected { reason: "permission revoked".into() });
}

#[tokio::test]
async fn rate_limiting_maps_to_unavailable_with_a_retry_hint() {
	let server = MockServer::start_async().await;
	let issuer = build_issuer(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(429).header("retry-after", "7").body("");
		})
		.await;

	let error = issuer
		.exchange(&Assertion::new("signed-proof"), &scope())
		.await
		.expect_err("Rate-limited exchange must fail.");
	let ExchangeError::Unavailable { status, retry_after, .. } = error else {
		panic!("Rate limiting must map to Unavailable, got {error:?}.");
	};

	assert_eq!(status, Some(429));
	assert_eq!(retry_after, Some(Duration::seconds(7)));
}

#[tokio::test]
async fn server_errors_map_to_unavailable() {
	let server = MockServer::start_async().await;
	let issuer = build_issuer(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(503).body("upstream maintenance");
		})
		.await;

	let error = issuer
		.exchange(&Assertion::new("signed-proof"), &scope())
		.await
		.expect_err("Exchange against a failing endpoint must fail.");

	assert!(matches!(error, ExchangeError::Unavailable { status: Some(503), .. }));
}

#[tokio::test]
async fn malformed_success_bodies_map_to_unavailable() {
	let server = MockServer::start_async().await;
	let issuer = build_issuer(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body("{\"access_token\":42}");
		})
		.await;

	let error = issuer
		.exchange(&Assertion::new("signed-proof"), &scope())
		.await
		.expect_err("Malformed token response must fail.");
	let ExchangeError::Unavailable { reason, .. } = error else {
		panic!("Malformed body must map to Unavailable, got {error:?}.");
	};

	assert!(reason.contains("malformed token response"));
}

#[tokio::test]
async fn broker_end_to_end_caches_the_http_issued_token() {
	let server = MockServer::start_async().await;
	let issuer = build_issuer(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"minted-token\",\"expires_in\":3600}");
		})
		.await;
	let broker = Broker::new(CredentialStrategy::managed(
		Arc::new(StaticAssertionSource::new("signed-proof")),
		Arc::new(issuer),
	));
	let identity = WorkloadId::parse("payments", "rag-agent")
		.expect("Workload identity fixture should be valid.");
	let first = broker
		.acquire(&identity, &scope())
		.await
		.expect("End-to-end acquire over HTTP should succeed.");
	let second = broker.acquire(&identity, &scope()).await.expect("Warm acquire should succeed.");

	assert_eq!(first.secret.expose(), "minted-token");
	assert_eq!(second.secret.expose(), "minted-token");

	mock.assert_calls_async(1).await;
}
