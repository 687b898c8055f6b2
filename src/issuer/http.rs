//! Reqwest-backed issuer speaking the common form-POST token endpoint shape.
//!
//! The endpoint receives `assertion` and `scope` form fields and answers with the usual
//! `{"access_token": "...", "expires_in": 3600}` JSON body. Rejections carry the familiar
//! `error`/`error_description` pair. The broker does not follow redirects here—token
//! endpoints answer directly instead of delegating to another URI.

// crates.io
use reqwest::{
	Client as ReqwestClient, StatusCode,
	header::{HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
use url::Url;
// self
use crate::{
	_prelude::*,
	auth::{Scope, TokenSecret},
	issuer::{ExchangeError, ExchangeFuture, IssuedToken, TokenIssuer},
	source::Assertion,
};

/// Token issuing authority reached over HTTPS.
#[derive(Clone, Debug)]
pub struct HttpTokenIssuer {
	client: ReqwestClient,
	endpoint: Url,
}
impl HttpTokenIssuer {
	/// Creates an issuer with a redirect-free client for the provided token endpoint.
	pub fn new(endpoint: Url) -> Result<Self, reqwest::Error> {
		let client = ReqwestClient::builder().redirect(Policy::none()).build()?;

		Ok(Self { client, endpoint })
	}

	/// Wraps a caller-provided client. Configure it to disable redirect following.
	pub fn with_client(endpoint: Url, client: ReqwestClient) -> Self {
		Self { client, endpoint }
	}

	/// Token endpoint this issuer talks to.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}
}
impl TokenIssuer for HttpTokenIssuer {
	fn exchange<'a>(&'a self, assertion: &'a Assertion, scope: &'a Scope) -> ExchangeFuture<'a> {
		Box::pin(async move {
			let form =
				[("assertion", assertion.expose()), ("scope", scope.as_str())];
			let response = self
				.client
				.post(self.endpoint.clone())
				.form(&form)
				.send()
				.await
				.map_err(|e| ExchangeError::unavailable(format!("transport error: {e}")))?;
			let status = response.status();
			let retry_after = parse_retry_after(response.headers());
			let body = response
				.bytes()
				.await
				.map_err(|e| ExchangeError::unavailable(format!("transport error: {e}")))?;

			if status.is_success() {
				return parse_token_response(&body, status);
			}
			if status == StatusCode::TOO_MANY_REQUESTS || !status.is_client_error() {
				return Err(ExchangeError::Unavailable {
					reason: format!("token endpoint returned HTTP {status}"),
					status: Some(status.as_u16()),
					retry_after,
				});
			}

			Err(ExchangeError::Rejected { reason: rejection_reason(&body, status) })
		})
	}
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
	expires_in: i64,
}

#[derive(Default, Deserialize)]
struct ErrorResponse {
	error: Option<String>,
	error_description: Option<String>,
}

fn parse_token_response(body: &[u8], status: StatusCode) -> Result<IssuedToken, ExchangeError> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);
	let parsed: TokenResponse =
		serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
			ExchangeError::Unavailable {
				reason: format!("malformed token response: {e}"),
				status: Some(status.as_u16()),
				retry_after: None,
			}
		})?;

	if parsed.expires_in <= 0 {
		return Err(ExchangeError::unavailable(format!(
			"token endpoint granted a non-positive lifetime ({})",
			parsed.expires_in
		)));
	}

	Ok(IssuedToken {
		value: TokenSecret::new(parsed.access_token),
		expires_in: Duration::seconds(parsed.expires_in),
	})
}

fn rejection_reason(body: &[u8], status: StatusCode) -> String {
	let parsed: ErrorResponse = serde_json::from_slice(body).unwrap_or_default();

	parsed
		.error_description
		.or(parsed.error)
		.unwrap_or_else(|| format!("token endpoint returned HTTP {status}"))
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
	let secs = raw.parse::<i64>().ok().filter(|secs| *secs >= 0)?;

	Some(Duration::seconds(secs))
}
