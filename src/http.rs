//! Transport primitives for client-credentials token exchanges.
//!
//! [`TokenHttpClient`] is the token cache's only dependency on an HTTP stack. The token
//! endpoint expects `client_id` and `client_secret` as query parameters on an empty `POST`,
//! so the request shape is fixed here and implementations only decide how to send it.
//! Implementations map their own failures into [`TransportError`] and report every HTTP
//! status, successful or not, through [`TokenHttpResponse`]; classifying statuses is the
//! cache's job.

// self
use crate::{_prelude::*, error::TransportError, token::TokenSecret};

/// Reference timeout applied to token requests.
pub const TOKEN_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Boxed future returned by [`TokenHttpClient::post_token`].
pub type TokenHttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TokenHttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of calling the token endpoint.
///
/// Implementations must be `Send + Sync + 'static` so a single instance can be shared by every
/// environment slot of a [`TokenCache`](crate::token::TokenCache).
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves with the raw status and body.
	fn post_token(&self, request: TokenRequest) -> TokenHttpFuture<'_>;
}

/// Client-credentials request bound for `{host}/token`.
#[derive(Clone)]
pub struct TokenRequest {
	/// Token endpoint URL without credentials.
	pub url: Url,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
}
impl TokenRequest {
	/// Builds a request for the provided endpoint and credentials.
	pub fn new(url: Url, client_id: impl Into<String>, client_secret: TokenSecret) -> Self {
		Self { url, client_id: client_id.into(), client_secret }
	}

	/// Query parameters carrying the credentials.
	pub fn query(&self) -> [(&'static str, &str); 2] {
		[("client_id", self.client_id.as_str()), ("client_secret", self.client_secret.expose())]
	}
}
impl Debug for TokenRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRequest")
			.field("url", &self.url.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}

/// Raw token endpoint response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenHttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl TokenHttpResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token requests should not follow redirects; configure any custom [`ReqwestClient`] passed to
/// [`ReqwestHttpClient::with_client`] accordingly. The 30-second timeout is applied per request,
/// so it holds regardless of how the wrapped client was built.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client that refuses redirects.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		let client =
			ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	fn post_token(&self, request: TokenRequest) -> TokenHttpFuture<'_> {
		Box::pin(async move {
			let response = self
				.0
				.post(request.url.clone())
				.query(&request.query())
				.header(reqwest::header::ACCEPT, "application/json")
				.timeout(TOKEN_REQUEST_TIMEOUT)
				.send()
				.await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok(TokenHttpResponse { status, body })
		})
	}
}
