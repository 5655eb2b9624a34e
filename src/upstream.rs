//! Typed callers of the token cache for the DIAS administration API.
//!
//! Every operation follows the same sequence: validate the tenant headers it needs, obtain a
//! bearer token for the environment, send exactly one upstream request, and reshape the JSON
//! answer. Token failures abort the call before the business request is sent. A `401` from a
//! business endpoint drops the environment's cached token so the next call fetches a new one;
//! the failing call itself is not retried.

pub mod products;
pub mod rules;

pub use products::*;
pub use rules::*;

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::{
	Method, RequestBuilder, StatusCode,
	header::{HeaderMap, HeaderName, HeaderValue},
};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	config::{AUTHORIZATION_HEADER, CredentialSet, HeaderRequirement},
	env::Environment,
	error::{ConfigError, TransportError, UpstreamError},
	http::{ReqwestHttpClient, TokenHttpClient},
	obs::{self, CallKind, CallOutcome, CallSpan, warn_event},
	token::TokenCache,
};

/// Timeout applied to business requests.
pub const UPSTREAM_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Client for the acceptance-rule and product-definition endpoints.
pub struct DiasClient<C = ReqwestHttpClient>
where
	C: ?Sized + TokenHttpClient,
{
	/// Shared token cache consulted before every call.
	pub tokens: Arc<TokenCache<C>>,
	/// HTTP client used for business requests.
	pub http: ReqwestClient,
}
impl<C> DiasClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates a client that shares `tokens` with other callers.
	pub fn new(tokens: Arc<TokenCache<C>>, http: ReqwestClient) -> Self {
		Self { tokens, http }
	}

	fn credentials(&self, environment: Environment) -> &CredentialSet {
		self.tokens.credentials.credentials(environment)
	}

	/// Builds an authorized request for `path` (plus an optional, percent-encoded id segment).
	async fn authorized(
		&self,
		environment: Environment,
		method: Method,
		path: &str,
		id: Option<&str>,
		requirement: HeaderRequirement,
	) -> Result<RequestBuilder> {
		let credentials = self.credentials(environment);

		credentials.tenant_headers(requirement)?;

		let token = self.tokens.get_token(environment).await?;
		let headers = header_map(credentials.api_headers(&token, requirement)?)?;
		let mut url = credentials.endpoint(path);

		if let Some(id) = id {
			append_segment(&mut url, id);
		}

		Ok(self.http.request(method, url).headers(headers).timeout(UPSTREAM_REQUEST_TIMEOUT))
	}

	/// Sends `request` and decodes the JSON body; `None` means upstream answered without a body.
	async fn send(&self, environment: Environment, request: RequestBuilder) -> Result<Option<Value>> {
		let response = request.send().await.map_err(TransportError::from)?;
		let status = response.status();
		let body = response.bytes().await.map_err(TransportError::from)?;

		if status == StatusCode::UNAUTHORIZED {
			warn_event!("upstream rejected the bearer token; dropping the cached token");

			self.tokens.invalidate(environment);
		}
		if !status.is_success() {
			return Err(UpstreamError::Api {
				status: status.as_u16(),
				body: String::from_utf8_lossy(&body).into_owned(),
			}
			.into());
		}
		if body.is_empty() {
			return Ok(None);
		}

		serde_json::from_slice(&body)
			.map(Some)
			.map_err(|source| UpstreamError::ResponseParse { source: Arc::new(source) }.into())
	}
}
impl<C> Debug for DiasClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DiasClient").field("tokens", &self.tokens).finish()
	}
}

/// Flattens the list envelopes upstream uses into a plain list.
///
/// Arrays are returned as is. Objects carrying `data` (or `fallback_key`) yield that member.
/// Empty values (`null`, `false`, `0`, `""`, `{}`) yield an empty list and anything else is
/// wrapped as a single item.
pub fn normalize_list(value: Option<Value>, fallback_key: &str) -> Vec<Value> {
	match value {
		Some(Value::Object(mut map)) => {
			if let Some(inner) = map.remove("data") {
				into_items(inner)
			} else if let Some(inner) = map.remove(fallback_key) {
				into_items(inner)
			} else {
				into_items(Value::Object(map))
			}
		},
		Some(other) => into_items(other),
		None => Vec::new(),
	}
}

fn into_items(value: Value) -> Vec<Value> {
	match value {
		Value::Array(items) => items,
		other if is_empty_value(&other) => Vec::new(),
		other => vec![other],
	}
}

fn is_empty_value(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::Bool(flag) => !flag,
		Value::Number(number) => number.as_f64() == Some(0.0),
		Value::String(text) => text.is_empty(),
		Value::Array(items) => items.is_empty(),
		Value::Object(map) => map.is_empty(),
	}
}

fn append_segment(url: &mut Url, segment: &str) {
	if let Ok(mut segments) = url.path_segments_mut() {
		segments.pop_if_empty().push(segment);
	}
}

fn header_map(pairs: Vec<(&'static str, String)>) -> Result<HeaderMap, ConfigError> {
	let mut map = HeaderMap::with_capacity(pairs.len());

	for (header, value) in pairs {
		let name = HeaderName::from_bytes(header.as_bytes())
			.map_err(|_| ConfigError::InvalidHeaderValue { header })?;
		let mut value =
			HeaderValue::from_str(&value).map_err(|_| ConfigError::InvalidHeaderValue { header })?;

		if header == AUTHORIZATION_HEADER {
			value.set_sensitive(true);
		}

		map.insert(name, value);
	}

	Ok(map)
}

/// Wraps one upstream operation in a span and records its outcome.
async fn observed<T, F>(
	kind: CallKind,
	environment: Environment,
	stage: &'static str,
	fut: F,
) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	let span = CallSpan::new(kind, environment, stage);

	obs::record_call_outcome(kind, environment, CallOutcome::Attempt);

	let result = span.instrument(fut).await;
	let outcome = if result.is_ok() { CallOutcome::Success } else { CallOutcome::Failure };

	obs::record_call_outcome(kind, environment, outcome);

	result
}

/// Rejects blank identifiers before anything is sent upstream.
fn require_id<'a>(id: &'a str, label: &str) -> Result<&'a str> {
	let trimmed = id.trim();

	if trimmed.is_empty() {
		Err(Error::InvalidRequest { reason: format!("{label} is required") })
	} else {
		Ok(trimmed)
	}
}

/// Rejects identifiers that are explicitly `null`.
fn require_value(value: &Value, label: &str) -> Result<()> {
	if value.is_null() {
		Err(Error::InvalidRequest { reason: format!("{label} is required") })
	} else {
		Ok(())
	}
}
