//! Per-environment bearer-token cache with singleflight refreshes.
//!
//! [`TokenCache::get_token`] serves the cached token while `now` is strictly before its
//! expiry and otherwise performs exactly one client-credentials exchange per environment,
//! however many callers are waiting. Each environment owns an independent slot: a read-mostly
//! entry for the O(1) fast path plus an async guard that serializes refreshes. Waiters re-check
//! the entry after acquiring the guard, so a refresh completed by another caller is reused
//! instead of repeated. A failed exchange never writes the cached entry; its error is handed to
//! every caller that was already waiting on it, and the next caller to arrive tries again.

mod metrics;

pub use metrics::TokenCacheMetrics;

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	config::CredentialProvider,
	env::Environment,
	error::UpstreamError,
	http::{TokenHttpClient, TokenRequest},
	obs::{self, CallKind, CallOutcome, CallSpan, debug_event, warn_event},
	token::{CachedToken, SlotState, TokenResponse, TokenSecret},
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Token cache specialized for the crate's default reqwest transport.
pub type ReqwestTokenCache = TokenCache<ReqwestHttpClient>;

/// Process-wide token cache shared by every request handler.
///
/// Construct one per process at the composition root and share it behind an [`Arc`].
pub struct TokenCache<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// HTTP client used for every token request.
	pub http_client: Arc<C>,
	/// Source of per-environment hosts and client credentials.
	pub credentials: Arc<dyn CredentialProvider>,
	/// Time source for stamping and evaluating cached tokens.
	pub clock: Arc<dyn Clock>,
	/// In-process counters for hits, fetches, and failures.
	pub metrics: Arc<TokenCacheMetrics>,
	slots: Slots,
}
impl<C> TokenCache<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates an empty cache that reuses the caller-provided transport.
	pub fn with_http_client(
		credentials: Arc<dyn CredentialProvider>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			credentials,
			clock: Arc::new(SystemClock),
			metrics: Default::default(),
			slots: Default::default(),
		}
	}

	/// Replaces the time source.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Returns a bearer token for `environment`, fetching one if the cached token is missing or
	/// expired.
	///
	/// Fails with [`Error::Config`] before any network call when the environment lacks a client
	/// id or secret, and when the token endpoint answers 2xx without a usable token. Non-2xx
	/// answers surface as [`Error::Upstream`] and network failures as [`Error::Transport`]; in
	/// both cases the slot keeps whatever it held before.
	pub async fn get_token(&self, environment: Environment) -> Result<TokenSecret> {
		const KIND: CallKind = CallKind::Token;

		let span = CallSpan::new(KIND, environment, "get_token");

		obs::record_call_outcome(KIND, environment, CallOutcome::Attempt);

		let result = span.instrument(self.acquire(environment)).await;

		match result {
			Ok((token, outcome)) => {
				match outcome {
					CallOutcome::CacheHit => self.metrics.record_hit(),
					_ => self.metrics.record_fetch(),
				}

				obs::record_call_outcome(KIND, environment, outcome);

				Ok(token)
			},
			Err(err) => {
				self.metrics.record_failure();
				obs::record_call_outcome(KIND, environment, CallOutcome::Failure);

				Err(err)
			},
		}
	}

	async fn acquire(&self, environment: Environment) -> Result<(TokenSecret, CallOutcome)> {
		let credentials = self.credentials.credentials(environment);
		let (client_id, client_secret) = credentials.client_credentials()?;
		let slot = self.slots.get(environment);
		let observed = slot.generation();

		if let Some(token) = slot.fresh(self.clock.now()) {
			return Ok((token, CallOutcome::CacheHit));
		}

		let _singleflight = slot.refresh.lock().await;

		// Another caller may have refreshed the slot while this one waited.
		if let Some(token) = slot.fresh(self.clock.now()) {
			return Ok((token, CallOutcome::CacheHit));
		}
		// Or tried and failed; its callers and this one share that single attempt.
		if let Some(err) = slot.failure_since(observed) {
			debug_event!("reusing the failure of a refresh completed while waiting");

			return Err(err);
		}

		debug_event!("requesting a new bearer token");

		let request = TokenRequest::new(credentials.token_url(), client_id, client_secret.clone());

		match self.fetch(request).await {
			Ok(cached) => {
				debug_event!(expires_at = %cached.expires_at, "cached a new bearer token");

				let token = cached.token.clone();

				slot.store(cached);

				Ok((token, CallOutcome::Fetched))
			},
			Err(err) => {
				slot.record_failure(err.clone());

				Err(err)
			},
		}
	}

	async fn fetch(&self, request: TokenRequest) -> Result<CachedToken> {
		let response = self.http_client.post_token(request).await?;

		if !response.is_success() {
			warn_event!(status = response.status, "token endpoint rejected the request");

			return Err(UpstreamError::TokenEndpoint {
				status: response.status,
				body: response.body_text(),
			}
			.into());
		}

		let parsed = TokenResponse::parse(&response.body)?;

		Ok(CachedToken::from_lifetime(parsed.access_token, self.clock.now(), parsed.expires_in)?)
	}

	/// Drops the cached token for `environment` so the next lookup fetches a new one.
	pub fn invalidate(&self, environment: Environment) {
		*self.slots.get(environment).entry.write() = None;
	}

	/// Returns a copy of the cached entry for `environment`, valid or not.
	pub fn cached(&self, environment: Environment) -> Option<CachedToken> {
		self.slots.get(environment).entry.read().clone()
	}

	/// Lifecycle state of the slot for `environment` at the current instant.
	pub fn slot_state(&self, environment: Environment) -> SlotState {
		match self.slots.get(environment).entry.read().as_ref() {
			Some(cached) => cached.state_at(self.clock.now()),
			None => SlotState::Empty,
		}
	}
}
#[cfg(feature = "reqwest")]
impl TokenCache<ReqwestHttpClient> {
	/// Creates an empty cache with its own reqwest transport.
	pub fn new(credentials: Arc<dyn CredentialProvider>) -> Result<Self, ConfigError> {
		Ok(Self::with_http_client(credentials, ReqwestHttpClient::new()?))
	}
}
impl<C> Debug for TokenCache<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("production", &self.slot_state(Environment::Production))
			.field("acceptance", &self.slot_state(Environment::Acceptance))
			.field("metrics", &self.metrics)
			.finish()
	}
}

/// One environment's cache entry and refresh bookkeeping.
///
/// `attempt` is only written while `refresh` is held.
#[derive(Debug, Default)]
struct Slot {
	entry: RwLock<Option<CachedToken>>,
	refresh: AsyncMutex<()>,
	attempt: Mutex<RefreshAttempt>,
}
impl Slot {
	fn fresh(&self, now: OffsetDateTime) -> Option<TokenSecret> {
		self.entry
			.read()
			.as_ref()
			.filter(|cached| cached.is_valid_at(now))
			.map(|cached| cached.token.clone())
	}

	fn generation(&self) -> u64 {
		self.attempt.lock().generation
	}

	/// Failure of the latest refresh, if it finished after `observed` and did not succeed.
	fn failure_since(&self, observed: u64) -> Option<Error> {
		let attempt = self.attempt.lock();

		if attempt.generation > observed { attempt.failure.clone() } else { None }
	}

	fn store(&self, cached: CachedToken) {
		*self.entry.write() = Some(cached);

		self.attempt.lock().finish(None);
	}

	fn record_failure(&self, err: Error) {
		self.attempt.lock().finish(Some(err));
	}
}

/// Outcome of the most recent completed refresh.
#[derive(Debug, Default)]
struct RefreshAttempt {
	generation: u64,
	failure: Option<Error>,
}
impl RefreshAttempt {
	fn finish(&mut self, failure: Option<Error>) {
		self.generation += 1;
		self.failure = failure;
	}
}

#[derive(Debug, Default)]
struct Slots {
	production: Slot,
	acceptance: Slot,
}
impl Slots {
	fn get(&self, environment: Environment) -> &Slot {
		match environment {
			Environment::Production => &self.production,
			Environment::Acceptance => &self.acceptance,
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;
	use crate::{
		clock::ManualClock,
		config::{Config, CredentialSet},
		error::{ConfigError, TransportError},
		http::{TokenHttpFuture, TokenHttpResponse},
	};

	/// Scripted transport that answers from a queue and counts calls.
	#[derive(Default)]
	struct ScriptedHttpClient {
		responses: Mutex<Vec<Result<TokenHttpResponse, TransportError>>>,
		calls: AtomicUsize,
		last_url: Mutex<Option<Url>>,
	}
	impl ScriptedHttpClient {
		fn push(&self, status: u16, body: &str) {
			self.responses
				.lock()
				.insert(0, Ok(TokenHttpResponse { status, body: body.as_bytes().to_vec() }));
		}

		fn push_failure(&self, err: TransportError) {
			self.responses.lock().insert(0, Err(err));
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl TokenHttpClient for ScriptedHttpClient {
		fn post_token(&self, request: TokenRequest) -> TokenHttpFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			*self.last_url.lock() = Some(request.url.clone());

			let next = self.responses.lock().pop().unwrap_or_else(|| {
				Ok(TokenHttpResponse { status: 500, body: b"no scripted response".to_vec() })
			});

			Box::pin(async move { next })
		}
	}

	fn config(production_secret: &str) -> Config {
		let host = |h: &str| Url::parse(h).expect("Fixture host should parse.");

		Config {
			production: CredentialSet::new(
				Environment::Production,
				host("https://prod.example.com"),
				"prod-id",
				production_secret,
			),
			acceptance: CredentialSet::new(
				Environment::Acceptance,
				host("https://acc.example.com/"),
				"acc-id",
				"acc-secret",
			),
		}
	}

	fn cache(
		config: Config,
	) -> (TokenCache<ScriptedHttpClient>, Arc<ScriptedHttpClient>, Arc<ManualClock>) {
		let http = Arc::new(ScriptedHttpClient::default());
		let clock = Arc::new(ManualClock::new(datetime!(2026-05-04 09:00 UTC)));
		let cache = TokenCache::with_http_client(Arc::new(config), http.clone())
			.with_clock(clock.clone());

		(cache, http, clock)
	}

	#[tokio::test]
	async fn scenario_reuses_then_refreshes_after_expiry() {
		let (cache, http, clock) = cache(config("prod-secret"));

		http.push(200, r#"{"access_token":"tok-1","expires_in":3600}"#);

		let first = cache.get_token(Environment::Production).await.expect("First fetch succeeds.");

		assert_eq!(first.expose(), "tok-1");
		assert_eq!(
			cache.cached(Environment::Production).map(|c| c.expires_at),
			Some(datetime!(2026-05-04 09:55 UTC))
		);

		clock.advance(Duration::seconds(10));

		let second = cache.get_token(Environment::Production).await.expect("Cache hit succeeds.");

		assert_eq!(second.expose(), "tok-1");
		assert_eq!(http.calls(), 1);

		clock.advance(Duration::seconds(3300));
		http.push(200, r#"{"access_token":"tok-2","expires_in":1800}"#);

		assert_eq!(cache.slot_state(Environment::Production), SlotState::Stale);

		let third = cache.get_token(Environment::Production).await.expect("Refresh succeeds.");

		assert_eq!(third.expose(), "tok-2");
		assert_eq!(http.calls(), 2);
		assert_eq!(cache.metrics.hits(), 1);
		assert_eq!(cache.metrics.fetches(), 2);
		assert_eq!(
			http.last_url.lock().as_ref().map(Url::as_str),
			Some("https://prod.example.com/token")
		);
	}

	#[tokio::test]
	async fn short_lifetime_is_floored_at_one_minute() {
		let (cache, http, _clock) = cache(config("prod-secret"));

		http.push(200, r#"{"access_token":"short","expires_in":30}"#);
		cache.get_token(Environment::Acceptance).await.expect("Fetch succeeds.");

		assert_eq!(
			cache.cached(Environment::Acceptance).map(|c| c.expires_at),
			Some(datetime!(2026-05-04 09:01 UTC))
		);
		assert_eq!(
			http.last_url.lock().as_ref().map(Url::as_str),
			Some("https://acc.example.com/token")
		);
	}

	#[tokio::test]
	async fn missing_secret_fails_without_network() {
		let (cache, http, _clock) = cache(config(""));
		let err = cache
			.get_token(Environment::Production)
			.await
			.expect_err("Blank secret must be rejected.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::MissingCredential { field: "client_secret", .. })
		));
		assert_eq!(http.calls(), 0);
		assert_eq!(cache.metrics.failures(), 1);
	}

	#[tokio::test]
	async fn failed_refresh_keeps_previous_entry() {
		let (cache, http, clock) = cache(config("prod-secret"));

		http.push(200, r#"{"access_token":"tok-1","expires_in":600}"#);
		cache.get_token(Environment::Production).await.expect("First fetch succeeds.");

		let before = cache.cached(Environment::Production);

		clock.advance(Duration::seconds(301));
		http.push_failure(TransportError::from(std::io::Error::other("connection reset")));

		let err = cache
			.get_token(Environment::Production)
			.await
			.expect_err("Transport failure must surface.");

		assert!(matches!(err, Error::Transport(_)));
		assert!(err.is_retriable());
		assert_eq!(cache.cached(Environment::Production), before);
		assert_eq!(cache.slot_state(Environment::Production), SlotState::Stale);
	}

	#[tokio::test]
	async fn invalidate_forces_refetch() {
		let (cache, http, _clock) = cache(config("prod-secret"));

		http.push(200, r#"{"access_token":"tok-1"}"#);
		http.push(200, r#"{"access_token":"tok-2"}"#);
		cache.get_token(Environment::Production).await.expect("First fetch succeeds.");
		cache.invalidate(Environment::Production);

		assert_eq!(cache.slot_state(Environment::Production), SlotState::Empty);

		let token = cache.get_token(Environment::Production).await.expect("Refetch succeeds.");

		assert_eq!(token.expose(), "tok-2");
		assert_eq!(http.calls(), 2);
	}
}
