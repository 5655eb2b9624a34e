//! Backend-for-frontend core for the Kinetic/DIAS insurance-administration API.
//!
//! The crate owns the one stateful piece of the gateway: a per-environment bearer-token cache
//! that performs the client-credentials exchange lazily, collapses concurrent refreshes into a
//! single in-flight request, and never hands out a token past its adjusted expiry. Request
//! handlers consume it through [`token::TokenCache::get_token`] (or the typed
//! [`upstream::DiasClient`]) and translate [`error::Error`] into their own responses.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod clock;
pub mod config;
pub mod env;
pub mod error;
pub mod http;
pub mod obs;
pub mod token;
#[cfg(feature = "reqwest")] pub mod upstream;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		clock::{Clock, ManualClock},
		config::Config,
		http::ReqwestHttpClient,
		token::TokenCache,
	};

	/// Token cache type alias used by reqwest-backed integration tests.
	pub type ReqwestTestCache = TokenCache<ReqwestHttpClient>;

	/// Client id configured for both environments by [`test_config`].
	pub const TEST_CLIENT_ID: &str = "bff-client";
	/// Client secret configured for both environments by [`test_config`].
	pub const TEST_CLIENT_SECRET: &str = "bff-secret";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a configuration whose production and acceptance hosts point at the provided mock
	/// servers, with complete credentials and tenant headers for both environments.
	pub fn test_config(production_host: &str, acceptance_host: &str) -> Config {
		let vars = HashMap::from([
			("KINETIC_HOST".to_owned(), production_host.to_owned()),
			("KINETIC_CLIENT_ID".to_owned(), TEST_CLIENT_ID.to_owned()),
			("KINETIC_CLIENT_SECRET".to_owned(), TEST_CLIENT_SECRET.to_owned()),
			("KINETIC_HOST_ACCEPTANCE".to_owned(), acceptance_host.to_owned()),
			("DIAS_TENANT_CUSTOMER_ID".to_owned(), "tenant-1".to_owned()),
			("DIAS_BEDRIJF_ID".to_owned(), "bedrijf-1".to_owned()),
			("DIAS_MEDEWERKER_ID".to_owned(), "medewerker-1".to_owned()),
			("DIAS_KANTOOR_ID".to_owned(), "kantoor-1".to_owned()),
			("DIAS_TENANT_CUSTOMER_ID_ACCEPTANCE".to_owned(), "tenant-acc".to_owned()),
		]);

		Config::from_vars(&vars).expect("Test configuration should load from fixture variables.")
	}

	/// Constructs a [`TokenCache`] driven by a [`ManualClock`] so tests can move time forward.
	pub fn build_reqwest_test_cache(config: Config) -> (ReqwestTestCache, Arc<ManualClock>) {
		let clock = Arc::new(ManualClock::default());
		let shared: Arc<dyn Clock> = clock.clone();
		let cache: ReqwestTestCache =
			TokenCache::with_http_client(Arc::new(config), test_reqwest_http_client())
				.with_clock(shared);

		(cache, clock)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _, tokio as _};
#[cfg(not(feature = "reqwest"))] use uuid as _;
