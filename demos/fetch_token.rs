//! Demonstrates acquiring and reusing a bearer token from a mocked Kinetic token endpoint.

// std
use std::{collections::HashMap, sync::Arc};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use kinetic_bff::{config::Config, env::Environment, token::TokenCache};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.query_param("client_id", "demo-client")
				.query_param("client_secret", "demo-secret");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-access\",\"expires_in\":3600}");
		})
		.await;
	let vars = HashMap::from([
		("KINETIC_HOST".to_owned(), server.base_url()),
		("KINETIC_CLIENT_ID".to_owned(), "demo-client".to_owned()),
		("KINETIC_CLIENT_SECRET".to_owned(), "demo-secret".to_owned()),
	]);
	let cache = TokenCache::new(Arc::new(Config::from_vars(&vars)?))?;
	let first = cache.get_token(Environment::Production).await?;
	let second = cache.get_token(Environment::from_param(Some("production"))).await?;

	println!("Bearer token: {first}.");
	println!("Reused without a second exchange: {}.", first == second);
	println!("Cache state: {cache:?}.");

	token_mock.assert_async().await;

	Ok(())
}
