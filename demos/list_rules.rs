//! Demonstrates listing acceptance rules through the DIAS client against a mocked upstream.

// std
use std::{collections::HashMap, sync::Arc};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use kinetic_bff::{
	config::Config,
	env::Environment,
	reqwest::Client,
	token::TokenCache,
	upstream::{DiasClient, RULES_PATH},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-access\",\"expires_in\":900}");
		})
		.await;
	let rules_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(RULES_PATH)
				.header("authorization", "Bearer demo-access")
				.header("tenant-customerid", "demo-tenant");
			then.status(200).header("content-type", "application/json").body(
				"{\"data\":[{\"RegelId\":1,\"Omschrijving\":\"Max leeftijd\"},{\"RegelId\":2,\"Omschrijving\":\"Postcode\"}]}",
			);
		})
		.await;
	let vars = HashMap::from([
		("KINETIC_HOST_ACCEPTANCE".to_owned(), server.base_url()),
		("KINETIC_CLIENT_ID".to_owned(), "demo-client".to_owned()),
		("KINETIC_CLIENT_SECRET".to_owned(), "demo-secret".to_owned()),
		("DIAS_TENANT_CUSTOMER_ID".to_owned(), "demo-tenant".to_owned()),
		("DIAS_BEDRIJF_ID".to_owned(), "demo-company".to_owned()),
	]);
	let tokens = Arc::new(TokenCache::new(Arc::new(Config::from_vars(&vars)?))?);
	let client = DiasClient::new(tokens, Client::new());
	let listed = client.list_rules(Environment::Acceptance).await?;

	println!("Found {} acceptance rules.", listed.count);

	for rule in &listed.rules {
		println!("- {rule}");
	}

	token_mock.assert_async().await;
	rules_mock.assert_async().await;

	Ok(())
}
