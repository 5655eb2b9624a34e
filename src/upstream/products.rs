//! Product-definition ("productdefinitie") operations.

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::Method;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	config::HeaderRequirement,
	env::Environment,
	http::TokenHttpClient,
	obs::CallKind,
	upstream::{DiasClient, normalize_list, observed, require_id},
};

/// Collection path of the product-definition endpoints.
pub const PRODUCTS_PATH: &str = "/contract/api/v1/contracten/verzekeringen/productdefinities";
/// Product detail documents are large; upstream is given longer to produce them.
pub const PRODUCT_DETAIL_TIMEOUT: StdDuration = StdDuration::from_secs(60);

/// Filters applied when listing products.
const LIST_FILTERS: [(&str, &str); 2] =
	[("AlleenLopendProduct", "true"), ("IsBeschikbaarVoorMedewerker", "true")];

/// Products returned by [`DiasClient::list_products`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductList {
	/// Product definitions as returned by upstream.
	pub products: Vec<Value>,
	/// Number of products.
	pub count: usize,
}

impl<C> DiasClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Lists current products available to the configured employee.
	pub async fn list_products(&self, environment: Environment) -> Result<ProductList> {
		observed(CallKind::Products, environment, "list_products", async {
			let request = self
				.authorized(
					environment,
					Method::GET,
					PRODUCTS_PATH,
					None,
					HeaderRequirement::TenantAndEmployee,
				)
				.await?
				.query(&LIST_FILTERS);
			let products = normalize_list(self.send(environment, request).await?, "items");

			Ok(ProductList { count: products.len(), products })
		})
		.await
	}

	/// Fetches one product definition by id.
	pub async fn product_detail(&self, environment: Environment, product_id: &str) -> Result<Value> {
		observed(CallKind::Products, environment, "product_detail", async {
			let product_id = require_id(product_id, "productId")?;
			let request = self
				.authorized(
					environment,
					Method::GET,
					PRODUCTS_PATH,
					Some(product_id),
					HeaderRequirement::TenantAndEmployee,
				)
				.await?
				.timeout(PRODUCT_DETAIL_TIMEOUT);

			Ok(self.send(environment, request).await?.unwrap_or(Value::Null))
		})
		.await
	}
}
