//! Acceptance-rule ("acceptatieregel") operations.

// crates.io
use reqwest::Method;
use serde_json::{Value, json};
use uuid::Uuid;
// self
use crate::{
	_prelude::*,
	config::HeaderRequirement,
	env::Environment,
	http::TokenHttpClient,
	obs::CallKind,
	upstream::{DiasClient, normalize_list, observed, require_id, require_value},
};

/// Collection path of the acceptance-rule endpoints.
pub const RULES_PATH: &str = "/beheer/api/v1/administratie/assurantie/regels/acceptatieregels";

/// Rules returned by [`DiasClient::list_rules`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleList {
	/// Rule documents as returned by upstream.
	pub rules: Vec<Value>,
	/// Number of rules.
	pub count: usize,
}

/// Payload for creating a rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewRule {
	/// Branch code the rule applies to, passed through verbatim.
	pub afd_branche_code_id: Value,
	/// Human-readable description.
	pub omschrijving: String,
	/// XPath expression evaluated by upstream.
	pub expressie: String,
	/// Idempotency key for the write; a fresh one is generated when the field is absent.
	#[serde(default = "fresh_resource_id")]
	pub resource_id: String,
}
impl NewRule {
	/// Creates a payload with a fresh resource id.
	pub fn new(
		afd_branche_code_id: impl Into<Value>,
		omschrijving: impl Into<String>,
		expressie: impl Into<String>,
	) -> Self {
		Self {
			afd_branche_code_id: afd_branche_code_id.into(),
			omschrijving: omschrijving.into(),
			expressie: expressie.into(),
			resource_id: fresh_resource_id(),
		}
	}

	/// Overrides the resource id.
	pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
		self.resource_id = resource_id.into();

		self
	}
}

/// Payload for changing an existing rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleUpdate {
	/// Identifier of the rule to change, passed through verbatim.
	pub regel_id: Value,
	/// Human-readable description.
	pub omschrijving: String,
	/// XPath expression evaluated by upstream.
	pub expressie: String,
	/// Idempotency key for the write; a fresh one is generated when the field is absent.
	#[serde(default = "fresh_resource_id")]
	pub resource_id: String,
}
impl RuleUpdate {
	/// Creates a payload with a fresh resource id.
	pub fn new(
		regel_id: impl Into<Value>,
		omschrijving: impl Into<String>,
		expressie: impl Into<String>,
	) -> Self {
		Self {
			regel_id: regel_id.into(),
			omschrijving: omschrijving.into(),
			expressie: expressie.into(),
			resource_id: fresh_resource_id(),
		}
	}

	/// Overrides the resource id.
	pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
		self.resource_id = resource_id.into();

		self
	}
}

fn fresh_resource_id() -> String {
	Uuid::new_v4().to_string()
}

impl<C> DiasClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Lists every acceptance rule.
	pub async fn list_rules(&self, environment: Environment) -> Result<RuleList> {
		observed(CallKind::Rules, environment, "list_rules", async {
			let request = self
				.authorized(environment, Method::GET, RULES_PATH, None, HeaderRequirement::Tenant)
				.await?;
			let rules = normalize_list(self.send(environment, request).await?, "rules");

			Ok(RuleList { count: rules.len(), rules })
		})
		.await
	}

	/// Fetches one rule by id.
	pub async fn rule_detail(&self, environment: Environment, regel_id: &str) -> Result<Value> {
		observed(CallKind::Rules, environment, "rule_detail", async {
			let regel_id = require_id(regel_id, "regelId")?;
			let request = self
				.authorized(
					environment,
					Method::GET,
					RULES_PATH,
					Some(regel_id),
					HeaderRequirement::Tenant,
				)
				.await?;

			Ok(self.send(environment, request).await?.unwrap_or(Value::Null))
		})
		.await
	}

	/// Deletes one rule by id.
	pub async fn delete_rule(&self, environment: Environment, regel_id: &str) -> Result<Value> {
		observed(CallKind::Rules, environment, "delete_rule", async {
			let regel_id = require_id(regel_id, "regelId")?;
			let request = self
				.authorized(
					environment,
					Method::DELETE,
					RULES_PATH,
					Some(regel_id),
					HeaderRequirement::Tenant,
				)
				.await?;

			Ok(self
				.send(environment, request)
				.await?
				.unwrap_or_else(|| json!({ "status": "deleted" })))
		})
		.await
	}

	/// Creates a rule.
	pub async fn create_rule(&self, environment: Environment, rule: &NewRule) -> Result<Value> {
		observed(CallKind::Rules, environment, "create_rule", async {
			require_value(&rule.afd_branche_code_id, "AfdBrancheCodeId")?;

			self.write_rule(environment, "invoeren", rule, "created").await
		})
		.await
	}

	/// Changes an existing rule.
	pub async fn update_rule(&self, environment: Environment, rule: &RuleUpdate) -> Result<Value> {
		observed(CallKind::Rules, environment, "update_rule", async {
			require_value(&rule.regel_id, "RegelId")?;

			self.write_rule(environment, "wijzigen", rule, "updated").await
		})
		.await
	}

	async fn write_rule<P>(
		&self,
		environment: Environment,
		action: &str,
		payload: &P,
		fallback_status: &str,
	) -> Result<Value>
	where
		P: Serialize + Sync,
	{
		let path = format!("{RULES_PATH}/{action}");
		let request = self
			.authorized(environment, Method::PUT, &path, None, HeaderRequirement::Tenant)
			.await?
			.json(payload);

		Ok(self
			.send(environment, request)
			.await?
			.unwrap_or_else(|| json!({ "status": fallback_status })))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn payloads_use_upstream_field_names() {
		let rule = NewRule::new(12, "Max leeftijd", "//Leeftijd < 80").with_resource_id("res-1");

		assert_eq!(
			serde_json::to_value(&rule).expect("NewRule should serialize."),
			json!({
				"AfdBrancheCodeId": 12,
				"Omschrijving": "Max leeftijd",
				"Expressie": "//Leeftijd < 80",
				"ResourceId": "res-1",
			})
		);

		let update = RuleUpdate::new("R-9", "Nieuw", "true()").with_resource_id("res-2");

		assert_eq!(
			serde_json::to_value(&update).expect("RuleUpdate should serialize."),
			json!({
				"RegelId": "R-9",
				"Omschrijving": "Nieuw",
				"Expressie": "true()",
				"ResourceId": "res-2",
			})
		);
	}

	#[test]
	fn resource_ids_default_to_fresh_uuids() {
		let first = NewRule::new(1, "a", "b");
		let second = NewRule::new(1, "a", "b");

		assert_ne!(first.resource_id, second.resource_id);
		assert!(Uuid::parse_str(&first.resource_id).is_ok());
	}

	#[test]
	fn missing_resource_ids_are_generated_on_deserialize() {
		let rule: NewRule = serde_json::from_value(json!({
			"AfdBrancheCodeId": 12,
			"Omschrijving": "Max leeftijd",
			"Expressie": "//Leeftijd < 80",
		}))
		.expect("ResourceId should be optional.");
		let update: RuleUpdate = serde_json::from_value(json!({
			"RegelId": "R-9",
			"Omschrijving": "Nieuw",
			"Expressie": "true()",
			"ResourceId": "kept",
		}))
		.expect("Explicit ResourceId should deserialize.");

		assert!(Uuid::parse_str(&rule.resource_id).is_ok());
		assert_eq!(update.resource_id, "kept");
	}
}
