//! Per-environment credential sets loaded once at process start.
//!
//! [`Config::from_env`] reads the process environment; [`Config::from_vars`] accepts a map so
//! tests never touch global state. Acceptance values fall back to their production
//! counterparts when unset. Missing client credentials are not a load error: the token cache
//! rejects them on first use, before any network call.

// std
use std::net::IpAddr;
// crates.io
use url::Host;
// self
use crate::{_prelude::*, env::Environment, error::ConfigError, token::TokenSecret};

/// Production host used when `KINETIC_HOST` is unset.
pub const DEFAULT_KINETIC_HOST: &str = "https://dcb.sleutelstadassuradeuren.nl";

/// Header carrying the bearer token.
pub const AUTHORIZATION_HEADER: &str = "Authorization";
/// Header carrying the tenant customer id.
pub const TENANT_CUSTOMER_ID_HEADER: &str = "Tenant-CustomerId";
/// Header carrying the company id.
pub const BEDRIJF_ID_HEADER: &str = "BedrijfId";
/// Header carrying the employee id.
pub const MEDEWERKER_ID_HEADER: &str = "MedewerkerId";
/// Header carrying the office id.
pub const KANTOOR_ID_HEADER: &str = "KantoorId";

/// Source of the credential set for an environment.
///
/// Implementations are read-only after construction and shared across every caller.
pub trait CredentialProvider
where
	Self: Send + Sync,
{
	/// Returns the credential set for `environment`.
	fn credentials(&self, environment: Environment) -> &CredentialSet;
}

/// Which tenant headers an upstream call requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderRequirement {
	/// `Tenant-CustomerId` and `BedrijfId`.
	Tenant,
	/// Tenant headers plus `MedewerkerId` and `KantoorId`.
	TenantAndEmployee,
}

/// Tenant/company header values forwarded on every business call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TenantHeaders {
	/// `Tenant-CustomerId` value.
	pub tenant_customer_id: String,
	/// `BedrijfId` value.
	pub bedrijf_id: String,
	/// `MedewerkerId` value.
	pub medewerker_id: String,
	/// `KantoorId` value.
	pub kantoor_id: String,
}

/// Host and client credentials for one environment.
#[derive(Clone, Debug)]
pub struct CredentialSet {
	/// Environment the set belongs to.
	pub environment: Environment,
	/// Base URL of the upstream API.
	pub host: Url,
	/// OAuth client identifier; may be empty until validated by the token cache.
	pub client_id: String,
	/// OAuth client secret; may be empty until validated by the token cache.
	pub client_secret: TokenSecret,
	/// Tenant/company headers used by business calls.
	pub tenant: TenantHeaders,
}
impl CredentialSet {
	/// Creates a credential set with empty tenant headers.
	pub fn new(
		environment: Environment,
		host: Url,
		client_id: impl Into<String>,
		client_secret: impl Into<TokenSecret>,
	) -> Self {
		Self {
			environment,
			host,
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			tenant: TenantHeaders::default(),
		}
	}

	/// Replaces the tenant headers.
	pub fn with_tenant(mut self, tenant: TenantHeaders) -> Self {
		self.tenant = tenant;

		self
	}

	/// Resolves `path` below the configured host, ignoring any trailing slash on the host.
	pub fn endpoint(&self, path: &str) -> Url {
		let mut url = self.host.clone();
		let joined = format!("{}/{}", url.path().trim_end_matches('/'), path.trim_start_matches('/'));

		url.set_path(&joined);

		url
	}

	/// URL of the client-credentials token endpoint.
	pub fn token_url(&self) -> Url {
		self.endpoint("/token")
	}

	/// Returns the client id and secret, or fails when either is blank.
	pub fn client_credentials(&self) -> Result<(&str, &TokenSecret), ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingCredential {
				environment: self.environment,
				field: "client_id",
			});
		}
		if self.client_secret.is_blank() {
			return Err(ConfigError::MissingCredential {
				environment: self.environment,
				field: "client_secret",
			});
		}

		Ok((&self.client_id, &self.client_secret))
	}

	/// Returns the tenant headers `requirement` asks for, or fails when one is blank.
	pub fn tenant_headers(
		&self,
		requirement: HeaderRequirement,
	) -> Result<Vec<(&'static str, String)>, ConfigError> {
		let mut required = vec![
			(TENANT_CUSTOMER_ID_HEADER, &self.tenant.tenant_customer_id),
			(BEDRIJF_ID_HEADER, &self.tenant.bedrijf_id),
		];

		if requirement == HeaderRequirement::TenantAndEmployee {
			required.push((MEDEWERKER_ID_HEADER, &self.tenant.medewerker_id));
			required.push((KANTOOR_ID_HEADER, &self.tenant.kantoor_id));
		}

		required
			.into_iter()
			.map(|(header, value)| {
				let value = value.trim();

				if value.is_empty() {
					Err(ConfigError::MissingTenantHeader { environment: self.environment, header })
				} else {
					Ok((header, value.to_owned()))
				}
			})
			.collect()
	}

	/// Builds the header list for an authorized business call.
	pub fn api_headers(
		&self,
		token: &TokenSecret,
		requirement: HeaderRequirement,
	) -> Result<Vec<(&'static str, String)>, ConfigError> {
		let mut headers = vec![
			(AUTHORIZATION_HEADER, format!("Bearer {}", token.expose())),
			("Accept", "application/json".to_owned()),
		];

		headers.extend(self.tenant_headers(requirement)?);

		Ok(headers)
	}
}

/// Credential sets for every environment.
#[derive(Clone, Debug)]
pub struct Config {
	/// Production credential set.
	pub production: CredentialSet,
	/// Acceptance credential set.
	pub acceptance: CredentialSet,
}
impl Config {
	/// Loads configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_vars(&std::env::vars().collect())
	}

	/// Loads configuration from a variable map.
	pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
		let lookup = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
		let production_host = lookup("KINETIC_HOST").unwrap_or(DEFAULT_KINETIC_HOST);
		let production = CredentialSet {
			environment: Environment::Production,
			host: parse_host("KINETIC_HOST", production_host)?,
			client_id: lookup("KINETIC_CLIENT_ID").unwrap_or_default().to_owned(),
			client_secret: TokenSecret::new(lookup("KINETIC_CLIENT_SECRET").unwrap_or_default()),
			tenant: TenantHeaders {
				tenant_customer_id: lookup("DIAS_TENANT_CUSTOMER_ID").unwrap_or_default().to_owned(),
				bedrijf_id: lookup("DIAS_BEDRIJF_ID").unwrap_or_default().to_owned(),
				medewerker_id: lookup("DIAS_MEDEWERKER_ID").unwrap_or_default().to_owned(),
				kantoor_id: lookup("DIAS_KANTOOR_ID").unwrap_or_default().to_owned(),
			},
		};
		let acceptance_host = lookup("KINETIC_HOST_ACCEPTANCE");
		let acceptance = CredentialSet {
			environment: Environment::Acceptance,
			host: match acceptance_host {
				Some(value) => parse_host("KINETIC_HOST_ACCEPTANCE", value)?,
				None => production.host.clone(),
			},
			client_id: lookup("KINETIC_CLIENT_ID_ACCEPTANCE")
				.map(str::to_owned)
				.unwrap_or_else(|| production.client_id.clone()),
			client_secret: lookup("KINETIC_CLIENT_SECRET_ACCEPTANCE")
				.map(TokenSecret::from)
				.unwrap_or_else(|| production.client_secret.clone()),
			tenant: TenantHeaders {
				tenant_customer_id: lookup("DIAS_TENANT_CUSTOMER_ID_ACCEPTANCE")
					.map(str::to_owned)
					.unwrap_or_else(|| production.tenant.tenant_customer_id.clone()),
				bedrijf_id: lookup("DIAS_BEDRIJF_ID_ACCEPTANCE")
					.map(str::to_owned)
					.unwrap_or_else(|| production.tenant.bedrijf_id.clone()),
				medewerker_id: lookup("DIAS_MEDEWERKER_ID_ACCEPTANCE")
					.map(str::to_owned)
					.unwrap_or_else(|| production.tenant.medewerker_id.clone()),
				kantoor_id: lookup("DIAS_KANTOOR_ID_ACCEPTANCE")
					.map(str::to_owned)
					.unwrap_or_else(|| production.tenant.kantoor_id.clone()),
			},
		};

		Ok(Self { production, acceptance })
	}
}
impl CredentialProvider for Config {
	fn credentials(&self, environment: Environment) -> &CredentialSet {
		match environment {
			Environment::Production => &self.production,
			Environment::Acceptance => &self.acceptance,
		}
	}
}

fn parse_host(variable: &str, value: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(value).map_err(|source| ConfigError::InvalidHost {
		variable: variable.to_owned(),
		value: value.to_owned(),
		source,
	})?;

	if url.scheme() == "https" || (url.scheme() == "http" && is_loopback(&url)) {
		Ok(url)
	} else {
		Err(ConfigError::InsecureHost { variable: variable.to_owned(), value: value.to_owned() })
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
		pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
	}

	#[test]
	fn acceptance_falls_back_to_production_values() {
		let config = Config::from_vars(&vars(&[
			("KINETIC_CLIENT_ID", "prod-id"),
			("KINETIC_CLIENT_SECRET", "prod-secret"),
			("DIAS_BEDRIJF_ID", "42"),
			("KINETIC_CLIENT_ID_ACCEPTANCE", "acc-id"),
		]))
		.expect("Configuration should load.");

		assert_eq!(config.production.host.as_str(), "https://dcb.sleutelstadassuradeuren.nl/");
		assert_eq!(config.acceptance.host, config.production.host);
		assert_eq!(config.acceptance.client_id, "acc-id");
		assert_eq!(config.acceptance.client_secret.expose(), "prod-secret");
		assert_eq!(config.acceptance.tenant.bedrijf_id, "42");
		assert_eq!(config.credentials(Environment::Acceptance).environment, Environment::Acceptance);
	}

	#[test]
	fn missing_credentials_load_but_fail_validation() {
		let config = Config::from_vars(&vars(&[("KINETIC_CLIENT_ID", "prod-id")]))
			.expect("Configuration without secrets should still load.");
		let err = config
			.production
			.client_credentials()
			.expect_err("Blank client secret should be rejected.");

		assert!(matches!(err, ConfigError::MissingCredential { field: "client_secret", .. }));

		let err = config
			.acceptance
			.client_credentials()
			.expect_err("Acceptance inherits the missing secret.");

		assert!(matches!(
			err,
			ConfigError::MissingCredential { environment: Environment::Acceptance, .. }
		));
	}

	#[test]
	fn hosts_must_be_https_unless_loopback() {
		let err = Config::from_vars(&vars(&[("KINETIC_HOST", "http://example.com")]))
			.expect_err("Plain HTTP hosts should be rejected.");

		assert!(matches!(err, ConfigError::InsecureHost { .. }));

		let err = Config::from_vars(&vars(&[("KINETIC_HOST_ACCEPTANCE", "not a url")]))
			.expect_err("Unparseable hosts should be rejected.");

		assert!(matches!(err, ConfigError::InvalidHost { .. }));

		let config = Config::from_vars(&vars(&[("KINETIC_HOST", "http://127.0.0.1:8080")]))
			.expect("Loopback hosts may use plain HTTP.");

		assert_eq!(config.production.token_url().as_str(), "http://127.0.0.1:8080/token");
	}

	#[test]
	fn endpoint_strips_trailing_slash() {
		let host = Url::parse("https://api.example.com/base/").expect("Fixture URL should parse.");
		let set = CredentialSet::new(Environment::Production, host, "id", "secret");

		assert_eq!(set.token_url().as_str(), "https://api.example.com/base/token");
		assert_eq!(
			set.endpoint("/contract/api/v1/items").as_str(),
			"https://api.example.com/base/contract/api/v1/items"
		);
	}

	#[test]
	fn api_headers_require_tenant_values() {
		let host = Url::parse("https://api.example.com").expect("Fixture URL should parse.");
		let token = TokenSecret::new("tok");
		let set = CredentialSet::new(Environment::Acceptance, host, "id", "secret").with_tenant(
			TenantHeaders {
				tenant_customer_id: "t".into(),
				bedrijf_id: "b".into(),
				..TenantHeaders::default()
			},
		);
		let headers = set
			.api_headers(&token, HeaderRequirement::Tenant)
			.expect("Tenant headers should be complete.");

		assert!(headers.contains(&("Authorization", "Bearer tok".to_owned())));
		assert!(headers.contains(&(TENANT_CUSTOMER_ID_HEADER, "t".to_owned())));
		assert!(headers.contains(&(BEDRIJF_ID_HEADER, "b".to_owned())));

		let err = set
			.api_headers(&token, HeaderRequirement::TenantAndEmployee)
			.expect_err("Employee headers are missing.");

		assert!(matches!(
			err,
			ConfigError::MissingTenantHeader { header: MEDEWERKER_ID_HEADER, .. }
		));
	}

	#[test]
	fn debug_output_redacts_client_secret() {
		let config = Config::from_vars(&vars(&[("KINETIC_CLIENT_SECRET", "hunter2")]))
			.expect("Configuration should load.");

		assert!(!format!("{config:?}").contains("hunter2"));
	}
}
