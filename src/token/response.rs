//! Token endpoint response decoding.

// self
use crate::{_prelude::*, error::ConfigError, token::TokenSecret};

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: Duration = Duration::seconds(3600);

/// Decoded body of a successful token response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenResponse {
	/// Bearer token value, guaranteed non-empty.
	pub access_token: TokenSecret,
	/// Upstream-declared lifetime, defaulted when absent.
	pub expires_in: Duration,
}
impl TokenResponse {
	/// Parses a 2xx token endpoint body.
	///
	/// A body that is not a JSON object fails with [`ConfigError::TokenResponseParse`]; a missing
	/// or empty `access_token` fails with [`ConfigError::MissingAccessToken`].
	pub fn parse(body: &[u8]) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_slice(body);
		let raw: RawTokenResponse = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ConfigError::TokenResponseParse { source: Arc::new(source) })?;
		let access_token = raw
			.access_token
			.filter(|token| !token.is_empty())
			.map(TokenSecret::new)
			.ok_or(ConfigError::MissingAccessToken)?;
		let expires_in = match raw.expires_in {
			None => DEFAULT_EXPIRES_IN,
			Some(value) => value.to_duration()?,
		};

		Ok(Self { access_token, expires_in })
	}
}

#[derive(Deserialize)]
struct RawTokenResponse {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	expires_in: Option<RawExpiresIn>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawExpiresIn {
	Seconds(i64),
	Fractional(f64),
	Text(String),
}
impl RawExpiresIn {
	fn to_duration(&self) -> Result<Duration, ConfigError> {
		match self {
			Self::Seconds(secs) => Ok(Duration::seconds(*secs)),
			// Fractional lifetimes truncate toward zero.
			Self::Fractional(secs) if secs.is_finite() => {
				let truncated = secs.trunc();

				if truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64 {
					Ok(Duration::seconds(truncated as i64))
				} else {
					Err(ConfigError::ExpiresInOutOfRange)
				}
			},
			Self::Fractional(secs) => Err(ConfigError::InvalidExpiresIn { value: secs.to_string() }),
			Self::Text(raw) => raw
				.trim()
				.parse::<i64>()
				.map(Duration::seconds)
				.map_err(|_| ConfigError::InvalidExpiresIn { value: raw.clone() }),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parses_token_and_lifetime() {
		let parsed = TokenResponse::parse(br#"{"access_token":"tok-1","expires_in":1800}"#)
			.expect("Well-formed token response should parse.");

		assert_eq!(parsed.access_token.expose(), "tok-1");
		assert_eq!(parsed.expires_in, Duration::seconds(1800));
	}

	#[test]
	fn missing_expires_in_defaults_to_an_hour() {
		let parsed = TokenResponse::parse(br#"{"access_token":"tok","token_type":"bearer"}"#)
			.expect("Token response without expires_in should parse.");

		assert_eq!(parsed.expires_in, DEFAULT_EXPIRES_IN);

		let parsed = TokenResponse::parse(br#"{"access_token":"tok","expires_in":null}"#)
			.expect("Token response with null expires_in should parse.");

		assert_eq!(parsed.expires_in, DEFAULT_EXPIRES_IN);
	}

	#[test]
	fn numeric_strings_are_accepted() {
		let parsed = TokenResponse::parse(br#"{"access_token":"tok","expires_in":" 900 "}"#)
			.expect("Numeric string lifetime should parse.");

		assert_eq!(parsed.expires_in, Duration::seconds(900));

		let err = TokenResponse::parse(br#"{"access_token":"tok","expires_in":"soon"}"#)
			.expect_err("Non-numeric lifetime should be rejected.");

		assert!(matches!(err, ConfigError::InvalidExpiresIn { .. }));
	}

	#[test]
	fn missing_or_empty_access_token_is_rejected() {
		let err = TokenResponse::parse(br#"{"expires_in":3600}"#)
			.expect_err("Missing access_token should be rejected.");

		assert!(matches!(err, ConfigError::MissingAccessToken));

		let err = TokenResponse::parse(br#"{"access_token":"","expires_in":3600}"#)
			.expect_err("Empty access_token should be rejected.");

		assert!(matches!(err, ConfigError::MissingAccessToken));
	}

	#[test]
	fn non_json_body_reports_parse_failure() {
		let err = TokenResponse::parse(b"<html>login</html>")
			.expect_err("HTML body should be rejected.");

		assert!(matches!(err, ConfigError::TokenResponseParse { .. }));

		let err = TokenResponse::parse(br#"{"access_token":42}"#)
			.expect_err("Numeric access_token should be rejected.");

		match err {
			ConfigError::TokenResponseParse { source } =>
				assert_eq!(source.path().to_string(), "access_token"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}
}
