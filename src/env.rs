//! Deployment environments the gateway can target.

// self
use crate::_prelude::*;

/// Named deployment target with its own host, credentials, and token cache slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
	/// Live administration environment; also the fallback for unrecognized selectors.
	#[default]
	Production,
	/// Acceptance (staging) environment.
	Acceptance,
}
impl Environment {
	/// Every known environment, in slot order.
	pub const ALL: [Environment; 2] = [Environment::Production, Environment::Acceptance];

	/// Resolves a caller-supplied selector such as the `env` query parameter.
	///
	/// Only the exact value `acceptance` selects [`Environment::Acceptance`]. Anything else,
	/// including an absent or misspelled selector, resolves to [`Environment::Production`].
	pub fn from_param(value: Option<&str>) -> Self {
		match value {
			Some("acceptance") => Self::Acceptance,
			Some("production") | None => Self::Production,
			// Unrecognized selectors share the production slot and credentials.
			Some(_) => Self::Production,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Production => "production",
			Self::Acceptance => "acceptance",
		}
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Environment {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self::from_param(Some(s)))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn acceptance_selector_is_exact() {
		assert_eq!(Environment::from_param(Some("acceptance")), Environment::Acceptance);
		assert_eq!(Environment::from_param(Some("Acceptance")), Environment::Production);
		assert_eq!(Environment::from_param(Some("acc")), Environment::Production);
	}

	#[test]
	fn unknown_or_missing_selector_falls_back_to_production() {
		assert_eq!(Environment::from_param(None), Environment::Production);
		assert_eq!(Environment::from_param(Some("")), Environment::Production);
		assert_eq!(Environment::from_param(Some("staging")), Environment::Production);
		assert_eq!("staging".parse::<Environment>(), Ok(Environment::Production));
	}

	#[test]
	fn labels_are_stable() {
		assert_eq!(Environment::Production.to_string(), "production");
		assert_eq!(Environment::Acceptance.as_str(), "acceptance");
		assert_eq!(
			serde_json::to_string(&Environment::Acceptance)
				.expect("Environment should serialize to JSON."),
			"\"acceptance\""
		);
	}
}
