//! Gateway error types shared by the token cache, credential provider, and upstream callers.

// crates.io
use serde_json::{Value, json};
// self
use crate::{_prelude::*, env::Environment};

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// [`Error::Config`] failures are permanent and need operator action. [`Error::Upstream`] and
/// [`Error::Transport`] failures leave the token cache untouched and may be retried on a later
/// request. [`Error::InvalidRequest`] rejects caller input before anything is sent upstream.
/// Errors are cheap to clone so a failed refresh can be handed to every caller waiting on it.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Local configuration problem or protocol violation by the token endpoint.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Upstream answered with a failure status or an unreadable body.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Caller supplied a request that cannot be forwarded upstream.
	#[error("Invalid request: {reason}.")]
	InvalidRequest {
		/// Human-readable reason string.
		reason: String,
	},
}
impl Error {
	/// Returns `true` when a later attempt may succeed without operator action.
	pub fn is_retriable(&self) -> bool {
		matches!(self, Self::Upstream(_) | Self::Transport(_))
	}

	/// HTTP status a request handler should answer with when this error aborts a request.
	pub fn http_status(&self) -> u16 {
		match self {
			Self::Config(_) => 500,
			Self::InvalidRequest { .. } => 400,
			Self::Upstream(UpstreamError::TokenEndpoint { status, .. })
			| Self::Upstream(UpstreamError::Api { status, .. }) => *status,
			Self::Upstream(UpstreamError::ResponseParse { .. }) => 502,
			Self::Transport(TransportError::Timeout { .. }) => 504,
			Self::Transport(_) => 502,
		}
	}

	/// JSON error envelope a request handler should answer with.
	///
	/// Upstream rejections carry the upstream status and body so the frontend can show them;
	/// everything else is reduced to its display message.
	pub fn to_json(&self) -> Value {
		match self {
			Self::Upstream(UpstreamError::TokenEndpoint { status, body })
			| Self::Upstream(UpstreamError::Api { status, body }) => json!({
				"error": "Upstream request failed",
				"status_code": status,
				"message": body,
			}),
			other => json!({ "error": other.to_string() }),
		}
	}
}

/// Configuration and validation failures.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// Client id or secret is absent for the environment.
	#[error("Credential `{field}` is not configured for the {environment} environment.")]
	MissingCredential {
		/// Environment whose credential set is incomplete.
		environment: Environment,
		/// Missing credential field label.
		field: &'static str,
	},
	/// Host cannot be parsed as a URL.
	#[error("Host `{value}` configured by `{variable}` is not a valid URL.")]
	InvalidHost {
		/// Variable that supplied the host.
		variable: String,
		/// Raw configured value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Host does not use HTTPS and is not a loopback address.
	#[error("Host `{value}` configured by `{variable}` must use https.")]
	InsecureHost {
		/// Variable that supplied the host.
		variable: String,
		/// Raw configured value.
		value: String,
	},
	/// Tenant/company header value required by an upstream call is blank.
	#[error("Header `{header}` is not configured for the {environment} environment.")]
	MissingTenantHeader {
		/// Environment whose header set is incomplete.
		environment: Environment,
		/// Header name.
		header: &'static str,
	},
	/// Header value contains characters HTTP does not allow.
	#[error("Header `{header}` contains an invalid value.")]
	InvalidHeaderValue {
		/// Header name.
		header: &'static str,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// Token endpoint answered 2xx without an access token.
	#[error("Bearer token missing from token response.")]
	MissingAccessToken,
	/// Token endpoint answered 2xx with a body that is not the expected JSON document.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
	/// Token endpoint returned an `expires_in` that is not a whole number of seconds.
	#[error("The expires_in value `{value}` is not a number of seconds.")]
	InvalidExpiresIn {
		/// Raw value as received.
		value: String,
	},
	/// Token endpoint returned an `expires_in` too large to represent.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failure statuses and unreadable bodies returned by upstream.
#[derive(Clone, Debug, ThisError)]
pub enum UpstreamError {
	/// Token endpoint answered with a non-2xx status.
	#[error("Token endpoint responded with HTTP {status}.")]
	TokenEndpoint {
		/// HTTP status code.
		status: u16,
		/// Response body, decoded lossily.
		body: String,
	},
	/// Business endpoint answered with a non-2xx status.
	#[error("Upstream request failed with HTTP {status}.")]
	Api {
		/// HTTP status code.
		status: u16,
		/// Response body, decoded lossily.
		body: String,
	},
	/// Business endpoint answered 2xx with a body that is not JSON.
	#[error("Upstream returned a response that is not valid JSON.")]
	ResponseParse {
		/// Underlying parsing failure.
		#[source]
		source: Arc<serde_json::Error>,
	},
}
impl UpstreamError {
	/// HTTP status carried by the failure, if upstream answered at all.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::TokenEndpoint { status, .. } | Self::Api { status, .. } => Some(*status),
			Self::ResponseParse { .. } => None,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling upstream.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Request did not complete within its timeout.
	#[error("Upstream did not respond before the request timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: SharedError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling upstream.")]
	Io(#[source] Arc<std::io::Error>),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Arc::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Arc::new(src) }
	}
}
impl From<std::io::Error> for TransportError {
	fn from(e: std::io::Error) -> Self {
		Self::Io(Arc::new(e))
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}
