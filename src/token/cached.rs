//! Cached token values and the expiry rule applied to fresh tokens.

// self
use crate::{_prelude::*, error::ConfigError, token::TokenSecret};

/// Seconds shaved off the upstream-declared lifetime to absorb clock skew and request latency.
pub const EXPIRY_SAFETY_MARGIN: Duration = Duration::seconds(300);
/// Minimum lifetime granted to any fetched token.
pub const MINIMUM_TOKEN_LIFETIME: Duration = Duration::seconds(60);

/// Lifecycle of an environment's cache slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
	/// No token has been fetched yet (or the slot was invalidated).
	Empty,
	/// A token is cached and `now` is strictly before its expiry.
	Valid,
	/// A token is cached but its expiry has passed; it will never be returned again.
	Stale,
}

/// Token value together with the instant it stops being handed out.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
	/// Bearer token value.
	pub token: TokenSecret,
	/// Instant the token was stored.
	pub issued_at: OffsetDateTime,
	/// First instant at which the token is no longer served.
	pub expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Builds a cache entry from the upstream-declared `expires_in`, applying the safety margin
	/// and the minimum lifetime.
	pub fn from_lifetime(
		token: TokenSecret,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Result<Self, ConfigError> {
		let expires_at = issued_at
			.checked_add(effective_lifetime(expires_in))
			.ok_or(ConfigError::ExpiresInOutOfRange)?;

		Ok(Self { token, issued_at, expires_at })
	}

	/// Returns `true` when the token may be served at `now`.
	pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
		now < self.expires_at
	}

	/// Lifecycle state at `now`.
	pub fn state_at(&self, now: OffsetDateTime) -> SlotState {
		if self.is_valid_at(now) { SlotState::Valid } else { SlotState::Stale }
	}
}
impl Debug for CachedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedToken")
			.field("token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// `max(expires_in - 300s, 60s)`.
pub fn effective_lifetime(expires_in: Duration) -> Duration {
	expires_in.saturating_sub(EXPIRY_SAFETY_MARGIN).max(MINIMUM_TOKEN_LIFETIME)
}
