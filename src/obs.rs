//! Optional observability helpers for token and upstream calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `kinetic_bff.call` with the `call`,
//!   `environment`, and `stage` (call site) fields.
//! - Enable `metrics` to increment the `kinetic_bff_call_total` counter for every
//!   attempt/hit/fetch/success/failure, labeled by `call` + `environment` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;
pub(crate) use self::tracing::{debug_event, warn_event};

// self
use crate::_prelude::*;

/// Call kinds observed by the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Bearer-token acquisition through the cache.
	Token,
	/// Acceptance-rule endpoints.
	Rules,
	/// Product-definition endpoints.
	Products,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::Token => "token",
			CallKind::Rules => "rules",
			CallKind::Products => "products",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a gateway helper.
	Attempt,
	/// Token served from the cache without a network call.
	CacheHit,
	/// Token fetched from the token endpoint and stored.
	Fetched,
	/// Successful upstream call.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::CacheHit => "hit",
			CallOutcome::Fetched => "fetched",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
