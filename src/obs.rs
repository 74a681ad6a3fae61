//! Optional observability helpers for manager flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oidc_token_manager.flow` with the `flow`
//!   and `stage` (call site) fields, plus `debug!` events for lifecycle decisions and `warn!`
//!   events for best-effort calls whose failure is swallowed.
//! - Enable `metrics` to increment the `oidc_token_manager_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Provider interactions observed by the manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Interactive Authorization Code + PKCE acquisition.
	AuthorizationCode,
	/// Refresh token rotation.
	Refresh,
	/// RFC 8693 token exchange for a subject principal.
	TokenExchange,
	/// OpenID configuration discovery.
	Discovery,
	/// Logout (record removal plus end-session call).
	EndSession,
	/// Userinfo lookup.
	UserInfo,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::AuthorizationCode => "authorization_code",
			FlowKind::Refresh => "refresh",
			FlowKind::TokenExchange => "token_exchange",
			FlowKind::Discovery => "discovery",
			FlowKind::EndSession => "end_session",
			FlowKind::UserInfo => "userinfo",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a manager helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
