//! OpenID configuration document and grant helpers shared by all flows.

/// Grant identifiers and token-type URNs used on the token endpoint.
pub mod grant;

pub use grant::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Subset of the OpenID Connect discovery document the manager relies on.
///
/// Every field defaults to an empty string so an incomplete document still parses;
/// the typed accessors report absent or malformed endpoints only when a flow actually
/// needs them. Unknown fields are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenIdConfig {
	/// Authorization endpoint used by the interactive redirect.
	#[serde(default)]
	pub authorization_endpoint: String,
	/// Token endpoint used for code, refresh, and token-exchange grants.
	#[serde(default)]
	pub token_endpoint: String,
	/// Userinfo endpoint queried with a bearer access token.
	#[serde(default)]
	pub userinfo_endpoint: String,
	/// End-session (logout) endpoint.
	#[serde(default)]
	pub end_session_endpoint: String,
}
impl OpenIdConfig {
	/// Parsed `authorization_endpoint`.
	pub fn authorization_url(&self) -> Result<Url, ConfigError> {
		parse_endpoint("authorization_endpoint", &self.authorization_endpoint)
	}

	/// Parsed `token_endpoint`.
	pub fn token_url(&self) -> Result<Url, ConfigError> {
		parse_endpoint("token_endpoint", &self.token_endpoint)
	}

	/// Parsed `userinfo_endpoint`.
	pub fn userinfo_url(&self) -> Result<Url, ConfigError> {
		parse_endpoint("userinfo_endpoint", &self.userinfo_endpoint)
	}

	/// Parsed `end_session_endpoint`.
	pub fn end_session_url(&self) -> Result<Url, ConfigError> {
		parse_endpoint("end_session_endpoint", &self.end_session_endpoint)
	}
}

fn parse_endpoint(endpoint: &'static str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidEndpoint { endpoint, source })
}
