//! Client configuration: who we are, which provider we talk to, and how to prompt.

// self
use crate::{_prelude::*, auth::PrincipalId, error::ConfigError, provider::OPENID_CONFIG_PATH};

/// Errors raised while constructing or validating a [`ClientConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ClientConfigError {
	/// Provider domain is empty.
	#[error("Provider domain cannot be empty.")]
	EmptyDomain,
	/// Provider domain is not a bare `host[:port]` authority.
	#[error("Provider domain `{domain}` must be a bare host[:port] without scheme or path.")]
	InvalidDomain {
		/// Domain that failed validation.
		domain: String,
	},
	/// Redirect URI is required for the authorization code flow.
	#[error("Missing redirect URI.")]
	MissingRedirectUri,
}

/// Options forwarded verbatim to the interactive redirect capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebAuthFlowOptions {
	/// Whether the capability may show a login/consent window. Non-interactive flows
	/// only succeed when the provider can answer silently.
	pub interactive: bool,
}
impl Default for WebAuthFlowOptions {
	fn default() -> Self {
		Self { interactive: true }
	}
}

/// Immutable client configuration consumed by [`crate::flows::TokenManager`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// The manager's own OAuth 2.0 client id (the "self" principal).
	pub client_id: PrincipalId,
	/// Identity provider authority (`host[:port]`); discovery happens over HTTPS.
	pub domain: String,
	/// Redirect URI registered for the client.
	pub redirect_uri: Url,
	/// Options for the interactive redirect capability.
	#[serde(default)]
	pub web_auth_flow: WebAuthFlowOptions,
	/// Extra authorization parameters sent on every self authentication.
	#[serde(default)]
	pub client_auth_params: Vec<(String, String)>,
}
impl ClientConfig {
	/// Creates a new builder for the provided client id and provider domain.
	pub fn builder(client_id: PrincipalId, domain: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(client_id, domain)
	}

	/// Builds `https://{domain}/.well-known/openid-configuration.json`.
	pub fn discovery_url(&self) -> Result<Url, ConfigError> {
		Url::parse(&format!("https://{}/{OPENID_CONFIG_PATH}", self.domain))
			.map_err(|source| ConfigError::InvalidDomain { domain: self.domain.clone(), source })
	}

	/// Validates invariants for the configuration.
	pub fn validate(&self) -> Result<(), ClientConfigError> {
		validate_domain(&self.domain)
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Client id for the configuration being constructed.
	pub client_id: PrincipalId,
	/// Provider authority.
	pub domain: String,
	/// Redirect URI registered for the client.
	pub redirect_uri: Option<Url>,
	/// Options for the interactive redirect capability.
	pub web_auth_flow: WebAuthFlowOptions,
	/// Extra authorization parameters sent on every self authentication.
	pub client_auth_params: Vec<(String, String)>,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the client id and provider domain.
	pub fn new(client_id: PrincipalId, domain: impl Into<String>) -> Self {
		Self {
			client_id,
			domain: domain.into(),
			redirect_uri: None,
			web_auth_flow: WebAuthFlowOptions::default(),
			client_auth_params: Vec::new(),
		}
	}

	/// Sets the redirect URI.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uri = Some(url);

		self
	}

	/// Overrides the redirect capability options.
	pub fn web_auth_flow(mut self, options: WebAuthFlowOptions) -> Self {
		self.web_auth_flow = options;

		self
	}

	/// Appends a single authorization parameter sent on every self authentication.
	pub fn client_auth_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.client_auth_params.push((key.into(), value.into()));

		self
	}

	/// Appends multiple authorization parameters.
	pub fn client_auth_params<I, K, V>(mut self, params: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.client_auth_params.extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		let redirect_uri = self.redirect_uri.ok_or(ClientConfigError::MissingRedirectUri)?;
		let config = ClientConfig {
			client_id: self.client_id,
			domain: self.domain,
			redirect_uri,
			web_auth_flow: self.web_auth_flow,
			client_auth_params: self.client_auth_params,
		};

		config.validate()?;

		Ok(config)
	}
}

fn validate_domain(domain: &str) -> Result<(), ClientConfigError> {
	if domain.is_empty() {
		return Err(ClientConfigError::EmptyDomain);
	}

	let invalid = || ClientConfigError::InvalidDomain { domain: domain.to_owned() };

	if domain.contains(['/', '?', '#', '@']) || domain.chars().any(char::is_whitespace) {
		return Err(invalid());
	}

	let parsed = Url::parse(&format!("https://{domain}/")).map_err(|_| invalid())?;

	if parsed.host_str().is_none() {
		return Err(invalid());
	}

	Ok(())
}
