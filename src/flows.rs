//! Token manager and the flows it orchestrates.

pub mod auth_code_pkce;
mod common;
pub mod lifecycle;
pub mod session;

pub use auth_code_pkce::*;
pub use lifecycle::*;
pub use session::*;

// self
use crate::{
	_prelude::*,
	auth::PrincipalId,
	config::ClientConfig,
	error::ConfigError,
	http::OidcHttpClient,
	oauth::{TokenExchanger, TransportErrorMapper},
	provider::{OpenIdConfig, OpenIdConfigResolver},
	store::TokenRecordStore,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Manager specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenManager = TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Hands out currently valid access tokens for the manager's own client and for
/// subject principals reached through token exchange.
///
/// The manager owns the HTTP client, the record store façade, the redirect capability,
/// and a memoized OpenID configuration, so individual flows only deal with
/// grant-specific logic. Each principal gets its own async guard, held across the
/// read-decide-act-persist sequence so concurrent callers never trigger duplicate
/// prompts or token calls for the same principal.
pub struct TokenManager<C, M>
where
	C: ?Sized + OidcHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Record store façade over the external key-value store.
	pub store: TokenRecordStore,
	/// Shared counters for lifecycle decisions.
	pub metrics: Arc<LifecycleMetrics>,
	config: ClientConfig,
	authorizer: InteractiveAuthorizer,
	resolver: Arc<OpenIdConfigResolver<C, M>>,
	flow_guards: Arc<Mutex<HashMap<PrincipalId, Arc<AsyncMutex<()>>>>>,
}
impl<C, M> TokenManager<C, M>
where
	C: ?Sized + OidcHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a manager that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: ClientConfig,
		store: impl Into<TokenRecordStore>,
		redirect_flow: Arc<dyn RedirectFlow>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		config.validate().map_err(ConfigError::from)?;

		let http_client = http_client.into();
		let transport_mapper = mapper.into();
		let resolver =
			OpenIdConfigResolver::new(&config, http_client.clone(), transport_mapper.clone())?;

		Ok(Self {
			http_client,
			transport_mapper,
			store: store.into(),
			metrics: Default::default(),
			config,
			authorizer: InteractiveAuthorizer::new(redirect_flow),
			resolver: Arc::new(resolver),
			flow_guards: Default::default(),
		})
	}

	/// Client configuration the manager was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// The manager's own principal id.
	pub fn client_id(&self) -> &PrincipalId {
		&self.config.client_id
	}

	/// Resolves (once) and returns the provider's OpenID configuration.
	pub async fn openid_config(&self) -> Result<&OpenIdConfig> {
		self.resolver.resolve().await
	}

	pub(crate) fn authorizer(&self) -> &InteractiveAuthorizer {
		&self.authorizer
	}

	pub(crate) fn exchanger(&self, openid: &OpenIdConfig) -> Result<TokenExchanger<C, M>> {
		TokenExchanger::new(
			openid,
			&self.config.redirect_uri,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)
	}
}
#[cfg(feature = "reqwest")]
impl TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a new manager for the provided configuration.
	///
	/// The manager provisions its own reqwest-backed transport so callers do not need
	/// to pass HTTP handles explicitly.
	pub fn new(
		config: ClientConfig,
		store: impl Into<TokenRecordStore>,
		redirect_flow: Arc<dyn RedirectFlow>,
	) -> Result<Self> {
		Self::with_http_client(
			config,
			store,
			redirect_flow,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Clone for TokenManager<C, M>
where
	C: ?Sized + OidcHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			store: self.store.clone(),
			metrics: self.metrics.clone(),
			config: self.config.clone(),
			authorizer: self.authorizer.clone(),
			resolver: self.resolver.clone(),
			flow_guards: self.flow_guards.clone(),
		}
	}
}
impl<C, M> Debug for TokenManager<C, M>
where
	C: ?Sized + OidcHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("client_id", &self.config.client_id)
			.field("domain", &self.config.domain)
			.field("openid_config_cached", &self.resolver.cached().is_some())
			.finish()
	}
}
