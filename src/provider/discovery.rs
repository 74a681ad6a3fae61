//! OpenID configuration discovery with a single-flight, per-resolver memo.

// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	http::{self, Endpoint, OidcHttpClient},
	oauth::{self, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::OpenIdConfig,
};

/// Fetches `https://{domain}/.well-known/openid-configuration.json` at most once.
///
/// Concurrent first callers share one in-flight request. A failed fetch is not cached,
/// so the next caller-initiated [`resolve`](Self::resolve) tries again.
pub struct OpenIdConfigResolver<C, M>
where
	C: ?Sized + OidcHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	discovery_url: Url,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	cached: OnceCell<OpenIdConfig>,
}
impl<C, M> OpenIdConfigResolver<C, M>
where
	C: ?Sized + OidcHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a resolver for the configured provider domain.
	pub fn new(
		config: &ClientConfig,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		Ok(Self {
			discovery_url: config.discovery_url()?,
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
			cached: OnceCell::new(),
		})
	}

	/// URL the discovery document is fetched from.
	pub fn discovery_url(&self) -> &Url {
		&self.discovery_url
	}

	/// Returns the memoized document, fetching it on first use.
	pub async fn resolve(&self) -> Result<&OpenIdConfig> {
		self.cached.get_or_try_init(|| self.fetch()).await
	}

	/// Returns the document if a previous [`resolve`](Self::resolve) succeeded.
	pub fn cached(&self) -> Option<&OpenIdConfig> {
		self.cached.get()
	}

	async fn fetch(&self) -> Result<OpenIdConfig> {
		const KIND: FlowKind = FlowKind::Discovery;

		let span = FlowSpan::new(KIND, "resolve");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = oauth::get_request(&self.discovery_url, None)?;
				let response = oauth::dispatch(
					self.http_client.as_ref(),
					self.error_mapper.as_ref(),
					Endpoint::Discovery,
					request,
				)
				.await?;
				let status = response.status();

				if !status.is_success() {
					return Err(Error::Discovery {
						status: status.as_u16(),
						status_text: http::status_text(status),
					});
				}

				oauth::parse_json::<OpenIdConfig>(Endpoint::Discovery, response.body())
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}
}
impl<C, M> Debug for OpenIdConfigResolver<C, M>
where
	C: ?Sized + OidcHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OpenIdConfigResolver")
			.field("discovery_url", &self.discovery_url.as_str())
			.field("cached", &self.cached.get())
			.finish()
	}
}
