//! Token endpoint client: request construction, transport dispatch, and response normalization.
//!
//! Every provider call funnels through a single dispatch helper, which hands the request to an
//! [`OidcHttpClient`] handle and routes transport failures through a
//! [`TransportErrorMapper`]. [`TokenExchanger`] builds the three token-endpoint grants the
//! manager uses (authorization code, refresh token, RFC 8693 token exchange) as
//! `application/x-www-form-urlencoded` bodies in a stable field order and normalizes the
//! JSON response into an [`AccessTokenRecord`].

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		HeaderValue, Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde::de::DeserializeOwned;
use url::form_urlencoded::Serializer as FormSerializer;
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
use crate::{
	_prelude::*,
	auth::{AccessTokenRecord, PrincipalId, TokenSecret},
	error::{ConfigError, TransportError},
	http::{self, Endpoint, OidcHttpClient, ResponseMetadata, ResponseMetadataSlot},
	provider::{ACCESS_TOKEN_TYPE, GrantType, OpenIdConfig},
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Ordered request parameters, serialized in insertion order.
pub type Params = Vec<(String, String)>;

/// Maps HTTP transport failures into manager [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a manager error.
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(endpoint, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(source) => TransportError::Io { endpoint, source }.into(),
			HttpClientError::Other(message) =>
				TransportError::Other { endpoint, message, status: meta_status(meta) }.into(),
			_ => TransportError::Other {
				endpoint,
				message: "unrecognized transport failure".into(),
				status: meta_status(meta),
			}
			.into(),
		}
	}
}

/// Issues token-endpoint grants against a resolved provider configuration.
pub struct TokenExchanger<C, M>
where
	C: ?Sized + OidcHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	token_endpoint: Url,
	redirect_uri: Url,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> TokenExchanger<C, M>
where
	C: ?Sized + OidcHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds an exchanger for the provider's `token_endpoint`.
	pub fn new(
		config: &OpenIdConfig,
		redirect_uri: &Url,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		Ok(Self {
			token_endpoint: config.token_url()?,
			redirect_uri: redirect_uri.clone(),
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
		})
	}

	/// Token endpoint every grant is posted to.
	pub fn token_endpoint(&self) -> &Url {
		&self.token_endpoint
	}

	/// Redeems an authorization code together with its PKCE verifier.
	pub async fn exchange_code(
		&self,
		client_id: &PrincipalId,
		code: &str,
		code_verifier: &str,
	) -> Result<AccessTokenRecord> {
		let params = vec![
			pair("grant_type", GrantType::AuthorizationCode.as_str()),
			pair("code", code),
			pair("code_verifier", code_verifier),
			pair("client_id", client_id.as_str()),
			pair("redirect_uri", self.redirect_uri.as_str()),
		];

		self.request_token(GrantType::AuthorizationCode, &params).await
	}

	/// Rotates a refresh token into a fresh record (the old record is not merged in).
	pub async fn refresh(
		&self,
		client_id: &PrincipalId,
		refresh_token: &TokenSecret,
	) -> Result<AccessTokenRecord> {
		let params = vec![
			pair("grant_type", GrantType::RefreshToken.as_str()),
			pair("refresh_token", refresh_token.expose()),
			pair("client_id", client_id.as_str()),
		];

		self.request_token(GrantType::RefreshToken, &params).await
	}

	/// Trades the manager's own access token for one scoped to `audience`.
	pub async fn exchange_subject_token(
		&self,
		client_id: &PrincipalId,
		audience: &PrincipalId,
		subject_token: &TokenSecret,
		extra_params: &[(String, String)],
	) -> Result<AccessTokenRecord> {
		let mut params = vec![
			pair("grant_type", GrantType::TokenExchange.as_str()),
			pair("client_id", client_id.as_str()),
			pair("audience", audience.as_str()),
			pair("subject_token", subject_token.expose()),
			pair("subject_token_type", ACCESS_TOKEN_TYPE),
		];

		merge_params(&mut params, extra_params);

		self.request_token(GrantType::TokenExchange, &params).await
	}

	async fn request_token(
		&self,
		grant: GrantType,
		params: &[(String, String)],
	) -> Result<AccessTokenRecord> {
		let request = form_request(&self.token_endpoint, params)?;
		let response = dispatch(
			self.http_client.as_ref(),
			self.error_mapper.as_ref(),
			Endpoint::Token,
			request,
		)
		.await?;

		normalize_token_response(grant, &response)
	}
}
impl<C, M> Debug for TokenExchanger<C, M>
where
	C: ?Sized + OidcHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchanger")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("redirect_uri", &self.redirect_uri.as_str())
			.finish()
	}
}

#[derive(Deserialize)]
struct TokenResponseBody {
	access_token: String,
	expires_in: u64,
	#[serde(default)]
	token_type: Option<String>,
	#[serde(default)]
	scope: Option<String>,
	#[serde(default)]
	issued_token_type: Option<String>,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	id_token: Option<String>,
}

/// Converts a token-endpoint response into an [`AccessTokenRecord`].
///
/// Non-success statuses become [`Error::TokenEndpoint`] without inspecting the body. The
/// issuance date comes from the `Date` response header when present and parseable, and
/// falls back to the local clock otherwise.
pub fn normalize_token_response(
	grant: GrantType,
	response: &HttpResponse,
) -> Result<AccessTokenRecord> {
	let status = response.status();

	if !status.is_success() {
		return Err(Error::TokenEndpoint {
			grant,
			status: status.as_u16(),
			status_text: http::status_text(status),
		});
	}

	let body: TokenResponseBody = parse_json(Endpoint::Token, response.body())?;
	let issued_at = http::response_date(response.headers()).unwrap_or_else(OffsetDateTime::now_utc);
	let mut builder = AccessTokenRecord::builder()
		.access_token(body.access_token)
		.access_token_date(issued_at)
		.expires_in(body.expires_in);

	if let Some(value) = body.token_type {
		builder = builder.token_type(value);
	}
	if let Some(value) = body.scope {
		builder = builder.scope(value);
	}
	if let Some(value) = body.issued_token_type {
		builder = builder.issued_token_type(value);
	}
	if let Some(value) = body.refresh_token {
		builder = builder.refresh_token(value);
	}
	if let Some(value) = body.id_token {
		builder = builder.id_token(value);
	}

	builder.build().map_err(|err| ConfigError::from(err).into())
}

/// Merges `extra` into `params`: an existing key is replaced in place, new keys append.
pub fn merge_params(params: &mut Params, extra: &[(String, String)]) {
	for (key, value) in extra {
		match params.iter_mut().find(|(existing, _)| existing == key) {
			Some(slot) => slot.1 = value.clone(),
			None => params.push((key.clone(), value.clone())),
		}
	}
}

/// Sends a request through a metadata-instrumented transport handle.
pub(crate) async fn dispatch<C, M>(
	http_client: &C,
	mapper: &M,
	endpoint: Endpoint,
	request: HttpRequest,
) -> Result<HttpResponse>
where
	C: ?Sized + OidcHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let slot = ResponseMetadataSlot::default();
	let handle = http_client.with_metadata(slot.clone());

	handle
		.call(request)
		.await
		.map_err(|err| mapper.map_transport_error(endpoint, slot.take().as_ref(), err))
}

/// Builds a form-encoded `POST` with parameters in the given order.
pub(crate) fn form_request(url: &Url, params: &[(String, String)]) -> Result<HttpRequest> {
	let body = FormSerializer::new(String::new()).extend_pairs(params).finish();

	Request::builder()
		.method(Method::POST)
		.uri(url.as_str())
		.header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
		.header(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE))
		.body(body.into_bytes())
		.map_err(|err| ConfigError::from(err).into())
}

/// Builds a `GET`, optionally carrying a bearer token.
pub(crate) fn get_request(url: &Url, bearer: Option<&TokenSecret>) -> Result<HttpRequest> {
	let mut builder = Request::builder()
		.method(Method::GET)
		.uri(url.as_str())
		.header(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));

	if let Some(token) = bearer {
		builder = builder.header(AUTHORIZATION, format!("Bearer {}", token.expose()));
	}

	builder.body(Vec::new()).map_err(|err| ConfigError::from(err).into())
}

/// Deserializes a JSON body with path-aware error reporting.
pub(crate) fn parse_json<T>(endpoint: Endpoint, body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::MalformedResponse { endpoint, source })
}

fn pair(key: &str, value: &str) -> (String, String) {
	(key.to_owned(), value.to_owned())
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(endpoint: Endpoint, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::http_client_build(err).into();
	}

	TransportError::network(endpoint, err).into()
}

#[cfg(feature = "reqwest")]
fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

#[cfg(feature = "reqwest")]
impl TokenExchanger<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Builds an exchanger backed by a default reqwest client.
	pub fn with_reqwest(config: &OpenIdConfig, redirect_uri: &Url) -> Result<Self> {
		Self::new(config, redirect_uri, ReqwestHttpClient::default(), ReqwestTransportErrorMapper)
	}
}
