// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::Arc,
};
// crates.io
use parking_lot::Mutex;
use serde_json::json;
use url::Url;
// self
use oidc_token_manager::{
	auth::{AccessTokenRecord, PrincipalId},
	config::ClientConfig,
	error::{ConfigError, Error, InteractionError, TransportError},
	flows::{RedirectFlow, RedirectFuture, RedirectRequest, TokenManager},
	http::{Endpoint, OidcHttpClient, ResponseMetadata, ResponseMetadataSlot},
	oauth::{
		TransportErrorMapper,
		oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http},
	},
	store::MemoryStore,
};

type Route = dyn Fn(&HttpRequest) -> Result<HttpResponse, FakeTransportError> + Send + Sync;

#[derive(Debug)]
enum FakeTransportError {
	Unreachable,
}
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Unreachable => write!(f, "Upstream unreachable."),
		}
	}
}
impl StdError for FakeTransportError {}

/// Transport that answers from a routing closure and records every request it sees.
#[derive(Clone)]
struct FakeHttpClient {
	route: Arc<Route>,
	seen: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}
impl FakeHttpClient {
	fn new(
		route: impl Fn(&HttpRequest) -> Result<HttpResponse, FakeTransportError> + Send + Sync + 'static,
	) -> Self {
		Self { route: Arc::new(route), seen: Default::default() }
	}

	fn seen(&self) -> Vec<(String, Vec<u8>)> {
		self.seen.lock().clone()
	}
}
impl OidcHttpClient for FakeHttpClient {
	type Handle = FakeHttpHandle;
	type TransportError = FakeTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		FakeHttpHandle { slot, client: self.clone() }
	}
}

struct FakeHttpHandle {
	slot: ResponseMetadataSlot,
	client: FakeHttpClient,
}
impl<'a> AsyncHttpClient<'a> for FakeHttpHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			assert!(
				self.slot.take().is_none(),
				"ResponseMetadataSlot must be clear before dispatching a request."
			);

			self.client.seen.lock().push((request.uri().path().to_owned(), request.body().clone()));

			match (self.client.route)(&request) {
				Ok(response) => {
					self.slot.store(ResponseMetadata::from_parts(
						response.status(),
						response.headers(),
					));

					Ok(response)
				},
				Err(err) => {
					self.slot.store(ResponseMetadata { status: Some(502), date: None });

					Err(HttpClientError::Reqwest(Box::new(err)))
				},
			}
		})
	}
}

#[derive(Clone, Default)]
struct RecordingTransportErrorMapper {
	calls: Arc<Mutex<Vec<(Endpoint, Option<ResponseMetadata>)>>>,
}
impl RecordingTransportErrorMapper {
	fn recorded(&self) -> Vec<(Endpoint, Option<u16>)> {
		self.calls
			.lock()
			.iter()
			.map(|(endpoint, meta)| (*endpoint, meta.as_ref().and_then(|value| value.status)))
			.collect()
	}
}
impl TransportErrorMapper<FakeTransportError> for RecordingTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<FakeTransportError>,
	) -> Error {
		let status = meta.and_then(|value| value.status);

		self.calls.lock().push((endpoint, meta.cloned()));

		match err {
			HttpClientError::Reqwest(inner) =>
				TransportError::Other { endpoint, message: format!("Fake transport error: {inner}"), status }
					.into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(source) => TransportError::Io { endpoint, source }.into(),
			other => TransportError::Other {
				endpoint,
				message: format!("Unhandled HTTP client error variant: {other:?}"),
				status,
			}
			.into(),
		}
	}
}

struct NoLogin;
impl RedirectFlow for NoLogin {
	fn launch<'a>(&'a self, _: &'a RedirectRequest) -> RedirectFuture<'a> {
		Box::pin(async { Err(InteractionError::failed("no browser available")) })
	}
}

fn principal(value: &str) -> PrincipalId {
	PrincipalId::new(value).expect("Principal fixture should be valid.")
}

fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
	http::Response::builder()
		.status(status)
		.header(http::header::CONTENT_TYPE, "application/json")
		.header(http::header::DATE, "Wed, 01 Jan 2025 00:00:00 GMT")
		.body(body.to_string().into_bytes())
		.expect("Fake response should build.")
}

fn build_manager(
	client: FakeHttpClient,
	mapper: Arc<RecordingTransportErrorMapper>,
) -> (TokenManager<FakeHttpClient, RecordingTransportErrorMapper>, Arc<MemoryStore>) {
	let config = ClientConfig::builder(principal("app-client"), "idp.example")
		.redirect_uri(
			Url::parse("https://abc.chromiumapp.org/auth0").expect("Redirect URI should parse."),
		)
		.build()
		.expect("Client configuration fixture should build.");
	let store = Arc::new(MemoryStore::default());
	let manager =
		TokenManager::with_http_client(config, store.clone(), Arc::new(NoLogin), client, mapper)
			.expect("Token manager fixture should build.");

	(manager, store)
}

#[tokio::test]
async fn transport_failures_reach_the_mapper_with_metadata() {
	let client = FakeHttpClient::new(|_| Err(FakeTransportError::Unreachable));
	let mapper = Arc::new(RecordingTransportErrorMapper::default());
	let (manager, store) = build_manager(client.clone(), mapper.clone());
	let err = manager.authenticate(&[]).await.expect_err("Unreachable provider should fail.");

	match err {
		Error::Transport(TransportError::Other { endpoint, status, message }) => {
			assert_eq!(endpoint, Endpoint::Discovery);
			assert_eq!(status, Some(502));
			assert!(message.contains("Upstream unreachable."));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert_eq!(mapper.recorded(), [(Endpoint::Discovery, Some(502))]);
	assert_eq!(client.seen().len(), 1);
	assert!(store.is_empty());
}

#[tokio::test]
async fn custom_transport_drives_discovery_and_refresh() {
	let client = FakeHttpClient::new(|request| match request.uri().path() {
		"/.well-known/openid-configuration.json" => Ok(json_response(
			200,
			json!({
				"authorization_endpoint": "https://idp.example/authorize",
				"token_endpoint": "https://idp.example/oauth/token",
			}),
		)),
		"/oauth/token" => Ok(json_response(
			200,
			json!({ "access_token": "a1", "expires_in": 3600, "refresh_token": "r2" }),
		)),
		_ => Err(FakeTransportError::Unreachable),
	});
	let mapper = Arc::new(RecordingTransportErrorMapper::default());
	let (manager, _store) = build_manager(client.clone(), mapper.clone());
	let expired = AccessTokenRecord::builder()
		.access_token("a0")
		.access_token_date(time::macros::datetime!(2024-12-31 00:00 UTC))
		.expires_in(3600)
		.refresh_token("r1")
		.build()
		.expect("Record fixture should build.");

	manager
		.store
		.put(&principal("app-client"), expired)
		.await
		.expect("Seeding the record store should succeed.");

	let record = manager.authenticate(&[]).await.expect("Refresh should succeed.");

	assert_eq!(record.access_token.expose(), "a1");
	assert_eq!(record.refresh_token.as_ref().map(|token| token.expose()), Some("r2"));
	assert_eq!(record.access_token_date, time::macros::datetime!(2025-01-01 00:00 UTC));
	assert!(mapper.recorded().is_empty());
	assert_eq!(
		client.seen(),
		[
			("/.well-known/openid-configuration.json".to_owned(), Vec::new()),
			(
				"/oauth/token".to_owned(),
				b"grant_type=refresh_token&refresh_token=r1&client_id=app-client".to_vec()
			),
		]
	);
}
