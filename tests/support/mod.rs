//! Fixtures shared by the reqwest-backed integration tests.

#![allow(dead_code, unused_imports)]

// std
pub use std::sync::Arc;
// crates.io
pub use httpmock::prelude::*;
pub use parking_lot::Mutex;
pub use serde_json::json;
pub use time::{Duration, OffsetDateTime};
pub use url::Url;
// self
pub use oidc_token_manager::{
	auth::{AccessTokenRecord, PrincipalId},
	config::{ClientConfig, ClientConfigBuilder},
	error::{ConfigError, Error, InteractionError},
	flows::{RedirectFlow, RedirectFuture, RedirectRequest, ReqwestTokenManager, TokenManager},
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	provider::GrantType,
	store::MemoryStore,
};

pub const CLIENT_ID: &str = "app-client";
pub const REDIRECT_URI: &str = "https://abc.chromiumapp.org/auth0";
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration.json";

type Responder = Box<dyn Fn(&RedirectRequest) -> Result<Url, InteractionError> + Send + Sync>;

/// Builds a reqwest transport that accepts the self-signed certificates served by httpmock.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

pub fn principal(value: &str) -> PrincipalId {
	PrincipalId::new(value).expect("Principal fixture should be valid.")
}

/// Provider authority served by the mock server. Discovery always runs over HTTPS.
pub fn domain(server: &MockServer) -> String {
	format!("localhost:{}", server.port())
}

pub fn https_url(server: &MockServer, path: &str) -> String {
	format!("https://{}{path}", domain(server))
}

/// Registers the discovery document pointing every endpoint back at `server`.
pub async fn mock_discovery(server: &MockServer) -> httpmock::Mock<'_> {
	let document = json!({
		"authorization_endpoint": https_url(server, "/authorize"),
		"token_endpoint": https_url(server, "/token"),
		"userinfo_endpoint": https_url(server, "/userinfo"),
		"end_session_endpoint": https_url(server, "/logout"),
	});

	server
		.mock_async(|when, then| {
			when.method(GET).path(DISCOVERY_PATH);
			then.status(200).header("content-type", "application/json").json_body(document.clone());
		})
		.await
}

/// Record issued `age` ago with a one hour lifetime.
pub fn record_aged(access: &str, age: Duration, refresh: Option<&str>) -> AccessTokenRecord {
	let mut builder = AccessTokenRecord::builder()
		.access_token(access)
		.access_token_date(OffsetDateTime::now_utc() - age)
		.expires_in(3600)
		.token_type("Bearer");

	if let Some(refresh) = refresh {
		builder = builder.refresh_token(refresh);
	}

	builder.build().expect("Record fixture should build.")
}

pub fn fresh_record(access: &str) -> AccessTokenRecord {
	record_aged(access, Duration::minutes(5), None)
}

pub fn expired_record(access: &str, refresh: Option<&str>) -> AccessTokenRecord {
	record_aged(access, Duration::hours(2), refresh)
}

/// Redirect capability that answers from a closure and remembers every launch.
pub struct ScriptedRedirectFlow {
	launches: Mutex<Vec<RedirectRequest>>,
	respond: Responder,
}
impl ScriptedRedirectFlow {
	pub fn new(
		respond: impl Fn(&RedirectRequest) -> Result<Url, InteractionError> + Send + Sync + 'static,
	) -> Self {
		Self { launches: Mutex::new(Vec::new()), respond: Box::new(respond) }
	}

	/// Redirects back with `?code={code}`.
	pub fn returning_code(code: &str) -> Self {
		let code = code.to_owned();

		Self::new(move |request| {
			let mut url = request.redirect_uri.clone();

			url.query_pairs_mut().append_pair("code", &code);

			Ok(url)
		})
	}

	/// Redirects back with an OAuth error.
	pub fn denying(error: &str, description: &str) -> Self {
		let (error, description) = (error.to_owned(), description.to_owned());

		Self::new(move |request| {
			let mut url = request.redirect_uri.clone();

			url.query_pairs_mut()
				.append_pair("error", &error)
				.append_pair("error_description", &description);

			Ok(url)
		})
	}

	/// Simulates the user closing the login window.
	pub fn cancelled() -> Self {
		Self::new(|_| Err(InteractionError::Cancelled))
	}

	pub fn launches(&self) -> Vec<RedirectRequest> {
		self.launches.lock().clone()
	}

	pub fn launch_count(&self) -> usize {
		self.launches.lock().len()
	}
}
impl RedirectFlow for ScriptedRedirectFlow {
	fn launch<'a>(&'a self, request: &'a RedirectRequest) -> RedirectFuture<'a> {
		Box::pin(async move {
			self.launches.lock().push(request.clone());

			(self.respond)(request)
		})
	}
}

pub struct Harness {
	pub manager: ReqwestTokenManager,
	pub store: Arc<MemoryStore>,
	pub redirect: Arc<ScriptedRedirectFlow>,
}

pub fn harness(server: &MockServer, redirect: ScriptedRedirectFlow) -> Harness {
	harness_with(redirect, ClientConfig::builder(principal(CLIENT_ID), domain(server)))
}

pub fn harness_with(redirect: ScriptedRedirectFlow, config: ClientConfigBuilder) -> Harness {
	let config = config
		.redirect_uri(Url::parse(REDIRECT_URI).expect("Redirect URI fixture should parse."))
		.build()
		.expect("Client configuration fixture should build.");
	let store = Arc::new(MemoryStore::default());
	let redirect = Arc::new(redirect);
	let manager = ReqwestTokenManager::with_http_client(
		config,
		store.clone(),
		redirect.clone(),
		test_reqwest_http_client(),
		Arc::new(ReqwestTransportErrorMapper),
	)
	.expect("Token manager fixture should build.");

	Harness { manager, store, redirect }
}

/// Seeds a record for `principal` through the manager's record façade.
pub async fn seed(harness: &Harness, principal_id: &str, record: AccessTokenRecord) {
	harness
		.manager
		.store
		.put(&principal(principal_id), record)
		.await
		.expect("Seeding the record store should succeed.");
}

pub async fn stored(harness: &Harness, principal_id: &str) -> Option<AccessTokenRecord> {
	harness
		.manager
		.store
		.get(&principal(principal_id))
		.await
		.expect("Reading the record store should succeed.")
}
