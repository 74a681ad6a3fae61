//! Interactive Authorization Code + PKCE: authorize URL, redirect capability, code extraction.
//!
//! The login/consent UI is an external capability modelled by [`RedirectFlow`]: it receives
//! the authorize URL and resolves to the URL the provider redirected back to. The
//! [`InteractiveAuthorizer`] builds that URL with a fresh [`PkcePair`], drives the
//! capability, and turns the redirect into an [`AuthorizationGrant`] ready for the code
//! exchange.

pub mod pkce;

pub use pkce::*;

// self
use crate::{
	_prelude::*,
	auth::PrincipalId,
	config::{ClientConfig, WebAuthFlowOptions},
	error::InteractionError,
	oauth::{self, Params},
	provider::OpenIdConfig,
};

/// Boxed future returned by [`RedirectFlow::launch`].
pub type RedirectFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Url, InteractionError>> + 'a + Send>>;

/// External "browser redirect flow" capability.
///
/// Implementations open `request.authorize_url`, wait for the provider to redirect to
/// `request.redirect_uri`, and resolve to the full redirect URL (query included). User
/// cancellation or any UI failure resolves to an [`InteractionError`].
pub trait RedirectFlow
where
	Self: Send + Sync,
{
	/// Navigates to the authorize URL and returns the final redirect URL.
	fn launch<'a>(&'a self, request: &'a RedirectRequest) -> RedirectFuture<'a>;
}

/// Everything a [`RedirectFlow`] needs for one authorization attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectRequest {
	/// Fully-formed authorize URL.
	pub authorize_url: Url,
	/// Redirect URI the provider will send the user back to.
	pub redirect_uri: Url,
	/// Options configured for the capability.
	pub options: WebAuthFlowOptions,
}

/// Authorization code paired with the PKCE verifier generated for the same attempt.
#[derive(Clone)]
pub struct AuthorizationGrant {
	/// Code returned on the redirect.
	pub code: String,
	verifier: String,
}
impl AuthorizationGrant {
	/// PKCE verifier to send with the code exchange.
	pub fn verifier(&self) -> &str {
		&self.verifier
	}
}
impl Debug for AuthorizationGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationGrant")
			.field("code", &"<redacted>")
			.field("verifier", &"<redacted>")
			.finish()
	}
}

/// Drives the interactive half of the Authorization Code + PKCE flow.
#[derive(Clone)]
pub struct InteractiveAuthorizer {
	redirect_flow: Arc<dyn RedirectFlow>,
}
impl InteractiveAuthorizer {
	/// Wraps the external redirect capability.
	pub fn new(redirect_flow: Arc<dyn RedirectFlow>) -> Self {
		Self { redirect_flow }
	}

	/// Runs one authorization attempt for `principal` and returns the code + verifier.
	///
	/// Extra parameters (scope, audience, prompt hints, ...) are appended to the authorize
	/// URL; a duplicate key replaces the earlier value.
	pub async fn authorize(
		&self,
		openid: &OpenIdConfig,
		client: &ClientConfig,
		principal: &PrincipalId,
		extra_params: &[(String, String)],
	) -> Result<AuthorizationGrant> {
		let pkce = PkcePair::generate();
		let request = RedirectRequest {
			authorize_url: build_authorize_url(
				openid,
				&client.redirect_uri,
				principal,
				&pkce,
				extra_params,
			)?,
			redirect_uri: client.redirect_uri.clone(),
			options: client.web_auth_flow,
		};
		let redirect = self.redirect_flow.launch(&request).await?;
		let code = extract_code(&redirect)?;

		Ok(AuthorizationGrant { code, verifier: pkce.into_verifier() })
	}
}
impl Debug for InteractiveAuthorizer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("InteractiveAuthorizer(..)")
	}
}

/// Builds `{authorization_endpoint}?redirect_uri&client_id&code_challenge&code_challenge_method&response_type`
/// followed by `extra_params`.
pub fn build_authorize_url(
	openid: &OpenIdConfig,
	redirect_uri: &Url,
	principal: &PrincipalId,
	pkce: &PkcePair,
	extra_params: &[(String, String)],
) -> Result<Url> {
	let mut url = openid.authorization_url()?;
	let mut params: Params = vec![
		("redirect_uri".into(), redirect_uri.to_string()),
		("client_id".into(), principal.to_string()),
		("code_challenge".into(), pkce.challenge().to_owned()),
		("code_challenge_method".into(), pkce.method().as_str().to_owned()),
		("response_type".into(), "code".into()),
	];

	oauth::merge_params(&mut params, extra_params);
	url.query_pairs_mut().extend_pairs(&params);

	Ok(url)
}

/// Pulls the authorization code out of a redirect URL.
///
/// An `error` parameter wins over `code` and becomes [`Error::AuthorizationDenied`]
/// (reason = `error_description`, falling back to the raw code); a redirect with neither
/// is [`Error::MissingCode`].
pub fn extract_code(redirect: &Url) -> Result<String> {
	let param = |name: &str| {
		redirect
			.query_pairs()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.into_owned())
			.filter(|value| !value.is_empty())
	};

	if let Some(error) = param("error") {
		let reason = param("error_description").unwrap_or_else(|| error.clone());

		return Err(Error::AuthorizationDenied { error, reason });
	}

	param("code").ok_or(Error::MissingCode)
}
