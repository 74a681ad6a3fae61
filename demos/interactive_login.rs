//! Interactive Authorization Code + PKCE walkthrough against any OpenID Connect provider.
//!
//! The demo prints the authorize URL, waits for the user to paste the URL the provider
//! redirected to, caches the resulting record in a JSON file, and optionally exchanges the
//! client's token for a subject audience and fetches the userinfo claims. Running it twice
//! shows the cached record being reused (or refreshed) instead of prompting again.

// std
use std::{
	env,
	io::{self, Write},
	sync::Arc,
};
// crates.io
use color_eyre::Result;
use url::Url;
// self
use oidc_token_manager::{
	auth::PrincipalId,
	config::ClientConfig,
	error::InteractionError,
	flows::{RedirectFlow, RedirectFuture, RedirectRequest, ReqwestTokenManager},
	store::FileStore,
};

/// Redirect capability that lets a human play the browser.
struct TerminalRedirectFlow;
impl RedirectFlow for TerminalRedirectFlow {
	fn launch<'a>(&'a self, request: &'a RedirectRequest) -> RedirectFuture<'a> {
		Box::pin(async move {
			println!("Open this URL in a browser and sign in:\n\n{}\n", request.authorize_url);
			println!("The provider will redirect to {}.", request.redirect_uri);

			let pasted = prompt_optional("Paste the full redirect URL (leave blank to cancel)")
				.map_err(|e| InteractionError::failed(e.to_string()))?;
			let Some(pasted) = pasted else {
				return Err(InteractionError::Cancelled);
			};

			Url::parse(&pasted).map_err(|e| InteractionError::failed(e.to_string()))
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let domain = prompt_with_default("Provider domain", Some("login.example.com"))?;
	let client_id = prompt_with_default("Client id", Some("demo-client"))?;
	let redirect_uri =
		prompt_with_default("Registered redirect URI", Some("https://app.example.com/callback"))?;
	let scope = prompt_with_default("Scope", Some("openid profile offline_access"))?;
	let config = ClientConfig::builder(PrincipalId::new(client_id)?, domain)
		.redirect_uri(Url::parse(&redirect_uri)?)
		.client_auth_param("scope", scope)
		.build()?;
	let store_path = env::temp_dir().join("oidc_token_manager_demo.json");
	let store = Arc::new(FileStore::open(&store_path)?);
	let manager = ReqwestTokenManager::new(config, store, Arc::new(TerminalRedirectFlow))?;

	println!("Caching records in {}.", store_path.display());

	let record = manager.authenticate(&[]).await?;

	println!("Access token expires at {:?}.", record.expires_at());
	println!(
		"Refresh token {}.",
		if record.can_refresh() { "issued" } else { "not issued" }
	);

	if let Some(audience) = prompt_optional("Subject audience to exchange for (leave blank to skip)")? {
		let delegated = manager.subject_access_token(&PrincipalId::new(audience)?, &[]).await?;

		println!(
			"Delegated token type: {}.",
			delegated.issued_token_type.as_deref().unwrap_or("unspecified")
		);
	}

	match manager.user_info().await {
		Ok(info) => println!("Signed in as {}.", info.sub.as_deref().unwrap_or("<no subject>")),
		Err(e) => eprintln!("Userinfo lookup failed: {e}."),
	}

	if prompt_optional("Type `logout` to clear the session")?.as_deref() == Some("logout") {
		manager.logout().await?;

		println!("Session cleared.");
	}

	Ok(())
}

fn prompt_with_default(message: &str, default: Option<&str>) -> Result<String> {
	loop {
		if let Some(value) = default {
			print!("{message} [{value}]: ");
		} else {
			print!("{message}: ");
		}

		io::stdout().flush()?;

		let mut input = String::new();

		io::stdin().read_line(&mut input)?;

		let trimmed = input.trim();

		if trimmed.is_empty() {
			if let Some(value) = default {
				return Ok(value.to_owned());
			}
		} else {
			return Ok(trimmed.to_owned());
		}
	}
}

fn prompt_optional(message: &str) -> Result<Option<String>> {
	print!("{message}: ");

	io::stdout().flush()?;

	let mut input = String::new();

	io::stdin().read_line(&mut input)?;

	let trimmed = input.trim();

	Ok((!trimmed.is_empty()).then(|| trimmed.to_owned()))
}
