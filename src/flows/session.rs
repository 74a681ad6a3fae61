//! Session-level operations around the cached self token: presence, removal, logout,
//! and the userinfo lookup.

// crates.io
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	auth::{PrincipalId, TokenSecret},
	error::TransportError,
	flows::{TokenManager, common},
	http::{self, Endpoint, OidcHttpClient},
	oauth::{self, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Claims returned by the provider's userinfo endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
	/// Subject identifier, when the provider includes it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,
	/// Remaining claims, untouched.
	#[serde(flatten)]
	pub claims: Map<String, Value>,
}
impl UserInfo {
	/// Returns a claim by name.
	pub fn claim(&self, name: &str) -> Option<&Value> {
		self.claims.get(name)
	}
}

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + OidcHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns `true` when a record is stored for the manager's own client id.
	///
	/// Only presence is checked; an expired record still counts.
	pub async fn has_access_token(&self) -> Result<bool> {
		Ok(self.store.get(&self.config.client_id).await?.is_some())
	}

	/// Removes the cached record for `principal`. Idempotent.
	pub async fn delete_access_token(&self, principal: &PrincipalId) -> Result<()> {
		let guard = common::flow_guard(self, principal);
		let _singleflight = guard.lock().await;

		Ok(self.store.clear(principal).await?)
	}

	/// Logs the manager's own client out.
	///
	/// The self record is cleared, then every delegated subject record, each under its own
	/// guard once the self guard has been released. The provider's end-session endpoint is
	/// notified with the stored ID token and the self record is cleared once more. Only
	/// storage failures are returned; the end-session hop is best-effort and skipped without
	/// an ID token.
	pub async fn logout(&self) -> Result<()> {
		const KIND: FlowKind = FlowKind::EndSession;

		let span = FlowSpan::new(KIND, "logout");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<()> = span
			.instrument(async move {
				let own = &self.config.client_id;
				let current = {
					let guard = common::flow_guard(self, own);
					let _singleflight = guard.lock().await;
					let current = self.store.get(own).await?;

					self.store.clear(own).await?;

					current
				};

				for subject in self.store.principals().await?.iter().filter(|p| *p != own) {
					self.delete_access_token(subject).await?;
				}

				let Some(id_token) = current.and_then(|record| record.id_token) else {
					return Ok(());
				};

				if let Err(err) = self.end_session(&id_token).await {
					obs::record_swallowed_failure(KIND, &err);
				}

				self.delete_access_token(own).await
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}

	/// Fetches the userinfo claims for the manager's own client.
	///
	/// A valid self token is obtained first (possibly prompting), then sent as a bearer
	/// token to `userinfo_endpoint`.
	pub async fn user_info(&self) -> Result<UserInfo> {
		const KIND: FlowKind = FlowKind::UserInfo;

		let record = self.authenticate(&[]).await?;
		let span = FlowSpan::new(KIND, "user_info");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<UserInfo> = span
			.instrument(async move {
				let openid = self.resolver.resolve().await?;
				let request = oauth::get_request(&openid.userinfo_url()?, Some(&record.access_token))?;
				let response = oauth::dispatch(
					self.http_client.as_ref(),
					self.transport_mapper.as_ref(),
					Endpoint::UserInfo,
					request,
				)
				.await?;
				let status = response.status();

				if !status.is_success() {
					return Err(Error::UserInfo {
						status: status.as_u16(),
						status_text: http::status_text(status),
					});
				}

				oauth::parse_json::<UserInfo>(Endpoint::UserInfo, response.body())
			})
			.await;

		obs::record_flow_result(KIND, &result);

		result
	}

	async fn end_session(&self, id_token: &TokenSecret) -> Result<()> {
		let openid = self.resolver.resolve().await?;
		let mut url = openid.end_session_url()?;

		url.query_pairs_mut().append_pair("id_token_hint", id_token.expose());

		let request = oauth::get_request(&url, None)?;
		let response = oauth::dispatch(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			Endpoint::EndSession,
			request,
		)
		.await?;
		let status = response.status();

		if !status.is_success() {
			return Err(TransportError::Other {
				endpoint: Endpoint::EndSession,
				message: format!("unexpected status {}", status.as_u16()),
				status: Some(status.as_u16()),
			}
			.into());
		}

		Ok(())
	}
}
