//! Token lifecycle state machine shared by the self and subject principals.
//!
//! For every request the manager takes the principal's guard, reads the cached record,
//! and classifies it into a [`TokenState`]:
//!
//! - `Valid`: return the cached record, no network traffic.
//! - `ExpiredWithRefresh`: rotate through the refresh grant. A failed refresh is returned as
//!   is; falling back to re-authorization is left to the caller.
//! - `Absent` / `ExpiredNoRefresh`: run the [`AcquisitionStrategy`] (interactive login for
//!   the self principal, token exchange for subject principals).
//!
//! Every successful path persists the resulting record before returning it, including the
//! unchanged cached record.

mod metrics;

pub use metrics::LifecycleMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AccessTokenRecord, PrincipalId, TokenSecret},
	error::ConfigError,
	flows::{TokenManager, common},
	http::OidcHttpClient,
	oauth::{Params, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

type RecordFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessTokenRecord>> + 'a + Send>>;

/// Classification of the cached record for one principal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenState {
	/// Nothing is stored for the principal.
	Absent,
	/// A record is stored and has not expired.
	Valid(AccessTokenRecord),
	/// The stored record expired but carries a refresh token.
	ExpiredWithRefresh(TokenSecret),
	/// The stored record expired and cannot be refreshed.
	ExpiredNoRefresh,
}
impl TokenState {
	/// Classifies an optional cached record at `now`.
	pub fn classify(record: Option<AccessTokenRecord>, now: OffsetDateTime) -> Self {
		match record {
			None => Self::Absent,
			Some(record) if !record.is_expired_at(now) => Self::Valid(record),
			Some(AccessTokenRecord { refresh_token: Some(refresh_token), .. }) =>
				Self::ExpiredWithRefresh(refresh_token),
			Some(_) => Self::ExpiredNoRefresh,
		}
	}

	/// Returns a stable label suitable for log fields.
	pub const fn label(&self) -> &'static str {
		match self {
			Self::Absent => "absent",
			Self::Valid(_) => "valid",
			Self::ExpiredWithRefresh(_) => "expired_with_refresh",
			Self::ExpiredNoRefresh => "expired_no_refresh",
		}
	}
}

/// How to obtain a fresh record when the cache cannot be reused or refreshed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcquisitionStrategy {
	/// Interactive Authorization Code + PKCE, followed by the code exchange.
	SelfAuthenticate {
		/// Extra authorization URL parameters.
		params: Params,
	},
	/// RFC 8693 exchange of the manager's own access token.
	SubjectExchange {
		/// Extra token-exchange body parameters.
		params: Params,
	},
}

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + OidcHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a valid access token record for the manager's own client id.
	///
	/// `params` are sent after the configured `client_auth_params` on the authorize URL if
	/// an interactive login turns out to be necessary.
	pub async fn authenticate(&self, params: &[(String, String)]) -> Result<AccessTokenRecord> {
		let params = common::layered_params(&self.config.client_auth_params, params);

		self.acquire(&self.config.client_id, AcquisitionStrategy::SelfAuthenticate { params })
			.await
	}

	/// Returns a valid access token record for `subject`, exchanging the manager's own
	/// token when the cache cannot serve it.
	pub async fn subject_access_token(
		&self,
		subject: &PrincipalId,
		params: &[(String, String)],
	) -> Result<AccessTokenRecord> {
		self.acquire(subject, AcquisitionStrategy::SubjectExchange { params: params.to_vec() })
			.await
	}

	/// Runs the lifecycle state machine for `principal` under its guard.
	pub async fn acquire(
		&self,
		principal: &PrincipalId,
		strategy: AcquisitionStrategy,
	) -> Result<AccessTokenRecord> {
		if matches!(strategy, AcquisitionStrategy::SubjectExchange { .. })
			&& principal == &self.config.client_id
		{
			return Err(ConfigError::SubjectIsSelf { principal: principal.to_string() }.into());
		}

		let guard = common::flow_guard(self, principal);
		let _singleflight = guard.lock().await;
		let result: Result<AccessTokenRecord> = async {
			let current = self.store.get(principal).await?;
			let state = TokenState::classify(current, OffsetDateTime::now_utc());

			obs::record_lifecycle_decision(principal.as_str(), state.label());

			let record = match state {
				TokenState::Valid(record) => {
					self.metrics.record_cache_hit();

					record
				},
				TokenState::ExpiredWithRefresh(refresh_token) =>
					self.refresh_record(principal, &refresh_token).await?,
				TokenState::Absent | TokenState::ExpiredNoRefresh =>
					self.run_strategy(principal, &strategy).await?,
			};

			Ok(self.store.put(principal, record).await?)
		}
		.await;

		if result.is_err() {
			self.metrics.record_failure();
		}

		result
	}

	async fn refresh_record(
		&self,
		principal: &PrincipalId,
		refresh_token: &TokenSecret,
	) -> Result<AccessTokenRecord> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_record");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let openid = self.resolver.resolve().await?;

				self.exchanger(openid)?.refresh(principal, refresh_token).await
			})
			.await;

		obs::record_flow_result(KIND, &result);

		if result.is_ok() {
			self.metrics.record_refresh();
		}

		result
	}

	async fn run_strategy(
		&self,
		principal: &PrincipalId,
		strategy: &AcquisitionStrategy,
	) -> Result<AccessTokenRecord> {
		match strategy {
			AcquisitionStrategy::SelfAuthenticate { params } =>
				self.authorize_interactively(principal, params).await,
			AcquisitionStrategy::SubjectExchange { params } =>
				self.exchange_for_subject(principal, params).await,
		}
	}

	async fn authorize_interactively(
		&self,
		principal: &PrincipalId,
		params: &[(String, String)],
	) -> Result<AccessTokenRecord> {
		const KIND: FlowKind = FlowKind::AuthorizationCode;

		let span = FlowSpan::new(KIND, "authorize_interactively");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let openid = self.resolver.resolve().await?;
				let grant = self.authorizer().authorize(openid, &self.config, principal, params).await?;

				self.exchanger(openid)?.exchange_code(principal, &grant.code, grant.verifier()).await
			})
			.await;

		obs::record_flow_result(KIND, &result);

		if result.is_ok() {
			self.metrics.record_authorization();
		}

		result
	}

	async fn exchange_for_subject(
		&self,
		subject: &PrincipalId,
		params: &[(String, String)],
	) -> Result<AccessTokenRecord> {
		const KIND: FlowKind = FlowKind::TokenExchange;

		let span = FlowSpan::new(KIND, "exchange_for_subject");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let self_record = self.self_token().await?;
				let openid = self.resolver.resolve().await?;

				self.exchanger(openid)?
					.exchange_subject_token(
						&self.config.client_id,
						subject,
						&self_record.access_token,
						params,
					)
					.await
			})
			.await;

		obs::record_flow_result(KIND, &result);

		if result.is_ok() {
			self.metrics.record_exchange();
		}

		result
	}

	// Boxed so the subject flow can re-enter the state machine for the self principal.
	fn self_token(&self) -> RecordFuture<'_> {
		let params = self.config.client_auth_params.clone();

		Box::pin(
			self.acquire(&self.config.client_id, AcquisitionStrategy::SelfAuthenticate { params }),
		)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn record(expires_in: u64, refresh: Option<&str>) -> AccessTokenRecord {
		let mut builder = AccessTokenRecord::builder()
			.access_token("a1")
			.access_token_date(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(expires_in);

		if let Some(refresh) = refresh {
			builder = builder.refresh_token(refresh);
		}

		builder.build().expect("Record fixture should build.")
	}

	#[test]
	fn classify_covers_every_state() {
		let now = macros::datetime!(2025-01-01 01:00 UTC);

		assert_eq!(TokenState::classify(None, now), TokenState::Absent);
		assert!(matches!(TokenState::classify(Some(record(7200, None)), now), TokenState::Valid(_)));
		assert_eq!(
			TokenState::classify(Some(record(3600, Some("r1"))), now),
			TokenState::ExpiredWithRefresh(TokenSecret::new("r1"))
		);
		assert_eq!(TokenState::classify(Some(record(60, None)), now), TokenState::ExpiredNoRefresh);
	}

	#[test]
	fn labels_are_stable() {
		assert_eq!(TokenState::Absent.label(), "absent");
		assert_eq!(TokenState::ExpiredNoRefresh.label(), "expired_no_refresh");
	}
}
