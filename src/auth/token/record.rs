//! Cached access token records, expiry helpers, and builders.

// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError};
// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Current lifecycle status for a token record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token is within its lifetime.
	Active,
	/// Token reached `access_token_date + expires_in`.
	Expired,
}

/// Errors produced by [`AccessTokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum AccessTokenRecordBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no lifetime was configured.
	#[error("Token lifetime must be supplied via expires_in.")]
	MissingExpiresIn,
}

/// Cached credential state for one principal.
///
/// The serialized form (camelCase JSON, `accessTokenDate` as epoch milliseconds) is the
/// blob written to the external key-value store. Records are replaced wholesale on
/// every persist, never merged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenRecord {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Issuance instant, from the token response `Date` header or the local clock.
	#[serde(with = "epoch_millis")]
	pub access_token_date: OffsetDateTime,
	/// Lifetime in seconds counted from `access_token_date`.
	pub expires_in: u64,
	/// Token type reported by the provider (usually `Bearer`).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_type: Option<String>,
	/// Space-delimited scope string reported by the provider.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
	/// Token type URN reported for delegated tokens.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub issued_token_type: Option<String>,
	/// Refresh token secret, if the provider issued one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// OpenID Connect ID token, if the provider issued one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id_token: Option<TokenSecret>,
}
impl AccessTokenRecord {
	/// Returns a builder for constructing records.
	pub fn builder() -> AccessTokenRecordBuilder {
		AccessTokenRecordBuilder::default()
	}

	/// Lifetime as a [`Duration`], saturating on absurd `expires_in` values.
	pub fn lifetime(&self) -> Duration {
		i64::try_from(self.expires_in).map(Duration::seconds).unwrap_or(Duration::MAX)
	}

	/// Expiry instant, or `None` if it falls outside the representable range.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.access_token_date.checked_add(self.lifetime())
	}

	/// Computes the lifecycle status at a given instant.
	///
	/// A record is expired iff `instant - access_token_date >= expires_in` seconds.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant - self.access_token_date >= self.lifetime() {
			TokenStatus::Expired
		} else {
			TokenStatus::Active
		}
	}

	/// Returns `true` if the record has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Returns `true` if the record is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the record can be renewed through the refresh grant.
	pub fn can_refresh(&self) -> bool {
		self.refresh_token.is_some()
	}
}
impl Debug for AccessTokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessTokenRecord")
			.field("access_token", &"<redacted>")
			.field("access_token_date", &self.access_token_date)
			.field("expires_in", &self.expires_in)
			.field("token_type", &self.token_type)
			.field("scope", &self.scope)
			.field("issued_token_type", &self.issued_token_type)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Builder for [`AccessTokenRecord`].
#[derive(Clone, Debug, Default)]
pub struct AccessTokenRecordBuilder {
	access_token: Option<TokenSecret>,
	access_token_date: Option<OffsetDateTime>,
	expires_in: Option<u64>,
	token_type: Option<String>,
	scope: Option<String>,
	issued_token_type: Option<String>,
	refresh_token: Option<TokenSecret>,
	id_token: Option<TokenSecret>,
}
impl AccessTokenRecordBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the issuance instant (defaults to the local clock).
	pub fn access_token_date(mut self, instant: OffsetDateTime) -> Self {
		self.access_token_date = Some(instant);

		self
	}

	/// Sets the lifetime in seconds.
	pub fn expires_in(mut self, seconds: u64) -> Self {
		self.expires_in = Some(seconds);

		self
	}

	/// Sets the token type.
	pub fn token_type(mut self, value: impl Into<String>) -> Self {
		self.token_type = Some(value.into());

		self
	}

	/// Sets the granted scope string.
	pub fn scope(mut self, value: impl Into<String>) -> Self {
		self.scope = Some(value.into());

		self
	}

	/// Sets the issued token type URN.
	pub fn issued_token_type(mut self, value: impl Into<String>) -> Self {
		self.issued_token_type = Some(value.into());

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the ID token value.
	pub fn id_token(mut self, token: impl Into<String>) -> Self {
		self.id_token = Some(TokenSecret::new(token));

		self
	}

	/// Consumes the builder and produces an [`AccessTokenRecord`].
	///
	/// The issuance instant is clamped to "now" and truncated to millisecond precision,
	/// matching what the persisted form can represent.
	pub fn build(self) -> Result<AccessTokenRecord, AccessTokenRecordBuilderError> {
		let access_token =
			self.access_token.ok_or(AccessTokenRecordBuilderError::MissingAccessToken)?;
		let expires_in = self.expires_in.ok_or(AccessTokenRecordBuilderError::MissingExpiresIn)?;
		let now = OffsetDateTime::now_utc();
		let access_token_date = truncate_to_millis(self.access_token_date.unwrap_or(now).min(now));

		Ok(AccessTokenRecord {
			access_token,
			access_token_date,
			expires_in,
			token_type: self.token_type,
			scope: self.scope,
			issued_token_type: self.issued_token_type,
			refresh_token: self.refresh_token,
			id_token: self.id_token,
		})
	}
}

fn truncate_to_millis(instant: OffsetDateTime) -> OffsetDateTime {
	instant.replace_nanosecond(u32::from(instant.millisecond()) * 1_000_000).unwrap_or(instant)
}

mod epoch_millis {
	// self
	use super::*;

	pub fn serialize<S>(instant: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let millis = i64::try_from(instant.unix_timestamp_nanos() / 1_000_000)
			.map_err(serde::ser::Error::custom)?;

		serializer.serialize_i64(millis)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
	where
		D: Deserializer<'de>,
	{
		let millis = i64::deserialize(deserializer)?;

		OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
			.map_err(DeError::custom)
	}
}
