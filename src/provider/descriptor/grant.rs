// self
use crate::_prelude::*;

/// RFC 8693 token type for access tokens, used as `subject_token_type`.
pub const ACCESS_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:access_token";

/// OAuth 2.0 grant types the manager sends to the token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GrantType {
	/// Authorization Code grant (always with PKCE).
	AuthorizationCode,
	/// Refresh Token grant.
	RefreshToken,
	/// RFC 8693 token exchange used to reach subject principals.
	TokenExchange,
}
impl GrantType {
	/// Returns the `grant_type` form value for the grant.
	pub fn as_str(self) -> &'static str {
		match self {
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::RefreshToken => "refresh_token",
			GrantType::TokenExchange => "urn:ietf:params:oauth:grant-type:token-exchange",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
