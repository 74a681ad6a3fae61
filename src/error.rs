//! Manager-level error types shared across flows, discovery, transports, and stores.

// self
use crate::{_prelude::*, http::Endpoint, provider::GrantType};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Nothing in the crate retries on these; callers decide how to surface them
/// ("login was cancelled", "session expired, please sign in again", ...).
#[derive(Debug, ThisError)]
pub enum Error {
	/// Persisted record could not be read or written.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, IO).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Interactive redirect flow failed or was cancelled.
	#[error(transparent)]
	Interaction(#[from] InteractionError),

	/// The discovery document could not be fetched.
	#[error("OpenID configuration discovery failed: {status} {status_text}.")]
	Discovery {
		/// HTTP status code returned by the provider.
		status: u16,
		/// Canonical reason phrase for the status.
		status_text: String,
	},
	/// Provider returned `error` on the authorization redirect. Renders as the provider's
	/// `error_description` (or the `error` code when no description was sent).
	#[error("{reason}")]
	AuthorizationDenied {
		/// Raw OAuth `error` code.
		error: String,
		/// `error_description` when supplied, otherwise the raw `error` code.
		reason: String,
	},
	/// Redirect carried neither `error` nor `code`.
	#[error("Redirect URL does not contain an authorization code.")]
	MissingCode,
	/// Token endpoint answered with a non-success status.
	#[error("Token endpoint rejected the {grant} grant: {status} {status_text}.")]
	TokenEndpoint {
		/// Grant that was being exchanged.
		grant: GrantType,
		/// HTTP status code returned by the provider.
		status: u16,
		/// Canonical reason phrase for the status.
		status_text: String,
	},
	/// Userinfo endpoint answered with a non-success status.
	#[error("Userinfo endpoint returned {status} {status_text}.")]
	UserInfo {
		/// HTTP status code returned by the provider.
		status: u16,
		/// Canonical reason phrase for the status.
		status_text: String,
	},
	/// A successful response carried a body that does not match the expected JSON shape.
	#[error("The {endpoint} endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Endpoint that produced the body.
		endpoint: Endpoint,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider domain cannot be turned into a discovery URL.
	#[error("Provider domain `{domain}` is invalid.")]
	InvalidDomain {
		/// Domain as configured.
		domain: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Discovery document holds an absent or malformed endpoint.
	#[error("The {endpoint} endpoint in the OpenID configuration is not a valid URL.")]
	InvalidEndpoint {
		/// Which endpoint failed to parse.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Principal identifier failed validation.
	#[error(transparent)]
	InvalidPrincipal(#[from] crate::auth::IdentifierError),
	/// Client configuration failed validation.
	#[error(transparent)]
	InvalidClientConfig(#[from] crate::config::ClientConfigError),
	/// Token record builder validation failed.
	#[error("Unable to build access token record.")]
	TokenBuild(#[from] crate::auth::AccessTokenRecordBuilderError),
	/// A subject exchange was requested for the manager's own client id.
	#[error("Subject principal `{principal}` is the manager's own client id.")]
	SubjectIsSelf {
		/// Offending principal.
		principal: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Failure reported by the interactive redirect capability.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum InteractionError {
	/// The user closed or cancelled the login/consent window.
	#[error("Login was cancelled.")]
	Cancelled,
	/// The redirect flow failed for another reason (timeout, browser error, ...).
	#[error("Interactive authorization failed: {message}.")]
	Failed {
		/// Capability-supplied message.
		message: String,
	},
}
impl InteractionError {
	/// Convenience constructor for [`InteractionError::Failed`].
	pub fn failed(message: impl Into<String>) -> Self {
		Self::Failed { message: message.into() }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint being called.
		endpoint: Endpoint,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the {endpoint} endpoint.")]
	Io {
		/// Endpoint being called.
		endpoint: Endpoint,
		/// IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Transport failed without a structured cause.
	#[error("HTTP client error occurred while calling the {endpoint} endpoint: {message}.")]
	Other {
		/// Endpoint being called.
		endpoint: Endpoint,
		/// Transport-supplied message.
		message: String,
		/// HTTP status observed before the failure, when available.
		status: Option<u16>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(endpoint: Endpoint, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn denial_message_is_the_provider_description() {
		let err = Error::AuthorizationDenied {
			error: "access_denied".into(),
			reason: "User cancelled".into(),
		};

		assert_eq!(err.to_string(), "User cancelled");
	}

	#[test]
	fn token_endpoint_message_names_grant() {
		let err = Error::TokenEndpoint {
			grant: GrantType::RefreshToken,
			status: 400,
			status_text: "Bad Request".into(),
		};

		assert_eq!(err.to_string(), "Token endpoint rejected the refresh_token grant: 400 Bad Request.");
	}
}
