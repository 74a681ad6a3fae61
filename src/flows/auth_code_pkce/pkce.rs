//! PKCE (RFC 7636) verifier/challenge generation.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const PKCE_VERIFIER_BYTES: usize = 32;

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// Verifier/challenge pair generated for one authorization attempt.
#[derive(Clone)]
pub struct PkcePair {
	verifier: String,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	/// Draws 32 bytes from the thread-local CSPRNG and derives the `S256` challenge.
	pub fn generate() -> Self {
		let mut bytes = [0_u8; PKCE_VERIFIER_BYTES];

		rand::rng().fill(&mut bytes);

		let verifier = URL_SAFE_NO_PAD.encode(bytes);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}

	/// Secret verifier sent with the code exchange. Callers must avoid logging it.
	pub fn verifier(&self) -> &str {
		&self.verifier
	}

	/// Challenge sent on the authorization URL.
	pub fn challenge(&self) -> &str {
		&self.challenge
	}

	/// Challenge method (always `S256`).
	pub fn method(&self) -> PkceCodeChallengeMethod {
		self.method
	}

	pub(crate) fn into_verifier(self) -> String {
		self.verifier
	}
}
impl Debug for PkcePair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkcePair")
			.field("verifier", &"<redacted>")
			.field("challenge", &self.challenge)
			.field("method", &self.method)
			.finish()
	}
}

/// `BASE64URL(SHA256(verifier))` over the encoded verifier string, without padding.
pub fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn matches_rfc7636_appendix_b() {
		assert_eq!(
			compute_pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
			"E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
		);
	}

	#[test]
	fn generated_pairs_are_self_consistent() {
		for _ in 0..256 {
			let pair = PkcePair::generate();

			assert_eq!(pair.verifier().len(), 43);
			assert!(!pair.verifier().contains(['=', '+', '/']));
			assert_eq!(compute_pkce_challenge(pair.verifier()), pair.challenge());
			assert_eq!(pair.method().as_str(), "S256");
		}
	}

	#[test]
	fn verifiers_do_not_repeat() {
		assert_ne!(PkcePair::generate().verifier(), PkcePair::generate().verifier());
	}

	#[test]
	fn debug_redacts_verifier() {
		let pair = PkcePair::generate();

		assert!(!format!("{pair:?}").contains(pair.verifier()));
	}
}
