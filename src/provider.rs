//! Provider-facing metadata (data) and its resolution (behavior).
//!
//! `descriptor` exposes the OpenID configuration document ([`OpenIdConfig`]) with typed
//! endpoint accessors and the grant identifiers the manager speaks. `discovery` defines
//! [`OpenIdConfigResolver`], which fetches the document once per manager and memoizes it.

pub mod descriptor;
pub mod discovery;

pub use descriptor::*;
pub use discovery::*;

/// Well-known path (relative to the provider domain) of the discovery document.
pub const OPENID_CONFIG_PATH: &str = ".well-known/openid-configuration.json";
