//! Shared helpers for flow implementations.

// self
use crate::{
	_prelude::*, auth::PrincipalId, flows::TokenManager, http::OidcHttpClient,
	oauth::TransportErrorMapper,
};

/// Returns (and creates on demand) the singleflight guard for a principal.
pub(crate) fn flow_guard<C, M>(
	manager: &TokenManager<C, M>,
	principal: &PrincipalId,
) -> Arc<AsyncMutex<()>>
where
	C: ?Sized + OidcHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let mut guards = manager.flow_guards.lock();

	guards.entry(principal.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}

/// Prepends `base` to `params`, letting `params` win on duplicate keys.
pub(crate) fn layered_params(
	base: &[(String, String)],
	params: &[(String, String)],
) -> Vec<(String, String)> {
	let mut merged = base.to_vec();

	crate::oauth::merge_params(&mut merged, params);

	merged
}
