//! Cached credential state and secret wrappers.

pub mod record;
pub mod secret;
