//! Middleware types returned from `ConfigExt` methods.
mod add_authorization;
mod base_uri;
mod refresh_token;

pub(crate) use add_authorization::AddAuthorizationLayer;
pub use base_uri::{SetBaseUri, SetBaseUriLayer};
pub(crate) use refresh_token::RefreshTokenLayer;
