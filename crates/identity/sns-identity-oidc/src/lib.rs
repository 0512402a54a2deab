//! OpenID Connect relying-party engine.
//!
//! Implements the Authorization Code flow against third-party identity
//! providers (Google and Yahoo out of the box): building the authorization
//! redirect, exchanging the authorization code, cryptographically validating
//! the returned ID token against the provider's JWKS and claim rules, and a
//! minimal userinfo fallback for providers that leave email out of the
//! token. On success it emits a `ValidatedIdentity` for the user
//! provisioning layer defined in `sns-identity-core`.

mod client;
mod config;
mod error;
mod id_token;
mod jwks;
mod provider;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use client::OidcClient;
pub use config::{OidcConfig, OidcProviderConfig, UserInfoMethod};
pub use error::{OidcError, OidcResult};
pub use id_token::{IdToken, IdTokenHeader, IdTokenPayload, IdTokenValidator};
pub use jwks::{Jwk, JwkSet, JwksCache};
pub use provider::OidcProvider;
pub use state::{StateGenerator, verify_state};
pub use types::{AuthorizationCallback, AuthorizationRedirect, TokenResponse, UserInfo};

// Re-export common types for convenience
pub use sns_identity_core::{ProviderId, ValidatedIdentity};
