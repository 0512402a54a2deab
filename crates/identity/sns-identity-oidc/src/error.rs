//! OIDC error types.

use thiserror::Error;

pub type OidcResult<T> = Result<T, OidcError>;

/// Failure modes of the relying-party engine.
///
/// Every variant aborts the current flow; there is no partial success. The
/// validation variants carry the offending value so callers can both match
/// on the kind and log a useful diagnostic.
#[derive(Debug, Error)]
pub enum OidcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("state generation failed: {0}")]
    StateGeneration(String),

    #[error("state parameter does not match for query: {presented}, stored: {stored}")]
    StateMismatch { stored: String, presented: String },

    #[error("authorization callback returned an error: {0}")]
    Callback(String),

    #[error("token exchange failed with status {status}: {body}")]
    TokenExchange { status: u16, body: String },

    #[error("malformed ID token: {0}")]
    MalformedToken(String),

    #[error("no signing key found for kid {kid}")]
    SigningKeyNotFound { kid: String },

    #[error("ID token signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("issuer {iss} is not in the provider allowlist")]
    IssuerMismatch { iss: String },

    #[error("audience {aud} does not match the client id")]
    AudienceMismatch { aud: String },

    #[error("ID token expired at {exp}")]
    TokenExpired { exp: i64 },

    #[error("required claim {claim} is missing or empty")]
    MissingClaim { claim: &'static str },

    #[error("userinfo request failed with status {status}: {body}")]
    UserInfoFetch { status: u16, body: String },
}
