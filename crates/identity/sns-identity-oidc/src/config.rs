//! OIDC provider configuration.

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use sns_identity_core::ProviderId;
use std::collections::HashMap;

/// HTTP method the provider expects at its userinfo endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserInfoMethod {
    Get,
    Post,
}

/// Static per-provider data, constructed once at startup.
///
/// All provider differences live in this record; the engine itself contains
/// no per-provider branching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcProviderConfig {
    pub provider_id: ProviderId,
    pub client_id: String,
    pub client_secret: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_endpoint: String,
    pub userinfo_endpoint: Option<String>,
    pub userinfo_method: UserInfoMethod,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    /// Exact-match `iss` values accepted from this provider.
    pub issuer_allowlist: Vec<String>,
    /// The one signing algorithm this provider is expected to use.
    pub expected_algorithm: Algorithm,
}

impl OidcProviderConfig {
    /// Google's OIDC endpoints. Google issues tokens under both issuer
    /// spellings, with and without the scheme.
    pub fn google(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            provider_id: ProviderId::Google,
            client_id,
            client_secret,
            authorization_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            jwks_endpoint: "https://www.googleapis.com/oauth2/v3/certs".to_string(),
            userinfo_endpoint: Some("https://openidconnect.googleapis.com/v1/userinfo".to_string()),
            userinfo_method: UserInfoMethod::Get,
            redirect_uri,
            scopes: vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string(),
            ],
            issuer_allowlist: vec![
                "https://accounts.google.com".to_string(),
                "accounts.google.com".to_string(),
            ],
            expected_algorithm: Algorithm::RS256,
        }
    }

    /// Yahoo Japan's YConnect v2 endpoints. Yahoo omits the email claim from
    /// its ID tokens, so the userinfo endpoint (POST) supplies it.
    pub fn yahoo(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            provider_id: ProviderId::Yahoo,
            client_id,
            client_secret,
            authorization_endpoint: "https://auth.login.yahoo.co.jp/yconnect/v2/authorization"
                .to_string(),
            token_endpoint: "https://auth.login.yahoo.co.jp/yconnect/v2/token".to_string(),
            jwks_endpoint: "https://auth.login.yahoo.co.jp/yconnect/v2/jwks".to_string(),
            userinfo_endpoint: Some(
                "https://userinfo.yahooapis.jp/yconnect/v2/attribute".to_string(),
            ),
            userinfo_method: UserInfoMethod::Post,
            redirect_uri,
            scopes: vec!["openid".to_string(), "email".to_string()],
            issuer_allowlist: vec!["https://auth.login.yahoo.co.jp/yconnect/v2".to_string()],
            expected_algorithm: Algorithm::RS256,
        }
    }
}

/// Engine-wide configuration: the provider map plus HTTP client settings.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    pub providers: HashMap<ProviderId, OidcProviderConfig>,
    pub http_timeout_seconds: u64,
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            http_timeout_seconds: 30,
        }
    }
}

impl OidcConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider(mut self, config: OidcProviderConfig) -> Self {
        self.providers.insert(config.provider_id, config);
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }
}
