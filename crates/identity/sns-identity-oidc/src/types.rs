//! OIDC wire types.

use serde::{Deserialize, Serialize};

/// Redirect target produced when a flow starts.
///
/// The state value must be handed to the session layer before the user is
/// redirected; it is required again at the callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRedirect {
    pub url: String,
    pub state: String,
}

/// Query parameters the provider sends to the callback endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCallback {
    pub code: String,
    pub state: String,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Token endpoint response. A carrier only: nothing in it is trusted until
/// the ID token inside has been validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub scope: String,
    /// Raw compact JWT, untouched until [`crate::IdToken::parse`].
    pub id_token: String,
    pub refresh_token: Option<String>,
}

/// Minimal profile from the userinfo endpoint.
///
/// Only the email is kept; every other profile field the provider returns
/// (name, locale, address, ...) is dropped during deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_decodes_provider_json() {
        let body = r#"{
            "access_token": "DummyAccessToken",
            "expires_in": 3566,
            "scope": "openid https://www.googleapis.com/auth/userinfo.email",
            "token_type": "Bearer",
            "id_token": "DummyIdToken"
        }"#;

        let response: TokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.access_token, "DummyAccessToken");
        assert_eq!(response.expires_in, 3566);
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.id_token, "DummyIdToken");
        assert_eq!(response.refresh_token, None);
    }

    #[test]
    fn token_response_without_id_token_is_rejected() {
        let body = r#"{
            "access_token": "DummyAccessToken",
            "expires_in": 3566,
            "scope": "openid",
            "token_type": "Bearer"
        }"#;

        assert!(serde_json::from_str::<TokenResponse>(body).is_err());
    }
}
