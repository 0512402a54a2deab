//! HTTP-facing half of the relying party: authorization URL construction,
//! authorization-code exchange, and the userinfo fallback.

use crate::config::{OidcProviderConfig, UserInfoMethod};
use crate::error::{OidcError, OidcResult};
use crate::types::{TokenResponse, UserInfo};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// Client for the provider-facing HTTP endpoints.
///
/// One instance is shared across flows; all calls run with the bounded
/// timeout configured at construction and are never retried. Authorization
/// codes are single-use, so a blind retry after a lost response would only
/// burn the code.
#[derive(Clone)]
pub struct OidcClient {
    http_client: Client,
}

impl OidcClient {
    pub fn new(http_timeout_seconds: u64) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(http_timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self { http_client }
    }

    /// Build the authorization redirect URL. Pure, no I/O.
    ///
    /// Scopes are joined with a literal space before the value is
    /// percent-encoded, so multiple scopes are separated by `%20` and a
    /// single scope contains no encoded space. Parameters appear in a fixed
    /// order; an empty client_id is not an error at this layer.
    pub fn authorization_url(
        &self,
        provider_config: &OidcProviderConfig,
        response_type: &str,
        scopes: &[String],
        redirect_uri: &str,
        state: &str,
    ) -> OidcResult<String> {
        let base = Url::parse(&provider_config.authorization_endpoint)?;

        let query = format!(
            "response_type={}&client_id={}&scope={}&redirect_uri={}&state={}",
            urlencoding::encode(response_type),
            urlencoding::encode(&provider_config.client_id),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
        );

        debug!(
            provider = %provider_config.provider_id,
            "built authorization URL"
        );

        Ok(format!("{base}?{query}"))
    }

    /// Exchange an authorization code for tokens.
    ///
    /// One form-encoded POST; a non-2xx status or an undecodable body yields
    /// [`OidcError::TokenExchange`] carrying both status and body. The token
    /// contents are not validated here.
    pub async fn exchange_code(
        &self,
        provider_config: &OidcProviderConfig,
        code: &str,
        redirect_uri: &str,
        grant_type: &str,
    ) -> OidcResult<TokenResponse> {
        let params = [
            ("grant_type", grant_type),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", &provider_config.client_id),
            ("client_secret", &provider_config.client_secret),
        ];

        let response = self
            .http_client
            .post(&provider_config.token_endpoint)
            .form(&params)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        if !(200..300).contains(&status) {
            error!(status, "token exchange failed");
            return Err(OidcError::TokenExchange { status, body });
        }

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|_| OidcError::TokenExchange { status, body })?;

        info!(
            provider = %provider_config.provider_id,
            "exchanged authorization code for tokens"
        );
        Ok(token_response)
    }

    /// Fetch the minimal profile from the userinfo endpoint.
    ///
    /// Used only when the validated ID token lacks the email claim. Every
    /// profile field other than `email` is discarded.
    pub async fn fetch_user_info(
        &self,
        provider_config: &OidcProviderConfig,
        access_token: &str,
    ) -> OidcResult<UserInfo> {
        let endpoint = provider_config
            .userinfo_endpoint
            .as_deref()
            .ok_or(OidcError::MissingClaim { claim: "email" })?;

        let request = match provider_config.userinfo_method {
            UserInfoMethod::Get => self.http_client.get(endpoint),
            UserInfoMethod::Post => self.http_client.post(endpoint),
        };

        let response = request.bearer_auth(access_token).send().await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        if !(200..300).contains(&status) {
            error!(status, "userinfo request failed");
            return Err(OidcError::UserInfoFetch { status, body });
        }

        let payload: UserInfoPayload = serde_json::from_str(&body)
            .map_err(|_| OidcError::UserInfoFetch { status, body })?;

        match payload.email {
            Some(email) if !email.is_empty() => {
                debug!(
                    provider = %provider_config.provider_id,
                    "fetched email from userinfo endpoint"
                );
                Ok(UserInfo { email })
            }
            _ => Err(OidcError::MissingClaim { claim: "email" }),
        }
    }
}

/// Deserialization target for userinfo responses. Unknown fields (names,
/// locale, address, ...) are dropped here, before anything else sees them.
#[derive(Deserialize)]
struct UserInfoPayload {
    email: Option<String>,
}
