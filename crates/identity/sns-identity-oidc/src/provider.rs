//! Flow orchestration: from redirect to validated identity.

use crate::client::OidcClient;
use crate::config::{OidcConfig, OidcProviderConfig};
use crate::error::{OidcError, OidcResult};
use crate::id_token::{IdToken, IdTokenValidator};
use crate::jwks::JwksCache;
use crate::state::{StateGenerator, verify_state};
use crate::types::{AuthorizationCallback, AuthorizationRedirect};
use reqwest::Client;
use sns_identity_core::{ProviderId, ValidatedIdentity};
use std::time::Duration;
use tracing::info;

/// The relying-party engine.
///
/// One instance serves every configured provider. The only state shared
/// across flows is the validator's signing-key cache; everything else lives
/// within a single `start_flow`/`complete_flow` pair, with the CSRF state
/// value held by the external session layer in between.
pub struct OidcProvider {
    config: OidcConfig,
    client: OidcClient,
    validator: IdTokenValidator,
}

impl OidcProvider {
    pub fn new(config: OidcConfig) -> Self {
        let client = OidcClient::new(config.http_timeout_seconds);
        let jwks_http = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");
        let validator = IdTokenValidator::new(JwksCache::new(jwks_http));

        Self {
            config,
            client,
            validator,
        }
    }

    fn provider_config(&self, provider_id: ProviderId) -> OidcResult<&OidcProviderConfig> {
        self.config
            .providers
            .get(&provider_id)
            .ok_or_else(|| OidcError::Config(format!("provider {provider_id} not configured")))
    }

    /// Begin an authorization flow: generate a fresh CSRF state and build
    /// the redirect URL. The returned state must be stored by the session
    /// layer and presented again at the callback.
    pub fn start_flow(&self, provider_id: ProviderId) -> OidcResult<AuthorizationRedirect> {
        let provider_config = self.provider_config(provider_id)?;
        let state = StateGenerator::generate()?;

        let url = self.client.authorization_url(
            provider_config,
            "code",
            &provider_config.scopes,
            &provider_config.redirect_uri,
            &state,
        )?;

        info!(provider = %provider_id, "started authorization flow");

        Ok(AuthorizationRedirect { url, state })
    }

    /// Complete the flow at the callback. Either every check passes and a
    /// fully validated identity comes back, or the flow aborts with the
    /// first failure and no identity exists at all.
    pub async fn complete_flow(
        &self,
        provider_id: ProviderId,
        stored_state: &str,
        callback: AuthorizationCallback,
    ) -> OidcResult<ValidatedIdentity> {
        let provider_config = self.provider_config(provider_id)?;

        // CSRF check comes first, before any network call.
        verify_state(stored_state, &callback.state)?;

        if let Some(error) = &callback.error {
            let description = callback
                .error_description
                .as_deref()
                .unwrap_or("no description");
            return Err(OidcError::Callback(format!("{error}: {description}")));
        }

        let token_response = self
            .client
            .exchange_code(
                provider_config,
                &callback.code,
                &provider_config.redirect_uri,
                "authorization_code",
            )
            .await?;

        let id_token = IdToken::parse(&token_response.id_token)?;
        self.validator.validate(&id_token, provider_config).await?;

        // Claims are authoritative from here on.
        let subject = id_token.payload.subject()?.to_string();
        let email = match id_token.payload.email() {
            Ok(email) => email.to_string(),
            // Some providers leave email out of the ID token; fall back to
            // the userinfo endpoint when one is configured.
            Err(OidcError::MissingClaim { .. }) if provider_config.userinfo_endpoint.is_some() => {
                self.client
                    .fetch_user_info(provider_config, &token_response.access_token)
                    .await?
                    .email
            }
            Err(e) => return Err(e),
        };

        info!(provider = %provider_id, "authorization flow completed");

        Ok(ValidatedIdentity {
            provider_id,
            subject,
            email,
        })
    }
}
