//! Signing-key set fetching and caching.

use crate::error::{OidcError, OidcResult};
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// One entry of a JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: String,
    pub alg: Option<String>,
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    // RSA material
    pub n: Option<String>,
    pub e: Option<String>,
    // EC material
    pub crv: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
}

impl Jwk {
    /// Build a verification key from the published components.
    pub fn decoding_key(&self) -> OidcResult<DecodingKey> {
        match self.kty.as_str() {
            "RSA" => {
                let (n, e) = self
                    .n
                    .as_deref()
                    .zip(self.e.as_deref())
                    .ok_or_else(|| missing_material(&self.kid))?;
                DecodingKey::from_rsa_components(n, e)
                    .map_err(|e| OidcError::SignatureInvalid(e.to_string()))
            }
            "EC" => {
                let (x, y) = self
                    .x
                    .as_deref()
                    .zip(self.y.as_deref())
                    .ok_or_else(|| missing_material(&self.kid))?;
                DecodingKey::from_ec_components(x, y)
                    .map_err(|e| OidcError::SignatureInvalid(e.to_string()))
            }
            other => Err(OidcError::SignatureInvalid(format!(
                "unsupported key type {other} for kid {}",
                self.kid
            ))),
        }
    }
}

fn missing_material(kid: &str) -> OidcError {
    OidcError::SignatureInvalid(format!("signing key {kid} lacks its key material"))
}

/// JWKS document as published at a provider's jwks endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// In-memory signing-key cache, keyed by endpoint and then by kid.
///
/// Owned by the validator instance; reads are concurrent, and a kid miss
/// triggers a synchronous fetch that replaces the endpoint's key map before
/// the caller proceeds. Stale-but-present keys keep serving while a refresh
/// for some other caller is in flight.
pub struct JwksCache {
    http_client: Client,
    keys: RwLock<HashMap<String, HashMap<String, Jwk>>>,
}

impl JwksCache {
    pub fn new(http_client: Client) -> Self {
        Self {
            http_client,
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a signing key, fetching the JWKS document on a cache miss.
    pub async fn key_for(&self, jwks_endpoint: &str, kid: &str) -> OidcResult<Jwk> {
        {
            let keys = self.keys.read().await;
            if let Some(jwk) = keys.get(jwks_endpoint).and_then(|set| set.get(kid)) {
                debug!(kid, "signing key served from cache");
                return Ok(jwk.clone());
            }
        }

        // Miss, either an unseen endpoint or a rotated key. Fetch and
        // replace this endpoint's map wholesale so retired keys drop out.
        let set = self.fetch(jwks_endpoint).await?;
        let by_kid: HashMap<String, Jwk> = set
            .keys
            .into_iter()
            .map(|jwk| (jwk.kid.clone(), jwk))
            .collect();

        let mut keys = self.keys.write().await;
        keys.insert(jwks_endpoint.to_string(), by_kid);

        keys.get(jwks_endpoint)
            .and_then(|set| set.get(kid))
            .cloned()
            .ok_or_else(|| OidcError::SigningKeyNotFound {
                kid: kid.to_string(),
            })
    }

    async fn fetch(&self, jwks_endpoint: &str) -> OidcResult<JwkSet> {
        let set: JwkSet = self
            .http_client
            .get(jwks_endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        info!(
            endpoint = jwks_endpoint,
            key_count = set.keys.len(),
            "fetched JWKS document"
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa_jwk(kid: &str) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: kid.to_string(),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            n: Some("AQAB".to_string()),
            e: Some("AQAB".to_string()),
            crv: None,
            x: None,
            y: None,
        }
    }

    #[test]
    fn jwks_document_decodes() {
        let body = r#"{
            "keys": [
                {"kty": "RSA", "kid": "a", "alg": "RS256", "use": "sig", "n": "AQAB", "e": "AQAB"},
                {"kty": "EC", "kid": "b", "crv": "P-256", "x": "AQAB", "y": "AQAB"}
            ]
        }"#;

        let set: JwkSet = serde_json::from_str(body).unwrap();
        assert_eq!(set.keys.len(), 2);
        assert_eq!(set.keys[0].kid, "a");
        assert_eq!(set.keys[1].kty, "EC");
    }

    #[test]
    fn rsa_key_without_modulus_is_rejected() {
        let mut jwk = rsa_jwk("a");
        jwk.n = None;

        assert!(matches!(
            jwk.decoding_key(),
            Err(OidcError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn unsupported_key_type_is_rejected() {
        let mut jwk = rsa_jwk("a");
        jwk.kty = "oct".to_string();

        assert!(matches!(
            jwk.decoding_key(),
            Err(OidcError::SignatureInvalid(_))
        ));
    }

    #[tokio::test]
    async fn cache_hit_avoids_network() {
        // Seed the cache directly, then resolve against an endpoint that
        // cannot be reached. A hit must not touch the network.
        let cache = JwksCache::new(Client::new());
        {
            let mut keys = cache.keys.write().await;
            let mut by_kid = HashMap::new();
            by_kid.insert("a".to_string(), rsa_jwk("a"));
            keys.insert("http://unreachable.invalid/jwks".to_string(), by_kid);
        }

        let jwk = cache
            .key_for("http://unreachable.invalid/jwks", "a")
            .await
            .unwrap();
        assert_eq!(jwk.kid, "a");
    }
}
