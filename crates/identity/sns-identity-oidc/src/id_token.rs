//! ID token parsing and validation.
//!
//! This is the security-critical path: a mistake here is an authentication
//! bypass, not a cosmetic bug. Validation runs as an ordered sequence of
//! independent checks that short-circuits at the first failure, so a given
//! bad token always produces the same error.

use crate::config::OidcProviderConfig;
use crate::error::{OidcError, OidcResult};
use crate::jwks::JwksCache;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use std::str::FromStr;
use tracing::debug;

/// Signing algorithms the validator will ever accept, regardless of what a
/// token header asks for. Asymmetric only: the unsigned `none` algorithm
/// and the HMAC family stay out, which closes the classic
/// algorithm-confusion route where a public key is reused as an HMAC
/// secret.
const ALLOWED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::ES256,
    Algorithm::ES384,
];

/// JOSE header of a compact JWT. `alg` stays a string until validation so
/// that parsing never trusts it.
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenHeader {
    pub alg: String,
    pub kid: Option<String>,
    pub typ: Option<String>,
}

/// ID token payload. Every field is untrusted until
/// [`IdTokenValidator::validate`] succeeds; after that, `sub` and `email`
/// become authoritative.
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenPayload {
    #[serde(default)]
    pub iss: String,
    pub azp: Option<String>,
    #[serde(default)]
    pub aud: String,
    #[serde(default)]
    pub sub: String,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub at_hash: Option<String>,
    pub nonce: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub locale: Option<String>,
    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub exp: i64,
}

impl IdTokenPayload {
    /// The `iss` claim must match one allowlisted issuer exactly.
    pub fn check_issuer(&self, issuer_allowlist: &[String]) -> OidcResult<()> {
        if issuer_allowlist.iter().any(|issuer| *issuer == self.iss) {
            Ok(())
        } else {
            Err(OidcError::IssuerMismatch {
                iss: self.iss.clone(),
            })
        }
    }

    /// The `aud` claim must equal the client id exactly.
    pub fn check_audience(&self, client_id: &str) -> OidcResult<()> {
        if self.aud == client_id {
            Ok(())
        } else {
            Err(OidcError::AudienceMismatch {
                aud: self.aud.clone(),
            })
        }
    }

    /// `exp` must be strictly in the future: the token is expired exactly
    /// when `(now - exp) > 0`. No clock-skew leeway; tests pin the boundary.
    pub fn check_expiry(&self, now: i64) -> OidcResult<()> {
        if now - self.exp > 0 {
            Err(OidcError::TokenExpired { exp: self.exp })
        } else {
            Ok(())
        }
    }

    /// The end user's email, required to be present and non-empty.
    /// Only meaningful after validation.
    pub fn email(&self) -> OidcResult<&str> {
        match self.email.as_deref() {
            Some(email) if !email.is_empty() => Ok(email),
            _ => Err(OidcError::MissingClaim { claim: "email" }),
        }
    }

    /// The provider-assigned stable identifier. This, not the email, is the
    /// canonical user key: providers may let users change their email.
    pub fn subject(&self) -> OidcResult<&str> {
        if self.sub.is_empty() {
            Err(OidcError::MissingClaim { claim: "sub" })
        } else {
            Ok(&self.sub)
        }
    }
}

/// A parsed but not yet validated ID token.
#[derive(Debug, Clone)]
pub struct IdToken {
    raw: String,
    pub header: IdTokenHeader,
    pub payload: IdTokenPayload,
    signature: String,
}

impl IdToken {
    /// Split the compact serialization into its three segments and decode
    /// header and payload. Any other segment count, or a segment that fails
    /// base64url or JSON decoding, is a malformed token.
    pub fn parse(raw: &str) -> OidcResult<Self> {
        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() != 3 {
            return Err(OidcError::MalformedToken(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        }

        let header: IdTokenHeader = decode_segment(segments[0], "header")?;
        let payload: IdTokenPayload = decode_segment(segments[1], "payload")?;

        Ok(Self {
            raw: raw.to_string(),
            header,
            payload,
            signature: segments[2].to_string(),
        })
    }

    /// The signed portion: `header.payload`.
    fn signed_message(&self) -> &str {
        // raw has exactly two dots after a successful parse
        &self.raw[..self.raw.rfind('.').unwrap_or(self.raw.len())]
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str, name: &str) -> OidcResult<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| OidcError::MalformedToken(format!("{name} is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| OidcError::MalformedToken(format!("{name} is not valid JSON: {e}")))
}

/// Verifies ID tokens against provider keys and claim rules.
///
/// Owns its signing-key cache; there is no process-global key state.
pub struct IdTokenValidator {
    jwks: JwksCache,
}

impl IdTokenValidator {
    pub fn new(jwks: JwksCache) -> Self {
        Self { jwks }
    }

    /// Run the ordered checks: key resolution, signature, issuer, audience,
    /// expiry. Short-circuits at the first failure. Claim accessors on the
    /// payload are only meaningful once this returns `Ok`.
    pub async fn validate(
        &self,
        token: &IdToken,
        provider_config: &OidcProviderConfig,
    ) -> OidcResult<()> {
        // 1. Resolve the signing key by kid, refreshing the JWKS on a miss.
        let kid = token
            .header
            .kid
            .as_deref()
            .ok_or_else(|| OidcError::SigningKeyNotFound {
                kid: "<missing>".to_string(),
            })?;
        let jwk = self
            .jwks
            .key_for(&provider_config.jwks_endpoint, kid)
            .await?;

        // 2. Verify the signature under the algorithm allow-list. The
        //    header's algorithm must also be the one the provider is
        //    configured to use.
        let alg = Algorithm::from_str(&token.header.alg).map_err(|_| {
            OidcError::SignatureInvalid(format!("unknown algorithm {}", token.header.alg))
        })?;
        if !ALLOWED_ALGORITHMS.contains(&alg) {
            return Err(OidcError::SignatureInvalid(format!(
                "algorithm {} is not allowed",
                token.header.alg
            )));
        }
        if alg != provider_config.expected_algorithm {
            return Err(OidcError::SignatureInvalid(format!(
                "algorithm {} does not match the provider's expected algorithm",
                token.header.alg
            )));
        }

        let key = jwk.decoding_key()?;
        let verified =
            jsonwebtoken::crypto::verify(&token.signature, token.signed_message().as_bytes(), &key, alg)
                .map_err(|e| OidcError::SignatureInvalid(e.to_string()))?;
        if !verified {
            return Err(OidcError::SignatureInvalid(
                "signature does not match the signed content".to_string(),
            ));
        }

        // 3-5. Claim checks, in order.
        token
            .payload
            .check_issuer(&provider_config.issuer_allowlist)?;
        token.payload.check_audience(&provider_config.client_id)?;
        token.payload.check_expiry(Utc::now().timestamp())?;

        debug!(kid, iss = %token.payload.iss, "ID token validated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT_ID: &str = "client-id-123.apps.example";

    fn payload(iss: &str, aud: &str, exp: i64) -> IdTokenPayload {
        IdTokenPayload {
            iss: iss.to_string(),
            azp: None,
            aud: aud.to_string(),
            sub: "1234567890".to_string(),
            email: Some("user@example.com".to_string()),
            email_verified: Some(true),
            at_hash: None,
            nonce: None,
            name: None,
            picture: None,
            given_name: None,
            family_name: None,
            locale: None,
            iat: 0,
            exp,
        }
    }

    fn google_allowlist() -> Vec<String> {
        vec![
            "https://accounts.google.com".to_string(),
            "accounts.google.com".to_string(),
        ]
    }

    fn tomorrow() -> i64 {
        Utc::now().timestamp() + 86_400
    }

    fn yesterday() -> i64 {
        Utc::now().timestamp() - 86_400
    }

    #[test]
    fn valid_claims_pass_each_check() {
        let payload = payload("https://accounts.google.com", CLIENT_ID, tomorrow());

        assert!(payload.check_issuer(&google_allowlist()).is_ok());
        assert!(payload.check_audience(CLIENT_ID).is_ok());
        assert!(payload.check_expiry(Utc::now().timestamp()).is_ok());
    }

    #[test]
    fn near_miss_issuer_is_rejected() {
        let payload = payload("https://accounts.google.coms", CLIENT_ID, tomorrow());

        let result = payload.check_issuer(&google_allowlist());
        assert!(matches!(
            result,
            Err(OidcError::IssuerMismatch { iss }) if iss == "https://accounts.google.coms"
        ));
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let payload = payload("https://accounts.google.com", "invalid aud", tomorrow());

        let result = payload.check_audience(CLIENT_ID);
        assert!(matches!(
            result,
            Err(OidcError::AudienceMismatch { aud }) if aud == "invalid aud"
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let payload = payload("https://accounts.google.com", CLIENT_ID, yesterday());

        let result = payload.check_expiry(Utc::now().timestamp());
        assert!(matches!(result, Err(OidcError::TokenExpired { .. })));
    }

    #[test]
    fn expiry_boundary_is_exact() {
        let payload = payload("https://accounts.google.com", CLIENT_ID, 1_000_000);

        // exp == now is still valid; one second past is not
        assert!(payload.check_expiry(1_000_000).is_ok());
        assert!(matches!(
            payload.check_expiry(1_000_001),
            Err(OidcError::TokenExpired { exp: 1_000_000 })
        ));
    }

    #[test]
    fn empty_email_claim_is_missing() {
        let mut p = payload("https://accounts.google.com", CLIENT_ID, tomorrow());
        assert_eq!(p.email().unwrap(), "user@example.com");

        p.email = Some(String::new());
        assert!(matches!(
            p.email(),
            Err(OidcError::MissingClaim { claim: "email" })
        ));

        p.email = None;
        assert!(matches!(
            p.email(),
            Err(OidcError::MissingClaim { claim: "email" })
        ));
    }

    #[test]
    fn empty_subject_is_missing() {
        let mut p = payload("https://accounts.google.com", CLIENT_ID, tomorrow());
        assert_eq!(p.subject().unwrap(), "1234567890");

        p.sub = String::new();
        assert!(matches!(
            p.subject(),
            Err(OidcError::MissingClaim { claim: "sub" })
        ));
    }

    fn encode_segment(value: &serde_json::Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    fn compact_token() -> String {
        let header = encode_segment(&serde_json::json!({
            "alg": "RS256", "kid": "key-1", "typ": "JWT"
        }));
        let payload = encode_segment(&serde_json::json!({
            "iss": "https://accounts.google.com",
            "aud": CLIENT_ID,
            "sub": "1234567890",
            "email": "user@example.com",
            "iat": 1_700_000_000u64,
            "exp": 1_700_086_400u64
        }));
        format!("{header}.{payload}.c2lnbmF0dXJl")
    }

    #[test]
    fn parse_accepts_three_segments() {
        let token = IdToken::parse(&compact_token()).unwrap();

        assert_eq!(token.header.alg, "RS256");
        assert_eq!(token.header.kid.as_deref(), Some("key-1"));
        assert_eq!(token.payload.iss, "https://accounts.google.com");
        assert_eq!(token.payload.sub, "1234567890");
        assert_eq!(token.signature, "c2lnbmF0dXJl");
    }

    #[test]
    fn parse_rejects_wrong_segment_count() {
        let token = compact_token();
        let two_segments = token.rsplit_once('.').unwrap().0;
        let four_segments = format!("{token}.extra");

        assert!(matches!(
            IdToken::parse(two_segments),
            Err(OidcError::MalformedToken(_))
        ));
        assert!(matches!(
            IdToken::parse(&four_segments),
            Err(OidcError::MalformedToken(_))
        ));
        assert!(matches!(
            IdToken::parse(""),
            Err(OidcError::MalformedToken(_))
        ));
    }

    #[test]
    fn parse_rejects_bad_base64() {
        assert!(matches!(
            IdToken::parse("not-base64!!.payload.sig"),
            Err(OidcError::MalformedToken(_))
        ));
    }

    #[test]
    fn parse_rejects_non_json_payload() {
        let header = encode_segment(&serde_json::json!({"alg": "RS256"}));
        let payload = URL_SAFE_NO_PAD.encode(b"plain text");
        let token = format!("{header}.{payload}.sig");

        assert!(matches!(
            IdToken::parse(&token),
            Err(OidcError::MalformedToken(_))
        ));
    }

    #[test]
    fn signed_message_excludes_signature() {
        let raw = compact_token();
        let token = IdToken::parse(&raw).unwrap();

        let expected = raw.rsplit_once('.').unwrap().0;
        assert_eq!(token.signed_message(), expected);
    }
}
