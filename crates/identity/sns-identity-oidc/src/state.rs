//! CSRF state generation and verification.
//!
//! The state value round-trips through the authorization redirect: it is
//! generated here, stored by the surrounding session layer, and compared
//! byte-for-byte when the provider redirects back. Storage and expiry are
//! the session layer's business; this module only produces and compares.

use crate::error::{OidcError, OidcResult};
use rand::RngCore;
use rand::rngs::OsRng;

const STATE_LENGTH: usize = 10;
const STATE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Produces unguessable single-use state tokens.
pub struct StateGenerator;

impl StateGenerator {
    /// Returns a fixed-length token drawn from the OS entropy source.
    pub fn generate() -> OidcResult<String> {
        let mut bytes = [0u8; STATE_LENGTH];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| OidcError::StateGeneration(e.to_string()))?;

        let state = bytes
            .iter()
            .map(|b| STATE_CHARSET[*b as usize % STATE_CHARSET.len()] as char)
            .collect();

        Ok(state)
    }
}

/// Compares the stored state against the value presented at the callback.
///
/// Must run before any network call; a mismatch (including an empty
/// presented value) aborts the flow.
pub fn verify_state(stored: &str, presented: &str) -> OidcResult<()> {
    if stored.as_bytes() != presented.as_bytes() {
        return Err(OidcError::StateMismatch {
            stored: stored.to_string(),
            presented: presented.to_string(),
        });
    }

    Ok(())
}
