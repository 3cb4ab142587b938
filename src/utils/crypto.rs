// Cryptographic utilities for login tokens and the anti-forgery state digest

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Entropy of generated login and state tokens (192 bits)
pub const TOKEN_BYTES: usize = 24;

/// Generate a cryptographically secure, URL-safe token
///
/// 24 bytes (192 bits) of entropy encoded as 32 base64url characters, more
/// compact and higher-entropy than a UUID v4.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a cryptographically secure nonce of the given byte length
#[must_use]
pub fn generate_nonce(length: usize) -> String {
    let mut nonce = vec![0u8; length];
    rand::rng().fill_bytes(&mut nonce);
    general_purpose::URL_SAFE_NO_PAD.encode(nonce)
}

/// Keyed digest binding a browser-held client token to the state value the
/// identity provider echoes back.
///
/// Uses HMAC-SHA256 with a server-side secret rather than a plain hash, so an
/// attacker who observes a valid (token, state, digest) triple from their own
/// session still cannot forge a digest for someone else's client token.
#[derive(Clone)]
pub struct StateBinder {
    mac: HmacSha256,
}

impl StateBinder {
    /// Create a binder keyed with the server-side state secret.
    ///
    /// # Panics
    ///
    /// Never in practice: HMAC accepts keys of any length.
    #[must_use]
    pub fn new(key: &[u8]) -> Self {
        let mac = <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
        Self { mac }
    }

    /// Compute the digest stored at issue time: `HMAC(key, client || state)`.
    #[must_use]
    pub fn seal(&self, client_token: &str, state_token: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(client_token.as_bytes());
        mac.update(state_token.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Recompute the digest for the echoed state and compare it against the
    /// stored one in constant time.
    #[must_use]
    pub fn matches(&self, client_token: &str, echoed_state: &str, expected: &[u8]) -> bool {
        let mut mac = self.mac.clone();
        mac.update(client_token.as_bytes());
        mac.update(echoed_state.as_bytes());
        mac.verify_slice(expected).is_ok()
    }
}
