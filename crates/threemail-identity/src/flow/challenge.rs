//! Session key challenge for the login flow.
//!
//! The session key never leaves the client until the code exchange; the
//! provider only sees its SHA-256 challenge in the authorization URL, so an
//! intercepted authorization code cannot be redeemed by anyone else.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Challenge method sent with the authorization URL.
pub const CHALLENGE_METHOD: &str = "S256";

/// Session key and its challenge.
#[derive(Debug, Clone)]
pub struct SessionChallenge {
    /// Session key (random, URL-safe base64).
    pub session_key: String,
    /// Challenge (SHA-256 of the session key).
    pub challenge: String,
}

impl SessionChallenge {
    /// Generates a fresh session key and challenge.
    #[must_use]
    pub fn generate() -> Self {
        let session_key = random_token();
        let challenge = Self::compute_challenge(&session_key);

        Self {
            session_key,
            challenge,
        }
    }

    /// Computes the challenge for a session key.
    fn compute_challenge(session_key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(session_key.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    /// Returns the session key.
    #[must_use]
    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    /// Returns the challenge.
    #[must_use]
    pub fn challenge(&self) -> &str {
        &self.challenge
    }
}

/// 32 random bytes, URL-safe base64 without padding (43 characters).
pub(crate) fn random_token() -> String {
    let random_bytes: Vec<u8> = (0..32).map(|_| rand::thread_rng().r#gen::<u8>()).collect();
    URL_SAFE_NO_PAD.encode(random_bytes)
}
