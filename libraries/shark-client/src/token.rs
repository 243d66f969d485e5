//! Per-call request token generation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha1::{Digest, Sha1};

const NONCE_LEN: usize = 6;
const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

/// Mints the `token` field of each request header.
///
/// A token is a 6-character hex nonce followed by the hex SHA-1 of
/// `method:communication_token:salt:nonce`. Two consecutive mints never
/// share a nonce.
#[derive(Debug)]
pub struct TokenMinter {
    rng: StdRng,
    last_nonce: Option<String>,
}

impl TokenMinter {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            last_nonce: None,
        }
    }

    /// Minter with a fixed seed, for reproducible nonce sequences.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            last_nonce: None,
        }
    }

    /// Mint a token for `method` under the current communication token.
    pub fn mint(&mut self, method: &str, communication_token: &str, salt: &str) -> String {
        let nonce = self.next_nonce();
        let digest = digest(method, communication_token, salt, &nonce);
        format!("{nonce}{digest}")
    }

    fn next_nonce(&mut self) -> String {
        loop {
            let nonce: String = (0..NONCE_LEN)
                .map(|_| HEX_CHARS[self.rng.gen_range(0..HEX_CHARS.len())] as char)
                .collect();
            if self.last_nonce.as_deref() != Some(nonce.as_str()) {
                self.last_nonce = Some(nonce.clone());
                return nonce;
            }
        }
    }
}

impl Default for TokenMinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Hex SHA-1 of the colon-joined token inputs.
pub fn digest(method: &str, communication_token: &str, salt: &str, nonce: &str) -> String {
    let plain = [method, communication_token, salt, nonce].join(":");
    hex::encode(Sha1::digest(plain.as_bytes()))
}

/// Lowercase hex MD5 of the session id, sent as `secretKey` when
/// requesting a communication token.
pub fn secret_key(session_id: &str) -> String {
    hex::encode(md5::Md5::digest(session_id.as_bytes()))
}
