//! Invite capability tokens
//!
//! A token is HMAC-SHA256, keyed by the server secret, over the invitee's
//! email with the organization bound into the same digest. It is both the
//! lookup key of the invite row and the proof that the bearer knows the
//! email it was sent to, so no per-invite secret is stored.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Separates token derivations from any other use of the same secret
const DOMAIN: &[u8] = b"notifier/invite/v1";

/// Derives and verifies invite tokens
#[derive(Clone)]
pub struct InviteTokenService {
    secret: Vec<u8>,
}

impl InviteTokenService {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Deterministic token for (organization, email), lowercase hex
    pub fn hash(&self, org_id: &str, email: &str) -> String {
        hex_encode(&self.digest(org_id, email))
    }

    /// Recompute and compare in constant time
    pub fn verify(&self, org_id: &str, email: &str, token: &str) -> bool {
        let expected = self.hash(org_id, email);
        expected.as_bytes().ct_eq(token.as_bytes()).into()
    }

    fn digest(&self, org_id: &str, email: &str) -> [u8; 32] {
        let email = normalize_email(email);
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(DOMAIN);
        // Length prefixes keep ("ab", "c") and ("a", "bc") apart
        for part in [org_id, email.as_str()] {
            mac.update(&(part.len() as u64).to_be_bytes());
            mac.update(part.as_bytes());
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&mac.finalize().into_bytes());
        out
    }
}

impl std::fmt::Debug for InviteTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InviteTokenService")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Canonical form of an email for token derivation
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}
