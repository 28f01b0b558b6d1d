//! Webhook signature verification.
//!
//! GitHub signs the raw request body with HMAC-SHA256 over the shared
//! secret and sends it as `X-Hub-Signature-256: sha256=<hex>`. Comparison
//! runs through the MAC's constant-time verifier, never string equality.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Verifies a signature header against the raw body.
///
/// An empty secret disables verification (always true). With a secret set,
/// a missing or malformed header fails closed.
pub fn verify_signature(secret: &str, signature_header: Option<&str>, body: &[u8]) -> bool {
    if secret.is_empty() {
        return true;
    }

    let Some(header) = signature_header else {
        return false;
    };
    let Some(hex_digest) = header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(signature) = hex::decode(hex_digest) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Computes the signature header value for a body (tooling and tests).
pub fn signature_for(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("hmac accepts any key length"));
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}
