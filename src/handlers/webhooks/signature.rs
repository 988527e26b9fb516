//! Webhook signature verification - the sole trust boundary for inbound
//! deliveries. Nothing downstream re-checks authenticity.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Verify that `provided` is the base64-encoded HMAC-SHA256 of `raw_body`
/// under `secret`. Never panics: any malformed input simply compares unequal.
pub fn verify(raw_body: &[u8], provided: &str, secret: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    let expected = BASE64.encode(mac.finalize().into_bytes());

    let expected = expected.as_bytes();
    let provided = provided.trim().as_bytes();

    // Length is not secret: a base64 HMAC-SHA256 digest is always 44 bytes.
    if expected.len() != provided.len() {
        return false;
    }

    // Constant-time comparison to prevent timing attacks.
    expected.ct_eq(provided).into()
}
