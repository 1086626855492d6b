//! LINE signature verification: base64(HMAC-SHA256(channel secret, raw body)).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature. Looked up case-insensitively.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Base64 signature of `raw_body`, or `None` when `secret` is empty.
pub fn compute_signature(raw_body: &[u8], secret: &str) -> Option<String> {
    if secret.is_empty() {
        return None;
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(raw_body);
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

/// True iff `provided_signature` is the signature of the exact bytes `raw_body` under `secret`.
/// False when either the signature or the secret is empty.
pub fn verify(raw_body: &[u8], provided_signature: &str, secret: &str) -> bool {
    if provided_signature.is_empty() {
        return false;
    }
    match compute_signature(raw_body, secret) {
        Some(expected) => constant_time_eq(expected.as_bytes(), provided_signature.as_bytes()),
        None => false,
    }
}

/// Signature header value, matching `x-line-signature` in any letter case.
pub fn find_signature_header(headers: &[(String, String)]) -> Option<&str> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(SIGNATURE_HEADER))
        .map(|(_, value)| value.as_str())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
