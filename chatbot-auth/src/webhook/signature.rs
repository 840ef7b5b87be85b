//! The ZEvent webhook signature scheme.
//!
//! A signature is `sha256(<hex>)` where `<hex>` is the lowercase hex SHA-256 digest of
//! `app_id || data || timestamp || secret_key`, concatenated with no delimiters.
//! `data` must be the exact request body text: the signer signs the string it is about
//! to transmit and the verifier signs the bytes it received, never a re-encoded copy.
//!
//! The concatenation has no field separators, so shifting characters across field
//! boundaries yields the same digest. The platform defines the scheme this way and it
//! is reproduced exactly.

use log::*;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Name of the header carrying the wrapped signature.
pub const SIGNATURE_HEADER: &str = "X-ZEvent-Signature";

const WRAPPER_PREFIX: &str = "sha256(";
const WRAPPER_SUFFIX: &str = ")";

/// Compute the wrapped signature for a webhook body.
///
/// Pure function of its inputs; signer and verifier must call it with identical strings.
pub fn sign(app_id: &str, data: &str, timestamp: &str, secret_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(app_id.as_bytes());
    hasher.update(data.as_bytes());
    hasher.update(timestamp.as_bytes());
    hasher.update(secret_key.as_bytes());

    format!(
        "{}{}{}",
        WRAPPER_PREFIX,
        hex::encode(hasher.finalize()),
        WRAPPER_SUFFIX
    )
}

/// Check a received signature against the one expected for the given inputs.
///
/// Returns `false` for any mismatch or malformed input: a missing `sha256(...)` wrapper,
/// non-hex characters, or a digest of the wrong length. The digest bytes are compared
/// in constant time.
pub fn verify(
    received_signature: &str,
    app_id: &str,
    data: &str,
    timestamp: &str,
    secret_key: &str,
) -> bool {
    let expected_signature = sign(app_id, data, timestamp, secret_key);

    let (Some(received_hex), Some(expected_hex)) = (
        unwrap_digest(received_signature),
        unwrap_digest(&expected_signature),
    ) else {
        debug!("Signature is not in the sha256(<hex>) format");
        return false;
    };

    let (received, expected) = match (hex::decode(received_hex), hex::decode(expected_hex)) {
        (Ok(received), Ok(expected)) => (received, expected),
        _ => {
            debug!("Signature digest is not valid hex");
            return false;
        }
    };

    // Digest length is public, so rejecting early here leaks nothing.
    if received.len() != expected.len() {
        debug!(
            "Signature digest length mismatch: {} != {}",
            received.len(),
            expected.len()
        );
        return false;
    }

    received.ct_eq(&expected).into()
}

/// Strip the `sha256(...)` wrapper, returning the inner digest text.
fn unwrap_digest(signature: &str) -> Option<&str> {
    signature
        .strip_prefix(WRAPPER_PREFIX)?
        .strip_suffix(WRAPPER_SUFFIX)
}
