//! `X-Line-Signature` computation and verification.
//!
//! The signature is the base64-encoded HMAC-SHA256 of the raw request body,
//! keyed with the channel secret.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::messaging::MessagingError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

fn mac(channel_secret: &str, body: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    mac
}

/// Sign a request body the way the LINE platform does.
#[must_use]
pub fn sign(channel_secret: &str, body: &[u8]) -> String {
    BASE64.encode(mac(channel_secret, body).finalize().into_bytes())
}

/// Verify a signature header value against a request body.
///
/// Comparison is constant-time.
pub fn verify_signature(
    channel_secret: &str,
    body: &[u8],
    signature: &str,
) -> Result<(), MessagingError> {
    let expected = BASE64
        .decode(signature.trim())
        .map_err(|_| MessagingError::InvalidSignature)?;

    mac(channel_secret, body)
        .verify_slice(&expected)
        .map_err(|_| MessagingError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "channel-secret";
    const BODY: &[u8] = br#"{"destination":"U0","events":[]}"#;

    #[test]
    fn sign_then_verify() {
        let signature = sign(SECRET, BODY);
        assert!(verify_signature(SECRET, BODY, &signature).is_ok());
    }

    #[test]
    fn signature_is_base64_of_32_bytes() {
        let decoded = BASE64.decode(sign(SECRET, BODY)).unwrap();
        assert_eq!(decoded.len(), 32);
    }

    #[test]
    fn wrong_secret_fails() {
        let signature = sign("other-secret", BODY);
        assert!(matches!(
            verify_signature(SECRET, BODY, &signature),
            Err(MessagingError::InvalidSignature)
        ));
    }

    #[test]
    fn tampered_body_fails() {
        let signature = sign(SECRET, BODY);
        assert!(verify_signature(SECRET, b"{\"events\":[{}]}", &signature).is_err());
    }

    #[test]
    fn garbage_header_fails() {
        assert!(verify_signature(SECRET, BODY, "%%%not-base64%%%").is_err());
        assert!(verify_signature(SECRET, BODY, "").is_err());
    }
}
