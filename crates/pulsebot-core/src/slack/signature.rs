//! Request signature verification (`X-Slack-Signature`)

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Requests signed longer ago than this are rejected as replays
pub const MAX_REQUEST_AGE_SECS: i64 = 60 * 5;

/// Why a request failed verification
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// Signature or timestamp header absent
    #[error("missing signature or timestamp header")]
    MissingHeader,

    /// Header present but unparseable
    #[error("malformed signature or timestamp")]
    Malformed,

    /// Timestamp too far from now
    #[error("request timestamp outside the allowed window")]
    Stale,

    /// Signature does not match the body
    #[error("signature mismatch")]
    Mismatch,
}

/// Verify a request body against its `v0=` signature.
///
/// `now` is the current unix time in seconds.
pub fn verify_signature(
    signing_secret: &str,
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
    now: i64,
) -> Result<(), SignatureError> {
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return Err(SignatureError::MissingHeader);
    };

    let sent_at: i64 = timestamp.parse().map_err(|_| SignatureError::Malformed)?;
    if (now - sent_at).abs() > MAX_REQUEST_AGE_SECS {
        return Err(SignatureError::Stale);
    }

    let expected = signature
        .strip_prefix("v0=")
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
        .ok_or(SignatureError::Malformed)?;

    let mut mac =
        Hmac::<Sha256>::new_from_slice(signing_secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);

    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

/// Compute the `v0=` signature for a body; used by tests and tooling
pub fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(signing_secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const NOW: i64 = 1_531_420_618;

    #[test]
    fn test_valid_signature() {
        let body = b"token=xyz&command=%2Flist-alerts";
        let sig = sign(SECRET, &NOW.to_string(), body);

        assert_eq!(verify_signature(SECRET, Some(&NOW.to_string()), Some(&sig), body, NOW), Ok(()));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let sig = sign(SECRET, &NOW.to_string(), b"command=%2Flist-alerts");

        assert_eq!(
            verify_signature(SECRET, Some(&NOW.to_string()), Some(&sig), b"command=%2Fcancel-alert", NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_stale_request_rejected() {
        let sent = NOW - MAX_REQUEST_AGE_SECS - 1;
        let sig = sign(SECRET, &sent.to_string(), b"x");

        assert_eq!(
            verify_signature(SECRET, Some(&sent.to_string()), Some(&sig), b"x", NOW),
            Err(SignatureError::Stale)
        );
    }

    #[test]
    fn test_missing_and_malformed_headers() {
        assert_eq!(
            verify_signature(SECRET, None, Some("v0=00"), b"x", NOW),
            Err(SignatureError::MissingHeader)
        );
        assert_eq!(
            verify_signature(SECRET, Some(&NOW.to_string()), Some("sha256=00"), b"x", NOW),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_signature(SECRET, Some("yesterday"), Some("v0=00"), b"x", NOW),
            Err(SignatureError::Malformed)
        );
    }
}
