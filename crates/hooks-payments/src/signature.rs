//! Webhook signature verification.
//!
//! Header format (`Stripe-Signature`):
//!
//! ```text
//! t=1609459200,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd
//! ```
//!
//! The signature is HMAC-SHA256 over `"{t}.{raw_body}"` keyed with the
//! endpoint's signing secret. Several `v1` entries may be present while a
//! secret is being rolled.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

use crate::error::{PaymentError, Result};

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Accepted clock skew between signing and receipt
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| PaymentError::SignatureInvalid("invalid timestamp".into()))?,
                );
            }
            // Undecodable entries can never match; skip them
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| PaymentError::SignatureInvalid("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(PaymentError::SignatureInvalid("no v1 signature".into()));
    }

    Ok(SignatureHeader { timestamp, signatures })
}

/// Verifies signed webhook deliveries
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    tolerance: Duration,
}

impl SignatureVerifier {
    /// An empty secret is refused: every delivery would be unverifiable.
    pub fn new(secret: impl Into<String>) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(PaymentError::Config("webhook signing secret is empty".into()));
        }
        Ok(Self {
            secret,
            tolerance: DEFAULT_TOLERANCE,
        })
    }

    pub const fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn mac(&self, timestamp: i64, payload: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| PaymentError::Config("invalid webhook secret".into()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }

    /// Verify `payload` against a signature header at the current time
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<()> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    /// Verify `payload` against a signature header as of `now` (unix seconds)
    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<()> {
        let parsed = parse_header(header)?;

        let tolerance = i64::try_from(self.tolerance.as_secs()).unwrap_or(i64::MAX);
        if now.abs_diff(parsed.timestamp) > tolerance.unsigned_abs() {
            return Err(PaymentError::SignatureInvalid("timestamp outside tolerance window".into()));
        }

        let mac = self.mac(parsed.timestamp, payload)?;
        // verify_slice compares in constant time
        let matched = parsed
            .signatures
            .iter()
            .any(|candidate| mac.clone().verify_slice(candidate).is_ok());

        if matched {
            Ok(())
        } else {
            Err(PaymentError::SignatureInvalid("no matching signature".into()))
        }
    }

    /// Build a header value signing `payload` at `timestamp`.
    ///
    /// Used to sign test deliveries and local replays.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String> {
        let signature = hex::encode(self.mac(timestamp, payload)?.finalize().into_bytes());
        Ok(format!("t={timestamp},v1={signature}"))
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new("whsec_test").unwrap()
    }

    #[test]
    fn test_parse_header() {
        let parsed = parse_header("t=1609459200,v1=abcd,v0=ffff,v1=zz").unwrap();
        assert_eq!(parsed.timestamp, 1_609_459_200);
        assert_eq!(parsed.signatures, vec![vec![0xab, 0xcd]]);
    }

    #[test]
    fn test_parse_header_invalid() {
        assert!(parse_header("invalid").is_err());
        assert!(parse_header("t=abc,v1=00").is_err());
        assert!(parse_header("v1=00").is_err());
        assert!(parse_header("t=1").is_err());
    }

    #[test]
    fn test_sign_then_verify() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = verifier().sign(payload, NOW).unwrap();
        assert!(verifier().verify_at(payload, &header, NOW + 10).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let header = verifier().sign(b"{\"amount\":1}", NOW).unwrap();
        let err = verifier().verify_at(b"{\"amount\":2}", &header, NOW).unwrap_err();
        assert!(matches!(err, PaymentError::SignatureInvalid(_)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = SignatureVerifier::new("whsec_other").unwrap();
        let header = other.sign(b"{}", NOW).unwrap();
        assert!(verifier().verify_at(b"{}", &header, NOW).is_err());
    }

    #[test]
    fn test_stale_and_future_timestamps_rejected() {
        let header = verifier().sign(b"{}", NOW).unwrap();
        assert!(verifier().verify_at(b"{}", &header, NOW + 301).is_err());
        assert!(verifier().verify_at(b"{}", &header, NOW - 301).is_err());
        assert!(verifier().verify_at(b"{}", &header, NOW + 300).is_ok());
    }

    #[test]
    fn test_any_v1_may_match() {
        let good = verifier().sign(b"{}", NOW).unwrap();
        let good_sig = good.split_once("v1=").unwrap().1;
        let header = format!("t={NOW},v1={},v1={good_sig}", "00".repeat(32));
        assert!(verifier().verify_at(b"{}", &header, NOW).is_ok());
    }

    #[test]
    fn test_empty_secret_refused() {
        assert!(matches!(SignatureVerifier::new(""), Err(PaymentError::Config(_))));
    }
}
