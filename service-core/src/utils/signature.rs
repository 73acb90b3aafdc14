//! HMAC-SHA256 signatures for inbound webhooks.
//!
//! Payment providers sign webhook deliveries with a header of the form
//! `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]` where the MAC covers
//! `"{t}.{raw body}"`. Several `v1` entries may be present during secret rotation.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Default tolerance between the signed timestamp and now.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is malformed")]
    MalformedHeader,

    #[error("no v1 signature in header")]
    MissingSignature,

    #[error("timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("signature mismatch")]
    Mismatch,

    #[error("invalid signing secret")]
    InvalidSecret,
}

/// Compute the hex HMAC over `"{timestamp}.{payload}"`.
pub fn compute_signature(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a timestamped signature header against the raw payload.
///
/// `now` is unix seconds; a zero `tolerance_secs` disables the freshness check.
pub fn verify_timestamped_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or(SignatureError::MalformedHeader)?;
        match key {
            "t" => {
                timestamp = Some(value.parse().map_err(|_| SignatureError::MalformedHeader)?)
            }
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }

    if tolerance_secs > 0 && (now - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let expected = compute_signature(secret, timestamp, payload)?;
    let expected = expected.as_bytes();

    let matched = signatures.iter().any(|candidate| {
        let candidate = candidate.as_bytes();
        candidate.len() == expected.len() && bool::from(candidate.ct_eq(expected))
    });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
