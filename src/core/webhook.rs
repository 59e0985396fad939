//! Push-notification authentication and trigger rules.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";

const SIGNATURE_PREFIX: &str = "sha256=";

/// The parts of a push payload the trigger cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub repository: Option<RepositoryRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryRef {
    #[serde(default)]
    pub full_name: Option<String>,
}

impl PushPayload {
    pub fn parse(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| {
            Error::validation_invalid_json(e, Some("parse webhook payload".to_string()))
        })
    }

    pub fn repository_name(&self) -> Option<&str> {
        self.repository.as_ref().and_then(|r| r.full_name.as_deref())
    }
}

/// HMAC-SHA256 of `body` under `secret`, formatted as the header value.
pub fn sign(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = new_mac(secret)?;
    mac.update(body);
    Ok(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        to_hex(&mac.finalize().into_bytes())
    ))
}

/// Check a `sha256=<hex>` header against the exact bytes received.
///
/// The comparison is constant-time.
pub fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> Result<()> {
    let header = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::signature_invalid("missing signature header"))?;

    let hex = header
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| Error::signature_invalid("signature must start with sha256="))?;

    let expected =
        from_hex(hex).ok_or_else(|| Error::signature_invalid("signature is not valid hex"))?;

    let mut mac = new_mac(secret)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| Error::signature_invalid("signature mismatch"))
}

/// A build is warranted only for pushes to `branch`.
pub fn should_build(event: Option<&str>, payload: &PushPayload, branch: &str) -> bool {
    if event != Some("push") {
        return false;
    }
    let wanted = format!("refs/heads/{}", branch);
    payload.git_ref.as_deref() == Some(wanted.as_str())
}

fn new_mac(secret: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::internal_unexpected(format!("HMAC key rejected: {}", e)))
}

fn to_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    s.as_bytes()
        .chunks(2)
        .map(|pair| Some((nibble(pair[0])? << 4) | nibble(pair[1])?))
        .collect()
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"ref":"refs/heads/main","after":"abc123"}"#;

    #[test]
    fn sign_matches_known_vector() {
        // RFC 4231 test case 2.
        assert_eq!(
            sign("Jefe", b"what do ya want for nothing?").unwrap(),
            "sha256=5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn valid_signature_verifies() {
        let header = sign("s3cret", BODY).unwrap();
        assert!(verify_signature("s3cret", BODY, Some(&header)).is_ok());
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        let header = sign("s3cret", BODY).unwrap();
        let upper = format!("sha256={}", header[7..].to_uppercase());
        assert!(verify_signature("s3cret", BODY, Some(&upper)).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let header = sign("other", BODY).unwrap();
        let err = verify_signature("s3cret", BODY, Some(&header)).unwrap_err();
        assert_eq!(err.code.as_str(), "webhook.signature_invalid");
        assert_eq!(err.details["reason"], "signature mismatch");
    }

    #[test]
    fn any_body_change_is_rejected() {
        let header = sign("s3cret", BODY).unwrap();
        let reformatted = br#"{"ref": "refs/heads/main", "after": "abc123"}"#;
        assert!(verify_signature("s3cret", reformatted, Some(&header)).is_err());
    }

    #[test]
    fn missing_or_malformed_header_is_rejected() {
        assert!(verify_signature("s3cret", BODY, None).is_err());
        assert!(verify_signature("s3cret", BODY, Some("")).is_err());
        assert!(verify_signature("s3cret", BODY, Some("sha1=abcd")).is_err());
        assert!(verify_signature("s3cret", BODY, Some("sha256=zz")).is_err());
        assert!(verify_signature("s3cret", BODY, Some("sha256=abc")).is_err());
    }

    #[test]
    fn only_push_to_configured_branch_builds() {
        let payload = PushPayload::parse(BODY).unwrap();
        assert!(should_build(Some("push"), &payload, "main"));
        assert!(!should_build(Some("push"), &payload, "develop"));
        assert!(!should_build(Some("ping"), &payload, "main"));
        assert!(!should_build(None, &payload, "main"));

        let tag = PushPayload::parse(br#"{"ref":"refs/tags/main"}"#).unwrap();
        assert!(!should_build(Some("push"), &tag, "main"));
    }

    #[test]
    fn payload_without_ref_never_builds() {
        let payload = PushPayload::parse(b"{}").unwrap();
        assert!(payload.git_ref.is_none());
        assert!(!should_build(Some("push"), &payload, "main"));
    }

    #[test]
    fn invalid_json_payload_is_validation_error() {
        let err = PushPayload::parse(b"not json").unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_json");
    }
}
