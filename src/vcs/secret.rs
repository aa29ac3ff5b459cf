//! Webhook secret verification: pure functions over bytes, independent
//! of the HTTP framework so they're trivially unit-testable.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// GitHub: HMAC-SHA256 over the raw body, compared against the
/// `X-Hub-Signature-256` header value (`sha256=<hex>`). An empty secret
/// means "accept and read body raw" (no verification configured).
#[must_use]
pub fn verify_github(body: &[u8], secret: &str, signature_header: Option<&str>) -> bool {
    if secret.is_empty() {
        return true;
    }
    let Some(header) = signature_header else {
        return false;
    };
    let Some(hex_sig) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// GitLab: plain equality check of `X-Gitlab-Token`. Accept if the
/// configured secret is empty.
#[must_use]
pub fn verify_gitlab(secret: &str, token_header: Option<&str>) -> bool {
    if secret.is_empty() {
        return true;
    }
    token_header == Some(secret)
}

/// Gitea: HMAC-SHA256 of the body, compared against `X-Gitea-Signature`
/// (bare hex, no `sha256=` prefix).
#[must_use]
pub fn verify_gitea(body: &[u8], secret: &str, signature_header: Option<&str>) -> bool {
    if secret.is_empty() {
        return true;
    }
    let Some(hex_sig) = signature_header else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn github_sig(body: &[u8], secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn github_empty_secret_accepts_anything() {
        assert!(verify_github(b"payload", "", None));
    }

    #[test]
    fn github_valid_signature_verifies() {
        let body = b"payload";
        let sig = github_sig(body, "s3cr3t");
        assert!(verify_github(body, "s3cr3t", Some(&sig)));
        assert!(!verify_github(body, "s3cr3t", Some("sha256=deadbeef")));
    }

    #[test]
    fn gitlab_token_equality() {
        assert!(verify_gitlab("", None));
        assert!(verify_gitlab("tok", Some("tok")));
        assert!(!verify_gitlab("tok", Some("other")));
        assert!(!verify_gitlab("tok", None));
    }

    #[test]
    fn gitea_hmac_matches_github_scheme_without_prefix() {
        let body = b"payload";
        let mut mac = HmacSha256::new_from_slice(b"s3cr3t").unwrap();
        mac.update(body);
        let sig = hex::encode(mac.finalize().into_bytes());
        assert!(verify_gitea(body, "s3cr3t", Some(&sig)));
        assert!(!verify_gitea(body, "s3cr3t", Some("00")));
    }
}
