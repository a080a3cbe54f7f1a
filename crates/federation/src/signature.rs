//! HTTP Signatures (draft-cavage) for `ActivityPub` requests.
//!
//! Outbound requests are signed with the sending account's RSA key; inbound
//! requests are verified against the claimed actor's published public key.
//! The signing string covers `(request-target)`, `host` and `date`, plus
//! `digest` when the request carries a body.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use tracing::warn;
use url::Url;

/// Maximum accepted clock skew for the `Date` header, in seconds.
pub const DEFAULT_MAX_CLOCK_SKEW_SECS: i64 = 5 * 60;

/// Date formats seen in the wild beyond RFC 2822.
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S GMT",
    "%A, %d-%b-%y %H:%M:%S GMT",
    "%a %b %e %H:%M:%S %Y",
];

/// Errors from signing or verifying HTTP requests.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("Invalid private key")]
    InvalidPrivateKey,

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Signing failed")]
    SigningFailed,

    #[error("Verification failed")]
    VerificationFailed,

    #[error("Missing header: {0}")]
    MissingHeader(String),

    #[error("Invalid Signature header")]
    InvalidSignatureHeader,

    #[error("Header value is not representable: {0}")]
    InvalidHeaderValue(String),

    #[error("Invalid URL")]
    InvalidUrl,

    #[error("Date header outside the accepted window")]
    ExpiredSignature,

    #[error("Unparseable date: {0}")]
    InvalidDateFormat(String),
}

/// Signs outbound HTTP requests with an account's RSA private key.
pub struct HttpSigner {
    private_key: RsaPrivateKey,
    key_id: String,
}

impl HttpSigner {
    /// Create a signer from a PKCS#8 PEM private key.
    ///
    /// `key_id` is the URL advertised in the actor document's `publicKey.id`,
    /// conventionally the actor URL with a `#main-key` fragment.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::InvalidPrivateKey`] if the PEM does not
    /// decode to an RSA private key.
    pub fn new(private_key_pem: &str, key_id: impl Into<String>) -> Result<Self, SignatureError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(private_key_pem)
            .map_err(|_| SignatureError::InvalidPrivateKey)?;

        Ok(Self {
            private_key,
            key_id: key_id.into(),
        })
    }

    /// Sign a request, producing the `Host`, `Date`, `Digest` and `Signature`
    /// headers to attach to it.
    ///
    /// `body` must be the exact bytes that will be transmitted; requests
    /// without a body (GETs) skip the `Digest` header and leave it out of the
    /// signing string.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL has no host, the RSA signing operation
    /// fails, or a computed header value is not valid header text.
    pub fn sign_request(
        &self,
        method: &str,
        url: &Url,
        body: Option<&[u8]>,
    ) -> Result<HeaderMap, SignatureError> {
        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            (None, _) => return Err(SignatureError::InvalidUrl),
        };

        let mut request_target = format!("{} {}", method.to_lowercase(), url.path());
        if let Some(query) = url.query() {
            request_target.push('?');
            request_target.push_str(query);
        }

        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let digest = body.map(calculate_digest);

        let mut signed_headers = vec!["(request-target)", "host", "date"];
        let mut signing_lines = vec![
            format!("(request-target): {request_target}"),
            format!("host: {host}"),
            format!("date: {date}"),
        ];
        if let Some(ref digest) = digest {
            signed_headers.push("digest");
            signing_lines.push(format!("digest: {digest}"));
        }
        let signing_string = signing_lines.join("\n");

        let signing_key = SigningKey::<Sha256>::new(self.private_key.clone());
        let signature = signing_key
            .try_sign(signing_string.as_bytes())
            .map_err(|_| SignatureError::SigningFailed)?;
        let signature_b64 = BASE64.encode(signature.to_bytes());

        let signature_header = format!(
            "keyId=\"{}\",algorithm=\"rsa-sha256\",headers=\"{}\",signature=\"{}\"",
            self.key_id,
            signed_headers.join(" "),
            signature_b64
        );

        let mut headers = HeaderMap::new();
        insert_header(&mut headers, "host", &host)?;
        insert_header(&mut headers, "date", &date)?;
        if let Some(ref digest) = digest {
            insert_header(&mut headers, "digest", digest)?;
        }
        insert_header(&mut headers, "signature", &signature_header)?;

        Ok(headers)
    }
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<(), SignatureError> {
    let value = HeaderValue::from_str(value)
        .map_err(|_| SignatureError::InvalidHeaderValue(name.to_string()))?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

/// Parsed fields of a `Signature` header.
#[derive(Debug, Clone)]
pub struct SignatureComponents {
    pub key_id: String,
    pub algorithm: String,
    pub headers: Vec<String>,
    pub signature: String,
}

/// Verifies inbound HTTP request signatures.
pub struct HttpVerifier;

impl HttpVerifier {
    /// Parse a `Signature` header into its components.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::InvalidSignatureHeader`] when `keyId` or
    /// `signature` is missing. Absent `algorithm` defaults to `rsa-sha256`
    /// and absent `headers` to `date`, per the draft.
    pub fn parse_signature_header(header: &str) -> Result<SignatureComponents, SignatureError> {
        let mut key_id = None;
        let mut algorithm = None;
        let mut headers = None;
        let mut signature = None;

        for part in header.split(',') {
            let Some((name, value)) = part.trim().split_once('=') else {
                continue;
            };
            let value = value.trim_matches('"').to_string();
            match name {
                "keyId" => key_id = Some(value),
                "algorithm" => algorithm = Some(value),
                "headers" => headers = Some(value),
                "signature" => signature = Some(value),
                _ => {}
            }
        }

        Ok(SignatureComponents {
            key_id: key_id.ok_or(SignatureError::InvalidSignatureHeader)?,
            algorithm: algorithm.unwrap_or_else(|| "rsa-sha256".to_string()),
            headers: headers
                .unwrap_or_else(|| "date".to_string())
                .split_whitespace()
                .map(ToString::to_string)
                .collect(),
            signature: signature.ok_or(SignatureError::InvalidSignatureHeader)?,
        })
    }

    /// Verify a signature against the signer's public key.
    ///
    /// The signing string is rebuilt from the header names listed in the
    /// `Signature` header, with values taken from `headers` (lowercase
    /// names). Returns `Ok(false)` when the signature does not match and an
    /// error when the input cannot be checked at all.
    ///
    /// # Errors
    ///
    /// Returns an error for undecodable keys or signatures and for signed
    /// headers absent from the request.
    pub fn verify(
        public_key_pem: &str,
        components: &SignatureComponents,
        method: &str,
        path: &str,
        headers: &HashMap<String, String>,
    ) -> Result<bool, SignatureError> {
        let public_key = RsaPublicKey::from_public_key_pem(public_key_pem)
            .map_err(|_| SignatureError::InvalidPublicKey)?;

        let mut signing_lines = Vec::new();
        for name in &components.headers {
            if name == "(request-target)" {
                signing_lines.push(format!("(request-target): {} {path}", method.to_lowercase()));
            } else {
                let value = headers
                    .get(name)
                    .ok_or_else(|| SignatureError::MissingHeader(name.clone()))?;
                signing_lines.push(format!("{name}: {value}"));
            }
        }
        let signing_string = signing_lines.join("\n");

        let signature_bytes = BASE64
            .decode(&components.signature)
            .map_err(|_| SignatureError::InvalidSignatureHeader)?;
        let signature = Signature::try_from(signature_bytes.as_slice())
            .map_err(|_| SignatureError::InvalidSignatureHeader)?;

        let verifying_key = VerifyingKey::<Sha256>::new(public_key);
        match verifying_key.verify(signing_string.as_bytes(), &signature) {
            Ok(()) => Ok(true),
            Err(_) => {
                warn!(key_id = %components.key_id, "HTTP signature mismatch");
                Ok(false)
            }
        }
    }
}

/// SHA-256 digest of a request body in `Digest` header form.
#[must_use]
pub fn calculate_digest(body: &[u8]) -> String {
    let hash = Sha256::digest(body);
    format!("SHA-256={}", BASE64.encode(hash))
}

/// Whether a `Digest` header matches the request body.
#[must_use]
pub fn verify_digest(body: &[u8], digest_header: &str) -> bool {
    calculate_digest(body) == digest_header
}

/// Check a `Date` header against the local clock.
///
/// # Errors
///
/// Returns [`SignatureError::ExpiredSignature`] when the date is more than
/// `max_skew_secs` away from now, in either direction, and
/// [`SignatureError::InvalidDateFormat`] when it cannot be parsed.
pub fn validate_date(date_header: &str, max_skew_secs: i64) -> Result<(), SignatureError> {
    let date = parse_http_date(date_header)?;
    let skew = Utc::now().signed_duration_since(date).num_seconds().abs();

    if skew > max_skew_secs {
        warn!(date = %date_header, skew_secs = skew, "Date header outside the accepted window");
        return Err(SignatureError::ExpiredSignature);
    }

    Ok(())
}

/// Parse an HTTP `Date` header, accepting RFC 2822 plus the legacy formats
/// HTTP still allows.
///
/// # Errors
///
/// Returns [`SignatureError::InvalidDateFormat`] when no format matches.
pub fn parse_http_date(value: &str) -> Result<DateTime<Utc>, SignatureError> {
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Ok(date.with_timezone(&Utc));
    }

    for format in FALLBACK_DATE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(SignatureError::InvalidDateFormat(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hivecache_common::generate_rsa_keypair;

    fn header_map_to_hash_map(headers: &HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect()
    }

    #[test]
    fn test_sign_and_verify_post() {
        let keypair = generate_rsa_keypair().unwrap();
        let signer = HttpSigner::new(
            &keypair.private_key_pem,
            "https://bookmarks.example/ap/u/alice#main-key",
        )
        .unwrap();

        let url = Url::parse("https://remote.example/inbox").unwrap();
        let body = br#"{"type":"Follow"}"#;
        let headers = signer.sign_request("POST", &url, Some(body)).unwrap();

        assert!(headers.contains_key("digest"));
        assert_eq!(headers.get("host").unwrap(), "remote.example");

        let signature_header = headers.get("signature").unwrap().to_str().unwrap();
        let components = HttpVerifier::parse_signature_header(signature_header).unwrap();
        assert_eq!(
            components.key_id,
            "https://bookmarks.example/ap/u/alice#main-key"
        );
        assert_eq!(
            components.headers,
            vec!["(request-target)", "host", "date", "digest"]
        );

        let header_values = header_map_to_hash_map(&headers);
        let verified = HttpVerifier::verify(
            &keypair.public_key_pem,
            &components,
            "POST",
            "/inbox",
            &header_values,
        )
        .unwrap();
        assert!(verified);
    }

    #[test]
    fn test_get_requests_are_signed_without_digest() {
        let keypair = generate_rsa_keypair().unwrap();
        let signer = HttpSigner::new(
            &keypair.private_key_pem,
            "https://bookmarks.example/ap/u/hive#main-key",
        )
        .unwrap();

        let url = Url::parse("https://remote.example/ap/u/bob").unwrap();
        let headers = signer.sign_request("GET", &url, None).unwrap();

        assert!(!headers.contains_key("digest"));

        let signature_header = headers.get("signature").unwrap().to_str().unwrap();
        let components = HttpVerifier::parse_signature_header(signature_header).unwrap();
        assert_eq!(components.headers, vec!["(request-target)", "host", "date"]);

        let header_values = header_map_to_hash_map(&headers);
        let verified = HttpVerifier::verify(
            &keypair.public_key_pem,
            &components,
            "GET",
            "/ap/u/bob",
            &header_values,
        )
        .unwrap();
        assert!(verified);
    }

    #[test]
    fn test_host_header_includes_nonstandard_port() {
        let keypair = generate_rsa_keypair().unwrap();
        let signer = HttpSigner::new(&keypair.private_key_pem, "key").unwrap();

        let url = Url::parse("http://localhost:8080/inbox").unwrap();
        let headers = signer.sign_request("POST", &url, Some(b"{}")).unwrap();

        assert_eq!(headers.get("host").unwrap(), "localhost:8080");
    }

    #[test]
    fn test_verification_fails_with_wrong_key() {
        let keypair = generate_rsa_keypair().unwrap();
        let other = generate_rsa_keypair().unwrap();
        let signer = HttpSigner::new(&keypair.private_key_pem, "key").unwrap();

        let url = Url::parse("https://remote.example/inbox").unwrap();
        let headers = signer.sign_request("POST", &url, Some(b"{}")).unwrap();

        let signature_header = headers.get("signature").unwrap().to_str().unwrap();
        let components = HttpVerifier::parse_signature_header(signature_header).unwrap();
        let header_values = header_map_to_hash_map(&headers);

        let verified = HttpVerifier::verify(
            &other.public_key_pem,
            &components,
            "POST",
            "/inbox",
            &header_values,
        )
        .unwrap();
        assert!(!verified);
    }

    #[test]
    fn test_verification_fails_with_tampered_target() {
        let keypair = generate_rsa_keypair().unwrap();
        let signer = HttpSigner::new(&keypair.private_key_pem, "key").unwrap();

        let url = Url::parse("https://remote.example/inbox").unwrap();
        let headers = signer.sign_request("POST", &url, Some(b"{}")).unwrap();

        let signature_header = headers.get("signature").unwrap().to_str().unwrap();
        let components = HttpVerifier::parse_signature_header(signature_header).unwrap();
        let header_values = header_map_to_hash_map(&headers);

        let verified = HttpVerifier::verify(
            &keypair.public_key_pem,
            &components,
            "POST",
            "/other-inbox",
            &header_values,
        )
        .unwrap();
        assert!(!verified);
    }

    #[test]
    fn test_parse_signature_header() {
        let header = r#"keyId="https://example.com/users/alice#main-key",algorithm="rsa-sha256",headers="(request-target) host date digest",signature="c2lnbmF0dXJl""#;

        let components = HttpVerifier::parse_signature_header(header).unwrap();
        assert_eq!(components.key_id, "https://example.com/users/alice#main-key");
        assert_eq!(components.algorithm, "rsa-sha256");
        assert_eq!(
            components.headers,
            vec!["(request-target)", "host", "date", "digest"]
        );
        assert_eq!(components.signature, "c2lnbmF0dXJl");
    }

    #[test]
    fn test_parse_signature_header_defaults() {
        let header = r#"keyId="https://example.com/key",signature="c2ln""#;

        let components = HttpVerifier::parse_signature_header(header).unwrap();
        assert_eq!(components.algorithm, "rsa-sha256");
        assert_eq!(components.headers, vec!["date"]);
    }

    #[test]
    fn test_parse_signature_header_requires_key_id() {
        let result = HttpVerifier::parse_signature_header(r#"signature="c2ln""#);
        assert!(matches!(result, Err(SignatureError::InvalidSignatureHeader)));
    }

    #[test]
    fn test_digest_round_trip() {
        let body = b"hello world";
        let digest = calculate_digest(body);

        assert!(digest.starts_with("SHA-256="));
        assert!(verify_digest(body, &digest));
        assert!(!verify_digest(b"tampered body", &digest));
    }

    #[test]
    fn test_validate_date_accepts_current_time() {
        let now = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        assert!(validate_date(&now, DEFAULT_MAX_CLOCK_SKEW_SECS).is_ok());
    }

    #[test]
    fn test_validate_date_rejects_stale_date() {
        let result = validate_date("Mon, 01 Jan 1990 00:00:00 GMT", DEFAULT_MAX_CLOCK_SKEW_SECS);
        assert!(matches!(result, Err(SignatureError::ExpiredSignature)));
    }

    #[test]
    fn test_validate_date_rejects_garbage() {
        let result = validate_date("not a date", DEFAULT_MAX_CLOCK_SKEW_SECS);
        assert!(matches!(result, Err(SignatureError::InvalidDateFormat(_))));
    }

    #[test]
    fn test_parse_http_date_formats() {
        let rfc2822 = parse_http_date("Tue, 07 Jun 2022 20:51:35 GMT").unwrap();
        let rfc850 = parse_http_date("Tuesday, 07-Jun-22 20:51:35 GMT").unwrap();
        let asctime = parse_http_date("Tue Jun  7 20:51:35 2022").unwrap();

        assert_eq!(rfc2822, rfc850);
        assert_eq!(rfc2822, asctime);
    }
}
