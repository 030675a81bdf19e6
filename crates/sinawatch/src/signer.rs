//! Request signing.
//!
//! A request is signed over a canonical string:
//!
//! ```text
//! METHOD \n CONTENT-MD5 \n CONTENT-TYPE \n EXPIRES \n EXTENSION-HEADERS PATH
//! ```
//!
//! The HMAC-SHA1 of that string is base64 encoded and ten characters from
//! offset five form the signature token sent as
//! `Authorization: sinawatch <kid>:<token>`.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, EXPIRES};
use reqwest::Method;
use sha1::Sha1;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::AlertError;

type HmacSha1 = Hmac<Sha1>;

/// Body digest header, set on POST requests only.
pub const CONTENT_MD5: &str = "content-md5";

/// Header carrying the configured source address.
pub const SOURCE_IP_HEADER: &str = "x-sinawatch-ip";

/// Header name prefixes included in the signature.
pub const EXTENSION_HEADER_PREFIXES: [&str; 2] = ["x-sinawatch-", "x-sina-"];

const AUTH_SCHEME: &str = "sinawatch";
const SIGNATURE_OFFSET: usize = 5;
const SIGNATURE_LEN: usize = 10;

/// The parts of a request covered by the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub method: Method,
    /// Hex MD5 of the body, empty for non-POST requests.
    pub content_md5: String,
    pub content_type: String,
    pub expires: String,
    /// `name:value\n` lines for every extension header.
    pub canonical_headers: String,
    pub path: String,
}

impl SignedRequest {
    #[must_use]
    pub fn string_to_sign(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}{}",
            self.method,
            self.content_md5,
            self.content_type,
            self.expires,
            self.canonical_headers,
            self.path
        )
    }
}

/// Render the extension headers covered by the signature.
///
/// Headers are ordered by lowercased name; only the first value of a
/// repeated header is used.
#[must_use]
pub fn canonicalize_headers(headers: &HeaderMap) -> String {
    let selected: BTreeMap<String, String> = headers
        .keys()
        .filter_map(|name| {
            let lower = name.as_str().to_ascii_lowercase();
            if !EXTENSION_HEADER_PREFIXES
                .iter()
                .any(|prefix| lower.starts_with(prefix))
            {
                return None;
            }
            let value = headers.get(name)?;
            let value = String::from_utf8_lossy(value.as_bytes()).trim().to_string();
            Some((lower, value))
        })
        .collect();

    selected
        .into_iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect()
}

/// Hex MD5 digest of a request body.
#[must_use]
pub fn content_md5(body: &[u8]) -> String {
    hex::encode(Md5::digest(body))
}

/// Signs requests with a key id and shared secret.
#[derive(Clone)]
pub struct Signer {
    key_id: String,
    secret: String,
    timeout_secs: u64,
    source_ip: Option<String>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("key_id", &self.key_id)
            .field("timeout_secs", &self.timeout_secs)
            .field("source_ip", &self.source_ip)
            .finish_non_exhaustive()
    }
}

impl Signer {
    #[must_use]
    pub fn new(key_id: impl Into<String>, secret: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            key_id: key_id.into(),
            secret: secret.into(),
            timeout_secs,
            source_ip: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            key_id: config.key_id().to_string(),
            secret: config.secret().to_string(),
            timeout_secs: config.timeout_secs(),
            source_ip: config.source_ip().map(str::to_string),
        }
    }

    #[must_use]
    pub fn with_source_ip(mut self, ip: impl Into<String>) -> Self {
        self.source_ip = Some(ip.into());
        self
    }

    /// Add `Content-MD5`, `Expires`, the optional source-ip header and
    /// `Authorization` to `headers`.
    ///
    /// `Content-Type` must already be present; it is part of the signed
    /// string. `unix_secs` is the current time in seconds.
    ///
    /// # Errors
    /// Returns an error if a header value is not valid HTTP or the secret
    /// cannot key the HMAC.
    pub fn sign(
        &self,
        headers: &mut HeaderMap,
        method: &Method,
        body: &[u8],
        path: &str,
        unix_secs: i64,
    ) -> Result<SignedRequest, AlertError> {
        let content_md5 = if *method == Method::POST {
            let digest = content_md5(body);
            headers.insert(
                HeaderName::from_static(CONTENT_MD5),
                HeaderValue::from_str(&digest)?,
            );
            digest
        } else {
            String::new()
        };

        let content_type = headers
            .get(CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();

        // Seconds and timeout are concatenated as text, not added.
        let expires = format!("{unix_secs}{}", self.timeout_secs);
        headers.insert(EXPIRES, HeaderValue::from_str(&expires)?);

        if let Some(ip) = self.source_ip.as_deref().filter(|ip| !ip.is_empty()) {
            headers.insert(
                HeaderName::from_static(SOURCE_IP_HEADER),
                HeaderValue::from_str(ip)?,
            );
        }

        let request = SignedRequest {
            method: method.clone(),
            content_md5,
            content_type,
            expires,
            canonical_headers: canonicalize_headers(headers),
            path: path.to_string(),
        };

        let authorization = self.authorization(&request)?;
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&authorization)?);

        debug!(method = %request.method, path = %request.path, "Signed request");

        Ok(request)
    }

    /// Signature token for a canonical string.
    ///
    /// # Errors
    /// Returns [`AlertError::Signing`] if the secret cannot key the HMAC.
    pub fn signature(&self, string_to_sign: &str) -> Result<String, AlertError> {
        let mut mac = HmacSha1::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AlertError::Signing(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        let encoded = STANDARD.encode(mac.finalize().into_bytes());

        encoded
            .get(SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_LEN)
            .map(str::to_string)
            .ok_or_else(|| AlertError::Signing(format!("digest too short: {}", encoded.len())))
    }

    /// `Authorization` header value for a signed request.
    ///
    /// # Errors
    /// See [`Signer::signature`].
    pub fn authorization(&self, request: &SignedRequest) -> Result<String, AlertError> {
        let token = self.signature(&request.string_to_sign())?;
        Ok(format!("{AUTH_SCHEME} {}:{token}", self.key_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = b"--b\r\nContent-Disposition: form-data; name=\"subject\"\r\n\r\n\
                          Alert\r\n--b--\r\n";
    const NOW: i64 = 1_700_000_000;

    fn form_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=b"),
        );
        headers
    }

    fn expected_token(secret: &str, string_to_sign: &str) -> String {
        let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(string_to_sign.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())[5..15].to_string()
    }

    #[test]
    fn test_content_md5_known_vectors() {
        assert_eq!(content_md5(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            content_md5(b"The quick brown fox jumps over the lazy dog"),
            "9e107d9d372bb6826bd81d3542a419d6"
        );
    }

    #[test]
    fn test_string_to_sign_layout() {
        let request = SignedRequest {
            method: Method::POST,
            content_md5: "abc".to_string(),
            content_type: "multipart/form-data; boundary=b".to_string(),
            expires: "17000000001".to_string(),
            canonical_headers: "x-sinawatch-ip:10.0.0.1\n".to_string(),
            path: "/v1/alert/send".to_string(),
        };

        assert_eq!(
            request.string_to_sign(),
            "POST\nabc\nmultipart/form-data; boundary=b\n17000000001\n\
             x-sinawatch-ip:10.0.0.1\n/v1/alert/send"
        );
    }

    #[test]
    fn test_sign_post_sets_headers() {
        let signer = Signer::new("kid", "secret", 1);
        let mut headers = form_headers();

        let signed = signer
            .sign(&mut headers, &Method::POST, BODY, "/v1/alert/send", NOW)
            .unwrap();

        let md5 = content_md5(BODY);
        assert_eq!(headers.get(CONTENT_MD5).unwrap(), md5.as_str());
        assert_eq!(headers.get(EXPIRES).unwrap(), "17000000001");
        assert!(headers.get(SOURCE_IP_HEADER).is_none());
        assert_eq!(signed.content_md5, md5);
        assert_eq!(signed.expires, "17000000001");
        assert_eq!(signed.canonical_headers, "");

        let expected = format!(
            "sinawatch kid:{}",
            expected_token(
                "secret",
                &format!(
                    "POST\n{md5}\nmultipart/form-data; boundary=b\n17000000001\n/v1/alert/send"
                )
            )
        );
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), expected.as_str());
    }

    #[test]
    fn test_sign_get_has_no_content_md5() {
        let signer = Signer::new("kid", "secret", 1);
        let mut headers = HeaderMap::new();

        let signed = signer
            .sign(&mut headers, &Method::GET, b"", "/v1/alert/list", NOW)
            .unwrap();

        assert!(headers.get(CONTENT_MD5).is_none());
        assert_eq!(signed.content_md5, "");
        assert!(signed.string_to_sign().starts_with("GET\n\n\n17000000001\n"));
    }

    #[test]
    fn test_sign_is_deterministic() {
        let signer = Signer::new("kid", "secret", 1).with_source_ip("10.0.0.1");

        let mut first = form_headers();
        let mut second = form_headers();
        signer
            .sign(&mut first, &Method::POST, BODY, "/v1/alert/send", NOW)
            .unwrap();
        signer
            .sign(&mut second, &Method::POST, BODY, "/v1/alert/send", NOW)
            .unwrap();

        assert_eq!(first.get(AUTHORIZATION), second.get(AUTHORIZATION));

        let mut later = form_headers();
        signer
            .sign(&mut later, &Method::POST, BODY, "/v1/alert/send", NOW + 1)
            .unwrap();
        assert_ne!(first.get(AUTHORIZATION), later.get(AUTHORIZATION));
    }

    #[test]
    fn test_source_ip_is_signed() {
        let signer = Signer::new("kid", "secret", 1).with_source_ip("10.0.0.1");
        let mut headers = form_headers();

        let signed = signer
            .sign(&mut headers, &Method::POST, BODY, "/v1/alert/send", NOW)
            .unwrap();

        assert_eq!(headers.get(SOURCE_IP_HEADER).unwrap(), "10.0.0.1");
        assert_eq!(signed.canonical_headers, "x-sinawatch-ip:10.0.0.1\n");
        assert!(signed
            .string_to_sign()
            .ends_with("\nx-sinawatch-ip:10.0.0.1\n/v1/alert/send"));
    }

    #[test]
    fn test_canonicalize_headers_filters_sorts_and_trims() {
        let mut headers = HeaderMap::new();
        headers.insert("x-sinawatch-trace", HeaderValue::from_static("  t-1 "));
        headers.insert("x-sina-user", HeaderValue::from_static("ops"));
        headers.insert("x-other", HeaderValue::from_static("ignored"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.append("x-sina-user", HeaderValue::from_static("second"));

        assert_eq!(
            canonicalize_headers(&headers),
            "x-sina-user:ops\nx-sinawatch-trace:t-1\n"
        );
    }

    #[test]
    fn test_signature_token_shape() {
        let signer = Signer::new("kid", "secret", 1);
        for input in ["", "a", "POST\n\n\n1\n/v1/alert/send"] {
            let token = signer.signature(input).unwrap();
            assert_eq!(token.len(), 10);
            assert_eq!(token, expected_token("secret", input));
        }
    }

    #[test]
    fn test_debug_hides_secret() {
        let signer = Signer::new("kid", "top-secret", 1);
        assert!(!format!("{signer:?}").contains("top-secret"));
    }
}
