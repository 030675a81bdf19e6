//! `multipart/form-data` encoding for flat text fields.
//!
//! The body is built by hand so its bytes are known before sending: the
//! MD5 of the exact body is part of the request signature.

const CRLF: &str = "\r\n";
const BOUNDARY_PREFIX: &str = "----------0x";

/// An encoded form body and its `Content-Type` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    pub boundary: String,
    pub content_type: String,
    pub body: String,
}

/// Boundary token derived from the current time in microseconds.
#[must_use]
pub fn boundary() -> String {
    boundary_at(chrono::Utc::now().timestamp_micros())
}

/// Boundary token for a given microsecond timestamp.
#[must_use]
pub fn boundary_at(unix_micros: i64) -> String {
    format!("{BOUNDARY_PREFIX}{unix_micros:x}")
}

/// Encode text fields as a multipart form body.
#[must_use]
pub fn encode<K, V>(fields: &[(K, V)], boundary: &str) -> MultipartBody
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut lines = Vec::with_capacity(fields.len() * 4 + 2);
    for (name, value) in fields {
        lines.push(format!("--{boundary}"));
        lines.push(format!(
            "Content-Disposition: form-data; name=\"{}\"",
            name.as_ref()
        ));
        lines.push(String::new());
        lines.push(value.as_ref().to_string());
    }
    lines.push(format!("--{boundary}--"));
    lines.push(String::new());

    MultipartBody {
        boundary: boundary.to_string(),
        content_type: format!("multipart/form-data; boundary={boundary}"),
        body: lines.join(CRLF),
    }
}
