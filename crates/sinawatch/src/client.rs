//! Alert client: request assembly, transport and response interpretation.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Method;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::AlertError;
use crate::multipart;
use crate::signer::Signer;
use crate::types::{AlertRequest, AlertResponse, Content, Operation, Receiver};

/// Path of the alert submission endpoint.
pub const ALERT_PATH: &str = "/v1/alert/send";

/// A fully built request, ready to hand to the HTTP client.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: String,
}

/// Client for the SinaWatch alerting service.
///
/// Each call performs one blocking request/response cycle bounded by the
/// configured timeout. The client holds no per-request state, so one
/// instance can be shared between threads.
#[derive(Debug, Clone)]
pub struct AlertClient {
    config: ClientConfig,
}

impl AlertClient {
    /// Create a client for the public or internal endpoint with default
    /// port, timeout and signature window.
    #[must_use]
    pub fn new(
        key_id: impl Into<String>,
        secret: impl Into<String>,
        use_internal_host: bool,
    ) -> Self {
        Self::from_config(ClientConfig::new(key_id, secret, use_internal_host))
    }

    #[must_use]
    pub const fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send one alert.
    ///
    /// Returns the decoded response when the service accepts the alert.
    ///
    /// # Errors
    /// - [`AlertError::Transport`] if the request fails or times out
    /// - [`AlertError::InvalidStatusCode`] if the response has no integer `code`
    /// - [`AlertError::Rejected`] if `code` is non-zero and a `message` is given
    pub fn send_alert(
        &self,
        operation: &Operation,
        content: &Content,
        receiver: &Receiver,
        auto_merge: i32,
    ) -> Result<AlertResponse, AlertError> {
        let request = AlertRequest {
            url: self.config.host(),
            auto_merge,
            operation,
            content,
            receiver,
        };

        let response = self.post(ALERT_PATH, &request.fields())?;
        let code = response.code()?;

        if code != 0 {
            if let Some(message) = response.message() {
                warn!(
                    code,
                    message = %message,
                    service = %operation.service,
                    "Alert rejected"
                );
                return Err(AlertError::Rejected { code, message });
            }
            warn!(code, "Alert returned non-zero code without a message");
        } else {
            info!(
                service = %operation.service,
                object = %operation.object,
                "Alert sent"
            );
        }

        Ok(response)
    }

    /// Build the signed multipart POST for `path`.
    ///
    /// `unix_secs` feeds the `Expires` header and `boundary` separates the
    /// form parts; both are parameters so the result is reproducible.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or a header cannot be encoded.
    pub fn prepare<K, V>(
        &self,
        path: &str,
        fields: &[(K, V)],
        unix_secs: i64,
        boundary: &str,
    ) -> Result<PreparedRequest, AlertError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut url = self.config.base_url()?;
        url.set_path(path);
        let url = url.to_string();

        let form = multipart::encode(fields, boundary);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(&form.content_type)?);
        headers.insert(CONTENT_LENGTH, HeaderValue::from(form.body.len()));

        if self.config.sign_requests() {
            Signer::from_config(&self.config).sign(
                &mut headers,
                &Method::POST,
                form.body.as_bytes(),
                path,
                unix_secs,
            )?;
        }

        Ok(PreparedRequest {
            url,
            headers,
            body: form.body,
        })
    }

    /// POST form fields to `path` and decode the JSON reply.
    ///
    /// A body that is not a JSON object yields an empty response.
    fn post(&self, path: &str, fields: &[(&str, String)]) -> Result<AlertResponse, AlertError> {
        let prepared = self.prepare(
            path,
            fields,
            chrono::Utc::now().timestamp(),
            &multipart::boundary(),
        )?;
        let PreparedRequest { url, headers, body } = prepared;

        debug!(url = %url, fields = fields.len(), "POST request");

        let transport = |source: reqwest::Error| AlertError::Transport {
            url: url.clone(),
            source,
        };

        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = self.config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(transport)?;

        let response = client
            .post(&url)
            .headers(headers)
            .body(body)
            .send()
            .map_err(transport)?;

        let status = response.status();
        let bytes = response.bytes().map_err(transport)?;
        debug!(url = %url, status = %status, len = bytes.len(), "Response received");

        Ok(AlertResponse::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(url = %url, error = %e, "Response is not a JSON object");
            AlertResponse::default()
        }))
    }
}
