//! Alert value objects and the request/response shapes sent over the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AlertError;

/// Alerting context: which service version, service and object raised it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub sv: String,
    pub service: String,
    pub object: String,
}

/// Alert text. The service expects at least one of `content`/`html`;
/// this client does not check it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub subject: String,
    pub content: String,
    #[serde(default)]
    pub html: String,
}

/// Alert targets: one direct and one group field per channel.
///
/// Each field is an opaque, caller-formatted list. An empty string means
/// the field is unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Receiver {
    pub mail: String,
    pub sms: String,
    pub ivr: String,
    pub weibo: String,
    pub wechat: String,
    pub push: String,
    pub mail_group: String,
    pub sms_group: String,
    pub ivr_group: String,
    pub weibo_group: String,
    pub wechat_group: String,
    pub push_group: String,
}

impl Receiver {
    /// No target is set on any channel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_mail_empty()
            && self.is_sms_empty()
            && self.is_ivr_empty()
            && self.is_weibo_empty()
            && self.is_wechat_empty()
            && self.is_push_empty()
    }

    #[must_use]
    pub fn is_mail_empty(&self) -> bool {
        self.mail.is_empty() && self.mail_group.is_empty()
    }

    #[must_use]
    pub fn is_sms_empty(&self) -> bool {
        self.sms.is_empty() && self.sms_group.is_empty()
    }

    #[must_use]
    pub fn is_ivr_empty(&self) -> bool {
        self.ivr.is_empty() && self.ivr_group.is_empty()
    }

    #[must_use]
    pub fn is_weibo_empty(&self) -> bool {
        self.weibo.is_empty() && self.weibo_group.is_empty()
    }

    #[must_use]
    pub fn is_wechat_empty(&self) -> bool {
        self.wechat.is_empty() && self.wechat_group.is_empty()
    }

    #[must_use]
    pub fn is_push_empty(&self) -> bool {
        self.push.is_empty() && self.push_group.is_empty()
    }
}

/// One alert as submitted to `/v1/alert/send`.
#[derive(Debug, Clone, Copy)]
pub struct AlertRequest<'a> {
    pub url: &'a str,
    pub auto_merge: i32,
    pub operation: &'a Operation,
    pub content: &'a Content,
    pub receiver: &'a Receiver,
}

impl AlertRequest<'_> {
    /// Flat form fields in wire order.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let Self {
            url,
            auto_merge,
            operation,
            content,
            receiver,
        } = *self;

        vec![
            ("url", url.to_string()),
            ("auto_merge", auto_merge.to_string()),
            ("sv", operation.sv.clone()),
            ("service", operation.service.clone()),
            ("object", operation.object.clone()),
            ("subject", content.subject.clone()),
            ("content", content.content.clone()),
            ("html", content.html.clone()),
            ("mailto", receiver.mail.clone()),
            ("msgto", receiver.sms.clone()),
            ("ivrto", receiver.ivr.clone()),
            ("weiboto", receiver.weibo.clone()),
            ("wechatto", receiver.wechat.clone()),
            ("pushto", receiver.push.clone()),
            ("gmailto", receiver.mail_group.clone()),
            ("gmsgto", receiver.sms_group.clone()),
            ("givrto", receiver.ivr_group.clone()),
            ("gweiboto", receiver.weibo_group.clone()),
            ("gwechatto", receiver.wechat_group.clone()),
            ("gpushto", receiver.push_group.clone()),
        ]
    }
}

/// Decoded JSON response. `code` and `message` are interpreted; every other
/// key is kept as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertResponse {
    fields: Map<String, Value>,
}

impl AlertResponse {
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Decode a response body. Anything but a JSON object is an error.
    ///
    /// # Errors
    /// Returns the `serde_json` error when the body is not a JSON object.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body).map(Self::new)
    }

    /// Integer status code; `0` means accepted.
    ///
    /// # Errors
    /// Returns [`AlertError::InvalidStatusCode`] when `code` is missing or is
    /// not an integer.
    pub fn code(&self) -> Result<i64, AlertError> {
        match self.fields.get("code") {
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| AlertError::InvalidStatusCode(n.to_string())),
            Some(other) => Err(AlertError::InvalidStatusCode(other.to_string())),
            None => Err(AlertError::InvalidStatusCode("missing".to_string())),
        }
    }

    /// The `message` field; non-string values are rendered as JSON text.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self.fields.get("message")? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.code(), Ok(0))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
