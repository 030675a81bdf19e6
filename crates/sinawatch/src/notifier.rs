//! Notification capability interface and the SinaWatch-backed notifier.
//!
//! [`Notifier`] is the channel-agnostic contract: a [`Contact`] with
//! per-channel target lists plus a [`NotificationMessage`].
//! [`SinaWatchNotifier`] implements it on top of [`AlertClient`], and
//! [`NotifierRegistry`] maps names to notifiers for callers that pick a
//! backend by configuration.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::client::AlertClient;
use crate::error::AlertError;
use crate::types::{AlertResponse, Content, Operation, Receiver};

/// Separator used when a target list is flattened into one receiver field.
pub const TARGET_SEPARATOR: &str = ",";

/// Who to notify, per channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mail: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mail_group: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sms: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sms_group: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ivr: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ivr_group: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub wechat: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub wechat_group: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weibo: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weibo_group: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub push: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub push_group: Vec<String>,
}

impl From<&Contact> for Receiver {
    fn from(contact: &Contact) -> Self {
        let join = |targets: &[String]| targets.join(TARGET_SEPARATOR);

        Self {
            mail: join(&contact.mail),
            sms: join(&contact.sms),
            ivr: join(&contact.ivr),
            weibo: join(&contact.weibo),
            wechat: join(&contact.wechat),
            push: join(&contact.push),
            mail_group: join(&contact.mail_group),
            sms_group: join(&contact.sms_group),
            ivr_group: join(&contact.ivr_group),
            weibo_group: join(&contact.weibo_group),
            wechat_group: join(&contact.wechat_group),
            push_group: join(&contact.push_group),
        }
    }
}

/// What to say.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub subject: String,
    pub content: String,
    /// `content` is HTML.
    #[serde(default)]
    pub is_html: bool,
    /// Backend-specific options.
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

/// A notification backend.
pub trait Notifier: Send + Sync {
    /// Get the name of this notifier.
    fn name(&self) -> &'static str;

    /// Deliver a message, blocking until the backend answers.
    ///
    /// # Errors
    /// Returns the backend's error when delivery fails or is rejected.
    fn send(
        &self,
        contact: &Contact,
        message: &NotificationMessage,
    ) -> Result<AlertResponse, AlertError>;
}

/// [`Notifier`] that delivers through the SinaWatch alert endpoint.
///
/// `extra` keys `sv`, `service`, `object` (strings) and `auto_merge`
/// (integer) override the defaults set at construction.
#[derive(Debug, Clone)]
pub struct SinaWatchNotifier {
    client: AlertClient,
    operation: Operation,
    auto_merge: i32,
}

impl SinaWatchNotifier {
    #[must_use]
    pub const fn new(client: AlertClient, operation: Operation) -> Self {
        Self {
            client,
            operation,
            auto_merge: 0,
        }
    }

    #[must_use]
    pub fn with_auto_merge(mut self, auto_merge: i32) -> Self {
        self.auto_merge = auto_merge;
        self
    }

    #[must_use]
    pub const fn client(&self) -> &AlertClient {
        &self.client
    }

    fn operation_for(&self, message: &NotificationMessage) -> Operation {
        let text = |key: &str| message.extra.get(key).and_then(Value::as_str);

        Operation {
            sv: text("sv").unwrap_or(self.operation.sv.as_str()).to_string(),
            service: text("service").unwrap_or(self.operation.service.as_str()).to_string(),
            object: text("object").unwrap_or(self.operation.object.as_str()).to_string(),
        }
    }

    fn auto_merge_for(&self, message: &NotificationMessage) -> i32 {
        message
            .extra
            .get("auto_merge")
            .and_then(Value::as_i64)
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(self.auto_merge)
    }

    /// Deliver on the blocking thread pool and wait for the result.
    ///
    /// # Errors
    /// Returns the delivery error, or [`AlertError::Task`] if the worker
    /// panicked or was cancelled.
    pub async fn send_async(
        &self,
        contact: Contact,
        message: NotificationMessage,
    ) -> Result<AlertResponse, AlertError> {
        let notifier = self.clone();
        tokio::task::spawn_blocking(move || notifier.send(&contact, &message))
            .await
            .map_err(|e| AlertError::Task(e.to_string()))?
    }

    /// Deliver in the background (fire-and-forget).
    ///
    /// Errors are logged but not propagated to the caller. Must be called
    /// from within a Tokio runtime.
    pub fn notify(&self, contact: Contact, message: NotificationMessage) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::task::spawn_blocking(move || match notifier.send(&contact, &message) {
            Ok(_) => debug!(notifier = notifier.name(), "Notification sent"),
            Err(e) => error!(
                notifier = notifier.name(),
                error = %e,
                "Failed to send notification"
            ),
        })
    }
}

impl Notifier for SinaWatchNotifier {
    fn name(&self) -> &'static str {
        "sinawatch"
    }

    fn send(
        &self,
        contact: &Contact,
        message: &NotificationMessage,
    ) -> Result<AlertResponse, AlertError> {
        let content = Content {
            subject: message.subject.clone(),
            content: message.content.clone(),
            html: if message.is_html {
                message.content.clone()
            } else {
                String::new()
            },
        };

        self.client.send_alert(
            &self.operation_for(message),
            &content,
            &Receiver::from(contact),
            self.auto_merge_for(message),
        )
    }
}

/// Name-to-notifier lookup owned by the caller.
#[derive(Default, Clone)]
pub struct NotifierRegistry {
    notifiers: BTreeMap<String, Arc<dyn Notifier>>,
}

impl NotifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a notifier under `name`.
    ///
    /// # Errors
    /// Returns [`AlertError::DuplicateNotifier`] if `name` is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<(), AlertError> {
        let name = name.into();
        if self.notifiers.contains_key(&name) {
            return Err(AlertError::DuplicateNotifier(name));
        }
        debug!(name = %name, backend = notifier.name(), "Registered notifier");
        self.notifiers.insert(name, notifier);
        Ok(())
    }

    /// Look up a notifier by name.
    ///
    /// # Errors
    /// Returns [`AlertError::UnknownNotifier`] if nothing is registered.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Notifier>, AlertError> {
        self.notifiers
            .get(name)
            .cloned()
            .ok_or_else(|| AlertError::UnknownNotifier(name.to_string()))
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.notifiers.keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl std::fmt::Debug for NotifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierRegistry")
            .field("names", &self.names())
            .finish()
    }
}
