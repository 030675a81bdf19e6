//! Signed alert dispatch client for the SinaWatch alerting service.
//!
//! An alert carries an [`Operation`] (which service raised it), a
//! [`Content`] (what to say) and a [`Receiver`] (who to tell, over mail,
//! SMS, IVR, weibo, wechat and push, directly or by group). The client
//! encodes it as a `multipart/form-data` body, signs it and posts it to
//! `/v1/alert/send` in one blocking round trip.
//!
//! # Usage
//!
//! ```no_run
//! use sinawatch::{AlertClient, Content, Operation, Receiver};
//!
//! let client = AlertClient::new("my-kid", "my-secret", false);
//!
//! client.send_alert(
//!     &Operation {
//!         sv: "v1".to_string(),
//!         service: "pay".to_string(),
//!         object: "order-123".to_string(),
//!     },
//!     &Content {
//!         subject: "Alert".to_string(),
//!         content: "disk full".to_string(),
//!         html: String::new(),
//!     },
//!     &Receiver {
//!         mail: "ops@example.com".to_string(),
//!         ..Receiver::default()
//!     },
//!     1,
//! )?;
//! # Ok::<(), sinawatch::AlertError>(())
//! ```
//!
//! # Signing
//!
//! Every request carries `Content-MD5` (POST only), `Expires` and an
//! `Authorization: sinawatch <kid>:<token>` header. See [`signer`] for the
//! canonical string layout.
//!
//! # Configuration
//!
//! [`ClientConfig::from_env`] reads `SINAWATCH_KID`, `SINAWATCH_PASSWORD`,
//! `SINAWATCH_ICONNECT`, `SINAWATCH_HOST`, `SINAWATCH_PORT`,
//! `SINAWATCH_TIMEOUT` and `SINAWATCH_IP`.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod multipart;
pub mod notifier;
pub mod signer;
pub mod types;

pub use client::{AlertClient, PreparedRequest, ALERT_PATH};
pub use config::ClientConfig;
pub use error::AlertError;
pub use notifier::{Contact, NotificationMessage, Notifier, NotifierRegistry, SinaWatchNotifier};
pub use signer::{SignedRequest, Signer};
pub use types::{AlertRequest, AlertResponse, Content, Operation, Receiver};
