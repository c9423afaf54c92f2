//! Notification Dispatcher
//!
//! Workflow events are turned into plain-text mail after the workflow has
//! committed. Delivery is best-effort: failures are logged and dropped.

pub mod dispatcher;
pub mod messages;
pub mod smtp;

pub use dispatcher::NotificationDispatcher;
pub use smtp::SmtpMailer;

use async_trait::async_trait;
use std::sync::Arc;
use thesis_common::config::SmtpConfig;
use thiserror::Error;
use tracing::{info, warn};

/// One rendered message for one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Message build error: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Recipient lookup failed: {0}")]
    Lookup(#[from] thesis_common::Error),
}

/// Outbound mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Transport identifier for logs
    fn name(&self) -> &'static str;

    async fn send(&self, mail: &OutgoingMail) -> Result<(), NotifyError>;
}

/// Mailer that only logs; used when no SMTP server is configured
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<(), NotifyError> {
        info!(to = %mail.to_email, subject = %mail.subject, "Notification (not sent, no SMTP configured)");
        Ok(())
    }
}

/// SMTP mailer when configured and valid, log mailer otherwise
pub fn mailer_from_config(smtp: Option<&SmtpConfig>) -> Arc<dyn Mailer> {
    match smtp {
        Some(config) => match SmtpMailer::new(config) {
            Ok(mailer) => Arc::new(mailer),
            Err(e) => {
                warn!(error = %e, "SMTP configuration rejected, falling back to log mailer");
                Arc::new(LogMailer)
            }
        },
        None => Arc::new(LogMailer),
    }
}
