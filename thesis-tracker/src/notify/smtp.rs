//! SMTP delivery over lettre's tokio transport

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thesis_common::config::SmtpConfig;
use tracing::debug;

use super::{Mailer, NotifyError, OutgoingMail};

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

fn parse_address(email: &str) -> Result<Address, NotifyError> {
    email
        .parse::<Address>()
        .map_err(|e| NotifyError::Address(format!("{}: {}", email, e)))
}

impl SmtpMailer {
    /// STARTTLS relay; credentials are sent only when a username is set
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let from = Mailbox::new(
            Some(config.sender_name.clone()),
            parse_address(&config.sender_email)?,
        );

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?.port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<(), NotifyError> {
        let to = Mailbox::new(Some(mail.to_name.clone()), parse_address(&mail.to_email)?);
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())?;

        let response = self.transport.send(message).await?;
        debug!(to = %mail.to_email, code = %response.code(), "SMTP accepted message");
        Ok(())
    }
}
