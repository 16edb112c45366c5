use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Mailer, NotifyError, RenderedMessage};
use crate::config::MailConfig;

/// Authenticated STARTTLS delivery of a plain + HTML alternative message.
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|source| NotifyError::Address {
        address: address.to_string(),
        source,
    })
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, NotifyError> {
        let from = mailbox(&config.sender)?;
        let to = mailbox(&config.receiver)?;

        let creds = Credentials::new(config.sender.clone(), config.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        Ok(Self { mailer, from, to })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &RenderedMessage) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(message.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                message.text.clone(),
                message.html.clone(),
            ))?;

        self.mailer.send(email).await?;
        log::info!("Email sent to {}", self.to);
        Ok(())
    }
}
