use std::future::Future;

use lettre::{
    message::{header::ContentType, Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSendmailTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;

/// An email ready to hand to the transport.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("email sending is disabled")]
    Disabled,
    #[error("invalid address: {0}")]
    Address(String),
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Outbound mail seam. The production implementation wraps lettre; tests
/// substitute a recording mock.
pub trait MailSender: Send + Sync {
    fn send(&self, email: OutboundEmail) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// Sends mail via local sendmail or an SMTP relay, per config.
#[derive(Clone)]
pub struct Mailer {
    config: SmtpConfig,
}

impl Mailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, email: &OutboundEmail) -> Result<Message, MailError> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| MailError::Address(format!("{}: {}", self.config.from_email, e)))?;
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| MailError::Address(format!("{}: {}", email.to, e)))?;

        let builder = Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.clone());

        match &email.html {
            Some(html) => builder
                .multipart(MultiPart::alternative_plain_html(
                    email.text.clone(),
                    html.clone(),
                ))
                .map_err(|e| MailError::Build(e.to_string())),
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(email.text.clone())
                .map_err(|e| MailError::Build(e.to_string())),
        }
    }

    async fn deliver(&self, message: Message) -> Result<(), MailError> {
        if self.config.use_sendmail {
            let mailer = AsyncSendmailTransport::<Tokio1Executor>::new();
            mailer
                .send(message)
                .await
                .map_err(|e| MailError::Transport(e.to_string()))?;
        } else {
            let creds = Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            );
            let mailer: AsyncSmtpTransport<Tokio1Executor> =
                AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)
                    .map_err(|e| MailError::Transport(e.to_string()))?
                    .credentials(creds)
                    .port(self.config.port)
                    .build();
            mailer
                .send(message)
                .await
                .map_err(|e| MailError::Transport(e.to_string()))?;
        }
        Ok(())
    }
}

impl MailSender for Mailer {
    fn send(&self, email: OutboundEmail) -> impl Future<Output = Result<(), MailError>> + Send {
        async move {
            if !self.config.enabled {
                tracing::warn!("Email disabled, dropping message to {}", email.to);
                return Err(MailError::Disabled);
            }

            let message = self.build_message(&email)?;
            self.deliver(message).await?;
            tracing::info!("Email sent to {}", email.to);
            Ok(())
        }
    }
}
