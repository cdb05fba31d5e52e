//! Contact relay: turns a contact form submission into an email.
//!
//! Delivery goes through the [`MailSender`] trait so the routes can be
//! exercised without an SMTP server; [`SmtpMailSender`] is the production
//! implementation (authenticated STARTTLS via lettre).

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::MailConfig;
use crate::forms::ContactForm;

pub const CONTACT_SUBJECT: &str = "Blog Website Contact";

/// A visitor's message, as relayed to the site owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub message: String,
}

impl From<ContactForm> for ContactMessage {
    fn from(form: ContactForm) -> Self {
        Self {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone_number: form.phone_number.trim().to_string(),
            message: form.message,
        }
    }
}

impl ContactMessage {
    /// Plain text body of the relayed email
    pub fn render_text(&self) -> String {
        format!(
            "You got a contact message\n\nFrom: {}\nemail: {}\nphone number: {}\nmessage: {}\n",
            self.name, self.email, self.phone_number, self.message
        )
    }
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, message: &ContactMessage) -> Result<()>;
}

/// Build the email for a contact message
pub fn build_email(from_address: &str, to_address: &str, message: &ContactMessage) -> Result<Message> {
    let from: Mailbox = format!("noreply <{}>", from_address)
        .parse()
        .with_context(|| format!("Invalid sender address: {}", from_address))?;
    let to: Mailbox = to_address
        .parse()
        .with_context(|| format!("Invalid recipient address: {}", to_address))?;

    let mut builder = Message::builder()
        .from(from)
        .to(to)
        .subject(CONTACT_SUBJECT)
        .header(ContentType::TEXT_PLAIN);

    // Lets the owner answer the visitor directly
    if let Ok(reply_to) = format!("{} <{}>", message.name, message.email).parse::<Mailbox>() {
        builder = builder.reply_to(reply_to);
    }

    Ok(builder.body(message.render_text())?)
}

/// Sends contact messages through an authenticated SMTP relay
pub struct SmtpMailSender {
    config: MailConfig,
}

impl SmtpMailSender {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, message: &ContactMessage) -> Result<()> {
        let (from_address, password, to_address) = match (
            &self.config.from_address,
            &self.config.password,
            &self.config.to_address,
        ) {
            (Some(from), Some(password), Some(to)) => (from, password, to),
            _ => {
                tracing::warn!("Mail relay not configured, dropping contact message");
                anyhow::bail!("Mail relay not configured");
            }
        };

        let email = build_email(from_address, to_address, message)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(from_address.clone(), password.clone()))
            .build();

        mailer.send(email).await?;

        tracing::info!(
            to = %to_address,
            from_visitor = %message.email,
            "Contact message relayed"
        );

        Ok(())
    }
}
