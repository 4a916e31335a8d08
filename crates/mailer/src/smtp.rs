use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use hook_core::config::{AppConfig, MailConfig};
use hook_core::{TaskRequest, TicketRequest};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info, instrument};

use crate::error::MailerError;
use crate::templates::{render_card_email, render_task_email, RenderedEmail};
use crate::Notifier;

/// Sends notifications through an authenticated STARTTLS relay.
///
/// The transport is built per message so that a missing mail configuration only
/// fails the individual send, never server startup.
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    config: Option<MailConfig>,
    timeout: Duration,
}

impl SmtpNotifier {
    pub fn new(config: Option<MailConfig>, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.mail.clone(), config.outbound_timeout())
    }

    fn transport(&self) -> Result<(AsyncSmtpTransport<Tokio1Executor>, &MailConfig), MailerError> {
        let config = self.config.as_ref().ok_or_else(|| {
            MailerError::Configuration(
                "Email configuration is missing. Please check your .env file.".to_string(),
            )
        })?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.user.clone(),
                config.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build();

        Ok((transport, config))
    }

    #[instrument(skip_all, fields(subject = %email.subject))]
    async fn send(&self, email: RenderedEmail) -> Result<(), MailerError> {
        let result = self.try_send(email).await;
        if let Err(err) = &result {
            error!(error = %err, "error sending email");
        }
        result
    }

    async fn try_send(&self, email: RenderedEmail) -> Result<(), MailerError> {
        let (transport, config) = self.transport()?;
        let message = build_message(config, email)?;

        let response = transport.send(message).await?;
        info!(code = %response.code(), "email sent successfully");
        Ok(())
    }
}

fn build_message(config: &MailConfig, email: RenderedEmail) -> Result<Message, MailerError> {
    let from: Mailbox = config.user.parse()?;
    let to: Mailbox = config.recipient.parse()?;

    Ok(Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject)
        .multipart(MultiPart::alternative_plain_html(email.text, email.html))?)
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn task_created(&self, task_id: &str, task: &TaskRequest) -> Result<()> {
        self.send(render_task_email(task_id, task)).await?;
        Ok(())
    }

    async fn card_created(&self, card_id: &str, ticket: &TicketRequest) -> Result<()> {
        self.send(render_card_email(card_id, ticket)).await?;
        Ok(())
    }
}
