pub mod error;
pub mod smtp;
pub mod templates;

use anyhow::Result;
use async_trait::async_trait;
use hook_core::{TaskRequest, TicketRequest};

pub use error::MailerError;
pub use smtp::SmtpNotifier;
pub use templates::{render_card_email, render_task_email, RenderedEmail};

/// Informational notifications sent after a primary effect succeeded.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn task_created(&self, task_id: &str, task: &TaskRequest) -> Result<()>;

    async fn card_created(&self, card_id: &str, ticket: &TicketRequest) -> Result<()>;
}
