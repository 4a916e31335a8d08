use std::time::Duration;

use anyhow::Result;
use hook_core::config::{AppConfig, TrelloCredentials};
use hook_core::TicketRequest;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Client;
use tracing::instrument;

use crate::error::TrelloError;
use crate::models::Card;

const CARDS_PATH: &str = "/1/cards";

/// Minimal Trello REST client: query-string authentication, form-encoded bodies.
#[derive(Debug, Clone)]
pub struct TrelloClient {
    http: Client,
    base_url: String,
    credentials: TrelloCredentials,
}

impl TrelloClient {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let credentials = config.require_trello()?.clone();
        Ok(Self::new(
            config.trello_api_base.clone(),
            credentials,
            config.outbound_timeout(),
        )?)
    }

    pub fn new(
        base_url: impl Into<String>,
        credentials: TrelloCredentials,
        timeout: Duration,
    ) -> Result<Self, TrelloError> {
        let http = Client::builder()
            .user_agent("voicehook-backend/0.1")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Create one card at the bottom of the configured list.
    #[instrument(skip(self, ticket), fields(name = %ticket.name))]
    pub async fn create_card(&self, ticket: &TicketRequest) -> Result<Card, TrelloError> {
        let url = format!("{}{CARDS_PATH}", self.base_url);
        let form = card_form(ticket);
        tracing::info!(url = %url, fields = form.len(), "creating Trello card");

        let response = self
            .http
            .post(url)
            .query(&[
                ("idList", self.credentials.id_list.as_str()),
                ("key", self.credentials.key.as_str()),
                ("token", self.credentials.token.as_str()),
            ])
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(%status, body = %body, "Trello rejected card creation");
            return Err(TrelloError::HttpStatus { status, body });
        }

        Ok(serde_json::from_str::<Card>(&body)?)
    }
}

fn card_form(ticket: &TicketRequest) -> Vec<(&'static str, &str)> {
    let mut form = vec![("name", ticket.name.as_str())];
    if let Some(desc) = ticket.desc.as_deref().filter(|value| !value.is_empty()) {
        form.push(("desc", desc));
    }
    if let Some(due) = ticket.due_date.as_deref().filter(|value| !value.is_empty()) {
        form.push(("due", due));
    }
    form.push(("pos", "bottom"));
    form
}
