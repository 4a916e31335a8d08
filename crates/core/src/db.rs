use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_postgres::{Client, NoTls};
use tracing::{error, info, warn};

use crate::config::{AppConfig, DatabaseConfig};
use crate::types::TaskRequest;

/// Persistent store for created tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert one task and return the store-generated identifier.
    async fn insert_task(&self, task: &TaskRequest) -> Result<String>;
}

enum ConnectionState {
    Disconnected,
    Connected(Arc<Client>),
}

/// Owns the single PostgreSQL connection of the process.
///
/// `connect` and `disconnect` are idempotent: repeated calls within one process
/// lifetime reuse the established client instead of reconnecting.
pub struct Database {
    settings: Option<DatabaseConfig>,
    state: RwLock<ConnectionState>,
}

impl Database {
    pub fn new(settings: Option<DatabaseConfig>) -> Self {
        Self {
            settings,
            state: RwLock::new(ConnectionState::Disconnected),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.database.clone())
    }

    pub async fn connect(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if let ConnectionState::Connected(client) = &*state {
            if !client.is_closed() {
                info!("database already connected");
                return Ok(());
            }
            warn!("database connection was closed, reconnecting");
        }

        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| anyhow!("DATABASE_URL environment variable is not set"))?;

        let client = match connect_client(&settings.url).await {
            Ok(client) => client,
            Err(err) => {
                error!(error = ?err, "database connection error");
                *state = ConnectionState::Disconnected;
                return Err(err);
            }
        };

        run_migrations(&client, &settings.schema).await?;
        *state = ConnectionState::Connected(Arc::new(client));
        info!(schema = %settings.schema, "successfully connected to database");
        Ok(())
    }

    pub async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if matches!(&*state, ConnectionState::Disconnected) {
            return Ok(());
        }

        // dropping the last client handle ends the connection task
        *state = ConnectionState::Disconnected;
        info!("database disconnected");
        Ok(())
    }

    async fn client(&self) -> Result<Arc<Client>> {
        if let ConnectionState::Connected(client) = &*self.state.read().await {
            if !client.is_closed() {
                return Ok(Arc::clone(client));
            }
        }

        self.connect().await?;
        match &*self.state.read().await {
            ConnectionState::Connected(client) => Ok(Arc::clone(client)),
            ConnectionState::Disconnected => Err(anyhow!("database is not connected")),
        }
    }

    fn schema(&self) -> &str {
        self.settings
            .as_ref()
            .map(|settings| settings.schema.as_str())
            .unwrap_or("public")
    }
}

#[async_trait]
impl TaskStore for Database {
    async fn insert_task(&self, task: &TaskRequest) -> Result<String> {
        let client = self.client().await?;
        let sql = format!(
            "INSERT INTO {schema}.tasks (title, description, priority, due_date) \
             VALUES ($1, $2, $3, $4) RETURNING id::text;",
            schema = self.schema(),
        );

        let row = client
            .query_one(
                &sql,
                &[
                    &task.title,
                    &task.description,
                    &task.priority.as_str(),
                    &task.due_date,
                ],
            )
            .await
            .map_err(|err| {
                warn!(%err, "failed to insert task record");
                anyhow!(err)
            })?;

        Ok(row.try_get::<_, String>(0)?)
    }
}

async fn connect_client(url: &str) -> Result<Client> {
    let (client, connection) = tokio_postgres::connect(url, NoTls).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            warn!(%err, "postgres connection error");
        }
    });
    Ok(client)
}

async fn run_migrations(client: &Client, schema: &str) -> Result<()> {
    for statement in migration_statements(schema) {
        let trimmed = statement.trim();
        if trimmed.is_empty() {
            continue;
        }

        match client.batch_execute(trimmed).await {
            Ok(_) => {}
            Err(err) if trimmed.starts_with("CREATE EXTENSION IF NOT EXISTS pgcrypto") => {
                warn!(?err, "failed to create pgcrypto extension, continuing");
            }
            Err(err) => {
                if let Some(db_err) = err.as_db_error() {
                    warn!(
                        stmt = trimmed,
                        code = db_err.code().code(),
                        message = db_err.message(),
                        detail = db_err.detail().unwrap_or_default(),
                        "database migration statement failed"
                    );
                } else {
                    warn!(?err, stmt = trimmed, "database migration statement failed");
                }
                return Err(err.into());
            }
        }
    }

    Ok(())
}

fn migration_statements(schema: &str) -> Vec<String> {
    vec![
        "CREATE EXTENSION IF NOT EXISTS pgcrypto;".to_string(),
        format!("CREATE SCHEMA IF NOT EXISTS {schema};"),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.tasks (
                id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title           TEXT NOT NULL DEFAULT '',
                description     TEXT NOT NULL DEFAULT '',
                priority        TEXT NOT NULL DEFAULT 'medium'
                                CHECK (priority IN ('low', 'medium', 'high')),
                due_date        TIMESTAMPTZ,
                created_at      TIMESTAMPTZ NOT NULL DEFAULT now()
            );"
        ),
    ]
}
