use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use hook_core::{AppConfig, Database, TaskStore};
use mailer::{Notifier, SmtpNotifier};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};
use trello::TrelloClient;

mod config;
mod routes;
mod tunnel;

use config::{load_server_settings, ServerSettings};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    pub notifier: Arc<dyn Notifier>,
    /// `None` when the Trello credentials are incomplete.
    pub trello: Option<TrelloClient>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (settings, settings_error) = match load_server_settings() {
        Ok(settings) => (settings, None),
        Err(err) => (ServerSettings::default(), Some(err)),
    };
    init_tracing(&settings.log_dir());
    if let Some(err) = settings_error {
        warn!("failed to load server settings: {err}, using defaults");
    }

    let config = AppConfig::load_from_env()?;

    let database = Arc::new(Database::from_config(&config));
    if let Err(err) = database.connect().await {
        tracing::error!(error = ?err, "failed to connect to database");
        return Err(err);
    }

    let trello = match TrelloClient::from_config(&config) {
        Ok(client) => Some(client),
        Err(err) => {
            warn!(%err, "Trello client not initialised");
            None
        }
    };

    let app_state = AppState {
        store: database.clone(),
        notifier: Arc::new(SmtpNotifier::from_config(&config)),
        trello,
    };

    let bind_addr = settings.bind_addr(config.port)?;

    let _tunnel = if config.enable_tunnel {
        match tunnel::spawn_tunnel(settings.tunnel_command(), bind_addr.port()) {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(%err, "tunnel not started");
                None
            }
        }
    } else {
        None
    };

    let router = routes::api_routes()
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_methods(Any).allow_origin(Any));

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("server listening on {bind_addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database.disconnect().await?;
    info!("server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn init_tracing(log_dir: &Path) {
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("failed to create log directory {log_dir:?}: {err}");
    }

    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(log_dir, "api-server.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let env_filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());

    let fmt_stdout = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);
    let fmt_file = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    let subscriber = Registry::default()
        .with(env_filter)
        .with(fmt_stdout)
        .with(fmt_file);

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("tracing already initialised");
    }
}
