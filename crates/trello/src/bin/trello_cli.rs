use anyhow::Result;
use clap::{Parser, Subcommand};
use hook_core::{AppConfig, TicketRequest};
use trello::TrelloClient;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "trello-cli", about = "Create Trello cards with the service credentials", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a card at the bottom of the configured list
    Create {
        /// Card title
        #[arg(long, short = 'n')]
        name: String,
        /// Card description
        #[arg(long, short = 'd')]
        desc: Option<String>,
        /// Due date, e.g. 2026-11-01
        #[arg(long)]
        due: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load_from_env()?;
    let client = TrelloClient::from_config(&config)?;

    match cli.command {
        Command::Create { name, desc, due } => {
            let ticket = TicketRequest {
                name,
                desc,
                due_date: due,
            };
            let card = client.create_card(&ticket).await?;
            println!("{}", serde_json::to_string_pretty(&card)?);
        }
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
