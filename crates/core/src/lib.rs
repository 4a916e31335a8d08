pub mod config;
pub mod db;
pub mod types;

pub use config::AppConfig;
pub use db::{Database, TaskStore};
pub use types::{EffectResult, Priority, TaskRequest, TicketRequest};
