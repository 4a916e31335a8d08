pub mod client;
pub mod error;
pub mod models;

pub use client::TrelloClient;
pub use error::TrelloError;
pub use models::Card;
