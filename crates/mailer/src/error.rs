use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("{0}")]
    Configuration(String),
    #[error("invalid mailbox address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build email: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}
