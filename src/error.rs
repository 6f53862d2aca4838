use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in the environment")]
    Missing(&'static str),
}

/// Failures on the order-store side of the create path.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("could not allocate a unique order code after {0} attempts")]
    CodeExhausted(u32),

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("bad mailbox address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("smtp send failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}
