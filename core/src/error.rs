use thiserror::Error;

/// Failures surfaced while talking to the wallet provider or the contract.
///
/// None of these are fatal: each one is reported to the user at the point of
/// the failing operation and the session carries on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("Please install a wallet provider to use this app")]
    ProviderUnavailable,

    #[error("{0}")]
    ConnectionRejected(String),

    #[error("{0}")]
    CallRejected(String),

    #[error("{0}")]
    ExecutionReverted(String),

    #[error("{0}")]
    ConfirmationFailure(String),

    #[error("failed to read tasks: {0}")]
    ReadFailure(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid task status byte: {0}")]
    InvalidStatus(u8),
}

pub type ChainResult<T> = std::result::Result<T, ChainError>;
