use thiserror::Error;

#[derive(Debug, Error)]
pub enum DurabilityError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("a snapshot or log rewrite is already in progress")]
    AlreadyInProgress,
}
