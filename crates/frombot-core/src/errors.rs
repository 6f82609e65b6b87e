/// Core error type for the relay.
///
/// Adapter crates map their specific errors into this type so the pipeline can
/// treat every failure the same way (log it, never crash on it). Only
/// `Config` is fatal, and only at startup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("pseudonym pool exhausted: all {pool_size} words are assigned")]
    PoolExhausted { pool_size: usize },

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
