use std::num::ParseIntError;

/// Core error type for the plant bot.
///
/// Adapter crates map their specific errors (HTTP, GPIO) into this type so the
/// dispatch loop can decide what is fatal and what is only logged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("telegram api error: {description}")]
    Api { description: String },

    #[error("unexpected http status: {status}")]
    HttpStatus { status: u16 },

    #[error("invalid duration {digits:?}: {source}")]
    InvalidDuration {
        digits: String,
        #[source]
        source: ParseIntError,
    },

    #[error("hardware error: {0}")]
    Hardware(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
