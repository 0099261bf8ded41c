use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API error: {code} - {message}")]
    ApiError { code: i32, message: String },

    /// Business-level rejection returned by the venue. The message is kept verbatim.
    #[error("{message}")]
    ExchangeRejected { code: Option<i64>, message: String },

    #[error("Credential error: {0}")]
    CredentialError(String),

    #[error("Failed to get current price")]
    PriceUnavailable { instrument: String, reason: String },

    #[error("Requested close size {requested} exceeds position size {held}")]
    SizeValidation { requested: Decimal, held: Decimal },

    #[error("No position found for {0}")]
    NoPosition(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),

    #[error("Other error: {0}")]
    Other(String),
}

impl ExchangeError {
    #[cold]
    #[inline(never)]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::ExchangeRejected {
            code: None,
            message: message.into(),
        }
    }

    #[cold]
    #[inline(never)]
    pub fn credential(reason: impl Into<String>) -> Self {
        Self::CredentialError(reason.into())
    }

    #[cold]
    #[inline(never)]
    pub fn price_unavailable(instrument: &str, reason: impl Into<String>) -> Self {
        Self::PriceUnavailable {
            instrument: instrument.to_string(),
            reason: reason.into(),
        }
    }

    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::ExchangeRejected { .. })
    }
}
