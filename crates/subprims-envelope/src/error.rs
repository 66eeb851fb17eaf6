/// Errors that can occur while decoding an envelope.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The payload is not UTF-8 text.
    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The payload is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The JSON does not have the envelope shape.
    #[error("invalid envelope field `{field}`: {reason}")]
    InvalidShape { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, DecodeError>;
