use thiserror::Error;

/// Everything that can go wrong between the client and the prediction
/// service, plus the user errors caught before a request is made.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (DNS, refused, reset, ...).
    #[error("network error: {0}")]
    Transport(String),

    /// Non-2xx status without a usable error body.
    #[error("HTTP {0}")]
    Status(u16),

    /// The service answered but reported failure (`success: false` or an
    /// `error` field in a non-2xx body).
    #[error("{0}")]
    Api(String),

    /// The response body did not match the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The streaming endpoint aborted or produced nothing usable.
    #[error("stream error: {0}")]
    Stream(String),

    /// An action needs a prediction result and none exists yet.
    #[error("Make a prediction first!")]
    MissingPrediction,

    /// Local input validation failed.
    #[error("{0}")]
    InvalidInput(String),
}

impl ClientError {
    /// True for failures that happened before any bytes reached the service.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::MissingPrediction | Self::InvalidInput(_))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
