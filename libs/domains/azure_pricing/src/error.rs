use thiserror::Error;

/// Result type for pricing operations
pub type PricingResult<T> = Result<T, PricingError>;

/// Errors that can occur while querying the retail pricing API
#[derive(Debug, Error)]
pub enum PricingError {
    /// Connection, timeout or other transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-2xx status
    #[error("Upstream returned status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    /// Upstream body was not the expected JSON
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Client misuse or invalid client configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Tool arguments could not be interpreted
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tool name not known to the dispatcher
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl PricingError {
    /// True for failures that came from talking to the upstream endpoint.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PricingError::Http(_) | PricingError::UpstreamStatus { .. } | PricingError::Parse(_)
        )
    }

    /// Transient failures worth another attempt: connect errors, timeouts,
    /// bodies cut off mid-stream, throttling and server-side errors. Client
    /// errors and bad JSON fail fast.
    pub fn is_retryable(&self) -> bool {
        match self {
            PricingError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            PricingError::UpstreamStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
