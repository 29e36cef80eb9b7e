use thiserror::Error;

/// Failures raised by a series fetcher.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No data found for symbol {symbol}")]
    NotFound { symbol: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request cancelled")]
    Cancelled,
}

/// Failures raised by [`SeriesImporter::import`](crate::importer::SeriesImporter::import).
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
