#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum FaersError {
    #[error("HTTP client initialization failed: {0}")]
    HttpClientInit(reqwest::Error),

    #[error("Fetch failed: {0}")]
    FetchFailed(#[from] reqwest::Error),

    #[error("Fetch failed: {api}: {message}")]
    FetchAborted { api: String, message: String },

    #[error("Fetch failed: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    #[error("Upstream error from {api}: {message}")]
    Upstream { api: String, message: String },

    #[error("Fetch failed: {api} returned an unreadable response body: {source}")]
    UpstreamJson {
        api: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid parameters: {0}")]
    InvalidArgument(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FaersError {
    /// True when the caller sent something the server cannot act on; these
    /// are raised before any upstream request is made.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::UnknownTool(_))
    }
}
