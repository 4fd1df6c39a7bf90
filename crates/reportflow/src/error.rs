use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend API error: {0}")]
    Api(#[from] ApiError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid backend base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid calendar week label '{label}': expected CW01..CW53")]
    InvalidWeekLabel { label: String },

    #[error("Filename '{filename}' carries no usable report metadata: {reason}")]
    UnparsableFilename { filename: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend rejected the request ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Task stream error: {0}")]
    Stream(String),
}

impl ApiError {
    /// Whether this error came from transport rather than the backend
    /// explicitly refusing the request.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Stream(_))
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
