use std::path::PathBuf;
use thiserror::Error;

/// Failures of the SQL -> Elasticsearch conversion pipeline.
///
/// JSON formatting problems are not represented here: an unparsable body is
/// passed through as raw text instead of failing the conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("SQL input is empty")]
    EmptyInput,
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("model API request failed with status {status}: {status_text}")]
    RemoteCall {
        status: u16,
        status_text: String,
        body: String,
    },
    #[error("model API request timed out after {secs}s")]
    RemoteTimeout { secs: u64 },
    #[error("model API request could not be sent: {0}")]
    Transport(String),
    #[error("model returned no results")]
    EmptyModelResponse,
    #[error("model API response could not be decoded: {0}")]
    InvalidResponse(String),
    #[error("model output does not start with an HTTP method and path: {0:?}")]
    MalformedDirective(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read history {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write history {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to lock history {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("system clock unavailable: {0}")]
    Clock(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    E001EmptyInput,
    E002ConfigMissing,
    E003RemoteStatus,
    E004RemoteTimeout,
    E005Transport,
    E006EmptyModelResponse,
    E007InvalidResponse,
    E008MalformedDirective,
    E009Storage,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001EmptyInput => "E001_EMPTY_INPUT",
            Self::E002ConfigMissing => "E002_CONFIG_MISSING",
            Self::E003RemoteStatus => "E003_REMOTE_STATUS",
            Self::E004RemoteTimeout => "E004_REMOTE_TIMEOUT",
            Self::E005Transport => "E005_TRANSPORT",
            Self::E006EmptyModelResponse => "E006_EMPTY_MODEL_RESPONSE",
            Self::E007InvalidResponse => "E007_INVALID_RESPONSE",
            Self::E008MalformedDirective => "E008_MALFORMED_DIRECTIVE",
            Self::E009Storage => "E009_STORAGE",
        }
    }
}

impl ConvertError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyInput => ErrorCode::E001EmptyInput,
            Self::Configuration(_) => ErrorCode::E002ConfigMissing,
            Self::RemoteCall { .. } => ErrorCode::E003RemoteStatus,
            Self::RemoteTimeout { .. } => ErrorCode::E004RemoteTimeout,
            Self::Transport(_) => ErrorCode::E005Transport,
            Self::EmptyModelResponse => ErrorCode::E006EmptyModelResponse,
            Self::InvalidResponse(_) => ErrorCode::E007InvalidResponse,
            Self::MalformedDirective(_) => ErrorCode::E008MalformedDirective,
        }
    }
}

impl StorageError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::E009Storage
    }
}
