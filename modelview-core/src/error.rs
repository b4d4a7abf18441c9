/// Error types shared by the viewer core
use thiserror::Error;

/// Failure of a single model load attempt.
///
/// A load failure is terminal for that attempt: the viewer logs it and keeps
/// rendering the lights without a model.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP {status} {text}")]
    Http { status: u16, text: String },

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("unsupported model format")]
    UnsupportedFormat,

    #[error("parse error: {0}")]
    Parse(String),

    #[error("model contains no triangles")]
    Empty,

    #[error("load cancelled")]
    Cancelled,
}

impl LoadError {
    pub fn parse<T: ToString>(msg: T) -> Self {
        LoadError::Parse(msg.to_string())
    }

    pub fn fetch<T: ToString>(msg: T) -> Self {
        LoadError::Fetch(msg.to_string())
    }
}

impl From<gltf::Error> for LoadError {
    fn from(err: gltf::Error) -> Self {
        match err {
            gltf::Error::Io(e) => LoadError::Io(e),
            other => LoadError::Parse(other.to_string()),
        }
    }
}

/// Invalid viewer configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f32,
    },
}
