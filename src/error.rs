use thiserror::Error;

/// Failures of the signal source when loading an audio asset.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The asset is larger than the configured ceiling. Raised before decoding.
    #[error("audio asset is {size} bytes, above the {limit} byte limit")]
    SizeLimit { size: u64, limit: u64 },
    #[error("failed to decode audio: {0}")]
    Decode(String),
    #[error("failed to read audio asset: {0}")]
    Io(#[from] std::io::Error),
}

impl From<symphonia::core::errors::Error> for SourceError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        SourceError::Decode(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("GPU rendering unsupported: {0}")]
    Unsupported(String),
    #[error("shader program creation failed: {0}")]
    Shader(String),
    #[error("failed to read back rendered frame: {0}")]
    Readback(String),
    #[error("unknown GPU resource handle")]
    UnknownResource,
    #[error("cannot {operation} while tunnel engine is {state}")]
    InvalidState {
        state: &'static str,
        operation: &'static str,
    },
    #[error("tunnel engine has been disposed")]
    Disposed,
}

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to fetch image: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}
