use axum::http::StatusCode;
use image::error::{ImageError, LimitErrorKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

const MIB: usize = 1024 * 1024;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No image file provided")]
    NoFileProvided,

    #[error("No file selected")]
    NoFileSelected,

    #[error("Image too large. Please use images under {}MB.", .limit_bytes / MIB)]
    TooLarge { limit_bytes: usize },

    #[error("Empty image file")]
    EmptyFile,

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Out of memory. Image too large or complex.")]
    OutOfMemory,

    #[error("Background removal failed: {0}")]
    Model(String),

    #[error("Background removal produced no output")]
    EmptyOutput,

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Image error: {0}")]
    Image(ImageError),

    #[error("Processing timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ImageError> for Error {
    fn from(err: ImageError) -> Self {
        match &err {
            ImageError::Limits(limit)
                if matches!(limit.kind(), LimitErrorKind::InsufficientMemory) =>
            {
                Self::OutOfMemory
            }
            _ => Self::Image(err),
        }
    }
}

impl Error {
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for rejections caused by the client's input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NoFileProvided
                | Self::NoFileSelected
                | Self::TooLarge { .. }
                | Self::EmptyFile
                | Self::InvalidUpload(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            _ if self.is_validation() => StatusCode::BAD_REQUEST,
            Self::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the client. Failures outside the request pipeline
    /// are reported as generic server errors.
    pub fn client_message(&self) -> String {
        match self {
            Self::Config(_)
            | Self::Yaml(_)
            | Self::Io(_)
            | Self::AddrParse(_)
            | Self::Internal(_) => format!("Server error: {}", self),
            _ => self.to_string(),
        }
    }
}
