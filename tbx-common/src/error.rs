use std::sync::Arc;

use thiserror::Error;

use crate::model::graph::DependencyResult;

#[derive(Error, Debug, Clone)]
pub enum TbxError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("XML Parsing Error: {0}")]
    Xml(#[from] Arc<roxmltree::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Cache Error: {0}")]
    Cache(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("HttpError: {0}")]
    HttpError(String),

    #[error("DownloadError: Failed to download '{0}' from '{1}': {2}")]
    DownloadError(String, String, String),

    #[error("Checksum Error: {0}")]
    ChecksumError(String),

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error("Generic Error: {0}")]
    Generic(String),

    #[error("Invalid coordinate '{input}': {reason}")]
    CoordinateParse { input: String, reason: String },

    #[error("Failed to read artifact descriptor for {coordinate}: {reason}")]
    DescriptorFetch { coordinate: String, reason: String },

    #[error("Failed to collect dependencies of {root} (scope {scope}): {reason}")]
    GraphCollection {
        root: String,
        scope: String,
        reason: String,
    },

    /// Carries whatever the engine managed to resolve before the failure.
    #[error("Resolution Error: {message}")]
    Resolution {
        message: String,
        partial: Option<Box<DependencyResult>>,
    },

    #[error("Failed to resolve version range of {coordinate}: {reason}")]
    VersionRange { coordinate: String, reason: String },

    #[error("Invalid remote repository spec '{spec}': {reason}")]
    RepositorySpecFormat { spec: String, reason: String },
}

impl TbxError {
    pub fn resolution(message: impl Into<String>) -> Self {
        TbxError::Resolution {
            message: message.into(),
            partial: None,
        }
    }

    /// The partially resolved graph attached to a resolution failure, if any.
    pub fn partial_result(&self) -> Option<&DependencyResult> {
        match self {
            TbxError::Resolution {
                partial: Some(partial),
                ..
            } => Some(partial),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TbxError {
    fn from(err: std::io::Error) -> Self {
        TbxError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for TbxError {
    fn from(err: reqwest::Error) -> Self {
        TbxError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for TbxError {
    fn from(err: serde_json::Error) -> Self {
        TbxError::Json(Arc::new(err))
    }
}

impl From<roxmltree::Error> for TbxError {
    fn from(err: roxmltree::Error) -> Self {
        TbxError::Xml(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, TbxError>;
