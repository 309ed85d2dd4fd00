use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Serial capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Port selection cancelled")]
    SelectionCancelled,

    #[error("Failed to open port {path}: {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("Not connected")]
    NotConnected,

    #[error("Command is empty")]
    EmptyCommand,

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Serial error: {0}")]
    SerialError(#[from] tokio_serial::Error),
}

impl From<&str> for LinkError {
    fn from(error: &str) -> Self {
        LinkError::Config(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
