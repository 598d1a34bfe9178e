use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LanbeamError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("signaling error: {0}")]
    Signaling(String),

    #[error("negotiation error: {0}")]
    Negotiation(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("transfer error: {0}")]
    Transfer(String),

    #[error("{0}")]
    Other(String),
}
