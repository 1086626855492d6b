use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Reply error: {0}")]
    Reply(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
