use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("echo timeout")]
    EchoTimeout,
    #[error("echo line stuck high")]
    EchoStuck,
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),
}

pub type Result<T> = std::result::Result<T, HwError>;
