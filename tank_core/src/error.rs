use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TankError {
    #[error("no echo within timeout")]
    NoEcho,
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("remote store error: {0}")]
    Remote(String),
    #[error("invalid override: {0}")]
    InvalidOverride(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing echo sensor")]
    MissingSensor,
    #[error("missing relay")]
    MissingRelay,
    #[error("missing remote store")]
    MissingStore,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
