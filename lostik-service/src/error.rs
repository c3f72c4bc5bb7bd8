//! Command-line error reporting

use lostik_store::StoreError;
use lostik_tdma::{LinkError, ServiceError};
use thiserror::Error;

use crate::settings::ConfigError;

/// Anything that ends a `lostik` invocation unsuccessfully
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot install interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

impl From<LinkError> for CliError {
    fn from(err: LinkError) -> Self {
        CliError::Service(err.into())
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        CliError::Service(err.into())
    }
}

impl CliError {
    /// Advice printed after the error
    pub fn remedy(&self) -> Option<&'static str> {
        match self {
            CliError::Service(e) => Some(e.remedy()),
            CliError::Config(_) => Some("Fix or remove the settings file, or pass --config."),
            CliError::Signal(_) | CliError::Output(_) => None,
        }
    }
}
