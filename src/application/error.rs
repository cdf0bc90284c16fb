//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::application::BuildStep;
use crate::domain::{ConfigurationId, DomainError};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("configuration {configuration}: {step} failed: {source}")]
    BuildFailed {
        configuration: ConfigurationId,
        step: BuildStep,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("invalid mesh {}: {message}", path.display())]
    InvalidMesh { path: PathBuf, message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// Wrap any error as the failure of one build step.
    pub fn build_failed(
        configuration: ConfigurationId,
        step: BuildStep,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::BuildFailed {
            configuration,
            step,
            source: source.into(),
        }
    }

    /// Build step that failed, if this is a build failure.
    pub fn failed_step(&self) -> Option<(ConfigurationId, BuildStep)> {
        match self {
            Self::BuildFailed {
                configuration,
                step,
                ..
            } => Some((*configuration, *step)),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
