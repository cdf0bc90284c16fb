//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{0}")]
    Usage(String),

    /// Inspection found violated properties (reported already)
    #[error("{0} mesh check(s) failed")]
    CheckFailed(usize),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => exitcode::USAGE,
            CliError::CheckFailed(_) => exitcode::FAILURE,
            CliError::Infra(e) => infra_exit_code(e),
        }
    }
}

fn infra_exit_code(e: &InfraError) -> i32 {
    match e {
        InfraError::Io { .. } => exitcode::IOERR,
        InfraError::Gmsh { .. } | InfraError::Session(_) => exitcode::SOFTWARE,
        InfraError::GmshUnavailable { .. } => exitcode::UNAVAILABLE,
        InfraError::Application(app) => application_exit_code(app),
    }
}

fn application_exit_code(e: &ApplicationError) -> i32 {
    match e {
        ApplicationError::Domain(_) => exitcode::DATAERR,
        ApplicationError::Config { .. } => exitcode::CONFIG,
        ApplicationError::InvalidMesh { .. } => exitcode::DATAERR,
        ApplicationError::OperationFailed { .. } => exitcode::IOERR,
        ApplicationError::BuildFailed { source, .. } => {
            if let Some(infra) = source.downcast_ref::<InfraError>() {
                infra_exit_code(infra)
            } else if let Some(app) = source.downcast_ref::<ApplicationError>() {
                application_exit_code(app)
            } else {
                exitcode::SOFTWARE
            }
        }
    }
}
