//! Error conversion helpers
//!
//! Extension traits adding path context to I/O errors and build-step context
//! to engine errors.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult, BuildStep};
use crate::domain::ConfigurationId;

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// fs.read_to_string(&path)
    ///     .with_path_context("read mesh", &path)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}

/// Extension trait attaching the configuration and build step to any failure.
pub trait BuildResultExt<T> {
    /// Wrap the error as `ApplicationError::BuildFailed`.
    ///
    /// # Example
    /// ```ignore
    /// engine.add_point(&point)
    ///     .in_step(ConfigurationId::A, BuildStep::Points)?;
    /// ```
    fn in_step(self, configuration: ConfigurationId, step: BuildStep) -> ApplicationResult<T>;
}

impl<T, E> BuildResultExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn in_step(self, configuration: ConfigurationId, step: BuildStep) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::build_failed(configuration, step, e))
    }
}
