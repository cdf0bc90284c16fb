//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent geometry and tagging rule violations.
/// These are independent of the engine that executes the model.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid parameter {name}: {value} (must be finite and > 0)")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("unknown configuration: {0} (expected A, B or C)")]
    UnknownConfiguration(String),

    #[error("boolean cut left {found} surfaces, expected exactly one")]
    UnexpectedCutResult { found: usize },

    #[error("no boundary curves left after the cut")]
    NoBoundaryCurves,

    #[error("inconsistent tag plan: {message}")]
    InconsistentPlan { message: String },
}
