//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (EngineProvider, FileSystem)
//! but are themselves concrete structs, not traits.

mod builder;
mod inspect;

pub use builder::{BuildReport, ConfigurationBuilder};
pub use inspect::{
    check_summary, summarize_mesh, Finding, GroupSummary, MeshInspector, MeshSummary,
};
