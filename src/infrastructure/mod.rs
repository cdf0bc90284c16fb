//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements the engine and I/O boundary traits, reads mesh files
//! and wires up services.

pub mod di;
pub mod error;
pub mod gmsh;
pub mod msh;
pub mod traits;

pub use error::{InfraError, InfraResult};
