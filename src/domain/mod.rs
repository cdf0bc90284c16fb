//! Domain layer: geometry, tags and physical-group rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no engine).

pub mod configuration;
pub mod entities;
pub mod error;
pub mod plan;

pub use configuration::{
    circumradius, distance, square_vertices, triangle_vertices, Blueprint, CircleSpec,
    ConfigurationId, GeometryParams, BOUNDARY_GROUP_PREFIX, DOMAIN_GROUP_NAME,
};
pub use entities::*;
pub use error::DomainError;
pub use plan::{ModelPlan, TagAllocator};
