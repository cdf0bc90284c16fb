//! gmsh engine: `.geo` script rendering and the command-line driven session

pub mod engine;
pub mod script;

pub use engine::{GmshProvider, GmshSession};
pub use script::{GeoScript, GeoStatement};
