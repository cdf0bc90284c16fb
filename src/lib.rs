//! cutmesh: parametric 2-D domains with circular cut-outs, meshed by gmsh
//!
//! Layers, innermost first:
//!
//! ```text
//! domain          geometry, tag plans, physical-group numbering (no I/O)
//! application     configuration builder and mesh inspector services
//! infrastructure  gmsh engine sessions, .msh reader, filesystem/process seams
//! cli             clap arguments, command handlers, exit codes
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
