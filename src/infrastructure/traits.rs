//! I/O boundary traits for testability
//!
//! These traits abstract the external geometry/meshing engine, processes and
//! the filesystem, allowing services to be tested with fake implementations.

use std::io;
use std::path::Path;
use std::process::Output;

use crate::domain::{
    Circle, Cut, CurveLoop, Dim, EntityRef, Line, PhysicalGroup, Point, Surface,
};
use crate::infrastructure::InfraResult;

/// One engine session: an isolated model that is built, meshed and written.
///
/// Sessions are single-writer. Every call takes `&mut self`; nothing is shared
/// between sessions.
pub trait GeometryEngine {
    fn add_point(&mut self, point: &Point) -> InfraResult<()>;

    fn add_line(&mut self, line: &Line) -> InfraResult<()>;

    fn add_circle(&mut self, circle: &Circle) -> InfraResult<()>;

    fn add_curve_loop(&mut self, curve_loop: &CurveLoop) -> InfraResult<()>;

    /// Fill a curve loop into a bounded surface.
    fn add_surface_filling(&mut self, surface: &Surface) -> InfraResult<()>;

    /// Boolean difference; returns the entities the engine reports as result.
    fn cut(&mut self, cut: &Cut) -> InfraResult<Vec<EntityRef>>;

    /// Flush pending kernel operations into the model.
    fn synchronize(&mut self) -> InfraResult<()>;

    /// All model entities of the given dimension, in engine order.
    fn entities(&mut self, dim: Dim) -> InfraResult<Vec<EntityRef>>;

    fn add_physical_group(&mut self, group: &PhysicalGroup) -> InfraResult<()>;

    /// Set a global numeric option, e.g. `Mesh.MeshSizeMin`.
    fn set_option(&mut self, name: &str, value: f64) -> InfraResult<()>;

    fn generate(&mut self, dim: Dim) -> InfraResult<()>;

    /// Serialize the generated mesh.
    fn write(&mut self, path: &Path) -> InfraResult<()>;

    /// Release the session. Must be safe to call on a partially built model.
    fn finalize(&mut self) -> InfraResult<()>;
}

/// Opens fresh engine sessions.
pub trait EngineProvider: Send + Sync {
    /// Open a new session. `name` identifies the model (used for scratch files).
    fn open_session(&self, name: &str) -> InfraResult<Box<dyn GeometryEngine>>;
}

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Copy file from source to destination.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// External command runner abstraction.
pub trait CommandRunner: Send + Sync {
    /// Run a command with arguments.
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        std::fs::copy(from, to)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Real command runner implementation.
#[derive(Debug, Default)]
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        std::process::Command::new(cmd).args(args).output()
    }
}
