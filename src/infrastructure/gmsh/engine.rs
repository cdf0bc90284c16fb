//! gmsh-backed engine sessions
//!
//! Each session accumulates a `.geo` script in a private scratch directory.
//! Entity enumeration runs gmsh in parse-only mode on the script plus a probe
//! block; meshing runs gmsh in batch mode on the final script.
//!
//! ```text
//! add_* / cut / physical / option  ->  GeoScript (in memory)
//! entities(dim)                    ->  probe.geo  -> gmsh -parse_and_exit
//! generate(dim) + write(path)      ->  mesh_X.geo -> gmsh -<dim> -o path
//! ```

use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::config::GmshSettings;
use crate::domain::{
    Circle, Cut, CurveLoop, Dim, EntityRef, Line, PhysicalGroup, Point, Surface,
};
use crate::infrastructure::gmsh::script::{parse_probe_output, GeoScript, GeoStatement};
use crate::infrastructure::traits::{CommandRunner, EngineProvider, FileSystem, GeometryEngine};
use crate::infrastructure::{InfraError, InfraResult};
use crate::util::path::sibling_with_extension;

/// Prefix gmsh uses for error log lines.
const GMSH_ERROR_PREFIX: &str = "Error   :";

/// Opens gmsh sessions backed by the configured binary.
pub struct GmshProvider {
    fs: Arc<dyn FileSystem>,
    cmd: Arc<dyn CommandRunner>,
    settings: GmshSettings,
}

impl GmshProvider {
    pub fn new(fs: Arc<dyn FileSystem>, cmd: Arc<dyn CommandRunner>, settings: GmshSettings) -> Self {
        Self { fs, cmd, settings }
    }
}

impl EngineProvider for GmshProvider {
    fn open_session(&self, name: &str) -> InfraResult<Box<dyn GeometryEngine>> {
        let workdir = tempfile::Builder::new()
            .prefix(&format!("cutmesh-{}-", name))
            .tempdir()
            .map_err(|e| InfraError::io("create gmsh scratch directory", e))?;
        debug!(
            "open_session: name={}, workdir={}",
            name,
            workdir.path().display()
        );
        Ok(Box::new(GmshSession {
            name: name.to_string(),
            script: GeoScript::new(),
            workdir: Some(workdir),
            fs: self.fs.clone(),
            cmd: self.cmd.clone(),
            settings: self.settings.clone(),
            mesh_dim: None,
            probe_cache: None,
            written: None,
        }))
    }
}

/// One gmsh model under construction.
pub struct GmshSession {
    name: String,
    script: GeoScript,
    workdir: Option<TempDir>,
    fs: Arc<dyn FileSystem>,
    cmd: Arc<dyn CommandRunner>,
    settings: GmshSettings,
    mesh_dim: Option<Dim>,
    /// Probe result, valid while the script length is unchanged
    probe_cache: Option<(usize, Vec<EntityRef>)>,
    /// (script, mesh) of the last successful write
    written: Option<(PathBuf, PathBuf)>,
}

impl GmshSession {
    fn workdir(&self) -> InfraResult<&Path> {
        self.workdir
            .as_ref()
            .map(|d| d.path())
            .ok_or_else(|| InfraError::Session(format!("session '{}' already finalized", self.name)))
    }

    fn push(&mut self, statement: GeoStatement) -> InfraResult<()> {
        self.workdir()?;
        self.script.push(statement);
        Ok(())
    }

    fn write_script(&self, file_name: &str, content: &str) -> InfraResult<PathBuf> {
        let path = self.workdir()?.join(file_name);
        self.fs
            .write(&path, content)
            .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
        Ok(path)
    }

    /// Run gmsh, turning spawn failures, non-zero exits and logged errors into `InfraError`.
    fn run_gmsh(&self, args: &[String]) -> InfraResult<Output> {
        let binary = self.settings.binary.as_str();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        debug!("run_gmsh: {} {}", binary, args.join(" "));

        let output = self.cmd.run(binary, &args).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                InfraError::GmshUnavailable {
                    binary: binary.to_string(),
                    source: e,
                }
            } else {
                InfraError::io(format!("run {}", binary), e)
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let logged_errors: Vec<&str> = stdout
            .lines()
            .chain(stderr.lines())
            .filter(|l| l.starts_with(GMSH_ERROR_PREFIX))
            .collect();

        if !output.status.success() || !logged_errors.is_empty() {
            let message = if !logged_errors.is_empty() {
                logged_errors.join("; ")
            } else if !stderr.trim().is_empty() {
                stderr.trim().to_string()
            } else {
                format!("exit status {}", output.status)
            };
            return Err(InfraError::Gmsh {
                message,
                exit_code: output.status.code(),
            });
        }
        Ok(output)
    }

    /// Enumerate all entities of the current model, reusing the last probe if
    /// the script has not changed since.
    fn probe(&mut self) -> InfraResult<Vec<EntityRef>> {
        if let Some((len, entities)) = &self.probe_cache {
            if *len == self.script.len() {
                return Ok(entities.clone());
            }
        }

        let probe_path = self.write_script("probe.geo", &self.script.render_with_probe())?;
        let output = self.run_gmsh(&[
            probe_path.to_string_lossy().into_owned(),
            "-parse_and_exit".to_string(),
        ])?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push('\n');
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let entities = parse_probe_output(&text)?;

        debug!("probe: {} entities", entities.len());
        self.probe_cache = Some((self.script.len(), entities.clone()));
        Ok(entities)
    }
}

impl GeometryEngine for GmshSession {
    fn add_point(&mut self, point: &Point) -> InfraResult<()> {
        self.push(GeoStatement::Point(*point))
    }

    fn add_line(&mut self, line: &Line) -> InfraResult<()> {
        self.push(GeoStatement::Line(*line))
    }

    fn add_circle(&mut self, circle: &Circle) -> InfraResult<()> {
        self.push(GeoStatement::Circle(*circle))
    }

    fn add_curve_loop(&mut self, curve_loop: &CurveLoop) -> InfraResult<()> {
        self.push(GeoStatement::CurveLoop(curve_loop.clone()))
    }

    fn add_surface_filling(&mut self, surface: &Surface) -> InfraResult<()> {
        self.push(GeoStatement::Surface(*surface))
    }

    fn cut(&mut self, cut: &Cut) -> InfraResult<Vec<EntityRef>> {
        self.push(GeoStatement::Cut(cut.clone()))?;
        // the explicit result tag is honored by the OpenCASCADE factory
        Ok(vec![EntityRef::surface(cut.tag)])
    }

    fn synchronize(&mut self) -> InfraResult<()> {
        // .geo scripts synchronize the OpenCASCADE model implicitly
        self.workdir().map(|_| ())
    }

    fn entities(&mut self, dim: Dim) -> InfraResult<Vec<EntityRef>> {
        Ok(self
            .probe()?
            .into_iter()
            .filter(|e| e.dim == dim)
            .collect())
    }

    fn add_physical_group(&mut self, group: &PhysicalGroup) -> InfraResult<()> {
        self.push(GeoStatement::Physical(group.clone()))
    }

    fn set_option(&mut self, name: &str, value: f64) -> InfraResult<()> {
        self.push(GeoStatement::Option {
            name: name.to_string(),
            value,
        })
    }

    fn generate(&mut self, dim: Dim) -> InfraResult<()> {
        self.workdir()?;
        self.mesh_dim = Some(dim);
        Ok(())
    }

    fn write(&mut self, path: &Path) -> InfraResult<()> {
        let dim = self.mesh_dim.ok_or_else(|| {
            InfraError::Session(format!("write {} before generate", path.display()))
        })?;

        let script_path =
            self.write_script(&format!("{}.geo", self.name), &self.script.render())?;
        self.fs
            .ensure_parent(path)
            .map_err(|e| InfraError::io(format!("create parent of {}", path.display()), e))?;

        let mut args = vec![
            script_path.to_string_lossy().into_owned(),
            format!("-{}", dim.as_i32()),
            "-o".to_string(),
            path.to_string_lossy().into_owned(),
        ];
        if let Some(format) = &self.settings.format {
            args.push("-format".to_string());
            args.push(format.clone());
        }
        args.extend(self.settings.extra_args.iter().cloned());

        self.run_gmsh(&args)?;

        if !self.fs.exists(path) {
            return Err(InfraError::Gmsh {
                message: format!("no mesh written to {}", path.display()),
                exit_code: None,
            });
        }
        debug!("write: {}", path.display());
        self.written = Some((script_path, path.to_path_buf()));
        Ok(())
    }

    fn finalize(&mut self) -> InfraResult<()> {
        let Some(workdir) = self.workdir.take() else {
            return Ok(());
        };

        if self.settings.keep_scripts {
            if let Some((script, mesh)) = &self.written {
                let kept = sibling_with_extension(mesh, "geo");
                self.fs
                    .copy(script, &kept)
                    .map_err(|e| InfraError::io(format!("keep script {}", kept.display()), e))?;
                debug!("finalize: kept script {}", kept.display());
            }
        }

        let dir = workdir.path().to_path_buf();
        workdir.close().map_err(|e| {
            warn!("finalize: could not remove {}: {}", dir.display(), e);
            InfraError::io(format!("remove {}", dir.display()), e)
        })
    }
}
