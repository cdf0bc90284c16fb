//! Test support: logging setup and engine/process doubles

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex, MutexGuard, Once};

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{
    Circle, Cut, CurveLoop, Dim, EntityRef, Line, PhysicalGroup, Point, Surface, Tag,
};
use crate::infrastructure::traits::{CommandRunner, EngineProvider, GeometryEngine};
use crate::infrastructure::{InfraError, InfraResult};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    // Create a filter for noisy modules
    let noisy_modules = [""];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::ENTER)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ============================================================
// RECORDING ENGINE
// ============================================================

/// One call received by a [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Open(String),
    AddPoint(Point),
    AddLine(Line),
    AddCircle(Circle),
    AddCurveLoop(CurveLoop),
    AddSurface(Surface),
    Cut(Cut),
    Synchronize,
    Entities(Dim),
    AddPhysicalGroup(PhysicalGroup),
    SetOption(String, f64),
    Generate(Dim),
    Write(PathBuf),
    Finalize,
}

impl EngineCall {
    /// Name of the engine operation, e.g. `add_point`.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineCall::Open(_) => "open_session",
            EngineCall::AddPoint(_) => "add_point",
            EngineCall::AddLine(_) => "add_line",
            EngineCall::AddCircle(_) => "add_circle",
            EngineCall::AddCurveLoop(_) => "add_curve_loop",
            EngineCall::AddSurface(_) => "add_surface_filling",
            EngineCall::Cut(_) => "cut",
            EngineCall::Synchronize => "synchronize",
            EngineCall::Entities(_) => "entities",
            EngineCall::AddPhysicalGroup(_) => "add_physical_group",
            EngineCall::SetOption(..) => "set_option",
            EngineCall::Generate(_) => "generate",
            EngineCall::Write(_) => "write",
            EngineCall::Finalize => "finalize",
        }
    }
}

/// How the simulated engine behaves.
#[derive(Debug, Clone, Default)]
pub struct EngineBehavior {
    /// Fail the first call of this kind (see [`EngineCall::kind`])
    pub fail_at: Option<&'static str>,
    /// Surfaces left after the cut; default is the requested cut tag
    pub cut_surfaces: Option<Vec<Tag>>,
    /// Curves left after the cut; default is one new curve per circle, highest tag first
    pub boundary_curves: Option<Vec<Tag>>,
}

/// Engine provider recording every call of every session into one shared log.
#[derive(Debug, Clone, Default)]
pub struct RecordingProvider {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    behavior: EngineBehavior,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: EngineBehavior) -> Self {
        Self {
            calls: Arc::default(),
            behavior,
        }
    }

    /// Snapshot of all calls so far.
    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.calls).clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        lock(&self.calls).iter().filter(|c| c.kind() == kind).count()
    }

    /// Physical groups added, in call order.
    pub fn physical_groups(&self) -> Vec<PhysicalGroup> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                EngineCall::AddPhysicalGroup(g) => Some(g.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names of the calls, in order.
    pub fn kinds(&self) -> Vec<&'static str> {
        lock(&self.calls).iter().map(EngineCall::kind).collect()
    }
}

impl EngineProvider for RecordingProvider {
    fn open_session(&self, name: &str) -> InfraResult<Box<dyn GeometryEngine>> {
        lock(&self.calls).push(EngineCall::Open(name.to_string()));
        if self.behavior.fail_at == Some("open_session") {
            return Err(injected("open_session"));
        }
        Ok(Box::new(RecordingEngine {
            calls: self.calls.clone(),
            behavior: self.behavior.clone(),
            failed: false,
            curves: vec![],
            surfaces: vec![],
            circle_count: 0,
        }))
    }
}

fn injected(kind: &str) -> InfraError {
    InfraError::Gmsh {
        message: format!("injected failure at {kind}"),
        exit_code: Some(1),
    }
}

/// Simulated engine session; keeps just enough model state to answer enumeration.
pub struct RecordingEngine {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    behavior: EngineBehavior,
    failed: bool,
    curves: Vec<Tag>,
    surfaces: Vec<Tag>,
    circle_count: i32,
}

impl RecordingEngine {
    fn record(&mut self, call: EngineCall) -> InfraResult<()> {
        let kind = call.kind();
        lock(&self.calls).push(call);
        if !self.failed && self.behavior.fail_at == Some(kind) {
            self.failed = true;
            return Err(injected(kind));
        }
        Ok(())
    }
}

impl GeometryEngine for RecordingEngine {
    fn add_point(&mut self, point: &Point) -> InfraResult<()> {
        self.record(EngineCall::AddPoint(*point))
    }

    fn add_line(&mut self, line: &Line) -> InfraResult<()> {
        self.record(EngineCall::AddLine(*line))?;
        self.curves.push(line.tag);
        Ok(())
    }

    fn add_circle(&mut self, circle: &Circle) -> InfraResult<()> {
        self.record(EngineCall::AddCircle(*circle))?;
        self.curves.push(circle.tag);
        self.circle_count += 1;
        Ok(())
    }

    fn add_curve_loop(&mut self, curve_loop: &CurveLoop) -> InfraResult<()> {
        self.record(EngineCall::AddCurveLoop(curve_loop.clone()))
    }

    fn add_surface_filling(&mut self, surface: &Surface) -> InfraResult<()> {
        self.record(EngineCall::AddSurface(*surface))?;
        self.surfaces.push(surface.tag);
        Ok(())
    }

    fn cut(&mut self, cut: &Cut) -> InfraResult<Vec<EntityRef>> {
        self.record(EngineCall::Cut(cut.clone()))?;
        self.surfaces = self
            .behavior
            .cut_surfaces
            .clone()
            .unwrap_or_else(|| vec![cut.tag]);
        self.curves = self.behavior.boundary_curves.clone().unwrap_or_else(|| {
            (1..=self.circle_count)
                .rev()
                .map(|i| Tag(cut.tag.value() + i))
                .collect()
        });
        Ok(self.surfaces.iter().map(|&t| EntityRef::surface(t)).collect())
    }

    fn synchronize(&mut self) -> InfraResult<()> {
        self.record(EngineCall::Synchronize)
    }

    fn entities(&mut self, dim: Dim) -> InfraResult<Vec<EntityRef>> {
        self.record(EngineCall::Entities(dim))?;
        let tags = match dim {
            Dim::Curve => &self.curves,
            Dim::Surface => &self.surfaces,
            Dim::Point => return Ok(vec![]),
        };
        Ok(tags.iter().map(|&t| EntityRef::new(dim, t)).collect())
    }

    fn add_physical_group(&mut self, group: &PhysicalGroup) -> InfraResult<()> {
        self.record(EngineCall::AddPhysicalGroup(group.clone()))
    }

    fn set_option(&mut self, name: &str, value: f64) -> InfraResult<()> {
        self.record(EngineCall::SetOption(name.to_string(), value))
    }

    fn generate(&mut self, dim: Dim) -> InfraResult<()> {
        self.record(EngineCall::Generate(dim))
    }

    fn write(&mut self, path: &Path) -> InfraResult<()> {
        self.record(EngineCall::Write(path.to_path_buf()))?;
        std::fs::write(path, "$MeshFormat\n2.2 0 8\n$EndMeshFormat\n")
            .map_err(|e| InfraError::io(format!("write {}", path.display()), e))
    }

    fn finalize(&mut self) -> InfraResult<()> {
        self.record(EngineCall::Finalize)
    }
}

// ============================================================
// SCRIPTED COMMAND RUNNER
// ============================================================

/// Fake `gmsh` binary.
///
/// Parse-only calls answer with `probe_output`; meshing calls write
/// `mesh_content` to the `-o` path. Every invocation is recorded.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    pub invocations: Arc<Mutex<Vec<(String, Vec<String>)>>>,
    pub probe_output: String,
    pub mesh_content: String,
    /// Exit code and stderr returned instead of succeeding
    pub fail_with: Option<(i32, String)>,
    /// Behave as if the binary does not exist
    pub missing: bool,
    /// Succeed without writing the `-o` file
    pub skip_output: bool,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe output announcing the given entities.
    pub fn with_entities(entities: &[(i32, i32)]) -> Self {
        let probe_output = entities
            .iter()
            .map(|(dim, tag)| format!("@entity {dim} {tag}\n"))
            .collect();
        Self {
            probe_output,
            mesh_content: "$MeshFormat\n2.2 0 8\n$EndMeshFormat\n".to_string(),
            ..Self::default()
        }
    }

    pub fn invocations(&self) -> Vec<(String, Vec<String>)> {
        lock(&self.invocations).clone()
    }
}

#[cfg(unix)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        lock(&self.invocations).push((
            cmd.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
        ));

        if self.missing {
            return Err(io::Error::new(io::ErrorKind::NotFound, "No such file or directory"));
        }
        if let Some((code, stderr)) = &self.fail_with {
            return Ok(Output {
                status: exit_status(*code),
                stdout: vec![],
                stderr: stderr.clone().into_bytes(),
            });
        }

        let mut stdout = String::from("Info    : Running gmsh\n");
        if args.contains(&"-parse_and_exit") {
            stdout.push_str(&self.probe_output);
        }
        if let Some(pos) = args.iter().position(|a| *a == "-o") {
            if let (Some(path), false) = (args.get(pos + 1), self.skip_output) {
                std::fs::write(path, &self.mesh_content)?;
            }
        }

        Ok(Output {
            status: exit_status(0),
            stdout: stdout.into_bytes(),
            stderr: vec![],
        })
    }
}
