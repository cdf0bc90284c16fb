//! Configuration builder service
//!
//! Drives one engine session per configuration through the fixed sequence
//! points → lines → circles → curve loops → surfaces → cut → physical groups →
//! mesh options → generate → write. Every failure carries the configuration
//! and the step it happened in; the session is finalized on every exit path.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::{
    ApplicationError, ApplicationResult, BuildResultExt, BuildStep, IoResultExt,
};
use crate::config::Settings;
use crate::domain::{
    Blueprint, ConfigurationId, Dim, DomainError, ModelPlan, PhysicalGroup, Tag,
};
use crate::infrastructure::traits::{EngineProvider, FileSystem, GeometryEngine};
use crate::infrastructure::InfraResult;

/// What a finished configuration run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub configuration: ConfigurationId,
    pub output: PathBuf,
    pub point_count: usize,
    pub line_count: usize,
    pub circle_count: usize,
    /// Tag of the surviving domain surface
    pub domain_surface: Tag,
    pub boundary_groups: Vec<PhysicalGroup>,
    pub domain_group: PhysicalGroup,
}

/// Owns an open engine session and finalizes it when dropped.
struct SessionGuard {
    configuration: ConfigurationId,
    engine: Box<dyn GeometryEngine>,
    finalized: bool,
}

impl SessionGuard {
    fn open(provider: &dyn EngineProvider, configuration: ConfigurationId) -> ApplicationResult<Self> {
        let engine = provider
            .open_session(&configuration.file_stem())
            .in_step(configuration, BuildStep::OpenSession)?;
        Ok(Self {
            configuration,
            engine,
            finalized: false,
        })
    }

    fn engine(&mut self) -> &mut dyn GeometryEngine {
        self.engine.as_mut()
    }

    fn finalize(mut self) -> InfraResult<()> {
        self.finalized = true;
        self.engine.finalize()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        if let Err(e) = self.engine.finalize() {
            warn!(
                "configuration {}: finalize after failure: {}",
                self.configuration, e
            );
        }
    }
}

/// Builds the named configurations through an engine provider.
pub struct ConfigurationBuilder {
    provider: Arc<dyn EngineProvider>,
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl ConfigurationBuilder {
    pub fn new(
        provider: Arc<dyn EngineProvider>,
        fs: Arc<dyn FileSystem>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            provider,
            fs,
            settings,
        }
    }

    /// Tagged entity plan for a configuration, without touching the engine.
    pub fn plan(&self, configuration: ConfigurationId) -> ApplicationResult<ModelPlan> {
        let blueprint = Blueprint::for_configuration(configuration, &self.settings.geometry_params())?;
        Ok(ModelPlan::from_blueprint(&blueprint)?)
    }

    /// Where the mesh of a configuration is written.
    pub fn output_path(&self, configuration: ConfigurationId) -> PathBuf {
        self.settings.output_path(&configuration.output_file_name())
    }

    /// Build one configuration in a fresh session and write its mesh.
    pub fn build(&self, configuration: ConfigurationId) -> ApplicationResult<BuildReport> {
        let id = configuration;
        debug!("build: configuration={}", id);

        let plan = self.plan(id)?;
        let output = self.output_path(id);

        let mut session = SessionGuard::open(self.provider.as_ref(), id)?;
        let engine = session.engine();

        for point in &plan.points {
            engine.add_point(point).in_step(id, BuildStep::Points)?;
        }
        engine.synchronize().in_step(id, BuildStep::Points)?;

        for line in &plan.lines {
            engine.add_line(line).in_step(id, BuildStep::Lines)?;
        }
        engine.synchronize().in_step(id, BuildStep::Lines)?;

        for circle in &plan.circles {
            engine.add_circle(circle).in_step(id, BuildStep::Circles)?;
        }
        engine.synchronize().in_step(id, BuildStep::Circles)?;

        for curve_loop in &plan.curve_loops {
            engine
                .add_curve_loop(curve_loop)
                .in_step(id, BuildStep::CurveLoops)?;
        }
        engine.synchronize().in_step(id, BuildStep::CurveLoops)?;

        for surface in &plan.surfaces {
            engine
                .add_surface_filling(surface)
                .in_step(id, BuildStep::Surfaces)?;
        }

        let reported = engine.cut(&plan.cut).in_step(id, BuildStep::Cut)?;
        engine.synchronize().in_step(id, BuildStep::Cut)?;
        let domain_surface = Self::surviving_surface(engine, id, plan.cut.tag)?;
        if !reported.iter().any(|e| e.tag == domain_surface) {
            debug!(
                "build: cut reported {:?}, model holds surface {}",
                reported, domain_surface
            );
        }

        let (boundary_groups, domain_group) = Self::assign_groups(engine, id, domain_surface)?;

        for (name, value) in plan.mesh_options.engine_options() {
            engine
                .set_option(name, value)
                .in_step(id, BuildStep::MeshOptions)?;
        }

        engine
            .generate(Dim::Surface)
            .in_step(id, BuildStep::Generate)?;

        self.fs
            .create_dir_all(&self.settings.output_dir)
            .with_path_context("create output directory", &self.settings.output_dir)
            .in_step(id, BuildStep::Write)?;
        engine.write(&output).in_step(id, BuildStep::Write)?;

        session.finalize().in_step(id, BuildStep::Finalize)?;

        info!(
            "configuration {}: {} boundary groups, domain group {} -> {}",
            id,
            boundary_groups.len(),
            domain_group.id,
            output.display()
        );

        Ok(BuildReport {
            configuration: id,
            output,
            point_count: plan.points.len(),
            line_count: plan.lines.len(),
            circle_count: plan.circles.len(),
            domain_surface,
            boundary_groups,
            domain_group,
        })
    }

    /// Build several configurations in A, B, C order, stopping at the first failure.
    pub fn build_all(
        &self,
        configurations: &[ConfigurationId],
    ) -> ApplicationResult<Vec<BuildReport>> {
        let mut ids = configurations.to_vec();
        ids.sort();
        ids.dedup();
        debug!("build_all: {:?}", ids);

        ids.into_iter().map(|id| self.build(id)).collect()
    }

    /// The single 2-D entity left after the cut.
    fn surviving_surface(
        engine: &mut dyn GeometryEngine,
        id: ConfigurationId,
        requested: Tag,
    ) -> ApplicationResult<Tag> {
        let surfaces = engine.entities(Dim::Surface).in_step(id, BuildStep::Cut)?;
        let [surface] = surfaces.as_slice() else {
            return Err(ApplicationError::build_failed(
                id,
                BuildStep::Cut,
                DomainError::UnexpectedCutResult {
                    found: surfaces.len(),
                },
            ));
        };
        if surface.tag != requested {
            warn!(
                "configuration {}: cut result has tag {}, requested {}",
                id, surface.tag, requested
            );
        }
        Ok(surface.tag)
    }

    /// One group per boundary curve (ascending tag order) plus the domain group.
    fn assign_groups(
        engine: &mut dyn GeometryEngine,
        id: ConfigurationId,
        domain_surface: Tag,
    ) -> ApplicationResult<(Vec<PhysicalGroup>, PhysicalGroup)> {
        let mut curves: Vec<Tag> = engine
            .entities(Dim::Curve)
            .in_step(id, BuildStep::PhysicalGroups)?
            .into_iter()
            .map(|e| e.tag)
            .collect();
        curves.sort();
        curves.dedup();

        if curves.is_empty() {
            return Err(ApplicationError::build_failed(
                id,
                BuildStep::PhysicalGroups,
                DomainError::NoBoundaryCurves,
            ));
        }
        debug!("assign_groups: {} curves {:?}", curves.len(), curves);

        let boundary_groups = id.boundary_groups(&curves);
        let domain_group = id.domain_group(domain_surface);
        for group in boundary_groups.iter().chain(std::iter::once(&domain_group)) {
            engine
                .add_physical_group(group)
                .in_step(id, BuildStep::PhysicalGroups)?;
        }
        engine
            .synchronize()
            .in_step(id, BuildStep::PhysicalGroups)?;

        Ok((boundary_groups, domain_group))
    }
}
