//! Named steps of a configuration build, used in error reports

use std::fmt;

/// One stage of the per-configuration build sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildStep {
    OpenSession,
    Points,
    Lines,
    Circles,
    CurveLoops,
    Surfaces,
    Cut,
    PhysicalGroups,
    MeshOptions,
    Generate,
    Write,
    Finalize,
}

impl BuildStep {
    /// All steps in execution order.
    pub const ALL: [BuildStep; 12] = [
        BuildStep::OpenSession,
        BuildStep::Points,
        BuildStep::Lines,
        BuildStep::Circles,
        BuildStep::CurveLoops,
        BuildStep::Surfaces,
        BuildStep::Cut,
        BuildStep::PhysicalGroups,
        BuildStep::MeshOptions,
        BuildStep::Generate,
        BuildStep::Write,
        BuildStep::Finalize,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuildStep::OpenSession => "open-session",
            BuildStep::Points => "points",
            BuildStep::Lines => "lines",
            BuildStep::Circles => "circles",
            BuildStep::CurveLoops => "curve-loops",
            BuildStep::Surfaces => "surfaces",
            BuildStep::Cut => "cut",
            BuildStep::PhysicalGroups => "physical-groups",
            BuildStep::MeshOptions => "mesh-options",
            BuildStep::Generate => "generate",
            BuildStep::Write => "write",
            BuildStep::Finalize => "finalize",
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
