//! Mesh inspection service
//!
//! Summarizes a written `.msh` file and checks it against what a
//! configuration run must produce: the `Domain` group with the configuration's
//! id, one contiguous run of `Boundary_i` groups, and triangle edges within the
//! configured size bounds.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::{validate_size_tolerance, Settings};
use crate::domain::{ConfigurationId, MeshOptions, DOMAIN_GROUP_NAME};
use crate::infrastructure::msh::{self, ElementKind, MeshData};
use crate::infrastructure::traits::FileSystem;

/// One physical group as found in a mesh file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub dim: i32,
    pub id: i32,
    pub name: Option<String>,
    pub element_count: usize,
}

/// Condensed view of a mesh file.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSummary {
    pub path: PathBuf,
    pub version: String,
    pub node_count: usize,
    pub point_elements: usize,
    pub line_elements: usize,
    pub triangle_elements: usize,
    /// Sorted by (dim, id)
    pub groups: Vec<GroupSummary>,
    /// (shortest, longest) triangle edge
    pub edge_length: Option<(f64, f64)>,
}

impl MeshSummary {
    pub fn groups_of_dim(&self, dim: i32) -> impl Iterator<Item = &GroupSummary> {
        self.groups.iter().filter(move |g| g.dim == dim)
    }
}

/// A violated mesh property.
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    MissingDomainGroup { expected_id: i32 },
    NoBoundaryGroups,
    BoundaryIdsNotContiguous { expected: Vec<i32>, found: Vec<i32> },
    BoundaryNameMismatch { id: i32, expected: String, found: Option<String> },
    NoTriangles,
    EdgeTooShort { length: f64, min: f64 },
    EdgeTooLong { length: f64, max: f64 },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::MissingDomainGroup { expected_id } => {
                write!(f, "no 2-D group \"{}\" with id {}", DOMAIN_GROUP_NAME, expected_id)
            }
            Finding::NoBoundaryGroups => write!(f, "no 1-D boundary groups"),
            Finding::BoundaryIdsNotContiguous { expected, found } => write!(
                f,
                "boundary group ids {:?}, expected {:?}",
                found, expected
            ),
            Finding::BoundaryNameMismatch {
                id,
                expected,
                found,
            } => write!(
                f,
                "boundary group {} named {:?}, expected \"{}\"",
                id, found, expected
            ),
            Finding::NoTriangles => write!(f, "mesh has no triangles"),
            Finding::EdgeTooShort { length, min } => {
                write!(f, "shortest edge {length:.3e} below {min:.3e}")
            }
            Finding::EdgeTooLong { length, max } => {
                write!(f, "longest edge {length:.3e} above {max:.3e}")
            }
        }
    }
}

/// Reads mesh files and checks configuration properties.
pub struct MeshInspector {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl MeshInspector {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Parse a mesh file into a summary.
    pub fn summarize(&self, path: &Path) -> ApplicationResult<MeshSummary> {
        debug!("summarize: path={}", path.display());
        let text = self
            .fs
            .read_to_string(path)
            .with_path_context("read mesh", path)?;
        let mesh = msh::parse(&text).map_err(|e| ApplicationError::InvalidMesh {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(summarize_mesh(path, &mesh))
    }

    /// Check a summary against a configuration using the configured lc and tolerance.
    pub fn check(
        &self,
        summary: &MeshSummary,
        configuration: ConfigurationId,
    ) -> ApplicationResult<Vec<Finding>> {
        check_summary(
            summary,
            configuration,
            self.settings.geometry.lc,
            self.settings.inspect.size_tolerance,
        )
    }
}

/// Build a summary from parsed mesh data.
pub fn summarize_mesh(path: &Path, mesh: &MeshData) -> MeshSummary {
    let mut groups: BTreeMap<(i32, i32), GroupSummary> = BTreeMap::new();
    for name in &mesh.physical_names {
        groups.insert(
            (name.dim, name.id),
            GroupSummary {
                dim: name.dim,
                id: name.id,
                name: Some(name.name.clone()),
                element_count: 0,
            },
        );
    }
    for element in &mesh.elements {
        let Some(dim) = element.kind.dim() else {
            continue;
        };
        for &id in &element.physical_tags {
            groups
                .entry((dim, id))
                .or_insert_with(|| GroupSummary {
                    dim,
                    id,
                    name: None,
                    element_count: 0,
                })
                .element_count += 1;
        }
    }

    let edge_length = mesh
        .elements
        .iter()
        .filter(|e| e.kind == ElementKind::Triangle)
        .flat_map(|e| {
            let n = e.nodes.len();
            (0..n).filter_map(move |i| {
                let a = mesh.nodes.get(&e.nodes[i])?;
                let b = mesh.nodes.get(&e.nodes[(i + 1) % n])?;
                Some(((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2) + (b[2] - a[2]).powi(2)).sqrt())
            })
        })
        .fold(None, |acc: Option<(f64, f64)>, len| match acc {
            None => Some((len, len)),
            Some((lo, hi)) => Some((lo.min(len), hi.max(len))),
        });

    MeshSummary {
        path: path.to_path_buf(),
        version: mesh.version.clone(),
        node_count: mesh.nodes.len(),
        point_elements: mesh.count(ElementKind::Point),
        line_elements: mesh.count(ElementKind::Line),
        triangle_elements: mesh.count(ElementKind::Triangle),
        groups: groups.into_values().collect(),
        edge_length,
    }
}

/// All violated properties of `summary` for `configuration`; empty when it holds.
///
/// Fails with `ApplicationError::Config` when `tolerance` is not within `[0, 1)`.
pub fn check_summary(
    summary: &MeshSummary,
    configuration: ConfigurationId,
    lc: f64,
    tolerance: f64,
) -> ApplicationResult<Vec<Finding>> {
    validate_size_tolerance(tolerance)?;
    let mut findings = Vec::new();

    let expected_domain = configuration.domain_group_id();
    let has_domain = summary
        .groups_of_dim(2)
        .any(|g| g.id == expected_domain && g.name.as_deref() == Some(DOMAIN_GROUP_NAME));
    if !has_domain {
        findings.push(Finding::MissingDomainGroup {
            expected_id: expected_domain,
        });
    }

    let boundary: Vec<&GroupSummary> = summary.groups_of_dim(1).collect();
    if boundary.is_empty() {
        findings.push(Finding::NoBoundaryGroups);
    } else {
        let found: Vec<i32> = boundary.iter().map(|g| g.id).collect();
        let expected: Vec<i32> = (1..=boundary.len())
            .map(|i| configuration.boundary_group_id(i))
            .collect();
        if found != expected {
            findings.push(Finding::BoundaryIdsNotContiguous { expected, found });
        } else {
            for (i, group) in boundary.iter().enumerate() {
                let name = ConfigurationId::boundary_group_name(i + 1);
                if group.name.as_deref() != Some(name.as_str()) {
                    findings.push(Finding::BoundaryNameMismatch {
                        id: group.id,
                        expected: name,
                        found: group.name.clone(),
                    });
                }
            }
        }
    }

    let options = MeshOptions::for_target_size(lc);
    let min = options.size_min * (1.0 - tolerance);
    let max = options.size_max * (1.0 + tolerance);
    match summary.edge_length {
        None => findings.push(Finding::NoTriangles),
        Some((shortest, longest)) => {
            if shortest < min {
                findings.push(Finding::EdgeTooShort {
                    length: shortest,
                    min,
                });
            }
            if longest > max {
                findings.push(Finding::EdgeTooLong {
                    length: longest,
                    max,
                });
            }
        }
    }

    Ok(findings)
}
