//! Domain entities: geometric and topological objects handed to the engine

use std::fmt;

/// Integer tag identifying an engine entity or a physical group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub i32);

impl Tag {
    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Topological dimension of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dim {
    Point = 0,
    Curve = 1,
    Surface = 2,
}

impl Dim {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Dim::Point),
            1 => Some(Dim::Curve),
            2 => Some(Dim::Surface),
            _ => None,
        }
    }

    /// Keyword used by gmsh for this dimension (`Point`, `Curve`, `Surface`).
    pub fn keyword(self) -> &'static str {
        match self {
            Dim::Point => "Point",
            Dim::Curve => "Curve",
            Dim::Surface => "Surface",
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

/// An entity reference as returned by enumeration: `(dim, tag)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityRef {
    pub dim: Dim,
    pub tag: Tag,
}

impl EntityRef {
    pub fn new(dim: Dim, tag: Tag) -> Self {
        Self { dim, tag }
    }

    pub fn surface(tag: Tag) -> Self {
        Self::new(Dim::Surface, tag)
    }
}

/// Vertex with a target mesh size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub tag: Tag,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Target element size near this point
    pub mesh_size: f64,
}

/// Straight edge between two previously defined points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    pub tag: Tag,
    pub start: Tag,
    pub end: Tag,
}

/// Full circle in the z = 0 plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub tag: Tag,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub radius: f64,
}

/// Closed cycle of curves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveLoop {
    pub tag: Tag,
    pub curves: Vec<Tag>,
}

/// Surface filling a single curve loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub tag: Tag,
    pub curve_loop: Tag,
}

/// Boolean difference `object - union(tools)`; both operands are deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cut {
    pub tag: Tag,
    pub object: Vec<EntityRef>,
    pub tools: Vec<EntityRef>,
}

/// Named group of entities that survives into the mesh file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalGroup {
    pub dim: Dim,
    pub id: i32,
    pub name: String,
    pub members: Vec<Tag>,
}

impl PhysicalGroup {
    pub fn new(dim: Dim, id: i32, name: impl Into<String>, members: Vec<Tag>) -> Self {
        Self {
            dim,
            id,
            name: name.into(),
            members,
        }
    }
}

/// Global meshing options applied before generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshOptions {
    pub size_from_points: bool,
    pub extend_from_boundary: bool,
    pub size_min: f64,
    pub size_max: f64,
}

/// Upper element size bound as a multiple of `lc`.
pub const MAX_SIZE_FACTOR: f64 = 100.0;

impl MeshOptions {
    /// Sizes driven purely by point targets, clamped to `[lc, 100 * lc]`.
    pub fn for_target_size(lc: f64) -> Self {
        Self {
            size_from_points: true,
            extend_from_boundary: false,
            size_min: lc,
            size_max: MAX_SIZE_FACTOR * lc,
        }
    }

    /// Engine option names and values, in the order they are applied.
    pub fn engine_options(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("Mesh.MeshSizeFromPoints", flag(self.size_from_points)),
            ("Mesh.MeshSizeExtendFromBoundary", flag(self.extend_from_boundary)),
            ("Mesh.MeshSizeMin", self.size_min),
            ("Mesh.MeshSizeMax", self.size_max),
        ]
    }
}

fn flag(on: bool) -> f64 {
    if on {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_lc_when_building_mesh_options_then_clamps_to_hundredfold_range() {
        let opts = MeshOptions::for_target_size(0.0005);
        let named = opts.engine_options();

        assert_eq!(named[0], ("Mesh.MeshSizeFromPoints", 1.0));
        assert_eq!(named[1], ("Mesh.MeshSizeExtendFromBoundary", 0.0));
        assert_eq!(named[2], ("Mesh.MeshSizeMin", 0.0005));
        assert!((named[3].1 - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_dim_round_trip() {
        for dim in [Dim::Point, Dim::Curve, Dim::Surface] {
            assert_eq!(Dim::from_i32(dim.as_i32()), Some(dim));
        }
        assert_eq!(Dim::from_i32(3), None);
    }
}
