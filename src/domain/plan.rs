//! Tag allocation: turns a blueprint into a fully tagged model plan
//!
//! Tags are handed out by a monotonic allocator in a fixed order:
//!
//! ```text
//! points -> lines -> circles -> curve loops -> surfaces -> cut result
//!           (polygon loop/surface first, then one per circle)
//! ```
//!
//! For the three configurations this reproduces the hand-numbered layout
//! (A ends at 18, B at 23, C at 27).

use crate::domain::{
    Blueprint, Circle, ConfigurationId, Cut, CurveLoop, DomainError, EntityRef, Line,
    MeshOptions, Point, Surface, Tag,
};

/// Monotonically increasing tag source, starting at 1.
#[derive(Debug, Clone)]
pub struct TagAllocator {
    next: i32,
}

impl Default for TagAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl TagAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_tag(&mut self) -> Tag {
        let tag = Tag(self.next);
        self.next += 1;
        tag
    }

    /// Last tag handed out, if any.
    pub fn last(&self) -> Option<Tag> {
        (self.next > 1).then(|| Tag(self.next - 1))
    }
}

/// Every entity of a configuration with its tag, ready to be sent to an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPlan {
    pub configuration: ConfigurationId,
    pub points: Vec<Point>,
    pub lines: Vec<Line>,
    pub circles: Vec<Circle>,
    /// Polygon loop first, then one loop per circle
    pub curve_loops: Vec<CurveLoop>,
    /// Polygon surface first, then one surface per circle
    pub surfaces: Vec<Surface>,
    pub cut: Cut,
    pub mesh_options: MeshOptions,
}

impl ModelPlan {
    pub fn from_blueprint(blueprint: &Blueprint) -> Result<Self, DomainError> {
        if blueprint.vertices.len() < 3 {
            return Err(DomainError::InconsistentPlan {
                message: format!(
                    "polygon needs at least 3 vertices, got {}",
                    blueprint.vertices.len()
                ),
            });
        }

        let mut tags = TagAllocator::new();
        let lc = blueprint.lc;

        let points: Vec<Point> = blueprint
            .vertices
            .iter()
            .chain(blueprint.free_points.iter())
            .map(|&[x, y]| Point {
                tag: tags.next_tag(),
                x,
                y,
                z: 0.0,
                mesh_size: lc,
            })
            .collect();

        let n = blueprint.vertices.len();
        let lines: Vec<Line> = (0..n)
            .map(|i| Line {
                tag: tags.next_tag(),
                start: points[i].tag,
                end: points[(i + 1) % n].tag,
            })
            .collect();

        let circles: Vec<Circle> = blueprint
            .circles
            .iter()
            .map(|spec| Circle {
                tag: tags.next_tag(),
                x: spec.center[0],
                y: spec.center[1],
                z: 0.0,
                radius: spec.radius,
            })
            .collect();

        let mut curve_loops = Vec::with_capacity(circles.len() + 1);
        curve_loops.push(CurveLoop {
            tag: tags.next_tag(),
            curves: lines.iter().map(|l| l.tag).collect(),
        });
        for circle in &circles {
            curve_loops.push(CurveLoop {
                tag: tags.next_tag(),
                curves: vec![circle.tag],
            });
        }

        let surfaces: Vec<Surface> = curve_loops
            .iter()
            .map(|cl| Surface {
                tag: tags.next_tag(),
                curve_loop: cl.tag,
            })
            .collect();

        let cut = Cut {
            tag: tags.next_tag(),
            object: vec![EntityRef::surface(surfaces[0].tag)],
            tools: surfaces[1..]
                .iter()
                .map(|s| EntityRef::surface(s.tag))
                .collect(),
        };

        Ok(Self {
            configuration: blueprint.configuration,
            points,
            lines,
            circles,
            curve_loops,
            surfaces,
            cut,
            mesh_options: MeshOptions::for_target_size(lc),
        })
    }

    /// Polygon surface (the cut's object).
    pub fn outer_surface(&self) -> &Surface {
        &self.surfaces[0]
    }

    /// Highest tag in the plan.
    pub fn last_tag(&self) -> Tag {
        self.cut.tag
    }
}
