//! `.geo` script rendering (OpenCASCADE factory)

use std::fmt;

use itertools::Itertools;
use regex::Regex;

use crate::domain::{
    Circle, Cut, CurveLoop, Dim, EntityRef, Line, PhysicalGroup, Point, Surface, Tag,
};
use crate::infrastructure::{InfraError, InfraResult};

/// Marker printed by the probe block for every enumerated entity.
pub const ENTITY_MARKER: &str = "@entity";

/// One statement of a gmsh `.geo` script.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoStatement {
    Factory,
    Point(Point),
    Line(Line),
    Circle(Circle),
    CurveLoop(CurveLoop),
    Surface(Surface),
    Cut(Cut),
    Physical(PhysicalGroup),
    Option { name: String, value: f64 },
}

impl fmt::Display for GeoStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoStatement::Factory => write!(f, "SetFactory(\"OpenCASCADE\");"),
            GeoStatement::Point(p) => write!(
                f,
                "Point({}) = {{{}, {}, {}, {}}};",
                p.tag, p.x, p.y, p.z, p.mesh_size
            ),
            GeoStatement::Line(l) => write!(f, "Line({}) = {{{}, {}}};", l.tag, l.start, l.end),
            GeoStatement::Circle(c) => write!(
                f,
                "Circle({}) = {{{}, {}, {}, {}}};",
                c.tag, c.x, c.y, c.z, c.radius
            ),
            GeoStatement::CurveLoop(cl) => write!(
                f,
                "Curve Loop({}) = {{{}}};",
                cl.tag,
                cl.curves.iter().join(", ")
            ),
            GeoStatement::Surface(s) => write!(f, "Surface({}) = {{{}}};", s.tag, s.curve_loop),
            GeoStatement::Cut(cut) => write!(
                f,
                "BooleanDifference({}) = {{ {}Delete; }}{{ {}Delete; }};",
                cut.tag,
                boolean_operand(&cut.object),
                boolean_operand(&cut.tools)
            ),
            GeoStatement::Physical(g) => write!(
                f,
                "Physical {}(\"{}\", {}) = {{{}}};",
                g.dim.keyword(),
                g.name.replace('"', ""),
                g.id,
                g.members.iter().join(", ")
            ),
            GeoStatement::Option { name, value } => write!(f, "{} = {};", name, value),
        }
    }
}

/// `Surface{1, 2}; Curve{3}; ` grouped by dimension, lowest first.
fn boolean_operand(refs: &[EntityRef]) -> String {
    [Dim::Point, Dim::Curve, Dim::Surface]
        .iter()
        .filter_map(|&dim| {
            let tags: Vec<Tag> = refs.iter().filter(|e| e.dim == dim).map(|e| e.tag).collect();
            (!tags.is_empty()).then(|| format!("{}{{{}}}; ", dim.keyword(), tags.iter().join(", ")))
        })
        .collect()
}

/// Ordered list of statements making up one model.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoScript {
    statements: Vec<GeoStatement>,
}

impl Default for GeoScript {
    fn default() -> Self {
        Self {
            statements: vec![GeoStatement::Factory],
        }
    }
}

impl GeoScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: GeoStatement) {
        self.statements.push(statement);
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = self.statements.iter().join("\n");
        out.push('\n');
        out
    }

    /// Script followed by a block printing `@entity <dim> <tag>` for every
    /// point, curve and surface of the model.
    pub fn render_with_probe(&self) -> String {
        let mut out = self.render();
        for dim in [Dim::Point, Dim::Curve, Dim::Surface] {
            let var = format!("probe_{}", dim.keyword().to_lowercase());
            out.push_str(&format!("{var}[] = {}{{:}};\n", dim.keyword()));
            out.push_str(&format!("For probe_i In {{0:#{var}[]-1}}\n"));
            out.push_str(&format!(
                "  Printf(\"{ENTITY_MARKER} {} %.0f\", {var}[probe_i]);\n",
                dim.as_i32()
            ));
            out.push_str("EndFor\n");
        }
        out
    }
}

/// Extract `@entity <dim> <tag>` lines from gmsh output, in output order.
///
/// A marker line that is not exactly a dimension and an integer tag is an
/// error rather than being skipped.
pub fn parse_probe_output(output: &str) -> InfraResult<Vec<EntityRef>> {
    let re = Regex::new(&format!(r"^{}\s+(\d+)\s+(-?\d+)$", ENTITY_MARKER)).map_err(|e| {
        InfraError::Gmsh {
            message: format!("entity marker pattern: {e}"),
            exit_code: None,
        }
    })?;

    output
        .lines()
        .filter_map(|line| line.find(ENTITY_MARKER).map(|pos| line[pos..].trim_end()))
        .map(|marker| {
            re.captures(marker)
                .and_then(|caps| {
                    let dim = caps[1].parse::<i32>().ok().and_then(Dim::from_i32)?;
                    let tag = caps[2].parse::<i32>().ok()?;
                    Some(EntityRef::new(dim, Tag(tag)))
                })
                .ok_or_else(|| InfraError::Gmsh {
                    message: format!("unreadable entity marker '{marker}'"),
                    exit_code: None,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_point_when_rendering_then_uses_shortest_float_form() {
        let stmt = GeoStatement::Point(Point {
            tag: Tag(1),
            x: 20.0,
            y: -20.0,
            z: 0.0,
            mesh_size: 0.0005,
        });
        assert_eq!(stmt.to_string(), "Point(1) = {20, -20, 0, 0.0005};");
    }

    #[test]
    fn given_cut_when_rendering_then_deletes_object_and_tools() {
        let stmt = GeoStatement::Cut(Cut {
            tag: Tag(18),
            object: vec![EntityRef::surface(Tag(14))],
            tools: vec![
                EntityRef::surface(Tag(15)),
                EntityRef::surface(Tag(16)),
                EntityRef::surface(Tag(17)),
            ],
        });
        assert_eq!(
            stmt.to_string(),
            "BooleanDifference(18) = { Surface{14}; Delete; }{ Surface{15, 16, 17}; Delete; };"
        );
    }

    #[test]
    fn given_physical_group_when_rendering_then_carries_name_and_id() {
        let stmt = GeoStatement::Physical(PhysicalGroup::new(
            Dim::Surface,
            100,
            "Domain",
            vec![Tag(18)],
        ));
        assert_eq!(stmt.to_string(), "Physical Surface(\"Domain\", 100) = {18};");
    }

    #[test]
    fn given_noisy_output_when_parsing_probe_then_keeps_marker_lines_only() {
        let output = "Info    : Reading 'probe.geo'...\n\
                      @entity 1 19\n\
                      Warning : something\n\
                      @entity 1 7\n\
                      @entity 2 18\n\
                      Info    : Done reading 'probe.geo'\n";
        let parsed = parse_probe_output(output).unwrap();
        assert_eq!(
            parsed,
            vec![
                EntityRef::new(Dim::Curve, Tag(19)),
                EntityRef::new(Dim::Curve, Tag(7)),
                EntityRef::new(Dim::Surface, Tag(18)),
            ]
        );
    }

    #[test]
    fn given_script_when_rendering_probe_then_appends_loops_for_each_dim() {
        let script = GeoScript::new();
        let text = script.render_with_probe();
        assert!(text.starts_with("SetFactory(\"OpenCASCADE\");\n"));
        assert!(text.contains("probe_curve[] = Curve{:};"));
        assert!(text.contains("Printf(\"@entity 2 %.0f\", probe_surface[probe_i]);"));
    }

    #[test]
    fn given_exponent_tag_when_reading_entity_markers_then_rejects_line() {
        let output = "@entity 1 19\n@entity 1 1e+06\n";
        let err = parse_probe_output(output).unwrap_err();
        assert!(err.to_string().contains("@entity 1 1e+06"), "{err}");
    }

    #[test]
    fn given_large_tag_when_reading_entity_markers_then_reads_all_digits() {
        let parsed = parse_probe_output("Info    : @entity 2 1000000\n").unwrap();
        assert_eq!(parsed, vec![EntityRef::new(Dim::Surface, Tag(1_000_000))]);
    }

    #[test]
    fn given_unknown_dimension_when_reading_entity_markers_then_rejects_line() {
        assert!(parse_probe_output("@entity 7 3\n").is_err());
    }
}
