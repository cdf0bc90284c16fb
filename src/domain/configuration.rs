//! The three named configurations and their parametric geometry

use std::fmt;
use std::str::FromStr;

use crate::domain::{Dim, DomainError, PhysicalGroup, Tag};

/// Name of the physical group holding the meshed domain surface.
pub const DOMAIN_GROUP_NAME: &str = "Domain";

/// Prefix of the per-curve boundary group names (`Boundary_1`, `Boundary_2`, ...).
pub const BOUNDARY_GROUP_PREFIX: &str = "Boundary_";

/// One of the three fixed domain layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigurationId {
    /// Equilateral triangle minus three vertex circles
    A,
    /// Square minus four vertex circles
    B,
    /// Square minus four vertex circles and one center circle
    C,
}

impl ConfigurationId {
    pub const ALL: [ConfigurationId; 3] = [ConfigurationId::A, ConfigurationId::B, ConfigurationId::C];

    pub fn letter(self) -> &'static str {
        match self {
            ConfigurationId::A => "A",
            ConfigurationId::B => "B",
            ConfigurationId::C => "C",
        }
    }

    /// Added to the 1-based boundary index to form the boundary group id.
    pub fn boundary_offset(self) -> i32 {
        match self {
            ConfigurationId::A => 0,
            ConfigurationId::B => 100,
            ConfigurationId::C => 200,
        }
    }

    /// Physical group id of the domain surface.
    pub fn domain_group_id(self) -> i32 {
        match self {
            ConfigurationId::A => 100,
            ConfigurationId::B => 200,
            ConfigurationId::C => 300,
        }
    }

    pub fn boundary_group_id(self, index: usize) -> i32 {
        self.boundary_offset() + index as i32
    }

    pub fn boundary_group_name(index: usize) -> String {
        format!("{}{}", BOUNDARY_GROUP_PREFIX, index)
    }

    /// File stem shared by the mesh and the kept engine script, e.g. `mesh_A`.
    pub fn file_stem(self) -> String {
        format!("mesh_{}", self.letter())
    }

    pub fn output_file_name(self) -> String {
        format!("{}.msh", self.file_stem())
    }

    /// One physical group per boundary curve, numbered in the given order.
    pub fn boundary_groups(self, curves: &[Tag]) -> Vec<PhysicalGroup> {
        curves
            .iter()
            .enumerate()
            .map(|(i, &curve)| {
                let index = i + 1;
                PhysicalGroup::new(
                    Dim::Curve,
                    self.boundary_group_id(index),
                    Self::boundary_group_name(index),
                    vec![curve],
                )
            })
            .collect()
    }

    pub fn domain_group(self, surface: Tag) -> PhysicalGroup {
        PhysicalGroup::new(
            Dim::Surface,
            self.domain_group_id(),
            DOMAIN_GROUP_NAME,
            vec![surface],
        )
    }
}

impl fmt::Display for ConfigurationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

impl FromStr for ConfigurationId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(ConfigurationId::A),
            "B" | "b" => Ok(ConfigurationId::B),
            "C" | "c" => Ok(ConfigurationId::C),
            other => Err(DomainError::UnknownConfiguration(other.to_string())),
        }
    }
}

/// Numeric inputs shared by all configurations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryParams {
    /// Target element size at the points
    pub lc: f64,
    /// Polygon vertex radius, also the radius of every vertex circle
    pub radius: f64,
    /// Radius of the center circle (configuration C only)
    pub small_radius: f64,
}

impl Default for GeometryParams {
    fn default() -> Self {
        Self {
            lc: 0.001 / 2.0,
            radius: 20.0,
            small_radius: 8.25,
        }
    }
}

impl GeometryParams {
    pub fn validate(&self) -> Result<(), DomainError> {
        for (name, value) in [
            ("lc", self.lc),
            ("radius", self.radius),
            ("small_radius", self.small_radius),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(DomainError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

/// Full circle to be cut out of the polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleSpec {
    pub center: [f64; 2],
    pub radius: f64,
}

/// Untagged geometry of a configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    pub configuration: ConfigurationId,
    /// Target element size for every point
    pub lc: f64,
    /// Polygon vertices in edge order; edge i joins vertex i to vertex i+1 (wrapping)
    pub vertices: Vec<[f64; 2]>,
    /// Points that are not polygon vertices
    pub free_points: Vec<[f64; 2]>,
    /// Vertex circles first, then any extra circles
    pub circles: Vec<CircleSpec>,
}

impl Blueprint {
    pub fn for_configuration(
        configuration: ConfigurationId,
        params: &GeometryParams,
    ) -> Result<Self, DomainError> {
        params.validate()?;
        let r = params.radius;

        let vertices = match configuration {
            ConfigurationId::A => triangle_vertices(r).to_vec(),
            ConfigurationId::B | ConfigurationId::C => square_vertices(r).to_vec(),
        };

        let mut circles: Vec<CircleSpec> = vertices
            .iter()
            .map(|&center| CircleSpec { center, radius: r })
            .collect();

        let mut free_points = Vec::new();
        if configuration == ConfigurationId::C {
            free_points.push(ORIGIN);
            circles.push(CircleSpec {
                center: ORIGIN,
                radius: params.small_radius,
            });
        }

        Ok(Self {
            configuration,
            lc: params.lc,
            vertices,
            free_points,
            circles,
        })
    }
}

const ORIGIN: [f64; 2] = [0.0, 0.0];

/// Triangle vertices `(r, 0)`, `(-r, 0)`, `(0, r * sqrt(3))`.
pub fn triangle_vertices(r: f64) -> [[f64; 2]; 3] {
    [[r, 0.0], [-r, 0.0], [0.0, 3f64.sqrt() * r]]
}

/// Square vertices `(r, r)`, `(r, -r)`, `(-r, -r)`, `(-r, r)`.
pub fn square_vertices(r: f64) -> [[f64; 2]; 4] {
    [[r, r], [r, -r], [-r, -r], [-r, r]]
}

/// Circumradius of the triangle `abc`: `|ab| |bc| |ca| / (4 * area)`.
pub fn circumradius(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    let ab = distance(a, b);
    let bc = distance(b, c);
    let ca = distance(c, a);
    let area = ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])).abs() / 2.0;
    ab * bc * ca / (4.0 * area)
}

pub fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    (b[0] - a[0]).hypot(b[1] - a[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_letter_when_parsing_then_accepts_both_cases() {
        assert_eq!("A".parse::<ConfigurationId>().unwrap(), ConfigurationId::A);
        assert_eq!("c".parse::<ConfigurationId>().unwrap(), ConfigurationId::C);
        assert!("D".parse::<ConfigurationId>().is_err());
    }

    #[test]
    fn given_configuration_when_numbering_groups_then_uses_fixed_offsets() {
        assert_eq!(ConfigurationId::A.boundary_group_id(1), 1);
        assert_eq!(ConfigurationId::B.boundary_group_id(1), 101);
        assert_eq!(ConfigurationId::C.boundary_group_id(3), 203);
        assert_eq!(ConfigurationId::A.domain_group_id(), 100);
        assert_eq!(ConfigurationId::B.domain_group_id(), 200);
        assert_eq!(ConfigurationId::C.domain_group_id(), 300);
    }

    #[test]
    fn given_curves_when_building_boundary_groups_then_numbers_from_offset() {
        let groups = ConfigurationId::B.boundary_groups(&[Tag(3), Tag(9)]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, 101);
        assert_eq!(groups[0].name, "Boundary_1");
        assert_eq!(groups[1].members, vec![Tag(9)]);
        assert_eq!(groups[1].dim, Dim::Curve);

        let domain = ConfigurationId::B.domain_group(Tag(23));
        assert_eq!((domain.id, domain.name.as_str()), (200, "Domain"));
    }

    #[test]
    fn given_non_positive_lc_when_validating_then_rejects() {
        let params = GeometryParams {
            lc: 0.0,
            ..GeometryParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(DomainError::InvalidParameter { name: "lc", .. })
        ));
    }

    #[test]
    fn given_nan_radius_when_validating_then_rejects() {
        let params = GeometryParams {
            radius: f64::NAN,
            ..GeometryParams::default()
        };
        assert!(params.validate().is_err());
    }
}
