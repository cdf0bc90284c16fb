//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/cutmesh/cutmesh.toml`
//! 3. Local config: `<project_dir>/.cutmesh.toml`
//! 4. Environment variables: `CUTMESH_*` prefix, `__` for nesting
//!    (e.g. `CUTMESH_GEOMETRY__RADIUS=25`)

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::GeometryParams;
use crate::util::path::expand_env_vars;

/// Geometric inputs shared by all configurations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeometrySettings {
    /// Target element size at the points
    pub lc: f64,
    /// Polygon vertex radius and vertex circle radius
    pub radius: f64,
    /// Center circle radius (configuration C)
    pub small_radius: f64,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        let params = GeometryParams::default();
        Self {
            lc: params.lc,
            radius: params.radius,
            small_radius: params.small_radius,
        }
    }
}

impl GeometrySettings {
    pub fn params(&self) -> GeometryParams {
        GeometryParams {
            lc: self.lc,
            radius: self.radius,
            small_radius: self.small_radius,
        }
    }
}

/// How the gmsh binary is invoked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GmshSettings {
    /// Executable name or path
    pub binary: String,
    /// Output format passed as `-format` (e.g. "msh22"); gmsh default when unset
    pub format: Option<String>,
    /// Copy the generated `.geo` script next to each mesh
    pub keep_scripts: bool,
    /// Extra command-line arguments appended to the meshing call
    pub extra_args: Vec<String>,
}

impl Default for GmshSettings {
    fn default() -> Self {
        Self {
            binary: "gmsh".into(),
            format: None,
            keep_scripts: false,
            extra_args: vec![],
        }
    }
}

/// Mesh inspection tolerances.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InspectSettings {
    /// Relative slack on the `[lc, 100 lc]` edge length bounds
    pub size_tolerance: f64,
}

impl Default for InspectSettings {
    fn default() -> Self {
        Self {
            size_tolerance: 0.25,
        }
    }
}

/// Raw gmsh config for intermediate parsing (fields are Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawGmshSettings {
    pub binary: Option<String>,
    pub format: Option<String>,
    pub keep_scripts: Option<bool>,
    pub extra_args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawGeometrySettings {
    pub lc: Option<f64>,
    pub radius: Option<f64>,
    pub small_radius: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawInspectSettings {
    pub size_tolerance: Option<f64>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub output_dir: Option<PathBuf>,
    pub geometry: RawGeometrySettings,
    pub gmsh: RawGmshSettings,
    pub inspect: RawInspectSettings,
}

impl GmshSettings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are appended to base (order kept, duplicates dropped)
    /// - Items prefixed with `!` remove the corresponding item from the result
    ///
    /// # Examples
    /// ```ignore
    /// merge_args(&["-v", "2"], &["-nt", "4"])  // → ["-v", "2", "-nt", "4"]
    /// merge_args(&["-v", "2"], &["!2", "-3"])  // → ["-v", "-3"]
    /// ```
    pub fn merge_args(base: &[String], overlay: &[String]) -> Vec<String> {
        let removed: HashSet<&str> = overlay
            .iter()
            .filter_map(|a| a.strip_prefix('!'))
            .collect();

        let mut seen = HashSet::new();
        base.iter()
            .chain(overlay.iter().filter(|a| !a.starts_with('!')))
            .filter(|a| !removed.contains(a.as_str()))
            .filter(|a| seen.insert(a.as_str()))
            .cloned()
            .collect()
    }

    /// Merge overlay config onto self (base).
    ///
    /// - Scalar options: overlay wins if Some, otherwise keep base
    /// - `extra_args`: union merge with negation support (if overlay specified)
    pub fn merge(&self, overlay: &RawGmshSettings) -> Self {
        Self {
            binary: overlay.binary.clone().unwrap_or_else(|| self.binary.clone()),
            format: overlay.format.clone().or_else(|| self.format.clone()),
            keep_scripts: overlay.keep_scripts.unwrap_or(self.keep_scripts),
            extra_args: overlay
                .extra_args
                .as_ref()
                .map(|o| Self::merge_args(&self.extra_args, o))
                .unwrap_or_else(|| self.extra_args.clone()),
        }
    }

    /// Apply global config onto defaults.
    ///
    /// Unlike `merge()`, a global `extra_args` REPLACES the default list.
    pub fn apply_global(&self, global: &RawGmshSettings) -> Self {
        Self {
            extra_args: global
                .extra_args
                .clone()
                .unwrap_or_else(|| self.extra_args.clone()),
            ..self.merge(&RawGmshSettings {
                extra_args: None,
                ..global.clone()
            })
        }
    }
}

impl GeometrySettings {
    fn merge(&self, overlay: &RawGeometrySettings) -> Self {
        Self {
            lc: overlay.lc.unwrap_or(self.lc),
            radius: overlay.radius.unwrap_or(self.radius),
            small_radius: overlay.small_radius.unwrap_or(self.small_radius),
        }
    }
}

impl InspectSettings {
    /// Reject tolerances that would turn the edge length bounds into a no-op.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        validate_size_tolerance(self.size_tolerance)
    }

    fn merge(&self, overlay: &RawInspectSettings) -> Self {
        Self {
            size_tolerance: overlay.size_tolerance.unwrap_or(self.size_tolerance),
        }
    }
}

/// `size_tolerance` must be finite and within `[0, 1)`.
pub fn validate_size_tolerance(tolerance: f64) -> Result<(), ApplicationError> {
    if tolerance.is_finite() && (0.0..1.0).contains(&tolerance) {
        return Ok(());
    }
    Err(ApplicationError::Config {
        message: format!("inspect.size_tolerance must be in [0, 1), got {tolerance}"),
    })
}

/// Unified configuration for cutmesh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Directory receiving `mesh_A.msh`, `mesh_B.msh`, `mesh_C.msh`
    pub output_dir: PathBuf,
    pub geometry: GeometrySettings,
    pub gmsh: GmshSettings,
    pub inspect: InspectSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            geometry: GeometrySettings::default(),
            gmsh: GmshSettings::default(),
            inspect: InspectSettings::default(),
        }
    }
}

/// Get the XDG config directory for cutmesh.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cutmesh").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("cutmesh.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".cutmesh.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Geometry parameters for building configurations.
    pub fn geometry_params(&self) -> GeometryParams {
        self.geometry.params()
    }

    /// `<output_dir>/<file_name>`
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    /// Expand shell variables and tilde in path-like fields.
    ///
    /// Handles `~`, `$VAR`, and `${VAR}` syntax.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.output_dir.to_string_lossy().as_ref());
        self.output_dir = PathBuf::from(expanded);

        // binary may be given as ~/opt/gmsh/bin/gmsh
        self.gmsh.binary = expand_env_vars(&self.gmsh.binary);
    }

    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            output_dir: overlay
                .output_dir
                .clone()
                .unwrap_or_else(|| self.output_dir.clone()),
            geometry: self.geometry.merge(&overlay.geometry),
            gmsh: self.gmsh.merge(&overlay.gmsh),
            inspect: self.inspect.merge(&overlay.inspect),
        }
    }

    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            gmsh: self.gmsh.apply_global(&global.gmsh),
            ..self.merge_with(global)
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional project directory for local config
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/cutmesh/cutmesh.toml` (`extra_args` REPLACE defaults)
    /// 3. Local config: `<project_dir>/.cutmesh.toml` (`extra_args` UNION with global)
    /// 4. Environment variables: `CUTMESH_*` prefix (REPLACES - explicit override)
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path();
        let local = project_dir.map(local_config_path);
        let mut current = Self::load_files(global.as_deref(), local.as_deref())?;

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.inspect.validate()?;

        Ok(current)
    }

    /// Defaults plus the given config files, without environment overrides.
    ///
    /// Missing files are skipped.
    pub fn load_files(global: Option<&Path>, local: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global {
            if global_path.exists() {
                let raw = load_raw_settings(global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(local_path) = local {
            if local_path.exists() {
                let raw = load_raw_settings(local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current.expand_paths();
        current.inspect.validate()?;
        Ok(current)
    }

    /// Apply CUTMESH_* environment variables as explicit overrides.
    ///
    /// Env vars replace values (not merge) - they are explicit user overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("CUTMESH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("gmsh.extra_args"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("output_dir") {
            settings.output_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_float("geometry.lc") {
            settings.geometry.lc = val;
        }
        if let Ok(val) = config.get_float("geometry.radius") {
            settings.geometry.radius = val;
        }
        if let Ok(val) = config.get_float("geometry.small_radius") {
            settings.geometry.small_radius = val;
        }
        if let Ok(val) = config.get_string("gmsh.binary") {
            settings.gmsh.binary = val;
        }
        if let Ok(val) = config.get_string("gmsh.format") {
            settings.gmsh.format = Some(val);
        }
        if let Ok(val) = config.get_bool("gmsh.keep_scripts") {
            settings.gmsh.keep_scripts = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("gmsh.extra_args") {
            settings.gmsh.extra_args = val;
        }
        if let Ok(val) = config.get_float("inspect.size_tolerance") {
            settings.inspect.size_tolerance = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# cutmesh configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/cutmesh/cutmesh.toml  (defines your baseline)
#   Local:  <project_dir>/.cutmesh.toml     (project-specific overrides)
#   Env:    CUTMESH_* environment variables (explicit overrides,
#           nested keys use "__", e.g. CUTMESH_GMSH__BINARY)
#
# Array Merge Semantics (gmsh.extra_args):
#   Global config REPLACES the compiled default.
#   Local config UNIONS with global.
#   Use "!arg" in local config to REMOVE an inherited argument.

# Directory receiving mesh_A.msh, mesh_B.msh, mesh_C.msh
# output_dir = "."

[geometry]
# Target element size at every point
# lc = 0.0005

# Polygon vertex radius, also the radius of every vertex circle
# radius = 20.0

# Radius of the center circle of configuration C
# small_radius = 8.25

[gmsh]
# gmsh executable
# binary = "gmsh"

# Mesh file format passed as -format (gmsh default when unset)
# format = "msh22"

# Keep the generated .geo script next to each mesh
# keep_scripts = false

# Extra arguments for the meshing call
# extra_args = ["-nt", "4"]

[inspect]
# Relative slack on the [lc, 100 lc] element edge length bounds
# size_tolerance = 0.25
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_created_then_match_reference_parameters() {
        let settings = Settings::default();
        assert_eq!(settings.geometry.lc, 0.0005);
        assert_eq!(settings.geometry.radius, 20.0);
        assert_eq!(settings.geometry.small_radius, 8.25);
        assert_eq!(settings.output_dir, PathBuf::from("."));
        assert_eq!(settings.gmsh.binary, "gmsh");
        assert!(!settings.gmsh.keep_scripts);
    }

    #[test]
    fn given_tilde_in_output_dir_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            output_dir: PathBuf::from("~/meshes"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let out = settings.output_dir.to_string_lossy();
        assert!(out.starts_with(&home), "output_dir should start with home: {}", out);
        assert!(!out.contains('~'));
    }

    // ========================================
    // Tests for merge_args union semantics
    // ========================================

    #[test]
    fn test_merge_args_union_keeps_order() {
        let base = vec!["-v".to_string(), "2".to_string()];
        let overlay = vec!["-nt".to_string(), "4".to_string()];
        let result = GmshSettings::merge_args(&base, &overlay);

        assert_eq!(result, vec!["-v", "2", "-nt", "4"]);
    }

    #[test]
    fn test_merge_args_negation() {
        let base = vec!["-v".to_string(), "2".to_string()];
        let overlay = vec!["!2".to_string(), "-3".to_string()];
        let result = GmshSettings::merge_args(&base, &overlay);

        assert_eq!(result, vec!["-v", "-3"]);
    }

    #[test]
    fn test_merge_args_duplicates() {
        let base = vec!["-v".to_string()];
        let overlay = vec!["-v".to_string(), "-3".to_string()];
        let result = GmshSettings::merge_args(&base, &overlay);

        assert_eq!(result, vec!["-v", "-3"]);
    }

    #[test]
    fn test_apply_global_replaces_extra_args() {
        let base = GmshSettings {
            extra_args: vec!["-v".to_string()],
            ..GmshSettings::default()
        };
        let global = RawGmshSettings {
            binary: Some("/opt/gmsh/bin/gmsh".to_string()),
            extra_args: Some(vec!["-nt".to_string(), "2".to_string()]),
            ..RawGmshSettings::default()
        };

        let result = base.apply_global(&global);

        assert_eq!(result.binary, "/opt/gmsh/bin/gmsh");
        assert_eq!(result.extra_args, vec!["-nt", "2"]);
        assert_eq!(result.format, None);
    }

    #[test]
    fn test_merge_keeps_base_when_not_specified() {
        let base = GmshSettings {
            binary: "gmsh-4.11".to_string(),
            format: Some("msh22".to_string()),
            keep_scripts: true,
            extra_args: vec!["-v".to_string()],
        };

        let result = base.merge(&RawGmshSettings::default());

        assert_eq!(result, base);
    }

    #[test]
    fn given_out_of_range_tolerance_when_validating_then_config_error() {
        for tolerance in [f64::NAN, f64::INFINITY, -0.1, 1.0, 1.5] {
            let result = validate_size_tolerance(tolerance);
            assert!(
                matches!(result, Err(ApplicationError::Config { .. })),
                "tolerance {tolerance} accepted"
            );
        }
        assert!(validate_size_tolerance(0.0).is_ok());
        assert!(InspectSettings::default().validate().is_ok());
    }
}
