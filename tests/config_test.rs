//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global: REPLACE (global defines the real baseline)
//! - Global → Local: UNION with negation support for `gmsh.extra_args`
//! - Any → Env vars: REPLACE (explicit user override)
//!
//! Env var overrides live in `env_override_test.rs`, a separate test binary,
//! because they mutate process-global state.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use cutmesh::application::ApplicationError;
use cutmesh::config::{local_config_path, Settings};
use cutmesh::domain::GeometryParams;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

// ============================================================
// Settings::load_files() layering
// ============================================================

#[test]
fn given_no_files_when_load_files_then_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();

    // Act
    let settings = Settings::load_files(
        Some(&dir.path().join("absent.toml")),
        Some(&local_config_path(dir.path())),
    )
    .unwrap();

    // Assert
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.geometry_params(), GeometryParams::default());
}

#[test]
fn given_global_and_local_when_load_files_then_local_scalars_win() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let global = write(
        &dir,
        "global.toml",
        r#"
output_dir = "/srv/meshes"

[geometry]
lc = 0.001
radius = 10.0

[gmsh]
binary = "/usr/local/bin/gmsh"
format = "msh41"
"#,
    );
    let local = write(
        &dir,
        ".cutmesh.toml",
        r#"
[geometry]
lc = 0.002

[gmsh]
format = "msh22"
keep_scripts = true
"#,
    );

    // Act
    let settings = Settings::load_files(Some(&global), Some(&local)).unwrap();

    // Assert
    assert_eq!(settings.output_dir, PathBuf::from("/srv/meshes"));
    assert_eq!(settings.geometry.lc, 0.002);
    assert_eq!(settings.geometry.radius, 10.0);
    assert_eq!(settings.geometry.small_radius, 8.25);
    assert_eq!(settings.gmsh.binary, "/usr/local/bin/gmsh");
    assert_eq!(settings.gmsh.format.as_deref(), Some("msh22"));
    assert!(settings.gmsh.keep_scripts);
    assert_eq!(settings.inspect.size_tolerance, 0.25);
}

#[test]
fn given_local_extra_args_when_load_files_then_unions_with_global() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let global = write(
        &dir,
        "global.toml",
        r#"
[gmsh]
extra_args = ["-v", "2", "-nt", "4"]
"#,
    );
    let local = write(
        &dir,
        ".cutmesh.toml",
        r#"
[gmsh]
extra_args = ["!-nt", "!4", "-algo", "del2d"]
"#,
    );

    // Act
    let settings = Settings::load_files(Some(&global), Some(&local)).unwrap();

    // Assert
    assert_eq!(settings.gmsh.extra_args, vec!["-v", "2", "-algo", "del2d"]);
}

#[test]
fn given_local_without_extra_args_when_load_files_then_keeps_global_list() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let global = write(&dir, "global.toml", "[gmsh]\nextra_args = [\"-v\", \"0\"]\n");
    let local = write(&dir, ".cutmesh.toml", "[geometry]\nlc = 0.01\n");

    // Act
    let settings = Settings::load_files(Some(&global), Some(&local)).unwrap();

    // Assert
    assert_eq!(settings.gmsh.extra_args, vec!["-v", "0"]);
    assert_eq!(settings.geometry.lc, 0.01);
}

#[test]
fn given_invalid_toml_when_load_files_then_config_error_names_file() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let local = write(&dir, ".cutmesh.toml", "[geometry\nlc = ");

    // Act
    let err = Settings::load_files(None, Some(&local)).unwrap_err();

    // Assert
    match err {
        ApplicationError::Config { message } => {
            assert!(message.contains(".cutmesh.toml"), "{message}");
        }
        other => panic!("expected Config, got {other:?}"),
    }
}

#[test]
fn given_wrong_type_when_load_files_then_config_error() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let local = write(&dir, ".cutmesh.toml", "[geometry]\nlc = \"small\"\n");

    // Act
    let result = Settings::load_files(None, Some(&local));

    // Assert
    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_tolerance_of_one_when_load_files_then_config_error() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let local = write(&dir, ".cutmesh.toml", "[inspect]\nsize_tolerance = 1.0\n");

    // Act
    let result = Settings::load_files(None, Some(&local));

    // Assert
    match result {
        Err(ApplicationError::Config { message }) => {
            assert!(message.contains("size_tolerance"), "{message}");
        }
        other => panic!("expected Config, got {other:?}"),
    }
}

// ============================================================
// template / to_toml
// ============================================================

#[test]
fn given_template_when_loaded_as_local_then_yields_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let local = write(&dir, ".cutmesh.toml", &Settings::template());

    // Act
    let settings = Settings::load_files(None, Some(&local)).unwrap();

    // Assert
    assert_eq!(settings, Settings::default());
}

#[test]
fn given_settings_when_rendered_as_toml_then_reloads_identically() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let mut original = Settings::default();
    original.output_dir = PathBuf::from("/tmp/meshes");
    original.geometry.lc = 0.004;
    original.gmsh.format = Some("msh22".into());
    original.gmsh.extra_args = vec!["-v".into(), "3".into()];
    let local = write(&dir, ".cutmesh.toml", &original.to_toml().unwrap());

    // Act
    let reloaded = Settings::load_files(None, Some(&local)).unwrap();

    // Assert
    assert_eq!(reloaded, original);
}
