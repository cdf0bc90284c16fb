//! Tests for the gmsh-backed engine
//!
//! Uses a scripted `gmsh` double so no binary is needed:
//! - probe output parsing and caching
//! - meshing command line (dimension, output, format, extra args)
//! - error mapping for missing binary, failing exit and missing output
//! - session lifecycle (write before generate, use after finalize, kept scripts)

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use cutmesh::config::{GmshSettings, Settings};
use cutmesh::domain::{ConfigurationId, Dim, EntityRef, Point, Tag};
use cutmesh::infrastructure::di::ServiceContainer;
use cutmesh::infrastructure::gmsh::GmshProvider;
use cutmesh::infrastructure::traits::{EngineProvider, GeometryEngine, RealFileSystem};
use cutmesh::infrastructure::InfraError;
use cutmesh::util::testing::{init_test_setup, ScriptedRunner};

fn provider(runner: &ScriptedRunner, settings: GmshSettings) -> GmshProvider {
    init_test_setup();
    GmshProvider::new(Arc::new(RealFileSystem), Arc::new(runner.clone()), settings)
}

fn point(tag: i32) -> Point {
    Point {
        tag: Tag(tag),
        x: tag as f64,
        y: 0.0,
        z: 0.0,
        mesh_size: 0.5,
    }
}

fn meshing_args(runner: &ScriptedRunner) -> Vec<String> {
    runner
        .invocations()
        .into_iter()
        .map(|(_, args)| args)
        .find(|args| args.iter().any(|a| a == "-o"))
        .expect("no meshing invocation")
}

// ============================================================
// entities()
// ============================================================

#[test]
fn given_probe_output_when_enumerating_then_filters_by_dimension() {
    // Arrange
    let runner = ScriptedRunner::with_entities(&[(0, 1), (1, 21), (1, 19), (2, 18)]);
    let mut engine = provider(&runner, GmshSettings::default())
        .open_session("mesh_A")
        .unwrap();
    engine.add_point(&point(1)).unwrap();

    // Act
    let curves = engine.entities(Dim::Curve).unwrap();
    let surfaces = engine.entities(Dim::Surface).unwrap();

    // Assert
    assert_eq!(
        curves,
        vec![
            EntityRef::new(Dim::Curve, Tag(21)),
            EntityRef::new(Dim::Curve, Tag(19))
        ]
    );
    assert_eq!(surfaces, vec![EntityRef::surface(Tag(18))]);
    // unchanged script is probed once
    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].0, "gmsh");
    assert!(invocations[0].1.contains(&"-parse_and_exit".to_string()));
}

#[test]
fn given_script_changed_when_enumerating_again_then_probes_again() {
    // Arrange
    let runner = ScriptedRunner::with_entities(&[(0, 1)]);
    let mut engine = provider(&runner, GmshSettings::default())
        .open_session("mesh_A")
        .unwrap();
    engine.add_point(&point(1)).unwrap();
    engine.entities(Dim::Point).unwrap();

    // Act
    engine.add_point(&point(2)).unwrap();
    engine.entities(Dim::Point).unwrap();

    // Assert
    assert_eq!(runner.invocations().len(), 2);
}

#[test]
fn given_missing_binary_when_enumerating_then_gmsh_unavailable() {
    // Arrange
    let runner = ScriptedRunner {
        missing: true,
        ..ScriptedRunner::new()
    };
    let settings = GmshSettings {
        binary: "/opt/nowhere/gmsh".into(),
        ..GmshSettings::default()
    };
    let mut engine = provider(&runner, settings).open_session("mesh_B").unwrap();

    // Act
    let err = engine.entities(Dim::Surface).unwrap_err();

    // Assert
    match err {
        InfraError::GmshUnavailable { binary, .. } => assert_eq!(binary, "/opt/nowhere/gmsh"),
        other => panic!("expected GmshUnavailable, got {other:?}"),
    }
}

#[test]
fn given_error_line_on_success_exit_when_enumerating_then_fails() {
    // Arrange
    let runner = ScriptedRunner {
        probe_output: "Error   : Unknown curve 99\n".into(),
        ..ScriptedRunner::new()
    };
    let mut engine = provider(&runner, GmshSettings::default())
        .open_session("mesh_C")
        .unwrap();

    // Act
    let err = engine.entities(Dim::Curve).unwrap_err();

    // Assert
    match err {
        InfraError::Gmsh { message, exit_code } => {
            assert!(message.contains("Unknown curve 99"), "{message}");
            assert_eq!(exit_code, Some(0));
        }
        other => panic!("expected Gmsh, got {other:?}"),
    }
}

#[test]
fn given_exponent_formatted_tag_when_enumerating_then_fails_naming_line() {
    // Arrange
    let runner = ScriptedRunner {
        probe_output: "@entity 1 1e+06\n".into(),
        ..ScriptedRunner::new()
    };
    let mut engine = provider(&runner, GmshSettings::default())
        .open_session("mesh_A")
        .unwrap();

    // Act
    let err = engine.entities(Dim::Curve).unwrap_err();

    // Assert
    match err {
        InfraError::Gmsh { message, .. } => assert!(message.contains("1e+06"), "{message}"),
        other => panic!("expected Gmsh, got {other:?}"),
    }
}

// ============================================================
// generate() / write()
// ============================================================

#[test]
fn given_generated_model_when_writing_then_passes_dimension_output_and_format() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("mesh").join("mesh_A.msh");
    let runner = ScriptedRunner::with_entities(&[]);
    let settings = GmshSettings {
        format: Some("msh22".into()),
        extra_args: vec!["-v".into(), "2".into()],
        ..GmshSettings::default()
    };
    let mut engine = provider(&runner, settings).open_session("mesh_A").unwrap();
    engine.add_point(&point(1)).unwrap();
    engine.generate(Dim::Surface).unwrap();

    // Act
    engine.write(&out).unwrap();

    // Assert
    assert!(out.exists());
    let args = meshing_args(&runner);
    assert!(args[0].ends_with("mesh_A.geo"), "{args:?}");
    let out_str = out.to_string_lossy().into_owned();
    assert_eq!(
        args[1..].to_vec(),
        vec!["-2", "-o", out_str.as_str(), "-format", "msh22", "-v", "2"]
    );
}

#[test]
fn given_no_generate_when_writing_then_session_error() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let runner = ScriptedRunner::with_entities(&[]);
    let mut engine = provider(&runner, GmshSettings::default())
        .open_session("mesh_A")
        .unwrap();

    // Act
    let err = engine.write(&temp.path().join("mesh_A.msh")).unwrap_err();

    // Assert
    assert!(matches!(err, InfraError::Session(_)), "{err:?}");
    assert!(runner.invocations().is_empty());
}

#[test]
fn given_failing_exit_when_writing_then_reports_exit_code_and_stderr() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let runner = ScriptedRunner {
        fail_with: Some((3, "segmentation of curve 7 failed".into())),
        ..ScriptedRunner::new()
    };
    let mut engine = provider(&runner, GmshSettings::default())
        .open_session("mesh_B")
        .unwrap();
    engine.generate(Dim::Surface).unwrap();

    // Act
    let err = engine.write(&temp.path().join("mesh_B.msh")).unwrap_err();

    // Assert
    match err {
        InfraError::Gmsh { message, exit_code } => {
            assert_eq!(exit_code, Some(3));
            assert_eq!(message, "segmentation of curve 7 failed");
        }
        other => panic!("expected Gmsh, got {other:?}"),
    }
}

#[test]
fn given_gmsh_writes_nothing_when_writing_then_fails() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("mesh_C.msh");
    let runner = ScriptedRunner {
        skip_output: true,
        ..ScriptedRunner::with_entities(&[])
    };
    let mut engine = provider(&runner, GmshSettings::default())
        .open_session("mesh_C")
        .unwrap();
    engine.generate(Dim::Surface).unwrap();

    // Act
    let err = engine.write(&out).unwrap_err();

    // Assert
    assert!(err.to_string().contains("no mesh written"), "{err}");
}

// ============================================================
// finalize()
// ============================================================

#[test]
fn given_finalized_session_when_adding_then_session_error() {
    // Arrange
    let runner = ScriptedRunner::new();
    let mut engine = provider(&runner, GmshSettings::default())
        .open_session("mesh_A")
        .unwrap();
    engine.finalize().unwrap();

    // Act
    let err = engine.add_point(&point(1)).unwrap_err();

    // Assert
    assert!(matches!(err, InfraError::Session(_)));
    // finalize is idempotent
    assert!(engine.finalize().is_ok());
}

#[test]
fn given_keep_scripts_when_finalizing_then_script_lands_next_to_mesh() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("mesh_A.msh");
    let runner = ScriptedRunner::with_entities(&[]);
    let settings = GmshSettings {
        keep_scripts: true,
        ..GmshSettings::default()
    };
    let mut engine = provider(&runner, settings).open_session("mesh_A").unwrap();
    engine.add_point(&point(1)).unwrap();
    engine.generate(Dim::Surface).unwrap();
    engine.write(&out).unwrap();

    // Act
    engine.finalize().unwrap();

    // Assert
    let kept = std::fs::read_to_string(temp.path().join("mesh_A.geo")).unwrap();
    assert!(kept.starts_with("SetFactory(\"OpenCASCADE\");"));
    assert!(kept.contains("Point(1) = {1, 0, 0, 0.5};"), "{kept}");
}

// ============================================================
// full configuration through the service container
// ============================================================

fn settings_in(dir: &Path) -> Settings {
    Settings {
        output_dir: dir.to_path_buf(),
        gmsh: GmshSettings {
            keep_scripts: true,
            ..GmshSettings::default()
        },
        ..Settings::default()
    }
}

#[test]
fn given_configuration_a_when_building_with_gmsh_then_script_holds_cut_and_groups() {
    // Arrange
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let runner = ScriptedRunner::with_entities(&[(2, 18), (1, 21), (1, 19), (1, 20)]);
    let container = ServiceContainer::with_deps(
        settings_in(temp.path()),
        Arc::new(RealFileSystem),
        Arc::new(runner.clone()),
    );

    // Act
    let report = container.builder.build(ConfigurationId::A).unwrap();

    // Assert
    assert_eq!(report.domain_surface, Tag(18));
    let members: Vec<Tag> = report
        .boundary_groups
        .iter()
        .map(|g| g.members[0])
        .collect();
    assert_eq!(members, vec![Tag(19), Tag(20), Tag(21)]);
    assert!(temp.path().join("mesh_A.msh").exists());

    let script = std::fs::read_to_string(temp.path().join("mesh_A.geo")).unwrap();
    assert!(script.contains(
        "BooleanDifference(18) = { Surface{14}; Delete; }{ Surface{15, 16, 17}; Delete; };"
    ));
    assert!(script.contains("Physical Curve(\"Boundary_1\", 1) = {19};"));
    assert!(script.contains("Physical Curve(\"Boundary_3\", 3) = {21};"));
    assert!(script.contains("Physical Surface(\"Domain\", 100) = {18};"));
    assert!(script.contains("Mesh.MeshSizeMin = 0.0005;"));
    assert!(script.contains("Mesh.MeshSizeMax = 0.05;"));

    // one probe for both enumerations, one meshing call
    assert_eq!(runner.invocations().len(), 2);
}
