//! Command dispatch and handlers

use std::path::Path;

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::{BuildReport, MeshSummary};
use crate::cli::args::{Cli, Commands, ConfigArg, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_dir, global_config_path, local_config_path, Settings};
use crate::domain::ConfigurationId;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::util::path::resolve_against;

/// Load settings for the project directory and run the selected command.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let project_dir = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("determine current directory", e))?,
    };
    debug!("execute_command: project_dir={}", project_dir.display());

    match &cli.command {
        Some(Commands::Config { command }) => cmd_config(command, &project_dir),
        Some(Commands::Completion { .. }) => Err(CliError::Usage(
            "completion is handled before settings are loaded".into(),
        )),
        command => {
            let mut settings = Settings::load(Some(&project_dir))?;
            settings.output_dir = resolve_against(&project_dir, &settings.output_dir);
            dispatch(command.as_ref(), settings, &project_dir)
        }
    }
}

fn dispatch(command: Option<&Commands>, mut settings: Settings, project_dir: &Path) -> CliResult<()> {
    match command {
        None => cmd_run(&ServiceContainer::new(settings), &[]),
        Some(Commands::Run {
            configurations,
            output_dir,
        }) => {
            if let Some(dir) = output_dir {
                settings.output_dir = resolve_against(project_dir, dir);
            }
            cmd_run(&ServiceContainer::new(settings), configurations)
        }
        Some(Commands::Plan { configuration }) => {
            cmd_plan(&ServiceContainer::new(settings), (*configuration).into())
        }
        Some(Commands::Inspect {
            file,
            config,
            check,
        }) => cmd_inspect(
            &ServiceContainer::new(settings),
            &resolve_against(project_dir, file),
            config.map(Into::into),
            *check,
        ),
        Some(Commands::Config { .. }) | Some(Commands::Completion { .. }) => {
            Err(CliError::Usage("unexpected command".into()))
        }
    }
}

#[instrument(skip(container))]
fn cmd_run(container: &ServiceContainer, configurations: &[ConfigArg]) -> CliResult<()> {
    let ids: Vec<ConfigurationId> = if configurations.is_empty() {
        ConfigurationId::ALL.to_vec()
    } else {
        configurations.iter().map(|&c| c.into()).collect()
    };

    let reports = container.builder.build_all(&ids)?;
    for report in &reports {
        print_report(report);
    }
    Ok(())
}

fn print_report(report: &BuildReport) {
    output::success(&format!(
        "configuration {} -> {}",
        report.configuration,
        report.output.display()
    ));
    output::detail(&format!(
        "{} points, {} lines, {} circles",
        report.point_count, report.line_count, report.circle_count
    ));
    output::detail(&format!(
        "domain group \"{}\" id {} (surface {})",
        report.domain_group.name, report.domain_group.id, report.domain_surface
    ));
    output::detail(&format!(
        "{} boundary groups, ids {}..={}",
        report.boundary_groups.len(),
        report.boundary_groups.first().map(|g| g.id).unwrap_or_default(),
        report.boundary_groups.last().map(|g| g.id).unwrap_or_default()
    ));
}

#[instrument(skip(container))]
fn cmd_plan(container: &ServiceContainer, configuration: ConfigurationId) -> CliResult<()> {
    let plan = container.builder.plan(configuration)?;

    output::header(&format!("Configuration {}", configuration));
    for p in &plan.points {
        output::detail(&format!(
            "point    {:>3}  ({}, {}, {})  lc={}",
            p.tag, p.x, p.y, p.z, p.mesh_size
        ));
    }
    for l in &plan.lines {
        output::detail(&format!("line     {:>3}  {} -> {}", l.tag, l.start, l.end));
    }
    for c in &plan.circles {
        output::detail(&format!(
            "circle   {:>3}  center ({}, {})  r={}",
            c.tag, c.x, c.y, c.radius
        ));
    }
    for cl in &plan.curve_loops {
        output::detail(&format!(
            "loop     {:>3}  [{}]",
            cl.tag,
            cl.curves.iter().join(", ")
        ));
    }
    for s in &plan.surfaces {
        output::detail(&format!("surface  {:>3}  loop {}", s.tag, s.curve_loop));
    }
    output::detail(&format!(
        "cut      {:>3}  [{}] minus [{}]",
        plan.cut.tag,
        plan.cut.object.iter().map(|e| e.tag).join(", "),
        plan.cut.tools.iter().map(|e| e.tag).join(", ")
    ));

    output::header("Physical groups");
    output::detail(&format!(
        "boundary  {}, {}, ... named {}, {}, ...",
        configuration.boundary_group_id(1),
        configuration.boundary_group_id(2),
        ConfigurationId::boundary_group_name(1),
        ConfigurationId::boundary_group_name(2)
    ));
    output::detail(&format!(
        "domain    {} named \"{}\"",
        configuration.domain_group_id(),
        configuration.domain_group(plan.cut.tag).name
    ));

    output::header("Mesh options");
    for (name, value) in plan.mesh_options.engine_options() {
        output::detail(&format!("{} = {}", name, value));
    }
    output::detail(&format!(
        "output {}",
        container.builder.output_path(configuration).display()
    ));
    Ok(())
}

#[instrument(skip(container))]
fn cmd_inspect(
    container: &ServiceContainer,
    file: &Path,
    configuration: Option<ConfigurationId>,
    check: bool,
) -> CliResult<()> {
    let summary = container.inspector.summarize(file)?;
    print_summary(&summary);

    let Some(configuration) = configuration else {
        return Ok(());
    };

    output::header(&format!("Checks for configuration {}", configuration));
    let findings = container.inspector.check(&summary, configuration)?;
    if findings.is_empty() {
        output::success_detail("all properties hold");
        return Ok(());
    }
    for finding in &findings {
        output::failure(finding);
    }
    if check {
        return Err(CliError::CheckFailed(findings.len()));
    }
    Ok(())
}

fn print_summary(summary: &MeshSummary) {
    output::header(&summary.path.display());
    output::detail(&format!("format {}", summary.version));
    output::detail(&format!("{} nodes", summary.node_count));
    output::detail(&format!(
        "{} points, {} lines, {} triangles",
        summary.point_elements, summary.line_elements, summary.triangle_elements
    ));
    if let Some((shortest, longest)) = summary.edge_length {
        output::detail(&format!(
            "triangle edges {:.3e} .. {:.3e}",
            shortest, longest
        ));
    }
    for group in &summary.groups {
        output::detail(&format!(
            "group dim={} id={:>4} {:<12} {} elements",
            group.dim,
            group.id,
            group.name.as_deref().unwrap_or("-"),
            group.element_count
        ));
    }
}

#[instrument]
fn cmd_config(command: &ConfigCommands, project_dir: &Path) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(Some(project_dir))?;
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path()
                    .ok_or_else(|| CliError::Usage("cannot determine global config directory".into()))?
            } else {
                local_config_path(project_dir)
            };
            write_template(&path)
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(p) => output::action("global", &p.display()),
                None => output::warning("no global config directory"),
            }
            output::action("local", &local_config_path(project_dir).display());
            if let Some(dir) = global_config_dir() {
                debug!("global config dir: {}", dir.display());
            }
            Ok(())
        }
    }
}

fn write_template(path: &Path) -> CliResult<()> {
    if path.exists() {
        return Err(CliError::Usage(format!(
            "config already exists: {}",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
    }
    std::fs::write(path, Settings::template())
        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
    output::action("Created", &path.display());
    Ok(())
}
