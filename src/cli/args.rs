//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::ConfigurationId;

/// Build triangulated meshes of three parametric 2-D domains with gmsh
#[derive(Parser, Debug)]
#[command(name = "cutmesh")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Project directory (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    /// Without a subcommand, configurations A, B and C are built in order
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Configuration selector
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigArg {
    /// Triangle minus three vertex circles
    #[value(name = "A", alias = "a")]
    A,
    /// Square minus four vertex circles
    #[value(name = "B", alias = "b")]
    B,
    /// Square minus four vertex circles and a center circle
    #[value(name = "C", alias = "c")]
    C,
}

impl From<ConfigArg> for ConfigurationId {
    fn from(arg: ConfigArg) -> Self {
        match arg {
            ConfigArg::A => ConfigurationId::A,
            ConfigArg::B => ConfigurationId::B,
            ConfigArg::C => ConfigurationId::C,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build meshes (all configurations when none given)
    Run {
        /// Configurations to build
        #[arg(value_enum)]
        configurations: Vec<ConfigArg>,

        /// Directory for the mesh files (overrides settings)
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        output_dir: Option<PathBuf>,
    },

    /// Show the entity/tag plan of a configuration
    Plan {
        #[arg(value_enum)]
        configuration: ConfigArg,
    },

    /// Summarize a mesh file
    Inspect {
        /// Mesh file (.msh, ASCII)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,

        /// Verify the properties of this configuration
        #[arg(short, long, value_enum)]
        config: Option<ConfigArg>,

        /// Exit with code 1 when verification finds problems
        #[arg(long, requires = "config")]
        check: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
