use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Strider CLI - Drive a molecular-dynamics backend one frame at a time, and persist engine configurations.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a trajectory from an engine configuration file.
    Run(RunArgs),
    /// List the platforms offered by the backend.
    Platforms,
    /// Write the persisted record of an engine configuration.
    Persist(PersistArgs),
    /// Load a persisted engine record and print what it contains.
    Inspect(InspectArgs),
}

/// Options shared by every command that builds an engine from a config file.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Path to the engine configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override `options.steps-per-frame` from the config file.
    #[arg(long, value_name = "INT")]
    pub steps_per_frame: Option<usize>,

    /// Override `options.frames-max` from the config file ("unbounded" lifts the limit).
    #[arg(long, value_name = "INT|unbounded")]
    pub frames_max: Option<String>,

    /// Override the platform. Accepts a platform name or "fastest".
    #[arg(short, long, value_name = "NAME")]
    pub platform: Option<String>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S integrator.step-size=0.001
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Number of frames to generate after the starting state.
    #[arg(short = 'n', long, value_name = "INT")]
    pub frames: Option<usize>,

    /// Minimize the energy before generating frames.
    #[arg(long)]
    pub minimize: bool,
}

/// Arguments for the `persist` subcommand.
#[derive(Args, Debug)]
pub struct PersistArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Path for the persisted engine record.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to a persisted engine record.
    #[arg(required = true, value_name = "PATH")]
    pub record: PathBuf,

    /// Also open a session and report the initial state and frame timestep.
    #[arg(long)]
    pub probe: bool,
}
