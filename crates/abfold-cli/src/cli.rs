use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The abfold developers",
    version,
    about = "abfold - Antibody Fv structure prediction by ensemble reconciliation: superposes the predictions of several models, ranks them by consensus and refines the best one.",
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

    /// Set the number of threads used when ensemble members run in parallel.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Predict the structure of an antibody Fv from its heavy and light chain sequences.
    Predict(PredictArgs),
    /// Manage the local data directory holding the model weights.
    Data(DataArgs),
}

/// Arguments for the `predict` subcommand.
#[derive(Args, Debug)]
pub struct PredictArgs {
    // --- Input ---
    /// Heavy chain amino acid sequence.
    #[arg(short = 'H', long, value_name = "SEQUENCE", requires = "light")]
    pub heavy: Option<String>,

    /// Light chain amino acid sequence.
    #[arg(short = 'L', long, value_name = "SEQUENCE", requires = "heavy")]
    pub light: Option<String>,

    /// FASTA file with records named `H` and `L`.
    #[arg(short, long, value_name = "PATH", conflicts_with_all = ["heavy", "light"])]
    pub fasta: Option<PathBuf>,

    // --- Output ---
    /// Output file, or output directory with --to-directory.
    /// Defaults to 'abfold_output.pdb' or 'abfold_output/'.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Save every ranked unrefined model, the error estimates and the refined top
    /// model to a directory.
    #[arg(long)]
    pub to_directory: bool,

    // --- Configuration ---
    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Ensemble members to run, as a comma-separated list of ids (e.g. 1,2,4).
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub models: Option<Vec<u8>>,

    /// Skip refinement and keep the unrefined structure.
    #[arg(long)]
    pub no_refine: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S ensemble.parallel=true
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `data` subcommand.
#[derive(Args, Debug)]
pub struct DataArgs {
    #[command(subcommand)]
    pub command: DataCommands,
}

/// Available commands for data management.
#[derive(Subcommand, Debug)]
pub enum DataCommands {
    /// Show the absolute path to the local data directory.
    Path,
    /// Set a custom absolute path for the local data directory.
    SetPath {
        /// The new path to use for storing data files.
        #[arg(required = true)]
        path: PathBuf,
    },
    /// Reset the data path to its default, OS-specific location.
    ResetPath,
}
