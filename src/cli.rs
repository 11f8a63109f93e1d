use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the suite configuration engine.
#[derive(Parser, Debug)]
#[command(
    name = "suiteconf",
    about = "Metadata-driven configuration management engine",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Metadata configuration file
    #[arg(short, long, global = true)]
    pub meta: Option<PathBuf>,

    /// Print reports as JSON instead of log lines
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reformat a configuration file canonically
    Dump(DumpOpts),
    /// Show the changeset between two configuration files
    Diff(DiffOpts),
    /// Load a configuration directory through its import chain
    Resolve(ResolveOpts),
    /// Run validators against a configuration
    Validate(CheckOpts),
    /// Run transformers (fixers and trigger propagation)
    Transform(TransformOpts),
    /// Print version information
    Version,
}

/// Options for the `dump` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct DumpOpts {
    /// Configuration file to reformat
    pub file: PathBuf,

    /// Rewrite the file instead of printing to stdout
    #[arg(short, long)]
    pub in_place: bool,
}

/// Options for the `diff` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct DiffOpts {
    /// Base configuration file
    pub base: PathBuf,

    /// Overlay configuration file
    pub overlay: PathBuf,
}

/// Options for the `resolve` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ResolveOpts {
    /// Configuration directory to resolve
    pub dir: PathBuf,

    /// Configuration file name within each directory
    #[arg(short, long, default_value = "suite.conf")]
    pub filename: String,

    /// Directories searched for `import=` entries (repeatable)
    #[arg(short = 'I', long = "import-path")]
    pub import_paths: Vec<PathBuf>,

    /// Optional configuration keys to apply across the chain
    /// (repeatable; wrap in parentheses to tolerate absence)
    #[arg(short = 'O', long = "opt")]
    pub opt_keys: Vec<String>,
}

/// Options for the `validate` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CheckOpts {
    /// Configuration file to validate
    pub file: PathBuf,

    /// Checkers to run (default: all)
    #[arg(long, value_delimiter = ',')]
    pub checkers: Vec<String>,
}

/// Options for the `transform` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct TransformOpts {
    /// Configuration file to transform
    pub file: PathBuf,

    /// Checkers to run (default: all)
    #[arg(long, value_delimiter = ',')]
    pub checkers: Vec<String>,

    /// Checker options as name=value pairs (repeatable)
    #[arg(long = "option")]
    pub options: Vec<String>,

    /// Preview changes without writing
    #[arg(short = 'd', long)]
    pub dry_run: bool,
}
