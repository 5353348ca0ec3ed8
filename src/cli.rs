use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::chains::ChainStyle;
use crate::infra::config::OverloadPolicy;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub verbose: bool,  // global --verbose
}

#[derive(Parser)]
#[command(name = "callscope")]
#[command(
    about = "Extract call-graph context (callers, callees, call chains) around changed Java methods"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress spinners and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assemble related files and call chains for changed files
    Context(ContextArgs),

    /// Show callers and callees of one method
    Trace(TraceArgs),

    /// Summarize the project call graph
    Stats(StatsArgs),

    /// Initialize a callscope.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Project and traversal options shared by graph commands
#[derive(Args, Debug, Clone)]
pub struct GraphArgs {
    /// Project root directory
    #[arg(long, value_name = "DIR")]
    pub repo_path: PathBuf,

    /// Overload handling (defaults to config)
    #[arg(long, value_enum)]
    pub overloads: Option<OverloadPolicy>,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Machine-readable JSON (stable field names)
    #[default]
    Json,
    /// Reviewer-facing text, trimmed to the token budget
    Text,
}

#[derive(Parser, Debug)]
pub struct ContextArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Comma-separated repo-relative paths of changed files
    #[arg(long, value_name = "PATHS")]
    pub changed_files: String,

    /// JSON object mapping changed file path to changed method names
    #[arg(long, value_name = "JSON", conflicts_with = "diff")]
    pub changed_methods: Option<String>,

    /// Unified diff used to detect changed methods ("-" for stdin)
    #[arg(long, value_name = "FILE")]
    pub diff: Option<PathBuf>,

    /// Caller hops (flag > CONTEXT_CALL_DEPTH_UP > config)
    #[arg(long)]
    pub up_depth: Option<usize>,

    /// Callee hops (flag > CONTEXT_CALL_DEPTH_DOWN > config)
    #[arg(long)]
    pub down_depth: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Token budget for text output (defaults to config)
    #[arg(long)]
    pub max_tokens: Option<usize>,

    /// Call-chain rendering
    #[arg(long, value_enum, default_value_t = ChainStyle::Pair)]
    pub chain_style: ChainStyle,
}

#[derive(Parser, Debug)]
pub struct TraceArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Method to trace: `com.x.Foo#bar`, `Foo.bar` or `bar`
    #[arg(value_name = "METHOD")]
    pub method: String,

    /// Caller hops
    #[arg(long, default_value_t = 3)]
    pub up_depth: usize,

    /// Callee hops
    #[arg(long, default_value_t = 3)]
    pub down_depth: usize,
}

#[derive(Parser, Debug)]
pub struct StatsArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Print the graph in Graphviz DOT format instead of a summary
    #[arg(long)]
    pub dot: bool,

    /// How many entries to list in the top tables
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
