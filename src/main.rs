use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use callscope::cli::{AppContext, Cli, Commands};
use callscope::core::ContextError;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        verbose: cli.verbose,
    };

    init_logging(&ctx);

    match dispatch(cli.command, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(err),
    }
}

fn dispatch(command: Commands, ctx: &AppContext) -> Result<()> {
    match command {
        Commands::Context(args) => callscope::core::context_run(args, ctx),
        Commands::Trace(args) => callscope::core::trace_run(args, ctx),
        Commands::Stats(args) => callscope::core::stats_run(args, ctx),
        Commands::Init(args) => callscope::infra::config::init(args, ctx),
        Commands::Completions(args) => callscope::completion::run(args, ctx),
    }
}

/// Logs go to stderr; RUST_LOG wins over --verbose
fn init_logging(ctx: &AppContext) {
    let default = if ctx.verbose { "callscope=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!ctx.no_color)
        .with_writer(std::io::stderr)
        .init();
}

/// Usage errors exit 2 with a diagnostic; everything else exits 1
fn report(err: anyhow::Error) -> ExitCode {
    match err.downcast::<ContextError>() {
        Ok(usage) => {
            eprintln!("{:?}", miette::Report::new(usage));
            ExitCode::from(2)
        }
        Err(other) => {
            eprintln!("Error: {other:#}");
            ExitCode::FAILURE
        }
    }
}
