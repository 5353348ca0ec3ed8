//! Command handlers: load config, open the workspace, run one request and
//! print the result.

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::info;

use crate::cli::{AppContext, ContextArgs, GraphArgs, OutputFormat, StatsArgs, TraceArgs};
use crate::core::context::{ContextRequest, assemble};
use crate::core::diff::changed_methods_from_diff;
use crate::core::render::{BpeCounter, render_budgeted};
use crate::core::trace::{find_methods, stats, to_dot, trace};
use crate::core::workspace::Workspace;
use crate::infra::config::{ENV_DEPTH_DOWN, ENV_DEPTH_UP, depth_from_env, load_config};

pub fn context_run(args: ContextArgs, ctx: &AppContext) -> Result<()> {
    // Usage problems first, before any indexing work
    let changed_files = ContextRequest::parse_changed_files(&args.changed_files)?;
    let explicit_methods = args
        .changed_methods
        .as_deref()
        .map(ContextRequest::parse_changed_methods)
        .transpose()?;

    let ws = open_workspace(&args.graph, ctx)?;
    let config = ws.config();

    let changed_methods = match (explicit_methods, &args.diff) {
        (Some(methods), _) => Some(methods),
        (None, Some(path)) => {
            let diff = read_diff(path)?;
            Some(changed_methods_from_diff(ws.root(), &diff, &changed_files)?)
        }
        (None, None) => None,
    };

    let req = ContextRequest {
        changed_files,
        changed_methods,
        up_depth: depth_from_env(args.up_depth, ENV_DEPTH_UP, config.up_depth),
        down_depth: depth_from_env(args.down_depth, ENV_DEPTH_DOWN, config.down_depth),
        chain_style: args.chain_style,
    };

    let result = assemble(&ws, &req);
    info!(
        changed = result.changed_files.len(),
        related = result.related_files.len(),
        chains = result.call_chains.len(),
        "context assembled"
    );

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result).context("serialize context")?;
            println!("{json}");
        }
        OutputFormat::Text => {
            let counter = BpeCounter::for_model(&config.model)?;
            let budget = args.max_tokens.unwrap_or(config.max_context_tokens);
            print!("{}", render_budgeted(&result, budget, &counter));
        }
    }

    Ok(())
}

pub fn trace_run(args: TraceArgs, ctx: &AppContext) -> Result<()> {
    let ws = open_workspace(&args.graph, ctx)?;
    let graph = ws.graph();

    let matches = find_methods(graph, &args.method);
    if matches.is_empty() {
        bail!("No method matches '{}'", args.method);
    }

    if matches.len() > 1 && !ctx.quiet {
        eprintln!("{} methods match '{}'", matches.len(), args.method);
    }

    for id in matches {
        let report = trace(graph, id, args.up_depth, args.down_depth);
        print!("{}", report.render_tree(!ctx.no_color));
    }

    Ok(())
}

pub fn stats_run(args: StatsArgs, ctx: &AppContext) -> Result<()> {
    let ws = open_workspace(&args.graph, ctx)?;

    if args.dot {
        println!("{}", to_dot(ws.graph()));
        return Ok(());
    }

    let summary = stats(ws.graph(), args.top);
    let title = format!("Call graph for {}", ws.root().display());

    if ctx.no_color {
        println!("{title}");
    } else {
        println!("{}", title.bold());
    }

    print!("{}", summary.render_tables());
    Ok(())
}

/// Load config for the project and build its workspace behind a spinner.
fn open_workspace(graph: &GraphArgs, ctx: &AppContext) -> Result<Workspace> {
    let raw = graph.repo_path.to_string_lossy();
    let root = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand path: {raw}"))?
        .into_owned();
    let root = Path::new(&root);

    let mut config = load_config(Some(root))?;
    if let Some(policy) = graph.overloads {
        config.overloads = policy;
    }

    let spinner = if ctx.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };
    spinner.set_message(format!("Indexing {}", root.display()));

    let ws = Workspace::open(root, config);
    spinner.finish_and_clear();

    ws
}

/// Diff text from a file, or from stdin when the path is `-`.
fn read_diff(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read diff from stdin")?;
        return Ok(text);
    }

    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read diff: {}", path.display()))
}
