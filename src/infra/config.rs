use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::{AppContext, InitArgs};

/// Config file name looked up in the project root, then the working directory
pub const CONFIG_FILE: &str = "callscope.toml";

/// Environment overrides for traversal depth (take precedence over the file)
pub const ENV_DEPTH_UP: &str = "CONTEXT_CALL_DEPTH_UP";
pub const ENV_DEPTH_DOWN: &str = "CONTEXT_CALL_DEPTH_DOWN";

/// How overloaded methods map onto graph identities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OverloadPolicy
{
    /// One identity per (type, name); overloads share a node
    #[default]
    Merge,

    /// Identities carry the erased parameter list
    Distinguish,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Source directory relative to the project root
    pub source_root: String,

    /// File extensions to index
    pub extensions: Vec<String>,

    /// Extra ignore globs (in addition to .gitignore), relative to the
    /// source root. Empty by default: package names like `build` are legal.
    pub ignore_patterns: Vec<String>,

    /// Cap on related files per result
    pub max_related_files: usize,

    /// Files at or above this size (bytes) are never emitted
    pub max_file_size: u64,

    /// Cap on call-chain strings per result
    pub max_call_chains: usize,

    /// Default caller hops
    pub up_depth: usize,

    /// Default callee hops
    pub down_depth: usize,

    /// Overload handling for method identities
    pub overloads: OverloadPolicy,

    /// Token budget for text rendering
    pub max_context_tokens: usize,

    /// Model or encoding name used for token counting
    pub model: String,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            source_root: "src/main/java".to_string(),
            extensions: vec!["java".to_string()],
            ignore_patterns: Vec::new(),
            max_related_files: 10,
            max_file_size: 500 * 1024,
            max_call_chains: 20,
            up_depth: 2,
            down_depth: 2,
            overloads: OverloadPolicy::Merge,
            max_context_tokens: 20_000,
            model: "gpt-4o".to_string(),
        }
    }
}

/// Load configuration: `<root>/callscope.toml` (or `./callscope.toml`),
/// then `CALLSCOPE_*` environment variables, over built-in defaults
pub fn load_config(root: Option<&Path>) -> Result<Config>
{
    let mut builder = config::Config::builder();

    // First existing file wins
    let candidates = root
        .map(|r| r.join(CONFIG_FILE))
        .into_iter()
        .chain(std::iter::once(Path::new(CONFIG_FILE).to_path_buf()));

    for path in candidates
    {
        if path.is_file()
        {
            debug!(path = %path.display(), "loading config file");
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    // CALLSCOPE_MAX_RELATED_FILES=5, CALLSCOPE_EXTENSIONS=java,kt
    builder = builder.add_source(
        config::Environment::with_prefix("CALLSCOPE")
            .prefix_separator("_")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("extensions")
            .with_list_parse_key("ignore_patterns"),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

/// Pick a traversal depth: explicit flag, then env value, then fallback.
/// Env values that are not non-negative integers are ignored.
pub fn pick_depth(
    flag: Option<usize>,
    env_value: Option<&str>,
    fallback: usize,
) -> usize
{
    if let Some(d) = flag
    {
        return d;
    }

    env_value
        .and_then(|v| {
            v.trim()
                .parse::<usize>()
                .ok()
        })
        .unwrap_or(fallback)
}

/// Depth lookup against the process environment
pub fn depth_from_env(
    flag: Option<usize>,
    var: &str,
    fallback: usize,
) -> usize
{
    let value = std::env::var(var).ok();

    pick_depth(flag, value.as_deref(), fallback)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILE);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
