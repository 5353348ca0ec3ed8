//! Plain-text rendering of an assembled context for prompt inclusion.
//!
//! `render_text` is the complete form. `render_budgeted` keeps it when it
//! fits in `max_tokens`; otherwise it degrades: changed files stay in full,
//! related files shrink to paths, and chains are cut to ten. Token counts
//! come from tiktoken-rs and are cached by content hash.

use anyhow::{Context, Result, anyhow};
use moka::sync::Cache;
use tiktoken_rs::{CoreBPE, cl100k_base, get_bpe_from_model, o200k_base};
use tracing::{debug, warn};
use xxhash_rust::xxh64::Xxh64;

use crate::core::context::ContextResult;

const HEADER: &str = "\n\nCode context (reference only, do not raise issues about this section)\n";
const TRUNCATED_NOTE: &str = "Note: some content omitted due to token limit\n";

/// Chains listed in the full rendering
pub const FULL_CHAIN_LIMIT: usize = 20;
/// Chains listed once the budget is exceeded
pub const TRUNCATED_CHAIN_LIMIT: usize = 10;
/// Related paths listed once the budget is exceeded
pub const TRUNCATED_RELATED_LIMIT: usize = 3;

/// Token accounting used by the budgeted renderer.
pub trait TokenCounter {
    fn count(&self, s: &str) -> usize;

    /// Longest prefix of `s` within `max_tokens`.
    fn truncate(&self, s: &str, max_tokens: usize) -> String;
}

/// tiktoken-backed counter with a hash-keyed count cache
pub struct BpeCounter {
    bpe: CoreBPE,
    cache: Cache<u64, usize>,
}

impl BpeCounter {
    /// Accepts a model name ("gpt-4o") or an encoding name ("cl100k_base").
    pub fn new(model_or_encoding: &str) -> Result<Self> {
        let lower = model_or_encoding.to_ascii_lowercase();

        let bpe = match get_bpe_from_model(&lower) {
            Ok(b) => b,
            Err(_) => match lower.as_str() {
                "o200k_base" => o200k_base().context("load o200k_base")?,
                "cl100k_base" => cl100k_base().context("load cl100k_base")?,
                _ => return Err(anyhow!("Unsupported model/encoding: {model_or_encoding}")),
            },
        };

        Ok(Self {
            bpe,
            cache: Cache::new(10_000),
        })
    }

    /// Like `new`, but unknown models fall back to o200k_base.
    pub fn for_model(model: &str) -> Result<Self> {
        Self::new(model).or_else(|e| {
            warn!(model, error = %e, "unknown tokenizer model; using o200k_base");
            Self::new("o200k_base")
        })
    }
}

impl TokenCounter for BpeCounter {
    fn count(&self, s: &str) -> usize {
        let mut hasher = Xxh64::new(0);
        hasher.update(s.as_bytes());
        let key = hasher.digest();

        if let Some(t) = self.cache.get(&key) {
            return t;
        }

        let t = self.bpe.encode_ordinary(s).len();
        self.cache.insert(key, t);
        t
    }

    fn truncate(&self, s: &str, max_tokens: usize) -> String {
        if max_tokens == 0 {
            return String::new();
        }

        let ids = self.bpe.encode_ordinary(s);
        if ids.len() <= max_tokens {
            return s.to_string();
        }

        // A cut inside a multi-byte character does not decode; back off
        // until the prefix ends on a character boundary.
        (0..=max_tokens)
            .rev()
            .find_map(|n| self.bpe.decode(ids[..n].to_vec()).ok())
            .unwrap_or_default()
    }
}

/// Complete text form of `result`.
pub fn render_text(result: &ContextResult) -> String {
    let mut out = String::from(HEADER);

    if !result.changed_files.is_empty() {
        out.push_str("\n== Changed files ==\n");
        for file in &result.changed_files {
            out.push_str(&format!("\nFile: {}\n", file.path));
            if let Some(class) = &file.class_name {
                out.push_str(&format!("Class: {class}\n"));
            }
            if !file.annotations.is_empty() {
                out.push_str(&format!("Class annotations: {}\n", file.annotations.join(", ")));
            }
            out.push_str(&format!("\n{}\n", file.full_content));
        }
    }

    if !result.related_files.is_empty() {
        out.push_str("\n== Related files ==\n");
        for file in &result.related_files {
            out.push_str(&format!("\nFile: {} ({})\n", file.path, file.reason));
            out.push_str(&format!("\n{}\n", file.full_content));
        }
    }

    push_chains(&mut out, &result.call_chains, FULL_CHAIN_LIMIT);
    out
}

/// Degraded form used when the complete text exceeds `max_tokens`.
pub fn render_truncated(result: &ContextResult, max_tokens: usize, counter: &dyn TokenCounter) -> String {
    let mut out = String::from(HEADER);
    out.push_str(TRUNCATED_NOTE);

    if !result.changed_files.is_empty() {
        out.push_str("\n== Changed files ==\n");
        for file in &result.changed_files {
            out.push_str(&format!("\nFile: {}\n", file.path));
            out.push_str(&format!("{}\n", file.full_content));
        }
    }

    let used = counter.count(&out);
    if used >= max_tokens {
        // Changed files alone are over budget
        return counter.truncate(&out, max_tokens);
    }

    // Thresholds are measured once, after the changed files
    if !result.related_files.is_empty() && (used as f64) < max_tokens as f64 * 0.8 {
        out.push_str("\n== Related files (paths only) ==\n");
        for file in result.related_files.iter().take(TRUNCATED_RELATED_LIMIT) {
            out.push_str(&format!("\nFile: {} (content omitted)\n", file.path));
        }
    }

    if (used as f64) < max_tokens as f64 * 0.9 {
        push_chains(&mut out, &result.call_chains, TRUNCATED_CHAIN_LIMIT);
    }

    out
}

/// Full text when it fits in `max_tokens`, otherwise the truncated form.
pub fn render_budgeted(result: &ContextResult, max_tokens: usize, counter: &dyn TokenCounter) -> String {
    let full = render_text(result);
    let tokens = counter.count(&full);

    if tokens <= max_tokens {
        debug!(tokens, max_tokens, "context fits");
        return full;
    }

    debug!(tokens, max_tokens, "context over budget; truncating");
    render_truncated(result, max_tokens, counter)
}

fn push_chains(out: &mut String, chains: &[String], limit: usize) {
    if chains.is_empty() {
        return;
    }

    out.push_str("\n== Call chains ==\n");
    for chain in chains.iter().take(limit) {
        out.push_str(&format!("- {chain}\n"));
    }
}
