//! Context assembly for changed files.
//!
//! For every changed file: its declarations (class, annotations, method
//! signatures), the files owning methods within the requested caller and
//! callee hops of its changed methods, and readable call chains. The
//! result is bounded by `max_related_files` and `max_call_chains`.

use std::collections::HashSet; // path sets
use std::path::Path; // extension checks

use indexmap::{IndexMap, IndexSet}; // ordered results
use serde::{Deserialize, Serialize}; // JSON structs
use tracing::{debug, instrument, warn}; // diagnostics

use crate::core::callgraph::MethodIdentity;
use crate::core::chains::{ChainStyle, format_chains};
use crate::core::collect::collect;
use crate::core::errors::ContextError;
use crate::core::workspace::Workspace;
use crate::infra::config::OverloadPolicy;
use crate::infra::io::read_source;
use crate::infra::utils::NameUtils;
use crate::parsers::java_parser::{JavaParser, ParsedFile};

/// Changed method names per changed file path
pub type ChangedMethods = IndexMap<String, Vec<String>>;

/// One context request against a workspace
#[derive(Debug, Clone, Default)]
pub struct ContextRequest
{
    /// Repo-relative changed paths (normalized)
    pub changed_files: Vec<String>,

    /// Optional narrowing to changed method names per file
    pub changed_methods: Option<ChangedMethods>,

    /// Caller hops
    pub up_depth: usize,

    /// Callee hops
    pub down_depth: usize,

    /// Chain rendering
    pub chain_style: ChainStyle,
}

impl ContextRequest
{
    /// Split a comma-separated path list; empty entries are dropped.
    pub fn parse_changed_files(csv: &str) -> Result<Vec<String>, ContextError>
    {
        let files: Vec<String> = csv
            .split(',')
            .map(NameUtils::normalize_rel_path)
            .filter(|p| !p.is_empty())
            .collect();

        if files.is_empty()
        {
            return Err(ContextError::NoChangedFiles);
        }

        Ok(files)
    }

    /// Parse `{"path": ["m1", "m2"]}`; keys are normalized like paths.
    pub fn parse_changed_methods(json: &str) -> Result<ChangedMethods, ContextError>
    {
        let raw: IndexMap<String, Vec<String>> =
            serde_json::from_str(json).map_err(ContextError::ChangedMethods)?;

        Ok(raw
            .into_iter()
            .map(|(k, v)| (NameUtils::normalize_rel_path(&k), v))
            .collect())
    }

    /// Method names to seed from for `path`; `None` means all
    fn methods_for(
        &self,
        path: &str,
    ) -> Option<&[String]>
    {
        self.changed_methods
            .as_ref()?
            .get(path)
            .map(Vec::as_slice)
            .filter(|names| !names.is_empty())
    }
}

/// Assembled context, serialized with the field names reviewers expect
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResult
{
    pub changed_files: Vec<ChangedFileContext>,
    pub related_files: Vec<RelatedFileContext>,
    pub call_chains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedFileContext
{
    pub path: String,
    pub full_content: String,

    /// Last type declared in the file
    pub class_name: Option<String>,

    /// Annotations of every type in the file
    pub annotations: Vec<String>,
    pub methods: Vec<MethodContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodContext
{
    pub name: String,
    pub annotations: Vec<String>,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedFileContext
{
    pub path: String,
    pub full_content: String,
    pub reason: String,
}

impl ChangedFileContext
{
    fn from_parsed(
        parsed: &ParsedFile,
        content: String,
    ) -> Self
    {
        Self {
            path: parsed
                .path
                .clone(),
            full_content: content,
            class_name: parsed
                .types
                .last()
                .map(|t| {
                    t.name
                        .clone()
                }),
            annotations: parsed
                .types
                .iter()
                .flat_map(|t| {
                    t.annotations
                        .iter()
                        .cloned()
                })
                .collect(),
            methods: parsed
                .types
                .iter()
                .flat_map(|t| {
                    t.methods
                        .iter()
                })
                .map(|m| MethodContext {
                    name: m
                        .name
                        .clone(),
                    annotations: m
                        .annotations
                        .clone(),
                    signature: m
                        .signature
                        .clone(),
                })
                .collect(),
        }
    }
}

/// Build the bounded context for `req` against the workspace graph.
#[instrument(
    skip_all,
    fields(changed = req.changed_files.len(), up = req.up_depth, down = req.down_depth)
)]
pub fn assemble(
    ws: &Workspace,
    req: &ContextRequest,
) -> ContextResult
{
    let config = ws.config();
    let graph = ws.graph();
    let parser = JavaParser::new();

    let changed: HashSet<&str> = req
        .changed_files
        .iter()
        .map(String::as_str)
        .collect();

    let mut result = ContextResult::default();
    let mut added: HashSet<String> = HashSet::new();
    let mut chains: IndexSet<String> = IndexSet::new();

    for path in &req.changed_files
    {
        if !has_source_extension(path, &config.extensions)
        {
            debug!(path = %path, "not a source file; skipped");
            continue;
        }

        let abs = ws
            .root()
            .join(path);
        let source = match read_source(&abs)
        {
            Ok(s) => s,
            Err(e) =>
            {
                warn!(path = %path, error = %e, "changed file unavailable; skipped");
                continue;
            }
        };

        let parsed = match parser.parse(path, &source.text)
        {
            Ok(p) => p,
            Err(e) =>
            {
                warn!(path = %path, error = %e, "changed file failed to parse; skipped");
                continue;
            }
        };

        let seeds = seeds_of(&parsed, req.methods_for(path), config.overloads);
        result
            .changed_files
            .push(ChangedFileContext::from_parsed(&parsed, source.text));

        if !ws.resolver_available() || seeds.is_empty()
        {
            continue;
        }

        let related = collect(graph, &seeds, req.up_depth, req.down_depth);
        debug!(path = %path, seeds = seeds.len(), related = related.len(), "collected");

        chains.extend(format_chains(
            graph,
            &seeds,
            &related,
            req.up_depth,
            req.down_depth,
            req.chain_style,
            config.max_call_chains,
        ));

        for id in &related
        {
            if result
                .related_files
                .len()
                >= config.max_related_files
            {
                break;
            }

            let Some(location) = graph.location(id)
            else
            {
                continue;
            };

            let rel = location
                .path
                .as_str();
            if rel == path.as_str() || changed.contains(rel) || added.contains(rel)
            {
                continue;
            }

            // Oversized files carry no content and are never emitted
            let Some(content) = ws
                .index()
                .file(rel)
                .and_then(|f| {
                    f.content
                        .clone()
                })
            else
            {
                debug!(path = %rel, "related file has no content; skipped");
                continue;
            };

            added.insert(rel.to_string());
            result
                .related_files
                .push(RelatedFileContext {
                    path: rel.to_string(),
                    full_content: content,
                    reason: format!("call-chain related to {path}"),
                });
        }
    }

    result.call_chains = chains
        .into_iter()
        .take(config.max_call_chains)
        .collect();

    result
}

/// Seed identities: all methods of the file, or only the named ones
fn seeds_of(
    parsed: &ParsedFile,
    only: Option<&[String]>,
    policy: OverloadPolicy,
) -> IndexSet<MethodIdentity>
{
    parsed
        .types
        .iter()
        .flat_map(|t| {
            t.methods
                .iter()
                .map(move |m| (t, m))
        })
        .filter(|(_, m)| {
            only.is_none_or(|names| {
                names
                    .iter()
                    .any(|n| *n == m.name)
            })
        })
        .map(|(t, m)| MethodIdentity::declared(&t.fqn, m, policy))
        .collect()
}

fn has_source_extension(
    path: &str,
    extensions: &[String],
) -> bool
{
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            extensions
                .iter()
                .any(|want| {
                    want.trim_start_matches('.')
                        .eq_ignore_ascii_case(e)
                })
        })
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn changed_files_are_trimmed_and_normalized()
    {
        let files = ContextRequest::parse_changed_files(" ./a/A.java , b\\B.java,, ")
            .expect("files");

        assert_eq!(files, vec!["a/A.java", "b/B.java"]);
        assert!(matches!(
            ContextRequest::parse_changed_files(" , "),
            Err(ContextError::NoChangedFiles)
        ));
    }

    #[test]
    fn changed_methods_json()
    {
        let map = ContextRequest::parse_changed_methods(r#"{"./a/A.java": ["run", "stop"]}"#)
            .expect("json");
        assert_eq!(map["a/A.java"], vec!["run", "stop"]);

        assert!(matches!(
            ContextRequest::parse_changed_methods("[1, 2]"),
            Err(ContextError::ChangedMethods(_))
        ));
    }

    #[test]
    fn empty_method_list_means_whole_file()
    {
        let req = ContextRequest {
            changed_methods: Some(IndexMap::from([("a/A.java".to_string(), Vec::new())])),
            ..ContextRequest::default()
        };

        assert!(
            req.methods_for("a/A.java")
                .is_none()
        );
    }

    #[test]
    fn result_uses_camel_case_field_names()
    {
        let result = ContextResult {
            changed_files: vec![ChangedFileContext {
                path: "A.java".into(),
                full_content: "class A {}".into(),
                class_name: Some("A".into()),
                annotations: vec![],
                methods: vec![],
            }],
            related_files: vec![],
            call_chains: vec![],
        };

        let json = serde_json::to_value(&result).expect("json");
        assert_eq!(json["changedFiles"][0]["className"], "A");
        assert_eq!(json["changedFiles"][0]["fullContent"], "class A {}");
        assert!(
            json["relatedFiles"]
                .as_array()
                .is_some()
        );
        assert!(
            json["callChains"]
                .as_array()
                .is_some()
        );
    }

    #[test]
    fn extension_filter_is_case_insensitive()
    {
        let exts = vec!["java".to_string()];

        assert!(has_source_extension("a/B.java", &exts));
        assert!(has_source_extension("a/B.JAVA", &exts));
        assert!(!has_source_extension("a/B.kt", &exts));
        assert!(!has_source_extension("README", &exts));
    }
}
