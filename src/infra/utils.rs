//! Filepath: src/infra/utils.rs
//! Utility helpers organized by small, focused structs.
//! All functions are associated fns to keep call sites
//! ergonomic and testable.

// Tree-sitter types for node helpers
use tree_sitter::Node;

/// Qualified-name helpers
pub struct NameUtils;

impl NameUtils
{
    /// Join name parts with the given separator into a String
    pub fn join(
        parts: &[&str],
        sep: char,
    ) -> String
    {
        // Pre-allocate with a simple heuristic
        let mut out = String::with_capacity(
            parts
                .iter()
                .map(|p| p.len() + 1)
                .sum(),
        );

        // Push non-empty parts with separator
        for p in parts
            .iter()
            .filter(|p| !p.is_empty())
        {
            if !out.is_empty()
            {
                out.push(sep);
            }

            out.push_str(p);
        }

        // Return the constructed string
        out
    }

    /// Last dotted segment of a qualified name (`a.b.Foo` -> `Foo`)
    pub fn simple_name(qualified: &str) -> &str
    {
        qualified
            .rsplit('.')
            .next()
            .unwrap_or(qualified)
    }

    /// Normalize a user-supplied relative path: trim, forward slashes,
    /// no leading `./`
    pub fn normalize_rel_path(raw: &str) -> String
    {
        // Trim and unify separators
        let unified = raw
            .trim()
            .replace('\\', "/");

        // Drop any number of leading "./"
        let mut s = unified.as_str();
        while let Some(rest) = s.strip_prefix("./")
        {
            s = rest;
        }

        s.to_string()
    }
}

/// Java type-text helpers
pub struct TypeTextUtils;

impl TypeTextUtils
{
    /// Collapse runs of whitespace into a single space
    pub fn squash_ws(text: &str) -> String
    {
        text.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Remove generic arguments and whitespace: `Map<K, List<V>>` -> `Map`,
    /// `Foo<T>[]` -> `Foo[]`
    pub fn erase(text: &str) -> String
    {
        let mut out = String::with_capacity(text.len());
        let mut depth = 0usize;

        for c in text.chars()
        {
            match c
            {
                '<' => depth += 1,
                '>' => depth = depth.saturating_sub(1),
                c if depth == 0 && !c.is_whitespace() => out.push(c),
                _ =>
                {}
            }
        }

        out
    }

    /// True for array and varargs types which never own methods
    pub fn is_array(erased: &str) -> bool
    {
        erased.ends_with("[]") || erased.ends_with("...")
    }
}

/// Common Tree-sitter node helpers
pub struct TsNodeUtils;

impl TsNodeUtils
{
    /// Extract text of a child field if present
    pub fn field_text<'a>(
        node: Node,
        field: &str,
        bytes: &'a [u8],
    ) -> Option<&'a str>
    {
        // Locate the child by field name
        let child = node.child_by_field_name(field)?;

        // Convert to utf8 text
        child
            .utf8_text(bytes)
            .ok()
    }

    /// Node text, empty on invalid UTF-8
    pub fn text<'a>(
        node: Node,
        bytes: &'a [u8],
    ) -> &'a str
    {
        node.utf8_text(bytes)
            .unwrap_or_default()
    }

    /// Named children, skipping comments and other extras
    pub fn named_children(node: Node) -> Vec<Node>
    {
        let mut cursor = node.walk();

        node.named_children(&mut cursor)
            .filter(|n| !n.is_extra())
            .collect()
    }

    /// First named child of the given kind
    pub fn child_of_kind<'a>(
        node: Node<'a>,
        kind: &str,
    ) -> Option<Node<'a>>
    {
        Self::named_children(node)
            .into_iter()
            .find(|n| n.kind() == kind)
    }

    /// Locate the first ERROR or MISSING node in document order
    pub fn first_error(node: Node) -> Option<Node>
    {
        // This node itself is the problem
        if node.is_error() || node.is_missing()
        {
            return Some(node);
        }

        // Descend only into subtrees flagged as erroneous
        let mut cursor = node.walk();
        let children: Vec<Node> = node
            .children(&mut cursor)
            .collect();

        children
            .into_iter()
            .filter(|c| c.has_error() || c.is_missing())
            .find_map(Self::first_error)
    }

    /// Convert a node start position to a 1-based line number
    pub fn line_1based(node: Node) -> usize
    {
        node.start_position()
            .row
            + 1
    }
}
