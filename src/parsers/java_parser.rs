//! Filepath: src/parsers/java_parser.rs
//! ------------------------------------------------------------------
//! Java declaration and call-site extractor built on Tree-sitter 0.25.x.
//!
//! Produces a small tagged model per file:
//!   - package, imports (static / wildcard flags),
//!   - every type declaration (nested types flattened in pre-order,
//!     FQN `pkg.Outer.Inner`),
//!   - per method: annotations, signature as written, parameters,
//!     return type, local variable types and every call expression
//!     in the body (lambdas and anonymous classes included).
//!
//! Notes:
//!   - Constructors are not methods here; their bodies are skipped.
//!   - Generic arguments are erased from every recorded type.
//!   - Call expressions are recorded post-order, so a chained call's
//!     receiver call precedes it.
//!   - A tree containing ERROR or MISSING nodes is a parse failure.
//! ------------------------------------------------------------------

use indexmap::IndexMap;
use tree_sitter::{Language, Node, Parser};

use crate::core::errors::ParseError;
use crate::infra::utils::{NameUtils, TsNodeUtils, TypeTextUtils};

/// One parsed source file.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    /// Repo-relative path with `/` separators.
    pub path: String,
    /// Raw content; `None` when the file exceeds the size cap.
    pub content: Option<String>,
    /// Size of the file in bytes.
    pub size: u64,
    /// Package name, empty for the default package.
    pub package: String,
    pub imports: Vec<Import>,
    /// All declared types, outer before inner.
    pub types: Vec<TypeDecl>,
}

/// An `import` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Dotted path without the trailing `.*`.
    pub path: String,
    pub is_static: bool,
    pub wildcard: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
}

/// A class, interface, enum or record declaration.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub fqn: String,
    pub kind: TypeKind,
    /// Annotation names as written (`Service`, `org.x.Marker`).
    pub annotations: Vec<String>,
    /// Erased supertypes as written, superclass first.
    pub supertypes: Vec<String>,
    /// FQN of the enclosing type for nested declarations.
    pub outer: Option<String>,
    /// Field name -> erased declared type.
    pub fields: IndexMap<String, String>,
    pub methods: Vec<MethodDecl>,
}

/// A formal parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// Erased type; varargs keep their `...` suffix.
    pub ty: String,
}

/// A method declaration (constructors excluded).
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub annotations: Vec<String>,
    /// `ReturnType name(Type1, Type2)` without modifiers, names or throws.
    pub signature: String,
    pub params: Vec<Param>,
    /// Erased return type.
    pub return_type: String,
    /// 1-based line of the declaration (annotations included).
    pub line: usize,
    pub varargs: bool,
    /// Local variable name -> erased type (first declaration wins).
    pub locals: IndexMap<String, String>,
    pub calls: Vec<CallExpr>,
}

impl MethodDecl {
    /// Erased parameter types joined by `,`, used as overload discriminator.
    pub fn param_list(&self) -> String {
        self.params
            .iter()
            .map(|p| p.ty.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Whether a call with `args` arguments could bind to this method.
    pub fn accepts(&self, args: usize) -> bool {
        if self.varargs {
            args + 1 >= self.params.len()
        } else {
            args == self.params.len()
        }
    }
}

/// A method invocation found in a method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallExpr {
    pub name: String,
    pub receiver: Receiver,
    pub args: usize,
    pub line: usize,
}

/// What a call is invoked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// `foo()`
    Implicit,
    /// `this.foo()`
    This,
    /// `super.foo()`
    Super,
    /// `repo.foo()` or `Util.foo()`
    Name(String),
    /// `this.repo.foo()`, `a.b.foo()`, `com.x.Util.foo()`
    Field { target: Box<Receiver>, name: String },
    /// `new Foo().bar()`
    New(String),
    /// `((Foo) x).bar()`
    Cast(String),
    /// `a.b().c()`
    Call(Box<CallExpr>),
    /// Literals, array access, lambdas and anything else.
    Other,
}

impl Receiver {
    /// Render a dotted name for pure name chains (`a.b.C`), if this is one.
    pub fn dotted(&self) -> Option<String> {
        match self {
            Receiver::Name(n) => Some(n.clone()),
            Receiver::Field { target, name } => target.dotted().map(|head| format!("{head}.{name}")),
            _ => None,
        }
    }
}

/// Tree-sitter backed Java extractor.
pub struct JavaParser {
    language: Language,
}

impl Default for JavaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaParser {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_java::LANGUAGE.into(),
        }
    }

    /// Parse `content` (stored under `path`) into the file model.
    pub fn parse(&self, path: &str, content: &str) -> Result<ParsedFile, ParseError> {
        // Parsers are cheap and not Sync; one per call.
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| ParseError::NoTree(path.to_string()))?;
        let root = tree.root_node();

        // Reject recovered trees
        if root.has_error() {
            let line = TsNodeUtils::first_error(root)
                .map(TsNodeUtils::line_1based)
                .unwrap_or(1);
            return Err(ParseError::Syntax {
                path: path.to_string(),
                line,
            });
        }

        let bytes = content.as_bytes();
        let mut file = ParsedFile {
            path: path.to_string(),
            content: Some(content.to_string()),
            size: content.len() as u64,
            ..ParsedFile::default()
        };

        for child in TsNodeUtils::named_children(root) {
            match child.kind() {
                "package_declaration" => {
                    file.package = package_name(child, bytes);
                }
                "import_declaration" => {
                    if let Some(import) = import_of(child, bytes) {
                        file.imports.push(import);
                    }
                }
                kind if is_type_kind(kind) => {
                    let package = file.package.clone();
                    collect_types(child, bytes, &package, None, &mut file.types);
                }
                _ => {}
            }
        }

        Ok(file)
    }
}

fn is_type_kind(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration" | "interface_declaration" | "enum_declaration" | "record_declaration"
    )
}

fn package_name(node: Node, bytes: &[u8]) -> String {
    TsNodeUtils::named_children(node)
        .into_iter()
        .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"))
        .map(|n| TypeTextUtils::erase(TsNodeUtils::text(n, bytes)))
        .unwrap_or_default()
}

fn import_of(node: Node, bytes: &[u8]) -> Option<Import> {
    // `import static a.b.C.*;` -> tokens: import, static, path, ., *, ;
    let mut is_static = false;
    let mut wildcard = false;
    let mut path = None;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "static" => is_static = true,
            "asterisk" => wildcard = true,
            "scoped_identifier" | "identifier" => {
                path = Some(TypeTextUtils::erase(TsNodeUtils::text(child, bytes)));
            }
            _ => {}
        }
    }

    path.map(|path| Import {
        path,
        is_static,
        wildcard,
    })
}

/// Annotation names from a declaration's `modifiers` child.
fn annotations_of(node: Node, bytes: &[u8]) -> Vec<String> {
    let Some(mods) = TsNodeUtils::child_of_kind(node, "modifiers") else {
        return Vec::new();
    };

    TsNodeUtils::named_children(mods)
        .into_iter()
        .filter(|n| matches!(n.kind(), "annotation" | "marker_annotation"))
        .filter_map(|n| TsNodeUtils::field_text(n, "name", bytes))
        .map(TypeTextUtils::erase)
        .collect()
}

/// Erased type names listed under superclass / implements / extends clauses.
fn supertypes_of(node: Node, bytes: &[u8]) -> Vec<String> {
    let mut out = Vec::new();

    for clause in TsNodeUtils::named_children(node) {
        if !matches!(
            clause.kind(),
            "superclass" | "super_interfaces" | "extends_interfaces"
        ) {
            continue;
        }

        for item in TsNodeUtils::named_children(clause) {
            // Interfaces come wrapped in a type_list
            if item.kind() == "type_list" {
                out.extend(
                    TsNodeUtils::named_children(item)
                        .into_iter()
                        .map(|t| TypeTextUtils::erase(TsNodeUtils::text(t, bytes))),
                );
            } else {
                out.push(TypeTextUtils::erase(TsNodeUtils::text(item, bytes)));
            }
        }
    }

    out
}

/// Walk a type declaration, push it, then descend into member types.
fn collect_types(
    node: Node,
    bytes: &[u8],
    package: &str,
    outer: Option<&str>,
    out: &mut Vec<TypeDecl>,
) {
    let Some(name) = TsNodeUtils::field_text(node, "name", bytes) else {
        return;
    };

    let fqn = match outer {
        Some(o) => NameUtils::join(&[o, name], '.'),
        None => NameUtils::join(&[package, name], '.'),
    };

    let kind = match node.kind() {
        "interface_declaration" => TypeKind::Interface,
        "enum_declaration" => TypeKind::Enum,
        "record_declaration" => TypeKind::Record,
        _ => TypeKind::Class,
    };

    let mut decl = TypeDecl {
        name: name.to_string(),
        fqn: fqn.clone(),
        kind,
        annotations: annotations_of(node, bytes),
        supertypes: supertypes_of(node, bytes),
        outer: outer.map(str::to_string),
        fields: IndexMap::new(),
        methods: Vec::new(),
    };

    // Record components behave like fields for receiver lookup
    if kind == TypeKind::Record
        && let Some(params) = node.child_by_field_name("parameters")
    {
        for p in TsNodeUtils::named_children(params) {
            if let (Some(n), Some(t)) = (
                TsNodeUtils::field_text(p, "name", bytes),
                TsNodeUtils::field_text(p, "type", bytes),
            ) {
                decl.fields
                    .entry(n.to_string())
                    .or_insert_with(|| TypeTextUtils::erase(t));
            }
        }
    }

    let members = node
        .child_by_field_name("body")
        .map(member_nodes)
        .unwrap_or_default();

    // Push first so the outer type precedes its nested types
    let mut nested = Vec::new();

    for member in members {
        match member.kind() {
            "method_declaration" => decl.methods.push(method_of(member, bytes)),
            "field_declaration" | "constant_declaration" => {
                let Some(ty) = TsNodeUtils::field_text(member, "type", bytes) else {
                    continue;
                };
                let ty = TypeTextUtils::erase(ty);

                let mut cursor = member.walk();
                for d in member.children_by_field_name("declarator", &mut cursor) {
                    if let Some(n) = TsNodeUtils::field_text(d, "name", bytes) {
                        decl.fields
                            .entry(n.to_string())
                            .or_insert_with(|| ty.clone());
                    }
                }
            }
            kind if is_type_kind(kind) => nested.push(member),
            _ => {}
        }
    }

    out.push(decl);
    for n in nested {
        collect_types(n, bytes, package, Some(&fqn), out);
    }
}

/// Members of a class/interface/enum body (enum declarations unwrapped).
fn member_nodes(body: Node) -> Vec<Node> {
    let mut out = Vec::new();

    for child in TsNodeUtils::named_children(body) {
        if child.kind() == "enum_body_declarations" {
            out.extend(TsNodeUtils::named_children(child));
        } else {
            out.push(child);
        }
    }

    out
}

fn method_of(node: Node, bytes: &[u8]) -> MethodDecl {
    let name = TsNodeUtils::field_text(node, "name", bytes)
        .unwrap_or_default()
        .to_string();

    let raw_ret = TsNodeUtils::field_text(node, "type", bytes).unwrap_or("void");
    let mut params = Vec::new();
    let mut written = Vec::new();
    let mut varargs = false;

    if let Some(list) = node.child_by_field_name("parameters") {
        for p in TsNodeUtils::named_children(list) {
            match p.kind() {
                "formal_parameter" => {
                    let ty = TsNodeUtils::field_text(p, "type", bytes).unwrap_or_default();
                    let pname = TsNodeUtils::field_text(p, "name", bytes).unwrap_or_default();
                    written.push(TypeTextUtils::squash_ws(ty));
                    params.push(Param {
                        name: pname.to_string(),
                        ty: TypeTextUtils::erase(ty),
                    });
                }
                "spread_parameter" => {
                    // `String... names`: type node, then variable_declarator
                    varargs = true;
                    let kids = TsNodeUtils::named_children(p);
                    let ty = kids
                        .iter()
                        .find(|k| !matches!(k.kind(), "modifiers" | "variable_declarator"))
                        .map(|k| TsNodeUtils::text(*k, bytes))
                        .unwrap_or_default();
                    let pname = kids
                        .iter()
                        .find(|k| k.kind() == "variable_declarator")
                        .and_then(|d| TsNodeUtils::field_text(*d, "name", bytes))
                        .unwrap_or_default();
                    written.push(format!("{}...", TypeTextUtils::squash_ws(ty)));
                    params.push(Param {
                        name: pname.to_string(),
                        ty: format!("{}...", TypeTextUtils::erase(ty)),
                    });
                }
                _ => {}
            }
        }
    }

    let signature = format!(
        "{} {}({})",
        TypeTextUtils::squash_ws(raw_ret),
        name,
        written.join(", ")
    );

    let mut method = MethodDecl {
        name,
        annotations: annotations_of(node, bytes),
        signature,
        params,
        return_type: TypeTextUtils::erase(raw_ret),
        line: TsNodeUtils::line_1based(node),
        varargs,
        locals: IndexMap::new(),
        calls: Vec::new(),
    };

    if let Some(body) = node.child_by_field_name("body") {
        walk_body(body, bytes, &mut method);
    }

    method
}

/// Post-order walk collecting locals and call expressions.
fn walk_body(node: Node, bytes: &[u8], method: &mut MethodDecl) {
    for child in TsNodeUtils::named_children(node) {
        walk_body(child, bytes, method);
    }

    match node.kind() {
        "method_invocation" => {
            if let Some(call) = call_of(node, bytes) {
                method.calls.push(call);
            }
        }
        "local_variable_declaration" => {
            let Some(ty) = TsNodeUtils::field_text(node, "type", bytes) else {
                return;
            };

            let mut cursor = node.walk();
            for d in node.children_by_field_name("declarator", &mut cursor) {
                let Some(n) = TsNodeUtils::field_text(d, "name", bytes) else {
                    continue;
                };

                let resolved = if ty == "var" {
                    d.child_by_field_name("value")
                        .and_then(|v| inferred_type(v, bytes))
                } else {
                    Some(TypeTextUtils::erase(ty))
                };

                if let Some(t) = resolved {
                    method.locals.entry(n.to_string()).or_insert(t);
                }
            }
        }
        "enhanced_for_statement" | "resource" | "formal_parameter" => {
            if let (Some(n), Some(t)) = (
                TsNodeUtils::field_text(node, "name", bytes),
                TsNodeUtils::field_text(node, "type", bytes),
            ) && t != "var"
            {
                method
                    .locals
                    .entry(n.to_string())
                    .or_insert_with(|| TypeTextUtils::erase(t));
            }
        }
        "catch_formal_parameter" => {
            // Only single-type catches give a usable receiver type
            let types = TsNodeUtils::child_of_kind(node, "catch_type")
                .map(TsNodeUtils::named_children)
                .unwrap_or_default();
            if let ([only], Some(n)) = (
                types.as_slice(),
                TsNodeUtils::field_text(node, "name", bytes),
            ) {
                method
                    .locals
                    .entry(n.to_string())
                    .or_insert_with(|| TypeTextUtils::erase(TsNodeUtils::text(*only, bytes)));
            }
        }
        _ => {}
    }
}

/// Type of a `var` initializer when it is syntactically obvious.
fn inferred_type(value: Node, bytes: &[u8]) -> Option<String> {
    match value.kind() {
        "object_creation_expression" | "cast_expression" => {
            TsNodeUtils::field_text(value, "type", bytes).map(TypeTextUtils::erase)
        }
        _ => None,
    }
}

fn call_of(node: Node, bytes: &[u8]) -> Option<CallExpr> {
    let name = TsNodeUtils::field_text(node, "name", bytes)?.to_string();

    let receiver = match node.child_by_field_name("object") {
        Some(object) => receiver_of(object, bytes),
        None => Receiver::Implicit,
    };

    let args = node
        .child_by_field_name("arguments")
        .map(|a| TsNodeUtils::named_children(a).len())
        .unwrap_or(0);

    Some(CallExpr {
        name,
        receiver,
        args,
        line: TsNodeUtils::line_1based(node),
    })
}

fn receiver_of(node: Node, bytes: &[u8]) -> Receiver {
    match node.kind() {
        "this" => Receiver::This,
        "super" => Receiver::Super,
        "identifier" => Receiver::Name(TsNodeUtils::text(node, bytes).to_string()),
        "field_access" => {
            let (Some(object), Some(field)) = (
                node.child_by_field_name("object"),
                TsNodeUtils::field_text(node, "field", bytes),
            ) else {
                return Receiver::Other;
            };
            Receiver::Field {
                target: Box::new(receiver_of(object, bytes)),
                name: field.to_string(),
            }
        }
        "object_creation_expression" => TsNodeUtils::field_text(node, "type", bytes)
            .map(|t| Receiver::New(TypeTextUtils::erase(t)))
            .unwrap_or(Receiver::Other),
        "cast_expression" => TsNodeUtils::field_text(node, "type", bytes)
            .map(|t| Receiver::Cast(TypeTextUtils::erase(t)))
            .unwrap_or(Receiver::Other),
        "parenthesized_expression" => TsNodeUtils::named_children(node)
            .first()
            .map(|inner| receiver_of(*inner, bytes))
            .unwrap_or(Receiver::Other),
        "method_invocation" => call_of(node, bytes)
            .map(|c| Receiver::Call(Box::new(c)))
            .unwrap_or(Receiver::Other),
        _ => Receiver::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> ParsedFile {
        JavaParser::new()
            .parse("src/main/java/T.java", src)
            .expect("parse")
    }

    #[test]
    fn package_imports_and_types() {
        let f = parse(
            r#"
package com.shop.order;

import java.util.List;
import com.shop.repo.*;
import static com.shop.util.Strings.trim;

@Service
@Transactional(readOnly = true)
public class OrderService extends BaseService implements Auditable, Cloneable {
    private final OrderRepository repo;
    private List<Order> cache, spare;

    static class Helper {
        void help() {}
    }
}
"#,
        );

        assert_eq!(f.package, "com.shop.order");
        assert_eq!(f.imports.len(), 3);
        assert!(f.imports[1].wildcard);
        assert_eq!(f.imports[1].path, "com.shop.repo");
        assert!(f.imports[2].is_static);
        assert_eq!(f.imports[2].path, "com.shop.util.Strings.trim");

        assert_eq!(f.types.len(), 2);
        let svc = &f.types[0];
        assert_eq!(svc.fqn, "com.shop.order.OrderService");
        assert_eq!(svc.annotations, vec!["Service", "Transactional"]);
        assert_eq!(svc.supertypes, vec!["BaseService", "Auditable", "Cloneable"]);
        assert_eq!(svc.fields.get("repo").map(String::as_str), Some("OrderRepository"));
        assert_eq!(svc.fields.get("spare").map(String::as_str), Some("List"));

        let helper = &f.types[1];
        assert_eq!(helper.fqn, "com.shop.order.OrderService.Helper");
        assert_eq!(helper.outer.as_deref(), Some("com.shop.order.OrderService"));
    }

    #[test]
    fn method_signature_and_params() {
        let f = parse(
            r#"
class A {
    @Override
    public List<Order> find(String id, Map<String, Integer> opts, int... more) throws Exception {
        return null;
    }
    A() { helper(); }
}
"#,
        );

        let methods = &f.types[0].methods;
        assert_eq!(methods.len(), 1, "constructors are not methods");

        let m = &methods[0];
        assert_eq!(m.name, "find");
        assert_eq!(m.annotations, vec!["Override"]);
        assert_eq!(
            m.signature,
            "List<Order> find(String, Map<String, Integer>, int...)"
        );
        assert_eq!(m.return_type, "List");
        assert!(m.varargs);
        assert_eq!(m.param_list(), "String,Map,int...");
        assert!(m.accepts(2));
        assert!(m.accepts(5));
        assert!(!m.accepts(1));
        assert_eq!(m.line, 3);
    }

    #[test]
    fn calls_and_receivers() {
        let f = parse(
            r#"
class A {
    void run(Repo repo) {
        var svc = new Service();
        Helper h = make();
        repo.findById(1L);
        this.repo.save(x, y);
        super.close();
        new Builder().build();
        ((Repo) o).count();
        repo.all().stream();
        com.x.Util.now();
        Runnable r = () -> later();
    }
}
"#,
        );

        let m = &f.types[0].methods[0];
        assert_eq!(m.locals.get("svc").map(String::as_str), Some("Service"));
        assert_eq!(m.locals.get("h").map(String::as_str), Some("Helper"));

        let by_name = |n: &str| {
            m.calls
                .iter()
                .find(|c| c.name == n)
                .unwrap_or_else(|| panic!("missing call {n}"))
        };

        assert_eq!(by_name("make").receiver, Receiver::Implicit);
        assert_eq!(by_name("findById").receiver, Receiver::Name("repo".into()));
        assert_eq!(by_name("findById").args, 1);
        assert_eq!(
            by_name("save").receiver,
            Receiver::Field {
                target: Box::new(Receiver::This),
                name: "repo".into()
            }
        );
        assert_eq!(by_name("save").args, 2);
        assert_eq!(by_name("close").receiver, Receiver::Super);
        assert_eq!(by_name("build").receiver, Receiver::New("Builder".into()));
        assert_eq!(by_name("count").receiver, Receiver::Cast("Repo".into()));
        assert!(matches!(by_name("stream").receiver, Receiver::Call(ref c) if c.name == "all"));
        assert_eq!(
            by_name("now").receiver.dotted().as_deref(),
            Some("com.x.Util")
        );
        assert_eq!(by_name("later").receiver, Receiver::Implicit);

        // Post-order: the inner call of a chain comes first
        let all = m.calls.iter().position(|c| c.name == "all");
        let stream = m.calls.iter().position(|c| c.name == "stream");
        assert!(all < stream);
    }

    #[test]
    fn enum_and_interface_members() {
        let f = parse(
            r#"
package p;
interface Shape extends Named { double area(); }
enum Color { RED, GREEN; String label() { return name(); } }
record Point(int x, Origin origin) { int sum() { return origin.base(); } }
"#,
        );

        assert_eq!(f.types.len(), 3);
        assert_eq!(f.types[0].kind, TypeKind::Interface);
        assert_eq!(f.types[0].supertypes, vec!["Named"]);
        assert_eq!(f.types[0].methods[0].name, "area");
        assert_eq!(f.types[1].kind, TypeKind::Enum);
        assert_eq!(f.types[1].methods[0].name, "label");
        assert_eq!(f.types[2].kind, TypeKind::Record);
        assert_eq!(
            f.types[2].fields.get("origin").map(String::as_str),
            Some("Origin")
        );
    }

    #[test]
    fn syntax_error_is_reported() {
        let err = JavaParser::new()
            .parse("Broken.java", "class Broken {\n  void m( {\n}\n")
            .unwrap_err();

        assert!(matches!(err, ParseError::Syntax { .. }));
    }
}
