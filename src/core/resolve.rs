//! Call-site resolution: map a `CallExpr` inside a method body to the
//! declared method(s) it invokes, using only what the source index knows.
//!
//! Receiver typing covers locals, parameters, fields (inherited and from
//! enclosing types), `this`, `super`, static type references, constructor
//! expressions, casts and chained call return types. Anything that leaves
//! the project (JDK, libraries) or is ambiguous resolves to `None`.

use std::collections::{HashSet, VecDeque};
use std::path::Path;

use tracing::debug;

use crate::core::callgraph::MethodIdentity;
use crate::core::index::SourceIndex;
use crate::infra::config::{Config, OverloadPolicy};
use crate::infra::utils::{NameUtils, TypeTextUtils};
use crate::parsers::java_parser::{CallExpr, MethodDecl, ParsedFile, Receiver, TypeDecl};

/// Where a call expression sits.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a>
{
    pub file: &'a ParsedFile,
    pub ty: &'a TypeDecl,
    pub method: &'a MethodDecl,
}

/// Resolution outcome for one call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target
{
    /// A single method
    Exact(MethodIdentity),

    /// Several overloads remain plausible
    Ambiguous(Vec<MethodIdentity>),
}

impl Target
{
    pub fn into_identities(self) -> Vec<MethodIdentity>
    {
        match self
        {
            Target::Exact(id) => vec![id],
            Target::Ambiguous(ids) => ids,
        }
    }
}

/// Resolves call sites against a source index
pub trait SymbolResolver
{
    fn resolve(
        &self,
        index: &SourceIndex,
        scope: &Scope<'_>,
        call: &CallExpr,
    ) -> Option<Target>;
}

/// Resolver handle; unavailable resolvers resolve nothing
#[derive(Debug, Clone)]
pub enum Resolver
{
    Available(JavaResolver),
    Unavailable(String),
}

impl Resolver
{
    /// Set up the resolver for `root`. Never fails: a missing source root
    /// yields `Unavailable` with the reason.
    pub fn init(
        root: &Path,
        config: &Config,
    ) -> Self
    {
        let source_root = root.join(&config.source_root);

        if source_root.is_dir()
        {
            Resolver::Available(JavaResolver::new(config.overloads))
        }
        else
        {
            Resolver::Unavailable(format!(
                "source root {} does not exist",
                source_root.display()
            ))
        }
    }

    pub fn is_available(&self) -> bool
    {
        matches!(self, Resolver::Available(_))
    }

    /// Reason the resolver is unavailable, if it is
    pub fn unavailable_reason(&self) -> Option<&str>
    {
        match self
        {
            Resolver::Available(_) => None,
            Resolver::Unavailable(reason) => Some(reason),
        }
    }
}

impl SymbolResolver for Resolver
{
    fn resolve(
        &self,
        index: &SourceIndex,
        scope: &Scope<'_>,
        call: &CallExpr,
    ) -> Option<Target>
    {
        match self
        {
            Resolver::Available(r) => r.resolve(index, scope, call),
            Resolver::Unavailable(_) => None,
        }
    }
}

/// Source-only Java resolver
#[derive(Debug, Clone, Copy)]
pub struct JavaResolver
{
    policy: OverloadPolicy,
}

/// Candidate declarations found for a call name
type Candidates<'a> = Vec<(&'a str, &'a MethodDecl)>;

impl JavaResolver
{
    pub fn new(policy: OverloadPolicy) -> Self
    {
        Self { policy }
    }

    pub fn policy(&self) -> OverloadPolicy
    {
        self.policy
    }

    /// Declarations the call can bind to, all from one declaring type
    fn candidates<'a>(
        &self,
        index: &'a SourceIndex,
        scope: &Scope<'a>,
        call: &CallExpr,
    ) -> Candidates<'a>
    {
        match &call.receiver
        {
            Receiver::Implicit =>
            {
                // Enclosing types innermost first
                for owner in enclosing_chain(index, scope.ty)
                {
                    let found = find_methods(index, owner, &call.name);
                    if !found.is_empty()
                    {
                        return found;
                    }
                }

                static_import_methods(index, scope.file, &call.name)
            }
            Receiver::This => find_methods(index, &scope.ty.fqn, &call.name),
            Receiver::Super =>
            {
                for sup in resolved_supertypes(index, scope.file, scope.ty)
                {
                    let found = find_methods(index, sup, &call.name);
                    if !found.is_empty()
                    {
                        return found;
                    }
                }
                Vec::new()
            }
            other => self
                .receiver_type(index, scope, other)
                .map(|owner| find_methods(index, owner, &call.name))
                .unwrap_or_default(),
        }
    }

    /// FQN of the type an expression evaluates to, when it is a project type
    fn receiver_type<'a>(
        &self,
        index: &'a SourceIndex,
        scope: &Scope<'a>,
        receiver: &Receiver,
    ) -> Option<&'a str>
    {
        match receiver
        {
            Receiver::This => index
                .type_decl(&scope.ty.fqn)
                .map(|t| t.fqn.as_str()),
            Receiver::Super => resolved_supertypes(index, scope.file, scope.ty)
                .into_iter()
                .next(),
            Receiver::Name(name) => match self.variable_type(index, scope, name)
            {
                Some(declared) => declared,
                None => resolve_type_name(index, scope.file, Some(scope.ty), name),
            },
            // `Outer.this`
            Receiver::Field { target, name } if name == "this" =>
            {
                self.receiver_type(index, scope, target)
            }
            Receiver::Field { target, name } => self
                .receiver_type(index, scope, target)
                .and_then(|owner| member_type(index, owner, name))
                .or_else(|| {
                    let dotted = receiver.dotted()?;
                    resolve_type_name(index, scope.file, Some(scope.ty), &dotted)
                }),
            Receiver::New(ty) | Receiver::Cast(ty) =>
            {
                resolve_type_name(index, scope.file, Some(scope.ty), ty)
            }
            Receiver::Call(inner) =>
            {
                // Return type of the inner call, read where it is declared
                let (owner, decl) = self
                    .candidates(index, scope, inner)
                    .into_iter()
                    .next()?;
                let file = index.file_of_type(owner)?;
                let ty = index.type_decl(owner)?;
                resolve_type_name(index, file, Some(ty), &decl.return_type)
            }
            Receiver::Implicit | Receiver::Other => None,
        }
    }

    /// Type of a local, parameter or field named `name`. The outer `None`
    /// means no such variable; the inner one an external type.
    fn variable_type<'a>(
        &self,
        index: &'a SourceIndex,
        scope: &Scope<'a>,
        name: &str,
    ) -> Option<Option<&'a str>>
    {
        let declared = scope
            .method
            .params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.ty.as_str())
            .or_else(|| {
                scope
                    .method
                    .locals
                    .get(name)
                    .map(String::as_str)
            });

        // Locals shadow fields, even when their type is external
        if let Some(ty) = declared
        {
            return Some(resolve_type_name(index, scope.file, Some(scope.ty), ty));
        }

        enclosing_chain(index, scope.ty)
            .into_iter()
            .find_map(|owner| field_type(index, owner, name))
    }

    /// Turn candidates into a target under the overload policy
    fn target(
        &self,
        candidates: Candidates<'_>,
        args: usize,
    ) -> Option<Target>
    {
        let (owner, first) = *candidates.first()?;

        match self.policy
        {
            OverloadPolicy::Merge => Some(Target::Exact(MethodIdentity::new(owner, &first.name))),
            OverloadPolicy::Distinguish =>
            {
                let fitting: Vec<_> = candidates
                    .iter()
                    .filter(|(_, m)| m.accepts(args))
                    .collect();

                let pool: Vec<MethodIdentity> = if fitting.is_empty()
                {
                    candidates
                        .iter()
                        .map(|(o, m)| MethodIdentity::declared(o, m, self.policy))
                        .collect()
                }
                else
                {
                    fitting
                        .iter()
                        .map(|(o, m)| MethodIdentity::declared(o, m, self.policy))
                        .collect()
                };

                match pool.len()
                {
                    1 => pool
                        .into_iter()
                        .next()
                        .map(Target::Exact),
                    _ => Some(Target::Ambiguous(pool)),
                }
            }
        }
    }
}

impl SymbolResolver for JavaResolver
{
    fn resolve(
        &self,
        index: &SourceIndex,
        scope: &Scope<'_>,
        call: &CallExpr,
    ) -> Option<Target>
    {
        let candidates = self.candidates(index, scope, call);

        self.target(candidates, call.args)
    }
}

/// `ty` followed by its enclosing types, as indexed FQNs
fn enclosing_chain<'a>(
    index: &'a SourceIndex,
    ty: &TypeDecl,
) -> Vec<&'a str>
{
    let mut out = Vec::new();
    let mut current = index.type_decl(&ty.fqn);

    while let Some(t) = current
    {
        out.push(t.fqn.as_str());
        current = t
            .outer
            .as_deref()
            .and_then(|o| index.type_decl(o));
    }

    out
}

/// Supertypes of `ty` that live in the project, in declaration order
fn resolved_supertypes<'a>(
    index: &'a SourceIndex,
    file: &ParsedFile,
    ty: &TypeDecl,
) -> Vec<&'a str>
{
    ty.supertypes
        .iter()
        .filter_map(|s| resolve_type_name(index, file, Some(ty), s))
        .collect()
}

/// Methods named `name` on the first type along `owner`'s supertype
/// hierarchy (breadth-first) that declares any.
fn find_methods<'a>(
    index: &'a SourceIndex,
    owner: &str,
    name: &str,
) -> Candidates<'a>
{
    let mut queue: VecDeque<&str> = VecDeque::new();
    let mut seen: HashSet<&str> = HashSet::new();

    let Some(start) = index.type_decl(owner)
    else
    {
        return Vec::new();
    };
    queue.push_back(start.fqn.as_str());

    while let Some(fqn) = queue.pop_front()
    {
        if !seen.insert(fqn)
        {
            continue;
        }

        let (Some(ty), Some(file)) = (index.type_decl(fqn), index.file_of_type(fqn))
        else
        {
            continue;
        };

        let hits: Candidates<'a> = ty
            .methods
            .iter()
            .filter(|m| m.name == name)
            .map(|m| (ty.fqn.as_str(), m))
            .collect();

        if !hits.is_empty()
        {
            return hits;
        }

        queue.extend(resolved_supertypes(index, file, ty));
    }

    Vec::new()
}

/// Declared type of field `name` visible in `owner` (inherited included).
/// The outer `None` means no such field.
fn field_type<'a>(
    index: &'a SourceIndex,
    owner: &str,
    name: &str,
) -> Option<Option<&'a str>>
{
    let mut queue: VecDeque<&str> = VecDeque::new();
    let mut seen: HashSet<&str> = HashSet::new();
    queue.push_back(
        index
            .type_decl(owner)?
            .fqn
            .as_str(),
    );

    while let Some(fqn) = queue.pop_front()
    {
        if !seen.insert(fqn)
        {
            continue;
        }

        let (Some(ty), Some(file)) = (index.type_decl(fqn), index.file_of_type(fqn))
        else
        {
            continue;
        };

        if let Some(declared) = ty
            .fields
            .get(name)
        {
            // Field found; an external type ends the search
            return Some(resolve_type_name(index, file, Some(ty), declared));
        }

        queue.extend(resolved_supertypes(index, file, ty));
    }

    None
}

/// `owner.name` as a field type or as a nested type
fn member_type<'a>(
    index: &'a SourceIndex,
    owner: &str,
    name: &str,
) -> Option<&'a str>
{
    match field_type(index, owner, name)
    {
        Some(declared) => declared,
        None => index
            .type_decl(&format!("{owner}.{name}"))
            .map(|t| t.fqn.as_str()),
    }
}

/// Methods brought in by `import static a.B.name` or `import static a.B.*`
fn static_import_methods<'a>(
    index: &'a SourceIndex,
    file: &ParsedFile,
    name: &str,
) -> Candidates<'a>
{
    for import in file
        .imports
        .iter()
        .filter(|i| i.is_static)
    {
        let owner = if import.wildcard
        {
            Some(import.path.as_str())
        }
        else
        {
            match import
                .path
                .rsplit_once('.')
            {
                Some((owner, member)) if member == name => Some(owner),
                _ => None,
            }
        };

        if let Some(owner) = owner
        {
            let found = find_methods(index, owner, name);
            if !found.is_empty()
            {
                return found;
            }
        }
    }

    Vec::new()
}

/// Resolve a type name as written in `file` (inside `ctx`) to an indexed FQN.
///
/// Order: enclosing and nested types, explicit imports, same package,
/// wildcard imports, then fully-qualified names. Arrays, external types
/// and ambiguous wildcard matches give `None`.
pub fn resolve_type_name<'a>(
    index: &'a SourceIndex,
    file: &ParsedFile,
    ctx: Option<&TypeDecl>,
    written: &str,
) -> Option<&'a str>
{
    let name = TypeTextUtils::erase(written);

    if name.is_empty() || TypeTextUtils::is_array(&name)
    {
        return None;
    }

    match name.split_once('.')
    {
        None => resolve_simple(index, file, ctx, &name),
        Some((head, rest)) =>
        {
            // Qualified by an outer type first, then as a full FQN
            resolve_simple(index, file, ctx, head)
                .and_then(|h| {
                    index
                        .type_decl(&format!("{h}.{rest}"))
                        .map(|t| t.fqn.as_str())
                })
                .or_else(|| {
                    index
                        .type_decl(&name)
                        .map(|t| t.fqn.as_str())
                })
        }
    }
}

fn resolve_simple<'a>(
    index: &'a SourceIndex,
    file: &ParsedFile,
    ctx: Option<&TypeDecl>,
    name: &str,
) -> Option<&'a str>
{
    let lookup = |fqn: &str| {
        index
            .type_decl(fqn)
            .map(|t| t.fqn.as_str())
    };

    // The type itself, its member types and those of enclosing types
    if let Some(ctx) = ctx
    {
        for owner in enclosing_chain(index, ctx)
        {
            if NameUtils::simple_name(owner) == name
            {
                return Some(owner);
            }

            if let Some(hit) = lookup(&format!("{owner}.{name}"))
            {
                return Some(hit);
            }
        }
    }

    // Single-type imports shadow everything below, even external ones
    if let Some(import) = file
        .imports
        .iter()
        .find(|i| !i.is_static && !i.wildcard && NameUtils::simple_name(&i.path) == name)
    {
        return lookup(&import.path);
    }

    // Same package
    if let Some(hit) = lookup(&NameUtils::join(&[&file.package, name], '.'))
    {
        return Some(hit);
    }

    // On-demand imports; more than one match is ambiguous
    let wildcard: Vec<&str> = index
        .types_named(name)
        .iter()
        .map(String::as_str)
        .filter(|fqn| {
            let package = fqn
                .strip_suffix(name)
                .and_then(|head| head.strip_suffix('.'));

            file.imports
                .iter()
                .any(|i| !i.is_static && i.wildcard && package == Some(i.path.as_str()))
        })
        .collect();

    match wildcard.as_slice()
    {
        [only] => Some(*only),
        [] => None,
        _ =>
        {
            debug!(name, candidates = ?wildcard, "ambiguous on-demand import");
            None
        }
    }
}
