//! Symbols, scopes, and their resolution at scope close.
//!
//! A [`Symbol`] binds a declaration identity to a [`TypeInfo`]. Once it is
//! declared into a [`SymbolTable`] only shared references are handed out;
//! what its type resolves to changes only through bindings in the session
//! substitution.

use std::collections::BTreeMap;

use eris_ast::{Decl, DeclId, NodeId, Span, Spanned, TypeAnnotation};
use eris_types::{Type, TypeInfo, free_type_vars};

use crate::Session;
use crate::error::{Report, TypeError};

/// Name of the placeholder symbol returned for failed lookups.
pub const UNKNOWN_SYMBOL_NAME: &str = "<NameError>";

/// A declared identifier and its (possibly still open) type.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    decl: Option<DeclId>,
    name: String,
    span: Span,
    info: TypeInfo,
    annotation: Option<Spanned<TypeAnnotation>>,
}

impl Symbol {
    /// Create the symbol for `decl`, carrying over its annotation.
    pub fn bind(decl: &Decl, info: TypeInfo) -> Self {
        Self {
            decl: Some(decl.id),
            name: decl.name.clone(),
            span: decl.span,
            info,
            annotation: decl.annotation.clone(),
        }
    }

    /// The stand-in for an identifier that failed to resolve upstream.
    pub fn unknown() -> Self {
        Self {
            decl: None,
            name: UNKNOWN_SYMBOL_NAME.to_string(),
            span: Span::synthetic(),
            info: TypeInfo::error(),
            annotation: None,
        }
    }

    /// `None` only for the unknown-identifier placeholder.
    pub fn decl(&self) -> Option<DeclId> {
        self.decl
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.info
    }

    pub fn ty(&self) -> &Type {
        &self.info.ty
    }

    pub fn annotation(&self) -> Option<&Spanned<TypeAnnotation>> {
        self.annotation.as_ref()
    }

    pub fn is_unknown(&self) -> bool {
        self.decl.is_none()
    }
}

/// How a symbol's type ended up after its scope closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStatus {
    /// Fully determined and error-free.
    Concrete,
    /// An error was reported; the type contains `<error>`.
    Poisoned,
    /// The type deliberately contains `any`.
    Escaped,
}

/// A symbol whose type has been fully applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSymbol {
    pub decl: DeclId,
    pub name: String,
    pub ty: Type,
    pub value: Option<eris_types::ConstValue>,
    pub status: ResolutionStatus,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    symbols: BTreeMap<DeclId, Symbol>,
    names: BTreeMap<String, DeclId>,
}

impl Scope {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols in declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

/// A stack of scopes. The innermost scope shadows outer ones.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    unknown: Symbol,
}

impl SymbolTable {
    /// A table with one open (root) scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            unknown: Symbol::unknown(),
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop_scope(&mut self) -> Option<Scope> {
        self.scopes.pop()
    }

    /// Publish `symbol` into the innermost scope.
    ///
    /// A later declaration of the same name in the same scope shadows the
    /// earlier one; both stay in the scope.
    ///
    /// # Panics
    ///
    /// Panics when no scope is open, when `symbol` is the unknown
    /// placeholder, or when its declaration was already published.
    pub fn declare(&mut self, symbol: Symbol) -> &Symbol {
        let decl = symbol
            .decl
            .expect("the unknown-identifier placeholder cannot be declared");
        assert!(
            self.get(decl).is_none(),
            "declaration {} is already published",
            NodeId::Decl(decl)
        );
        let scope = self.scopes.last_mut().expect("no open scope");
        scope.names.insert(symbol.name.clone(), decl);
        scope.symbols.entry(decl).or_insert(symbol)
    }

    /// Innermost symbol named `name`.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.names.get(name).and_then(|decl| scope.symbols.get(decl)))
    }

    pub fn get(&self, decl: DeclId) -> Option<&Symbol> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.symbols.get(&decl))
    }

    pub fn unknown(&self) -> &Symbol {
        &self.unknown
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Look `name` up, yielding the `<NameError>` placeholder on failure.
    ///
    /// A failed lookup records `UnknownIdentifier` once, here; the
    /// placeholder's `<error>` type keeps later checks quiet.
    pub fn lookup_or_unknown<'t>(
        &mut self,
        table: &'t SymbolTable,
        name: &str,
        origin: impl Into<NodeId>,
        span: Option<Span>,
    ) -> &'t Symbol {
        match table.lookup(name) {
            Some(symbol) => symbol,
            None => {
                self.report_at(
                    TypeError::UnknownIdentifier {
                        name: name.to_string(),
                    },
                    origin.into(),
                    span,
                );
                table.unknown()
            }
        }
    }

    /// The concrete type of `symbol` under the current substitution.
    ///
    /// Fails with `UnresolvedType` while the type still mentions a free
    /// variable.
    pub fn resolve(&self, symbol: &Symbol) -> Result<Type, TypeError> {
        let ty = self.apply(symbol.ty());
        if free_type_vars(&ty).is_empty() {
            Ok(ty)
        } else {
            Err(TypeError::UnresolvedType {
                name: format!("`{}`", symbol.name()),
                ty,
            })
        }
    }

    /// Close the innermost scope of `table`.
    ///
    /// Annotations are reconciled with inferred types first, so an
    /// annotation can still determine an otherwise open variable. Deferred
    /// trait obligations are then re-checked, and every symbol is resolved.
    ///
    /// # Panics
    ///
    /// Panics when `table` has no open scope.
    pub fn close_scope(&mut self, table: &mut SymbolTable) -> Vec<ResolvedSymbol> {
        let scope = table.pop_scope().expect("no open scope to close");

        let mut poisoned = Vec::new();
        for symbol in scope.symbols() {
            if !self.reconcile_annotation(symbol) {
                poisoned.extend(symbol.decl());
            }
        }

        self.discharge_traits();

        let mut resolved = Vec::with_capacity(scope.len());
        for symbol in scope.symbols() {
            let Some(decl) = symbol.decl() else {
                continue;
            };
            let ty = if poisoned.contains(&decl) {
                Type::Error
            } else {
                match self.resolve(symbol) {
                    Ok(ty) => ty.widened(),
                    Err(err) => {
                        self.report_at(err, NodeId::Decl(decl), Some(symbol.span()));
                        self.poison(symbol.ty());
                        Type::Error
                    }
                }
            };
            let status = resolution_status(&ty);
            let value = match status {
                ResolutionStatus::Poisoned => None,
                _ => symbol.type_info().value.clone(),
            };
            resolved.push(ResolvedSymbol {
                decl,
                name: symbol.name().to_string(),
                ty,
                value,
                status,
            });
        }

        tracing::debug!(
            symbols = resolved.len(),
            depth = table.depth(),
            "scope closed"
        );
        self.resolved.extend(resolved.iter().cloned());
        resolved
    }

    /// Unify a symbol's annotation with its inferred type. Returns `false`
    /// when an error was reported.
    fn reconcile_annotation(&mut self, symbol: &Symbol) -> bool {
        let Some(annotation) = symbol.annotation() else {
            return true;
        };
        let Some(decl) = symbol.decl() else {
            return true;
        };
        let origin = NodeId::Decl(decl);
        let annotated = match self.resolve_annotation(&annotation.node) {
            Ok(ty) => ty,
            Err(err) => {
                self.report_at(err, origin, Some(annotation.span));
                return false;
            }
        };
        match self.unify(&annotated, symbol.ty()) {
            Ok(()) => true,
            Err(err) => {
                let mut report = Report::new(err, origin).at(annotation.span);
                if !symbol.span().is_synthetic() {
                    report = report.with_label(symbol.span(), "declared here");
                }
                self.report(report);
                false
            }
        }
    }
}

fn resolution_status(ty: &Type) -> ResolutionStatus {
    if mentions(ty, &Type::Error) {
        ResolutionStatus::Poisoned
    } else if mentions(ty, &Type::Any) {
        ResolutionStatus::Escaped
    } else {
        ResolutionStatus::Concrete
    }
}

fn mentions(ty: &Type, leaf: &Type) -> bool {
    match ty {
        Type::Func(ft) => ft.args.iter().any(|arg| mentions(arg, leaf)) || mentions(&ft.ret, leaf),
        Type::Const(ct) => mentions(&ct.ty, leaf),
        other => other == leaf,
    }
}
