//! Parser-boundary handles for the Eris type checker.
//!
//! The parser owns the syntax tree. The type checker only sees the pieces
//! defined here: identity tokens for declarations and expressions, source
//! spans, and syntax-level type annotations that still need resolving.

use std::fmt;

/// Identifies a source file in the compilation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A byte offset range within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// A synthetic span for checker-generated nodes.
    pub fn synthetic() -> Self {
        Self {
            file: FileId(u32::MAX),
            start: 0,
            end: 0,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.file == FileId(u32::MAX)
    }
}

/// A value paired with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// Opaque identity of a declaration, handed out by [`DeclTable`].
///
/// Compared by identity, never by name: two shadowing `let x` bindings get
/// two different `DeclId`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

/// Opaque identity of an expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

/// The node a diagnostic is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Decl(DeclId),
    Expr(ExprId),
}

impl From<DeclId> for NodeId {
    fn from(id: DeclId) -> Self {
        NodeId::Decl(id)
    }
}

impl From<ExprId> for NodeId {
    fn from(id: ExprId) -> Self {
        NodeId::Expr(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Decl(id) => write!(f, "decl#{}", id.0),
            NodeId::Expr(id) => write!(f, "expr#{}", id.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Type annotations
// ---------------------------------------------------------------------------

/// A user-written type annotation, not yet resolved to a semantic type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnnotation {
    /// A named type such as `num` or `str`.
    Named(String),
    /// `(a, b) -> r`.
    Function(Vec<TypeAnnotation>, Box<TypeAnnotation>),
    /// `_`: leave this position to inference.
    Hole,
}

impl TypeAnnotation {
    pub fn named(name: impl Into<String>) -> Self {
        TypeAnnotation::Named(name.into())
    }

    pub fn function(params: Vec<TypeAnnotation>, ret: TypeAnnotation) -> Self {
        TypeAnnotation::Function(params, Box::new(ret))
    }
}

impl fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeAnnotation::Named(name) => write!(f, "{name}"),
            TypeAnnotation::Function(params, ret) => {
                write!(f, "(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") -> {ret}")
            }
            TypeAnnotation::Hole => write!(f, "_"),
        }
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// A declaration as seen by the type checker.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub id: DeclId,
    pub name: String,
    pub span: Span,
    pub annotation: Option<Spanned<TypeAnnotation>>,
}

/// Declarations produced by the parser, indexed by [`DeclId`].
///
/// Identities are allocated in declaration order and never reused.
#[derive(Debug, Clone, Default)]
pub struct DeclTable {
    decls: Vec<Decl>,
}

impl DeclTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new declaration and return its identity.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        span: Span,
        annotation: Option<Spanned<TypeAnnotation>>,
    ) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(Decl {
            id,
            name: name.into(),
            span,
            annotation,
        });
        id
    }

    pub fn get(&self, id: DeclId) -> Option<&Decl> {
        self.decls.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Literals and operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    /// Exit-code literal. Only produced by the parser for `exit` expressions.
    Int(i64),
    Num(f64),
    Bool(bool),
    Str(String),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Eq | BinOp::Ne
        )
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
