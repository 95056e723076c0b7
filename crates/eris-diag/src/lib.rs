//! Error reporting and diagnostics for Eris.
//!
//! Diagnostics are created by other crates (for example, `eris-infer`) and
//! rendered here for display. Type variables never reach this crate in raw
//! form; producers rename them before building the message.

use std::fmt;

use eris_ast::NodeId;

// ---------------------------------------------------------------------------
// Diagnostic categories
// ---------------------------------------------------------------------------

/// Broad category for diagnostics. Used for filtering and grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Type mismatch: expected X, got Y.
    TypeMismatch,
    /// Function arity disagrees.
    ArityMismatch,
    /// A type variable would have to contain itself.
    InfiniteType,
    /// Inference left a type undetermined.
    UnresolvedType,
    /// A trait bound is not satisfied.
    TraitBound,
    /// Undefined variable or name.
    UndefinedName,
    /// A type annotation names a type that does not exist.
    UnknownType,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::TypeMismatch,
        Category::ArityMismatch,
        Category::InfiniteType,
        Category::UnresolvedType,
        Category::TraitBound,
        Category::UndefinedName,
        Category::UnknownType,
    ];

    pub fn all() -> &'static [Category] {
        &Self::ALL
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::TypeMismatch => "type_mismatch",
            Category::ArityMismatch => "arity_mismatch",
            Category::InfiniteType => "infinite_type",
            Category::UnresolvedType => "unresolved_type",
            Category::TraitBound => "trait_bound",
            Category::UndefinedName => "undefined_name",
            Category::UnknownType => "unknown_type",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Category::TypeMismatch => "E0001",
            Category::ArityMismatch => "E0002",
            Category::InfiniteType => "E0003",
            Category::UnresolvedType => "E0004",
            Category::TraitBound => "E0005",
            Category::UndefinedName => "E0006",
            Category::UnknownType => "E0007",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::TypeMismatch => "Expression type does not match expected type.",
            Category::ArityMismatch => "A function was used with the wrong number of arguments.",
            Category::InfiniteType => "A type would have to contain itself.",
            Category::UnresolvedType => "Inference could not determine a type.",
            Category::TraitBound => "A required trait is not implemented by the given type.",
            Category::UndefinedName => "A referenced variable or function is undefined.",
            Category::UnknownType => "A type annotation names an unknown type.",
        }
    }

    pub fn example_fix(self) -> &'static str {
        match self {
            Category::TypeMismatch => {
                "Adjust the expression or the annotation so both agree on one type."
            }
            Category::ArityMismatch => "Call the function with its declared parameter count.",
            Category::InfiniteType => "Check for a value passed to itself as an argument.",
            Category::UnresolvedType => "Add a type annotation to the declaration.",
            Category::TraitBound => "Convert the operands to a type that supports the operation.",
            Category::UndefinedName => "Define the missing name or fix the spelling.",
            Category::UnknownType => "Use one of the built-in type names.",
        }
    }
}

// ---------------------------------------------------------------------------
// Source locations
// ---------------------------------------------------------------------------

/// A source location for diagnostics.
///
/// Uses byte offsets. Callers convert from `eris-ast` spans to this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file_id: u32,
    pub start: u32,
    pub end: u32,
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A structured error diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Stable diagnostic code (e.g. E0001).
    pub code: Option<String>,
    pub category: Category,
    /// Primary message: what went wrong.
    pub message: String,
    /// Where it went wrong.
    pub location: Option<SourceLocation>,
    /// The declaration or expression that triggered the failure.
    pub origin: Option<NodeId>,
    /// Additional labeled spans (e.g., "declared here").
    pub labels: Vec<DiagLabel>,
    /// Suggested fix, if any.
    pub help: Option<String>,
}

/// A labeled source span within a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagLabel {
    pub location: SourceLocation,
    pub message: String,
}

impl Diagnostic {
    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Self {
            code: Some(category.code().to_string()),
            category,
            message: message.into(),
            location: None,
            origin: None,
            labels: Vec::new(),
            help: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn from_node(mut self, origin: NodeId) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_label(mut self, location: SourceLocation, message: impl Into<String>) -> Self {
        self.labels.push(DiagLabel {
            location,
            message: message.into(),
        });
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = &self.code {
            write!(f, "error[{code}]: {}", self.message)?;
        } else {
            write!(f, "error: {}", self.message)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error type for crates that produce diagnostics
// ---------------------------------------------------------------------------

/// Error type wrapping one or more diagnostics.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .0.first().map(|d| d.to_string()).unwrap_or_default())]
pub struct DiagnosticError(pub Vec<Diagnostic>);

impl DiagnosticError {
    pub fn multiple(diags: Vec<Diagnostic>) -> Self {
        Self(diags)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.0
    }

    /// Diagnostics triggered by `origin`.
    pub fn for_node(&self, origin: NodeId) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(move |d| d.origin == Some(origin))
    }
}
