//! Type errors and their conversion to diagnostics.

use eris_ast::{NodeId, Span};
use eris_diag::{Category, Diagnostic, SourceLocation};
use eris_types::{Type, TypeVarId, sanitize_type_display, sanitize_type_pair_display};

/// A failed type-level check.
///
/// The `Display` form shows raw variable ids and is meant for logs. User
/// output goes through [`Report::to_diagnostic`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("type mismatch: expected `{expected}`, got `{actual}`")]
    TypeMismatch { expected: Type, actual: Type },

    #[error("arity mismatch: expected {expected} arguments, got {actual}")]
    ArityMismatch {
        expected: usize,
        actual: usize,
        expected_ty: Type,
        actual_ty: Type,
    },

    #[error("infinite type: {var} occurs in `{ty}`")]
    InfiniteType { var: TypeVarId, ty: Type },

    #[error("cannot infer a type for {name}: `{ty}` is still open")]
    UnresolvedType { name: String, ty: Type },

    #[error("type `{ty}` does not implement trait `{trait_name}`")]
    TraitNotSatisfied { ty: Type, trait_name: String },

    #[error("unknown identifier `{name}`")]
    UnknownIdentifier { name: String },

    #[error("unknown type `{name}`")]
    UnknownTypeName { name: String },
}

impl TypeError {
    pub fn category(&self) -> Category {
        match self {
            TypeError::TypeMismatch { .. } => Category::TypeMismatch,
            TypeError::ArityMismatch { .. } => Category::ArityMismatch,
            TypeError::InfiniteType { .. } => Category::InfiniteType,
            TypeError::UnresolvedType { .. } => Category::UnresolvedType,
            TypeError::TraitNotSatisfied { .. } => Category::TraitBound,
            TypeError::UnknownIdentifier { .. } => Category::UndefinedName,
            TypeError::UnknownTypeName { .. } => Category::UnknownType,
        }
    }

    /// User-facing message with type variables renamed to `a`, `b`, ...
    pub fn message(&self) -> String {
        match self {
            TypeError::TypeMismatch { expected, actual } => {
                let (expected, actual) = sanitize_type_pair_display(expected, actual);
                format!("type mismatch: expected `{expected}`, got `{actual}`")
            }
            TypeError::ArityMismatch {
                expected,
                actual,
                expected_ty,
                actual_ty,
            } => {
                let (expected_ty, actual_ty) = sanitize_type_pair_display(expected_ty, actual_ty);
                let takes = if *expected == 1 {
                    "1 argument".to_string()
                } else {
                    format!("{expected} arguments")
                };
                format!(
                    "function takes {takes} but is used with {actual}: \
                     expected `{expected_ty}`, got `{actual_ty}`"
                )
            }
            TypeError::InfiniteType { var, ty } => {
                let (var, ty) = sanitize_type_pair_display(&Type::Var(*var), ty);
                format!("infinite type: `{var}` would have to contain itself in `{ty}`")
            }
            TypeError::UnresolvedType { name, ty } => {
                format!(
                    "cannot infer a type for {name}: inference stopped at `{}`",
                    sanitize_type_display(ty)
                )
            }
            TypeError::TraitNotSatisfied { ty, trait_name } => format!(
                "type `{}` does not implement trait `{trait_name}`",
                sanitize_type_display(ty)
            ),
            TypeError::UnknownIdentifier { name } => format!("unknown identifier `{name}`"),
            TypeError::UnknownTypeName { name } => format!("unknown type `{name}`"),
        }
    }
}

/// A type error attributed to the node that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub error: TypeError,
    pub origin: NodeId,
    pub span: Option<Span>,
    /// Secondary locations, such as the declaration an annotation belongs to.
    pub labels: Vec<(Span, String)>,
}

impl Report {
    pub fn new(error: TypeError, origin: NodeId) -> Self {
        Self {
            error,
            origin,
            span: None,
            labels: Vec::new(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push((span, message.into()));
        self
    }

    pub fn category(&self) -> Category {
        self.error.category()
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag =
            Diagnostic::error(self.category(), self.error.message()).from_node(self.origin);
        if let Some(span) = self.span
            && !span.is_synthetic()
        {
            diag = diag.at(span_to_location(span));
        }
        for (span, message) in &self.labels {
            diag = diag.with_label(span_to_location(*span), message.clone());
        }
        if let TypeError::TraitNotSatisfied { trait_name, .. } = &self.error {
            diag = diag.with_help(format!("the operation requires `{trait_name}`"));
        }
        diag
    }
}

pub(crate) fn span_to_location(span: Span) -> SourceLocation {
    SourceLocation {
        file_id: span.file.0,
        start: span.start,
        end: span.end,
    }
}
