//! Step-by-step record of what the unifier did.
//!
//! Tracing is opt-in via [`SessionOptions::trace`](crate::SessionOptions);
//! nothing is recorded when it is off.

use serde::Serialize;

use eris_types::Type;

/// A single step in a unification trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnifyStep {
    pub step: usize,
    pub action: UnifyAction,
    pub left: String,
    pub right: String,
    pub detail: String,
}

/// What action was taken during a unification step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifyAction {
    /// Types already agree, or one side is `any` / `<error>`.
    Identity,
    /// Type variable bound (e.g. `$0 := num`).
    Bind,
    /// Structural recursion into function arguments and return type.
    Decompose,
    /// A `const` wrapper was dropped to compare the underlying type.
    UnwrapConst,
    /// Occurs check fired and an infinite type was prevented.
    OccursCheck,
    /// Unification failed.
    Error,
    /// Bindings made by a failed unification were undone.
    Rollback,
}

/// Bounded buffer of unification steps.
#[derive(Debug, Clone, Default)]
pub(crate) struct Trace {
    steps: Vec<UnifyStep>,
    limit: usize,
}

impl Trace {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            steps: Vec::new(),
            limit,
        }
    }

    pub(crate) fn push(&mut self, action: UnifyAction, left: &Type, right: &Type, detail: String) {
        if self.steps.len() >= self.limit {
            return;
        }
        let step = self.steps.len() + 1;
        self.steps.push(UnifyStep {
            step,
            action,
            left: left.to_string(),
            right: right.to_string(),
            detail,
        });
    }

    pub(crate) fn steps(&self) -> &[UnifyStep] {
        &self.steps
    }

    pub(crate) fn take(&mut self) -> Vec<UnifyStep> {
        std::mem::take(&mut self.steps)
    }
}
