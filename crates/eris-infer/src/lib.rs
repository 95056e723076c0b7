//! Type inference for Eris.
//!
//! This crate implements:
//! - Unification over [`eris_types::Type`] with an occurs check and atomic
//!   rollback of failed attempts
//! - Trait obligations against a frozen [`TraitRegistry`], deferred while an
//!   operand is still a type variable
//! - Symbol scopes whose types are resolved through the session substitution
//!
//! One [`Session`] type-checks one compilation unit. Sessions share nothing
//! mutable; the trait registry they pin is immutable.

pub mod constant;
pub mod error;
pub mod symbol;
pub mod trace;
pub mod typeck;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use eris_ast::{ExprId, NodeId, Span};
use eris_types::{
    Substitution, TraitRegistry, Type, TypeInfo, TypeVarId, free_type_vars, occurs,
};

pub use eris_diag::{Category, Diagnostic, DiagnosticError, SourceLocation};
pub use error::{Report, TypeError};
pub use symbol::{ResolutionStatus, ResolvedSymbol, Symbol, SymbolTable};
pub use trace::{UnifyAction, UnifyStep};

use trace::Trace;

/// Global counter for type variable ids.
///
/// Sessions take ids from this counter in blocks, so no two sessions ever
/// produce the same `TypeVarId`, even when they run on different threads.
static GLOBAL_TYPE_VAR: AtomicU32 = AtomicU32::new(0);

const VAR_BLOCK_SIZE: u32 = 1024;

/// Claim the next block of ids as `(start, end)`.
///
/// # Panics
///
/// Panics when the id space is exhausted.
fn claim_var_block(counter: &AtomicU32) -> (u32, u32) {
    let start = counter
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| {
            next.checked_add(VAR_BLOCK_SIZE)
        })
        .expect("type variable ids exhausted");
    (start, start + VAR_BLOCK_SIZE)
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Knobs for a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Record every unification step (see [`Session::unify_trace`]).
    pub trace: bool,
    /// Maximum number of recorded steps.
    pub trace_limit: usize,
    /// Start variable ids here instead of drawing from the global counter.
    ///
    /// Only for tests that need deterministic ids.
    pub var_offset: Option<u32>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            trace: false,
            trace_limit: 1024,
            var_offset: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A trait obligation whose operand was still a variable when requested.
#[derive(Debug, Clone)]
struct PendingTrait {
    ty: Type,
    trait_name: String,
    origin: NodeId,
}

/// Everything codegen needs from a diagnostic-free unit.
#[derive(Debug, Clone)]
pub struct TypedUnit {
    pub symbols: Vec<ResolvedSymbol>,
    pub expr_types: BTreeMap<ExprId, TypeInfo>,
}

/// Inference state for one compilation unit.
pub struct Session {
    substitution: Substitution,
    registry: Arc<TraitRegistry>,
    next_type_var: u32,
    var_block_end: u32,
    reports: Vec<Report>,
    pending_traits: Vec<PendingTrait>,
    expr_types: BTreeMap<ExprId, TypeInfo>,
    resolved: Vec<ResolvedSymbol>,
    trace: Option<Trace>,
}

impl Session {
    /// A session using the built-in trait registry.
    pub fn new() -> Self {
        Self::with_options(SessionOptions::default())
    }

    pub fn with_options(options: SessionOptions) -> Self {
        Self::with_registry(TraitRegistry::builtin(), options)
    }

    pub fn with_registry(registry: Arc<TraitRegistry>, options: SessionOptions) -> Self {
        let (next_type_var, var_block_end) = match options.var_offset {
            Some(offset) => (offset, u32::MAX),
            None => claim_var_block(&GLOBAL_TYPE_VAR),
        };
        tracing::debug!(
            registry = registry.version(),
            first_var = next_type_var,
            "inference session started"
        );
        Self {
            substitution: Substitution::new(),
            registry,
            next_type_var,
            var_block_end,
            reports: Vec::new(),
            pending_traits: Vec::new(),
            expr_types: BTreeMap::new(),
            resolved: Vec::new(),
            trace: options.trace.then(|| Trace::new(options.trace_limit)),
        }
    }

    pub fn registry(&self) -> &TraitRegistry {
        &self.registry
    }

    pub fn substitution(&self) -> &Substitution {
        &self.substitution
    }

    /// Generate a fresh type variable.
    pub fn fresh_var(&mut self) -> TypeVarId {
        if self.next_type_var == self.var_block_end {
            (self.next_type_var, self.var_block_end) = claim_var_block(&GLOBAL_TYPE_VAR);
        }
        let id = TypeVarId(self.next_type_var);
        self.next_type_var += 1;
        id
    }

    /// Generate a fresh type variable as a `Type`.
    pub fn fresh_type(&mut self) -> Type {
        Type::Var(self.fresh_var())
    }

    /// Fully apply the current substitution.
    pub fn apply(&self, ty: &Type) -> Type {
        self.substitution.apply(ty)
    }

    // -- Unification -------------------------------------------------------

    /// Make `expected` and `actual` agree, binding type variables as needed.
    ///
    /// On failure every binding made during this call is undone.
    pub fn unify(&mut self, expected: &Type, actual: &Type) -> Result<(), TypeError> {
        let snapshot = self.substitution.snapshot();
        let mut engine = Engine {
            substitution: &mut self.substitution,
            trace: self.trace.as_mut(),
        };
        let result = engine.unify(expected, actual);
        if let Err(err) = &result {
            let undone = self.substitution.len();
            self.substitution.rollback_to(snapshot);
            let undone = undone - self.substitution.len();
            tracing::debug!(%err, undone, "unification failed");
            if let Some(trace) = self.trace.as_mut() {
                trace.push(
                    UnifyAction::Rollback,
                    expected,
                    actual,
                    format!("undid {undone} binding(s)"),
                );
            }
        }
        result
    }

    /// Could a value of type `src` be used where `dst` is expected?
    ///
    /// A dry run of [`Session::unify`] against a copy of the substitution;
    /// the session is never modified. Function types match invariantly: the
    /// arguments must agree exactly and so must the return type.
    pub fn types_consistent(&self, dst: &Type, src: &Type) -> bool {
        let mut scratch = self.substitution.clone();
        let mut engine = Engine {
            substitution: &mut scratch,
            trace: None,
        };
        engine.unify(dst, src).is_ok()
    }

    /// Unify and, on failure, record a report and yield `<error>`.
    ///
    /// Returns the applied `expected` type on success.
    pub fn expect(&mut self, expected: &Type, actual: &Type, origin: impl Into<NodeId>) -> Type {
        match self.unify(expected, actual) {
            Ok(()) => self.apply(expected),
            Err(err) => {
                self.report(Report::new(err, origin.into()));
                Type::Error
            }
        }
    }

    // -- Traits ------------------------------------------------------------

    /// Require `ty` to satisfy `trait_name`.
    ///
    /// `any` and `<error>` pass. A still-unbound variable defers the check
    /// until [`Session::discharge_traits`] runs.
    ///
    /// # Panics
    ///
    /// Panics when `trait_name` is not in the pinned registry.
    pub fn require_trait(
        &mut self,
        ty: &Type,
        trait_name: &str,
        origin: impl Into<NodeId>,
    ) -> Result<(), TypeError> {
        assert!(
            self.registry.contains(trait_name),
            "trait `{trait_name}` is not registered"
        );
        let head = self.substitution.resolve(ty);
        let head = self.substitution.resolve(head.widen());
        match head {
            Type::Any | Type::Error => Ok(()),
            Type::Var(var) => {
                tracing::debug!(%var, trait_name, "deferring trait obligation");
                self.pending_traits.push(PendingTrait {
                    ty: Type::Var(var),
                    trait_name: trait_name.to_string(),
                    origin: origin.into(),
                });
                Ok(())
            }
            concrete => {
                if self.registry.satisfies(&concrete, trait_name) {
                    Ok(())
                } else {
                    Err(TypeError::TraitNotSatisfied {
                        ty: self.apply(&concrete),
                        trait_name: trait_name.to_string(),
                    })
                }
            }
        }
    }

    /// Re-check deferred trait obligations whose operand has since resolved.
    ///
    /// Obligations still waiting on a variable stay pending.
    pub fn discharge_traits(&mut self) {
        let pending = std::mem::take(&mut self.pending_traits);
        for obligation in pending {
            if let Err(err) = self.require_trait(
                &obligation.ty,
                &obligation.trait_name,
                obligation.origin,
            ) {
                self.report(Report::new(err, obligation.origin));
            }
        }
    }

    // -- Reports -----------------------------------------------------------

    pub fn report(&mut self, report: Report) {
        tracing::debug!(origin = %report.origin, error = %report.error, "type error recorded");
        self.reports.push(report);
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn has_errors(&self) -> bool {
        !self.reports.is_empty()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.reports.iter().map(Report::to_diagnostic).collect()
    }

    // -- Tracing -----------------------------------------------------------

    pub fn is_tracing(&self) -> bool {
        self.trace.is_some()
    }

    pub fn unify_trace(&self) -> &[UnifyStep] {
        self.trace.as_ref().map(Trace::steps).unwrap_or(&[])
    }

    pub fn take_unify_trace(&mut self) -> Vec<UnifyStep> {
        self.trace.as_mut().map(Trace::take).unwrap_or_default()
    }

    // -- Expression types --------------------------------------------------

    /// Remember the type of an expression node for output to codegen.
    pub fn record_expr(&mut self, expr: ExprId, info: TypeInfo) {
        self.expr_types.insert(expr, info);
    }

    pub fn expr_type(&self, expr: ExprId) -> Option<TypeInfo> {
        self.expr_types.get(&expr).map(|info| TypeInfo {
            ty: self.apply(&info.ty),
            value: info.value.clone(),
        })
    }

    /// End the session.
    ///
    /// Remaining trait obligations and expression types must be fully
    /// determined by now; anything still open is reported as unresolved.
    pub fn finish(mut self) -> Result<TypedUnit, DiagnosticError> {
        self.discharge_traits();
        for obligation in std::mem::take(&mut self.pending_traits) {
            let ty = self.apply(&obligation.ty);
            if free_type_vars(&ty).is_empty() {
                continue;
            }
            self.report(Report::new(
                TypeError::UnresolvedType {
                    name: format!("an operand requiring `{}`", obligation.trait_name),
                    ty: ty.clone(),
                },
                obligation.origin,
            ));
            self.poison(&ty);
        }

        let mut expr_types = BTreeMap::new();
        let recorded = std::mem::take(&mut self.expr_types);
        for (expr, info) in recorded {
            let ty = self.apply(&info.ty);
            if !free_type_vars(&ty).is_empty() {
                self.report(Report::new(
                    TypeError::UnresolvedType {
                        name: format!("expression {}", NodeId::Expr(expr)),
                        ty: ty.clone(),
                    },
                    NodeId::Expr(expr),
                ));
                self.poison(&ty);
                continue;
            }
            expr_types.insert(expr, TypeInfo { ty, value: info.value });
        }

        if self.has_errors() {
            return Err(DiagnosticError::multiple(self.diagnostics()));
        }
        tracing::debug!(
            symbols = self.resolved.len(),
            exprs = expr_types.len(),
            "inference session finished"
        );
        Ok(TypedUnit {
            symbols: std::mem::take(&mut self.resolved),
            expr_types,
        })
    }

    /// Bind every variable still open in `ty` to `<error>`, so whatever else
    /// waits on them stays quiet once they have been reported.
    pub(crate) fn poison(&mut self, ty: &Type) {
        for var in free_type_vars(&self.apply(ty)) {
            tracing::debug!(%var, "unresolved type variable poisoned");
            self.substitution.bind(var, Type::Error);
        }
    }

    pub(crate) fn report_at(&mut self, error: TypeError, origin: NodeId, span: Option<Span>) {
        let mut report = Report::new(error, origin);
        if let Some(span) = span {
            report = report.at(span);
        }
        self.report(report);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Engine: one unification run over a substitution
// ---------------------------------------------------------------------------

struct Engine<'a> {
    substitution: &'a mut Substitution,
    trace: Option<&'a mut Trace>,
}

impl Engine<'_> {
    fn step(
        &mut self,
        action: UnifyAction,
        left: &Type,
        right: &Type,
        detail: impl FnOnce() -> String,
    ) {
        tracing::trace!(?action, %left, %right, "unify step");
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.push(action, left, right, detail());
        }
    }

    fn mismatch(&mut self, expected: &Type, actual: &Type) -> TypeError {
        self.step(UnifyAction::Error, expected, actual, || "type mismatch".into());
        TypeError::TypeMismatch {
            expected: self.substitution.apply(expected),
            actual: self.substitution.apply(actual),
        }
    }

    fn unify(&mut self, expected: &Type, actual: &Type) -> Result<(), TypeError> {
        let expected = self.substitution.resolve(expected);
        let actual = self.substitution.resolve(actual);

        match (&expected, &actual) {
            // Escape hatch and error suppression: anything goes.
            (Type::Any | Type::Error, _) | (_, Type::Any | Type::Error) => {
                self.step(UnifyAction::Identity, &expected, &actual, || {
                    "`any` and `<error>` unify with every type".into()
                });
                Ok(())
            }

            // Literal types compare by their underlying type.
            (Type::Const(ct), _) => {
                self.step(UnifyAction::UnwrapConst, &expected, &actual, || {
                    "compare the literal's type".into()
                });
                self.unify(&ct.ty, &actual)
            }
            (_, Type::Const(ct)) => {
                self.step(UnifyAction::UnwrapConst, &expected, &actual, || {
                    "compare the literal's type".into()
                });
                self.unify(&expected, &ct.ty)
            }

            (Type::Var(a), Type::Var(b)) if a == b => {
                self.step(UnifyAction::Identity, &expected, &actual, || {
                    "same variable".into()
                });
                Ok(())
            }
            (Type::Var(var), other) | (other, Type::Var(var)) => self.bind(*var, other),

            (left, right) if left.is_primitive() && right.is_primitive() => {
                if left.tag() == right.tag() {
                    self.step(UnifyAction::Identity, left, right, || {
                        "types already equal".into()
                    });
                    Ok(())
                } else {
                    Err(self.mismatch(left, right))
                }
            }

            (Type::Func(left), Type::Func(right)) => {
                if left.args.len() != right.args.len() {
                    self.step(UnifyAction::Error, &expected, &actual, || {
                        "argument counts differ".into()
                    });
                    return Err(TypeError::ArityMismatch {
                        expected: left.args.len(),
                        actual: right.args.len(),
                        expected_ty: self.substitution.apply(&expected),
                        actual_ty: self.substitution.apply(&actual),
                    });
                }
                self.step(UnifyAction::Decompose, &expected, &actual, || {
                    "unify arguments pairwise, then return types".into()
                });
                for (l, r) in left.args.iter().zip(&right.args) {
                    self.unify(l, r)?;
                }
                self.unify(&left.ret, &right.ret)
            }

            (Type::None, Type::None) => {
                self.step(UnifyAction::Identity, &expected, &actual, || {
                    "types already equal".into()
                });
                Ok(())
            }

            _ => Err(self.mismatch(&expected, &actual)),
        }
    }

    /// Bind an unbound variable, with occurs check.
    ///
    /// The bound type carries no literal wrappers at any depth.
    fn bind(&mut self, var: TypeVarId, ty: &Type) -> Result<(), TypeError> {
        let ty = self.substitution.apply(ty).widened();
        if occurs(var, &ty) {
            self.step(UnifyAction::OccursCheck, &Type::Var(var), &ty, || {
                format!("{var} occurs in {ty}, infinite type prevented")
            });
            return Err(TypeError::InfiniteType { var, ty });
        }
        self.step(UnifyAction::Bind, &Type::Var(var), &ty, || format!("{var} := {ty}"));
        tracing::debug!(%var, %ty, "type variable bound");
        self.substitution.bind(var, ty);
        Ok(())
    }
}

#[cfg(test)]
mod prop_tests;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
