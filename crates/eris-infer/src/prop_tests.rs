//! Property tests for the unifier using proptest.
//!
//! These tests stress invariants that must hold for ANY input types,
//! not just hand-picked examples. Key properties:
//!
//! 1. Unification reflexivity: unify(t, t) always succeeds
//! 2. `any` and `<error>` unify with everything and bind nothing
//! 3. Substitution idempotence: apply(apply(t)) == apply(t)
//! 4. After unify(a, b), apply(a) == apply(b)
//! 5. Occurs check: unifying Var(x) with a type containing Var(x) fails
//! 6. A failed unification leaves the substitution as it was

use proptest::prelude::*;

use eris_types::*;

use crate::{Session, SessionOptions, TypeError};

fn session() -> Session {
    // Generated ids stay below 8; keep fresh ones out of their way.
    Session::with_options(SessionOptions {
        var_offset: Some(1000),
        ..SessionOptions::default()
    })
}

// ---------------------------------------------------------------------------
// Strategies for generating types
// ---------------------------------------------------------------------------

fn arb_type_var_id() -> impl Strategy<Value = TypeVarId> {
    (0u32..8).prop_map(TypeVarId)
}

fn arb_primitive() -> impl Strategy<Value = Type> {
    prop_oneof![
        Just(Type::Int),
        Just(Type::Num),
        Just(Type::Bool),
        Just(Type::Str),
    ]
}

fn arb_const_value() -> impl Strategy<Value = ConstValue> {
    prop_oneof![
        (0i64..4).prop_map(ConstValue::Int),
        (-100.0f64..100.0).prop_map(ConstValue::Num),
        any::<bool>().prop_map(ConstValue::Bool),
        "[a-z]{0,3}".prop_map(ConstValue::Str),
        Just(ConstValue::None),
    ]
}

/// Leaves without `any`, `<error>` or literal wrappers.
fn arb_plain_leaf() -> impl Strategy<Value = Type> {
    prop_oneof![
        4 => arb_primitive(),
        1 => Just(Type::None),
        2 => arb_type_var_id().prop_map(Type::Var),
    ]
}

fn arb_leaf() -> impl Strategy<Value = Type> {
    prop_oneof![
        6 => arb_plain_leaf(),
        1 => Just(Type::Any),
        1 => Just(Type::Error),
        1 => arb_const_value().prop_map(Type::constant),
    ]
}

fn with_functions(leaf: BoxedStrategy<Type>, depth: u32) -> BoxedStrategy<Type> {
    if depth == 0 {
        return leaf;
    }
    let inner = with_functions(leaf.clone(), depth - 1);
    prop_oneof![
        3 => leaf,
        1 => (prop::collection::vec(inner.clone(), 0..=3), inner)
            .prop_map(|(args, ret)| Type::func(args, ret)),
    ]
    .boxed()
}

/// Types of bounded depth, every variant included.
fn arb_type(depth: u32) -> BoxedStrategy<Type> {
    with_functions(arb_leaf().boxed(), depth)
}

/// Types on which successful unification implies syntactic agreement.
fn arb_plain_type(depth: u32) -> BoxedStrategy<Type> {
    with_functions(arb_plain_leaf().boxed(), depth)
}

/// Bind a few generated variable ids up front so unification meets both
/// bound and unbound variables.
fn seeded_session() -> Session {
    let mut s = session();
    s.unify(&Type::Var(TypeVarId(0)), &Type::Num).unwrap();
    s.unify(&Type::Var(TypeVarId(1)), &Type::func(vec![Type::Str], Type::Bool))
        .unwrap();
    s.unify(&Type::Var(TypeVarId(2)), &Type::Var(TypeVarId(3)))
        .unwrap();
    s
}

// ---------------------------------------------------------------------------
// Property: Structural equality
// ---------------------------------------------------------------------------

proptest! {
    /// Primitives are equal to themselves and to no other primitive.
    #[test]
    fn primitive_equality_is_by_tag(p in arb_primitive(), q in arb_primitive()) {
        prop_assert!(types_equal(&p, &p));
        prop_assert_eq!(types_equal(&p, &q), p.tag() == q.tag());
    }

    /// Literal wrappers compare by their type only.
    #[test]
    fn const_equality_ignores_value(a in arb_const_value(), b in arb_const_value()) {
        let equal = types_equal(&Type::constant(a.clone()), &Type::constant(b.clone()));
        prop_assert_eq!(equal, a.ty().tag() == b.ty().tag());
    }
}

// ---------------------------------------------------------------------------
// Property: Unification reflexivity
// ---------------------------------------------------------------------------

proptest! {
    /// Any type unifies with itself without binding anything.
    #[test]
    fn unify_reflexive(ty in arb_type(3)) {
        let mut s = session();
        prop_assert_eq!(s.unify(&ty, &ty), Ok(()));
        prop_assert!(s.substitution().is_empty());
    }
}

// ---------------------------------------------------------------------------
// Property: `any` and `<error>` neutrality
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn any_unifies_with_everything(ty in arb_type(3)) {
        let mut s = session();
        prop_assert_eq!(s.unify(&Type::Any, &ty), Ok(()));
        prop_assert_eq!(s.unify(&ty, &Type::Any), Ok(()));
        prop_assert!(s.substitution().is_empty());
    }

    #[test]
    fn error_unifies_with_everything(ty in arb_type(3)) {
        let mut s = session();
        prop_assert_eq!(s.unify(&Type::Error, &ty), Ok(()));
        prop_assert_eq!(s.unify(&ty, &Type::Error), Ok(()));
        prop_assert!(s.substitution().is_empty());
    }
}

// ---------------------------------------------------------------------------
// Property: Substitution idempotence
// ---------------------------------------------------------------------------

proptest! {
    /// Applying the substitution twice gives the same result as once.
    #[test]
    fn substitution_idempotent(ty in arb_type(3)) {
        let s = seeded_session();
        let once = s.apply(&ty);
        let twice = s.apply(&once);
        prop_assert_eq!(once, twice);
    }
}

// ---------------------------------------------------------------------------
// Property: Post-unify agreement
// ---------------------------------------------------------------------------

proptest! {
    /// After successful unification both sides apply to the same type.
    #[test]
    fn unify_makes_types_agree(a in arb_plain_type(2), b in arb_plain_type(2)) {
        let mut s = seeded_session();
        if s.unify(&a, &b).is_ok() {
            prop_assert_eq!(s.apply(&a), s.apply(&b));
        }
    }

    /// Repeating a successful unification binds nothing new.
    #[test]
    fn unify_idempotent(a in arb_type(2), b in arb_type(2)) {
        let mut s = seeded_session();
        if s.unify(&a, &b).is_ok() {
            let before = s.substitution().bindings().clone();
            prop_assert_eq!(s.unify(&a, &b), Ok(()));
            prop_assert_eq!(s.substitution().bindings(), &before);
        }
    }
}

// ---------------------------------------------------------------------------
// Property: Occurs check
// ---------------------------------------------------------------------------

proptest! {
    /// An unbound variable never binds to a function mentioning it.
    #[test]
    fn occurs_check_rejects_self_reference(
        var in 4u32..8,
        other in arb_type(2),
        in_return in any::<bool>(),
    ) {
        let var = TypeVarId(var);
        let containing = if in_return {
            Type::func(vec![other], Type::Var(var))
        } else {
            Type::func(vec![Type::Var(var), other], Type::Num)
        };
        let mut s = session();
        let result = s.unify(&Type::Var(var), &containing);
        prop_assert!(
            matches!(result, Err(TypeError::InfiniteType { var: v, .. }) if v == var),
            "expected InfiniteType, got {:?}",
            result
        );
        prop_assert!(!s.substitution().is_bound(var));
    }
}

// ---------------------------------------------------------------------------
// Property: Atomic rollback
// ---------------------------------------------------------------------------

proptest! {
    /// Functions of different arity never unify and bind nothing.
    #[test]
    fn arity_mismatch_leaves_substitution_unchanged(
        left in prop::collection::vec(arb_type(1), 0..=3),
        right in prop::collection::vec(arb_type(1), 0..=3),
        ret in arb_type(1),
    ) {
        prop_assume!(left.len() != right.len());
        let mut s = seeded_session();
        let before = s.substitution().bindings().clone();
        let result = s.unify(&Type::func(left, ret.clone()), &Type::func(right, ret));
        prop_assert!(
            matches!(result, Err(TypeError::ArityMismatch { .. })),
            "expected ArityMismatch, got {:?}",
            result
        );
        prop_assert_eq!(s.substitution().bindings(), &before);
    }

    /// Whatever fails, nothing bound during the attempt survives.
    #[test]
    fn failed_unify_is_atomic(a in arb_type(2), b in arb_type(2)) {
        let mut s = seeded_session();
        let before = s.substitution().bindings().clone();
        if s.unify(&a, &b).is_err() {
            prop_assert_eq!(s.substitution().bindings(), &before);
        }
    }

    /// The dry run agrees with the real thing and never mutates.
    #[test]
    fn types_consistent_matches_unify(a in arb_type(2), b in arb_type(2)) {
        let mut s = seeded_session();
        let before = s.substitution().bindings().clone();
        let consistent = s.types_consistent(&a, &b);
        prop_assert_eq!(s.substitution().bindings(), &before);
        prop_assert_eq!(consistent, s.unify(&a, &b).is_ok());
    }
}

// ---------------------------------------------------------------------------
// Property: Traits
// ---------------------------------------------------------------------------

proptest! {
    /// A literal satisfies exactly the traits its type satisfies.
    #[test]
    fn literals_satisfy_their_types_traits(value in arb_const_value()) {
        let registry = TraitRegistry::builtin();
        let lit = Type::constant(value.clone());
        prop_assert_eq!(registry.traits_of(&lit), registry.traits_of(&value.ty()));
    }
}
