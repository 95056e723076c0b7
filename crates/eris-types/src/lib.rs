//! Type representations for Eris.
//!
//! This crate defines the semantic types used by the type checker and
//! inference engine. These are distinct from syntactic type annotations
//! (which live in `eris-ast`).

pub mod traits;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub use traits::{RegistryError, TraitRegistry, TraitRegistryBuilder, TypeTrait};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a type variable during inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(pub u32);

impl fmt::Display for TypeVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A semantic type in Eris.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    // -- Primitives --
    /// Exit-code type. Not interchangeable with `Num`.
    Int,
    Num,
    Bool,
    Str,

    // -- Inference variables --
    /// Unresolved type variable. Never appears in final types.
    Var(TypeVarId),

    // -- Functions --
    Func(FuncType),

    /// Top type for untyped contexts.
    Any,
    /// Poison produced by a failed inference step.
    Error,
    /// The type of "no value".
    None,

    /// A type paired with a known literal value.
    Const(ConstType),
}

/// Function type: `(args) -> ret`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncType {
    pub args: Vec<Type>,
    pub ret: Box<Type>,
}

impl FuncType {
    pub fn new(args: Vec<Type>, ret: Type) -> Self {
        Self {
            args,
            ret: Box::new(ret),
        }
    }
}

/// A type annotated with its compile-time value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstType {
    pub ty: Box<Type>,
    pub value: ConstValue,
}

/// Discriminant of a [`Type`], used for display and trait lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    Int,
    Num,
    Bool,
    Str,
    Var,
    Func,
    Any,
    Error,
    None,
    Const,
}

impl TypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Int => "int",
            TypeTag::Num => "num",
            TypeTag::Bool => "bool",
            TypeTag::Str => "str",
            TypeTag::Var => "var",
            TypeTag::Func => "func",
            TypeTag::Any => "any",
            TypeTag::Error => "<error>",
            TypeTag::None => "None",
            TypeTag::Const => "const",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Type {
    pub fn func(args: Vec<Type>, ret: Type) -> Self {
        Type::Func(FuncType::new(args, ret))
    }

    pub fn constant(value: ConstValue) -> Self {
        Type::Const(ConstType {
            ty: Box::new(value.ty()),
            value,
        })
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            Type::Int => TypeTag::Int,
            Type::Num => TypeTag::Num,
            Type::Bool => TypeTag::Bool,
            Type::Str => TypeTag::Str,
            Type::Var(_) => TypeTag::Var,
            Type::Func(_) => TypeTag::Func,
            Type::Any => TypeTag::Any,
            Type::Error => TypeTag::Error,
            Type::None => TypeTag::None,
            Type::Const(_) => TypeTag::Const,
        }
    }

    /// Directly representable, non-composite.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Int | Type::Num | Type::Bool | Type::Str)
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Type::Var(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    /// Look up a primitive by the name a user may write in an annotation.
    ///
    /// `int` is absent: it only names the exit-code type.
    pub fn primitive_named(name: &str) -> Option<Type> {
        match name {
            "num" => Some(Type::Num),
            "str" => Some(Type::Str),
            "bool" => Some(Type::Bool),
            _ => None,
        }
    }

    /// Strip any `Const` wrappers.
    pub fn widen(&self) -> &Type {
        match self {
            Type::Const(ct) => ct.ty.widen(),
            other => other,
        }
    }

    /// Strip `Const` wrappers everywhere, including inside function types.
    pub fn widened(&self) -> Type {
        match self.widen() {
            Type::Func(ft) => Type::func(
                ft.args.iter().map(Type::widened).collect(),
                ft.ret.widened(),
            ),
            other => other.clone(),
        }
    }

    /// The literal carried by a `Const` type, if any.
    pub fn const_value(&self) -> Option<&ConstValue> {
        match self {
            Type::Const(ct) => Some(&ct.value),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Var(v) => write!(f, "{v}"),
            Type::Func(ft) => {
                write!(f, "(")?;
                for (i, arg) in ft.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ") -> {}", ft.ret)
            }
            Type::Const(ct) => write!(f, "const {} = {}", ct.ty, ct.value),
            leaf => f.write_str(leaf.tag().as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Constant values
// ---------------------------------------------------------------------------

/// A compile-time literal value.
#[derive(Debug, Clone)]
pub enum ConstValue {
    Int(i64),
    Num(f64),
    Bool(bool),
    Str(String),
    None,
}

impl ConstValue {
    /// The type a value of this kind has.
    pub fn ty(&self) -> Type {
        match self {
            ConstValue::Int(_) => Type::Int,
            ConstValue::Num(_) => Type::Num,
            ConstValue::Bool(_) => Type::Bool,
            ConstValue::Str(_) => Type::Str,
            ConstValue::None => Type::None,
        }
    }
}

// Bitwise on `Num` so that `ConstValue` (and therefore `Type`) is `Eq`.
impl PartialEq for ConstValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConstValue::Int(a), ConstValue::Int(b)) => a == b,
            (ConstValue::Num(a), ConstValue::Num(b)) => a.to_bits() == b.to_bits(),
            (ConstValue::Bool(a), ConstValue::Bool(b)) => a == b,
            (ConstValue::Str(a), ConstValue::Str(b)) => a == b,
            (ConstValue::None, ConstValue::None) => true,
            _ => false,
        }
    }
}

impl Eq for ConstValue {}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Num(v) => write!(f, "{v}"),
            ConstValue::Bool(v) => write!(f, "{v}"),
            ConstValue::Str(v) => write!(f, "{v:?}"),
            ConstValue::None => write!(f, "None"),
        }
    }
}

// ---------------------------------------------------------------------------
// TypeInfo
// ---------------------------------------------------------------------------

/// A type together with the compile-time value of the expression, if known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub ty: Type,
    pub value: Option<ConstValue>,
}

impl TypeInfo {
    pub fn new(ty: Type) -> Self {
        Self { ty, value: None }
    }

    /// A literal: the type is `Const(value.ty(), value)`.
    pub fn constant(value: ConstValue) -> Self {
        Self {
            ty: Type::constant(value.clone()),
            value: Some(value),
        }
    }

    pub fn error() -> Self {
        Self::new(Type::Error)
    }

    pub fn is_error(&self) -> bool {
        self.ty.is_error()
    }
}

impl From<Type> for TypeInfo {
    fn from(ty: Type) -> Self {
        TypeInfo::new(ty)
    }
}

// ---------------------------------------------------------------------------
// Structural equality
// ---------------------------------------------------------------------------

/// Syntactic type equality.
///
/// Same tag and, for composites, recursively equal components. Variables are
/// equal only to themselves; no substitution is consulted. Two `Const` types
/// are equal when their wrapped types are; the literal does not take part.
pub fn types_equal(lhs: &Type, rhs: &Type) -> bool {
    match (lhs, rhs) {
        (Type::Var(a), Type::Var(b)) => a == b,
        (Type::Func(a), Type::Func(b)) => {
            a.args.len() == b.args.len()
                && a.args.iter().zip(&b.args).all(|(x, y)| types_equal(x, y))
                && types_equal(&a.ret, &b.ret)
        }
        (Type::Const(a), Type::Const(b)) => types_equal(&a.ty, &b.ty),
        _ => lhs.tag() == rhs.tag(),
    }
}

// ---------------------------------------------------------------------------
// Free variable computation
// ---------------------------------------------------------------------------

/// Collect all free type variables in a type.
pub fn free_type_vars(ty: &Type) -> BTreeSet<TypeVarId> {
    let mut vars = BTreeSet::new();
    collect_free_type_vars(ty, &mut vars);
    vars
}

fn collect_free_type_vars(ty: &Type, vars: &mut BTreeSet<TypeVarId>) {
    match ty {
        Type::Var(v) => {
            vars.insert(*v);
        }
        Type::Func(ft) => {
            for arg in &ft.args {
                collect_free_type_vars(arg, vars);
            }
            collect_free_type_vars(&ft.ret, vars);
        }
        Type::Const(ct) => collect_free_type_vars(&ct.ty, vars),
        Type::Int
        | Type::Num
        | Type::Bool
        | Type::Str
        | Type::Any
        | Type::Error
        | Type::None => {}
    }
}

/// Does `var` occur syntactically in `ty`?
pub fn occurs(var: TypeVarId, ty: &Type) -> bool {
    match ty {
        Type::Var(v) => *v == var,
        Type::Func(ft) => ft.args.iter().any(|t| occurs(var, t)) || occurs(var, &ft.ret),
        Type::Const(ct) => occurs(var, &ct.ty),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Type display helpers
// ---------------------------------------------------------------------------

fn alphabetic_var_name(index: usize) -> String {
    let letter = (b'a' + (index % 26) as u8) as char;
    let round = index / 26;
    if round == 0 {
        letter.to_string()
    } else {
        format!("{letter}{round}")
    }
}

/// Display a type with alphabetic names for type variables instead of `$0`, `$1`.
pub fn sanitize_type_display(ty: &Type) -> String {
    sanitize_type_pair_display(ty, &Type::None).0
}

/// Display two types with one shared variable namespace.
///
/// The same variable appears with the same name on both sides of a mismatch.
pub fn sanitize_type_pair_display(left: &Type, right: &Type) -> (String, String) {
    let mut vars = free_type_vars(left);
    vars.extend(free_type_vars(right));
    if vars.is_empty() {
        return (left.to_string(), right.to_string());
    }
    let mapping: BTreeMap<TypeVarId, String> = vars
        .into_iter()
        .enumerate()
        .map(|(i, var)| (var, alphabetic_var_name(i)))
        .collect();
    (
        display_with_mapping(left, &mapping),
        display_with_mapping(right, &mapping),
    )
}

fn display_with_mapping(ty: &Type, mapping: &BTreeMap<TypeVarId, String>) -> String {
    match ty {
        Type::Var(v) => mapping.get(v).cloned().unwrap_or_else(|| v.to_string()),
        Type::Func(ft) => {
            let args: Vec<String> = ft
                .args
                .iter()
                .map(|arg| display_with_mapping(arg, mapping))
                .collect();
            format!(
                "({}) -> {}",
                args.join(", "),
                display_with_mapping(&ft.ret, mapping)
            )
        }
        Type::Const(ct) => format!(
            "const {} = {}",
            display_with_mapping(&ct.ty, mapping),
            ct.value,
        ),
        leaf => leaf.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Substitution
// ---------------------------------------------------------------------------

/// A mapping from type variables to their resolved types.
///
/// Bindings only grow, except through [`Substitution::rollback_to`], which
/// undoes every binding made after a [`Snapshot`].
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    type_map: BTreeMap<TypeVarId, Type>,
    trail: Vec<TypeVarId>,
}

/// A point in a substitution's binding history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot(usize);

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `var` to `ty`.
    ///
    /// Rebinding to a type-equal type is a no-op.
    ///
    /// # Panics
    ///
    /// Panics when `var` is already bound to a different type.
    pub fn bind(&mut self, var: TypeVarId, ty: Type) {
        if let Some(existing) = self.type_map.get(&var) {
            assert!(
                types_equal(existing, &ty),
                "type variable {var} is already bound to `{existing}`, cannot rebind to `{ty}`"
            );
            return;
        }
        self.type_map.insert(var, ty);
        self.trail.push(var);
    }

    pub fn lookup(&self, var: TypeVarId) -> Option<&Type> {
        self.type_map.get(&var)
    }

    pub fn is_bound(&self, var: TypeVarId) -> bool {
        self.type_map.contains_key(&var)
    }

    pub fn len(&self) -> usize {
        self.type_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.type_map.is_empty()
    }

    pub fn bindings(&self) -> &BTreeMap<TypeVarId, Type> {
        &self.type_map
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.trail.len())
    }

    /// Undo every binding made since `snapshot`.
    pub fn rollback_to(&mut self, snapshot: Snapshot) {
        while self.trail.len() > snapshot.0 {
            if let Some(var) = self.trail.pop() {
                self.type_map.remove(&var);
            }
        }
    }

    /// Follow a chain of bound variables until reaching an unbound variable
    /// or a non-variable type. Only the head is resolved.
    ///
    /// # Panics
    ///
    /// Panics on a cyclic chain. The occurs check makes that unreachable
    /// through unification.
    pub fn resolve(&self, ty: &Type) -> Type {
        let mut current = ty;
        let mut steps = 0;
        while let Type::Var(var) = current {
            let Some(next) = self.type_map.get(var) else {
                break;
            };
            steps += 1;
            assert!(
                steps <= self.type_map.len(),
                "cyclic substitution chain through {var}"
            );
            current = next;
        }
        current.clone()
    }

    /// Apply this substitution to a type, replacing all bound variables.
    ///
    /// # Panics
    ///
    /// Panics when a variable is reached again through its own binding.
    pub fn apply(&self, ty: &Type) -> Type {
        let mut active = Vec::new();
        self.apply_inner(ty, &mut active)
    }

    fn apply_inner(&self, ty: &Type, active: &mut Vec<TypeVarId>) -> Type {
        match ty {
            Type::Var(v) => match self.type_map.get(v) {
                Some(resolved) => {
                    assert!(
                        !active.contains(v),
                        "cyclic substitution chain through {v}"
                    );
                    active.push(*v);
                    let applied = self.apply_inner(resolved, active);
                    active.pop();
                    applied
                }
                None => ty.clone(),
            },
            Type::Func(ft) => Type::Func(FuncType {
                args: ft.args.iter().map(|t| self.apply_inner(t, active)).collect(),
                ret: Box::new(self.apply_inner(&ft.ret, active)),
            }),
            Type::Const(ct) => Type::Const(ConstType {
                ty: Box::new(self.apply_inner(&ct.ty, active)),
                value: ct.value.clone(),
            }),
            // Leaves: no substitution needed.
            Type::Int
            | Type::Num
            | Type::Bool
            | Type::Str
            | Type::Any
            | Type::Error
            | Type::None => ty.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
