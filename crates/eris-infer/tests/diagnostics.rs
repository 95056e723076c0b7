use insta::assert_snapshot;

use eris_ast::{BinOp, DeclTable, ExprId, FileId, Lit, NodeId, Span, Spanned, TypeAnnotation};
use eris_diag::{Diagnostic, SourceLocation};
use eris_infer::constant::literal;
use eris_infer::{Session, SessionOptions, Symbol, SymbolTable, UnifyAction};
use eris_types::{Type, TypeInfo};

fn session() -> Session {
    Session::with_options(SessionOptions {
        var_offset: Some(0),
        ..SessionOptions::default()
    })
}

fn span(start: u32, end: u32) -> Span {
    Span::new(FileId(0), start, end)
}

fn render(diag: &Diagnostic) -> String {
    match diag.location {
        Some(loc) => format!("{}:{}..{}: {diag}", loc.file_id, loc.start, loc.end),
        None => diag.to_string(),
    }
}

fn only_diagnostic(s: &Session) -> String {
    let diags = s.diagnostics();
    assert_eq!(diags.len(), 1, "expected exactly one diagnostic: {diags:?}");
    render(&diags[0])
}

#[test]
fn annotation_disagrees_with_literal() {
    let mut s = session();
    let mut decls = DeclTable::new();
    let mut table = SymbolTable::new();

    let x = decls.declare(
        "x",
        span(4, 5),
        Some(Spanned::new(TypeAnnotation::named("str"), span(7, 10))),
    );
    let t = s.fresh_type();
    table.declare(Symbol::bind(decls.get(x).unwrap(), TypeInfo::new(t.clone())));
    let one = literal(&Lit::Num(1.0));
    s.expect(&t, &one.ty, ExprId(0));
    s.close_scope(&mut table);

    assert_snapshot!(
        only_diagnostic(&s),
        @"0:7..10: error[E0001]: type mismatch: expected `str`, got `num`"
    );
}

#[test]
fn unknown_annotation_type() {
    let mut s = session();
    let mut decls = DeclTable::new();
    let mut table = SymbolTable::new();

    let x = decls.declare(
        "x",
        span(4, 5),
        Some(Spanned::new(TypeAnnotation::named("float"), span(7, 12))),
    );
    table.declare(Symbol::bind(decls.get(x).unwrap(), TypeInfo::new(Type::Num)));
    s.close_scope(&mut table);

    assert_snapshot!(only_diagnostic(&s), @"0:7..12: error[E0007]: unknown type `float`");
}

#[test]
fn adding_bools() {
    let mut s = session();
    let yes = literal(&Lit::Bool(true));
    s.binary_op(BinOp::Add, &yes, &yes, ExprId(0));

    let diags = s.diagnostics();
    assert_eq!(diags.len(), 1);
    assert_snapshot!(
        &diags[0].message,
        @"type `bool` does not implement trait `Addable`"
    );
    assert_eq!(
        diags[0].help.as_deref(),
        Some("the operation requires `Addable`")
    );
}

#[test]
fn call_with_missing_argument() {
    let mut s = session();
    let f = Type::func(vec![Type::Num], Type::Num);
    s.call(&f, &[], ExprId(2));

    let diags = s.diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code.as_deref(), Some("E0002"));
    assert_snapshot!(
        &diags[0].message,
        @"function takes 1 argument but is used with 0: expected `(num) -> num`, got `() -> a`"
    );
}

#[test]
fn self_application_is_infinite() {
    let mut s = session();
    let v = s.fresh_type();
    s.expect(&v, &Type::func(vec![v.clone()], Type::Num), ExprId(3));

    assert_snapshot!(
        only_diagnostic(&s),
        @"error[E0003]: infinite type: `a` would have to contain itself in `(a) -> num`"
    );
}

#[test]
fn undefined_name() {
    let mut s = session();
    let table = SymbolTable::new();
    let symbol = s.lookup_or_unknown(&table, "y", ExprId(4), Some(span(12, 13)));
    let placeholder = symbol.ty().clone();

    // The placeholder must not produce a second diagnostic.
    s.expect(&Type::Num, &placeholder, ExprId(5));

    assert_snapshot!(only_diagnostic(&s), @"0:12..13: error[E0006]: unknown identifier `y`");
}

#[test]
fn unconstrained_declaration() {
    let mut s = session();
    let mut decls = DeclTable::new();
    let mut table = SymbolTable::new();

    let z = decls.declare("z", span(20, 21), None);
    let t = s.fresh_type();
    table.declare(Symbol::bind(decls.get(z).unwrap(), TypeInfo::new(t)));
    s.close_scope(&mut table);

    assert_snapshot!(
        only_diagnostic(&s),
        @"0:20..21: error[E0004]: cannot infer a type for `z`: inference stopped at `a`"
    );
}

#[test]
fn variables_are_renamed_in_messages() {
    let mut s = session();
    let _skipped = s.fresh_var();
    let a = s.fresh_type();
    let b = s.fresh_type();
    s.expect(&Type::func(vec![a], b), &Type::Num, ExprId(0));

    assert_snapshot!(
        only_diagnostic(&s),
        @"error[E0001]: type mismatch: expected `(a) -> b`, got `num`"
    );
}

#[test]
fn nested_mismatch_names_the_innermost_pair() {
    let mut s = session();
    let a = s.fresh_type();
    let b = s.fresh_type();
    s.expect(
        &Type::func(vec![a.clone()], Type::Bool),
        &Type::func(vec![b], Type::Str),
        ExprId(0),
    );

    assert_snapshot!(
        only_diagnostic(&s),
        @"error[E0001]: type mismatch: expected `bool`, got `str`"
    );
    assert_eq!(s.apply(&a), a, "argument binding was rolled back");
}

#[test]
fn finish_fails_with_first_diagnostic() {
    let mut s = session();
    s.expect(&Type::Str, &Type::Int, ExprId(0));
    let err = s.finish().unwrap_err();

    assert_snapshot!(err.to_string(), @"error[E0001]: type mismatch: expected `str`, got `int`");
}

#[test]
fn finish_keeps_the_originating_node() {
    let mut s = session();
    s.expect(&Type::Str, &Type::Num, ExprId(42));
    let err = s.finish().unwrap_err();

    assert_eq!(err.diagnostics()[0].origin, Some(NodeId::Expr(ExprId(42))));
    assert_eq!(err.for_node(NodeId::Expr(ExprId(42))).count(), 1);
    assert_eq!(err.for_node(NodeId::Expr(ExprId(7))).count(), 0);
}

#[test]
fn annotation_mismatch_points_at_the_declaration() {
    let mut s = session();
    let mut decls = DeclTable::new();
    let mut table = SymbolTable::new();

    let x = decls.declare(
        "x",
        span(4, 5),
        Some(Spanned::new(TypeAnnotation::named("str"), span(7, 10))),
    );
    table.declare(Symbol::bind(decls.get(x).unwrap(), TypeInfo::new(Type::Num)));
    s.close_scope(&mut table);
    let err = s.finish().unwrap_err();

    let diags: Vec<_> = err.for_node(NodeId::Decl(x)).collect();
    assert_eq!(diags.len(), 1);
    assert_snapshot!(
        render(diags[0]),
        @"0:7..10: error[E0001]: type mismatch: expected `str`, got `num`"
    );
    assert_eq!(diags[0].labels.len(), 1);
    assert_eq!(
        diags[0].labels[0].location,
        SourceLocation {
            file_id: 0,
            start: 4,
            end: 5
        }
    );
    assert_eq!(diags[0].labels[0].message, "declared here");
}

#[test]
fn open_operand_is_reported_once_across_scope_and_finish() {
    let mut s = session();
    let mut decls = DeclTable::new();
    let mut table = SymbolTable::new();

    let y = decls.declare("y", span(0, 1), None);
    let t = s.fresh_type();
    table.declare(Symbol::bind(decls.get(y).unwrap(), TypeInfo::new(t.clone())));
    let operand = TypeInfo::new(t);
    s.binary_op(BinOp::Add, &operand, &operand, ExprId(0));
    s.close_scope(&mut table);
    let err = s.finish().unwrap_err();

    assert_eq!(err.diagnostics().len(), 1);
    assert_snapshot!(
        render(&err.diagnostics()[0]),
        @"0:0..1: error[E0004]: cannot infer a type for `y`: inference stopped at `a`"
    );
}

#[test]
fn unify_trace_serializes() {
    let mut s = Session::with_options(SessionOptions {
        trace: true,
        var_offset: Some(0),
        ..SessionOptions::default()
    });
    let t = s.fresh_type();
    s.unify(&t, &Type::Num).unwrap();

    let json = serde_json::to_string(s.unify_trace()).unwrap();
    assert_snapshot!(
        json,
        @r#"[{"step":1,"action":"bind","left":"$0","right":"num","detail":"$0 := num"}]"#
    );
}

#[test]
fn failed_unify_trace_ends_in_rollback() {
    let mut s = Session::with_options(SessionOptions {
        trace: true,
        var_offset: Some(0),
        ..SessionOptions::default()
    });
    let a = s.fresh_type();
    let _ = s.unify(
        &Type::func(vec![a], Type::Bool),
        &Type::func(vec![Type::Num], Type::Str),
    );

    let actions: Vec<UnifyAction> = s.unify_trace().iter().map(|step| step.action).collect();
    assert_eq!(
        actions,
        vec![
            UnifyAction::Decompose,
            UnifyAction::Bind,
            UnifyAction::Error,
            UnifyAction::Rollback,
        ]
    );
    let last = s.unify_trace().last().unwrap();
    assert_eq!(last.detail, "undid 1 binding(s)");
}

#[test]
fn trace_respects_limit() {
    let mut s = Session::with_options(SessionOptions {
        trace: true,
        trace_limit: 2,
        var_offset: Some(0),
    });
    for _ in 0..5 {
        s.unify(&Type::Num, &Type::Num).unwrap();
    }
    assert_eq!(s.unify_trace().len(), 2);
}
