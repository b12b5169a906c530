//! E2E: the textual front end against the AST assembler.
//!
//! Whole-file parses, variant gating, and the diagnostics that come out of
//! broken models.

mod common;

use common::{parse_text, parse_text_collect};
use tack_base::{ErrorHandler, ErrorLog, Severity};
use tack_syntax::{parse_xta, Expr, Payload, StartSymbol, SystemBuilder, TypeId};

#[test]
fn a_small_network_parses_end_to_end() {
    let system = parse_text(
        r#"
const int N = 2;
chan handoff;
int tokens = N;

process Station(int id) {
    clock c;
    state wait, hold{c <= 3};
    init wait;
    trans
        wait -> hold {
            guard tokens > 0;
            sync handoff?;
            assign tokens = tokens - 1, c = 0;
        },
        hold -> wait {
            sync handoff!;
            assign tokens = tokens + 1;
        };
}

A = Station(0);
B = Station(1);
system A, B;
"#,
    );

    assert_eq!(system.declarations.variables.len(), 3);
    assert_eq!(system.templates.len(), 1);
    assert_eq!(system.instantiations.len(), 2);
    assert_eq!(system.processes.len(), 2);

    // N folded to a constant payload.
    let n = system.symbols.resolve_local("N", tack_syntax::FrameId::ROOT).unwrap();
    assert_eq!(system.symbols.payload(n), Some(&Payload::Constant(2)));
    // tokens got its initialiser.
    let station = system.template("Station").unwrap();
    assert!(station.edges[0].update.is_some());
    assert!(station.locations[1].invariant.is_some());
}

#[test]
fn typedefs_resolve_through_the_alias() {
    let system = parse_text(
        r#"
typedef int[0,7] id_t;
id_t current;
process P() { state w; init w; }
I = P();
system I;
"#,
    );
    let current = system
        .symbols
        .resolve_local("current", tack_syntax::FrameId::ROOT)
        .unwrap();
    let ty = system.symbols.ty(current).unwrap();
    assert_eq!(system.types.class(ty), TypeId::NAMED);
    let underlying = system.types.unalias(ty);
    assert_eq!(system.types.integer_range(underlying), Some((0, 7)));
}

#[test]
fn old_syntax_accepts_old_keywords_only() {
    let source = r#"
clock x;
process P() {
    state s0, s1;
    commit s1;
    init s0;
    trans
        s0 -> s1 { guard x > 1; assign x := 0; };
}
system P;
"#;
    let mut builder = SystemBuilder::new();
    let mut log = ErrorLog::new();
    let status = parse_xta(source, &mut builder, &mut log, false, StartSymbol::XtaFile);
    assert_eq!(status, 0, "diagnostics: {:?}", log.diagnostics());

    let system = builder.into_system();
    assert!(system.template("P").unwrap().locations[1].committed);
    // A parameterless template may sit on the system line directly.
    assert_eq!(system.processes.len(), 1);
}

#[test]
fn duplicate_declarations_are_reported_but_parsing_continues() {
    let (builder, log, status) = parse_text_collect(
        r#"
int x;
int x;
clock y;
process P() { state w; init w; }
I = P();
system I;
"#,
    );
    assert_eq!(status, -1);
    assert!(log
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("already declared")));
    // Everything after the duplicate still landed.
    assert!(builder.is_done());
    let system = builder.into_system();
    assert!(system.symbols.resolve_local("y", tack_syntax::FrameId::ROOT).is_some());
    assert_eq!(system.templates.len(), 1);
}

#[test]
fn recursive_functions_are_rejected() {
    let (_, log, status) = parse_text_collect(
        r#"
int f() {
    return f();
}
process P() { state w; init w; }
I = P();
system I;
"#,
    );
    assert_eq!(status, -1);
    assert!(log
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("must not call itself")));
}

#[test]
fn call_arity_is_enforced() {
    let (_, log, status) = parse_text_collect(
        r#"
int twice(int v) { return v + v; }
int a = twice(1, 2);
process P() { state w; init w; }
I = P();
system I;
"#,
    );
    assert_eq!(status, -1);
    assert!(log
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("expects 1 arguments but got 2")));
}

#[test]
fn instantiation_arity_is_enforced() {
    let (_, log, status) = parse_text_collect(
        r#"
process P(int a, int b) { state w; init w; }
I = P(1);
system I;
"#,
    );
    assert_eq!(status, -1);
    assert!(log
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("expects 2 arguments but got 1")));
}

#[test]
fn conflicting_location_flags_are_reported() {
    let (_, log, status) = parse_text_collect(
        r#"
process P() {
    state w;
    commit w;
    urgent w;
    init w;
}
I = P();
system I;
"#,
    );
    assert_eq!(status, -1);
    assert!(log
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("both committed and urgent")));
}

#[test]
fn edges_to_unknown_states_are_reported() {
    let (_, log, status) = parse_text_collect(
        r#"
process P() {
    state w;
    init w;
    trans w -> ghost { };
}
I = P();
system I;
"#,
    );
    assert_eq!(status, -1);
    assert!(log
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("not a declared location")));
}

#[test]
fn dot_on_scalars_is_reported() {
    let (_, log, status) = parse_text_collect(
        r#"
int x;
int y = x.field;
process P() { state w; init w; }
I = P();
system I;
"#,
    );
    assert_eq!(status, -1);
    assert!(log
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("structure or a process")));
}

#[test]
fn record_members_are_checked_against_the_fields() {
    let system = parse_text(
        r#"
typedef struct { int lo; int hi; } range_t;
range_t r;
int probe = r.lo;
process P() { state w; init w; }
I = P();
system I;
"#,
    );
    let probe = &system.declarations.variables[1];
    assert!(matches!(probe.init, Some(Expr::Dot { .. })));

    let (_, log, status) = parse_text_collect(
        r#"
typedef struct { int lo; int hi; } range_t;
range_t r;
int probe = r.missing;
process P() { state w; init w; }
I = P();
system I;
"#,
    );
    assert_eq!(status, -1);
    assert!(log
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("no member 'missing'")));
}

#[test]
fn warnings_do_not_fail_the_parse() {
    let mut builder = SystemBuilder::new();
    let mut log = ErrorLog::new();
    log.handle_warning("advisory only");
    let status = parse_xta(
        "int x;\nprocess P() { state w; init w; }\nI = P();\nsystem I;\n",
        &mut builder,
        &mut log,
        true,
        StartSymbol::XtaFile,
    );
    assert_eq!(status, 0);
    assert_eq!(log.diagnostics()[0].severity, Severity::Warning);
}
