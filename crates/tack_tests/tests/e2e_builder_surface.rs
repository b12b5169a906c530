//! E2E: driving the builder protocol directly.
//!
//! Covers the corners no grammar path reaches — scalar-indexed arrays,
//! explicit type-stack management, priority stamping — plus the terminal
//! `done` contract, uniformly against both shipped consumers.

mod common;

use tack_base::ErrorKind;
use tack_syntax::{
    Builder, Payload, Prefix, PrettyPrinter, SystemBuilder, TypeId,
};

#[test]
fn scalar_indexed_arrays_via_type_array_of_type() {
    let mut sb = SystemBuilder::new();

    // typedef scalar[3] node_t;
    sb.expr_nat(3).unwrap();
    sb.type_scalar(Prefix::None).unwrap();
    sb.decl_type_def("node_t").unwrap();

    // int visits[node_t];
    sb.type_int(Prefix::None).unwrap();
    sb.type_name(Prefix::None, "node_t").unwrap();
    sb.type_array_of_type(1).unwrap();
    sb.decl_var("visits", false).unwrap();
    sb.done().unwrap();

    let system = sb.into_system();
    let visits = system
        .symbols
        .resolve_local("visits", tack_syntax::FrameId::ROOT)
        .unwrap();
    let ty = system.symbols.ty(visits).unwrap();
    assert_eq!(system.types.class(ty), TypeId::ARRAY);
    assert_eq!(system.types.first_sub_type(ty), TypeId::INT);
    // The index type is the named scalar alias itself.
    let index = system.types.second_sub_type(ty);
    assert_eq!(system.types.class(index), TypeId::NAMED);
}

#[test]
fn type_duplicate_and_pop_manage_the_stack() {
    let mut sb = SystemBuilder::new();
    sb.type_int(Prefix::Const).unwrap();
    sb.type_duplicate().unwrap();
    sb.type_pop().unwrap();
    sb.expr_nat(1).unwrap();
    sb.decl_var("one", true).unwrap();
    sb.done().unwrap();

    let system = sb.into_system();
    let one = system
        .symbols
        .resolve_local("one", tack_syntax::FrameId::ROOT)
        .unwrap();
    assert!(system.symbols.ty(one).unwrap().is_constant());
    assert_eq!(system.symbols.payload(one), Some(&Payload::Constant(1)));
}

#[test]
fn type_pop_on_empty_stack_is_an_error() {
    let mut sb = SystemBuilder::new();
    assert!(sb.type_pop().is_err());
}

#[test]
fn proc_priority_stamps_named_processes() {
    let mut sb = SystemBuilder::new();
    sb.proc_begin("T").unwrap();
    sb.proc_state("s", false).unwrap();
    sb.proc_state_init("s").unwrap();
    sb.proc_end().unwrap();

    sb.process("T").unwrap();
    sb.inc_proc_priority().unwrap();
    sb.proc_priority("T").unwrap();
    sb.done().unwrap();

    let system = sb.into_system();
    assert_eq!(system.processes[0].priority, 1);
}

#[test]
fn done_is_terminal_for_the_system_builder() {
    let mut sb = SystemBuilder::new();
    sb.done().unwrap();
    for err in [
        sb.type_clock().unwrap_err(),
        sb.expr_nat(1).unwrap_err(),
        sb.proc_begin("T").unwrap_err(),
        sb.process("T").unwrap_err(),
        sb.done().unwrap_err(),
    ] {
        assert_eq!(err.kind, ErrorKind::AfterDone);
    }
}

#[test]
fn both_consumers_accept_the_same_event_stream() {
    fn drive(b: &mut dyn Builder) {
        b.type_int(Prefix::None).unwrap();
        b.expr_nat(5).unwrap();
        b.decl_var("x", true).unwrap();
        b.proc_begin("T").unwrap();
        b.proc_state("s0", false).unwrap();
        b.proc_state("s1", false).unwrap();
        b.proc_state_init("s0").unwrap();
        b.proc_edge_begin("s0", "s1", true).unwrap();
        b.expr_id("x").unwrap();
        b.expr_nat(3).unwrap();
        b.expr_binary(tack_syntax::BinaryOp::Lt).unwrap();
        b.proc_guard().unwrap();
        b.proc_edge_end("s0", "s1").unwrap();
        b.proc_end().unwrap();
        b.process("T").unwrap();
        b.done().unwrap();
    }

    let mut sb = SystemBuilder::new();
    drive(&mut sb);
    let system = sb.into_system();
    assert_eq!(system.template("T").unwrap().edges.len(), 1);

    let mut pp = PrettyPrinter::new();
    drive(&mut pp);
    let text = pp.finish();
    assert!(text.contains("int x = 5;"));
    assert!(text.contains("s0 -> s1 {"));
    assert!(text.contains("guard (x < 3);"));
    assert!(text.contains("system T;"));
}

#[test]
fn pretty_printer_reports_errors_by_failing() {
    let mut pp = PrettyPrinter::new();
    assert!(pp.handle_error("boom").is_err());
}

#[test]
fn pretty_printer_warnings_do_not_fail() {
    let mut pp = PrettyPrinter::new();
    assert!(pp.handle_warning("advisory only").is_ok());
    assert_eq!(pp.output(), "");
}

#[test]
fn pretty_printer_ignores_position_updates() {
    let mut pp = PrettyPrinter::new();
    assert!(pp.add_position(12, 3, 2, "model.xta").is_ok());
    assert_eq!(pp.output(), "");
}
