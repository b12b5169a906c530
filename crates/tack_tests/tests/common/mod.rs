//! Shared helpers: a recording mock builder and parse wrappers.

// Each test binary compiles this module separately and uses a subset.
#![allow(dead_code)]

use tack_base::{ErrorLog, Result};
use tack_syntax::{
    parse_xta, AssignOp, BinaryOp, Builder, Prefix, StartSymbol, Synchronisation, System,
    SystemBuilder, TernaryOp, UnaryOp,
};

/// Parses a full XTA file into a [`System`], asserting success.
#[allow(dead_code)]
pub fn parse_text(source: &str) -> System {
    let mut builder = SystemBuilder::new();
    let mut log = ErrorLog::new();
    let status = parse_xta(source, &mut builder, &mut log, true, StartSymbol::XtaFile);
    assert_eq!(status, 0, "diagnostics: {:?}", log.diagnostics());
    builder.into_system()
}

/// Parses a full XTA file, returning the builder and the log regardless of
/// success.
#[allow(dead_code)]
pub fn parse_text_collect(source: &str) -> (SystemBuilder, ErrorLog, i32) {
    let mut builder = SystemBuilder::new();
    let mut log = ErrorLog::new();
    let status = parse_xta(source, &mut builder, &mut log, true, StartSymbol::XtaFile);
    (builder, log, status)
}

/// A builder that records the event sequence it receives.
///
/// Every method appends one line and succeeds, so drivers can be tested in
/// isolation from the AST assembler's checks.
#[derive(Debug, Default)]
pub struct RecordingBuilder {
    pub events: Vec<String>,
}

#[allow(dead_code)]
impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_sequence(&self, expected: &[&str]) -> bool {
        self.events
            .windows(expected.len())
            .any(|window| window.iter().map(String::as_str).eq(expected.iter().copied()))
    }

    fn push(&mut self, event: String) -> Result<()> {
        self.events.push(event);
        Ok(())
    }
}

impl Builder for RecordingBuilder {
    fn type_duplicate(&mut self) -> Result<()> {
        self.push("type_duplicate".into())
    }

    fn type_pop(&mut self) -> Result<()> {
        self.push("type_pop".into())
    }

    fn type_bool(&mut self, prefix: Prefix) -> Result<()> {
        self.push(format!("type_bool({:?})", prefix))
    }

    fn type_int(&mut self, prefix: Prefix) -> Result<()> {
        self.push(format!("type_int({:?})", prefix))
    }

    fn type_bounded_int(&mut self, prefix: Prefix) -> Result<()> {
        self.push(format!("type_bounded_int({:?})", prefix))
    }

    fn type_channel(&mut self, prefix: Prefix) -> Result<()> {
        self.push(format!("type_channel({:?})", prefix))
    }

    fn type_clock(&mut self) -> Result<()> {
        self.push("type_clock".into())
    }

    fn type_void(&mut self) -> Result<()> {
        self.push("type_void".into())
    }

    fn type_scalar(&mut self, prefix: Prefix) -> Result<()> {
        self.push(format!("type_scalar({:?})", prefix))
    }

    fn type_name(&mut self, prefix: Prefix, name: &str) -> Result<()> {
        self.push(format!("type_name({:?}, {})", prefix, name))
    }

    fn struct_field(&mut self, name: &str) -> Result<()> {
        self.push(format!("struct_field({})", name))
    }

    fn type_struct(&mut self, prefix: Prefix, fields: usize) -> Result<()> {
        self.push(format!("type_struct({:?}, {})", prefix, fields))
    }

    fn type_array_of_size(&mut self, dim: usize) -> Result<()> {
        self.push(format!("type_array_of_size({})", dim))
    }

    fn type_array_of_type(&mut self, dim: usize) -> Result<()> {
        self.push(format!("type_array_of_type({})", dim))
    }

    fn decl_type_def(&mut self, name: &str) -> Result<()> {
        self.push(format!("decl_type_def({})", name))
    }

    fn decl_var(&mut self, name: &str, has_init: bool) -> Result<()> {
        self.push(format!("decl_var({}, {})", name, has_init))
    }

    fn decl_initialiser_list(&mut self, count: usize) -> Result<()> {
        self.push(format!("decl_initialiser_list({})", count))
    }

    fn decl_field_init(&mut self, name: &str) -> Result<()> {
        self.push(format!("decl_field_init({})", name))
    }

    fn decl_parameter(&mut self, name: &str, by_ref: bool) -> Result<()> {
        self.push(format!("decl_parameter({}, {})", name, by_ref))
    }

    fn decl_func_begin(&mut self, name: &str) -> Result<()> {
        self.push(format!("decl_func_begin({})", name))
    }

    fn decl_func_end(&mut self) -> Result<()> {
        self.push("decl_func_end".into())
    }

    fn decl_progress(&mut self, is_default: bool) -> Result<()> {
        self.push(format!("decl_progress({})", is_default))
    }

    fn block_begin(&mut self) -> Result<()> {
        self.push("block_begin".into())
    }

    fn block_end(&mut self) -> Result<()> {
        self.push("block_end".into())
    }

    fn empty_statement(&mut self) -> Result<()> {
        self.push("empty_statement".into())
    }

    fn for_begin(&mut self) -> Result<()> {
        self.push("for_begin".into())
    }

    fn for_end(&mut self) -> Result<()> {
        self.push("for_end".into())
    }

    fn iteration_begin(&mut self, name: &str) -> Result<()> {
        self.push(format!("iteration_begin({})", name))
    }

    fn iteration_end(&mut self, name: &str) -> Result<()> {
        self.push(format!("iteration_end({})", name))
    }

    fn while_begin(&mut self) -> Result<()> {
        self.push("while_begin".into())
    }

    fn while_end(&mut self) -> Result<()> {
        self.push("while_end".into())
    }

    fn do_while_begin(&mut self) -> Result<()> {
        self.push("do_while_begin".into())
    }

    fn do_while_end(&mut self) -> Result<()> {
        self.push("do_while_end".into())
    }

    fn if_begin(&mut self) -> Result<()> {
        self.push("if_begin".into())
    }

    fn if_else(&mut self) -> Result<()> {
        self.push("if_else".into())
    }

    fn if_end(&mut self, has_else: bool) -> Result<()> {
        self.push(format!("if_end({})", has_else))
    }

    fn expr_statement(&mut self) -> Result<()> {
        self.push("expr_statement".into())
    }

    fn return_statement(&mut self, has_value: bool) -> Result<()> {
        self.push(format!("return_statement({})", has_value))
    }

    fn break_statement(&mut self) -> Result<()> {
        self.push("break_statement".into())
    }

    fn continue_statement(&mut self) -> Result<()> {
        self.push("continue_statement".into())
    }

    fn expr_id(&mut self, name: &str) -> Result<()> {
        self.push(format!("expr_id({})", name))
    }

    fn expr_nat(&mut self, value: i32) -> Result<()> {
        self.push(format!("expr_nat({})", value))
    }

    fn expr_true(&mut self) -> Result<()> {
        self.push("expr_true".into())
    }

    fn expr_false(&mut self) -> Result<()> {
        self.push("expr_false".into())
    }

    fn expr_call_begin(&mut self) -> Result<()> {
        self.push("expr_call_begin".into())
    }

    fn expr_call_end(&mut self, args: usize) -> Result<()> {
        self.push(format!("expr_call_end({})", args))
    }

    fn expr_array(&mut self) -> Result<()> {
        self.push("expr_array".into())
    }

    fn expr_post_increment(&mut self) -> Result<()> {
        self.push("expr_post_increment".into())
    }

    fn expr_pre_increment(&mut self) -> Result<()> {
        self.push("expr_pre_increment".into())
    }

    fn expr_post_decrement(&mut self) -> Result<()> {
        self.push("expr_post_decrement".into())
    }

    fn expr_pre_decrement(&mut self) -> Result<()> {
        self.push("expr_pre_decrement".into())
    }

    fn expr_assignment(&mut self, op: AssignOp) -> Result<()> {
        self.push(format!("expr_assignment({:?})", op))
    }

    fn expr_unary(&mut self, op: UnaryOp) -> Result<()> {
        self.push(format!("expr_unary({:?})", op))
    }

    fn expr_binary(&mut self, op: BinaryOp) -> Result<()> {
        self.push(format!("expr_binary({:?})", op))
    }

    fn expr_ternary(&mut self, op: TernaryOp) -> Result<()> {
        self.push(format!("expr_ternary({:?})", op))
    }

    fn expr_inline_if(&mut self) -> Result<()> {
        self.push("expr_inline_if".into())
    }

    fn expr_comma(&mut self) -> Result<()> {
        self.push("expr_comma".into())
    }

    fn expr_dot(&mut self, field: &str) -> Result<()> {
        self.push(format!("expr_dot({})", field))
    }

    fn expr_deadlock(&mut self) -> Result<()> {
        self.push("expr_deadlock".into())
    }

    fn expr_for_all_begin(&mut self, name: &str) -> Result<()> {
        self.push(format!("expr_for_all_begin({})", name))
    }

    fn expr_for_all_end(&mut self, name: &str) -> Result<()> {
        self.push(format!("expr_for_all_end({})", name))
    }

    fn expr_exists_begin(&mut self, name: &str) -> Result<()> {
        self.push(format!("expr_exists_begin({})", name))
    }

    fn expr_exists_end(&mut self, name: &str) -> Result<()> {
        self.push(format!("expr_exists_end({})", name))
    }

    fn proc_begin(&mut self, name: &str) -> Result<()> {
        self.push(format!("proc_begin({})", name))
    }

    fn proc_end(&mut self) -> Result<()> {
        self.push("proc_end".into())
    }

    fn proc_state(&mut self, name: &str, has_invariant: bool) -> Result<()> {
        self.push(format!("proc_state({}, {})", name, has_invariant))
    }

    fn proc_state_urgent(&mut self, name: &str) -> Result<()> {
        self.push(format!("proc_state_urgent({})", name))
    }

    fn proc_state_commit(&mut self, name: &str) -> Result<()> {
        self.push(format!("proc_state_commit({})", name))
    }

    fn proc_state_init(&mut self, name: &str) -> Result<()> {
        self.push(format!("proc_state_init({})", name))
    }

    fn proc_edge_begin(&mut self, from: &str, to: &str, controllable: bool) -> Result<()> {
        self.push(format!("proc_edge_begin({}, {}, {})", from, to, controllable))
    }

    fn proc_edge_end(&mut self, from: &str, to: &str) -> Result<()> {
        self.push(format!("proc_edge_end({}, {})", from, to))
    }

    fn proc_select(&mut self, id: &str) -> Result<()> {
        self.push(format!("proc_select({})", id))
    }

    fn proc_guard(&mut self) -> Result<()> {
        self.push("proc_guard".into())
    }

    fn proc_sync(&mut self, sync: Synchronisation) -> Result<()> {
        self.push(format!("proc_sync({:?})", sync))
    }

    fn proc_update(&mut self) -> Result<()> {
        self.push("proc_update".into())
    }

    fn instantiation_begin(&mut self, id: &str, param_count: usize, template: &str) -> Result<()> {
        self.push(format!(
            "instantiation_begin({}, {}, {})",
            id, param_count, template
        ))
    }

    fn instantiation_end(
        &mut self,
        id: &str,
        param_count: usize,
        template: &str,
        arg_count: usize,
    ) -> Result<()> {
        self.push(format!(
            "instantiation_end({}, {}, {}, {})",
            id, param_count, template, arg_count
        ))
    }

    fn process(&mut self, name: &str) -> Result<()> {
        self.push(format!("process({})", name))
    }

    fn done(&mut self) -> Result<()> {
        self.push("done".into())
    }

    fn inc_proc_priority(&mut self) -> Result<()> {
        self.push("inc_proc_priority".into())
    }

    fn inc_chan_priority(&mut self) -> Result<()> {
        self.push("inc_chan_priority".into())
    }

    fn chan_priority(&mut self) -> Result<()> {
        self.push("chan_priority".into())
    }

    fn default_chan_priority(&mut self) -> Result<()> {
        self.push("default_chan_priority".into())
    }

    fn proc_priority(&mut self, name: &str) -> Result<()> {
        self.push(format!("proc_priority({})", name))
    }

    fn add_position(&mut self, _position: u32, _offset: u32, _line: u32, _path: &str) -> Result<()> {
        Ok(())
    }

    fn handle_error(&mut self, message: &str) -> Result<()> {
        self.push(format!("handle_error({})", message))
    }

    fn handle_warning(&mut self, message: &str) -> Result<()> {
        self.push(format!("handle_warning({})", message))
    }
}
