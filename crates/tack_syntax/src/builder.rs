//! The push-style builder protocol both front ends drive.
//!
//! A parser walks its input in document order and narrates what it sees by
//! calling these methods; the receiver keeps whatever hidden state it needs
//! (operand, type, array and parameter stacks in the AST assemblers, string
//! stacks in the pretty printer). Two concrete consumers ship with the
//! crate: [`SystemBuilder`](crate::system::SystemBuilder) assembles the
//! typed AST, [`PrettyPrinter`](crate::pretty::PrettyPrinter) re-emits
//! canonical text and doubles as a round-trip oracle. Tests substitute a
//! recording mock.
//!
//! Every method returns `Result<()>`: deep failures carry a structured
//! [`ParseError`](tack_base::ParseError) which the driver catches at the
//! nearest statement or declaration boundary, forwards to its
//! [`ErrorHandler`](tack_base::ErrorHandler), and resynchronises from.
//!
//! Calls arrive in depth-first, left-to-right document order. Operand
//! arities: unary operators pop one expression, binary two, ternary three;
//! `expr_call_end(n)` pops the n arguments plus the callee. After `done`
//! every further call fails with `AfterDone`.

use tack_base::Result;

use crate::ast::{AssignOp, BinaryOp, Prefix, Synchronisation, TernaryOp, UnaryOp};

/// The builder capability set.
pub trait Builder {
    // ------------------------------------------------------------------
    // Type construction
    // ------------------------------------------------------------------

    /// Duplicates the top of the type stack (multi-declarator lists).
    fn type_duplicate(&mut self) -> Result<()>;

    /// Discards the top of the type stack.
    fn type_pop(&mut self) -> Result<()>;

    fn type_bool(&mut self, prefix: Prefix) -> Result<()>;

    fn type_int(&mut self, prefix: Prefix) -> Result<()>;

    /// Pops two operands: the lower and upper bound expressions.
    fn type_bounded_int(&mut self, prefix: Prefix) -> Result<()>;

    fn type_channel(&mut self, prefix: Prefix) -> Result<()>;

    fn type_clock(&mut self) -> Result<()>;

    fn type_void(&mut self) -> Result<()>;

    /// Pops one operand: the scalar-set size expression.
    fn type_scalar(&mut self, prefix: Prefix) -> Result<()>;

    /// References a declared type alias by name.
    fn type_name(&mut self, prefix: Prefix, name: &str) -> Result<()>;

    /// Moves the top of the type stack plus its pending array dimensions
    /// into the field list for an enclosing `type_struct`.
    fn struct_field(&mut self, name: &str) -> Result<()>;

    /// Pops `fields` collected fields into a record type.
    fn type_struct(&mut self, prefix: Prefix, fields: usize) -> Result<()>;

    /// Moves a size expression (one operand) onto the array-dimension
    /// stack; `dim` counts the dimensions seen so far for this declarator.
    fn type_array_of_size(&mut self, dim: usize) -> Result<()>;

    /// Moves a scalar type (top of the type stack) onto the
    /// array-dimension stack.
    fn type_array_of_type(&mut self, dim: usize) -> Result<()>;

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// Binds a type alias; pops one type and the pending dimensions.
    fn decl_type_def(&mut self, name: &str) -> Result<()>;

    /// Declares a variable; pops the initialiser operand if `has_init`.
    fn decl_var(&mut self, name: &str, has_init: bool) -> Result<()>;

    /// Folds the last `count` operands into an initialiser list.
    fn decl_initialiser_list(&mut self, count: usize) -> Result<()>;

    /// Names the top initialiser operand; empty names leave positional
    /// initialisers untouched.
    fn decl_field_init(&mut self, name: &str) -> Result<()>;

    /// Adds a formal parameter from the top of the type stack.
    fn decl_parameter(&mut self, name: &str, by_ref: bool) -> Result<()>;

    /// Opens a function body; the return type is on the type stack and the
    /// parameter list has been collected via `decl_parameter`.
    fn decl_func_begin(&mut self, name: &str) -> Result<()>;

    fn decl_func_end(&mut self) -> Result<()>;

    /// One progress measure; pops the measure expression.
    fn decl_progress(&mut self, is_default: bool) -> Result<()>;

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn block_begin(&mut self) -> Result<()>;

    fn block_end(&mut self) -> Result<()>;

    fn empty_statement(&mut self) -> Result<()>;

    fn for_begin(&mut self) -> Result<()>;

    /// Pops three expressions (init, condition, step) and the body.
    fn for_end(&mut self) -> Result<()>;

    /// Opens an iteration `for (name : type)`; pops the binder type.
    fn iteration_begin(&mut self, name: &str) -> Result<()>;

    fn iteration_end(&mut self, name: &str) -> Result<()>;

    fn while_begin(&mut self) -> Result<()>;

    fn while_end(&mut self) -> Result<()>;

    fn do_while_begin(&mut self) -> Result<()>;

    fn do_while_end(&mut self) -> Result<()>;

    fn if_begin(&mut self) -> Result<()>;

    fn if_else(&mut self) -> Result<()>;

    fn if_end(&mut self, has_else: bool) -> Result<()>;

    fn expr_statement(&mut self) -> Result<()>;

    fn return_statement(&mut self, has_value: bool) -> Result<()>;

    fn break_statement(&mut self) -> Result<()>;

    fn continue_statement(&mut self) -> Result<()>;

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr_id(&mut self, name: &str) -> Result<()>;

    fn expr_nat(&mut self, value: i32) -> Result<()>;

    fn expr_true(&mut self) -> Result<()>;

    fn expr_false(&mut self) -> Result<()>;

    /// The callee is on the operand stack; arguments follow.
    fn expr_call_begin(&mut self) -> Result<()>;

    /// Pops `args` arguments plus the callee.
    fn expr_call_end(&mut self, args: usize) -> Result<()>;

    /// Pops index and array into a subscript expression.
    fn expr_array(&mut self) -> Result<()>;

    fn expr_post_increment(&mut self) -> Result<()>;

    fn expr_pre_increment(&mut self) -> Result<()>;

    fn expr_post_decrement(&mut self) -> Result<()>;

    fn expr_pre_decrement(&mut self) -> Result<()>;

    fn expr_assignment(&mut self, op: AssignOp) -> Result<()>;

    fn expr_unary(&mut self, op: UnaryOp) -> Result<()>;

    fn expr_binary(&mut self, op: BinaryOp) -> Result<()>;

    fn expr_ternary(&mut self, op: TernaryOp) -> Result<()>;

    fn expr_inline_if(&mut self) -> Result<()>;

    fn expr_comma(&mut self) -> Result<()>;

    fn expr_dot(&mut self, field: &str) -> Result<()>;

    fn expr_deadlock(&mut self) -> Result<()>;

    /// Opens a `forall (name : type)` scope; pops the binder type.
    fn expr_for_all_begin(&mut self, name: &str) -> Result<()>;

    /// Combines the body with the binder and closes the scope.
    fn expr_for_all_end(&mut self, name: &str) -> Result<()>;

    fn expr_exists_begin(&mut self, name: &str) -> Result<()>;

    fn expr_exists_end(&mut self, name: &str) -> Result<()>;

    // ------------------------------------------------------------------
    // Processes
    // ------------------------------------------------------------------

    /// Opens a template; collected parameters become its formal frame.
    fn proc_begin(&mut self, name: &str) -> Result<()>;

    fn proc_end(&mut self) -> Result<()>;

    /// Declares a location; pops the invariant if `has_invariant`.
    fn proc_state(&mut self, name: &str, has_invariant: bool) -> Result<()>;

    fn proc_state_urgent(&mut self, name: &str) -> Result<()>;

    fn proc_state_commit(&mut self, name: &str) -> Result<()>;

    /// Marks the initial location; at most once per template.
    fn proc_state_init(&mut self, name: &str) -> Result<()>;

    fn proc_edge_begin(&mut self, from: &str, to: &str, controllable: bool) -> Result<()>;

    fn proc_edge_end(&mut self, from: &str, to: &str) -> Result<()>;

    /// Adds a select binder `id : type` to the open edge; pops the type.
    fn proc_select(&mut self, id: &str) -> Result<()>;

    /// Marks the top of the operand stack as the open edge's guard.
    fn proc_guard(&mut self) -> Result<()>;

    /// Marks the top of the operand stack as the open edge's
    /// synchronisation channel, sent (`!`) or received (`?`).
    fn proc_sync(&mut self, sync: Synchronisation) -> Result<()>;

    /// Marks the top of the operand stack as the open edge's update.
    fn proc_update(&mut self) -> Result<()>;

    // ------------------------------------------------------------------
    // System
    // ------------------------------------------------------------------

    fn instantiation_begin(&mut self, id: &str, param_count: usize, template: &str) -> Result<()>;

    /// Pops `arg_count` argument expressions.
    fn instantiation_end(
        &mut self,
        id: &str,
        param_count: usize,
        template: &str,
        arg_count: usize,
    ) -> Result<()>;

    /// Adds a declared process to the running system line.
    fn process(&mut self, name: &str) -> Result<()>;

    /// Terminal; every call after this fails with `AfterDone`.
    fn done(&mut self) -> Result<()>;

    fn inc_proc_priority(&mut self) -> Result<()>;

    fn inc_chan_priority(&mut self) -> Result<()>;

    /// Records a channel priority entry; pops the channel expression.
    fn chan_priority(&mut self) -> Result<()>;

    /// Records the default channel priority level.
    fn default_chan_priority(&mut self) -> Result<()>;

    /// Stamps the named process with the current priority level.
    fn proc_priority(&mut self, name: &str) -> Result<()>;

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Position update from the front end; receivers may ignore it.
    fn add_position(&mut self, position: u32, offset: u32, line: u32, path: &str) -> Result<()>;

    fn handle_error(&mut self, message: &str) -> Result<()>;

    fn handle_warning(&mut self, message: &str) -> Result<()>;
}
