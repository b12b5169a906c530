//! The AST-building consumer of the builder protocol.
//!
//! [`SystemBuilder`] assembles a [`System`] from builder events. It stays
//! deliberately shy of full type checking — that is a later pass — but a
//! handful of checks are much cheaper to do here, while the construction
//! context is still at hand:
//!
//! - locations are not both committed and urgent
//! - edge endpoints are declared locations of the open template
//! - the dot operator is applied to a structure or a process
//! - functions are not directly recursive
//! - calls and instantiations match their formal parameter count
//! - no name is declared twice in one frame
//! - type names refer to declared aliases
//! - processes on the system line are declared
//!
//! Edge labels use marker indices: `proc_guard`, `proc_sync`, and
//! `proc_update` remember the operand-stack depth of their expression, and
//! `proc_edge_end` extracts the marked operands highest-first so the labels
//! come off in the reverse order of their introduction. An unset marker
//! means the label is absent.

use std::collections::HashMap;

use tack_base::{ErrorKind, ParseError, Position, Result};

use crate::ast::{
    AssignOp, BinaryOp, ChanPriorityEntry, Declarations, Edge, Expr, Function, Instantiation,
    Location, Payload, Prefix, ProcessRef, ProgressMeasure, Statement, Sync, Synchronisation,
    System, Template, TernaryOp, UnaryOp, Variable,
};
use crate::builder::Builder;
use crate::expression::ExpressionBuilder;
use crate::symbols::{FrameId, SymbolId};
use crate::types::TypeId;

#[derive(Debug)]
struct FunctionInProgress {
    symbol: SymbolId,
    frame: FrameId,
    parameters: Vec<SymbolId>,
    locals: Vec<Variable>,
}

#[derive(Debug)]
struct EdgeInProgress {
    source: usize,
    target: usize,
    controllable: bool,
    select: Vec<SymbolId>,
    frame: Option<FrameId>,
    guard_mark: Option<usize>,
    sync_mark: Option<(usize, Synchronisation)>,
    update_mark: Option<usize>,
}

#[derive(Debug)]
struct TemplateInProgress {
    symbol: SymbolId,
    frame: FrameId,
    parameters: Vec<SymbolId>,
    declarations: Declarations,
    locations: Vec<Location>,
    init: Option<usize>,
    edges: Vec<Edge>,
    edge: Option<EdgeInProgress>,
}

/// Builds the typed AST; see the module docs for what is checked here.
#[derive(Debug, Default)]
pub struct SystemBuilder {
    core: ExpressionBuilder,
    declarations: Declarations,
    templates: Vec<Template>,
    instantiations: Vec<Instantiation>,
    processes: Vec<ProcessRef>,
    chan_priorities: Vec<ChanPriorityEntry>,
    tpl: Option<TemplateInProgress>,
    function: Option<FunctionInProgress>,
    pending_instantiation: Option<SymbolId>,
    pending_proc_priorities: HashMap<SymbolId, i32>,
    proc_priority_level: i32,
    chan_priority_level: i32,
    finished: bool,
}

impl SystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `done` has been accepted.
    pub fn is_done(&self) -> bool {
        self.finished
    }

    /// The last position the front end reported.
    pub fn position(&self) -> &Position {
        &self.core.position
    }

    /// Hands out the finished system. Call after `done`.
    pub fn into_system(self) -> System {
        System {
            types: self.core.types,
            symbols: self.core.symbols,
            declarations: self.declarations,
            templates: self.templates,
            instantiations: self.instantiations,
            processes: self.processes,
            chan_priorities: self.chan_priorities,
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.finished {
            return Err(ParseError::new(
                ErrorKind::AfterDone,
                "builder calls are not allowed after done",
            ));
        }
        Ok(())
    }

    fn ensure_template(&self) -> Result<()> {
        if self.tpl.is_none() {
            return Err(ParseError::new(
                ErrorKind::SyntaxError,
                "no template is open",
            ));
        }
        Ok(())
    }

    fn ensure_edge(&self) -> Result<()> {
        self.ensure_template()?;
        if self.tpl.as_ref().unwrap().edge.is_none() {
            return Err(ParseError::new(ErrorKind::SyntaxError, "no edge is open"));
        }
        Ok(())
    }

    /// Where variables, functions, aliases, and progress measures land.
    fn decls_mut(&mut self) -> &mut Declarations {
        match &mut self.tpl {
            Some(t) => &mut t.declarations,
            None => &mut self.declarations,
        }
    }

    /// Location index for a name in the open template.
    fn find_location(&self, name: &str, kind: ErrorKind) -> Result<usize> {
        let tpl = self.tpl.as_ref().expect("template checked by caller");
        let sym = self
            .core
            .symbols
            .resolve_local(name, tpl.frame)
            .ok_or_else(|| {
                ParseError::new(kind, format!("'{}' is not a declared location", name))
            })?;
        match self.core.symbols.payload(sym) {
            Some(Payload::Location(index)) => Ok(*index),
            _ => Err(ParseError::new(
                kind,
                format!("'{}' is not a declared location", name),
            )),
        }
    }

    /// Turns the collected parameter list into a record type, reference
    /// flags applied, and the symbols for the opened frame.
    fn seal_parameters(
        &mut self,
    ) -> Result<(TypeId, Vec<(String, TypeId)>)> {
        let params = std::mem::take(&mut self.core.params);
        let fields: Vec<(String, TypeId)> = params
            .into_iter()
            .map(|p| {
                let ty = if p.by_ref { p.ty.make_reference() } else { p.ty };
                (p.name, ty)
            })
            .collect();
        let record = self.core.types.add_record(fields.clone())?;
        Ok((record, fields))
    }
}

impl Builder for SystemBuilder {
    // ------------------------------------------------------------------
    // Types (delegated)
    // ------------------------------------------------------------------

    fn type_duplicate(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.type_duplicate()
    }

    fn type_pop(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.type_pop()
    }

    fn type_bool(&mut self, prefix: Prefix) -> Result<()> {
        self.ensure_active()?;
        self.core.type_bool(prefix)
    }

    fn type_int(&mut self, prefix: Prefix) -> Result<()> {
        self.ensure_active()?;
        self.core.type_int(prefix)
    }

    fn type_bounded_int(&mut self, prefix: Prefix) -> Result<()> {
        self.ensure_active()?;
        self.core.type_bounded_int(prefix)
    }

    fn type_channel(&mut self, prefix: Prefix) -> Result<()> {
        self.ensure_active()?;
        self.core.type_channel(prefix)
    }

    fn type_clock(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.type_clock()
    }

    fn type_void(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.type_void()
    }

    fn type_scalar(&mut self, prefix: Prefix) -> Result<()> {
        self.ensure_active()?;
        self.core.type_scalar(prefix)
    }

    fn type_name(&mut self, prefix: Prefix, name: &str) -> Result<()> {
        self.ensure_active()?;
        self.core.type_name(prefix, name)
    }

    fn struct_field(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        self.core.struct_field(name)
    }

    fn type_struct(&mut self, prefix: Prefix, fields: usize) -> Result<()> {
        self.ensure_active()?;
        self.core.type_struct(prefix, fields)
    }

    fn type_array_of_size(&mut self, dim: usize) -> Result<()> {
        self.ensure_active()?;
        self.core.type_array_of_size(dim)
    }

    fn type_array_of_type(&mut self, dim: usize) -> Result<()> {
        self.ensure_active()?;
        self.core.type_array_of_type(dim)
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn decl_type_def(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        let ty = self.core.pop_type()?;
        let ty = self.core.consume_dims(ty)?;
        let alias = self.core.types.add_named(ty);
        let symbol = self
            .core
            .symbols
            .add_symbol(name, alias, Some(Payload::TypeAlias))?;
        self.decls_mut().type_aliases.push(symbol);
        Ok(())
    }

    fn decl_var(&mut self, name: &str, has_init: bool) -> Result<()> {
        self.ensure_active()?;
        let init = if has_init {
            Some(self.core.pop_expr()?)
        } else {
            None
        };
        let ty = self.core.pop_type()?;
        let ty = self.core.consume_dims(ty)?;

        let payload = if ty.is_constant() {
            init.as_ref()
                .and_then(|e| self.core.eval_const(e))
                .map_or(Payload::Variable, Payload::Constant)
        } else {
            Payload::Variable
        };
        let symbol = self.core.symbols.add_symbol(name, ty, Some(payload))?;
        let variable = Variable { symbol, init };

        if let Some(f) = &mut self.function {
            f.locals.push(variable);
        } else {
            self.decls_mut().variables.push(variable);
        }
        Ok(())
    }

    fn decl_initialiser_list(&mut self, count: usize) -> Result<()> {
        self.ensure_active()?;
        self.core.decl_initialiser_list(count)
    }

    fn decl_field_init(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        self.core.decl_field_init(name)
    }

    fn decl_parameter(&mut self, name: &str, by_ref: bool) -> Result<()> {
        self.ensure_active()?;
        self.core.decl_parameter(name, by_ref)
    }

    fn decl_func_begin(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        if self.function.is_some() {
            return Err(ParseError::new(
                ErrorKind::SyntaxError,
                "nested function definitions are not allowed",
            ));
        }
        let range = self.core.pop_type()?;
        let (domain, fields) = self.seal_parameters()?;
        let fn_ty = self.core.types.add_function(domain, range);

        let index = match &self.tpl {
            Some(t) => t.declarations.functions.len(),
            None => self.declarations.functions.len(),
        };
        let symbol = self
            .core
            .symbols
            .add_symbol(name, fn_ty, Some(Payload::Function(index)))?;

        let frame = self.core.symbols.add_frame();
        self.core.symbols.activate_frame(frame)?;
        let mut parameters = Vec::with_capacity(fields.len());
        for (pname, pty) in fields {
            parameters.push(
                self.core
                    .symbols
                    .add_symbol(&pname, pty, Some(Payload::Parameter))?,
            );
        }
        self.core.blocks.push(Vec::new());
        self.function = Some(FunctionInProgress {
            symbol,
            frame,
            parameters,
            locals: Vec::new(),
        });
        Ok(())
    }

    fn decl_func_end(&mut self) -> Result<()> {
        self.ensure_active()?;
        let f = self.function.take().ok_or_else(|| {
            ParseError::new(ErrorKind::SyntaxError, "no function is open")
        })?;
        let body = self.core.blocks.pop().ok_or_else(|| {
            ParseError::new(ErrorKind::SyntaxError, "function body is unbalanced")
        })?;
        let parent = self
            .core
            .symbols
            .parent_frame(f.frame)
            .unwrap_or(FrameId::ROOT);
        self.core.symbols.activate_frame(parent)?;
        let function = Function {
            symbol: f.symbol,
            parameters: f.parameters,
            locals: f.locals,
            body: Statement::Block(body),
        };
        self.decls_mut().functions.push(function);
        Ok(())
    }

    fn decl_progress(&mut self, is_default: bool) -> Result<()> {
        self.ensure_active()?;
        let measure = self.core.pop_expr()?;
        self.decls_mut().progress.push(ProgressMeasure {
            is_default,
            measure,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statements (delegated)
    // ------------------------------------------------------------------

    fn block_begin(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.block_begin()
    }

    fn block_end(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.block_end()
    }

    fn empty_statement(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.empty_statement()
    }

    fn for_begin(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.for_begin()
    }

    fn for_end(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.for_end()
    }

    fn iteration_begin(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        self.core.iteration_begin(name)
    }

    fn iteration_end(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        self.core.iteration_end(name)
    }

    fn while_begin(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.while_begin()
    }

    fn while_end(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.while_end()
    }

    fn do_while_begin(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.do_while_begin()
    }

    fn do_while_end(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.do_while_end()
    }

    fn if_begin(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.if_begin()
    }

    fn if_else(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.if_else()
    }

    fn if_end(&mut self, has_else: bool) -> Result<()> {
        self.ensure_active()?;
        self.core.if_end(has_else)
    }

    fn expr_statement(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_statement()
    }

    fn return_statement(&mut self, has_value: bool) -> Result<()> {
        self.ensure_active()?;
        self.core.return_statement(has_value)
    }

    fn break_statement(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.break_statement()
    }

    fn continue_statement(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.continue_statement()
    }

    // ------------------------------------------------------------------
    // Expressions (delegated, plus the recursion check)
    // ------------------------------------------------------------------

    fn expr_id(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_id(name)
    }

    fn expr_nat(&mut self, value: i32) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_nat(value)
    }

    fn expr_true(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_true()
    }

    fn expr_false(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_false()
    }

    fn expr_call_begin(&mut self) -> Result<()> {
        self.ensure_active()?;
        // The callee sits on top of the operand stack. A function calling
        // itself is rejected here, before the call is assembled.
        if let (Some(f), Some(Expr::Id(callee))) = (&self.function, self.core.operands.last()) {
            if *callee == f.symbol {
                let name = self.core.symbols.name(f.symbol).unwrap_or("?").to_string();
                return Err(ParseError::new(
                    ErrorKind::RecursiveFunction,
                    format!("function '{}' must not call itself", name),
                ));
            }
        }
        Ok(())
    }

    fn expr_call_end(&mut self, args: usize) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_call_end(args)
    }

    fn expr_array(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_array()
    }

    fn expr_post_increment(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_post_increment()
    }

    fn expr_pre_increment(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_pre_increment()
    }

    fn expr_post_decrement(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_post_decrement()
    }

    fn expr_pre_decrement(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_pre_decrement()
    }

    fn expr_assignment(&mut self, op: AssignOp) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_assignment(op)
    }

    fn expr_unary(&mut self, op: UnaryOp) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_unary(op)
    }

    fn expr_binary(&mut self, op: BinaryOp) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_binary(op)
    }

    fn expr_ternary(&mut self, op: TernaryOp) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_ternary(op)
    }

    fn expr_inline_if(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_inline_if()
    }

    fn expr_comma(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_comma()
    }

    fn expr_dot(&mut self, field: &str) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_dot(field)
    }

    fn expr_deadlock(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_deadlock()
    }

    fn expr_for_all_begin(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_for_all_begin(name)
    }

    fn expr_for_all_end(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_for_all_end(name)
    }

    fn expr_exists_begin(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_exists_begin(name)
    }

    fn expr_exists_end(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        self.core.expr_exists_end(name)
    }

    // ------------------------------------------------------------------
    // Templates, locations, edges
    // ------------------------------------------------------------------

    fn proc_begin(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        if self.tpl.is_some() {
            return Err(ParseError::new(
                ErrorKind::SyntaxError,
                "a template is already open",
            ));
        }
        let (body, fields) = self.seal_parameters()?;
        let template_ty = self.core.types.add_template(body);
        let index = self.templates.len();
        let symbol = self
            .core
            .symbols
            .add_symbol(name, template_ty, Some(Payload::Template(index)))?;

        let frame = self.core.symbols.add_frame();
        self.core.symbols.activate_frame(frame)?;
        let mut parameters = Vec::with_capacity(fields.len());
        for (pname, pty) in fields {
            parameters.push(
                self.core
                    .symbols
                    .add_symbol(&pname, pty, Some(Payload::Parameter))?,
            );
        }
        self.tpl = Some(TemplateInProgress {
            symbol,
            frame,
            parameters,
            declarations: Declarations::default(),
            locations: Vec::new(),
            init: None,
            edges: Vec::new(),
            edge: None,
        });
        Ok(())
    }

    fn proc_end(&mut self) -> Result<()> {
        self.ensure_active()?;
        let t = self.tpl.take().ok_or_else(|| {
            ParseError::new(ErrorKind::SyntaxError, "no template is open")
        })?;
        let parent = self
            .core
            .symbols
            .parent_frame(t.frame)
            .unwrap_or(FrameId::ROOT);
        self.core.symbols.activate_frame(parent)?;

        let missing_init = t.init.is_none();
        let name = self.core.symbols.name(t.symbol).unwrap_or("?").to_string();
        self.templates.push(Template {
            symbol: t.symbol,
            frame: t.frame,
            parameters: t.parameters,
            declarations: t.declarations,
            locations: t.locations,
            init: t.init,
            edges: t.edges,
        });
        if missing_init {
            return Err(ParseError::new(
                ErrorKind::InitNotDeclared,
                format!("template '{}' has no initial location", name),
            ));
        }
        Ok(())
    }

    fn proc_state(&mut self, name: &str, has_invariant: bool) -> Result<()> {
        self.ensure_active()?;
        self.ensure_template()?;
        let invariant = if has_invariant {
            Some(self.core.pop_expr()?)
        } else {
            None
        };
        let index = self.tpl.as_ref().unwrap().locations.len();
        let symbol = self.core.symbols.add_symbol(
            name,
            TypeId::LOCATION,
            Some(Payload::Location(index)),
        )?;
        self.tpl.as_mut().unwrap().locations.push(Location {
            symbol,
            invariant,
            urgent: false,
            committed: false,
        });
        Ok(())
    }

    fn proc_state_urgent(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        self.ensure_template()?;
        let index = self.find_location(name, ErrorKind::StateNotDeclared)?;
        let location = &mut self.tpl.as_mut().unwrap().locations[index];
        if location.committed {
            return Err(ParseError::new(
                ErrorKind::ConflictingStateFlags,
                format!("location '{}' is both committed and urgent", name),
            ));
        }
        location.urgent = true;
        Ok(())
    }

    fn proc_state_commit(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        self.ensure_template()?;
        let index = self.find_location(name, ErrorKind::StateNotDeclared)?;
        let location = &mut self.tpl.as_mut().unwrap().locations[index];
        if location.urgent {
            return Err(ParseError::new(
                ErrorKind::ConflictingStateFlags,
                format!("location '{}' is both committed and urgent", name),
            ));
        }
        location.committed = true;
        Ok(())
    }

    fn proc_state_init(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        self.ensure_template()?;
        let index = self.find_location(name, ErrorKind::InitNotDeclared)?;
        let tpl = self.tpl.as_mut().unwrap();
        if tpl.init.is_some() {
            return Err(ParseError::new(
                ErrorKind::SyntaxError,
                "the initial location is already set",
            ));
        }
        tpl.init = Some(index);
        Ok(())
    }

    fn proc_edge_begin(&mut self, from: &str, to: &str, controllable: bool) -> Result<()> {
        self.ensure_active()?;
        self.ensure_template()?;
        if self.tpl.as_ref().unwrap().edge.is_some() {
            return Err(ParseError::new(
                ErrorKind::SyntaxError,
                "an edge is already open",
            ));
        }
        let source = self.find_location(from, ErrorKind::StateNotDeclared)?;
        let target = self.find_location(to, ErrorKind::StateNotDeclared)?;
        self.tpl.as_mut().unwrap().edge = Some(EdgeInProgress {
            source,
            target,
            controllable,
            select: Vec::new(),
            frame: None,
            guard_mark: None,
            sync_mark: None,
            update_mark: None,
        });
        Ok(())
    }

    fn proc_edge_end(&mut self, _from: &str, _to: &str) -> Result<()> {
        self.ensure_active()?;
        self.ensure_template()?;
        let e = self
            .tpl
            .as_mut()
            .unwrap()
            .edge
            .take()
            .ok_or_else(|| ParseError::new(ErrorKind::SyntaxError, "no edge is open"))?;

        // Pull marked operands highest-first so each extraction leaves the
        // lower marks in place.
        enum Slot {
            Guard,
            Sync(Synchronisation),
            Update,
        }
        let mut marks: Vec<(usize, Slot)> = Vec::new();
        if let Some(depth) = e.guard_mark {
            marks.push((depth, Slot::Guard));
        }
        if let Some((depth, dir)) = e.sync_mark {
            marks.push((depth, Slot::Sync(dir)));
        }
        if let Some(depth) = e.update_mark {
            marks.push((depth, Slot::Update));
        }
        marks.sort_by(|a, b| b.0.cmp(&a.0));

        let mut guard = None;
        let mut sync = None;
        let mut update = None;
        for (depth, slot) in marks {
            if depth == 0 || depth > self.core.operands.len() {
                return Err(ParseError::new(
                    ErrorKind::SyntaxError,
                    "edge label operand is missing",
                ));
            }
            let expr = self.core.operands.remove(depth - 1);
            match slot {
                Slot::Guard => guard = Some(expr),
                Slot::Sync(direction) => {
                    sync = Some(Sync {
                        channel: expr,
                        direction,
                    })
                }
                Slot::Update => update = Some(expr),
            }
        }

        if e.frame.is_some() {
            let tpl_frame = self.tpl.as_ref().unwrap().frame;
            self.core.symbols.activate_frame(tpl_frame)?;
        }
        self.tpl.as_mut().unwrap().edges.push(Edge {
            source: e.source,
            target: e.target,
            controllable: e.controllable,
            select: e.select,
            guard,
            sync,
            update,
        });
        Ok(())
    }

    fn proc_select(&mut self, id: &str) -> Result<()> {
        self.ensure_active()?;
        self.ensure_edge()?;
        let ty = self.core.pop_type()?;
        if self.tpl.as_ref().unwrap().edge.as_ref().unwrap().frame.is_none() {
            let frame = self.core.symbols.add_frame();
            self.core.symbols.activate_frame(frame)?;
            self.tpl.as_mut().unwrap().edge.as_mut().unwrap().frame = Some(frame);
        }
        let symbol = self.core.symbols.add_symbol(id, ty, Some(Payload::Binder))?;
        self.tpl
            .as_mut()
            .unwrap()
            .edge
            .as_mut()
            .unwrap()
            .select
            .push(symbol);
        Ok(())
    }

    fn proc_guard(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.ensure_edge()?;
        let depth = self.core.operands.len();
        self.tpl.as_mut().unwrap().edge.as_mut().unwrap().guard_mark = Some(depth);
        Ok(())
    }

    fn proc_sync(&mut self, sync: Synchronisation) -> Result<()> {
        self.ensure_active()?;
        self.ensure_edge()?;
        let depth = self.core.operands.len();
        self.tpl.as_mut().unwrap().edge.as_mut().unwrap().sync_mark = Some((depth, sync));
        Ok(())
    }

    fn proc_update(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.ensure_edge()?;
        let depth = self.core.operands.len();
        self.tpl.as_mut().unwrap().edge.as_mut().unwrap().update_mark = Some(depth);
        Ok(())
    }

    // ------------------------------------------------------------------
    // System level
    // ------------------------------------------------------------------

    fn instantiation_begin(&mut self, _id: &str, _param_count: usize, template: &str) -> Result<()> {
        self.ensure_active()?;
        let sym = self.core.symbols.resolve(template).ok_or_else(|| {
            ParseError::new(
                ErrorKind::UnknownSymbol,
                format!("unknown template '{}'", template),
            )
        })?;
        let ty = self.core.symbols.ty(sym).unwrap_or(TypeId::VOID);
        if self.core.types.class(ty) != TypeId::TEMPLATE {
            return Err(ParseError::new(
                ErrorKind::BadType,
                format!("'{}' is not a template", template),
            ));
        }
        self.pending_instantiation = Some(sym);
        Ok(())
    }

    fn instantiation_end(
        &mut self,
        id: &str,
        _param_count: usize,
        template: &str,
        arg_count: usize,
    ) -> Result<()> {
        self.ensure_active()?;
        if self.core.operands.len() < arg_count {
            return Err(ParseError::new(
                ErrorKind::SyntaxError,
                "missing instantiation arguments",
            ));
        }
        let arguments = self
            .core
            .operands
            .split_off(self.core.operands.len() - arg_count);
        let template_sym = match self.pending_instantiation.take() {
            Some(sym) => sym,
            None => self.core.symbols.resolve(template).ok_or_else(|| {
                ParseError::new(
                    ErrorKind::UnknownSymbol,
                    format!("unknown template '{}'", template),
                )
            })?,
        };

        let ty = self.core.symbols.ty(template_sym).unwrap_or(TypeId::VOID);
        let body = self.core.types.first_sub_type(ty);
        let expected = self.core.types.record(body).map_or(0, |fields| fields.len());
        if expected != arg_count {
            return Err(ParseError::new(
                ErrorKind::ArityMismatch,
                format!(
                    "template '{}' expects {} arguments but got {}",
                    template, expected, arg_count
                ),
            ));
        }

        let index = self.instantiations.len();
        let symbol = self
            .core
            .symbols
            .add_symbol(id, TypeId::PROCESS, Some(Payload::Process(index)))?;
        self.instantiations.push(Instantiation {
            symbol,
            template: template_sym,
            arguments,
        });
        Ok(())
    }

    fn process(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        let sym = self.core.symbols.resolve(name).ok_or_else(|| {
            ParseError::new(
                ErrorKind::UnknownSymbol,
                format!("unknown process '{}'", name),
            )
        })?;
        let ty = self.core.symbols.ty(sym).unwrap_or(TypeId::VOID);
        match self.core.types.class(ty) {
            TypeId::PROCESS => {}
            TypeId::TEMPLATE => {
                let body = self.core.types.first_sub_type(ty);
                let params = self.core.types.record(body).map_or(0, |fields| fields.len());
                if params != 0 {
                    return Err(ParseError::new(
                        ErrorKind::ArityMismatch,
                        format!("template '{}' has unbound parameters", name),
                    ));
                }
            }
            _ => {
                return Err(ParseError::new(
                    ErrorKind::BadType,
                    format!("'{}' is not a process", name),
                ))
            }
        }
        let priority = self
            .pending_proc_priorities
            .remove(&sym)
            .unwrap_or(self.proc_priority_level);
        self.processes.push(ProcessRef {
            symbol: sym,
            priority,
        });
        Ok(())
    }

    fn done(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.finished = true;
        Ok(())
    }

    fn inc_proc_priority(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.proc_priority_level += 1;
        Ok(())
    }

    fn inc_chan_priority(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.chan_priority_level += 1;
        Ok(())
    }

    fn chan_priority(&mut self) -> Result<()> {
        self.ensure_active()?;
        let channel = self.core.pop_expr()?;
        self.chan_priorities.push(ChanPriorityEntry {
            channel: Some(channel),
            level: self.chan_priority_level,
        });
        Ok(())
    }

    fn default_chan_priority(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.chan_priorities.push(ChanPriorityEntry {
            channel: None,
            level: self.chan_priority_level,
        });
        Ok(())
    }

    fn proc_priority(&mut self, name: &str) -> Result<()> {
        self.ensure_active()?;
        let sym = self.core.symbols.resolve(name).ok_or_else(|| {
            ParseError::new(
                ErrorKind::UnknownSymbol,
                format!("unknown process '{}'", name),
            )
        })?;
        let level = self.proc_priority_level;
        match self.processes.iter_mut().find(|p| p.symbol == sym) {
            Some(entry) => entry.priority = level,
            None => {
                self.pending_proc_priorities.insert(sym, level);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    fn add_position(&mut self, position: u32, offset: u32, line: u32, path: &str) -> Result<()> {
        self.ensure_active()?;
        self.core.position = Position::new(position, offset, line, path);
        Ok(())
    }

    fn handle_error(&mut self, message: &str) -> Result<()> {
        Err(ParseError::new(ErrorKind::SyntaxError, message))
    }

    fn handle_warning(&mut self, _message: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_template(sb: &mut SystemBuilder, name: &str) {
        sb.proc_begin(name).unwrap();
    }

    fn state(sb: &mut SystemBuilder, name: &str) {
        sb.proc_state(name, false).unwrap();
    }

    #[test]
    fn duplicate_global_is_rejected() {
        let mut sb = SystemBuilder::new();
        sb.type_int(Prefix::None).unwrap();
        sb.decl_var("x", false).unwrap();
        sb.type_clock().unwrap();
        let err = sb.decl_var("x", false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateSymbol);
    }

    #[test]
    fn template_locations_and_edges() {
        let mut sb = SystemBuilder::new();
        open_template(&mut sb, "T");
        state(&mut sb, "s0");
        state(&mut sb, "s1");
        sb.proc_state_init("s0").unwrap();

        sb.proc_edge_begin("s0", "s1", true).unwrap();
        sb.expr_true().unwrap();
        sb.proc_guard().unwrap();
        sb.proc_edge_end("s0", "s1").unwrap();
        sb.proc_end().unwrap();
        sb.done().unwrap();

        let system = sb.into_system();
        let tpl = system.template("T").unwrap();
        assert_eq!(tpl.locations.len(), 2);
        assert_eq!(tpl.init, Some(0));
        assert_eq!(tpl.edges.len(), 1);
        assert_eq!(tpl.edges[0].source, 0);
        assert_eq!(tpl.edges[0].target, 1);
        assert_eq!(tpl.edges[0].guard, Some(Expr::True));
        assert!(tpl.edges[0].sync.is_none());
    }

    #[test]
    fn edge_labels_pop_in_reverse_introduction_order() {
        let mut sb = SystemBuilder::new();
        sb.type_channel(Prefix::None).unwrap();
        sb.decl_var("c", false).unwrap();

        open_template(&mut sb, "T");
        state(&mut sb, "a");
        state(&mut sb, "b");
        sb.proc_state_init("a").unwrap();

        sb.proc_edge_begin("a", "b", false).unwrap();
        sb.expr_nat(1).unwrap();
        sb.proc_guard().unwrap();
        sb.expr_id("c").unwrap();
        sb.proc_sync(Synchronisation::Bang).unwrap();
        sb.expr_nat(2).unwrap();
        sb.proc_update().unwrap();
        sb.proc_edge_end("a", "b").unwrap();
        sb.proc_end().unwrap();
        sb.done().unwrap();

        let system = sb.into_system();
        let edge = &system.template("T").unwrap().edges[0];
        assert!(!edge.controllable);
        assert_eq!(edge.guard, Some(Expr::Nat(1)));
        assert_eq!(edge.update, Some(Expr::Nat(2)));
        let sync = edge.sync.as_ref().unwrap();
        assert_eq!(sync.direction, Synchronisation::Bang);
    }

    #[test]
    fn committed_and_urgent_conflict() {
        let mut sb = SystemBuilder::new();
        open_template(&mut sb, "T");
        state(&mut sb, "s");
        sb.proc_state_commit("s").unwrap();
        let err = sb.proc_state_urgent("s").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConflictingStateFlags);
    }

    #[test]
    fn edge_to_undeclared_state_fails() {
        let mut sb = SystemBuilder::new();
        open_template(&mut sb, "T");
        state(&mut sb, "s");
        let err = sb.proc_edge_begin("s", "ghost", true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StateNotDeclared);
    }

    #[test]
    fn init_must_reference_a_declared_state() {
        let mut sb = SystemBuilder::new();
        open_template(&mut sb, "T");
        let err = sb.proc_state_init("nowhere").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InitNotDeclared);
    }

    #[test]
    fn second_init_is_rejected() {
        let mut sb = SystemBuilder::new();
        open_template(&mut sb, "T");
        state(&mut sb, "a");
        state(&mut sb, "b");
        sb.proc_state_init("a").unwrap();
        let err = sb.proc_state_init("b").unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
    }

    #[test]
    fn edge_end_without_begin_fails() {
        let mut sb = SystemBuilder::new();
        open_template(&mut sb, "T");
        let err = sb.proc_edge_end("a", "b").unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
    }

    #[test]
    fn direct_recursion_is_rejected() {
        let mut sb = SystemBuilder::new();
        sb.type_int(Prefix::None).unwrap();
        sb.decl_func_begin("f").unwrap();
        sb.expr_id("f").unwrap();
        let err = sb.expr_call_begin().unwrap_err();
        assert_eq!(err.kind, ErrorKind::RecursiveFunction);
    }

    #[test]
    fn instantiation_checks_arity() {
        let mut sb = SystemBuilder::new();
        sb.type_int(Prefix::None).unwrap();
        sb.decl_parameter("n", false).unwrap();
        open_template(&mut sb, "T");
        state(&mut sb, "s");
        sb.proc_state_init("s").unwrap();
        sb.proc_end().unwrap();

        sb.instantiation_begin("P", 0, "T").unwrap();
        let err = sb.instantiation_end("P", 0, "T", 0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArityMismatch);

        sb.instantiation_begin("P", 0, "T").unwrap();
        sb.expr_nat(3).unwrap();
        sb.instantiation_end("P", 0, "T", 1).unwrap();
        sb.process("P").unwrap();
        sb.done().unwrap();

        let system = sb.into_system();
        assert_eq!(system.instantiations.len(), 1);
        assert_eq!(system.processes.len(), 1);
    }

    #[test]
    fn system_line_requires_declared_processes() {
        let mut sb = SystemBuilder::new();
        let err = sb.process("Ghost").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownSymbol);
    }

    #[test]
    fn priorities_accumulate_across_the_system_line() {
        let mut sb = SystemBuilder::new();
        open_template(&mut sb, "A");
        state(&mut sb, "s");
        sb.proc_state_init("s").unwrap();
        sb.proc_end().unwrap();
        open_template(&mut sb, "B");
        state(&mut sb, "s");
        sb.proc_state_init("s").unwrap();
        sb.proc_end().unwrap();

        sb.process("A").unwrap();
        sb.inc_proc_priority().unwrap();
        sb.process("B").unwrap();
        sb.done().unwrap();

        let system = sb.into_system();
        assert_eq!(system.processes[0].priority, 0);
        assert_eq!(system.processes[1].priority, 1);
    }

    #[test]
    fn after_done_everything_fails() {
        let mut sb = SystemBuilder::new();
        sb.done().unwrap();
        let err = sb.expr_true().unwrap_err();
        assert_eq!(err.kind, ErrorKind::AfterDone);
        let err = sb.proc_begin("T").unwrap_err();
        assert_eq!(err.kind, ErrorKind::AfterDone);
        let err = sb.done().unwrap_err();
        assert_eq!(err.kind, ErrorKind::AfterDone);
    }

    #[test]
    fn template_without_init_reports_on_proc_end() {
        let mut sb = SystemBuilder::new();
        open_template(&mut sb, "T");
        state(&mut sb, "s");
        let err = sb.proc_end().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InitNotDeclared);
        // The template itself is still kept for later passes.
        sb.done().unwrap();
        let system = sb.into_system();
        assert_eq!(system.templates.len(), 1);
    }

    #[test]
    fn chan_priorities_record_levels_and_default() {
        let mut sb = SystemBuilder::new();
        sb.type_channel(Prefix::None).unwrap();
        sb.decl_var("c", false).unwrap();

        sb.default_chan_priority().unwrap();
        sb.inc_chan_priority().unwrap();
        sb.expr_id("c").unwrap();
        sb.chan_priority().unwrap();
        sb.done().unwrap();

        let system = sb.into_system();
        assert_eq!(system.chan_priorities.len(), 2);
        assert_eq!(system.chan_priorities[0].channel, None);
        assert_eq!(system.chan_priorities[0].level, 0);
        assert_eq!(system.chan_priorities[1].level, 1);
    }
}
