//! Canonical-text builder: the pretty printer.
//!
//! [`PrettyPrinter`] is the second shipped consumer of the builder
//! protocol. Where the AST assembler keeps tagged values, this one keeps
//! strings — its output *is* text — and an output-buffer stack so loop and
//! branch bodies can be diverted and stitched under their headers once the
//! controlling expression is known.
//!
//! Printing always emits the new syntax, whatever variant the input used,
//! which makes it a handy round-trip oracle: parsing its output again
//! yields the same system.

use tack_base::{ErrorKind, ParseError, Result};

use crate::ast::{AssignOp, BinaryOp, Prefix, Synchronisation, TernaryOp, UnaryOp};
use crate::builder::Builder;

fn prefix_label(prefix: Prefix) -> &'static str {
    match prefix {
        Prefix::None => "",
        Prefix::Const => "const ",
        Prefix::Urgent => "urgent ",
        Prefix::Broadcast => "broadcast ",
        Prefix::UrgentBroadcast => "urgent broadcast ",
        Prefix::Meta => "meta ",
    }
}

/// Emits canonical new-syntax text for a builder event stream.
#[derive(Debug)]
pub struct PrettyPrinter {
    /// Output buffers; the last one is written to, the first is the result.
    o: Vec<String>,
    /// Operand strings.
    st: Vec<String>,
    type_stack: Vec<String>,
    /// Pending array dimensions, in source order.
    array: Vec<String>,
    fields: Vec<String>,
    param: String,
    urgent: String,
    committed: String,
    select: Option<usize>,
    guard: Option<usize>,
    sync: Option<usize>,
    update: Option<usize>,
    first: bool,
    level: usize,
    chanpri: String,
    chan_sep_lt: bool,
    proc_sep_lt: bool,
}

impl Default for PrettyPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl PrettyPrinter {
    pub fn new() -> Self {
        Self {
            o: vec![String::new()],
            st: Vec::new(),
            type_stack: Vec::new(),
            array: Vec::new(),
            fields: Vec::new(),
            param: String::new(),
            urgent: String::new(),
            committed: String::new(),
            select: None,
            guard: None,
            sync: None,
            update: None,
            first: true,
            level: 0,
            chanpri: String::new(),
            chan_sep_lt: false,
            proc_sep_lt: false,
        }
    }

    /// The text produced so far.
    pub fn output(&self) -> &str {
        &self.o[0]
    }

    /// Consumes the printer and returns the text.
    pub fn finish(mut self) -> String {
        std::mem::take(&mut self.o[0])
    }

    fn out(&mut self, text: &str) {
        self.o.last_mut().expect("output stack").push_str(text);
    }

    fn indent(&mut self) {
        for _ in 0..self.level {
            self.out("    ");
        }
    }

    fn pop_st(&mut self) -> Result<String> {
        self.st.pop().ok_or_else(|| {
            ParseError::new(ErrorKind::SyntaxError, "missing expression operand")
        })
    }

    fn pop_type(&mut self) -> Result<String> {
        self.type_stack
            .pop()
            .ok_or_else(|| ParseError::new(ErrorKind::SyntaxError, "missing type"))
    }

    fn top_st(&mut self) -> Result<&mut String> {
        self.st.last_mut().ok_or_else(|| {
            ParseError::new(ErrorKind::SyntaxError, "missing expression operand")
        })
    }

    fn dims(&mut self) -> String {
        let mut out = String::new();
        for dim in self.array.drain(..) {
            out.push('[');
            out.push_str(&dim);
            out.push(']');
        }
        out
    }

    fn pop_diverted(&mut self) -> Result<String> {
        if self.o.len() < 2 {
            return Err(ParseError::new(
                ErrorKind::SyntaxError,
                "unbalanced statement nesting",
            ));
        }
        Ok(self.o.pop().expect("checked above"))
    }
}

impl Builder for PrettyPrinter {
    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn type_duplicate(&mut self) -> Result<()> {
        let top = self
            .type_stack
            .last()
            .cloned()
            .ok_or_else(|| ParseError::new(ErrorKind::SyntaxError, "missing type"))?;
        self.type_stack.push(top);
        Ok(())
    }

    fn type_pop(&mut self) -> Result<()> {
        self.pop_type().map(|_| ())
    }

    fn type_bool(&mut self, prefix: Prefix) -> Result<()> {
        self.type_stack.push(format!("{}bool", prefix_label(prefix)));
        Ok(())
    }

    fn type_int(&mut self, prefix: Prefix) -> Result<()> {
        self.type_stack.push(format!("{}int", prefix_label(prefix)));
        Ok(())
    }

    fn type_bounded_int(&mut self, prefix: Prefix) -> Result<()> {
        let hi = self.pop_st()?;
        let lo = self.pop_st()?;
        self.type_stack
            .push(format!("{}int[{},{}]", prefix_label(prefix), lo, hi));
        Ok(())
    }

    fn type_channel(&mut self, prefix: Prefix) -> Result<()> {
        self.type_stack.push(format!("{}chan", prefix_label(prefix)));
        Ok(())
    }

    fn type_clock(&mut self) -> Result<()> {
        self.type_stack.push("clock".to_string());
        Ok(())
    }

    fn type_void(&mut self) -> Result<()> {
        self.type_stack.push("void".to_string());
        Ok(())
    }

    fn type_scalar(&mut self, prefix: Prefix) -> Result<()> {
        let size = self.pop_st()?;
        self.type_stack
            .push(format!("{}scalar[{}]", prefix_label(prefix), size));
        Ok(())
    }

    fn type_name(&mut self, prefix: Prefix, name: &str) -> Result<()> {
        self.type_stack
            .push(format!("{}{}", prefix_label(prefix), name));
        Ok(())
    }

    fn struct_field(&mut self, name: &str) -> Result<()> {
        let ty = self.pop_type()?;
        let dims = self.dims();
        self.fields.push(format!("{} {}{};", ty, name, dims));
        Ok(())
    }

    fn type_struct(&mut self, prefix: Prefix, fields: usize) -> Result<()> {
        if self.fields.len() < fields {
            return Err(ParseError::new(
                ErrorKind::SyntaxError,
                "missing structure fields",
            ));
        }
        let fields = self
            .fields
            .split_off(self.fields.len() - fields)
            .join(" ");
        self.type_stack
            .push(format!("{}struct {{ {} }}", prefix_label(prefix), fields));
        Ok(())
    }

    fn type_array_of_size(&mut self, _dim: usize) -> Result<()> {
        let size = self.pop_st()?;
        self.array.push(size);
        Ok(())
    }

    fn type_array_of_type(&mut self, _dim: usize) -> Result<()> {
        let ty = self.pop_type()?;
        self.array.push(ty);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn decl_type_def(&mut self, name: &str) -> Result<()> {
        let ty = self.pop_type()?;
        let dims = self.dims();
        self.indent();
        self.out(&format!("typedef {} {}{};\n", ty, name, dims));
        Ok(())
    }

    fn decl_var(&mut self, name: &str, has_init: bool) -> Result<()> {
        let init = if has_init { Some(self.pop_st()?) } else { None };
        let ty = self.pop_type()?;
        let dims = self.dims();
        self.indent();
        match init {
            Some(init) => self.out(&format!("{} {}{} = {};\n", ty, name, dims, init)),
            None => self.out(&format!("{} {}{};\n", ty, name, dims)),
        }
        Ok(())
    }

    fn decl_initialiser_list(&mut self, count: usize) -> Result<()> {
        let mut items = self.pop_st()?;
        for _ in 1..count {
            items = format!("{}, {}", self.pop_st()?, items);
        }
        self.st.push(format!("{{ {} }}", items));
        Ok(())
    }

    fn decl_field_init(&mut self, name: &str) -> Result<()> {
        if !name.is_empty() {
            let top = self.top_st()?;
            *top = format!("{}: {}", name, top);
        }
        Ok(())
    }

    fn decl_parameter(&mut self, name: &str, by_ref: bool) -> Result<()> {
        if !self.array.is_empty() {
            return Err(ParseError::new(
                ErrorKind::BadType,
                "array parameters are not supported",
            ));
        }
        let ty = self.pop_type()?;
        if !self.param.is_empty() {
            self.param.push_str(", ");
        }
        if by_ref {
            self.param.push_str(&format!("{} &{}", ty, name));
        } else {
            self.param.push_str(&format!("{} {}", ty, name));
        }
        Ok(())
    }

    fn decl_func_begin(&mut self, name: &str) -> Result<()> {
        let ty = self.pop_type()?;
        let param = std::mem::take(&mut self.param);
        self.indent();
        self.out(&format!("{} {}({})\n", ty, name, param));
        self.indent();
        self.out("{\n");
        self.level += 1;
        Ok(())
    }

    fn decl_func_end(&mut self) -> Result<()> {
        self.level -= 1;
        self.indent();
        self.out("}\n");
        Ok(())
    }

    fn decl_progress(&mut self, is_default: bool) -> Result<()> {
        let measure = self.pop_st()?;
        self.indent();
        if is_default {
            self.out(&format!("progress {{ default {}; }}\n", measure));
        } else {
            self.out(&format!("progress {{ {}; }}\n", measure));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn block_begin(&mut self) -> Result<()> {
        self.level -= 1;
        self.indent();
        self.out("{\n");
        self.level += 1;
        Ok(())
    }

    fn block_end(&mut self) -> Result<()> {
        self.level -= 1;
        self.indent();
        self.level += 1;
        self.out("}\n");
        Ok(())
    }

    fn empty_statement(&mut self) -> Result<()> {
        self.indent();
        self.out(";\n");
        Ok(())
    }

    fn for_begin(&mut self) -> Result<()> {
        self.level += 1;
        self.o.push(String::new());
        Ok(())
    }

    fn for_end(&mut self) -> Result<()> {
        let step = self.pop_st()?;
        let cond = self.pop_st()?;
        let init = self.pop_st()?;
        let body = self.pop_diverted()?;
        self.level -= 1;
        self.indent();
        self.out(&format!("for ( {}; {}; {} )\n{}", init, cond, step, body));
        Ok(())
    }

    fn iteration_begin(&mut self, name: &str) -> Result<()> {
        let ty = self.pop_type()?;
        self.indent();
        self.out(&format!("for ( {} : {} )\n", name, ty));
        self.level += 1;
        Ok(())
    }

    fn iteration_end(&mut self, _name: &str) -> Result<()> {
        self.level -= 1;
        Ok(())
    }

    fn while_begin(&mut self) -> Result<()> {
        self.level += 1;
        self.o.push(String::new());
        Ok(())
    }

    fn while_end(&mut self) -> Result<()> {
        let cond = self.pop_st()?;
        let body = self.pop_diverted()?;
        self.level -= 1;
        self.indent();
        self.out(&format!("while ({})\n{}", cond, body));
        Ok(())
    }

    fn do_while_begin(&mut self) -> Result<()> {
        self.level += 1;
        self.o.push(String::new());
        Ok(())
    }

    fn do_while_end(&mut self) -> Result<()> {
        let cond = self.pop_st()?;
        let body = self.pop_diverted()?;
        self.level -= 1;
        self.indent();
        self.out("do\n");
        self.out(&body);
        self.indent();
        self.out(&format!("while ({});\n", cond));
        Ok(())
    }

    fn if_begin(&mut self) -> Result<()> {
        self.level += 1;
        self.o.push(String::new());
        Ok(())
    }

    fn if_else(&mut self) -> Result<()> {
        self.o.push(String::new());
        Ok(())
    }

    fn if_end(&mut self, has_else: bool) -> Result<()> {
        let else_body = if has_else {
            Some(self.pop_diverted()?)
        } else {
            None
        };
        let then_body = self.pop_diverted()?;
        let cond = self.pop_st()?;
        self.level -= 1;
        self.indent();
        self.out(&format!("if ({})\n{}", cond, then_body));
        if let Some(else_body) = else_body {
            self.indent();
            self.out(&format!("else\n{}", else_body));
        }
        Ok(())
    }

    fn expr_statement(&mut self) -> Result<()> {
        let expr = self.pop_st()?;
        self.indent();
        self.out(&format!("{};\n", expr));
        Ok(())
    }

    fn return_statement(&mut self, has_value: bool) -> Result<()> {
        self.indent();
        if has_value {
            let value = self.pop_st()?;
            self.out(&format!("return {};\n", value));
        } else {
            self.out("return;\n");
        }
        Ok(())
    }

    fn break_statement(&mut self) -> Result<()> {
        self.indent();
        self.out("break;\n");
        Ok(())
    }

    fn continue_statement(&mut self) -> Result<()> {
        self.indent();
        self.out("continue;\n");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr_id(&mut self, name: &str) -> Result<()> {
        self.st.push(name.to_string());
        Ok(())
    }

    fn expr_nat(&mut self, value: i32) -> Result<()> {
        self.st.push(value.to_string());
        Ok(())
    }

    fn expr_true(&mut self) -> Result<()> {
        self.st.push("true".to_string());
        Ok(())
    }

    fn expr_false(&mut self) -> Result<()> {
        self.st.push("false".to_string());
        Ok(())
    }

    fn expr_call_begin(&mut self) -> Result<()> {
        self.top_st()?.push('(');
        Ok(())
    }

    fn expr_call_end(&mut self, args: usize) -> Result<()> {
        let mut tail = ")".to_string();
        for i in 0..args {
            tail = format!("{}{}", self.pop_st()?, tail);
            if i + 1 < args {
                tail = format!(", {}", tail);
            }
        }
        self.top_st()?.push_str(&tail);
        Ok(())
    }

    fn expr_array(&mut self) -> Result<()> {
        let index = self.pop_st()?;
        self.top_st()?.push_str(&format!("[{}]", index));
        Ok(())
    }

    fn expr_post_increment(&mut self) -> Result<()> {
        self.top_st()?.push_str("++");
        Ok(())
    }

    fn expr_pre_increment(&mut self) -> Result<()> {
        let top = self.top_st()?;
        *top = format!("++{}", top);
        Ok(())
    }

    fn expr_post_decrement(&mut self) -> Result<()> {
        self.top_st()?.push_str("--");
        Ok(())
    }

    fn expr_pre_decrement(&mut self) -> Result<()> {
        let top = self.top_st()?;
        *top = format!("--{}", top);
        Ok(())
    }

    fn expr_assignment(&mut self, op: AssignOp) -> Result<()> {
        let rhs = self.pop_st()?;
        let lhs = self.pop_st()?;
        let op = match op {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::ModAssign => "%=",
            AssignOp::OrAssign => "|=",
            AssignOp::AndAssign => "&=",
            AssignOp::XorAssign => "^=",
            AssignOp::ShlAssign => "<<=",
            AssignOp::ShrAssign => ">>=",
        };
        self.st.push(format!("({} {} {})", lhs, op, rhs));
        Ok(())
    }

    fn expr_unary(&mut self, op: UnaryOp) -> Result<()> {
        let expr = self.pop_st()?;
        let text = match op {
            UnaryOp::Minus => format!("-{}", expr),
            UnaryOp::Plus => format!("+{}", expr),
            UnaryOp::Not => format!("!{}", expr),
            UnaryOp::Rate => format!("{}'", expr),
            UnaryOp::Control => format!("control: {}", expr),
            UnaryOp::EfControl => format!("E<> control: {}", expr),
        };
        self.st.push(text);
        Ok(())
    }

    fn expr_binary(&mut self, op: BinaryOp) -> Result<()> {
        let right = self.pop_st()?;
        let left = self.pop_st()?;
        let op = match op {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Mult => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Min => "<?",
            BinaryOp::Max => ">?",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Ge => ">=",
            BinaryOp::Gt => ">",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
        };
        self.st.push(format!("({} {} {})", left, op, right));
        Ok(())
    }

    fn expr_ternary(&mut self, op: TernaryOp) -> Result<()> {
        let third = self.pop_st()?;
        let second = self.pop_st()?;
        let first = self.pop_st()?;
        let text = match op {
            TernaryOp::ControlTopt => {
                format!("control_t*({},{}): {}", first, second, third)
            }
            TernaryOp::AUntil => format!("A{{{}}} [{} U {}]", first, second, third),
            TernaryOp::AWeakUntil => format!("A{{{}}} [{} W {}]", first, second, third),
        };
        self.st.push(text);
        Ok(())
    }

    fn expr_inline_if(&mut self) -> Result<()> {
        let else_expr = self.pop_st()?;
        let then_expr = self.pop_st()?;
        let cond = self.pop_st()?;
        self.st
            .push(format!("{} ? {} : {}", cond, then_expr, else_expr));
        Ok(())
    }

    fn expr_comma(&mut self) -> Result<()> {
        let right = self.pop_st()?;
        let left = self.pop_st()?;
        self.st.push(format!("{}, {}", left, right));
        Ok(())
    }

    fn expr_dot(&mut self, field: &str) -> Result<()> {
        let top = self.top_st()?;
        *top = format!("{}.{}", top, field);
        Ok(())
    }

    fn expr_deadlock(&mut self) -> Result<()> {
        self.st.push("deadlock".to_string());
        Ok(())
    }

    fn expr_for_all_begin(&mut self, name: &str) -> Result<()> {
        let ty = self.pop_type()?;
        self.st.push(format!("forall ({}:{}) ", name, ty));
        Ok(())
    }

    fn expr_for_all_end(&mut self, _name: &str) -> Result<()> {
        let body = self.pop_st()?;
        self.top_st()?.push_str(&body);
        Ok(())
    }

    fn expr_exists_begin(&mut self, name: &str) -> Result<()> {
        let ty = self.pop_type()?;
        self.st.push(format!("exists ({}:{}) ", name, ty));
        Ok(())
    }

    fn expr_exists_end(&mut self, _name: &str) -> Result<()> {
        let body = self.pop_st()?;
        self.top_st()?.push_str(&body);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Processes
    // ------------------------------------------------------------------

    fn proc_begin(&mut self, name: &str) -> Result<()> {
        let param = std::mem::take(&mut self.param);
        self.out(&format!("process {}({})\n{{\n", name, param));
        self.level += 1;
        self.first = true;
        Ok(())
    }

    fn proc_state(&mut self, name: &str, has_invariant: bool) -> Result<()> {
        if self.first {
            self.first = false;
            self.indent();
            self.out("state\n");
        } else {
            self.out(",\n");
        }
        self.level += 1;
        self.indent();
        self.level -= 1;
        self.out(name);
        if has_invariant {
            let inv = self.pop_st()?;
            self.out(&format!("{{{}}}", inv));
        }
        Ok(())
    }

    fn proc_state_urgent(&mut self, name: &str) -> Result<()> {
        if self.urgent.is_empty() {
            self.urgent = name.to_string();
        } else {
            self.urgent.push_str(", ");
            self.urgent.push_str(name);
        }
        Ok(())
    }

    fn proc_state_commit(&mut self, name: &str) -> Result<()> {
        if self.committed.is_empty() {
            self.committed = name.to_string();
        } else {
            self.committed.push_str(", ");
            self.committed.push_str(name);
        }
        Ok(())
    }

    fn proc_state_init(&mut self, name: &str) -> Result<()> {
        self.first = true;
        self.out(";\n");

        if !self.committed.is_empty() {
            let committed = std::mem::take(&mut self.committed);
            self.indent();
            self.out(&format!("commit {};\n", committed));
        }
        if !self.urgent.is_empty() {
            let urgent = std::mem::take(&mut self.urgent);
            self.indent();
            self.out(&format!("urgent {};\n", urgent));
        }
        self.indent();
        self.out(&format!("init {};\n", name));
        Ok(())
    }

    fn proc_edge_begin(&mut self, from: &str, to: &str, controllable: bool) -> Result<()> {
        if self.first {
            self.first = false;
            self.indent();
            self.out("trans\n");
            self.level += 1;
        } else {
            self.out(",\n");
        }
        self.indent();
        if controllable {
            self.out(&format!("{} -> {} {{\n", from, to));
        } else {
            self.out(&format!("{} -u-> {} {{\n", from, to));
        }
        Ok(())
    }

    fn proc_edge_end(&mut self, _from: &str, _to: &str) -> Result<()> {
        self.level += 1;
        if let Some(mark) = self.select {
            let select = self.st[mark - 1].clone();
            self.indent();
            self.out(&format!("select {};\n", select));
        }
        if let Some(mark) = self.guard {
            let guard = self.st[mark - 1].clone();
            self.indent();
            self.out(&format!("guard {};\n", guard));
        }
        if let Some(mark) = self.sync {
            let sync = self.st[mark - 1].clone();
            self.indent();
            self.out(&format!("sync {};\n", sync));
        }
        if let Some(mark) = self.update {
            let update = self.st[mark - 1].clone();
            self.indent();
            self.out(&format!("assign {};\n", update));
        }
        self.level -= 1;

        // Remove the marked operands highest-first so lower marks stay put.
        let mut marks: Vec<usize> = [self.select, self.guard, self.sync, self.update]
            .iter()
            .flatten()
            .copied()
            .collect();
        marks.sort_unstable_by(|a, b| b.cmp(a));
        for mark in marks {
            if mark >= 1 && mark <= self.st.len() {
                self.st.remove(mark - 1);
            }
        }
        self.select = None;
        self.guard = None;
        self.sync = None;
        self.update = None;

        self.indent();
        self.out("}");
        Ok(())
    }

    fn proc_end(&mut self) -> Result<()> {
        if !self.first {
            self.out(";\n");
            self.level -= 1;
            self.first = true;
        }
        self.level -= 1;
        self.out("}\n\n");
        Ok(())
    }

    fn proc_select(&mut self, id: &str) -> Result<()> {
        let ty = self.pop_type()?;
        match self.select {
            None => {
                self.st.push(format!("{} : {}", id, ty));
                self.select = Some(self.st.len());
            }
            Some(mark) => {
                self.st[mark - 1].push_str(&format!(", {} : {}", id, ty));
            }
        }
        Ok(())
    }

    fn proc_guard(&mut self) -> Result<()> {
        self.guard = Some(self.st.len());
        Ok(())
    }

    fn proc_sync(&mut self, sync: Synchronisation) -> Result<()> {
        match sync {
            Synchronisation::Que => self.top_st()?.push('?'),
            Synchronisation::Bang => self.top_st()?.push('!'),
        }
        self.sync = Some(self.st.len());
        Ok(())
    }

    fn proc_update(&mut self) -> Result<()> {
        self.update = Some(self.st.len());
        Ok(())
    }

    // ------------------------------------------------------------------
    // System
    // ------------------------------------------------------------------

    fn instantiation_begin(&mut self, _id: &str, _param_count: usize, _template: &str) -> Result<()> {
        Ok(())
    }

    fn instantiation_end(
        &mut self,
        id: &str,
        _param_count: usize,
        template: &str,
        arg_count: usize,
    ) -> Result<()> {
        let mut args = Vec::with_capacity(arg_count);
        for _ in 0..arg_count {
            args.push(self.pop_st()?);
        }
        args.reverse();
        self.out(&format!("{} = {}({});\n", id, template, args.join(", ")));
        Ok(())
    }

    fn process(&mut self, name: &str) -> Result<()> {
        if self.first {
            self.first = false;
            self.out(&format!("system {}", name));
        } else if self.proc_sep_lt {
            self.proc_sep_lt = false;
            self.out(&format!(" < {}", name));
        } else {
            self.out(&format!(", {}", name));
        }
        Ok(())
    }

    fn done(&mut self) -> Result<()> {
        self.out(";\n");
        if !self.chanpri.is_empty() {
            let chanpri = std::mem::take(&mut self.chanpri);
            self.out(&format!("chan priority {};\n", chanpri));
        }
        Ok(())
    }

    fn inc_proc_priority(&mut self) -> Result<()> {
        self.proc_sep_lt = true;
        Ok(())
    }

    fn inc_chan_priority(&mut self) -> Result<()> {
        self.chan_sep_lt = true;
        Ok(())
    }

    fn chan_priority(&mut self) -> Result<()> {
        let channel = self.pop_st()?;
        if self.chanpri.is_empty() {
            self.chanpri = channel;
        } else if self.chan_sep_lt {
            self.chan_sep_lt = false;
            self.chanpri.push_str(&format!(" < {}", channel));
        } else {
            self.chanpri.push_str(&format!(", {}", channel));
        }
        Ok(())
    }

    fn default_chan_priority(&mut self) -> Result<()> {
        if self.chanpri.is_empty() {
            self.chanpri = "default".to_string();
        } else if self.chan_sep_lt {
            self.chan_sep_lt = false;
            self.chanpri.push_str(" < default");
        } else {
            self.chanpri.push_str(", default");
        }
        Ok(())
    }

    fn proc_priority(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    fn add_position(&mut self, _position: u32, _offset: u32, _line: u32, _path: &str) -> Result<()> {
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

    #[test]
    fn declaration_with_initialiser() {
        let mut pp = PrettyPrinter::new();
        pp.type_int(Prefix::Const).unwrap();
        pp.expr_nat(5).unwrap();
        pp.decl_var("x", true).unwrap();
        assert_eq!(pp.output(), "const int x = 5;\n");
    }

    #[test]
    fn bounded_int_and_array_dimensions() {
        let mut pp = PrettyPrinter::new();
        pp.expr_nat(0).unwrap();
        pp.expr_nat(7).unwrap();
        pp.type_bounded_int(Prefix::None).unwrap();
        pp.expr_nat(3).unwrap();
        pp.type_array_of_size(1).unwrap();
        pp.decl_var("a", false).unwrap();
        assert_eq!(pp.output(), "int[0,7] a[3];\n");
    }

    #[test]
    fn expression_nesting_parenthesises() {
        let mut pp = PrettyPrinter::new();
        pp.expr_id("x").unwrap();
        pp.expr_nat(1).unwrap();
        pp.expr_binary(BinaryOp::Plus).unwrap();
        pp.expr_nat(10).unwrap();
        pp.expr_binary(BinaryOp::Lt).unwrap();
        assert_eq!(pp.st.last().unwrap(), "((x + 1) < 10)");
    }

    #[test]
    fn call_renders_arguments_in_order() {
        let mut pp = PrettyPrinter::new();
        pp.expr_id("f").unwrap();
        pp.expr_call_begin().unwrap();
        pp.expr_nat(1).unwrap();
        pp.expr_nat(2).unwrap();
        pp.expr_call_end(2).unwrap();
        assert_eq!(pp.st.last().unwrap(), "f(1, 2)");
    }

    #[test]
    fn do_while_prints_symmetrically_to_while() {
        let mut pp = PrettyPrinter::new();
        pp.do_while_begin().unwrap();
        pp.expr_id("x").unwrap();
        pp.expr_statement().unwrap();
        pp.expr_id("x").unwrap();
        pp.do_while_end().unwrap();
        assert_eq!(pp.output(), "do\n    x;\nwhile (x);\n");
    }

    #[test]
    fn edge_labels_print_between_braces() {
        let mut pp = PrettyPrinter::new();
        pp.proc_begin("T").unwrap();
        pp.proc_state("a", false).unwrap();
        pp.proc_state("b", false).unwrap();
        pp.proc_state_init("a").unwrap();
        pp.proc_edge_begin("a", "b", true).unwrap();
        pp.expr_id("x").unwrap();
        pp.expr_nat(2).unwrap();
        pp.expr_binary(BinaryOp::Lt).unwrap();
        pp.proc_guard().unwrap();
        pp.expr_id("c").unwrap();
        pp.proc_sync(Synchronisation::Bang).unwrap();
        pp.proc_edge_end("a", "b").unwrap();
        pp.proc_end().unwrap();

        let text = pp.finish();
        assert!(text.contains("a -> b {"));
        assert!(text.contains("guard (x < 2);"));
        assert!(text.contains("sync c!;"));
        assert!(text.contains("init a;"));
        assert!(pp_is_balanced(&text));
    }

    #[test]
    fn uncontrollable_edges_use_the_u_arrow() {
        let mut pp = PrettyPrinter::new();
        pp.proc_begin("T").unwrap();
        pp.proc_state("a", false).unwrap();
        pp.proc_state_init("a").unwrap();
        pp.proc_edge_begin("a", "a", false).unwrap();
        pp.proc_edge_end("a", "a").unwrap();
        pp.proc_end().unwrap();
        assert!(pp.output().contains("a -u-> a {"));
    }

    #[test]
    fn warnings_are_informational() {
        let mut pp = PrettyPrinter::new();
        assert!(pp.handle_warning("advisory only").is_ok());
        assert!(pp.output().is_empty());
    }

    #[test]
    fn system_line_with_priorities() {
        let mut pp = PrettyPrinter::new();
        pp.process("A").unwrap();
        pp.inc_proc_priority().unwrap();
        pp.process("B").unwrap();
        pp.process("C").unwrap();
        pp.done().unwrap();
        assert_eq!(pp.output(), "system A < B, C;\n");
    }

    fn pp_is_balanced(text: &str) -> bool {
        let mut depth = 0i32;
        for c in text.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
        depth == 0
    }
}
