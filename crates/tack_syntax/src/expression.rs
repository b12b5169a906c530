//! Expression, statement, and type assembly.
//!
//! [`ExpressionBuilder`] is the engine half of the AST-building consumer: it
//! owns the type registry, the symbol table, and the hidden stacks of the
//! builder protocol — operands, types, array dimensions, parameters, struct
//! fields, and statement capture levels.
//! [`SystemBuilder`](crate::system::SystemBuilder) layers template, edge,
//! and system construction on top and delegates everything here.
//!
//! The stacks hold tagged values, never strings: an operand is an
//! [`Expr`], a pending array dimension is a size expression or a scalar
//! type. That keeps later consumers (edge label extraction, initialiser
//! folding) from re-parsing anything.

use tack_base::{ErrorKind, ParseError, Position, Result};

use crate::ast::{
    AssignOp, BinaryOp, Expr, Payload, Prefix, Statement, TernaryOp, UnaryOp,
};
use crate::symbols::{FrameId, SymbolId, SymbolTable};
use crate::types::{TypeId, TypeRegistry};

/// A pending array dimension of a declarator.
#[derive(Debug, Clone)]
pub(crate) enum ArrayDim {
    /// `x[N]` — size expression, turned into a `0..N-1` index type.
    Size(Expr),
    /// `x[scalarset]` — indexed by a type.
    Scalar(TypeId),
}

/// A collected formal parameter, waiting for the owning function or
/// template to open.
#[derive(Debug, Clone)]
pub(crate) struct Param {
    pub name: String,
    pub ty: TypeId,
    pub by_ref: bool,
}

/// The expression/statement half of the AST assembler.
#[derive(Debug)]
pub struct ExpressionBuilder {
    pub(crate) types: TypeRegistry,
    pub(crate) symbols: SymbolTable<Payload>,
    pub(crate) operands: Vec<Expr>,
    pub(crate) type_stack: Vec<TypeId>,
    pub(crate) dims: Vec<ArrayDim>,
    pub(crate) params: Vec<Param>,
    fields: Vec<(String, TypeId)>,
    pub(crate) blocks: Vec<Vec<Statement>>,
    quantifiers: Vec<SymbolId>,
    iteration_binders: Vec<SymbolId>,
    pub(crate) position: Position,
}

impl Default for ExpressionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self {
            types: TypeRegistry::new(),
            symbols: SymbolTable::new(),
            operands: Vec::new(),
            type_stack: Vec::new(),
            dims: Vec::new(),
            params: Vec::new(),
            fields: Vec::new(),
            blocks: Vec::new(),
            quantifiers: Vec::new(),
            iteration_binders: Vec::new(),
            position: Position::default(),
        }
    }

    // ------------------------------------------------------------------
    // Stack plumbing
    // ------------------------------------------------------------------

    pub(crate) fn pop_expr(&mut self) -> Result<Expr> {
        self.operands.pop().ok_or_else(|| {
            ParseError::new(ErrorKind::SyntaxError, "missing expression operand")
        })
    }

    pub(crate) fn pop_type(&mut self) -> Result<TypeId> {
        self.type_stack
            .pop()
            .ok_or_else(|| ParseError::new(ErrorKind::SyntaxError, "missing type"))
    }

    fn push_stmt(&mut self, stmt: Statement) -> Result<()> {
        match self.blocks.last_mut() {
            Some(block) => {
                block.push(stmt);
                Ok(())
            }
            None => Err(ParseError::new(
                ErrorKind::SyntaxError,
                "statement outside a function body",
            )),
        }
    }

    /// Closes a statement capture level opened by a loop or branch and
    /// yields its single statement (wrapping strays in a block).
    fn pop_captured(&mut self) -> Result<Statement> {
        let mut captured = self.blocks.pop().ok_or_else(|| {
            ParseError::new(ErrorKind::SyntaxError, "unbalanced statement nesting")
        })?;
        Ok(match captured.len() {
            0 => Statement::Empty,
            1 => captured.remove(0),
            _ => Statement::Block(captured),
        })
    }

    fn leave_frame(&mut self) -> Result<()> {
        let parent = self
            .symbols
            .parent_frame(self.symbols.active_frame())
            .unwrap_or(FrameId::ROOT);
        self.symbols.activate_frame(parent)
    }

    // ------------------------------------------------------------------
    // Constant folding and light typing
    // ------------------------------------------------------------------

    /// Best-effort constant evaluation, used for integer ranges and array
    /// sizes. Follows `const` symbols whose initialiser already folded.
    pub(crate) fn eval_const(&self, expr: &Expr) -> Option<i32> {
        match expr {
            Expr::Nat(n) => Some(*n),
            Expr::True => Some(1),
            Expr::False => Some(0),
            Expr::Id(sym) => match self.symbols.payload(*sym) {
                Some(Payload::Constant(v)) => Some(*v),
                _ => None,
            },
            Expr::Unary { op, expr } => {
                let v = self.eval_const(expr)?;
                match op {
                    UnaryOp::Minus => v.checked_neg(),
                    UnaryOp::Plus => Some(v),
                    UnaryOp::Not => Some(if v == 0 { 1 } else { 0 }),
                    _ => None,
                }
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval_const(left)?;
                let r = self.eval_const(right)?;
                match op {
                    BinaryOp::Plus => l.checked_add(r),
                    BinaryOp::Minus => l.checked_sub(r),
                    BinaryOp::Mult => l.checked_mul(r),
                    BinaryOp::Div => l.checked_div(r),
                    BinaryOp::Mod => l.checked_rem(r),
                    BinaryOp::Min => Some(l.min(r)),
                    BinaryOp::Max => Some(l.max(r)),
                    BinaryOp::ShiftLeft => l.checked_shl(r.try_into().ok()?),
                    BinaryOp::ShiftRight => l.checked_shr(r.try_into().ok()?),
                    BinaryOp::BitAnd => Some(l & r),
                    BinaryOp::BitOr => Some(l | r),
                    BinaryOp::BitXor => Some(l ^ r),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// A shallow type for an expression — just enough for the structural
    /// checks done at build time (dot targets, call arity). Full typing is
    /// a later pass.
    pub(crate) fn type_of(&self, expr: &Expr) -> TypeId {
        match expr {
            Expr::Id(sym) => self
                .symbols
                .ty(*sym)
                .map_or(TypeId::VOID, TypeId::clear_flags),
            Expr::Dot { expr, field } => {
                let base = self.types.unalias(self.type_of(expr));
                self.types
                    .record(base)
                    .and_then(|fields| {
                        fields
                            .iter()
                            .find(|(name, _)| name == field)
                            .map(|(_, ty)| *ty)
                    })
                    .unwrap_or(TypeId::VOID)
            }
            Expr::Index { array, .. } => {
                let base = self.types.unalias(self.type_of(array));
                self.types.first_sub_type(base)
            }
            Expr::Call { callee, .. } => {
                let base = self.types.unalias(self.type_of(callee));
                self.types.second_sub_type(base)
            }
            Expr::Assign { target, .. } => self.type_of(target),
            Expr::PreIncrement(e)
            | Expr::PostIncrement(e)
            | Expr::PreDecrement(e)
            | Expr::PostDecrement(e) => self.type_of(e),
            Expr::Deadlock => TypeId::CONSTRAINT,
            Expr::Nat(_) | Expr::True | Expr::False => TypeId::INT,
            _ => TypeId::INT,
        }
    }

    fn describe(&self, expr: &Expr) -> String {
        match expr {
            Expr::Id(sym) => self.symbols.name(*sym).unwrap_or("?").to_string(),
            _ => "expression".to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Type construction
    // ------------------------------------------------------------------

    /// Const and meta become flags; urgent/broadcast only fit channels.
    fn apply_value_prefix(&self, prefix: Prefix, ty: TypeId) -> Result<TypeId> {
        match prefix {
            Prefix::None => Ok(ty),
            Prefix::Const => Ok(ty.make_constant()),
            Prefix::Meta => Ok(ty.make_side_effect_free()),
            Prefix::Urgent | Prefix::Broadcast | Prefix::UrgentBroadcast => Err(ParseError::new(
                ErrorKind::BadType,
                "prefix is only applicable to channels",
            )),
        }
    }

    pub(crate) fn type_duplicate(&mut self) -> Result<()> {
        let top = *self.type_stack.last().ok_or_else(|| {
            ParseError::new(ErrorKind::SyntaxError, "missing type")
        })?;
        self.type_stack.push(top);
        Ok(())
    }

    pub(crate) fn type_pop(&mut self) -> Result<()> {
        self.pop_type().map(|_| ())
    }

    pub(crate) fn type_bool(&mut self, prefix: Prefix) -> Result<()> {
        let base = self.types.add_integer(0, 1);
        let ty = self.apply_value_prefix(prefix, base)?;
        self.type_stack.push(ty);
        Ok(())
    }

    pub(crate) fn type_int(&mut self, prefix: Prefix) -> Result<()> {
        let ty = self.apply_value_prefix(prefix, TypeId::INT)?;
        self.type_stack.push(ty);
        Ok(())
    }

    pub(crate) fn type_bounded_int(&mut self, prefix: Prefix) -> Result<()> {
        let hi = self.pop_expr()?;
        let lo = self.pop_expr()?;
        let lo = self.eval_const(&lo).unwrap_or(i32::MIN);
        let hi = self.eval_const(&hi).unwrap_or(i32::MAX);
        let base = self.types.add_integer(lo, hi);
        let ty = self.apply_value_prefix(prefix, base)?;
        self.type_stack.push(ty);
        Ok(())
    }

    pub(crate) fn type_channel(&mut self, prefix: Prefix) -> Result<()> {
        let ty = match prefix {
            Prefix::None => TypeId::CHANNEL,
            Prefix::Urgent => TypeId::UCHANNEL,
            Prefix::Broadcast => TypeId::BCHANNEL,
            Prefix::UrgentBroadcast => TypeId::UBCHANNEL,
            Prefix::Const | Prefix::Meta => {
                return Err(ParseError::new(
                    ErrorKind::BadType,
                    "prefix is not applicable to channels",
                ))
            }
        };
        self.type_stack.push(ty);
        Ok(())
    }

    pub(crate) fn type_clock(&mut self) -> Result<()> {
        self.type_stack.push(TypeId::CLOCK);
        Ok(())
    }

    pub(crate) fn type_void(&mut self) -> Result<()> {
        self.type_stack.push(TypeId::VOID);
        Ok(())
    }

    pub(crate) fn type_scalar(&mut self, prefix: Prefix) -> Result<()> {
        let size = self.pop_expr()?;
        let n = self.eval_const(&size).unwrap_or(i32::MAX);
        let base = self.types.add_integer(0, n.saturating_sub(1));
        let ty = self.apply_value_prefix(prefix, base)?;
        self.type_stack.push(ty);
        Ok(())
    }

    pub(crate) fn type_name(&mut self, prefix: Prefix, name: &str) -> Result<()> {
        let sym = self.symbols.resolve(name).ok_or_else(|| {
            ParseError::new(
                ErrorKind::UnknownSymbol,
                format!("unknown type name '{}'", name),
            )
        })?;
        let ty = self.symbols.ty(sym).unwrap_or(TypeId::VOID);
        if self.types.class(ty) != TypeId::NAMED {
            return Err(ParseError::new(
                ErrorKind::BadType,
                format!("'{}' is not a type name", name),
            ));
        }
        let ty = self.apply_value_prefix(prefix, ty)?;
        self.type_stack.push(ty);
        Ok(())
    }

    pub(crate) fn struct_field(&mut self, name: &str) -> Result<()> {
        let ty = self.pop_type()?;
        let ty = self.consume_dims(ty)?;
        self.fields.push((name.to_string(), ty));
        Ok(())
    }

    pub(crate) fn type_struct(&mut self, prefix: Prefix, count: usize) -> Result<()> {
        if self.fields.len() < count {
            return Err(ParseError::new(
                ErrorKind::BadType,
                "missing structure fields",
            ));
        }
        let fields = self.fields.split_off(self.fields.len() - count);
        let rec = self.types.add_record(fields)?;
        let ty = self.apply_value_prefix(prefix, rec)?;
        self.type_stack.push(ty);
        Ok(())
    }

    pub(crate) fn type_array_of_size(&mut self, _dim: usize) -> Result<()> {
        let size = self.pop_expr()?;
        self.dims.push(ArrayDim::Size(size));
        Ok(())
    }

    pub(crate) fn type_array_of_type(&mut self, _dim: usize) -> Result<()> {
        let ty = self.pop_type()?;
        self.dims.push(ArrayDim::Scalar(ty));
        Ok(())
    }

    /// Wraps a base type in the pending array dimensions, innermost last.
    pub(crate) fn consume_dims(&mut self, base: TypeId) -> Result<TypeId> {
        let dims = std::mem::take(&mut self.dims);
        let mut ty = base;
        for dim in dims.into_iter().rev() {
            let size_ty = match dim {
                ArrayDim::Size(expr) => {
                    let n = self.eval_const(&expr).unwrap_or(i32::MAX);
                    self.types.add_integer(0, n.saturating_sub(1))
                }
                ArrayDim::Scalar(t) => t,
            };
            ty = self.types.add_array(size_ty, ty)?;
        }
        Ok(ty)
    }

    // ------------------------------------------------------------------
    // Declarations shared with the system layer
    // ------------------------------------------------------------------

    pub(crate) fn decl_initialiser_list(&mut self, count: usize) -> Result<()> {
        if self.operands.len() < count {
            return Err(ParseError::new(
                ErrorKind::SyntaxError,
                "missing initialiser operands",
            ));
        }
        let items = self.operands.split_off(self.operands.len() - count);
        self.operands.push(Expr::InitList(items));
        Ok(())
    }

    pub(crate) fn decl_field_init(&mut self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Ok(());
        }
        let value = self.pop_expr()?;
        self.operands.push(Expr::FieldInit {
            name: name.to_string(),
            value: Box::new(value),
        });
        Ok(())
    }

    pub(crate) fn decl_parameter(&mut self, name: &str, by_ref: bool) -> Result<()> {
        let ty = self.pop_type()?;
        let ty = self.consume_dims(ty)?;
        self.params.push(Param {
            name: name.to_string(),
            ty,
            by_ref,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    pub(crate) fn block_begin(&mut self) -> Result<()> {
        self.blocks.push(Vec::new());
        Ok(())
    }

    pub(crate) fn block_end(&mut self) -> Result<()> {
        let block = self.blocks.pop().ok_or_else(|| {
            ParseError::new(ErrorKind::SyntaxError, "unbalanced block end")
        })?;
        self.push_stmt(Statement::Block(block))
    }

    pub(crate) fn empty_statement(&mut self) -> Result<()> {
        self.push_stmt(Statement::Empty)
    }

    pub(crate) fn expr_statement(&mut self) -> Result<()> {
        let expr = self.pop_expr()?;
        self.push_stmt(Statement::Expr(expr))
    }

    pub(crate) fn return_statement(&mut self, has_value: bool) -> Result<()> {
        let value = if has_value { Some(self.pop_expr()?) } else { None };
        self.push_stmt(Statement::Return(value))
    }

    pub(crate) fn for_begin(&mut self) -> Result<()> {
        self.blocks.push(Vec::new());
        Ok(())
    }

    pub(crate) fn for_end(&mut self) -> Result<()> {
        let body = self.pop_captured()?;
        let step = self.pop_expr()?;
        let cond = self.pop_expr()?;
        let init = self.pop_expr()?;
        self.push_stmt(Statement::For {
            init,
            cond,
            step,
            body: Box::new(body),
        })
    }

    pub(crate) fn iteration_begin(&mut self, name: &str) -> Result<()> {
        let ty = self.pop_type()?;
        let frame = self.symbols.add_frame();
        self.symbols.activate_frame(frame)?;
        let binder = self.symbols.add_symbol(name, ty, Some(Payload::Binder))?;
        self.iteration_binders.push(binder);
        self.blocks.push(Vec::new());
        Ok(())
    }

    pub(crate) fn iteration_end(&mut self, _name: &str) -> Result<()> {
        let body = self.pop_captured()?;
        let binder = self.iteration_binders.pop().ok_or_else(|| {
            ParseError::new(ErrorKind::SyntaxError, "iteration end without begin")
        })?;
        self.leave_frame()?;
        self.push_stmt(Statement::Iteration {
            binder,
            body: Box::new(body),
        })
    }

    pub(crate) fn while_begin(&mut self) -> Result<()> {
        self.blocks.push(Vec::new());
        Ok(())
    }

    pub(crate) fn while_end(&mut self) -> Result<()> {
        let body = self.pop_captured()?;
        let cond = self.pop_expr()?;
        self.push_stmt(Statement::While {
            cond,
            body: Box::new(body),
        })
    }

    pub(crate) fn do_while_begin(&mut self) -> Result<()> {
        self.blocks.push(Vec::new());
        Ok(())
    }

    pub(crate) fn do_while_end(&mut self) -> Result<()> {
        let cond = self.pop_expr()?;
        let body = self.pop_captured()?;
        self.push_stmt(Statement::DoWhile {
            body: Box::new(body),
            cond,
        })
    }

    pub(crate) fn if_begin(&mut self) -> Result<()> {
        self.blocks.push(Vec::new());
        Ok(())
    }

    pub(crate) fn if_else(&mut self) -> Result<()> {
        self.blocks.push(Vec::new());
        Ok(())
    }

    pub(crate) fn if_end(&mut self, has_else: bool) -> Result<()> {
        let else_branch = if has_else {
            Some(Box::new(self.pop_captured()?))
        } else {
            None
        };
        let then_branch = self.pop_captured()?;
        let cond = self.pop_expr()?;
        self.push_stmt(Statement::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }

    pub(crate) fn break_statement(&mut self) -> Result<()> {
        self.push_stmt(Statement::Break)
    }

    pub(crate) fn continue_statement(&mut self) -> Result<()> {
        self.push_stmt(Statement::Continue)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub(crate) fn expr_id(&mut self, name: &str) -> Result<()> {
        let sym = self.symbols.resolve(name).ok_or_else(|| {
            ParseError::new(
                ErrorKind::UnknownSymbol,
                format!("unknown identifier '{}'", name),
            )
        })?;
        self.operands.push(Expr::Id(sym));
        Ok(())
    }

    pub(crate) fn expr_nat(&mut self, value: i32) -> Result<()> {
        self.operands.push(Expr::Nat(value));
        Ok(())
    }

    pub(crate) fn expr_true(&mut self) -> Result<()> {
        self.operands.push(Expr::True);
        Ok(())
    }

    pub(crate) fn expr_false(&mut self) -> Result<()> {
        self.operands.push(Expr::False);
        Ok(())
    }

    pub(crate) fn expr_deadlock(&mut self) -> Result<()> {
        self.operands.push(Expr::Deadlock);
        Ok(())
    }

    pub(crate) fn expr_call_end(&mut self, args: usize) -> Result<()> {
        if self.operands.len() < args + 1 {
            return Err(ParseError::new(
                ErrorKind::SyntaxError,
                "missing call operands",
            ));
        }
        let arg_exprs = self.operands.split_off(self.operands.len() - args);
        let callee = self.pop_expr()?;

        let callee_ty = self.types.unalias(self.type_of(&callee));
        if self.types.class(callee_ty) != TypeId::FUNCTION {
            return Err(ParseError::new(
                ErrorKind::BadType,
                format!("'{}' is not a function", self.describe(&callee)),
            ));
        }
        let domain = self.types.first_sub_type(callee_ty);
        let expected = self.types.record(domain).map_or(0, |fields| fields.len());
        if expected != args {
            return Err(ParseError::new(
                ErrorKind::ArityMismatch,
                format!(
                    "'{}' expects {} arguments but got {}",
                    self.describe(&callee),
                    expected,
                    args
                ),
            ));
        }

        self.operands.push(Expr::Call {
            callee: Box::new(callee),
            args: arg_exprs,
        });
        Ok(())
    }

    pub(crate) fn expr_array(&mut self) -> Result<()> {
        let index = self.pop_expr()?;
        let array = self.pop_expr()?;
        self.operands.push(Expr::Index {
            array: Box::new(array),
            index: Box::new(index),
        });
        Ok(())
    }

    pub(crate) fn expr_post_increment(&mut self) -> Result<()> {
        let e = self.pop_expr()?;
        self.operands.push(Expr::PostIncrement(Box::new(e)));
        Ok(())
    }

    pub(crate) fn expr_pre_increment(&mut self) -> Result<()> {
        let e = self.pop_expr()?;
        self.operands.push(Expr::PreIncrement(Box::new(e)));
        Ok(())
    }

    pub(crate) fn expr_post_decrement(&mut self) -> Result<()> {
        let e = self.pop_expr()?;
        self.operands.push(Expr::PostDecrement(Box::new(e)));
        Ok(())
    }

    pub(crate) fn expr_pre_decrement(&mut self) -> Result<()> {
        let e = self.pop_expr()?;
        self.operands.push(Expr::PreDecrement(Box::new(e)));
        Ok(())
    }

    pub(crate) fn expr_assignment(&mut self, op: AssignOp) -> Result<()> {
        let value = self.pop_expr()?;
        let target = self.pop_expr()?;
        self.operands.push(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        });
        Ok(())
    }

    pub(crate) fn expr_unary(&mut self, op: UnaryOp) -> Result<()> {
        let e = self.pop_expr()?;
        self.operands.push(Expr::Unary {
            op,
            expr: Box::new(e),
        });
        Ok(())
    }

    pub(crate) fn expr_binary(&mut self, op: BinaryOp) -> Result<()> {
        let right = self.pop_expr()?;
        let left = self.pop_expr()?;
        self.operands.push(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        });
        Ok(())
    }

    pub(crate) fn expr_ternary(&mut self, op: TernaryOp) -> Result<()> {
        let third = self.pop_expr()?;
        let second = self.pop_expr()?;
        let first = self.pop_expr()?;
        self.operands.push(Expr::Ternary {
            op,
            first: Box::new(first),
            second: Box::new(second),
            third: Box::new(third),
        });
        Ok(())
    }

    pub(crate) fn expr_inline_if(&mut self) -> Result<()> {
        let else_expr = self.pop_expr()?;
        let then_expr = self.pop_expr()?;
        let cond = self.pop_expr()?;
        self.operands.push(Expr::InlineIf {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        });
        Ok(())
    }

    pub(crate) fn expr_comma(&mut self) -> Result<()> {
        let right = self.pop_expr()?;
        let left = self.pop_expr()?;
        self.operands.push(Expr::Comma {
            left: Box::new(left),
            right: Box::new(right),
        });
        Ok(())
    }

    pub(crate) fn expr_dot(&mut self, field: &str) -> Result<()> {
        let expr = self.pop_expr()?;
        let base = self.types.unalias(self.type_of(&expr));
        match self.types.class(base) {
            TypeId::RECORD => {
                let known = self
                    .types
                    .record(base)
                    .is_some_and(|fields| fields.iter().any(|(name, _)| name == field));
                if !known {
                    return Err(ParseError::new(
                        ErrorKind::BadType,
                        format!("structure has no member '{}'", field),
                    ));
                }
            }
            TypeId::PROCESS => {}
            _ => {
                return Err(ParseError::new(
                    ErrorKind::BadType,
                    "dot operator requires a structure or a process",
                ))
            }
        }
        self.operands.push(Expr::Dot {
            expr: Box::new(expr),
            field: field.to_string(),
        });
        Ok(())
    }

    pub(crate) fn expr_for_all_begin(&mut self, name: &str) -> Result<()> {
        self.quantifier_begin(name)
    }

    pub(crate) fn expr_for_all_end(&mut self, _name: &str) -> Result<()> {
        let (binder, body) = self.quantifier_end()?;
        self.operands.push(Expr::Forall {
            binder,
            body: Box::new(body),
        });
        Ok(())
    }

    pub(crate) fn expr_exists_begin(&mut self, name: &str) -> Result<()> {
        self.quantifier_begin(name)
    }

    pub(crate) fn expr_exists_end(&mut self, _name: &str) -> Result<()> {
        let (binder, body) = self.quantifier_end()?;
        self.operands.push(Expr::Exists {
            binder,
            body: Box::new(body),
        });
        Ok(())
    }

    fn quantifier_begin(&mut self, name: &str) -> Result<()> {
        let ty = self.pop_type()?;
        let frame = self.symbols.add_frame();
        self.symbols.activate_frame(frame)?;
        let binder = self.symbols.add_symbol(name, ty, Some(Payload::Binder))?;
        self.quantifiers.push(binder);
        Ok(())
    }

    fn quantifier_end(&mut self) -> Result<(SymbolId, Expr)> {
        let body = self.pop_expr()?;
        let binder = self.quantifiers.pop().ok_or_else(|| {
            ParseError::new(ErrorKind::SyntaxError, "quantifier end without begin")
        })?;
        self.leave_frame()?;
        Ok((binder, body))
    }
}
