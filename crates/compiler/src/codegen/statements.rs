//! Statement and expression lowering
//!
//! Expressions leave exactly one value on the machine stack; statements
//! leave it balanced. Operand order follows the evaluation order, so
//! binary consumers pop the right operand into `rdi` first and the left
//! into `rax`.

use super::{CodeGen, CodeGenError, SYSCALL_ARG_REGISTERS};
use crate::ast::{Expr, ExprKind, IdentKind, Stmt, StmtKind};
use crate::lexer::Operator;
use crate::types::Type;
use std::fmt::Write as _;

impl CodeGen {
    /// Emit a sub-expression that must leave exactly one value on the
    /// machine stack. The type checker rejects `none`-typed calls in
    /// value position; if one still arrives here, the front end was
    /// bypassed and emitting pops for it would corrupt the stack.
    pub(super) fn codegen_operand(&mut self, expr: &Expr) -> Result<(), CodeGenError> {
        if expr.ty == Type::None {
            return Err(CodeGenError::invariant(
                expr.token.location.clone(),
                format!(
                    "'{}' yields none and cannot be used as a value",
                    expr.token.text
                ),
            ));
        }
        self.codegen_expr(expr)
    }
    pub(super) fn codegen_stmt(&mut self, stmt: &Stmt) -> Result<(), CodeGenError> {
        match &stmt.kind {
            StmtKind::VarDef { name, init, .. } => {
                if let Some(init) = init {
                    writeln!(
                        &mut self.output,
                        "; {} define variable {}",
                        stmt.token.location, name
                    )?;
                    self.codegen_operand(init)?;
                    writeln!(&mut self.output, "pop rax")?;
                    let offset = self.local_offset(name)?;
                    writeln!(&mut self.output, "mov [rbp - {}], rax", offset)?;
                }
            }
            StmtKind::VarSet { name, ident, value } => {
                writeln!(
                    &mut self.output,
                    "; {} set variable {}",
                    stmt.token.location, name
                )?;
                self.codegen_operand(value)?;
                writeln!(&mut self.output, "pop rax")?;
                match ident {
                    IdentKind::Local => {
                        let offset = self.local_offset(name)?;
                        writeln!(&mut self.output, "mov [rbp - {}], rax", offset)?;
                    }
                    IdentKind::Global => {
                        writeln!(&mut self.output, "mov [{}], rax", name)?;
                    }
                    other => {
                        return Err(CodeGenError::invariant(
                            stmt.token.location.clone(),
                            format!("cannot store into {} '{}'", other, name),
                        ));
                    }
                }
            }
            StmtKind::Store {
                width,
                address,
                value,
            } => {
                writeln!(
                    &mut self.output,
                    "; {} store{}",
                    stmt.token.location, width
                )?;
                self.codegen_operand(address)?;
                self.codegen_operand(value)?;
                writeln!(&mut self.output, "pop rax")?;
                writeln!(&mut self.output, "pop rdi")?;
                writeln!(
                    &mut self.output,
                    "mov {} [rdi], {}",
                    width.size_keyword(),
                    width.rax_subregister()
                )?;
            }
            StmtKind::Print(expr) => {
                self.codegen_operand(expr)?;
                writeln!(&mut self.output, "; {} print", stmt.token.location)?;
                writeln!(&mut self.output, "pop rdi")?;
                writeln!(&mut self.output, "call print")?;
            }
            StmtKind::Drop(expr) => {
                writeln!(&mut self.output, "; {} drop", stmt.token.location)?;
                self.codegen_operand(expr)?;
                writeln!(&mut self.output, "pop rax")?;
            }
            StmtKind::Return(value) => {
                writeln!(&mut self.output, "; {} return", stmt.token.location)?;
                if let Some(value) = value {
                    self.codegen_operand(value)?;
                    writeln!(&mut self.output, "pop rax")?;
                }
                writeln!(&mut self.output, "jmp .end")?;
            }
            StmtKind::If { condition, body } => {
                self.codegen_if(&stmt.token, condition, body)?;
            }
            StmtKind::While { condition, body } => {
                self.codegen_while(&stmt.token, condition, body)?;
            }
            StmtKind::Expr(expr) => {
                self.codegen_expr(expr)?;
            }
        }
        Ok(())
    }

    pub(super) fn codegen_expr(&mut self, expr: &Expr) -> Result<(), CodeGenError> {
        match &expr.kind {
            ExprKind::IntLiteral(value) => {
                writeln!(
                    &mut self.output,
                    "; {} push int literal {}",
                    expr.token.location, value
                )?;
                // push imm only encodes sign-extended 32-bit immediates
                if i32::try_from(*value).is_ok() {
                    writeln!(&mut self.output, "push {}", value)?;
                } else {
                    writeln!(&mut self.output, "mov rax, {}", value)?;
                    writeln!(&mut self.output, "push rax")?;
                }
            }
            ExprKind::ArrayRef { symbol } => {
                writeln!(
                    &mut self.output,
                    "; {} push array reference {}",
                    expr.token.location, symbol
                )?;
                if self.frame.contains(symbol) {
                    let offset = self.local_offset(symbol)?;
                    writeln!(&mut self.output, "lea rax, [rbp - {}]", offset)?;
                } else {
                    writeln!(&mut self.output, "mov rax, {}", symbol)?;
                }
                writeln!(&mut self.output, "push rax")?;
            }
            ExprKind::IdentRef { name, ident } => match ident {
                IdentKind::Local => {
                    writeln!(
                        &mut self.output,
                        "; {} get variable {}",
                        expr.token.location, name
                    )?;
                    let offset = self.local_offset(name)?;
                    writeln!(&mut self.output, "mov rax, [rbp - {}]", offset)?;
                    writeln!(&mut self.output, "push rax")?;
                }
                IdentKind::Global => {
                    writeln!(
                        &mut self.output,
                        "; {} get global variable {}",
                        expr.token.location, name
                    )?;
                    writeln!(&mut self.output, "mov rax, [{}]", name)?;
                    writeln!(&mut self.output, "push rax")?;
                }
                IdentKind::Constant => {
                    writeln!(
                        &mut self.output,
                        "; {} get constant {}",
                        expr.token.location, name
                    )?;
                    writeln!(&mut self.output, "mov rax, [{}]", name)?;
                    writeln!(&mut self.output, "push rax")?;
                }
                IdentKind::Function => {
                    return Err(CodeGenError::invariant(
                        expr.token.location.clone(),
                        format!("function '{}' used as a value", name),
                    ));
                }
            },
            ExprKind::Binary { op, lhs, rhs } => {
                self.codegen_operand(lhs)?;
                self.codegen_operand(rhs)?;
                self.codegen_binary_op(expr, *op)?;
            }
            ExprKind::AddressOf { target } => {
                let ExprKind::IdentRef { name, ident } = &target.kind else {
                    return Err(CodeGenError::invariant(
                        expr.token.location.clone(),
                        "address-of target is not an identifier",
                    ));
                };
                writeln!(
                    &mut self.output,
                    "; {} address-of {}",
                    expr.token.location, name
                )?;
                match ident {
                    IdentKind::Local => {
                        let offset = self.local_offset(name)?;
                        writeln!(&mut self.output, "lea rax, [rbp - {}]", offset)?;
                    }
                    IdentKind::Global => {
                        writeln!(&mut self.output, "mov rax, {}", name)?;
                    }
                    other => {
                        return Err(CodeGenError::invariant(
                            expr.token.location.clone(),
                            format!("cannot take the address of {} '{}'", other, name),
                        ));
                    }
                }
                writeln!(&mut self.output, "push rax")?;
            }
            ExprKind::Load { width, address } => {
                writeln!(
                    &mut self.output,
                    "; {} load{}",
                    expr.token.location, width
                )?;
                self.codegen_operand(address)?;
                writeln!(&mut self.output, "xor rax, rax")?;
                writeln!(&mut self.output, "pop rdi")?;
                writeln!(
                    &mut self.output,
                    "mov {}, {} [rdi]",
                    width.rax_subregister(),
                    width.size_keyword()
                )?;
                writeln!(&mut self.output, "push rax")?;
            }
            ExprKind::Call { name, args } => {
                writeln!(
                    &mut self.output,
                    "; {} call {}",
                    expr.token.location, name
                )?;
                // arguments go onto the stack in reverse order, one slot
                // each; rbx tells the callee where they start
                for arg in args.iter().rev() {
                    self.codegen_operand(arg)?;
                }
                writeln!(&mut self.output, "mov rbx, rsp")?;
                writeln!(&mut self.output, "call {}", name)?;
                if !args.is_empty() {
                    writeln!(&mut self.output, "add rsp, {}", args.len() * 8)?;
                }
                // a none-yielding call leaves nothing on the stack
                if expr.ty != Type::None {
                    writeln!(&mut self.output, "push rax")?;
                }
            }
            ExprKind::Syscall { number, args, .. } => {
                writeln!(
                    &mut self.output,
                    "; {} syscall{}",
                    expr.token.location,
                    args.len()
                )?;
                for arg in args {
                    self.codegen_operand(arg)?;
                }
                for i in (0..args.len()).rev() {
                    writeln!(&mut self.output, "pop {}", SYSCALL_ARG_REGISTERS[i])?;
                }
                // the call number goes through rax last, since rax is the
                // push/pop scratch register
                self.codegen_operand(number)?;
                writeln!(&mut self.output, "pop rax")?;
                writeln!(&mut self.output, "syscall")?;
                writeln!(&mut self.output, "push rax")?;
            }
        }
        Ok(())
    }

    /// Both operands were emitted through `codegen_operand`, so exactly
    /// two values sit on top of the stack here; the fixed pop pairs
    /// below rely on that.
    fn codegen_binary_op(&mut self, expr: &Expr, op: Operator) -> Result<(), CodeGenError> {
        let loc = &expr.token.location;
        match op {
            Operator::Plus => {
                writeln!(&mut self.output, "; {} plus", loc)?;
                writeln!(&mut self.output, "pop rdi")?;
                writeln!(&mut self.output, "pop rax")?;
                writeln!(&mut self.output, "add rax, rdi")?;
                writeln!(&mut self.output, "push rax")?;
            }
            Operator::Minus => {
                writeln!(&mut self.output, "; {} minus", loc)?;
                writeln!(&mut self.output, "pop rdi")?;
                writeln!(&mut self.output, "pop rax")?;
                writeln!(&mut self.output, "sub rax, rdi")?;
                writeln!(&mut self.output, "push rax")?;
            }
            Operator::Multiply => {
                writeln!(&mut self.output, "; {} multiply", loc)?;
                writeln!(&mut self.output, "pop rdi")?;
                writeln!(&mut self.output, "pop rax")?;
                writeln!(&mut self.output, "imul rax, rdi")?;
                writeln!(&mut self.output, "push rax")?;
            }
            Operator::Divide => {
                writeln!(&mut self.output, "; {} divide", loc)?;
                writeln!(&mut self.output, "pop rdi")?;
                writeln!(&mut self.output, "pop rax")?;
                writeln!(&mut self.output, "cqo")?;
                writeln!(&mut self.output, "idiv rdi")?;
                writeln!(&mut self.output, "push rax")?;
            }
            Operator::Modulo => {
                writeln!(&mut self.output, "; {} modulo", loc)?;
                writeln!(&mut self.output, "pop rdi")?;
                writeln!(&mut self.output, "pop rax")?;
                writeln!(&mut self.output, "cqo")?;
                writeln!(&mut self.output, "idiv rdi")?;
                writeln!(&mut self.output, "push rdx")?;
            }
            Operator::Equal => self.codegen_comparison(loc, "equal", "cmove")?,
            Operator::NotEqual => self.codegen_comparison(loc, "not-equal", "cmovne")?,
            Operator::Less => self.codegen_comparison(loc, "less", "cmovl")?,
            Operator::LessEqual => self.codegen_comparison(loc, "less-equal", "cmovle")?,
            Operator::Greater => self.codegen_comparison(loc, "greater", "cmovg")?,
            Operator::GreaterEqual => self.codegen_comparison(loc, "greater-equal", "cmovge")?,
        }
        Ok(())
    }

    /// Canonical comparison sequence: zero rcx, stage 1 in rbx, compare,
    /// conditionally move, push the 0/1 result.
    fn codegen_comparison(
        &mut self,
        loc: &crate::lexer::SourceLocation,
        name: &str,
        cmov: &str,
    ) -> Result<(), CodeGenError> {
        writeln!(&mut self.output, "; {} {}", loc, name)?;
        writeln!(&mut self.output, "xor rcx, rcx")?;
        writeln!(&mut self.output, "mov rbx, 1")?;
        writeln!(&mut self.output, "pop rdi")?;
        writeln!(&mut self.output, "pop rax")?;
        writeln!(&mut self.output, "cmp rax, rdi")?;
        writeln!(&mut self.output, "{} rcx, rbx", cmov)?;
        writeln!(&mut self.output, "push rcx")?;
        Ok(())
    }

    pub(super) fn local_offset(&self, name: &str) -> Result<u64, CodeGenError> {
        self.frame
            .offset_of(name)
            .ok_or_else(|| CodeGenError::UnassignedLocal(name.to_string()))
    }
}
