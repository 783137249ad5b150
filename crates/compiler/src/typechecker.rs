//! Type-stack checker for J
//!
//! Walks the parsed program with a compile-time mirror of the runtime
//! operand stack. Every expression pushes exactly one entry (none for
//! `none`-typed calls); every statement leaves the stack where it found
//! it. Branch bodies are checked against a snapshot of the stack at
//! entry and must come back element-wise equal. Diagnostics are
//! accumulated so one run surfaces as many problems as possible; the
//! compilation fails at the end of the run if any were recorded.

use crate::ast::{Expr, ExprKind, Fun, IdentKind, Program, Stmt, StmtKind};
use crate::lexer::Token;
use crate::types::Type;
use std::fmt::Write as _;

/// One entry of the compile-time operand stack: the type plus the token
/// that produced it, for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct StackEntry {
    pub token: Token,
    pub ty: Type,
}

pub struct TypeChecker<'a> {
    program: &'a Program,
    diagnostics: Vec<String>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(program: &'a Program) -> Self {
        TypeChecker {
            program,
            diagnostics: Vec::new(),
        }
    }

    /// Check the whole program. Returns all accumulated diagnostics as
    /// one error if any check failed.
    pub fn check_program(mut self) -> Result<(), String> {
        // global initializers run on an empty stack inside _start
        for global in self.program.symbols.globals.values() {
            if let Some(init) = &global.init {
                let mut stack = Vec::new();
                if let Some(entry) = self.check_operand(init, &mut stack) {
                    self.require(entry.ty, global.ty, &global.token, "global initializer");
                }
            }
        }

        for fun in &self.program.functions {
            self.check_function(fun);
        }

        if self.diagnostics.is_empty() {
            Ok(())
        } else {
            let mut message = format!(
                "type checking failed with {} error(s):\n",
                self.diagnostics.len()
            );
            message.push_str(&self.diagnostics.join("\n"));
            Err(message)
        }
    }

    fn error(&mut self, message: String) {
        self.diagnostics.push(message);
    }

    fn require(&mut self, found: Type, expected: Type, token: &Token, what: &str) -> bool {
        if found != expected {
            self.error(format!(
                "{}: type mismatch in {}: expected {}, got {}",
                token.location, what, expected, found
            ));
            return false;
        }
        true
    }

    fn check_function(&mut self, fun: &Fun) {
        let mut stack = Vec::new();
        let terminated = self.check_block(&fun.body, &mut stack, fun);
        if !terminated {
            self.check_balance(&stack, &[], &fun.proto.token, "function body");
        }
    }

    /// Check a statement list. Returns true when the block is terminated
    /// by a `return`, in which case any remaining statements are dead and
    /// the residue check does not apply.
    fn check_block(&mut self, stmts: &[Stmt], stack: &mut Vec<StackEntry>, fun: &Fun) -> bool {
        for stmt in stmts {
            if self.check_stmt(stmt, stack, fun) {
                return true;
            }
        }
        false
    }

    /// Returns true when the statement was a `return`.
    fn check_stmt(&mut self, stmt: &Stmt, stack: &mut Vec<StackEntry>, fun: &Fun) -> bool {
        match &stmt.kind {
            StmtKind::VarDef { name, ty, init } => {
                if let Some(init) = init {
                    if let Some(entry) = self.check_operand(init, stack) {
                        self.require(
                            entry.ty,
                            *ty,
                            &stmt.token,
                            &format!("the initializer of '{}'", name),
                        );
                    }
                }
            }
            StmtKind::VarSet { name, ident, value } => {
                let declared = match ident {
                    IdentKind::Local => fun.scope.get(name).map(|v| v.ty),
                    IdentKind::Global => {
                        self.program.symbols.globals.get(name).map(|g| g.ty)
                    }
                    _ => None,
                };
                let entry = self.check_operand(value, stack);
                if let (Some(declared), Some(entry)) = (declared, entry) {
                    self.require(
                        entry.ty,
                        declared,
                        &stmt.token,
                        &format!("the assignment to '{}'", name),
                    );
                }
            }
            StmtKind::Store { address, value, .. } => {
                if let Some(entry) = self.check_operand(address, stack) {
                    self.require(entry.ty, Type::Pointer, &stmt.token, "the store destination");
                }
                // the stored value may be of any type, but must exist
                self.check_operand(value, stack);
            }
            StmtKind::Print(expr) | StmtKind::Drop(expr) => {
                // consumes one value of any type
                self.check_operand(expr, stack);
            }
            StmtKind::Return(value) => {
                match value {
                    Some(expr) => {
                        if let Some(entry) = self.check_operand(expr, stack) {
                            self.require(
                                entry.ty,
                                fun.proto.returns,
                                &stmt.token,
                                &format!("the return value of '{}'", fun.proto.name),
                            );
                        }
                    }
                    None => {
                        if fun.proto.returns != Type::None {
                            self.error(format!(
                                "{}: function '{}' yields {} but returns none",
                                stmt.token.location, fun.proto.name, fun.proto.returns
                            ));
                        }
                    }
                }
                return true;
            }
            StmtKind::If { condition, body } | StmtKind::While { condition, body } => {
                if let Some(entry) = self.check_operand(condition, stack) {
                    self.require(entry.ty, Type::Integer, &condition.token, "the condition");
                }

                // nested branch: the body must restore the entry shape
                let snapshot = stack.clone();
                let terminated = self.check_block(body, stack, fun);
                if terminated {
                    // a return exits the function; restore the outer shape
                    *stack = snapshot;
                } else {
                    self.check_balance(stack, &snapshot, &stmt.token, "branch body");
                    *stack = snapshot;
                }
            }
            StmtKind::Expr(expr) => {
                self.check_expr(expr, stack);
            }
        }
        false
    }

    /// Check a sub-expression that must produce a value, and take that
    /// value off the mirror stack. A `none`-typed call in value position
    /// pushes nothing; that is reported here, at the operand's own
    /// token, and no unrelated entry is popped in its place.
    fn check_operand(
        &mut self,
        expr: &Expr,
        stack: &mut Vec<StackEntry>,
    ) -> Option<StackEntry> {
        let depth = stack.len();
        self.check_expr(expr, stack);
        if stack.len() > depth {
            stack.pop()
        } else {
            self.error(format!(
                "{}: expected a value, but '{}' yields none",
                expr.token.location, expr.token.text
            ));
            None
        }
    }

    /// Mirror an expression's runtime effect onto the type stack.
    /// Pushes exactly one entry unless the expression's type is `none`.
    fn check_expr(&mut self, expr: &Expr, stack: &mut Vec<StackEntry>) {
        match &expr.kind {
            ExprKind::IntLiteral(_)
            | ExprKind::ArrayRef { .. }
            | ExprKind::IdentRef { .. } => {
                stack.push(StackEntry {
                    token: expr.token.clone(),
                    ty: expr.ty,
                });
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                if let Some(entry) = self.check_operand(lhs, stack) {
                    self.require(entry.ty, Type::Integer, &entry.token, "the left operand");
                }
                if let Some(entry) = self.check_operand(rhs, stack) {
                    self.require(entry.ty, Type::Integer, &entry.token, "the right operand");
                }
                stack.push(StackEntry {
                    token: expr.token.clone(),
                    ty: expr.ty,
                });
            }
            ExprKind::AddressOf { .. } => {
                // lea of a named variable; no operand is consumed
                stack.push(StackEntry {
                    token: expr.token.clone(),
                    ty: expr.ty,
                });
            }
            ExprKind::Load { address, .. } => {
                if let Some(entry) = self.check_operand(address, stack) {
                    self.require(entry.ty, Type::Pointer, &expr.token, "the load address");
                }
                stack.push(StackEntry {
                    token: expr.token.clone(),
                    ty: expr.ty,
                });
            }
            ExprKind::Call { name, args } => {
                if let Some(proto) = self.program.symbols.prototypes.get(name) {
                    // arity was checked at parse time, so pair them up
                    for (arg, param) in args.iter().zip(&proto.params) {
                        if let Some(entry) = self.check_operand(arg, stack) {
                            if entry.ty != param.ty {
                                self.error(format!(
                                    "{}: type mismatch in argument '{}' of '{}': expected {}, got {}",
                                    entry.token.location, param.name, name, param.ty, entry.ty
                                ));
                            }
                        }
                    }
                } else {
                    for arg in args {
                        self.check_operand(arg, stack);
                    }
                }
                if expr.ty != Type::None {
                    stack.push(StackEntry {
                        token: expr.token.clone(),
                        ty: expr.ty,
                    });
                }
            }
            ExprKind::Syscall { number, args, .. } => {
                if let Some(entry) = self.check_operand(number, stack) {
                    self.require(entry.ty, Type::Integer, &number.token, "the syscall number");
                }
                for arg in args {
                    // syscall arguments may be of any type, but must exist
                    self.check_operand(arg, stack);
                }
                stack.push(StackEntry {
                    token: expr.token.clone(),
                    ty: expr.ty,
                });
            }
        }
    }

    /// Compare the stack against the expected shape; on mismatch, record
    /// a diagnostic that dumps the residual entries with their origins.
    fn check_balance(
        &mut self,
        stack: &[StackEntry],
        expected: &[StackEntry],
        token: &Token,
        what: &str,
    ) {
        if stack == expected {
            return;
        }
        let mut message = format!(
            "{}: unhandled data on the stack at the end of the {}:",
            token.location, what
        );
        let common = stack
            .iter()
            .zip(expected.iter())
            .take_while(|(a, b)| a == b)
            .count();
        for entry in &stack[common..] {
            let _ = write!(
                &mut message,
                "\n  {}: {} (from '{}')",
                entry.token.location, entry.ty, entry.token.text
            );
        }
        for entry in &expected[common..] {
            let _ = write!(
                &mut message,
                "\n  missing {} (expected since {})",
                entry.ty, entry.token.location
            );
        }
        self.error(message);
    }
}
