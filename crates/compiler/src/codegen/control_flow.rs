//! Control flow lowering
//!
//! Labels are derived from the originating token's location
//! (`l<line>_c<col>`), which keeps them unique per construct and lets a
//! reader map the assembly back to the source. All labels are
//! NASM-local (dot-prefixed), scoped to the enclosing function label.

use super::{CodeGen, CodeGenError};
use crate::ast::{Expr, Stmt};
use crate::lexer::Token;
use std::fmt::Write as _;

impl CodeGen {
    /// `if`: evaluate the condition, compare against zero, jump past the
    /// body when it is zero.
    pub(super) fn codegen_if(
        &mut self,
        token: &Token,
        condition: &Expr,
        body: &[Stmt],
    ) -> Result<(), CodeGenError> {
        writeln!(&mut self.output, "; {} if block", token.location)?;
        let base = token.location.label_base();

        self.codegen_operand(condition)?;

        writeln!(&mut self.output, ".if_cmp_{}:", base)?;
        writeln!(&mut self.output, "pop rax")?;
        writeln!(&mut self.output, "cmp rax, 0")?;
        writeln!(&mut self.output, "je .if_block_end_{}", base)?;
        writeln!(&mut self.output, ".if_block_{}:", base)?;

        for stmt in body {
            self.codegen_stmt(stmt)?;
        }

        writeln!(&mut self.output, ".if_block_end_{}:", base)?;
        Ok(())
    }

    /// `while`: top-of-loop label re-evaluates the condition, the same
    /// compare-and-branch exits, and the body jumps back unconditionally.
    pub(super) fn codegen_while(
        &mut self,
        token: &Token,
        condition: &Expr,
        body: &[Stmt],
    ) -> Result<(), CodeGenError> {
        writeln!(&mut self.output, "; {} while block", token.location)?;
        let base = token.location.label_base();

        writeln!(&mut self.output, ".while_cmp_{}:", base)?;
        self.codegen_operand(condition)?;
        writeln!(&mut self.output, "pop rax")?;
        writeln!(&mut self.output, "cmp rax, 0")?;
        writeln!(&mut self.output, "je .while_end_{}", base)?;
        writeln!(&mut self.output, ".while_block_{}:", base)?;

        for stmt in body {
            self.codegen_stmt(stmt)?;
        }

        writeln!(&mut self.output, "jmp .while_cmp_{}", base)?;
        writeln!(&mut self.output, ".while_end_{}:", base)?;
        Ok(())
    }
}
