//! Whole-program assembly
//!
//! Emission order: `BITS 64`, the `.text` segment with the fixed decimal
//! print helper, every function in source order, then `_start` (global
//! initializers, `call main`, exit syscall), the `.data` segment with
//! string payloads and constants, and finally `.bss` for uninitialized
//! globals and anonymous blocks.

use super::{CodeGen, CodeGenError, FrameLayout};
use crate::ast::{Fun, Program};
use std::fmt::Write as _;

/// Decimal integer printer: value in rdi, writes digits and a newline to
/// fd 1 with the write syscall. Division by multiplication with the
/// magic reciprocal of 10.
const PRINT_HELPER: &str = "print:
    mov     r9, -3689348814741910323
    sub     rsp, 40
    mov     BYTE [rsp+31], 10
    lea     rcx, [rsp+30]
.L2:
    mov     rax, rdi
    lea     r8, [rsp+32]
    mul     r9
    mov     rax, rdi
    sub     r8, rcx
    shr     rdx, 3
    lea     rsi, [rdx+rdx*4]
    add     rsi, rsi
    sub     rax, rsi
    add     eax, 48
    mov     BYTE [rcx], al
    mov     rax, rdi
    mov     rdi, rdx
    mov     rdx, rcx
    sub     rcx, 1
    cmp     rax, 9
    ja      .L2
    lea     rax, [rsp+32]
    mov     edi, 1
    sub     rdx, rax
    xor     eax, eax
    lea     rsi, [rsp+32+rdx]
    mov     rdx, r8
    mov     rax, 1
    syscall
    add     rsp, 40
    ret
";

impl CodeGen {
    /// Generate the complete NASM module for a checked program.
    pub fn generate(mut self, program: &Program) -> Result<String, CodeGenError> {
        if !program.symbols.prototypes.contains_key("main") {
            return Err(CodeGenError::MissingMain);
        }

        writeln!(&mut self.output, "BITS 64")?;
        writeln!(&mut self.output, "segment .text")?;
        self.output.push_str(PRINT_HELPER);

        for fun in &program.functions {
            self.codegen_function(fun)?;
        }

        self.codegen_start(program)?;
        self.codegen_data(program)?;
        self.codegen_bss(program)?;

        Ok(self.output)
    }

    fn codegen_function(&mut self, fun: &Fun) -> Result<(), CodeGenError> {
        // frame layout is per-function state; built here, dropped below
        self.frame = FrameLayout::build(&fun.locals);

        writeln!(&mut self.output, "; Function Definition {}", fun.proto.name)?;
        writeln!(&mut self.output, "{}:", fun.proto.name)?;
        writeln!(&mut self.output, "push rbp")?;
        writeln!(&mut self.output, "mov rbp, rsp")?;
        if self.frame.size > 0 {
            writeln!(&mut self.output, "sub rsp, {}", self.frame.size)?;
        }

        // incoming arguments sit at the caller's rsp snapshot in rbx;
        // copy each into its own frame slot
        for param in &fun.proto.params {
            let offset = self.local_offset(&param.name)?;
            writeln!(&mut self.output, "mov rax, [rbx + {}]", offset - 8)?;
            writeln!(&mut self.output, "mov [rbp - {}], rax", offset)?;
        }

        for stmt in &fun.body {
            self.codegen_stmt(stmt)?;
        }

        writeln!(&mut self.output, ".end:")?;
        writeln!(&mut self.output, "mov rsp, rbp")?;
        writeln!(&mut self.output, "pop rbp")?;
        writeln!(&mut self.output, "ret")?;
        writeln!(&mut self.output, "; End of Function {}", fun.proto.name)?;
        writeln!(&mut self.output)?;

        self.frame = FrameLayout::default();
        Ok(())
    }

    fn codegen_start(&mut self, program: &Program) -> Result<(), CodeGenError> {
        writeln!(&mut self.output)?;
        writeln!(&mut self.output, "global _start")?;
        writeln!(&mut self.output, "_start:")?;

        writeln!(&mut self.output, "glob_var_defs:")?;
        for global in program.symbols.globals.values() {
            if let Some(init) = &global.init {
                writeln!(
                    &mut self.output,
                    "; {} initialize global {}",
                    global.token.location, global.name
                )?;
                self.codegen_operand(init)?;
                writeln!(&mut self.output, "pop rax")?;
                writeln!(&mut self.output, "mov [{}], rax", global.name)?;
            }
        }

        writeln!(&mut self.output)?;
        writeln!(&mut self.output, "call main")?;
        writeln!(&mut self.output, "push rax")?;
        writeln!(&mut self.output, "; exit")?;
        writeln!(&mut self.output, "mov rax, 60")?;
        writeln!(&mut self.output, "pop rdi")?;
        writeln!(&mut self.output, "syscall")?;
        Ok(())
    }

    fn codegen_data(&mut self, program: &Program) -> Result<(), CodeGenError> {
        let symbols = &program.symbols;
        if symbols.string_literals.is_empty() && symbols.constants.is_empty() {
            return Ok(());
        }

        writeln!(&mut self.output)?;
        writeln!(&mut self.output, "segment .data")?;
        for (index, payload) in symbols.string_literals.iter().enumerate() {
            // byte values plus the terminating null
            let mut bytes: Vec<String> = payload.bytes().map(|b| b.to_string()).collect();
            bytes.push("0".to_string());
            writeln!(
                &mut self.output,
                "_anon_str_{}: db {}",
                index,
                bytes.join(",")
            )?;
        }
        for constant in symbols.constants.values() {
            writeln!(&mut self.output, "{}: dq {}", constant.name, constant.value)?;
        }
        Ok(())
    }

    fn codegen_bss(&mut self, program: &Program) -> Result<(), CodeGenError> {
        let symbols = &program.symbols;
        if symbols.globals.is_empty() && symbols.anon_globals.is_empty() {
            return Ok(());
        }

        writeln!(&mut self.output)?;
        writeln!(&mut self.output, "segment .bss")?;
        for global in symbols.globals.values() {
            writeln!(&mut self.output, "{}: resb {}", global.name, global.size)?;
        }
        for block in &symbols.anon_globals {
            writeln!(&mut self.output, "{}: resb {}", block.name, block.size)?;
        }
        Ok(())
    }
}
