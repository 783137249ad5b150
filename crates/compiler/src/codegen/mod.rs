//! NASM x86-64 code generation
//!
//! One-pass stack-machine lowering: every expression pushes its result,
//! every consumer pops its operands. Each lowered construct is preceded
//! by a comment with its source location, and control-flow labels are
//! derived from the originating token's location so they stay unique and
//! traceable.
//!
//! # Module structure
//!
//! - `error.rs`: `CodeGenError`
//! - `frame.rs`: per-function frame layout
//! - `statements.rs`: statement and expression lowering
//! - `control_flow.rs`: if/while label schemes
//! - `program.rs`: whole-program assembly (runtime helper, `_start`,
//!   `.data`/`.bss` sections)

mod control_flow;
mod error;
mod frame;
mod program;
mod statements;

pub use error::CodeGenError;
pub use frame::FrameLayout;

/// Registers receiving syscall arguments, in argument order
pub(super) const SYSCALL_ARG_REGISTERS: [&str; 5] = ["rdi", "rsi", "rdx", "r10", "r9"];

/// Streaming NASM emitter. Holds the output text and the frame layout of
/// the function currently being emitted; the layout is rebuilt at each
/// function entry and dropped at its exit.
pub struct CodeGen {
    pub(super) output: String,
    pub(super) frame: FrameLayout,
}

impl Default for CodeGen {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGen {
    pub fn new() -> Self {
        CodeGen {
            output: String::new(),
            frame: FrameLayout::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::Parser;
    use crate::typechecker::TypeChecker;

    fn generate(source: &str) -> String {
        let program = Parser::new(tokenize("test.j", source).unwrap())
            .parse_program()
            .unwrap();
        TypeChecker::new(&program).check_program().unwrap();
        CodeGen::new().generate(&program).unwrap()
    }

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("expected {:?} in:\n{}", needle, haystack))
    }

    #[test]
    fn test_hello_integer_program() {
        let asm = generate("function main() yields integer is print(42) . return 0 done");
        assert!(asm.starts_with("BITS 64\n"));
        assert!(asm.contains("segment .text"));
        assert!(asm.contains("print:"));
        assert!(asm.contains("main:"));
        assert!(asm.contains("push 42"));
        assert!(asm.contains("pop rdi\ncall print"));
        assert!(asm.contains("global _start"));
        assert!(asm.contains("call main"));
        // exit via syscall 60 with main's return value in rdi
        assert!(asm.contains("mov rax, 60\npop rdi\nsyscall"));
    }

    #[test]
    fn test_missing_main_is_fatal() {
        let program = Parser::new(
            tokenize("test.j", "function helper() yields none is return none done").unwrap(),
        )
        .parse_program()
        .unwrap();
        let err = CodeGen::new().generate(&program).unwrap_err();
        assert!(err.to_string().contains("no main function"));
    }

    #[test]
    fn test_none_operand_rejected_even_without_type_check() {
        // lowering guards its own pop counts: a none-yielding call in
        // value position is refused even when the checker was skipped
        let program = Parser::new(
            tokenize(
                "test.j",
                "function f() yields none is return none done \
                 function main() yields integer is return f() plus 1 done",
            )
            .unwrap(),
        )
        .parse_program()
        .unwrap();
        let err = CodeGen::new().generate(&program).unwrap_err();
        assert!(err.to_string().contains("yields none"));
    }

    #[test]
    fn test_emission_is_deterministic() {
        let source = "define x as integer is 7 . \
                      function main() yields integer is x is x plus 1 . print(x) . return 0 done";
        let first = generate(source);
        let second = generate(source);
        assert_eq!(first, second);
    }

    #[test]
    fn test_arithmetic_lowering() {
        let asm = generate(
            "function main() yields integer is print(2 plus 3 multiply 4) . return 0 done",
        );
        // 3 multiply 4 is evaluated before the addition
        let mul = position(&asm, "imul rax, rdi");
        let add = position(&asm, "add rax, rdi");
        assert!(mul < add);
    }

    #[test]
    fn test_divide_and_modulo_lowering() {
        let asm = generate(
            "function main() yields integer is print(7 divide 2) . print(7 modulo 2) . return 0 done",
        );
        assert!(asm.contains("cqo\nidiv rdi\npush rax"));
        assert!(asm.contains("cqo\nidiv rdi\npush rdx"));
    }

    #[test]
    fn test_comparison_lowering() {
        let asm = generate(
            "function main() yields integer is print(1 less-equal 2) . return 0 done",
        );
        assert!(asm.contains(
            "xor rcx, rcx\nmov rbx, 1\npop rdi\npop rax\ncmp rax, rdi\ncmovle rcx, rbx\npush rcx"
        ));
    }

    #[test]
    fn test_all_comparison_condition_codes() {
        let asm = generate(
            "function main() yields integer is \
             drop 1 equal 2 . drop 1 not-equal 2 . drop 1 less 2 . \
             drop 1 less-equal 2 . drop 1 greater 2 . drop 1 greater-equal 2 . \
             return 0 done",
        );
        for cc in ["cmove", "cmovne", "cmovl", "cmovle", "cmovg", "cmovge"] {
            assert!(asm.contains(&format!("{} rcx, rbx", cc)), "missing {}", cc);
        }
    }

    #[test]
    fn test_frame_and_parameter_shuffle() {
        let asm = generate(
            "function add(a as integer, b as integer) yields integer is return a plus b done \
             function main() yields integer is print(add(20, 22)) . return 0 done",
        );
        // prologue reserves both parameter slots
        assert!(asm.contains("add:\npush rbp\nmov rbp, rsp\nsub rsp, 16"));
        // parameters are copied from the caller-provided rbx base
        assert!(asm.contains("mov rax, [rbx + 0]\nmov [rbp - 8], rax"));
        assert!(asm.contains("mov rax, [rbx + 8]\nmov [rbp - 16], rax"));
        // the caller pushes arguments in reverse, saves rsp, and cleans up
        let second_arg = position(&asm, "push 22");
        let first_arg = position(&asm, "push 20");
        assert!(second_arg < first_arg);
        assert!(asm.contains("mov rbx, rsp\ncall add\nadd rsp, 16\npush rax"));
    }

    #[test]
    fn test_void_call_pushes_nothing() {
        let asm = generate(
            "function log() yields none is print(1) . return none done \
             function main() yields integer is log() . return 0 done",
        );
        assert!(asm.contains("mov rbx, rsp\ncall log\n"));
        assert!(!asm.contains("call log\nadd rsp"));
        // no push rax after the cleanup-free void call
        let call = position(&asm, "call log");
        let after = &asm[call..call + 40];
        assert!(!after.contains("push rax"), "void call must not push: {}", after);
    }

    #[test]
    fn test_syscall_register_marshaling() {
        let asm = generate(
            "function main() yields integer is \
             return syscall5(1, 2, 3, 4, 5, 6) done",
        );
        // five arguments popped in reverse into r9, r10, rdx, rsi, rdi
        assert!(asm.contains("pop r9\npop r10\npop rdx\npop rsi\npop rdi"));
        // then the call number through rax
        assert!(asm.contains("push 1\npop rax\nsyscall\npush rax"));
    }

    #[test]
    fn test_sized_store_and_load() {
        let asm = generate(
            "function main() yields integer is \
             define p as pointer is allocate(8) . \
             store8(p, 65) . store32(p, 65) . \
             print(load8(p)) . print(load64(p)) . \
             return 0 done",
        );
        assert!(asm.contains("mov BYTE [rdi], al"));
        assert!(asm.contains("mov DWORD [rdi], eax"));
        assert!(asm.contains("xor rax, rax\npop rdi\nmov al, BYTE [rdi]\npush rax"));
        assert!(asm.contains("mov rax, QWORD [rdi]"));
    }

    #[test]
    fn test_local_allocate_uses_lea() {
        let asm = generate(
            "function main() yields integer is \
             define p as pointer is allocate(8) . \
             return 0 done",
        );
        assert!(asm.contains("lea rax, [rbp - 16]\npush rax"));
    }

    #[test]
    fn test_global_allocate_uses_symbol() {
        let asm = generate(
            "define buf as pointer is allocate(64) . \
             function main() yields integer is return 0 done",
        );
        assert!(asm.contains("mov rax, _anon_glob_0\npush rax"));
        assert!(asm.contains("_anon_glob_0: resb 64"));
    }

    #[test]
    fn test_data_and_bss_sections() {
        let asm = generate(
            "define g as integer is 7 . \
             constant k as integer is 2 plus 3 . \
             function main() yields integer is drop \"Hi\\n\" . print(k) . return 0 done",
        );
        assert!(asm.contains("segment .data"));
        assert!(asm.contains("_anon_str_0: db 72,105,10,0"));
        assert!(asm.contains("k: dq 5"));
        assert!(asm.contains("segment .bss"));
        assert!(asm.contains("g: resb 8"));
        // the constant reference reads the data cell
        assert!(asm.contains("mov rax, [k]"));
    }

    #[test]
    fn test_global_initializer_runs_in_start() {
        let asm = generate(
            "define x as integer is 7 . \
             function main() yields integer is print(x) . return 0 done",
        );
        let start = position(&asm, "_start:");
        let init = position(&asm, "mov [x], rax");
        let call_main = position(&asm, "call main");
        assert!(start < init && init < call_main);
    }

    #[test]
    fn test_if_labels_from_location() {
        let asm = generate(
            "function main() yields integer is\nif 1 do print(1) . done\nreturn 0 done",
        );
        // the if token is at line 2, column 1
        assert!(asm.contains(".if_cmp_l2_c1:"));
        assert!(asm.contains("je .if_block_end_l2_c1"));
        assert!(asm.contains(".if_block_l2_c1:"));
        assert!(asm.contains(".if_block_end_l2_c1:"));
    }

    #[test]
    fn test_while_labels_and_backward_jump() {
        let asm = generate(
            "function main() yields integer is\nwhile 0 do print(1) . done\nreturn 0 done",
        );
        assert!(asm.contains(".while_cmp_l2_c1:"));
        assert!(asm.contains("je .while_end_l2_c1"));
        assert!(asm.contains(".while_block_l2_c1:"));
        assert!(asm.contains("jmp .while_cmp_l2_c1"));
        assert!(asm.contains(".while_end_l2_c1:"));
    }

    #[test]
    fn test_nested_if_in_while_has_distinct_labels() {
        let asm = generate(
            "function main() yields integer is\n\
             define i as integer is 0 .\n\
             while i less 3 do\n\
             if i equal 1 do print(i) . done\n\
             i is i plus 1 .\n\
             done\n\
             return 0 done",
        );
        assert!(asm.contains(".while_cmp_l3_c1:"));
        assert!(asm.contains(".if_cmp_l4_c1:"));
        assert!(asm.contains(".if_block_end_l4_c1:"));
        assert!(asm.contains(".while_end_l3_c1:"));
    }

    #[test]
    fn test_return_jumps_to_function_end() {
        let asm = generate(
            "function main() yields integer is if 1 do return 1 . done return 0 done",
        );
        assert!(asm.contains("pop rax\njmp .end"));
        assert!(asm.contains(".end:\nmov rsp, rbp\npop rbp\nret"));
    }

    #[test]
    fn test_cast_emits_no_conversion() {
        let asm = generate("function main() yields integer is drop pointer(0) . return 0 done");
        assert!(asm.contains("push 0"));
        assert!(!asm.contains("cvt"));
    }

    #[test]
    fn test_address_of_local_and_global() {
        let asm = generate(
            "define g as integer is 1 . \
             function main() yields integer is \
             define x as integer is 2 . \
             drop address-of(x) . drop address-of(g) . \
             return 0 done",
        );
        assert!(asm.contains("lea rax, [rbp - 8]"));
        assert!(asm.contains("mov rax, g\npush rax"));
    }

    #[test]
    fn test_large_int_literal_goes_through_rax() {
        let asm = generate(
            "function main() yields integer is print(4294967296) . return 0 done",
        );
        assert!(asm.contains("mov rax, 4294967296\npush rax"));
    }

    #[test]
    fn test_empty_body_returns_immediately() {
        let asm = generate(
            "function noop() yields none is done \
             function main() yields integer is noop() . return 0 done",
        );
        assert!(asm.contains("noop:\npush rbp\nmov rbp, rsp\n.end:"));
    }

    #[test]
    fn test_shadowed_global_uses_frame_slot() {
        let asm = generate(
            "define x as integer is 1 . \
             function main() yields integer is \
             define x as integer is 2 . \
             print(x) . return 0 done",
        );
        // the print reads the local slot, not the global cell
        let print_pos = position(&asm, "pop rdi\ncall print");
        let local_read = position(&asm, "mov rax, [rbp - 8]");
        assert!(local_read < print_pos);
    }
}
