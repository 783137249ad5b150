//! J compiler library
//!
//! Provides compilation from `.j` source to NASM assembly and, through
//! the external assembler and linker, to a static ELF executable.
//!
//! The pipeline is strictly sequential: token stream (with import
//! expansion), recursive-descent parse into a typed AST plus symbol
//! tables, type-stack checking, and one-pass NASM emission. The driver
//! here writes the assembly next to the source and shells out to the
//! configured tools, forwarding their stderr on failure.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod symbols;
pub mod typechecker;
pub mod types;

pub use ast::Program;
pub use codegen::{CodeGen, CodeGenError};
pub use config::CompilerConfig;
pub use parser::Parser;
pub use typechecker::TypeChecker;
pub use types::Type;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Compile a source string to NASM text. Imports are not available in
/// this mode since there is no base path to resolve them against.
pub fn compile_source(file: &str, source: &str) -> Result<String, String> {
    let tokens = lexer::tokenize(file, source)?;
    let program = Parser::new(tokens).parse_program()?;
    TypeChecker::new(&program).check_program()?;
    CodeGen::new()
        .generate(&program)
        .map_err(|e| e.to_string())
}

/// Front half of the pipeline: lex (expanding imports), parse, check.
pub fn analyze_file(source_path: &Path) -> Result<Program, String> {
    let tokens = resolver::lex_program(source_path)?;
    let program = Parser::new(tokens).parse_program()?;
    TypeChecker::new(&program).check_program()?;
    Ok(program)
}

/// Compile a source file all the way to an executable.
///
/// Writes `<source>.asm`, assembles it to `<source>.o`, and links the
/// final binary (default `<source>.exe`, overridable with `output`).
/// With `asm_only` the pipeline stops after the assembly file is
/// written. Returns the path of the last artifact produced.
pub fn compile_file(
    source_path: &Path,
    output: Option<&Path>,
    asm_only: bool,
    config: &CompilerConfig,
) -> Result<PathBuf, String> {
    let program = analyze_file(source_path)?;
    let asm = CodeGen::new()
        .generate(&program)
        .map_err(|e| e.to_string())?;

    let asm_path = source_path.with_extension("asm");
    fs::write(&asm_path, asm)
        .map_err(|e| format!("failed to write {}: {}", asm_path.display(), e))?;

    if asm_only {
        return Ok(asm_path);
    }

    let object_path = source_path.with_extension("o");
    let exe_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| source_path.with_extension("exe"));

    assemble_and_link(&asm_path, &object_path, &exe_path, config)?;
    Ok(exe_path)
}

/// Run the configured assembler and linker, inspecting exit codes and
/// forwarding captured stderr on failure.
pub fn assemble_and_link(
    asm_path: &Path,
    object_path: &Path,
    exe_path: &Path,
    config: &CompilerConfig,
) -> Result<(), String> {
    let assembler = &config.assembler;
    let output = Command::new(&assembler.command)
        .args(&assembler.args)
        .arg(asm_path)
        .output()
        .map_err(|e| format!("failed to run {}: {}", assembler.command, e))?;
    if !output.status.success() {
        return Err(format!(
            "{} failed with exit code {:?}:\n{}",
            assembler.command,
            output.status.code(),
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    let linker = &config.linker;
    let output = Command::new(&linker.command)
        .args(&linker.args)
        .arg("-o")
        .arg(exe_path)
        .arg(object_path)
        .output()
        .map_err(|e| format!("failed to run {}: {}", linker.command, e))?;
    if !output.status.success() {
        return Err(format!(
            "{} failed with exit code {:?}:\n{}",
            linker.command,
            output.status.code(),
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_source_end_to_end() {
        let asm = compile_source(
            "test.j",
            "function main() yields integer is print(42) . return 0 done",
        )
        .unwrap();
        assert!(asm.contains("BITS 64"));
        assert!(asm.contains("call main"));
    }

    #[test]
    fn test_compile_source_surfaces_lex_errors() {
        let err = compile_source("test.j", "function @").unwrap_err();
        assert!(err.contains("invalid starting character"));
    }

    #[test]
    fn test_compile_source_surfaces_parse_errors() {
        let err = compile_source("test.j", "function main yields").unwrap_err();
        assert!(err.contains("expected '('"));
    }

    #[test]
    fn test_compile_source_surfaces_type_errors() {
        let err = compile_source(
            "test.j",
            "function main() yields integer is store64(1, 2) . return 0 done",
        )
        .unwrap_err();
        assert!(err.contains("type checking failed"));
    }

    #[test]
    fn test_compile_file_asm_only_writes_assembly() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("prog.j");
        fs::write(
            &source,
            "function main() yields integer is print(1) . return 0 done",
        )
        .unwrap();

        let artifact =
            compile_file(&source, None, true, &CompilerConfig::default()).unwrap();
        assert_eq!(artifact, dir.path().join("prog.asm"));
        let asm = fs::read_to_string(&artifact).unwrap();
        assert!(asm.contains("global _start"));
    }

    #[test]
    fn test_compile_file_with_import() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("consts.j"),
            "constant answer as integer is 40 plus 2",
        )
        .unwrap();
        let source = dir.path().join("prog.j");
        fs::write(
            &source,
            "import \"consts.j\"\nfunction main() yields integer is print(answer) . return 0 done",
        )
        .unwrap();

        let artifact =
            compile_file(&source, None, true, &CompilerConfig::default()).unwrap();
        let asm = fs::read_to_string(&artifact).unwrap();
        assert!(asm.contains("answer: dq 42"));
    }

    #[test]
    fn test_missing_assembler_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("prog.j");
        fs::write(
            &source,
            "function main() yields integer is return 0 done",
        )
        .unwrap();

        let mut config = CompilerConfig::default();
        config.assembler.command = "jlang-test-no-such-assembler".to_string();
        let err = compile_file(&source, None, false, &config).unwrap_err();
        assert!(err.contains("failed to run jlang-test-no-such-assembler"));
        // the assembly file is still produced before the tool fails
        assert!(dir.path().join("prog.asm").exists());
    }
}
