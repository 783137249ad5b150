//! J compiler CLI
//!
//! `jlang <source.j>` compiles a source file to `<source>.asm`, runs the
//! configured assembler and linker, and leaves a static executable next
//! to the source. Dump flags print the intermediate structures and still
//! run the full pipeline.

use clap::{CommandFactory, Parser as ClapParser};
use clap_complete::{Shell, generate};
use jlangc::{CodeGen, CompilerConfig, Parser, TypeChecker};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "jlang")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "J compiler - compile .j programs to executables", long_about = None)]
struct Cli {
    /// Input .j source file
    #[arg(required_unless_present = "completions")]
    input: Option<PathBuf>,

    /// Print the token stream
    #[arg(long)]
    dump_tokens: bool,

    /// Print the parsed AST
    #[arg(long)]
    dump_ast: bool,

    /// Print the function table
    #[arg(long)]
    dump_functions: bool,

    /// Print the global variable table
    #[arg(long)]
    dump_globals: bool,

    /// Output executable path (defaults to the source with an .exe extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop after writing the assembly file
    #[arg(long)]
    asm_only: bool,

    /// Tool configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Generate shell completion scripts and exit
    #[arg(long, value_enum)]
    completions: Option<Shell>,
}

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "jlang", &mut io::stdout());
        return;
    }

    let input = cli.input.clone().expect("clap enforces the input argument");

    let config = match &cli.config {
        Some(path) => {
            let content = match fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error reading config {}: {}", path.display(), e);
                    process::exit(1);
                }
            };
            match CompilerConfig::from_toml(&content) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            }
        }
        None => CompilerConfig::default(),
    };

    if let Err(e) = run(&cli, &input, &config) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli, input: &PathBuf, config: &CompilerConfig) -> Result<(), String> {
    let tokens = jlangc::resolver::lex_program(input)?;

    if cli.dump_tokens {
        println!("--------------------------------");
        println!("Tokens:\n");
        for token in &tokens {
            println!("{}", token);
        }
    }

    let program = Parser::new(tokens).parse_program()?;

    if cli.dump_functions {
        println!("--------------------------------");
        println!("Function table:\n");
        for proto in program.symbols.prototypes.values() {
            let params: Vec<String> = proto
                .params
                .iter()
                .map(|p| format!("{} as {}", p.name, p.ty))
                .collect();
            println!("{}({}) yields {}", proto.name, params.join(", "), proto.returns);
        }
    }

    if cli.dump_globals {
        println!("--------------------------------");
        println!("Global Variables:\n");
        for global in program.symbols.globals.values() {
            println!("{} as {}", global.name, global.ty);
        }
    }

    if cli.dump_ast {
        println!("--------------------------------");
        println!("Generated AST:\n");
        print!("{}", program.dump());
    }

    TypeChecker::new(&program).check_program()?;

    let asm = CodeGen::new()
        .generate(&program)
        .map_err(|e| e.to_string())?;

    let asm_path = input.with_extension("asm");
    fs::write(&asm_path, asm)
        .map_err(|e| format!("failed to write {}: {}", asm_path.display(), e))?;
    println!("Program successfully generated to {}", asm_path.display());

    if cli.asm_only {
        return Ok(());
    }

    let object_path = input.with_extension("o");
    let exe_path = cli
        .output
        .clone()
        .unwrap_or_else(|| input.with_extension("exe"));

    jlangc::assemble_and_link(&asm_path, &object_path, &exe_path, config)?;
    println!("Generated executable {}", exe_path.display());
    Ok(())
}
