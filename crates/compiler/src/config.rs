//! Compiler configuration
//!
//! Selects the external assembler and linker the driver invokes, with
//! optional extra arguments for each. Defaults target NASM producing
//! ELF64 with debug info and the GNU linker producing a static binary.
//! A TOML file can override any field:
//!
//! ```toml
//! [assembler]
//! command = "nasm"
//! args = ["-f", "elf64", "-g"]
//!
//! [linker]
//! command = "ld"
//! args = ["-m", "elf_x86_64"]
//! ```

use serde::Deserialize;

/// One external tool invocation: command plus leading arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    pub command: String,
    pub args: Vec<String>,
}

impl Tool {
    fn new(command: &str, args: &[&str]) -> Self {
        Tool {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    pub assembler: Tool,
    pub linker: Tool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            assembler: Tool::new("nasm", &["-f", "elf64", "-g"]),
            linker: Tool::new("ld", &["-m", "elf_x86_64"]),
        }
    }
}

/// TOML shape; every field is optional so partial files overlay the
/// defaults
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    assembler: Option<ToolSection>,
    linker: Option<ToolSection>,
}

#[derive(Debug, Deserialize, Default)]
struct ToolSection {
    command: Option<String>,
    args: Option<Vec<String>>,
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML config and overlay it onto the defaults.
    pub fn from_toml(content: &str) -> Result<CompilerConfig, String> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| format!("invalid config file: {}", e))?;

        let mut config = CompilerConfig::default();
        if let Some(section) = file.assembler {
            section.apply(&mut config.assembler);
        }
        if let Some(section) = file.linker {
            section.apply(&mut config.linker);
        }
        Ok(config)
    }
}

impl ToolSection {
    fn apply(self, tool: &mut Tool) {
        if let Some(command) = self.command {
            tool.command = command;
        }
        if let Some(args) = self.args {
            tool.args = args;
        }
    }
}
