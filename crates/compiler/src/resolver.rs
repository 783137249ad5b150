//! Import preprocessor
//!
//! `import "path"` splices the referenced file's token stream into the
//! current stream at the import position. Paths resolve relative to the
//! importing file. Every inlined file is recorded by canonical path; a
//! second import of the same file, cyclic or not, is rejected before it
//! can expand forever.

use crate::lexer::{self, Keyword, Token, TokenKind};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Lex a source file and expand all imports, recursively.
pub fn lex_program(path: &Path) -> Result<Vec<Token>, String> {
    let mut visited = HashSet::new();
    lex_with_imports(path, &mut visited)
}

fn lex_with_imports(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<Vec<Token>, String> {
    let canonical = path
        .canonicalize()
        .map_err(|e| format!("cannot resolve source path {}: {}", path.display(), e))?;
    if !visited.insert(canonical) {
        return Err(format!(
            "cyclic or repeated import of {}",
            path.display()
        ));
    }

    let tokens = lexer::tokenize_file(path)?;
    let mut out = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        if !matches!(token.kind, TokenKind::Keyword(Keyword::Import)) {
            out.push(token);
            continue;
        }

        let target = match iter.next() {
            Some(Token {
                kind: TokenKind::StringLiteral(p),
                ..
            }) => p,
            other => {
                let desc = other
                    .map(|t| format!("{} '{}'", t.kind_name(), t.text))
                    .unwrap_or_else(|| "end of file".to_string());
                return Err(format!(
                    "{}: expected string literal after 'import', got {}",
                    token.location, desc
                ));
            }
        };

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let resolved = base.join(&target);
        let spliced = lex_with_imports(&resolved, visited)
            .map_err(|e| format!("{}: {}", token.location, e))?;
        out.extend(spliced);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_import_splices_tokens() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lib.j", "constant answer as integer is 42");
        let main = write(
            dir.path(),
            "main.j",
            "import \"lib.j\"\nfunction main() yields integer is return answer done",
        );

        let tokens = lex_program(&main).unwrap();
        // the constant declaration from lib.j appears before the function
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        let const_pos = texts.iter().position(|t| *t == "constant").unwrap();
        let fun_pos = texts.iter().position(|t| *t == "function").unwrap();
        assert!(const_pos < fun_pos);
        assert!(!texts.contains(&"import"));
    }

    #[test]
    fn test_cyclic_import_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.j", "import \"b.j\"");
        write(dir.path(), "b.j", "import \"a.j\"");
        let a = dir.path().join("a.j");

        let err = lex_program(&a).unwrap_err();
        assert!(err.contains("cyclic or repeated import"));
    }

    #[test]
    fn test_repeated_import_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lib.j", "constant k as integer is 1");
        let main = write(dir.path(), "main.j", "import \"lib.j\"\nimport \"lib.j\"");

        let err = lex_program(&main).unwrap_err();
        assert!(err.contains("cyclic or repeated import"));
    }

    #[test]
    fn test_missing_import_target() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "main.j", "import \"nowhere.j\"");

        let err = lex_program(&main).unwrap_err();
        assert!(err.contains("cannot resolve source path"));
    }

    #[test]
    fn test_import_requires_string_literal() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "main.j", "import lib");

        let err = lex_program(&main).unwrap_err();
        assert!(err.contains("expected string literal after 'import'"));
    }

    #[test]
    fn test_nested_imports() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "c.j", "constant deep as integer is 3");
        write(dir.path(), "b.j", "import \"c.j\"");
        let a = write(dir.path(), "a.j", "import \"b.j\"");

        let tokens = lex_program(&a).unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert!(texts.contains(&"deep"));
    }
}
