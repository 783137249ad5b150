//! Token stream producer for J source
//!
//! Scans a byte stream into an ordered token sequence with source
//! locations. Words are classified against the reserved sets in priority
//! order: keyword, operator, type name, syscall tag, intrinsic, and only
//! then identifier. A single end-of-expression token is appended at end
//! of file.

use crate::types::{MemWidth, Type};
use std::fmt;
use std::fs;
use std::path::Path;

/// Position of a token in its source file (1-indexed line and column)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        SourceLocation {
            file: file.into(),
            line,
            column,
        }
    }

    /// Base string for assembly labels derived from this location
    pub fn label_base(&self) -> String {
        format!("l{}_c{}", self.line, self.column)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Reserved words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    While,
    Function,
    Define,
    Allocate,
    Constant,
    Do,
    Is,
    As,
    To,
    Yields,
    Done,
    Return,
    Import,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Keyword> {
        Some(match word {
            "if" => Keyword::If,
            "while" => Keyword::While,
            "function" => Keyword::Function,
            "define" => Keyword::Define,
            "allocate" => Keyword::Allocate,
            "constant" => Keyword::Constant,
            "do" => Keyword::Do,
            "is" => Keyword::Is,
            "as" => Keyword::As,
            "to" => Keyword::To,
            "yields" => Keyword::Yields,
            "done" => Keyword::Done,
            "return" => Keyword::Return,
            "import" => Keyword::Import,
            _ => return None,
        })
    }
}

/// Binary operator words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Greater,
    Less,
    Equal,
    NotEqual,
    GreaterEqual,
    LessEqual,
}

impl Operator {
    pub fn from_word(word: &str) -> Option<Operator> {
        Some(match word {
            "plus" => Operator::Plus,
            "minus" => Operator::Minus,
            "multiply" => Operator::Multiply,
            "divide" => Operator::Divide,
            "modulo" => Operator::Modulo,
            "greater" => Operator::Greater,
            "less" => Operator::Less,
            "equal" => Operator::Equal,
            "not-equal" => Operator::NotEqual,
            "greater-equal" => Operator::GreaterEqual,
            "less-equal" => Operator::LessEqual,
            _ => return None,
        })
    }

    /// Binding strength for precedence climbing.
    ///
    /// multiply/divide/modulo bind tightest, then plus/minus, then the
    /// comparisons. All operators are left-associative.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Multiply | Operator::Divide | Operator::Modulo => 30,
            Operator::Plus | Operator::Minus => 20,
            Operator::Greater
            | Operator::Less
            | Operator::Equal
            | Operator::NotEqual
            | Operator::GreaterEqual
            | Operator::LessEqual => 10,
        }
    }
}

/// Built-in operations with statement or expression syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    Print,
    AddressOf,
    Drop,
    Load(MemWidth),
    Store(MemWidth),
}

impl Intrinsic {
    pub fn from_word(word: &str) -> Option<Intrinsic> {
        match word {
            "print" => Some(Intrinsic::Print),
            "address-of" => Some(Intrinsic::AddressOf),
            "drop" => Some(Intrinsic::Drop),
            _ => {
                if let Some(suffix) = word.strip_prefix("load") {
                    MemWidth::from_suffix(suffix).map(Intrinsic::Load)
                } else if let Some(suffix) = word.strip_prefix("store") {
                    MemWidth::from_suffix(suffix).map(Intrinsic::Store)
                } else {
                    None
                }
            }
        }
    }
}

/// Token kind with the decoded value for kinds that carry one
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),
    Intrinsic(Intrinsic),
    Operator(Operator),
    TypeName(Type),
    /// Arity is encoded in the tag name (`syscall0` .. `syscall5`)
    Syscall(u8),
    Identifier,
    IntLiteral(i64),
    /// Decoded payload with escapes applied
    StringLiteral(String),
    ParenOpen,
    ParenClose,
    ArgDelimiter,
    EndOfExpression,
}

/// A lexed token: kind, raw lexeme, and source location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub location: SourceLocation,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, location: SourceLocation) -> Self {
        Token {
            kind,
            text: text.into(),
            location,
        }
    }

    /// Short kind name for token dumps and expected-vs-got diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            TokenKind::Keyword(_) => "keyword",
            TokenKind::Intrinsic(_) => "intrinsic",
            TokenKind::Operator(_) => "operator",
            TokenKind::TypeName(_) => "type name",
            TokenKind::Syscall(_) => "syscall",
            TokenKind::Identifier => "identifier",
            TokenKind::IntLiteral(_) => "integer literal",
            TokenKind::StringLiteral(_) => "string literal",
            TokenKind::ParenOpen => "'('",
            TokenKind::ParenClose => "')'",
            TokenKind::ArgDelimiter => "','",
            TokenKind::EndOfExpression => "end of expression",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:?}",
            self.location,
            self.kind_name(),
            self.text
        )
    }
}

/// Classify a scanned word against the reserved sets.
///
/// Priority order matters: `print` must become an intrinsic before it
/// could ever be an identifier, and `integer` a type name.
fn classify_word(word: &str) -> Option<TokenKind> {
    if let Some(kw) = Keyword::from_word(word) {
        Some(TokenKind::Keyword(kw))
    } else if let Some(op) = Operator::from_word(word) {
        Some(TokenKind::Operator(op))
    } else if let Some(ty) = Type::from_name(word) {
        Some(TokenKind::TypeName(ty))
    } else if let Some(arity) = word
        .strip_prefix("syscall")
        .and_then(|s| s.parse::<u8>().ok())
        .filter(|n| *n <= 5)
    {
        Some(TokenKind::Syscall(arity))
    } else {
        Intrinsic::from_word(word).map(TokenKind::Intrinsic)
    }
}

/// Scan a source string into tokens.
///
/// `file` is recorded into every location for diagnostics. A single
/// end-of-expression token is appended after the last scanned token.
pub fn tokenize(file: &str, source: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut line: u32 = 0;

    for raw_line in source.lines() {
        line += 1;
        let chars: Vec<char> = raw_line.chars().collect();
        let mut pos = 0usize;

        while pos < chars.len() {
            let ch = chars[pos];
            let column = (pos + 1) as u32;
            let loc = SourceLocation::new(file, line, column);

            if ch.is_whitespace() {
                pos += 1;
            } else if ch == ';' {
                // comment to end of line
                break;
            } else if ch.is_alphabetic() {
                let start = pos;
                while pos < chars.len()
                    && (chars[pos].is_alphanumeric() || chars[pos] == '-' || chars[pos] == '_')
                {
                    pos += 1;
                }
                let word: String = chars[start..pos].iter().collect();
                match classify_word(&word) {
                    Some(kind) => tokens.push(Token::new(kind, word, loc)),
                    None => {
                        if word.contains('-') {
                            return Err(format!(
                                "{}: invalid identifier '{}' (hyphens are only legal in reserved words)",
                                loc, word
                            ));
                        }
                        tokens.push(Token::new(TokenKind::Identifier, word, loc));
                    }
                }
            } else if ch.is_ascii_digit() {
                let start = pos;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                let value = text
                    .parse::<i64>()
                    .map_err(|_| format!("{}: invalid integer literal '{}'", loc, text))?;
                tokens.push(Token::new(TokenKind::IntLiteral(value), text, loc));
            } else if ch == '"' {
                pos += 1;
                let mut value = String::new();
                loop {
                    if pos >= chars.len() {
                        return Err(format!("{}: unterminated string literal", loc));
                    }
                    match chars[pos] {
                        '"' => {
                            pos += 1;
                            break;
                        }
                        '\\' => {
                            pos += 1;
                            if pos >= chars.len() {
                                return Err(format!("{}: unterminated string literal", loc));
                            }
                            match chars[pos] {
                                'n' => value.push('\n'),
                                '\\' => value.push('\\'),
                                other => {
                                    return Err(format!(
                                        "{}: unsupported escape sequence '\\{}'",
                                        loc, other
                                    ));
                                }
                            }
                            pos += 1;
                        }
                        other => {
                            value.push(other);
                            pos += 1;
                        }
                    }
                }
                tokens.push(Token::new(
                    TokenKind::StringLiteral(value.clone()),
                    value,
                    loc,
                ));
            } else {
                let kind = match ch {
                    '(' => TokenKind::ParenOpen,
                    ')' => TokenKind::ParenClose,
                    ',' => TokenKind::ArgDelimiter,
                    '.' => TokenKind::EndOfExpression,
                    other => {
                        return Err(format!(
                            "{}: invalid starting character '{}' for token",
                            loc, other
                        ));
                    }
                };
                tokens.push(Token::new(kind, ch.to_string(), loc));
                pos += 1;
            }
        }
    }

    tokens.push(Token::new(
        TokenKind::EndOfExpression,
        "",
        SourceLocation::new(file, line.max(1), 1),
    ));
    Ok(tokens)
}

/// Lex a single file from disk
pub fn tokenize_file(path: &Path) -> Result<Vec<Token>, String> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("failed to read source file {}: {}", path.display(), e))?;
    tokenize(&path.display().to_string(), &source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize("test.j", source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_classification_priority() {
        let toks = kinds("function print integer syscall3 load64 x");
        assert_eq!(
            toks,
            vec![
                TokenKind::Keyword(Keyword::Function),
                TokenKind::Intrinsic(Intrinsic::Print),
                TokenKind::TypeName(Type::Integer),
                TokenKind::Syscall(3),
                TokenKind::Intrinsic(Intrinsic::Load(MemWidth::W64)),
                TokenKind::Identifier,
                TokenKind::EndOfExpression,
            ]
        );
    }

    #[test]
    fn test_operator_words() {
        let toks = kinds("plus not-equal less-equal");
        assert_eq!(
            toks,
            vec![
                TokenKind::Operator(Operator::Plus),
                TokenKind::Operator(Operator::NotEqual),
                TokenKind::Operator(Operator::LessEqual),
                TokenKind::EndOfExpression,
            ]
        );
    }

    #[test]
    fn test_precedence_table() {
        assert_eq!(Operator::Multiply.precedence(), 30);
        assert_eq!(Operator::Divide.precedence(), 30);
        assert_eq!(Operator::Modulo.precedence(), 30);
        assert_eq!(Operator::Plus.precedence(), 20);
        assert_eq!(Operator::Minus.precedence(), 20);
        assert_eq!(Operator::LessEqual.precedence(), 10);
        assert_eq!(Operator::Equal.precedence(), 10);
    }

    #[test]
    fn test_int_literal() {
        let toks = tokenize("test.j", "42 123456789").unwrap();
        assert_eq!(toks[0].kind, TokenKind::IntLiteral(42));
        assert_eq!(toks[1].kind, TokenKind::IntLiteral(123456789));
    }

    #[test]
    fn test_int_literal_overflow() {
        let err = tokenize("test.j", "99999999999999999999999").unwrap_err();
        assert!(err.contains("invalid integer literal"));
    }

    #[test]
    fn test_string_literal_escapes() {
        let toks = tokenize("test.j", r#""hi\n" "back\\slash""#).unwrap();
        assert_eq!(toks[0].kind, TokenKind::StringLiteral("hi\n".to_string()));
        assert_eq!(
            toks[1].kind,
            TokenKind::StringLiteral("back\\slash".to_string())
        );
    }

    #[test]
    fn test_string_literal_bad_escape() {
        let err = tokenize("test.j", r#""bad\t""#).unwrap_err();
        assert!(err.contains("unsupported escape sequence"));
    }

    #[test]
    fn test_string_literal_unterminated() {
        let err = tokenize("test.j", "\"open").unwrap_err();
        assert!(err.contains("unterminated string literal"));
    }

    #[test]
    fn test_hyphen_in_identifier_rejected() {
        let err = tokenize("test.j", "my-var").unwrap_err();
        assert!(err.contains("invalid identifier 'my-var'"));
    }

    #[test]
    fn test_comment_runs_to_end_of_line() {
        let toks = kinds("42 ; the answer\n7");
        assert_eq!(
            toks,
            vec![
                TokenKind::IntLiteral(42),
                TokenKind::IntLiteral(7),
                TokenKind::EndOfExpression,
            ]
        );
    }

    #[test]
    fn test_punctuation() {
        let toks = kinds("( ) , .");
        assert_eq!(
            toks,
            vec![
                TokenKind::ParenOpen,
                TokenKind::ParenClose,
                TokenKind::ArgDelimiter,
                TokenKind::EndOfExpression,
                TokenKind::EndOfExpression,
            ]
        );
    }

    #[test]
    fn test_invalid_character() {
        let err = tokenize("test.j", "a @ b").unwrap_err();
        assert!(err.contains("invalid starting character '@'"));
        assert!(err.contains("test.j:1:3"));
    }

    #[test]
    fn test_locations_reset_per_line() {
        let toks = tokenize("test.j", "a b\nc").unwrap();
        assert_eq!((toks[0].location.line, toks[0].location.column), (1, 1));
        assert_eq!((toks[1].location.line, toks[1].location.column), (1, 3));
        assert_eq!((toks[2].location.line, toks[2].location.column), (2, 1));
    }

    #[test]
    fn test_relexing_is_deterministic() {
        let source = "function main() yields integer is print(42) . return 0 done";
        let first = tokenize("test.j", source).unwrap();
        let second = tokenize("test.j", source).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_eof_token_appended() {
        let toks = tokenize("test.j", "").unwrap();
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].kind, TokenKind::EndOfExpression);
    }

    #[test]
    fn test_syscall_tags() {
        for n in 0..=5u8 {
            let src = format!("syscall{}", n);
            let toks = tokenize("test.j", &src).unwrap();
            assert_eq!(toks[0].kind, TokenKind::Syscall(n));
        }
        // syscall6 is not a tag, and not a legal identifier either way
        let toks = tokenize("test.j", "syscall6").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Identifier);
    }
}
