//! Symbol tables for one compilation
//!
//! All tables are insertion-ordered so the emission order of globals,
//! constants, and string payloads is reproducible. The parser owns the
//! tables while it runs; the type checker and code generator receive
//! them as shared views and never mutate them.

use crate::ast::{Expr, FunProto, IdentKind};
use crate::lexer::{SourceLocation, Token};
use crate::types::{ConstValue, Type};
use indexmap::IndexMap;

/// A top-level `define`, materialized in `.bss` with its initializer
/// (if any) run by `_start`
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVar {
    pub token: Token,
    pub name: String,
    pub ty: Type,
    pub size: u64,
    pub init: Option<Expr>,
}

/// A `constant` declaration, folded at parse time and emitted as a
/// single quadword in `.data`
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub token: Token,
    pub name: String,
    pub ty: Type,
    pub value: ConstValue,
}

/// A local variable binding tracked while a function body is parsed
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeVar {
    pub token: Token,
    pub name: String,
    pub ty: Type,
}

/// An anonymous `allocate` block at global scope, materialized in `.bss`
#[derive(Debug, Clone, PartialEq)]
pub struct AnonBlock {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTables {
    pub prototypes: IndexMap<String, FunProto>,
    pub globals: IndexMap<String, GlobalVar>,
    pub constants: IndexMap<String, Constant>,
    /// String literal payloads in first-appearance order; index `i` is
    /// referenced through the generated symbol `_anon_str_<i>`
    pub string_literals: Vec<String>,
    /// Anonymous `allocate` blocks requested at global scope
    pub anon_globals: Vec<AnonBlock>,
}

impl SymbolTables {
    pub fn new() -> Self {
        SymbolTables::default()
    }

    /// Register a string literal payload and return its data symbol
    pub fn intern_string(&mut self, payload: String) -> String {
        let symbol = format!("_anon_str_{}", self.string_literals.len());
        self.string_literals.push(payload);
        symbol
    }

    /// Register an anonymous global block and return its data symbol
    pub fn add_anon_global(&mut self, size: u64) -> String {
        let name = format!("_anon_glob_{}", self.anon_globals.len());
        self.anon_globals.push(AnonBlock {
            name: name.clone(),
            size,
        });
        name
    }

    /// Resolve an identifier against the lookup chain:
    /// prototypes, then the current scope, then globals, then constants.
    /// The first hit decides the reference kind and declared type.
    pub fn resolve(
        &self,
        scope: &IndexMap<String, ScopeVar>,
        name: &str,
    ) -> Option<(IdentKind, Type)> {
        if let Some(proto) = self.prototypes.get(name) {
            Some((IdentKind::Function, proto.returns))
        } else if let Some(var) = scope.get(name) {
            Some((IdentKind::Local, var.ty))
        } else if let Some(var) = self.globals.get(name) {
            Some((IdentKind::Global, var.ty))
        } else if let Some(c) = self.constants.get(name) {
            Some((IdentKind::Constant, c.ty))
        } else {
            None
        }
    }

    /// Location of the existing definition for `name`, if any.
    /// Used for redefinition diagnostics.
    pub fn definition_site(
        &self,
        scope: &IndexMap<String, ScopeVar>,
        name: &str,
    ) -> Option<(IdentKind, SourceLocation)> {
        if let Some(proto) = self.prototypes.get(name) {
            Some((IdentKind::Function, proto.token.location.clone()))
        } else if let Some(var) = scope.get(name) {
            Some((IdentKind::Local, var.token.location.clone()))
        } else if let Some(var) = self.globals.get(name) {
            Some((IdentKind::Global, var.token.location.clone()))
        } else if let Some(c) = self.constants.get(name) {
            Some((IdentKind::Constant, c.token.location.clone()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;

    fn token(name: &str) -> Token {
        Token {
            kind: TokenKind::Identifier,
            text: name.to_string(),
            location: SourceLocation::new("test.j", 1, 1),
        }
    }

    fn tables_with_all(name: &str) -> (SymbolTables, IndexMap<String, ScopeVar>) {
        let mut tables = SymbolTables::new();
        tables.prototypes.insert(
            name.to_string(),
            FunProto {
                token: token(name),
                name: name.to_string(),
                params: vec![],
                returns: Type::Integer,
            },
        );
        tables.globals.insert(
            name.to_string(),
            GlobalVar {
                token: token(name),
                name: name.to_string(),
                ty: Type::Pointer,
                size: 8,
                init: None,
            },
        );
        tables.constants.insert(
            name.to_string(),
            Constant {
                token: token(name),
                name: name.to_string(),
                ty: Type::Integer,
                value: ConstValue::Int(1),
            },
        );
        let mut scope = IndexMap::new();
        scope.insert(
            name.to_string(),
            ScopeVar {
                token: token(name),
                name: name.to_string(),
                ty: Type::Integer,
            },
        );
        (tables, scope)
    }

    #[test]
    fn test_lookup_precedence_is_deterministic() {
        let (mut tables, mut scope) = tables_with_all("x");

        // all four defined: prototype wins
        assert_eq!(
            tables.resolve(&scope, "x"),
            Some((IdentKind::Function, Type::Integer))
        );

        // without the prototype, the local wins
        tables.prototypes.shift_remove("x");
        assert_eq!(
            tables.resolve(&scope, "x"),
            Some((IdentKind::Local, Type::Integer))
        );

        // without the local, the global wins
        scope.shift_remove("x");
        assert_eq!(
            tables.resolve(&scope, "x"),
            Some((IdentKind::Global, Type::Pointer))
        );

        // the constant is last
        tables.globals.shift_remove("x");
        assert_eq!(
            tables.resolve(&scope, "x"),
            Some((IdentKind::Constant, Type::Integer))
        );

        tables.constants.shift_remove("x");
        assert_eq!(tables.resolve(&scope, "x"), None);
    }

    #[test]
    fn test_string_interning_is_positional() {
        let mut tables = SymbolTables::new();
        assert_eq!(tables.intern_string("a".to_string()), "_anon_str_0");
        assert_eq!(tables.intern_string("b".to_string()), "_anon_str_1");
        assert_eq!(tables.string_literals, vec!["a", "b"]);
    }

    #[test]
    fn test_anon_global_naming() {
        let mut tables = SymbolTables::new();
        assert_eq!(tables.add_anon_global(16), "_anon_glob_0");
        assert_eq!(tables.add_anon_global(8), "_anon_glob_1");
        assert_eq!(tables.anon_globals[0].size, 16);
    }
}
