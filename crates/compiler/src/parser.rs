//! Recursive-descent parser for J
//!
//! Consumes the token stream with one token of look-ahead and produces a
//! typed AST while populating the symbol tables. Identifier references
//! are resolved as they are parsed, so every expression carries its
//! declared type before the type checker runs. Binary expressions use
//! precedence climbing against the operator table. `constant`
//! initializers and `allocate` sizes go through a separate compile-time
//! evaluator with an intentionally narrow acceptance set.

use crate::ast::{
    Expr, ExprKind, Fun, FunProto, IdentKind, LocalSlot, Param, Program, Stmt, StmtKind,
};
use crate::lexer::{Intrinsic, Keyword, Operator, Token, TokenKind};
use crate::symbols::{Constant, GlobalVar, ScopeVar, SymbolTables};
use crate::types::{ConstValue, MemWidth, Type};
use indexmap::IndexMap;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    symbols: SymbolTables,
    /// Local bindings of the function currently being parsed
    scope: IndexMap<String, ScopeVar>,
    /// Frame slots of the current function, in declaration order
    locals: Vec<LocalSlot>,
    /// Counter for auto-named `allocate` blocks in the current function
    anon_local_count: usize,
    in_scope: bool,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            symbols: SymbolTables::new(),
            scope: IndexMap::new(),
            locals: Vec::new(),
            anon_local_count: 0,
            in_scope: false,
        }
    }

    pub fn parse_program(mut self) -> Result<Program, String> {
        let mut functions = Vec::new();

        loop {
            self.skip_end_of_expression();
            let Some(token) = self.peek() else { break };

            match token.kind {
                TokenKind::Keyword(Keyword::Function) => {
                    functions.push(self.parse_function()?);
                }
                TokenKind::Keyword(Keyword::Define) => {
                    self.parse_global_def()?;
                }
                TokenKind::Keyword(Keyword::Constant) => {
                    self.parse_constant_decl()?;
                }
                _ => {
                    return Err(format!(
                        "{}: expected 'function', 'define' or 'constant' at top level, got {} '{}'",
                        token.location,
                        token.kind_name(),
                        token.text
                    ));
                }
            }
        }

        Ok(Program {
            functions,
            symbols: self.symbols,
        })
    }

    // ------------------------------------------------------------------
    // Token cursor

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Skip statement separators (and the lexer's trailing EOF marker)
    fn skip_end_of_expression(&mut self) {
        while matches!(
            self.peek().map(|t| &t.kind),
            Some(TokenKind::EndOfExpression)
        ) {
            self.pos += 1;
        }
    }

    fn unexpected(&self, expected: &str) -> String {
        match self.peek() {
            Some(t) => format!(
                "{}: expected {}, got {} '{}'",
                t.location,
                expected,
                t.kind_name(),
                t.text
            ),
            None => format!("unexpected end of file, expected {}", expected),
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword, what: &str) -> Result<Token, String> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Keyword(keyword) => Ok(self.advance().unwrap()),
            _ => Err(self.unexpected(what)),
        }
    }

    fn expect_kind(&mut self, kind: TokenKind, what: &str) -> Result<Token, String> {
        match self.peek() {
            Some(t) if t.kind == kind => Ok(self.advance().unwrap()),
            _ => Err(self.unexpected(what)),
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<Token, String> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Identifier => Ok(self.advance().unwrap()),
            _ => Err(self.unexpected(what)),
        }
    }

    fn expect_type_name(&mut self) -> Result<(Token, Type), String> {
        match self.peek() {
            Some(t) => {
                if let TokenKind::TypeName(ty) = t.kind {
                    let token = self.advance().unwrap();
                    Ok((token, ty))
                } else {
                    Err(self.unexpected("a type name"))
                }
            }
            None => Err(self.unexpected("a type name")),
        }
    }

    // ------------------------------------------------------------------
    // Declarations

    /// Reject a name that is already bound. `allow_global_shadow` lifts
    /// the check for globals so locals and parameters can shadow them.
    fn check_redefinition(
        &self,
        name_tok: &Token,
        allow_global_shadow: bool,
    ) -> Result<(), String> {
        if let Some((kind, site)) = self.symbols.definition_site(&self.scope, &name_tok.text) {
            if allow_global_shadow && kind == IdentKind::Global {
                return Ok(());
            }
            return Err(format!(
                "{}: attempted redefinition of {} '{}'; already defined at {}",
                name_tok.location, kind, name_tok.text, site
            ));
        }
        Ok(())
    }

    fn parse_function(&mut self) -> Result<Fun, String> {
        let fun_tok = self.expect_keyword(Keyword::Function, "'function'")?;
        let name_tok = self.expect_identifier("a function name after 'function'")?;
        self.check_redefinition(&name_tok, false)?;

        self.expect_kind(TokenKind::ParenOpen, "'(' after the function name")?;

        self.scope.clear();
        self.locals.clear();
        self.anon_local_count = 0;

        let mut params = Vec::new();
        if !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::ParenClose)) {
            loop {
                let param_tok = self.expect_identifier("a parameter name")?;
                // parameters shadow globals the same way body locals do
                self.check_redefinition(&param_tok, true)?;
                self.expect_keyword(Keyword::As, "'as' after the parameter name")?;
                let (_, ty) = self.expect_type_name()?;
                if ty == Type::None {
                    return Err(format!(
                        "{}: parameter '{}' cannot have type none",
                        param_tok.location, param_tok.text
                    ));
                }
                self.scope.insert(
                    param_tok.text.clone(),
                    ScopeVar {
                        token: param_tok.clone(),
                        name: param_tok.text.clone(),
                        ty,
                    },
                );
                self.locals.push(LocalSlot {
                    name: param_tok.text.clone(),
                    size: 8,
                });
                params.push(Param {
                    token: param_tok.clone(),
                    name: param_tok.text,
                    ty,
                });

                match self.peek().map(|t| &t.kind) {
                    Some(TokenKind::ArgDelimiter) => {
                        self.advance();
                    }
                    Some(TokenKind::ParenClose) => break,
                    _ => return Err(self.unexpected("',' or ')' in the parameter list")),
                }
            }
        }
        self.expect_kind(TokenKind::ParenClose, "')' after the parameters")?;

        self.expect_keyword(Keyword::Yields, "'yields' after the parameter list")?;
        let (_, returns) = self.expect_type_name()?;

        let proto = FunProto {
            token: fun_tok,
            name: name_tok.text.clone(),
            params,
            returns,
        };
        // registered before the body so recursive calls resolve
        self.symbols.prototypes.insert(name_tok.text, proto.clone());

        self.expect_keyword(Keyword::Is, "'is' before the function body")?;
        self.in_scope = true;
        let body = self.parse_block()?;
        self.in_scope = false;

        let locals = std::mem::take(&mut self.locals);
        let scope = std::mem::take(&mut self.scope);

        Ok(Fun {
            proto,
            body,
            scope,
            locals,
        })
    }

    /// Statements until the closing `done` (consumed)
    fn parse_block(&mut self) -> Result<Vec<Stmt>, String> {
        let mut body = Vec::new();
        loop {
            self.skip_end_of_expression();
            match self.peek() {
                Some(t) if t.kind == TokenKind::Keyword(Keyword::Done) => {
                    self.advance();
                    return Ok(body);
                }
                Some(_) => body.push(self.parse_statement()?),
                None => return Err("unexpected end of file, expected 'done'".to_string()),
            }
        }
    }

    fn parse_global_def(&mut self) -> Result<(), String> {
        let def_tok = self.expect_keyword(Keyword::Define, "'define'")?;
        let name_tok = self.expect_identifier("a variable name after 'define'")?;
        self.check_redefinition(&name_tok, false)?;
        self.expect_keyword(Keyword::As, "'as' after the variable name")?;
        let (type_tok, ty) = self.expect_type_name()?;
        if ty == Type::None {
            return Err(format!(
                "{}: a variable cannot have type none",
                type_tok.location
            ));
        }

        let init = if matches!(
            self.peek().map(|t| &t.kind),
            Some(TokenKind::Keyword(Keyword::Is))
        ) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };

        self.symbols.globals.insert(
            name_tok.text.clone(),
            GlobalVar {
                token: def_tok,
                name: name_tok.text,
                ty,
                size: ty.size(),
                init,
            },
        );
        Ok(())
    }

    fn parse_local_def(&mut self) -> Result<Stmt, String> {
        let def_tok = self.expect_keyword(Keyword::Define, "'define'")?;
        let name_tok = self.expect_identifier("a variable name after 'define'")?;
        // a local may shadow a global; anything else is a collision
        self.check_redefinition(&name_tok, true)?;
        self.expect_keyword(Keyword::As, "'as' after the variable name")?;
        let (type_tok, ty) = self.expect_type_name()?;
        if ty == Type::None {
            return Err(format!(
                "{}: a variable cannot have type none",
                type_tok.location
            ));
        }

        self.scope.insert(
            name_tok.text.clone(),
            ScopeVar {
                token: name_tok.clone(),
                name: name_tok.text.clone(),
                ty,
            },
        );
        self.locals.push(LocalSlot {
            name: name_tok.text.clone(),
            size: 8,
        });

        let init = if matches!(
            self.peek().map(|t| &t.kind),
            Some(TokenKind::Keyword(Keyword::Is))
        ) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(Stmt {
            token: def_tok,
            kind: StmtKind::VarDef {
                name: name_tok.text,
                ty,
                init,
            },
        })
    }

    fn parse_constant_decl(&mut self) -> Result<(), String> {
        let const_tok = self.expect_keyword(Keyword::Constant, "'constant'")?;
        let name_tok = self.expect_identifier("a constant name after 'constant'")?;
        self.check_redefinition(&name_tok, false)?;
        self.expect_keyword(Keyword::As, "'as' after the constant name")?;
        let (type_tok, ty) = self.expect_type_name()?;
        if ty == Type::None {
            return Err(format!(
                "{}: a constant cannot have type none",
                type_tok.location
            ));
        }
        self.expect_keyword(Keyword::Is, "'is' before the constant initializer")?;

        let value = self.parse_const_expr()?;

        self.symbols.constants.insert(
            name_tok.text.clone(),
            Constant {
                token: const_tok,
                name: name_tok.text,
                ty,
                value,
            },
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Compile-time constant evaluator
    //
    // Deliberately not the general expression path: the acceptance set
    // is integer literals, string literals, references to constants, and
    // `plus`. Everything else is rejected here, at parse time.

    fn parse_const_expr(&mut self) -> Result<ConstValue, String> {
        let mut value = self.parse_const_primary()?;
        while let Some(t) = self.peek() {
            match t.kind {
                TokenKind::Operator(Operator::Plus) => {
                    let plus_tok = self.advance().unwrap();
                    let rhs = self.parse_const_primary()?;
                    value = value
                        .add(rhs)
                        .map_err(|e| format!("{}: {}", plus_tok.location, e))?;
                }
                TokenKind::Operator(op) => {
                    return Err(format!(
                        "{}: operator '{:?}' is not allowed in constant expressions; only 'plus' is",
                        t.location, op
                    ));
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn parse_const_primary(&mut self) -> Result<ConstValue, String> {
        let Some(token) = self.advance() else {
            return Err("unexpected end of file in constant expression".to_string());
        };
        match token.kind {
            TokenKind::IntLiteral(value) => Ok(ConstValue::Int(value)),
            TokenKind::StringLiteral(payload) => {
                Ok(ConstValue::Sym(self.symbols.intern_string(payload)))
            }
            TokenKind::Identifier => match self.symbols.constants.get(&token.text) {
                Some(c) => Ok(c.value.clone()),
                None => Err(format!(
                    "{}: '{}' does not name a constant; only constants may appear in constant expressions",
                    token.location, token.text
                )),
            },
            _ => Err(format!(
                "{}: {} '{}' is not allowed in constant expressions",
                token.location,
                token.kind_name(),
                token.text
            )),
        }
    }

    /// Parse `allocate '(' const_expr ')'` and register the block.
    fn parse_allocate(&mut self) -> Result<Expr, String> {
        let alloc_tok = self.expect_keyword(Keyword::Allocate, "'allocate'")?;
        self.expect_kind(TokenKind::ParenOpen, "'(' after 'allocate'")?;
        let value = self.parse_const_expr()?;
        self.expect_kind(TokenKind::ParenClose, "')' after the allocation size")?;

        let size = value.as_int().ok_or_else(|| {
            format!(
                "{}: allocation size must evaluate to an integer, got {}",
                alloc_tok.location, value
            )
        })?;
        if size <= 0 {
            return Err(format!(
                "{}: allocation size must be positive, got {}",
                alloc_tok.location, size
            ));
        }

        let symbol = if self.in_scope {
            // frame block; round up so following slots stay qword-aligned
            let name = format!("_anon_local_{}", self.anon_local_count);
            self.anon_local_count += 1;
            self.locals.push(LocalSlot {
                name: name.clone(),
                size: (size as u64).div_ceil(8) * 8,
            });
            name
        } else {
            self.symbols.add_anon_global(size as u64)
        };

        Ok(Expr {
            token: alloc_tok,
            ty: Type::Pointer,
            kind: ExprKind::ArrayRef { symbol },
        })
    }

    // ------------------------------------------------------------------
    // Statements

    fn parse_statement(&mut self) -> Result<Stmt, String> {
        let token = self.peek().ok_or("unexpected end of file in a block")?;
        match token.kind {
            TokenKind::Keyword(Keyword::If) => self.parse_control(Keyword::If),
            TokenKind::Keyword(Keyword::While) => self.parse_control(Keyword::While),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Define) => self.parse_local_def(),
            TokenKind::Keyword(Keyword::Function) => Err(format!(
                "{}: function definitions must be at top level",
                token.location
            )),
            TokenKind::Keyword(Keyword::Constant) => Err(format!(
                "{}: constant declarations must be at top level",
                token.location
            )),
            TokenKind::Intrinsic(Intrinsic::Print) => self.parse_print(),
            TokenKind::Intrinsic(Intrinsic::Drop) => self.parse_drop(),
            TokenKind::Intrinsic(Intrinsic::Store(width)) => self.parse_store(width),
            TokenKind::Identifier
                if matches!(
                    self.peek_at(1).map(|t| &t.kind),
                    Some(TokenKind::Keyword(Keyword::Is))
                ) =>
            {
                self.parse_assignment()
            }
            _ => {
                let expr = self.parse_expression()?;
                Ok(Stmt {
                    token: expr.token.clone(),
                    kind: StmtKind::Expr(expr),
                })
            }
        }
    }

    fn parse_control(&mut self, keyword: Keyword) -> Result<Stmt, String> {
        let token = self.advance().unwrap();
        let condition = self.parse_expression()?;
        self.expect_keyword(Keyword::Do, "'do' after the condition")?;
        let body = self.parse_block()?;
        let kind = match keyword {
            Keyword::If => StmtKind::If { condition, body },
            _ => StmtKind::While { condition, body },
        };
        Ok(Stmt { token, kind })
    }

    fn parse_return(&mut self) -> Result<Stmt, String> {
        let token = self.expect_keyword(Keyword::Return, "'return'")?;
        // `return none` ends the statement; `none(...)` would be a cast
        if matches!(
            self.peek().map(|t| &t.kind),
            Some(TokenKind::TypeName(Type::None))
        ) && !matches!(
            self.peek_at(1).map(|t| &t.kind),
            Some(TokenKind::ParenOpen)
        ) {
            self.advance();
            return Ok(Stmt {
                token,
                kind: StmtKind::Return(None),
            });
        }
        let value = self.parse_expression()?;
        Ok(Stmt {
            token,
            kind: StmtKind::Return(Some(value)),
        })
    }

    fn parse_assignment(&mut self) -> Result<Stmt, String> {
        let name_tok = self.expect_identifier("a variable name")?;
        let (ident, _) = self
            .symbols
            .resolve(&self.scope, &name_tok.text)
            .ok_or_else(|| {
                format!(
                    "{}: unknown identifier '{}'",
                    name_tok.location, name_tok.text
                )
            })?;
        match ident {
            IdentKind::Function => {
                return Err(format!(
                    "{}: cannot assign to function '{}'",
                    name_tok.location, name_tok.text
                ));
            }
            IdentKind::Constant => {
                return Err(format!(
                    "{}: cannot assign to constant '{}'",
                    name_tok.location, name_tok.text
                ));
            }
            IdentKind::Local | IdentKind::Global => {}
        }

        self.expect_keyword(Keyword::Is, "'is' in an assignment")?;
        let value = self.parse_expression()?;
        Ok(Stmt {
            token: name_tok.clone(),
            kind: StmtKind::VarSet {
                name: name_tok.text,
                ident,
                value,
            },
        })
    }

    fn parse_print(&mut self) -> Result<Stmt, String> {
        let token = self.advance().unwrap();
        self.expect_kind(TokenKind::ParenOpen, "'(' after 'print'")?;
        let expr = self.parse_expression()?;
        self.expect_kind(TokenKind::ParenClose, "')' after the print argument")?;
        Ok(Stmt {
            token,
            kind: StmtKind::Print(expr),
        })
    }

    fn parse_drop(&mut self) -> Result<Stmt, String> {
        let token = self.advance().unwrap();
        let expr = self.parse_expression()?;
        Ok(Stmt {
            token,
            kind: StmtKind::Drop(expr),
        })
    }

    fn parse_store(&mut self, width: MemWidth) -> Result<Stmt, String> {
        let token = self.advance().unwrap();
        self.expect_kind(TokenKind::ParenOpen, "'(' after the store intrinsic")?;
        let address = self.parse_expression()?;
        self.expect_kind(TokenKind::ArgDelimiter, "',' between address and value")?;
        let value = self.parse_expression()?;
        self.expect_kind(TokenKind::ParenClose, "')' after the store value")?;
        Ok(Stmt {
            token,
            kind: StmtKind::Store {
                width,
                address,
                value,
            },
        })
    }

    // ------------------------------------------------------------------
    // Expressions

    fn parse_expression(&mut self) -> Result<Expr, String> {
        let lhs = self.parse_primary()?;
        self.parse_binary_rhs(0, lhs)
    }

    /// Precedence climbing over the operator table; left-associative.
    fn parse_binary_rhs(&mut self, min_prec: u8, mut lhs: Expr) -> Result<Expr, String> {
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(&TokenKind::Operator(op)) => op,
                _ => return Ok(lhs),
            };
            let prec = op.precedence();
            if prec < min_prec {
                return Ok(lhs);
            }

            let op_tok = self.advance().unwrap();
            let mut rhs = self.parse_primary()?;

            // a tighter-binding operator on the right takes the operand
            if let Some(&TokenKind::Operator(next)) = self.peek().map(|t| &t.kind) {
                if next.precedence() > prec {
                    rhs = self.parse_binary_rhs(prec + 1, rhs)?;
                }
            }

            lhs = Expr {
                token: op_tok,
                ty: Type::Integer,
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            };
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        let token = self.peek().ok_or("unexpected end of file in an expression")?;
        match token.kind {
            TokenKind::IntLiteral(value) => {
                let token = self.advance().unwrap();
                Ok(Expr {
                    token,
                    ty: Type::Integer,
                    kind: ExprKind::IntLiteral(value),
                })
            }
            TokenKind::StringLiteral(_) => {
                let token = self.advance().unwrap();
                let TokenKind::StringLiteral(payload) = token.kind.clone() else {
                    unreachable!()
                };
                let symbol = self.symbols.intern_string(payload);
                Ok(Expr {
                    token,
                    ty: Type::Pointer,
                    kind: ExprKind::ArrayRef { symbol },
                })
            }
            TokenKind::Identifier => {
                if matches!(self.peek_at(1).map(|t| &t.kind), Some(TokenKind::ParenOpen)) {
                    self.parse_call()
                } else {
                    self.parse_ident_ref()
                }
            }
            TokenKind::Syscall(arity) => self.parse_syscall(arity),
            TokenKind::Intrinsic(Intrinsic::AddressOf) => self.parse_address_of(),
            TokenKind::Intrinsic(Intrinsic::Load(width)) => self.parse_load(width),
            TokenKind::Keyword(Keyword::Allocate) => self.parse_allocate(),
            TokenKind::TypeName(ty) => self.parse_cast(ty),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_ident_ref(&mut self) -> Result<Expr, String> {
        let token = self.advance().unwrap();
        let (ident, ty) = self
            .symbols
            .resolve(&self.scope, &token.text)
            .ok_or_else(|| format!("{}: unknown identifier '{}'", token.location, token.text))?;
        Ok(Expr {
            ty,
            kind: ExprKind::IdentRef {
                name: token.text.clone(),
                ident,
            },
            token,
        })
    }

    fn parse_call(&mut self) -> Result<Expr, String> {
        let name_tok = self.expect_identifier("a function name")?;
        let Some((IdentKind::Function, returns)) =
            self.symbols.resolve(&self.scope, &name_tok.text)
        else {
            return Err(match self.symbols.resolve(&self.scope, &name_tok.text) {
                Some((kind, _)) => format!(
                    "{}: attempted to call {} '{}'",
                    name_tok.location, kind, name_tok.text
                ),
                None => format!(
                    "{}: unknown identifier '{}'",
                    name_tok.location, name_tok.text
                ),
            });
        };

        self.expect_kind(TokenKind::ParenOpen, "'(' after the function name")?;
        let mut args = Vec::new();
        if !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::ParenClose)) {
            loop {
                args.push(self.parse_expression()?);
                match self.peek().map(|t| &t.kind) {
                    Some(TokenKind::ArgDelimiter) => {
                        self.advance();
                    }
                    Some(TokenKind::ParenClose) => break,
                    _ => return Err(self.unexpected("',' or ')' in the argument list")),
                }
            }
        }
        self.expect_kind(TokenKind::ParenClose, "')' after the arguments")?;

        let expected = self.symbols.prototypes[&name_tok.text].params.len();
        if args.len() != expected {
            return Err(format!(
                "{}: function '{}' takes {} argument(s), got {}",
                name_tok.location,
                name_tok.text,
                expected,
                args.len()
            ));
        }

        Ok(Expr {
            ty: returns,
            kind: ExprKind::Call {
                name: name_tok.text.clone(),
                args,
            },
            token: name_tok,
        })
    }

    fn parse_syscall(&mut self, arity: u8) -> Result<Expr, String> {
        let token = self.advance().unwrap();
        self.expect_kind(TokenKind::ParenOpen, "'(' after the syscall tag")?;
        let number = self.parse_expression()?;
        let mut args = Vec::new();
        for _ in 0..arity {
            self.expect_kind(TokenKind::ArgDelimiter, "',' before the next syscall argument")?;
            args.push(self.parse_expression()?);
        }
        self.expect_kind(TokenKind::ParenClose, "')' after the syscall arguments")?;

        Ok(Expr {
            token,
            ty: Type::Integer,
            kind: ExprKind::Syscall {
                arity,
                number: Box::new(number),
                args,
            },
        })
    }

    fn parse_address_of(&mut self) -> Result<Expr, String> {
        let token = self.advance().unwrap();
        self.expect_kind(TokenKind::ParenOpen, "'(' after 'address-of'")?;
        if !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Identifier)) {
            return Err(self.unexpected("an identifier inside 'address-of'"));
        }
        let target = self.parse_ident_ref()?;
        if let ExprKind::IdentRef { ident, .. } = &target.kind {
            match ident {
                IdentKind::Local | IdentKind::Global => {}
                other => {
                    return Err(format!(
                        "{}: cannot take the address of {} '{}'",
                        target.token.location, other, target.token.text
                    ));
                }
            }
        }
        self.expect_kind(TokenKind::ParenClose, "')' after the identifier")?;

        Ok(Expr {
            token,
            ty: Type::Pointer,
            kind: ExprKind::AddressOf {
                target: Box::new(target),
            },
        })
    }

    fn parse_load(&mut self, width: MemWidth) -> Result<Expr, String> {
        let token = self.advance().unwrap();
        self.expect_kind(TokenKind::ParenOpen, "'(' after the load intrinsic")?;
        let address = self.parse_expression()?;
        self.expect_kind(TokenKind::ParenClose, "')' after the load address")?;
        Ok(Expr {
            token,
            ty: Type::Integer,
            kind: ExprKind::Load {
                width,
                address: Box::new(address),
            },
        })
    }

    /// Cast `TYPE '(' expr ')'`: rewrites the operand's declared type,
    /// emitting nothing.
    fn parse_cast(&mut self, ty: Type) -> Result<Expr, String> {
        let type_tok = self.advance().unwrap();
        if ty == Type::None {
            return Err(format!(
                "{}: cannot cast an expression to none",
                type_tok.location
            ));
        }
        self.expect_kind(TokenKind::ParenOpen, "'(' after the cast type")?;
        let mut expr = self.parse_expression()?;
        self.expect_kind(TokenKind::ParenClose, "')' after the cast operand")?;
        expr.ty = ty;
        Ok(expr)
    }
}
