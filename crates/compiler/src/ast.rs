//! Abstract syntax tree for J
//!
//! Every node carries its originating token, so diagnostics and label
//! generation can always point back into the source. Expressions and
//! statements are single structs whose `kind` payload holds the
//! variant-specific fields; the type checker and code generator match on
//! the kind exhaustively.

use crate::lexer::{Operator, Token};
use crate::symbols::{ScopeVar, SymbolTables};
use crate::types::{MemWidth, Type};
use indexmap::IndexMap;
use std::fmt::Write as _;

/// What an identifier reference resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    Local,
    Global,
    Constant,
    Function,
}

impl std::fmt::Display for IdentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentKind::Local => write!(f, "local variable"),
            IdentKind::Global => write!(f, "global variable"),
            IdentKind::Constant => write!(f, "constant"),
            IdentKind::Function => write!(f, "function"),
        }
    }
}

/// An expression: pushes exactly one value when evaluated.
///
/// `ty` is resolved at parse time; the cast construct rewrites it in
/// place, which is the only post-parse mutation the AST sees.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub token: Token,
    pub ty: Type,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLiteral(i64),
    /// Reference to a generated data symbol: a string literal payload or
    /// an anonymous `allocate` block
    ArrayRef { symbol: String },
    IdentRef { name: String, ident: IdentKind },
    Binary {
        op: Operator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Address of a named variable; the target is always an `IdentRef`
    AddressOf { target: Box<Expr> },
    Load {
        width: MemWidth,
        address: Box<Expr>,
    },
    Call { name: String, args: Vec<Expr> },
    Syscall {
        arity: u8,
        number: Box<Expr>,
        args: Vec<Expr>,
    },
}

/// A statement: leaves the operand stack balanced.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub token: Token,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Local variable definition; globals live in the symbol tables and
    /// are lowered from there
    VarDef {
        name: String,
        ty: Type,
        init: Option<Expr>,
    },
    VarSet {
        name: String,
        ident: IdentKind,
        value: Expr,
    },
    Store {
        width: MemWidth,
        address: Expr,
        value: Expr,
    },
    Print(Expr),
    Drop(Expr),
    Return(Option<Expr>),
    If { condition: Expr, body: Vec<Stmt> },
    While { condition: Expr, body: Vec<Stmt> },
    /// Bare expression in statement position; its value must be consumed
    /// (or be `none`) for the block to balance
    Expr(Expr),
}

/// A named, typed function parameter (order is significant)
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub token: Token,
    pub name: String,
    pub ty: Type,
}

/// Function signature, registered before the body is parsed so that
/// recursive calls resolve
#[derive(Debug, Clone, PartialEq)]
pub struct FunProto {
    pub token: Token,
    pub name: String,
    pub params: Vec<Param>,
    pub returns: Type,
}

/// One slot in a function's frame, in declaration order (parameters
/// first). `size` is 8 for scalars and the rounded byte count for
/// anonymous `allocate` blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSlot {
    pub name: String,
    pub size: u64,
}

/// A parsed function: prototype, body, the local bindings (parameters
/// included), and the ordered frame slots the code generator lays out
#[derive(Debug, Clone, PartialEq)]
pub struct Fun {
    pub proto: FunProto,
    pub body: Vec<Stmt>,
    pub scope: IndexMap<String, ScopeVar>,
    pub locals: Vec<LocalSlot>,
}

/// A fully parsed compilation: the functions in source order plus the
/// populated symbol tables. Later stages read both and mutate neither.
#[derive(Debug, Clone)]
pub struct Program {
    pub functions: Vec<Fun>,
    pub symbols: SymbolTables,
}

impl Program {
    pub fn find_function(&self, name: &str) -> Option<&Fun> {
        self.functions.iter().find(|f| f.proto.name == name)
    }

    /// Render the whole AST for `--dump-ast`
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for fun in &self.functions {
            fun.dump(0, &mut out);
        }
        out
    }
}

impl Expr {
    /// Append an indented description of this expression to `out`
    pub fn dump(&self, depth: usize, out: &mut String) {
        let pad = " ".repeat(depth);
        match &self.kind {
            ExprKind::IntLiteral(value) => {
                let _ = writeln!(out, "{}IntLiteral {} : {}", pad, value, self.ty);
            }
            ExprKind::ArrayRef { symbol } => {
                let _ = writeln!(out, "{}ArrayRef {} : {}", pad, symbol, self.ty);
            }
            ExprKind::IdentRef { name, ident } => {
                let _ = writeln!(out, "{}IdentRef {} ({}) : {}", pad, name, ident, self.ty);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let _ = writeln!(out, "{}Binary {:?} : {}", pad, op, self.ty);
                lhs.dump(depth + 4, out);
                rhs.dump(depth + 4, out);
            }
            ExprKind::AddressOf { target } => {
                let _ = writeln!(out, "{}AddressOf : {}", pad, self.ty);
                target.dump(depth + 4, out);
            }
            ExprKind::Load { width, address } => {
                let _ = writeln!(out, "{}Load{} : {}", pad, width, self.ty);
                address.dump(depth + 4, out);
            }
            ExprKind::Call { name, args } => {
                let _ = writeln!(out, "{}Call {} : {}", pad, name, self.ty);
                for arg in args {
                    arg.dump(depth + 4, out);
                }
            }
            ExprKind::Syscall {
                arity,
                number,
                args,
            } => {
                let _ = writeln!(out, "{}Syscall{} : {}", pad, arity, self.ty);
                number.dump(depth + 4, out);
                for arg in args {
                    arg.dump(depth + 4, out);
                }
            }
        }
    }
}

impl Stmt {
    pub fn dump(&self, depth: usize, out: &mut String) {
        let pad = " ".repeat(depth);
        match &self.kind {
            StmtKind::VarDef { name, ty, init } => {
                let _ = writeln!(out, "{}VarDef {} : {}", pad, name, ty);
                if let Some(init) = init {
                    init.dump(depth + 4, out);
                }
            }
            StmtKind::VarSet { name, ident, value } => {
                let _ = writeln!(out, "{}VarSet {} ({})", pad, name, ident);
                value.dump(depth + 4, out);
            }
            StmtKind::Store {
                width,
                address,
                value,
            } => {
                let _ = writeln!(out, "{}Store{}", pad, width);
                address.dump(depth + 4, out);
                value.dump(depth + 4, out);
            }
            StmtKind::Print(expr) => {
                let _ = writeln!(out, "{}Print", pad);
                expr.dump(depth + 4, out);
            }
            StmtKind::Drop(expr) => {
                let _ = writeln!(out, "{}Drop", pad);
                expr.dump(depth + 4, out);
            }
            StmtKind::Return(value) => {
                let _ = writeln!(out, "{}Return", pad);
                if let Some(value) = value {
                    value.dump(depth + 4, out);
                }
            }
            StmtKind::If { condition, body } => {
                let _ = writeln!(out, "{}If", pad);
                condition.dump(depth + 4, out);
                for stmt in body {
                    stmt.dump(depth + 4, out);
                }
            }
            StmtKind::While { condition, body } => {
                let _ = writeln!(out, "{}While", pad);
                condition.dump(depth + 4, out);
                for stmt in body {
                    stmt.dump(depth + 4, out);
                }
            }
            StmtKind::Expr(expr) => {
                let _ = writeln!(out, "{}ExprStmt", pad);
                expr.dump(depth + 4, out);
            }
        }
    }
}

impl Fun {
    pub fn dump(&self, depth: usize, out: &mut String) {
        let pad = " ".repeat(depth);
        let params: Vec<String> = self
            .proto
            .params
            .iter()
            .map(|p| format!("{} as {}", p.name, p.ty))
            .collect();
        let _ = writeln!(
            out,
            "{}Function {}({}) yields {}",
            pad,
            self.proto.name,
            params.join(", "),
            self.proto.returns
        );
        for stmt in &self.body {
            stmt.dump(depth + 4, out);
        }
    }
}
