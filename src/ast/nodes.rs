//! # AST Nodes
//!
//! This module defines the data structures that make up the Abstract Syntax
//! Tree of the VYL language. Statements and expressions are tagged-variant
//! sum types; every node carries the (line, column) of the token that
//! introduced it. The tree is fully owned: no sharing, no cycles.

use crate::ast::types::Type;
use crate::compiler::lexer::StringPart;
use serde::Serialize;

/// Root node containing all top-level statements of a translation unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub line: usize,
    pub column: usize,
}

/// A code block: `{ statements }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub line: usize,
    pub column: usize,
}

/// A function or method parameter: `name[: type][= default]`.
///
/// The default is consumed literally and substituted at each call site when
/// the caller omits the argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: String,
    pub ty: Option<Type>,
    pub default: Option<Expr>,
}

/// Function definition: `Function name(params) [-> type] { ... }` or the
/// shorthand `name(params) [-> type] { ... }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<Type>,
    pub body: Block,
    pub line: usize,
    pub column: usize,
}

/// Method definition inside a struct body. `self` is an implicit first
/// parameter typed as the enclosing struct.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodDef {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<Type>,
    pub body: Block,
    pub line: usize,
    pub column: usize,
}

/// A struct field declaration: `var <type> <name>;`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: Type,
    pub line: usize,
    pub column: usize,
}

/// Struct definition with optional type parameters and inline methods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructDef {
    pub name: String,
    pub type_params: Vec<String>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDef>,
    pub line: usize,
    pub column: usize,
}

/// Enum definition. Variants without an explicit value continue from the
/// previous value plus one, starting at zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDef {
    pub name: String,
    pub variants: Vec<(String, Option<i64>)>,
    pub line: usize,
    pub column: usize,
}

/// A method signature inside an interface (no body).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodSig {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<Type>,
    pub line: usize,
    pub column: usize,
}

/// Interface definition: method signatures only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceDef {
    pub name: String,
    pub methods: Vec<MethodSig>,
    pub line: usize,
    pub column: usize,
}

/// A statement node with its source position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: usize,
    pub column: usize,
}

/// All statement forms of the language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StmtKind {
    /// `var [type] name [= value];` or `let [mut] name [: type] [= value];`
    VarDecl {
        name: String,
        ty: Option<Type>,
        value: Option<Expr>,
        mutable: bool,
    },
    /// `var [T1] a, [T2] b = expr;` — the right-hand side must be a tuple of
    /// matching arity.
    TupleUnpack {
        names: Vec<String>,
        types: Vec<Option<Type>>,
        value: Expr,
        mutable: bool,
    },
    /// Assignment to an identifier, field, or index target.
    Assignment { target: Expr, value: Expr },
    /// An expression used as a statement (call, method call, or `?` thereof).
    Expr(Expr),
    /// `return [expr];`
    Return(Option<Expr>),
    /// `defer { block }` or `defer stmt;` — registered LIFO, replayed on
    /// every return path.
    Defer(Block),
    /// A nested block.
    Block(Block),
    /// `if (cond) { } [elif ...] [else { }]` — elif chains nest in `else_block`.
    If {
        condition: Expr,
        then_block: Block,
        else_block: Option<Box<Stmt>>,
    },
    /// `while (cond) { }`
    While { condition: Expr, body: Block },
    /// `for name in start..end { }` — end-inclusive, step 1.
    For {
        var: String,
        start: Expr,
        end: Expr,
        body: Block,
    },
    FunctionDef(FunctionDef),
    StructDef(StructDef),
    EnumDef(EnumDef),
    InterfaceDef(InterfaceDef),
}

/// An expression node with its source position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: usize,
    pub column: usize,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// The source spelling of the operator, used in diagnostics.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Unary operators. Address-of and dereference have dedicated nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

/// All expression forms of the language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    IntLiteral(i64),
    DecLiteral(f64),
    StrLiteral(String),
    BoolLiteral(bool),
    /// `null`, typed `*void`.
    NullLiteral,
    /// A string literal containing `{expr}` segments, carried verbatim and
    /// re-parsed by the code generator.
    InterpString(Vec<StringPart>),
    Identifier(String),
    /// `self` inside a method body.
    SelfExpr,
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `&expr`, yielding `*T`.
    AddressOf(Box<Expr>),
    /// `*expr`, requiring `*T` and yielding `T`.
    Dereference(Box<Expr>),
    FieldAccess {
        receiver: Box<Expr>,
        field: String,
    },
    Index {
        receiver: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    /// `new S` / `new S{field: value, ...}`.
    New {
        struct_name: String,
        type_args: Vec<Type>,
        initializers: Vec<(String, Expr)>,
    },
    ArrayLiteral(Vec<Expr>),
    TupleLiteral(Vec<Expr>),
    /// `E.Variant` where `E` names an enum declared earlier in the file.
    EnumAccess {
        enum_name: String,
        variant: String,
    },
    /// Postfix `?` — early-returns the operand when it is negative, running
    /// pending deferred statements first.
    Try(Box<Expr>),
}

impl Expr {
    /// Convenience constructor used throughout the parser.
    pub fn new(kind: ExprKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}

impl Stmt {
    /// Convenience constructor used throughout the parser.
    pub fn new(kind: StmtKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }

    /// True for constructs terminated by a block instead of a semicolon.
    pub fn is_block_terminated(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::If { .. }
                | StmtKind::While { .. }
                | StmtKind::For { .. }
                | StmtKind::Block(_)
                | StmtKind::Defer(_)
                | StmtKind::FunctionDef(_)
                | StmtKind::StructDef(_)
                | StmtKind::EnumDef(_)
                | StmtKind::InterfaceDef(_)
        )
    }
}
