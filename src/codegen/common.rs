//! # Code Generation Context
//!
//! The central context structure shared by all code generators. It manages
//! the global string pool, control-flow label allocation, symbol tables for
//! globals and the current function's locals, struct layouts, enum tables,
//! method tables, and per-function state (return label, pending defers,
//! register parameter homes).

use crate::ast::nodes::*;
use crate::ast::types::Type;
use crate::compiler::error::CompileError;
use std::collections::HashMap;

/// Where a symbol's value lives at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    /// A global `.data` label, addressed RIP-relative.
    Global(String),
    /// A stack slot at the given offset from `%rbp`.
    Stack(i64),
    /// A callee-saved register home (`%r13`/`%r14`/`%r15`) for leading
    /// parameters, so their values survive intervening calls.
    Register(&'static str),
}

/// A named runtime value with its type and storage.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub storage: Storage,
    pub mutable: bool,
}

impl Symbol {
    /// The operand addressing this symbol in AT&T syntax.
    pub fn location(&self) -> String {
        match &self.storage {
            Storage::Global(label) => format!("{}(%rip)", label),
            Storage::Stack(offset) => format!("{}(%rbp)", offset),
            Storage::Register(reg) => (*reg).to_string(),
        }
    }
}

/// A struct's memory layout: one machine word per declared field, offsets
/// assigned in declaration order and never changed after layout.
#[derive(Debug, Clone)]
pub struct StructLayout {
    pub size: i64,
    /// field name -> (offset, type), in declaration order via `order`.
    pub fields: HashMap<String, (i64, Type)>,
    pub order: Vec<String>,
}

/// A callable signature retained for call lowering: parameter list (with
/// defaults) and return type.
#[derive(Debug, Clone)]
pub struct FunctionSig {
    pub params: Vec<Param>,
    pub return_type: Option<Type>,
}

/// The argument-passing registers of the System V AMD64 ABI, in order.
pub const ABI_ARG_REGISTERS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];

/// The code generation context.
pub struct CodeGen {
    label_counter: usize,
    /// Append-only ordered list of (label, content) pairs, emitted once in
    /// the data section at the end of translation.
    pub string_pool: Vec<(String, String)>,
    pub globals: HashMap<String, Symbol>,
    pub locals: HashMap<String, Symbol>,
    pub functions: HashMap<String, FunctionSig>,
    pub structs: HashMap<String, StructLayout>,
    pub enums: HashMap<String, HashMap<String, i64>>,
    pub methods: HashMap<String, HashMap<String, FunctionSig>>,
    /// Set while emitting a function body.
    pub current_function: Option<String>,
    /// Set while emitting a method body (the owning struct).
    pub current_struct: Option<String>,
    /// The single per-function return label every return path funnels into.
    pub return_label: String,
    /// Deferred blocks registered so far in the current function, in source
    /// order. Replayed in reverse on every return path.
    pub defers: Vec<Block>,
}

impl CodeGen {
    pub fn new() -> Self {
        Self {
            label_counter: 0,
            string_pool: Vec::new(),
            globals: HashMap::new(),
            locals: HashMap::new(),
            functions: HashMap::new(),
            structs: HashMap::new(),
            enums: HashMap::new(),
            methods: HashMap::new(),
            current_function: None,
            current_struct: None,
            return_label: String::new(),
            defers: Vec::new(),
        }
    }

    /// Allocates a fresh control-flow label with the given prefix.
    pub fn next_label(&mut self, prefix: &str) -> String {
        let label = format!(".L{}_{}", prefix, self.label_counter);
        self.label_counter += 1;
        label
    }

    /// Appends a string literal to the pool and returns its label.
    pub fn add_string(&mut self, content: &str) -> String {
        let label = format!(".str_{}", self.string_pool.len());
        self.string_pool.push((label.clone(), content.to_string()));
        label
    }

    /// Looks up a symbol in the current locals, then the globals.
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.locals.get(name).or_else(|| self.globals.get(name))
    }

    /// Registers a struct's layout: each field occupies one 8-byte word in
    /// declaration order; total size is the sum, minimum one word.
    pub fn register_struct(&mut self, def: &StructDef) {
        let mut fields = HashMap::new();
        let mut order = Vec::new();
        let mut offset = 0i64;
        for field in &def.fields {
            fields.insert(field.name.clone(), (offset, field.ty.clone()));
            order.push(field.name.clone());
            offset += 8;
        }
        let size = offset.max(8);
        self.structs.insert(
            def.name.clone(),
            StructLayout {
                size,
                fields,
                order,
            },
        );

        let mut methods = HashMap::new();
        for method in &def.methods {
            methods.insert(
                method.name.clone(),
                FunctionSig {
                    params: method.params.clone(),
                    return_type: method.return_type.clone(),
                },
            );
        }
        self.methods.insert(def.name.clone(), methods);
    }

    /// Registers an enum's variant table: variants default to the previous
    /// value plus one, starting at zero; an explicit `= N` resets the
    /// running counter.
    pub fn register_enum(&mut self, def: &EnumDef) {
        let mut table = HashMap::new();
        let mut next = 0i64;
        for (variant, explicit) in &def.variants {
            let value = explicit.unwrap_or(next);
            table.insert(variant.clone(), value);
            next = value + 1;
        }
        self.enums.insert(def.name.clone(), table);
    }

    /// Registers a function signature for call lowering.
    pub fn register_function(&mut self, def: &FunctionDef) {
        self.functions.insert(
            def.name.clone(),
            FunctionSig {
                params: def.params.clone(),
                return_type: def.return_type.clone(),
            },
        );
    }

    /// Escapes a string for an `.asciz` directive.
    pub fn escape_string(content: &str) -> String {
        content
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
            .replace('\t', "\\t")
            .replace('\r', "\\r")
    }

    /// Infers the static type of an expression from the generator's own
    /// symbol tables. Mirrors the checker's rules; used to pick string vs
    /// integer lowering paths. Unknown cases fall back to `int` (the checker
    /// has already validated the program).
    pub fn expr_type(&self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::IntLiteral(_) => Type::Int,
            ExprKind::DecLiteral(_) => Type::Dec,
            ExprKind::StrLiteral(_) | ExprKind::InterpString(_) => Type::Str,
            ExprKind::BoolLiteral(_) => Type::Bool,
            ExprKind::NullLiteral => Type::Pointer(Box::new(Type::Void)),
            ExprKind::Identifier(name) => self
                .symbol(name)
                .map(|s| s.ty.clone())
                .unwrap_or(Type::Int),
            ExprKind::SelfExpr => self
                .current_struct
                .clone()
                .map(Type::Named)
                .unwrap_or(Type::Int),
            ExprKind::AddressOf(inner) => Type::Pointer(Box::new(self.expr_type(inner))),
            ExprKind::Dereference(inner) => match self.expr_type(inner) {
                Type::Pointer(pointee) => *pointee,
                _ => Type::Int,
            },
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => Type::Bool,
                _ => self.expr_type(operand),
            },
            ExprKind::Binary { left, op, right } => match op {
                BinaryOp::Add => {
                    let (lt, rt) = (self.expr_type(left), self.expr_type(right));
                    if lt == Type::Str || rt == Type::Str {
                        Type::Str
                    } else if lt == Type::Dec || rt == Type::Dec {
                        Type::Dec
                    } else {
                        Type::Int
                    }
                }
                BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                    let (lt, rt) = (self.expr_type(left), self.expr_type(right));
                    if lt == Type::Dec || rt == Type::Dec {
                        Type::Dec
                    } else {
                        Type::Int
                    }
                }
                _ => Type::Bool,
            },
            ExprKind::FieldAccess { receiver, field } => {
                if let Type::Named(struct_name) = self.expr_type(receiver) {
                    if let Some(layout) = self.structs.get(&struct_name) {
                        if let Some((_, ty)) = layout.fields.get(field) {
                            return ty.clone();
                        }
                    }
                }
                Type::Int
            }
            ExprKind::EnumAccess { enum_name, .. } => Type::Named(enum_name.clone()),
            ExprKind::Index { receiver, .. } => self.expr_type(receiver).element_type(),
            ExprKind::New { struct_name, .. } => Type::Named(struct_name.clone()),
            ExprKind::ArrayLiteral(elements) => {
                let element = elements
                    .first()
                    .map(|e| self.expr_type(e))
                    .unwrap_or(Type::Int);
                Type::ArrayOf(Box::new(element))
            }
            ExprKind::TupleLiteral(elements) => {
                Type::Tuple(elements.iter().map(|e| self.expr_type(e)).collect())
            }
            ExprKind::Try(inner) => self.expr_type(inner),
            ExprKind::MethodCall {
                receiver, method, ..
            } => {
                if let Type::Named(struct_name) = self.expr_type(receiver) {
                    if let Some(methods) = self.methods.get(&struct_name) {
                        if let Some(sig) = methods.get(method) {
                            return sig.return_type.clone().unwrap_or(Type::Int);
                        }
                    }
                }
                Type::Int
            }
            ExprKind::Call { name, args: _ } => {
                if let Some(sig) = self.functions.get(name) {
                    return sig.return_type.clone().unwrap_or(Type::Int);
                }
                if let Some((_, _, ret)) =
                    crate::compiler::type_checker::builtin_signature(name)
                {
                    return ret.map(Type::from_name).unwrap_or(Type::Void);
                }
                Type::Int
            }
        }
    }

    /// True when the expression statically has string type.
    pub fn is_string(&self, expr: &Expr) -> bool {
        self.expr_type(expr) == Type::Str
    }

    /// Invariant-violation error helper.
    pub fn invariant(&self, message: impl Into<String>) -> CompileError {
        CompileError::codegen(message)
    }
}

impl Default for CodeGen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, ty: Type) -> FieldDecl {
        FieldDecl {
            name: name.to_string(),
            ty,
            line: 1,
            column: 1,
        }
    }

    #[test]
    fn struct_layout_is_declaration_ordered() {
        let mut ctx = CodeGen::new();
        ctx.register_struct(&StructDef {
            name: "P".into(),
            type_params: vec![],
            fields: vec![field("x", Type::Int), field("y", Type::Int), field("s", Type::Str)],
            methods: vec![],
            line: 1,
            column: 1,
        });
        let layout = &ctx.structs["P"];
        assert_eq!(layout.size, 24);
        assert_eq!(layout.fields["x"].0, 0);
        assert_eq!(layout.fields["y"].0, 8);
        assert_eq!(layout.fields["s"].0, 16);
        assert_eq!(layout.order, vec!["x", "y", "s"]);
    }

    #[test]
    fn empty_struct_still_occupies_one_word() {
        let mut ctx = CodeGen::new();
        ctx.register_struct(&StructDef {
            name: "Unit".into(),
            type_params: vec![],
            fields: vec![],
            methods: vec![],
            line: 1,
            column: 1,
        });
        assert_eq!(ctx.structs["Unit"].size, 8);
    }

    #[test]
    fn enum_values_continue_and_reset() {
        let mut ctx = CodeGen::new();
        ctx.register_enum(&EnumDef {
            name: "Status".into(),
            variants: vec![
                ("OK".into(), None),
                ("NotFound".into(), Some(404)),
                ("Retry".into(), None),
            ],
            line: 1,
            column: 1,
        });
        let table = &ctx.enums["Status"];
        assert_eq!(table["OK"], 0);
        assert_eq!(table["NotFound"], 404);
        assert_eq!(table["Retry"], 405);
    }

    #[test]
    fn string_pool_is_append_only_and_ordered() {
        let mut ctx = CodeGen::new();
        let a = ctx.add_string("first");
        let b = ctx.add_string("second");
        assert_eq!(a, ".str_0");
        assert_eq!(b, ".str_1");
        assert_eq!(ctx.string_pool[0].1, "first");
        assert_eq!(ctx.string_pool[1].1, "second");
    }

    #[test]
    fn labels_are_unique() {
        let mut ctx = CodeGen::new();
        assert_ne!(ctx.next_label("if"), ctx.next_label("if"));
    }
}
