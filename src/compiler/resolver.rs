//! # Resolver
//!
//! The first semantic pass. Walks the program once to register top-level
//! declarations (globals, functions, structs, enums, interfaces), then walks
//! each function and method body with a scoped symbol environment.
//!
//! Enforced here: duplicate declarations, declaration-before-use, assignment
//! targets and mutability, `self` and `return` context, presence of `Main`,
//! and the rejection of generic-struct usages (definitions parse and
//! register; instantiation is not supported).

use crate::ast::nodes::*;
use crate::ast::types::Type;
use crate::compiler::error::CompileError;
use crate::compiler::type_checker::is_builtin;
use std::collections::HashMap;

/// Scoped name environment: name -> (type, mutable).
type Env = HashMap<String, (Type, bool)>;

/// The central structure for the resolution pass.
pub struct Resolver<'a> {
    globals: Env,
    functions: HashMap<String, &'a FunctionDef>,
    structs: HashMap<String, &'a StructDef>,
    enums: HashMap<String, &'a EnumDef>,
    interfaces: HashMap<String, &'a InterfaceDef>,
}

/// Resolves the program, failing with the first semantic error.
pub fn resolve(program: &Program) -> Result<(), CompileError> {
    Resolver::new().resolve_program(program)
}

impl<'a> Resolver<'a> {
    fn new() -> Self {
        Self {
            globals: HashMap::new(),
            functions: HashMap::new(),
            structs: HashMap::new(),
            enums: HashMap::new(),
            interfaces: HashMap::new(),
        }
    }

    fn resolve_program(&mut self, program: &'a Program) -> Result<(), CompileError> {
        // Pass 1: register top-level declarations.
        for stmt in &program.statements {
            match &stmt.kind {
                StmtKind::VarDecl {
                    name, ty, value, mutable,
                } => {
                    if self.globals.contains_key(name) {
                        return Err(CompileError::resolve(
                            format!("Duplicate global variable '{}'", name),
                            stmt.line,
                            stmt.column,
                        ));
                    }
                    let inferred = ty
                        .clone()
                        .or_else(|| value.as_ref().map(literal_type))
                        .unwrap_or(Type::Int);
                    self.globals.insert(name.clone(), (inferred, *mutable));
                }
                StmtKind::FunctionDef(def) => {
                    if self.functions.contains_key(&def.name) {
                        return Err(CompileError::resolve(
                            format!("Duplicate function '{}'", def.name),
                            def.line,
                            def.column,
                        ));
                    }
                    self.functions.insert(def.name.clone(), def);
                }
                StmtKind::StructDef(def) => {
                    if self.structs.contains_key(&def.name) {
                        return Err(CompileError::resolve(
                            format!("Duplicate struct '{}'", def.name),
                            def.line,
                            def.column,
                        ));
                    }
                    self.structs.insert(def.name.clone(), def);
                }
                StmtKind::EnumDef(def) => {
                    if self.enums.contains_key(&def.name) {
                        return Err(CompileError::resolve(
                            format!("Duplicate enum '{}'", def.name),
                            def.line,
                            def.column,
                        ));
                    }
                    let mut seen = std::collections::HashSet::new();
                    for (variant, _) in &def.variants {
                        if !seen.insert(variant.as_str()) {
                            return Err(CompileError::resolve(
                                format!("Duplicate variant '{}' in enum '{}'", variant, def.name),
                                def.line,
                                def.column,
                            ));
                        }
                    }
                    self.enums.insert(def.name.clone(), def);
                }
                StmtKind::InterfaceDef(def) => {
                    if self.interfaces.contains_key(&def.name) {
                        return Err(CompileError::resolve(
                            format!("Duplicate interface '{}'", def.name),
                            def.line,
                            def.column,
                        ));
                    }
                    self.interfaces.insert(def.name.clone(), def);
                }
                _ => {}
            }
        }

        if !self.functions.contains_key("Main") {
            return Err(CompileError::resolve(
                "Missing Main function entrypoint",
                program.line,
                program.column,
            ));
        }

        // Pass 2: walk bodies with scoped environments.
        for stmt in &program.statements {
            match &stmt.kind {
                StmtKind::FunctionDef(def) => self.resolve_function(def)?,
                StmtKind::VarDecl { ty, value, .. } => {
                    if let Some(ty) = ty {
                        self.reject_generic(ty, stmt.line, stmt.column)?;
                    }
                    if let Some(value) = value {
                        self.resolve_expr(value, &HashMap::new(), false, None)?;
                    }
                }
                StmtKind::StructDef(def) => {
                    for field in &def.fields {
                        // Fields of a generic struct may mention its own
                        // parameters; concrete structs must not be generic.
                        if def.type_params.is_empty() {
                            self.reject_generic(&field.ty, field.line, field.column)?;
                        }
                    }
                    for method in &def.methods {
                        self.resolve_method(method, def)?;
                    }
                }
                StmtKind::EnumDef(_) | StmtKind::InterfaceDef(_) => {}
                _ => {
                    let mut top_locals = HashMap::new();
                    self.resolve_statement(stmt, &mut top_locals, false, None)?;
                }
            }
        }

        Ok(())
    }

    fn resolve_function(&self, def: &FunctionDef) -> Result<(), CompileError> {
        let mut locals: Env = HashMap::new();
        for param in &def.params {
            if locals.contains_key(&param.name) {
                return Err(CompileError::resolve(
                    format!("Duplicate parameter '{}'", param.name),
                    def.line,
                    def.column,
                ));
            }
            if let Some(ty) = &param.ty {
                self.reject_generic(ty, def.line, def.column)?;
            }
            if let Some(default) = &param.default {
                self.resolve_expr(default, &locals, false, None)?;
            }
            locals.insert(
                param.name.clone(),
                (param.ty.clone().unwrap_or(Type::Int), true),
            );
        }
        if let Some(ret) = &def.return_type {
            self.reject_generic(ret, def.line, def.column)?;
        }

        for stmt in &def.body.statements {
            self.resolve_statement(stmt, &mut locals, true, None)?;
        }
        Ok(())
    }

    fn resolve_method(&self, method: &MethodDef, owner: &StructDef) -> Result<(), CompileError> {
        let mut locals: Env = HashMap::new();
        // `self` is the implicit first parameter, immutably bound.
        locals.insert("self".to_string(), (Type::Named(owner.name.clone()), false));
        for param in &method.params {
            if locals.contains_key(&param.name) {
                return Err(CompileError::resolve(
                    format!("Duplicate parameter '{}'", param.name),
                    method.line,
                    method.column,
                ));
            }
            locals.insert(
                param.name.clone(),
                (param.ty.clone().unwrap_or(Type::Int), true),
            );
        }

        for stmt in &method.body.statements {
            self.resolve_statement(stmt, &mut locals, true, Some(owner))?;
        }
        Ok(())
    }

    fn resolve_statement(
        &self,
        stmt: &Stmt,
        locals: &mut Env,
        in_function: bool,
        current_struct: Option<&StructDef>,
    ) -> Result<(), CompileError> {
        match &stmt.kind {
            StmtKind::VarDecl {
                name, ty, value, mutable,
            } => {
                if locals.contains_key(name) {
                    return Err(CompileError::resolve(
                        format!("Duplicate local variable '{}'", name),
                        stmt.line,
                        stmt.column,
                    ));
                }
                if let Some(ty) = ty {
                    self.reject_generic(ty, stmt.line, stmt.column)?;
                }
                if let Some(value) = value {
                    self.resolve_expr(value, locals, current_struct.is_some(), current_struct)?;
                }
                let inferred = ty
                    .clone()
                    .or_else(|| value.as_ref().map(literal_type))
                    .unwrap_or(Type::Int);
                locals.insert(name.clone(), (inferred, *mutable));
            }
            StmtKind::TupleUnpack {
                names, types, value, mutable,
            } => {
                self.resolve_expr(value, locals, current_struct.is_some(), current_struct)?;
                for (i, name) in names.iter().enumerate() {
                    if locals.contains_key(name) {
                        return Err(CompileError::resolve(
                            format!("Duplicate local variable '{}'", name),
                            stmt.line,
                            stmt.column,
                        ));
                    }
                    let ty = types.get(i).cloned().flatten().unwrap_or(Type::Int);
                    locals.insert(name.clone(), (ty, *mutable));
                }
            }
            StmtKind::Assignment { target, value } => {
                match &target.kind {
                    ExprKind::Identifier(name) => {
                        let binding = locals
                            .get(name)
                            .or_else(|| self.globals.get(name));
                        match binding {
                            None => {
                                return Err(CompileError::resolve(
                                    format!("Assignment to undefined identifier '{}'", name),
                                    stmt.line,
                                    stmt.column,
                                ));
                            }
                            Some((_, false)) => {
                                return Err(CompileError::resolve(
                                    format!("Cannot assign to immutable binding '{}'", name),
                                    stmt.line,
                                    stmt.column,
                                ));
                            }
                            Some((_, true)) => {}
                        }
                    }
                    _ => {
                        self.resolve_expr(
                            target,
                            locals,
                            current_struct.is_some(),
                            current_struct,
                        )?;
                    }
                }
                self.resolve_expr(value, locals, current_struct.is_some(), current_struct)?;
            }
            StmtKind::Expr(expr) => {
                self.resolve_expr(expr, locals, current_struct.is_some(), current_struct)?;
            }
            StmtKind::Return(value) => {
                if !in_function {
                    return Err(CompileError::resolve(
                        "Return outside of function",
                        stmt.line,
                        stmt.column,
                    ));
                }
                if let Some(value) = value {
                    self.resolve_expr(value, locals, current_struct.is_some(), current_struct)?;
                }
            }
            StmtKind::Defer(body) => {
                let mut scope = locals.clone();
                for inner in &body.statements {
                    self.resolve_statement(inner, &mut scope, in_function, current_struct)?;
                }
            }
            StmtKind::Block(body) => {
                let mut scope = locals.clone();
                for inner in &body.statements {
                    self.resolve_statement(inner, &mut scope, in_function, current_struct)?;
                }
            }
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => {
                self.resolve_expr(condition, locals, current_struct.is_some(), current_struct)?;
                let mut then_scope = locals.clone();
                for inner in &then_block.statements {
                    self.resolve_statement(inner, &mut then_scope, in_function, current_struct)?;
                }
                if let Some(else_stmt) = else_block {
                    let mut else_scope = locals.clone();
                    self.resolve_statement(else_stmt, &mut else_scope, in_function, current_struct)?;
                }
            }
            StmtKind::While { condition, body } => {
                self.resolve_expr(condition, locals, current_struct.is_some(), current_struct)?;
                let mut scope = locals.clone();
                for inner in &body.statements {
                    self.resolve_statement(inner, &mut scope, in_function, current_struct)?;
                }
            }
            StmtKind::For {
                var, start, end, body,
            } => {
                self.resolve_expr(start, locals, current_struct.is_some(), current_struct)?;
                self.resolve_expr(end, locals, current_struct.is_some(), current_struct)?;
                let mut scope = locals.clone();
                scope.insert(var.clone(), (Type::Int, true));
                for inner in &body.statements {
                    self.resolve_statement(inner, &mut scope, in_function, current_struct)?;
                }
            }
            StmtKind::FunctionDef(def) => {
                return Err(CompileError::resolve(
                    format!("Function '{}' defined inside another function", def.name),
                    stmt.line,
                    stmt.column,
                ));
            }
            StmtKind::StructDef(def) => {
                return Err(CompileError::resolve(
                    format!("Struct '{}' defined inside a function", def.name),
                    stmt.line,
                    stmt.column,
                ));
            }
            StmtKind::EnumDef(def) => {
                return Err(CompileError::resolve(
                    format!("Enum '{}' defined inside a function", def.name),
                    stmt.line,
                    stmt.column,
                ));
            }
            StmtKind::InterfaceDef(def) => {
                return Err(CompileError::resolve(
                    format!("Interface '{}' defined inside a function", def.name),
                    stmt.line,
                    stmt.column,
                ));
            }
        }
        Ok(())
    }

    fn resolve_expr(
        &self,
        expr: &Expr,
        locals: &Env,
        in_method: bool,
        current_struct: Option<&StructDef>,
    ) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::IntLiteral(_)
            | ExprKind::DecLiteral(_)
            | ExprKind::StrLiteral(_)
            | ExprKind::BoolLiteral(_)
            | ExprKind::NullLiteral => Ok(()),
            // Embedded expressions are re-parsed and resolved at codegen time.
            ExprKind::InterpString(_) => Ok(()),
            ExprKind::Identifier(name) => {
                if name == "argc" || name == "argv" {
                    return Ok(());
                }
                if locals.contains_key(name)
                    || self.globals.contains_key(name)
                    || self.enums.contains_key(name)
                {
                    Ok(())
                } else {
                    Err(CompileError::resolve(
                        format!("Undefined identifier '{}'", name),
                        expr.line,
                        expr.column,
                    ))
                }
            }
            ExprKind::SelfExpr => {
                if in_method {
                    Ok(())
                } else {
                    Err(CompileError::resolve(
                        "'self' used outside of method",
                        expr.line,
                        expr.column,
                    ))
                }
            }
            ExprKind::Binary { left, right, .. } => {
                self.resolve_expr(left, locals, in_method, current_struct)?;
                self.resolve_expr(right, locals, in_method, current_struct)
            }
            ExprKind::Unary { operand, .. }
            | ExprKind::AddressOf(operand)
            | ExprKind::Dereference(operand)
            | ExprKind::Try(operand) => {
                self.resolve_expr(operand, locals, in_method, current_struct)
            }
            ExprKind::FieldAccess { receiver, .. } => {
                self.resolve_expr(receiver, locals, in_method, current_struct)
            }
            ExprKind::Index { receiver, index } => {
                self.resolve_expr(receiver, locals, in_method, current_struct)?;
                self.resolve_expr(index, locals, in_method, current_struct)
            }
            ExprKind::Call { name, args } => {
                if !is_builtin(name) && !self.functions.contains_key(name) {
                    return Err(CompileError::resolve(
                        format!("Unknown function '{}'", name),
                        expr.line,
                        expr.column,
                    ));
                }
                for arg in args {
                    self.resolve_expr(arg, locals, in_method, current_struct)?;
                }
                Ok(())
            }
            ExprKind::MethodCall { receiver, args, .. } => {
                self.resolve_expr(receiver, locals, in_method, current_struct)?;
                for arg in args {
                    self.resolve_expr(arg, locals, in_method, current_struct)?;
                }
                Ok(())
            }
            ExprKind::New {
                struct_name,
                type_args,
                initializers,
            } => {
                let Some(def) = self.structs.get(struct_name.as_str()) else {
                    return Err(CompileError::resolve(
                        format!("Unknown struct type '{}'", struct_name),
                        expr.line,
                        expr.column,
                    ));
                };
                if !type_args.is_empty() || !def.type_params.is_empty() {
                    return Err(CompileError::resolve(
                        format!(
                            "Generic struct '{}' cannot be instantiated; generic usages are not supported",
                            struct_name
                        ),
                        expr.line,
                        expr.column,
                    ));
                }
                for (_, value) in initializers {
                    self.resolve_expr(value, locals, in_method, current_struct)?;
                }
                Ok(())
            }
            ExprKind::ArrayLiteral(elements) | ExprKind::TupleLiteral(elements) => {
                for element in elements {
                    self.resolve_expr(element, locals, in_method, current_struct)?;
                }
                Ok(())
            }
            ExprKind::EnumAccess { enum_name, variant } => {
                let Some(def) = self.enums.get(enum_name.as_str()) else {
                    return Err(CompileError::resolve(
                        format!("Unknown enum '{}'", enum_name),
                        expr.line,
                        expr.column,
                    ));
                };
                if !def.variants.iter().any(|(name, _)| name == variant) {
                    return Err(CompileError::resolve(
                        format!("Unknown variant '{}' in enum '{}'", variant, enum_name),
                        expr.line,
                        expr.column,
                    ));
                }
                Ok(())
            }
        }
    }

    /// Rejects generic type usages in annotations.
    fn reject_generic(&self, ty: &Type, line: usize, column: usize) -> Result<(), CompileError> {
        match ty {
            Type::Generic { base, .. } => Err(CompileError::resolve(
                format!(
                    "Generic type '{}' cannot be used; generic usages are not supported",
                    base
                ),
                line,
                column,
            )),
            Type::Pointer(inner) | Type::ArrayOf(inner) => self.reject_generic(inner, line, column),
            Type::Tuple(elems) => {
                for elem in elems {
                    self.reject_generic(elem, line, column)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Shallow literal type inference used for globals before the type checker
/// runs. Anything non-literal defaults to `int`.
fn literal_type(expr: &Expr) -> Type {
    match &expr.kind {
        ExprKind::IntLiteral(_) => Type::Int,
        ExprKind::DecLiteral(_) => Type::Dec,
        ExprKind::StrLiteral(_) | ExprKind::InterpString(_) => Type::Str,
        ExprKind::BoolLiteral(_) => Type::Bool,
        ExprKind::NullLiteral => Type::Pointer(Box::new(Type::Void)),
        _ => Type::Int,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::tokenize;
    use crate::compiler::parser::parse;

    fn resolve_source(source: &str) -> Result<(), CompileError> {
        resolve(&parse(tokenize(source).unwrap()).unwrap())
    }

    #[test]
    fn accepts_well_formed_program() {
        resolve_source(
            "var int g = 1;\nhelper(n: int) -> int { return n + g; }\nMain() { var int x = helper(2); Print(x); }\n",
        )
        .unwrap();
    }

    #[test]
    fn missing_main_is_rejected() {
        let err = resolve_source("var int x = 1;\n").unwrap_err();
        match err {
            CompileError::Resolve { message, .. } => assert!(message.contains("Main")),
            other => panic!("expected resolve error, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_global_is_rejected() {
        let err = resolve_source("var int x = 1;\nvar int x = 2;\nMain() {}\n").unwrap_err();
        assert!(matches!(err, CompileError::Resolve { line: 2, .. }));
    }

    #[test]
    fn duplicate_function_is_rejected() {
        let err = resolve_source("f() {}\nf() {}\nMain() {}\n").unwrap_err();
        assert!(matches!(err, CompileError::Resolve { .. }));
    }

    #[test]
    fn undefined_identifier_is_rejected() {
        let err = resolve_source("Main() { Print(x); }\n").unwrap_err();
        match err {
            CompileError::Resolve { message, .. } => {
                assert!(message.contains("Undefined identifier 'x'"));
            }
            other => panic!("expected resolve error, got {:?}", other),
        }
    }

    #[test]
    fn declaration_must_precede_use() {
        let err = resolve_source("Main() { Print(x); var int x = 1; }\n").unwrap_err();
        assert!(matches!(err, CompileError::Resolve { .. }));
    }

    #[test]
    fn assignment_to_immutable_let_is_rejected() {
        let err = resolve_source("Main() { let x = 1; x = 2; }\n").unwrap_err();
        match err {
            CompileError::Resolve { message, .. } => {
                assert!(message.contains("immutable"));
            }
            other => panic!("expected resolve error, got {:?}", other),
        }
    }

    #[test]
    fn let_mut_is_assignable() {
        resolve_source("Main() { let mut x = 1; x = 2; Print(x); }\n").unwrap();
    }

    #[test]
    fn assignment_to_unknown_target_is_rejected() {
        let err = resolve_source("Main() { y = 1; }\n").unwrap_err();
        assert!(matches!(err, CompileError::Resolve { .. }));
    }

    #[test]
    fn self_outside_method_is_rejected() {
        let err = resolve_source("Main() { Print(self); }\n").unwrap_err();
        match err {
            CompileError::Resolve { message, .. } => assert!(message.contains("self")),
            other => panic!("expected resolve error, got {:?}", other),
        }
    }

    #[test]
    fn self_inside_method_is_accepted() {
        resolve_source(
            "struct P { var int x; get() -> int { return self.x; } }\nMain() {}\n",
        )
        .unwrap();
    }

    #[test]
    fn unknown_function_call_is_rejected() {
        let err = resolve_source("Main() { frobnicate(1); }\n").unwrap_err();
        assert!(matches!(err, CompileError::Resolve { .. }));
    }

    #[test]
    fn builtins_need_no_declaration() {
        resolve_source("Main() { Print(Clock()); Sleep(1); }\n").unwrap();
    }

    #[test]
    fn inner_scope_declarations_do_not_leak() {
        let err =
            resolve_source("Main() { if (true) { var int t = 1; } Print(t); }\n").unwrap_err();
        assert!(matches!(err, CompileError::Resolve { .. }));
    }

    #[test]
    fn for_loop_variable_is_scoped_and_mutable() {
        resolve_source("Main() { for i in 0..3 { i = i + 1; } }\n").unwrap();
        let err = resolve_source("Main() { for i in 0..3 { } Print(i); }\n").unwrap_err();
        assert!(matches!(err, CompileError::Resolve { .. }));
    }

    #[test]
    fn unknown_struct_in_new_is_rejected() {
        let err = resolve_source("Main() { var x = new Ghost{}; }\n").unwrap_err();
        assert!(matches!(err, CompileError::Resolve { .. }));
    }

    #[test]
    fn unknown_enum_variant_is_rejected() {
        let err = resolve_source(
            "enum Status { OK }\nMain() { var int s = Status.Missing; }\n",
        )
        .unwrap_err();
        match err {
            CompileError::Resolve { message, .. } => assert!(message.contains("Missing")),
            other => panic!("expected resolve error, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_enum_variant_is_rejected() {
        let err = resolve_source("enum S { A, A }\nMain() {}\n").unwrap_err();
        assert!(matches!(err, CompileError::Resolve { .. }));
    }

    #[test]
    fn generic_struct_usage_is_rejected() {
        let err = resolve_source(
            "struct List<T> { var int length; }\nMain() { var x = new List{}; }\n",
        )
        .unwrap_err();
        match err {
            CompileError::Resolve { message, .. } => {
                assert!(message.contains("not supported"));
            }
            other => panic!("expected resolve error, got {:?}", other),
        }
    }

    #[test]
    fn generic_definition_alone_is_accepted() {
        resolve_source("struct List<T> { var int length; }\nMain() {}\n").unwrap();
    }

    #[test]
    fn generic_annotation_is_rejected() {
        let err = resolve_source(
            "struct List<T> { var int length; }\nMain() { var List<int> l = null; }\n",
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Resolve { .. }));
    }

    #[test]
    fn duplicate_parameter_is_rejected() {
        let err = resolve_source("f(a: int, a: int) {}\nMain() {}\n").unwrap_err();
        assert!(matches!(err, CompileError::Resolve { .. }));
    }
}
