//! # Parser Module
//!
//! The syntactic-analysis phase of the VYL compiler: converts the linear
//! token stream produced by the lexer into a hierarchical Abstract Syntax
//! Tree via recursive descent with operator-precedence climbing.

pub mod common;
pub mod declaration_parser;
pub mod expression_parser;
pub mod statement_parser;

use crate::ast::nodes::Program;
use crate::compiler::error::CompileError;
use crate::compiler::lexer::Token;

/// The main entry point for the parsing phase.
///
/// # Arguments
///
/// * `tokens` - The materialized token list from the lexer, `EOF`-terminated.
///
/// # Returns
///
/// The root [`Program`] AST node, or the first [`CompileError`] encountered.
pub fn parse(tokens: Vec<Token>) -> Result<Program, CompileError> {
    let mut parser = common::Parser::new(tokens);
    parser.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::nodes::*;
    use crate::ast::types::Type;
    use crate::compiler::lexer::tokenize;

    fn parse_source(source: &str) -> Program {
        parse(tokenize(source).unwrap()).unwrap()
    }

    fn parse_err(source: &str) -> CompileError {
        parse(tokenize(source).unwrap()).unwrap_err()
    }

    fn main_body(program: &Program) -> &Vec<Stmt> {
        for stmt in &program.statements {
            if let StmtKind::FunctionDef(def) = &stmt.kind {
                if def.name == "Main" {
                    return &def.body.statements;
                }
            }
        }
        panic!("no Main in parsed program");
    }

    #[test]
    fn shorthand_function_definition() {
        let program = parse_source("Main() {\n  Print(1);\n}\n");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0].kind {
            StmtKind::FunctionDef(def) => {
                assert_eq!(def.name, "Main");
                assert!(def.params.is_empty());
                assert!(def.return_type.is_none());
            }
            other => panic!("expected function def, got {:?}", other),
        }
    }

    #[test]
    fn function_keyword_with_arrow_and_defaults() {
        let program =
            parse_source("Function greet(name: string, times: int = 3) -> int { return times; }");
        match &program.statements[0].kind {
            StmtKind::FunctionDef(def) => {
                assert_eq!(def.params.len(), 2);
                assert_eq!(def.params[0].ty, Some(Type::Str));
                assert!(def.params[0].default.is_none());
                assert!(def.params[1].default.is_some());
                assert_eq!(def.return_type, Some(Type::Int));
            }
            other => panic!("expected function def, got {:?}", other),
        }
    }

    #[test]
    fn precedence_mul_binds_tighter_than_add() {
        let program = parse_source("Main() { var int x = 1 + 2 * 3; }");
        let body = main_body(&program);
        let StmtKind::VarDecl { value: Some(value), .. } = &body[0].kind else {
            panic!("expected var decl");
        };
        let ExprKind::Binary { op, right, .. } = &value.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            right.kind,
            ExprKind::Binary { op: BinaryOp::Mul, .. }
        ));
    }

    #[test]
    fn logical_or_binds_loosest() {
        let program = parse_source("Main() { var bool b = true || false && false; }");
        let body = main_body(&program);
        let StmtKind::VarDecl { value: Some(value), .. } = &body[0].kind else {
            panic!("expected var decl");
        };
        assert!(matches!(
            value.kind,
            ExprKind::Binary { op: BinaryOp::Or, .. }
        ));
    }

    #[test]
    fn postfix_chain_and_try() {
        let program = parse_source("Main() { var int x = risky(1)?; }");
        let body = main_body(&program);
        let StmtKind::VarDecl { value: Some(value), .. } = &body[0].kind else {
            panic!("expected var decl");
        };
        let ExprKind::Try(inner) = &value.kind else {
            panic!("expected try expr");
        };
        assert!(matches!(inner.kind, ExprKind::Call { .. }));
    }

    #[test]
    fn method_call_field_access_and_index() {
        let program = parse_source("Main() { var int x = table.rows[2].sum(1); }");
        let body = main_body(&program);
        let StmtKind::VarDecl { value: Some(value), .. } = &body[0].kind else {
            panic!("expected var decl");
        };
        let ExprKind::MethodCall { receiver, method, args } = &value.kind else {
            panic!("expected method call");
        };
        assert_eq!(method, "sum");
        assert_eq!(args.len(), 1);
        assert!(matches!(receiver.kind, ExprKind::Index { .. }));
    }

    #[test]
    fn tuple_literal_vs_parenthesized() {
        let program = parse_source("Main() { var t = (1, 2); var int p = (3); }");
        let body = main_body(&program);
        let StmtKind::VarDecl { value: Some(tuple), .. } = &body[0].kind else {
            panic!("expected var decl");
        };
        assert!(matches!(tuple.kind, ExprKind::TupleLiteral(ref e) if e.len() == 2));
        let StmtKind::VarDecl { value: Some(paren), .. } = &body[1].kind else {
            panic!("expected var decl");
        };
        assert!(matches!(paren.kind, ExprKind::IntLiteral(3)));
    }

    #[test]
    fn tuple_unpack_declarations() {
        let program = parse_source("Main() { var x, y = (1, 2); var int a, string b = pair(); }");
        let body = main_body(&program);
        let StmtKind::TupleUnpack { names, types, .. } = &body[0].kind else {
            panic!("expected tuple unpack");
        };
        assert_eq!(names, &vec!["x".to_string(), "y".to_string()]);
        assert_eq!(types, &vec![None, None]);
        let StmtKind::TupleUnpack { names, types, .. } = &body[1].kind else {
            panic!("expected tuple unpack");
        };
        assert_eq!(names, &vec!["a".to_string(), "b".to_string()]);
        assert_eq!(types, &vec![Some(Type::Int), Some(Type::Str)]);
    }

    #[test]
    fn struct_with_fields_methods_and_generics() {
        let program = parse_source(
            "struct Box<T> {\n  var int size;\n  grow(by: int) -> int { return by; }\n}\nMain() {}\n",
        );
        let StmtKind::StructDef(def) = &program.statements[0].kind else {
            panic!("expected struct def");
        };
        assert_eq!(def.name, "Box");
        assert_eq!(def.type_params, vec!["T".to_string()]);
        assert_eq!(def.fields.len(), 1);
        assert_eq!(def.methods.len(), 1);
        assert_eq!(def.methods[0].name, "grow");
    }

    #[test]
    fn enum_values_and_enum_access() {
        let program = parse_source(
            "enum Status { OK, NotFound = 404, Retry }\nMain() { var int s = Status.NotFound; }\n",
        );
        let StmtKind::EnumDef(def) = &program.statements[0].kind else {
            panic!("expected enum def");
        };
        assert_eq!(def.variants.len(), 3);
        assert_eq!(def.variants[1], ("NotFound".to_string(), Some(404)));

        let body = main_body(&program);
        let StmtKind::VarDecl { value: Some(value), .. } = &body[0].kind else {
            panic!("expected var decl");
        };
        let ExprKind::EnumAccess { enum_name, variant } = &value.kind else {
            panic!("expected enum access, got {:?}", value.kind);
        };
        assert_eq!(enum_name, "Status");
        assert_eq!(variant, "NotFound");
    }

    #[test]
    fn interface_signatures_only() {
        let program =
            parse_source("interface Shape {\n  area() -> int;\n  scale(by: int);\n}\nMain() {}\n");
        let StmtKind::InterfaceDef(def) = &program.statements[0].kind else {
            panic!("expected interface def");
        };
        assert_eq!(def.methods.len(), 2);
        assert_eq!(def.methods[0].return_type, Some(Type::Int));
    }

    #[test]
    fn defer_block_and_single_statement() {
        let program = parse_source("Main() { defer { Print(1); } defer Print(2); }");
        let body = main_body(&program);
        assert!(matches!(body[0].kind, StmtKind::Defer(_)));
        let StmtKind::Defer(block) = &body[1].kind else {
            panic!("expected defer");
        };
        assert_eq!(block.statements.len(), 1);
    }

    #[test]
    fn elif_chain_nests_in_else_slot() {
        let program = parse_source(
            "Main() { if (a == 1) { } elif (a == 2) { } else { } }",
        );
        let body = main_body(&program);
        let StmtKind::If { else_block: Some(else_block), .. } = &body[0].kind else {
            panic!("expected if with else");
        };
        let StmtKind::If { else_block: Some(inner_else), .. } = &else_block.kind else {
            panic!("expected nested elif");
        };
        assert!(matches!(inner_else.kind, StmtKind::Block(_)));
    }

    #[test]
    fn for_loop_range() {
        let program = parse_source("Main() { for i in 0..9 { Print(i); } }");
        let body = main_body(&program);
        let StmtKind::For { var, .. } = &body[0].kind else {
            panic!("expected for");
        };
        assert_eq!(var, "i");
    }

    #[test]
    fn pointer_types_and_address_of() {
        let program = parse_source("Main() { var int x = 1; var *int p = &x; var int y = *p; }");
        let body = main_body(&program);
        let StmtKind::VarDecl { ty, value: Some(value), .. } = &body[1].kind else {
            panic!("expected var decl");
        };
        assert_eq!(ty, &Some(Type::Pointer(Box::new(Type::Int))));
        assert!(matches!(value.kind, ExprKind::AddressOf(_)));
        let StmtKind::VarDecl { value: Some(deref), .. } = &body[2].kind else {
            panic!("expected var decl");
        };
        assert!(matches!(deref.kind, ExprKind::Dereference(_)));
    }

    #[test]
    fn new_with_initializers() {
        let program = parse_source("struct P { var int x; }\nMain() { var P p = new P{x: 7}; }\n");
        let body = main_body(&program);
        let StmtKind::VarDecl { value: Some(value), .. } = &body[0].kind else {
            panic!("expected var decl");
        };
        let ExprKind::New { struct_name, initializers, .. } = &value.kind else {
            panic!("expected new expr");
        };
        assert_eq!(struct_name, "P");
        assert_eq!(initializers.len(), 1);
        assert_eq!(initializers[0].0, "x");
    }

    #[test]
    fn missing_semicolon_is_a_parse_error() {
        let err = parse_err("Main() { var int x = 1 }");
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn unexpected_token_reports_location() {
        let err = parse_err("Main() {\n  var int x = ;\n}");
        match err {
            CompileError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn assignment_to_call_is_rejected() {
        let err = parse_err("Main() { foo() = 3; }");
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn field_and_index_assignment_targets() {
        let program = parse_source("Main() { p.x = 1; a[0] = 2; }");
        let body = main_body(&program);
        let StmtKind::Assignment { target, .. } = &body[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(target.kind, ExprKind::FieldAccess { .. }));
        let StmtKind::Assignment { target, .. } = &body[1].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(target.kind, ExprKind::Index { .. }));
    }

    #[test]
    fn nodes_carry_positions() {
        let program = parse_source("Main() {\n  var int x = 5;\n}\n");
        let body = main_body(&program);
        assert_eq!(body[0].line, 2);
        let StmtKind::VarDecl { value: Some(value), .. } = &body[0].kind else {
            panic!("expected var decl");
        };
        assert_eq!(value.line, 2);
    }
}
