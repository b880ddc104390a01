//! End-to-end pipeline tests: full compilations through the library entry
//! point, error surfacing per phase, and the `Compiler` driver writing
//! artifacts through the include preprocessor.

use std::path::Path;
use vylc::{Compiler, CompileError, compile};

#[test]
fn well_formed_program_compiles_to_assembly() {
    let source = r#"
struct Point {
    var int x;
    var int y;
    sum() -> int { return self.x + self.y; }
}

enum Status { OK, Err = 100 }

Function scale(p: Point, by: int = 2) -> int {
    return p.sum() * by;
}

Main() {
    var Point p = new Point{x: 3, y: 4};
    var int s = scale(p);
    Print(s);
    Print(Status.Err);
}
"#;
    let asm = compile(source).unwrap();
    assert!(asm.contains("Point_sum:"));
    assert!(asm.contains("scale:"));
    assert!(asm.contains("call Main"));
}

#[test]
fn pipeline_is_deterministic() {
    let source = "Main() { var int[] a = [1, 2, 3]; Print(a[2] + Len(a)); }";
    let first = compile(source).unwrap();
    let second = compile(source).unwrap();
    assert_eq!(first, second);
}

#[test]
fn each_phase_reports_its_own_error_kind() {
    // Lex: unterminated string.
    assert!(matches!(
        compile("Main() { var string s = \"oops; }").unwrap_err(),
        CompileError::Lex { .. }
    ));
    // Parse: missing semicolon.
    assert!(matches!(
        compile("Main() { var int x = 1 }").unwrap_err(),
        CompileError::Parse { .. }
    ));
    // Resolve: undeclared identifier.
    assert!(matches!(
        compile("Main() { Print(ghost); }").unwrap_err(),
        CompileError::Resolve { .. }
    ));
    // Type: operator mismatch.
    assert!(matches!(
        compile("Main() { var int x = 1 + true; }").unwrap_err(),
        CompileError::Type { .. }
    ));
}

#[test]
fn errors_point_at_the_offending_line() {
    let source = "Main() {\n  var int ok = 1;\n  Print(missing);\n}\n";
    match compile(source).unwrap_err() {
        CompileError::Resolve { line, .. } => assert_eq!(line, 3),
        other => panic!("expected resolve error, got {:?}", other),
    }
}

#[test]
fn immutable_binding_rejected_across_the_pipeline() {
    let err = compile("Main() { let limit = 10; limit = 11; }").unwrap_err();
    assert!(matches!(err, CompileError::Resolve { .. }));
}

#[test]
fn default_arity_window_is_enforced_end_to_end() {
    let define = "f(a: int, b: int = 2, c: int = 3) -> int { return a + b + c; }\n";
    for ok in ["f(1)", "f(1, 9)", "f(1, 9, 9)"] {
        compile(&format!("{}Main() {{ Print({}); }}", define, ok)).unwrap();
    }
    for bad in ["f()", "f(1, 2, 3, 4)"] {
        assert!(matches!(
            compile(&format!("{}Main() {{ Print({}); }}", define, bad)).unwrap_err(),
            CompileError::Type { .. }
        ));
    }
}

#[test]
fn driver_writes_assembly_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("program.vyl");
    std::fs::write(&src, "Main() { Print(41 + 1); }\n").unwrap();

    let mut compiler = Compiler::new(&src);
    compiler.output = Some(dir.path().join("program"));
    compiler.assembly_only = true;
    let artifact = compiler.build().unwrap();

    assert_eq!(artifact, dir.path().join("program.s"));
    let asm = std::fs::read_to_string(&artifact).unwrap();
    assert!(asm.contains(".globl main"));
    assert!(asm.contains("Main:"));
}

#[test]
fn driver_resolves_includes_relative_to_the_source() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("lib.vyl"), "var int z = 5;\n").unwrap();
    let src = dir.path().join("main.vyl");
    std::fs::write(&src, "include \"lib.vyl\"\nMain() { Print(z); }\n").unwrap();

    let mut compiler = Compiler::new(&src);
    compiler.output = Some(dir.path().join("out"));
    compiler.assembly_only = true;
    let artifact = compiler.build().unwrap();
    let asm = std::fs::read_to_string(artifact).unwrap();
    assert!(asm.contains("z: .quad 5"));
}

#[test]
fn driver_produces_no_artifact_on_failure() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("broken.vyl");
    std::fs::write(&src, "var int x = 1;\n").unwrap(); // no Main

    let mut compiler = Compiler::new(&src);
    compiler.output = Some(dir.path().join("broken"));
    compiler.assembly_only = true;
    assert!(compiler.build().is_err());
    assert!(!dir.path().join("broken.s").exists());
}

#[test]
fn missing_source_file_is_reported() {
    let compiler = Compiler::new(Path::new("/nonexistent/never.vyl"));
    assert!(matches!(
        compiler.build().unwrap_err(),
        CompileError::NoSourceFile
    ));
}

#[test]
fn runtime_library_rides_along_with_every_program() {
    let asm = compile("Main() { Print(SHA256(\"x\")); }").unwrap();
    for helper in [
        "vyl_sha256:",
        "vyl_collect:",
        "vyl_tcp_connect:",
        "vyl_tls_connect:",
        "vyl_http_get:",
        "vyl_input:",
        "vyl_bounds_fail:",
    ] {
        assert!(asm.contains(helper), "missing runtime helper {}", helper);
    }
    // The C runtime and OpenSSL stay undefined externals.
    assert!(asm.contains("call SHA256"));
    assert!(asm.contains("call printf"));
}

#[test]
fn networking_builtins_lower_to_runtime_helpers() {
    let source = r#"
Main() {
    var int fd = TcpConnect("example.com", 80);
    TcpSend(fd, "ping");
    var string reply = TcpRecv(fd, 512);
    TcpClose(fd);
    var string body = HttpGet("example.com", "/", 80);
    Print(reply + body);
}
"#;
    let asm = compile(source).unwrap();
    for call in [
        "call vyl_tcp_connect",
        "call vyl_tcp_send",
        "call vyl_tcp_recv",
        "call vyl_tcp_close",
        "call vyl_http_get",
    ] {
        assert!(asm.contains(call), "missing {}", call);
    }
}

#[test]
fn generic_struct_usage_fails_resolution_but_definition_passes() {
    compile("struct List<T> { var int length; }\nMain() { Print(1); }").unwrap();
    assert!(matches!(
        compile("struct List<T> { var int length; }\nMain() { var x = new List{}; }")
            .unwrap_err(),
        CompileError::Resolve { .. }
    ));
}
