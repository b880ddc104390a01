//! # Include Preprocessor
//!
//! Before lexing, lines of the form `include "relative/path"` or
//! `import "relative/path"` (optional trailing semicolon) are replaced by the
//! contents of the referenced file, recursively. Cycles are detected by
//! canonicalized path; a missing include or a cycle fails the build.

use crate::compiler::error::CompileError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Extracts the quoted path from an include/import directive line, if the
/// line is one. Anything after the closing quote other than whitespace and a
/// single `;` disqualifies the line.
fn include_path(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let rest = trimmed
        .strip_prefix("include")
        .or_else(|| trimmed.strip_prefix("import"))?;
    let rest = rest.strip_prefix(|c: char| c.is_whitespace())?.trim_start();
    let rest = rest.strip_prefix('"')?;
    let close = rest.find('"')?;
    let (path, tail) = rest.split_at(close);
    let tail = tail[1..].trim();
    if tail.is_empty() || tail == ";" {
        Some(path)
    } else {
        None
    }
}

/// Recursively inlines include/import directives relative to `base_dir`.
///
/// Running the preprocessor on a source already devoid of include lines
/// yields identical output, so the pass is idempotent.
pub fn preprocess_includes(
    source: &str,
    base_dir: &Path,
    seen: &mut HashSet<PathBuf>,
) -> Result<String, CompileError> {
    let mut result: Vec<String> = Vec::new();

    for line in source.lines() {
        let Some(rel_path) = include_path(line) else {
            result.push(line.to_string());
            continue;
        };

        let joined = base_dir.join(rel_path);
        let canonical = joined.canonicalize().map_err(|_| {
            CompileError::include(format!("Include not found: {}", joined.display()))
        })?;
        if !seen.insert(canonical.clone()) {
            return Err(CompileError::include(format!(
                "Cyclic include detected at {}",
                canonical.display()
            )));
        }

        let included = std::fs::read_to_string(&canonical)?;
        let parent = canonical.parent().unwrap_or(base_dir).to_path_buf();
        result.push(format!("// begin include {}", rel_path));
        result.push(preprocess_includes(&included, &parent, seen)?);
        result.push(format!("// end include {}", rel_path));
    }

    Ok(result.join("\n") + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn plain_source_passes_through() {
        let src = "Main() {\n  Print(1);\n}\n";
        let out = preprocess_includes(src, Path::new("."), &mut HashSet::new()).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn preprocessing_is_idempotent() {
        let src = "var int x = 1;\nMain() { Print(x); }\n";
        let once = preprocess_includes(src, Path::new("."), &mut HashSet::new()).unwrap();
        let twice = preprocess_includes(&once, Path::new("."), &mut HashSet::new()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn include_line_is_replaced_by_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib.vyl");
        let mut f = std::fs::File::create(&lib).unwrap();
        writeln!(f, "var int z = 5;").unwrap();

        let src = "include \"lib.vyl\"\nMain() { Print(z); }\n";
        let out = preprocess_includes(src, dir.path(), &mut HashSet::new()).unwrap();
        assert!(out.contains("var int z = 5;"));
        assert!(out.contains("// begin include lib.vyl"));
        assert!(!out.contains("include \"lib.vyl\""));
    }

    #[test]
    fn import_with_semicolon_also_inlines() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("util.vyl"), "var int u = 9;\n").unwrap();
        let out = preprocess_includes(
            "import \"util.vyl\";\nMain() { Print(u); }\n",
            dir.path(),
            &mut HashSet::new(),
        )
        .unwrap();
        assert!(out.contains("var int u = 9;"));
    }

    #[test]
    fn missing_include_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = preprocess_includes(
            "include \"nope.vyl\"\nMain() {}\n",
            dir.path(),
            &mut HashSet::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Include { .. }));
    }

    #[test]
    fn cyclic_include_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.vyl"), "include \"b.vyl\"\n").unwrap();
        std::fs::write(dir.path().join("b.vyl"), "include \"a.vyl\"\n").unwrap();
        let err = preprocess_includes(
            "include \"a.vyl\"\nMain() {}\n",
            dir.path(),
            &mut HashSet::new(),
        )
        .unwrap_err();
        match err {
            CompileError::Include { message } => assert!(message.contains("Cyclic include")),
            other => panic!("expected include error, got {:?}", other),
        }
    }

    #[test]
    fn lines_mentioning_include_mid_statement_are_untouched() {
        let src = "var string s = \"include \\\"x\\\"\";\n";
        let out = preprocess_includes(src, Path::new("."), &mut HashSet::new()).unwrap();
        assert_eq!(out, src);
    }
}
