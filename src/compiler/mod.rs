//! # Compiler Driver
//!
//! Aggregates the compilation phases and defines the [`Compiler`] struct
//! that orchestrates a build: include preprocessing, lexing, parsing,
//! resolution, type checking, code generation, and invocation of the
//! external assembler/linker toolchain for the selected object format.

pub mod error;
pub mod lexer;
pub mod parser;
pub mod preprocessor;
pub mod resolver;
pub mod type_checker;

pub use lexer::tokenize;
pub use parser::parse;
pub use resolver::resolve;
pub use type_checker::type_check;

use crate::codegen::generate_assembly;
use crate::debug;
use error::CompileError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use target_lexicon::BinaryFormat;

/// The central structure that manages compiling a VYL source file into an
/// assembly file, object file, or linked executable.
pub struct Compiler {
    /// The `.vyl` source file to compile.
    pub source_path: PathBuf,
    /// Output base name; defaults to the input stem.
    pub output: Option<PathBuf>,
    /// Stop after writing the `.s` file.
    pub assembly_only: bool,
    /// Object format of the final artifact. ELF links a full executable;
    /// Mach-O and COFF stop at an object file.
    pub format: BinaryFormat,
    /// Print phase progress while building.
    pub verbose: bool,
}

impl Compiler {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            output: None,
            assembly_only: false,
            format: BinaryFormat::Elf,
            verbose: false,
        }
    }

    /// Runs the full pipeline and produces the requested artifact. Returns
    /// the path of the artifact written. No output file is produced when
    /// any phase fails.
    pub fn build(&self) -> Result<PathBuf, CompileError> {
        if !self.source_path.is_file() {
            return Err(CompileError::NoSourceFile);
        }

        let source = std::fs::read_to_string(&self.source_path)?;
        let base_dir = self
            .source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        self.log("Resolving includes...");
        let expanded =
            preprocessor::preprocess_includes(&source, &base_dir, &mut HashSet::new())?;

        let assembly = self.compile_source(&expanded)?;

        if self.assembly_only {
            let asm_path = self.output_base().with_extension("s");
            std::fs::write(&asm_path, &assembly)?;
            self.log(&format!("Assembly written to {}", asm_path.display()));
            return Ok(asm_path);
        }

        let out_path = self.artifact_path();
        let asm_path = out_path.with_extension("s");
        std::fs::write(&asm_path, &assembly)?;
        self.assemble_and_link(&asm_path, &out_path)?;
        if !out_path.exists() {
            return Err(CompileError::BinaryNotFound);
        }
        // The intermediate assembly is only kept when asked for with -S.
        let _ = std::fs::remove_file(&asm_path);
        Ok(out_path)
    }

    /// The front half of the pipeline: text in, assembly text out.
    pub fn compile_source(&self, source: &str) -> Result<String, CompileError> {
        let timer = debug::PerfTimer::new("compile");

        self.log("Tokenizing...");
        let tokens = tokenize(source)?;
        debug::dump_tokens(&tokens);

        self.log("Parsing...");
        let program = parse(tokens)?;
        debug::dump_ast(&program);

        self.log("Resolving symbols...");
        resolve(&program)?;

        self.log("Type checking...");
        type_check(&program)?;

        self.log("Generating assembly...");
        let assembly = generate_assembly(&program)?;

        timer.finish();
        Ok(assembly)
    }

    /// Builds and then runs the produced executable, returning its exit
    /// status. Only meaningful for the ELF target.
    pub fn run(&self) -> Result<std::process::ExitStatus, CompileError> {
        let binary = self.build()?;
        Command::new(&binary)
            .status()
            .map_err(CompileError::ExecutionError)
    }

    fn output_base(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let stem = self
                .source_path
                .file_stem()
                .map(|s| s.to_os_string())
                .unwrap_or_else(|| "a".into());
            PathBuf::from(stem)
        })
    }

    /// The final artifact path for the selected format: `.vylo` executable
    /// for ELF, `.o` / `.obj` objects for Mach-O / COFF.
    fn artifact_path(&self) -> PathBuf {
        let base = self.output_base();
        if self.output.is_some() {
            return base;
        }
        match self.format {
            BinaryFormat::Macho => base.with_extension("o"),
            BinaryFormat::Coff => base.with_extension("obj"),
            _ => base.with_extension("vylo"),
        }
    }

    /// Invokes the external toolchain for the selected object format.
    fn assemble_and_link(&self, asm_path: &Path, out_path: &Path) -> Result<(), CompileError> {
        let mut command = match self.format {
            BinaryFormat::Macho => {
                let mut cmd = Command::new("clang");
                cmd.args(["-target", "x86_64-apple-darwin", "-c"])
                    .arg(asm_path)
                    .arg("-o")
                    .arg(out_path);
                cmd
            }
            BinaryFormat::Coff => {
                let mut cmd = Command::new("x86_64-w64-mingw32-gcc");
                cmd.arg("-c").arg(asm_path).arg("-o").arg(out_path);
                cmd
            }
            _ => {
                let mut cmd = Command::new("gcc");
                cmd.arg("-no-pie")
                    .arg(asm_path)
                    .arg("-o")
                    .arg(out_path)
                    .args(["-lssl", "-lcrypto"]);
                cmd
            }
        };

        self.log(&format!("Running {:?}", command));
        let status = command.status().map_err(CompileError::ExecutionError)?;
        if status.success() {
            Ok(())
        } else {
            Err(CompileError::ExecutionFailed(status))
        }
    }

    fn log(&self, message: &str) {
        if self.verbose {
            println!("{}", message);
        }
    }
}
