//! # VYL Compiler Executable
//!
//! The command-line interface of the VYL compiler. Parses user arguments
//! with `clap` and orchestrates the [`Compiler`] driver.

use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use std::process;
use target_lexicon::BinaryFormat;
use vylc::Compiler;

fn main() {
    let matches = Command::new("vylc")
        .version("0.1.0")
        .about("VYL compiler - lowers VYL source to x86-64 assembly")
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .help("VYL source file to compile"),
        )
        .arg(
            Arg::new("compile")
                .short('c')
                .long("compile")
                .value_name("FILE")
                .help("VYL source file to compile (alternative to the positional form)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("NAME")
                .help("Output file name"),
        )
        .arg(
            Arg::new("assembly")
                .short('S')
                .long("assembly")
                .action(ArgAction::SetTrue)
                .help("Generate assembly only (don't assemble/link)"),
        )
        .arg(
            Arg::new("mach")
                .long("mach")
                .action(ArgAction::SetTrue)
                .help("Produce a Mach-O object (macOS)"),
        )
        .arg(
            Arg::new("pe")
                .long("pe")
                .action(ArgAction::SetTrue)
                .help("Produce a PE/COFF object (Windows)"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Show step-by-step compilation progress"),
        )
        .get_matches();

    let input = matches
        .get_one::<String>("compile")
        .or_else(|| matches.get_one::<String>("input"));
    let Some(input) = input else {
        eprintln!("error: no input file specified; use -c <file> or pass the file directly");
        process::exit(1);
    };

    let mut compiler = Compiler::new(input);
    compiler.output = matches.get_one::<String>("output").map(PathBuf::from);
    compiler.assembly_only = matches.get_flag("assembly");
    compiler.verbose = matches.get_flag("verbose");
    if matches.get_flag("mach") {
        compiler.format = BinaryFormat::Macho;
    } else if matches.get_flag("pe") {
        compiler.format = BinaryFormat::Coff;
    }

    match compiler.build() {
        Ok(artifact) => {
            println!("Compiled {} -> {}", input, artifact.display());
        }
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}
