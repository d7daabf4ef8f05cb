//! Command implementations for the Quill CLI.

use std::fs;
use std::path::Path;

use crate::frontend::diagnostics::report_all;
use crate::frontend::lexer::Lexer;
use crate::frontend::parser::Parser;
use crate::frontend::typechecker::TypeChecker;

use super::{CliError, CliResult, ExitStatus};

fn read_source(path: &Path) -> CliResult<String> {
    fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// `quill lex FILE`: dump the token stream, one token per line.
pub fn lex_file(path: &Path) -> CliResult<ExitStatus> {
    let source = read_source(path)?;
    let filename = path.display().to_string();

    let mut lexer = Lexer::new(&source, filename.as_str());
    let tokens = lexer.tokenize_all();

    for token in &tokens {
        println!(
            "{}:{} {:?} '{}'",
            token.location.line, token.location.column, token.kind, token.lexeme
        );
    }

    if lexer.has_errors() {
        report_all(&filename, lexer.errors());
        return Ok(ExitStatus::HadErrors);
    }
    println!("{} tokens", tokens.len());
    Ok(ExitStatus::Success)
}

/// `quill parse FILE`: parse and report declarations by kind.
pub fn parse_file(path: &Path) -> CliResult<ExitStatus> {
    let source = read_source(path)?;
    let filename = path.display().to_string();

    let lexer = Lexer::new(&source, filename.as_str());
    let mut parser = Parser::new(lexer);
    let program = parser.parse();

    if !parser.lex_errors().is_empty() || parser.has_errors() {
        report_all(&filename, parser.lex_errors());
        report_all(&filename, parser.errors());
        return Ok(ExitStatus::HadErrors);
    }

    println!("Declarations: {}", program.declarations.len());
    for (index, decl) in program.declarations.iter().enumerate() {
        println!("  [{}] {} {}", index, decl.node.kind_name(), decl_name(&decl.node));
    }
    Ok(ExitStatus::Success)
}

/// `quill check FILE`: full front-end pipeline.
pub fn check_file(path: &Path) -> CliResult<ExitStatus> {
    let source = read_source(path)?;
    let filename = path.display().to_string();
    check_source(&source, &filename)
}

/// Run the `Lexer -> Parser -> TypeChecker` pipeline over in-memory source,
/// reporting diagnostics to stderr. Shared by `check` and the REPL.
pub fn check_source(source: &str, filename: &str) -> CliResult<ExitStatus> {
    let lexer = Lexer::new(source, filename);
    let mut parser = Parser::new(lexer);
    let program = parser.parse();

    if !parser.lex_errors().is_empty() || parser.has_errors() {
        report_all(filename, parser.lex_errors());
        report_all(filename, parser.errors());
        return Ok(ExitStatus::HadErrors);
    }

    let mut checker = TypeChecker::new();
    checker.check(&program);

    if checker.has_errors() {
        report_all(filename, checker.errors());
        return Ok(ExitStatus::HadErrors);
    }

    Ok(ExitStatus::Success)
}

fn decl_name(decl: &crate::frontend::ast::Decl) -> String {
    use crate::frontend::ast::Decl;
    match decl {
        Decl::Function(f) => format!("{}({} params)", f.name, f.params.len()),
        Decl::Struct(s) => s.name.clone(),
        Decl::Class(c) => c.name.clone(),
        Decl::Trait(t) => t.name.clone(),
        Decl::Impl(i) => match &i.trait_name {
            Some(trait_name) => format!("{} for {}", trait_name, i.type_name),
            None => i.type_name.clone(),
        },
        Decl::Enum(e) => e.name.clone(),
        Decl::TypeAlias(a) => a.name.clone(),
        Decl::Import(i) => i.module_path.clone(),
    }
}
