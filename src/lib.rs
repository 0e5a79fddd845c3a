//! `mython` library crate.
//!
//! Interpreter for Mython, a small indentation-structured object-oriented
//! language. High-level layout:
//! - frontend: `lexer` + `parser` produce the AST (`ast`), with class
//!   definitions materialized into runtime classes at parse time
//! - value model: `runtime`
//! - execution: `interpreter` (tree walk)

pub mod ast;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod runtime;

use std::fmt;

use thiserror::Error;

/// Any failure of the interpretation pipeline. The stage errors stay
/// downcastable through the variants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] lexer::LexError),
    #[error(transparent)]
    Parse(#[from] parser::ParseError),
    #[error(transparent)]
    Runtime(#[from] runtime::RuntimeError),
}

/// Tokenizes, parses and executes a Mython program, writing its printed
/// output to `output`. Output produced before a runtime failure is left in
/// the sink.
pub fn run_program(source: &str, output: &mut dyn fmt::Write) -> Result<(), Error> {
    let tokens = lexer::tokenize(source)?;
    let program = parser::parse_tokens(tokens)?;
    let mut context = runtime::Context::new(output);
    interpreter::run_with_context(&program, &mut context)?;
    Ok(())
}
