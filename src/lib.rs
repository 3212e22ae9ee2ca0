//! Crate root: wires together the compilation pipeline.
//!
//! Each stage runs once, start to finish, before the next begins:
//! - `tokenizer` performs lexical analysis; it never fails, turning stray
//!   characters into error tokens for the parser to trip over.
//! - `parser` owns all syntactic knowledge, including the grammar's two
//!   backtracking points, and returns the program AST.
//! - `analyzer` checks static well-formedness against its own scope stack.
//! - `codegen` lowers the validated AST to MIPS assembly text, with a
//!   second scope stack carrying frame offsets.
//! - `error` centralises the diagnostics shared by the other stages, and
//!   `visit` the traversal order shared by the two back-end passes.

pub mod analyzer;
pub mod ast;
pub mod codegen;
pub mod error;
pub mod parser;
pub mod symtab;
pub mod tokenizer;
pub mod ty;
pub mod visit;

pub use error::{CompileError, CompileResult};

/// Compile C-- source into MIPS assembly.
pub fn compile(source: &str) -> CompileResult<String> {
  let tokens = tokenizer::tokenize(source);
  let program = parser::parse(tokens, source)?;
  analyzer::analyze(&program)?;
  codegen::generate(&program)
}
