//! A tree-walking interpreter for the Monkey language.
//!
//! Source text flows through [`scanner::Scanner`] into [`parser::parse`], and the
//! resulting [`ast::Program`] is evaluated by an [`interpreter::Interpreter`].

pub mod ast;
pub mod interpreter;
pub mod parser;
pub mod reporter;
pub mod scanner;

pub use interpreter::{Interpreter, RuntimeError, Value};
pub use parser::{parse, ParseError, SyntaxErrors};
pub use scanner::Scanner;
