//! Template source parsing
//!
//! [`lexer`] splits the source into text, variable, block and comment tokens,
//! [`compiler`] walks the tokens and dispatches block tags to their compile
//! functions, and the chumsky grammar handles tag arguments and filter
//! expressions.

pub mod ast;
pub mod compiler;
pub(crate) mod grammar;
pub mod lexer;

pub use ast::{Node, NodeList};
pub use compiler::{CompileContext, Parser, TagToken};
