// rollscript interpreter library
//
// A small imperative language for randomized tabletop generation: dice
// rolls ("NdM"), keyed tables whose entries are evaluated lazily on lookup,
// and plain variables, conditionals and loops.

// Public modules
pub mod ast;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod value;

// Re-export commonly used items
pub use ast::{Expr, Program, Stmt};
pub use error::{ErrorKind, ScriptError, Span};
pub use evaluator::{Context, Evaluator};
pub use lexer::{Lexer, Position, Token, TokenKind};
pub use parser::Parser;
pub use value::Value;

// Re-export main functions
pub use repl::start as start_repl;
pub use runner::{run, run_file, RunOptions};
