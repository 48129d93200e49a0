//! Internal representation of MiniPar programs.
//!
//! The AST is created by the parser and shared read-only with the semantic
//! pass, both code generators, and the interpreter; nothing mutates it after
//! parsing.
mod expression;
mod source;
mod statement;
mod tree;

pub use self::expression::*;
pub use self::source::to_source;
pub use self::statement::*;
pub use self::tree::format_tree;
