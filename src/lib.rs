//! # pyrecover
//!
//! Recovers Python 2.0 source text from compiled code objects.
//!
//! The pipeline per code object: decode the instruction buffer into tokens,
//! extend the base grammar with rules for the arities seen, parse with an
//! Earley parser, rewrite compiler idioms back into source constructs, then
//! walk the tree through format templates. Nested functions, lambdas and
//! classes go through the same pipeline recursively.

pub mod bytecode;
pub mod codegen;
pub mod config;
pub mod decompiler;
pub mod error;
pub mod frontend;
pub mod grammar;
pub mod lang;
pub mod parser;
pub mod parser_error;
pub mod rewrite;

pub use self::config::{Config, Loader};
pub use decompiler::{Decompiler, ScopeText, decompile};
pub use error::{Error, Result};
