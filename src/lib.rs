//! shimmyvolt: compiler from Volt-style template trees to PHP view code.
//!
//! This crate does one job: take an already parsed template (a tree of
//! statement and expression nodes) and generate the PHP source a view
//! runtime executes. It never renders anything itself.
//!
//! Supported subset:
//! - Text, `{{ expr }}` echoes with optional autoescaping.
//! - `if`/`elseif`/`else`, `switch`/`case`/`default`, `for` with optional
//!   key, guard and `elsefor`, `set`, `do`, `return`, `break`, `continue`.
//! - `loop.*` metadata, generated only for loops that use it.
//! - `extends`/`block` inheritance with `super()`, any depth.
//! - Static and dynamic `include`, macros, the fragment `cache` statement.
//! - Filters, tests (`is`, `is not`), built-in functions and tag helpers.
//! - User functions, filters and [`Extension`] hooks.
//!
//! Not supported:
//! - Tokenizing template text. The default parser reads the node tree as
//!   JSON; plug in another one with [`Compiler::with_parser`].
//! - Executing the generated code.
//!
//! Compiled output is cached on disk (see [`Compiler::compile`]).

pub mod ast;
pub mod blocks;
mod cache;
mod compiler;
pub mod error;
pub mod extension;
mod expression;
mod filters;
mod functions;
mod inherit;
mod loops;
mod macros;
pub mod options;
pub mod parser;
mod state;
mod statement;

pub use ast::{Argument, Expr, Node, NodeKind, Position, Template};
pub use blocks::{BlockBody, BlockKey, BlockMap};
pub use compiler::{Compilation, Compiled, Compiler, EVAL_SOURCE_ID};
pub use error::{CompileError, Location, Result};
pub use extension::{Callable, CodeGenFn, Extension};
pub use options::{CachePath, CompilerOptions, PathResolver};
pub use parser::{JsonParser, TemplateParser};

/// Compile a JSON node tree with default options.
///
/// Shorthand for `Compiler::new().compile_string(source)`.
pub fn compile_string(source: &str) -> Result<String> {
    Compiler::new().compile_string(source)
}
