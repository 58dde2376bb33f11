//! Compile-time hooks and user-registered functions/filters.

use std::fmt;

use crate::ast::{Argument, Expr, Node};
use crate::error::Result;

/// A pluggable override consulted before built-in handling.
///
/// Extensions are tried in registration order; the first hook returning a
/// non-empty string wins. Every hook defaults to "not handled".
pub trait Extension {
    fn resolve_expression(&self, _expr: &Expr) -> Option<String> {
        None
    }

    /// `arguments` is the compiled argument list, `raw` the argument nodes.
    fn compile_function(&self, _name: &str, _arguments: &str, _raw: &[Argument]) -> Option<String> {
        None
    }

    fn compile_filter(&self, _name: &str, _arguments: &str, _raw: &[Argument]) -> Option<String> {
        None
    }

    fn compile_statement(&self, _node: &Node) -> Option<String> {
        None
    }
}

/// Generates code for a user function or filter at compile time from the
/// compiled argument list and the raw argument nodes.
pub type CodeGenFn = Box<dyn Fn(&str, &[Argument]) -> Result<String>>;

/// Definition of a user function or filter.
pub enum Callable {
    /// Host function name; compiles to `name(arguments)`.
    Name(String),
    Generator(CodeGenFn),
}

impl Callable {
    pub fn name(name: impl Into<String>) -> Self {
        Callable::Name(name.into())
    }

    pub fn generator(f: impl Fn(&str, &[Argument]) -> Result<String> + 'static) -> Self {
        Callable::Generator(Box::new(f))
    }

    pub(crate) fn expand(&self, arguments: &str, raw: &[Argument]) -> Result<String> {
        match self {
            Callable::Name(name) => Ok(format!("{}({})", name, arguments)),
            Callable::Generator(f) => f(arguments, raw),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Callable::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// Run `hook` over the extensions in order, returning the first usable code.
pub(crate) fn first_handled<'e>(
    extensions: impl IntoIterator<Item = &'e Box<dyn Extension>>,
    hook: impl Fn(&dyn Extension) -> Option<String>,
) -> Option<String> {
    extensions
        .into_iter()
        .find_map(|ext| hook(ext.as_ref()).filter(|code| !code.is_empty()))
}
