use std::collections::{HashMap, HashSet};
use std::mem;
use std::path::PathBuf;

use serde_json::Value;

use crate::ast::{Node, Position};
use crate::blocks::{BlockBody, BlockKey, BlockMap};
use crate::error::{CompileError, Location, Result};
use crate::extension::{Callable, Extension};
use crate::options::CompilerOptions;
use crate::parser::{JsonParser, TemplateParser};
use crate::state::CompileState;

/// Source id used for templates compiled from memory.
pub const EVAL_SOURCE_ID: &str = "eval code";

/// Output of one compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum Compiled {
    Code(String),
    /// Extends-mode output: named blocks and the code between them.
    Blocks(BlockMap),
}

impl Compiled {
    pub fn as_code(&self) -> Option<&str> {
        match self {
            Compiled::Code(code) => Some(code),
            Compiled::Blocks(_) => None,
        }
    }

    pub fn into_code(self) -> Option<String> {
        match self {
            Compiled::Code(code) => Some(code),
            Compiled::Blocks(_) => None,
        }
    }

    pub fn into_blocks(self) -> Option<BlockMap> {
        match self {
            Compiled::Blocks(blocks) => Some(blocks),
            Compiled::Code(_) => None,
        }
    }
}

/// Result of a cache-aware compile.
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    pub compiled_path: PathBuf,
    pub output: Compiled,
    /// False when the output was loaded from an up-to-date compiled file.
    pub recompiled: bool,
}

/// Template compiler.
///
/// Holds the configuration and registries shared by every compilation. Each
/// compile call, and each template pulled in through `extends` or a static
/// `include`, runs in its own [`Generator`] with fresh state, so nested
/// compiles never touch the caller's counters, blocks or macros.
pub struct Compiler {
    pub(crate) options: CompilerOptions,
    parser: Box<dyn TemplateParser>,
    pub(crate) extensions: Vec<Box<dyn Extension>>,
    pub(crate) functions: HashMap<String, Callable>,
    pub(crate) filters: HashMap<String, Callable>,
    pub(crate) services: HashSet<String>,
    prefix_generator: Option<Box<dyn Fn(&str) -> String>>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_parser(JsonParser)
    }

    pub fn with_parser(parser: impl TemplateParser + 'static) -> Self {
        Self {
            options: CompilerOptions::default(),
            parser: Box::new(parser),
            extensions: Vec::new(),
            functions: HashMap::new(),
            filters: HashMap::new(),
            services: HashSet::new(),
            prefix_generator: None,
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut CompilerOptions {
        &mut self.options
    }

    pub fn set_options(&mut self, options: CompilerOptions) {
        self.options = options;
    }

    /// Set one option by name, validating the value's type.
    pub fn set_option(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.options.set(name, value.into())
    }

    pub fn add_extension(&mut self, extension: impl Extension + 'static) -> &mut Self {
        self.extensions.push(Box::new(extension));
        self
    }

    pub fn add_function(&mut self, name: impl Into<String>, definition: Callable) -> &mut Self {
        self.functions.insert(name.into(), definition);
        self
    }

    pub fn add_filter(&mut self, name: impl Into<String>, definition: Callable) -> &mut Self {
        self.filters.insert(name.into(), definition);
        self
    }

    /// Identifiers with this name compile to a service lookup on the view
    /// instead of a local variable.
    pub fn add_service(&mut self, name: impl Into<String>) -> &mut Self {
        self.services.insert(name.into());
        self
    }

    /// Replace the default path-derived prefix of generated loop variables.
    /// The generator receives the path of the template being compiled.
    pub fn set_unique_prefix(&mut self, generator: impl Fn(&str) -> String + 'static) -> &mut Self {
        self.prefix_generator = Some(Box::new(generator));
        self
    }

    /// Compile an in-memory template to code, without touching the cache.
    pub fn compile_string(&self, source: &str) -> Result<String> {
        let template = self.parser.parse(source, EVAL_SOURCE_ID)?;
        Generator::new(self, EVAL_SOURCE_ID).run(&template)
    }

    /// Compile template source. In extends mode the result is the block map
    /// a child template merges against.
    pub fn compile_source(&self, source: &str, source_id: &str, extends_mode: bool) -> Result<Compiled> {
        let template = self.parser.parse(source, source_id)?;
        let mut generator = Generator::new(self, source_id);
        if extends_mode {
            generator.run_extends(&template).map(Compiled::Blocks)
        } else {
            generator.run(&template).map(Compiled::Code)
        }
    }

    /// Resolve an `extends`/`include` target against the views directories.
    pub(crate) fn resolve_view_path(&self, path: &str) -> PathBuf {
        let dirs = &self.options.views_dirs;
        if let Some(found) = dirs.iter().map(|dir| dir.join(path)).find(|candidate| candidate.exists()) {
            return found;
        }
        match dirs.last() {
            Some(dir) => dir.join(path),
            None => PathBuf::from(path),
        }
    }

    fn derive_prefix(&self, path: &str) -> String {
        match &self.prefix_generator {
            Some(generator) => generator(path),
            None => unique_path_key(path),
        }
    }
}

/// `v` followed by the DJBX33A hash of the path.
fn unique_path_key(path: &str) -> String {
    let hash = path
        .bytes()
        .fold(5381u64, |hash, byte| hash.wrapping_mul(33).wrapping_add(u64::from(byte)));
    format!("v{}", hash)
}

fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Code generator for one template.
pub(crate) struct Generator<'c> {
    pub(crate) compiler: &'c Compiler,
    pub(crate) state: CompileState,
    current_path: String,
    /// Position of the statement being compiled.
    pub(crate) pos: Position,
}

impl<'c> Generator<'c> {
    pub(crate) fn new(compiler: &'c Compiler, current_path: &str) -> Self {
        Self {
            compiler,
            state: CompileState::new(compiler.options.autoescape),
            current_path: current_path.to_string(),
            pos: Position::default(),
        }
    }

    pub(crate) fn location(&self) -> Location {
        Location::of(&self.pos, &self.current_path)
    }

    /// Unwrap a field the statement can't be compiled without.
    pub(crate) fn required<'a, T>(&self, value: Option<&'a T>, field: &'static str) -> Result<&'a T> {
        value.ok_or_else(|| CompileError::CorruptStatement {
            field,
            location: self.location(),
        })
    }

    /// Prefix for generated temporaries, stable for this template.
    pub(crate) fn unique_prefix(&mut self) -> Result<String> {
        if let Some(prefix) = &self.state.unique_prefix {
            return Ok(prefix.clone());
        }
        let prefix = self.compiler.derive_prefix(&self.current_path);
        if !is_valid_prefix(&prefix) {
            return Err(CompileError::InvalidPrefix);
        }
        self.state.unique_prefix = Some(prefix.clone());
        Ok(prefix)
    }

    pub(crate) fn run(&mut self, template: &[Node]) -> Result<String> {
        let compilation = self.compile_list(template, false)?;
        let code = if self.state.extended {
            self.merge_extended()?
                .into_iter()
                .map(|(_, code)| code)
                .collect()
        } else {
            compilation
        };
        debug_assert!(self.state.is_balanced(), "unbalanced nesting counters");
        Ok(code)
    }

    pub(crate) fn run_extends(&mut self, template: &[Node]) -> Result<BlockMap> {
        self.compile_list(template, true)?;
        let blocks = if self.state.extended {
            let mut blocks = BlockMap::new();
            for (key, code) in self.merge_extended()? {
                match key {
                    BlockKey::Name(name) => blocks.insert_named(name, BlockBody::Code(code)),
                    BlockKey::Position(_) => blocks.push_code(code),
                }
            }
            blocks
        } else {
            mem::take(&mut self.state.blocks)
        };
        debug_assert!(self.state.is_balanced(), "unbalanced nesting counters");
        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_path_key_is_deterministic() {
        assert_eq!(unique_path_key(""), "v5381");
        assert_eq!(unique_path_key("a"), format!("v{}", 5381u64 * 33 + 97));
        assert_eq!(unique_path_key("views/index.volt"), unique_path_key("views/index.volt"));
        assert_ne!(unique_path_key("views/a.volt"), unique_path_key("views/b.volt"));
    }

    #[test]
    fn prefixes_must_form_variable_names() {
        assert!(is_valid_prefix("v123"));
        assert!(is_valid_prefix("_tpl"));
        assert!(!is_valid_prefix(""));
        assert!(!is_valid_prefix("1abc"));
        assert!(!is_valid_prefix("a-b"));
    }

    #[test]
    fn custom_prefix_generator_receives_template_path() {
        let mut compiler = Compiler::new();
        compiler.set_unique_prefix(|path| format!("t_{}", path.len()));
        let mut generator = Generator::new(&compiler, "abc");
        assert_eq!(generator.unique_prefix().unwrap(), "t_3");
    }

    #[test]
    fn invalid_generated_prefix_is_an_error() {
        let mut compiler = Compiler::new();
        compiler.set_unique_prefix(|_| "9lives".to_string());
        let mut generator = Generator::new(&compiler, "abc");
        assert!(matches!(generator.unique_prefix(), Err(CompileError::InvalidPrefix)));
    }

    #[test]
    fn views_dirs_resolution_falls_back_to_last_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut compiler = Compiler::new();
        compiler.options_mut().views_dirs = vec![PathBuf::from("/nonexistent/a"), dir.path().to_path_buf()];
        assert_eq!(compiler.resolve_view_path("x.volt"), dir.path().join("x.volt"));

        std::fs::write(dir.path().join("y.volt"), "[]").unwrap();
        assert_eq!(compiler.resolve_view_path("y.volt"), dir.path().join("y.volt"));
    }
}
