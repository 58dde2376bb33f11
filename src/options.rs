//! Compiler options.
//!
//! Options can be set through the typed fields of [`CompilerOptions`] or by
//! name with loosely typed values (as they come from a configuration file)
//! through [`CompilerOptions::set`], which validates the value type.

use std::fmt;
use std::path::PathBuf;

use serde_json::Value;
use tracing::warn;

use crate::error::{CompileError, Result};

/// Computes the full compiled path for `(template_path, options, extends_mode)`.
/// Returning `None` is a compile error.
pub type PathResolver = Box<dyn Fn(&str, &CompilerOptions, bool) -> Option<String>>;

/// Where compiled templates are written.
pub enum CachePath {
    /// Directory (or any prefix) the cache file name is appended to.
    Root(String),
    Resolver(PathResolver),
}

impl fmt::Debug for CachePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachePath::Root(root) => f.debug_tuple("Root").field(root).finish(),
            CachePath::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

#[derive(Debug)]
pub struct CompilerOptions {
    /// Recompile on every call, ignoring the cache. Development only.
    pub always: bool,
    pub prefix: String,
    pub path: Option<CachePath>,
    pub separator: String,
    pub extension: String,
    /// When false an existing compiled file is trusted without an mtime check.
    pub stat: bool,
    pub autoescape: bool,
    /// Directories searched for `extends`/`include` targets, in order.
    pub views_dirs: Vec<PathBuf>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            always: false,
            prefix: String::new(),
            path: None,
            separator: "%%".to_string(),
            extension: ".php".to_string(),
            stat: true,
            autoescape: false,
            views_dirs: Vec::new(),
        }
    }
}

impl CompilerOptions {
    /// Build options from a JSON object, validating every recognized key.
    pub fn from_value(value: &Value) -> Result<Self> {
        let mut options = Self::default();
        if let Some(map) = value.as_object() {
            for (name, value) in map {
                options.set(name, value.clone())?;
            }
        }
        Ok(options)
    }

    /// Set one option by name. Unrecognized names are ignored.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "always" => self.always = expect_bool(name, &value)?,
            "stat" => self.stat = expect_bool(name, &value)?,
            "autoescape" => self.autoescape = expect_bool(name, &value)?,
            "prefix" => self.prefix = expect_string(name, value)?,
            "separator" => self.separator = expect_string(name, value)?,
            "extension" => self.extension = expect_string(name, value)?,
            "path" => self.path = Some(CachePath::Root(expect_string(name, value)?)),
            "views_dirs" => {
                let dirs = value.as_array().ok_or(CompileError::InvalidOption {
                    option: name.to_string(),
                    expected: "a list of strings",
                })?;
                self.views_dirs = dirs
                    .iter()
                    .map(|dir| {
                        dir.as_str()
                            .map(PathBuf::from)
                            .ok_or(CompileError::InvalidOption {
                                option: name.to_string(),
                                expected: "a list of strings",
                            })
                    })
                    .collect::<Result<_>>()?;
            }
            _ => warn!(option = name, "ignoring unknown compiler option"),
        }
        Ok(())
    }

    pub fn set_path_resolver(
        &mut self,
        resolver: impl Fn(&str, &CompilerOptions, bool) -> Option<String> + 'static,
    ) {
        self.path = Some(CachePath::Resolver(Box::new(resolver)));
    }
}

fn expect_bool(name: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or(CompileError::InvalidOption {
        option: name.to_string(),
        expected: "a bool value",
    })
}

fn expect_string(name: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(CompileError::InvalidOption {
            option: name.to_string(),
            expected: "a string",
        }),
    }
}
