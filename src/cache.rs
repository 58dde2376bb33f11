//! Compiled-artifact cache.
//!
//! Compiled code is written next to (or under a root separate from) the
//! template sources and reused while it is newer than the template.
//! Extends-mode compilations persist their block map as JSON so a child
//! template can merge against a parent without recompiling it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::blocks::BlockMap;
use crate::compiler::{Compilation, Compiled, Compiler};
use crate::error::{CompileError, Result};
use crate::options::CachePath;

impl Compiler {
    /// Where the compiled form of `template` lives.
    pub fn compiled_path(&self, template: &Path, extends_mode: bool) -> Result<PathBuf> {
        let options = &self.options;
        let template_name = template.to_string_lossy();

        let root = match &options.path {
            Some(CachePath::Resolver(resolver)) => {
                return match resolver(&template_name, options, extends_mode) {
                    Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
                    _ => Err(CompileError::PathResolution {
                        template: template_name.into_owned(),
                    }),
                };
            }
            Some(CachePath::Root(root)) => root.as_str(),
            None => "",
        };

        let name = if root.is_empty() {
            template_name.into_owned()
        } else {
            flatten_path(template, &options.separator)
        };

        let mut file = format!("{}{}{}", root, options.prefix, name);
        if extends_mode {
            file.push_str(&format!("{s}e{s}", s = options.separator));
        }
        file.push_str(&options.extension);
        Ok(PathBuf::from(file))
    }

    /// Compile `template` through the cache.
    ///
    /// The compiled file is reused unless `always` is set, it doesn't exist,
    /// or (with `stat`) the template was modified at or after it.
    pub fn compile(&self, template: impl AsRef<Path>, extends_mode: bool) -> Result<Compilation> {
        let template = template.as_ref();
        let compiled_path = self.compiled_path(template, extends_mode)?;

        let recompile = self.options.always
            || match fs::metadata(&compiled_path) {
                Err(_) => true,
                Ok(compiled) => self.options.stat && is_stale(template, &compiled),
            };

        if recompile {
            debug!(
                template = %template.display(),
                compiled = %compiled_path.display(),
                extends_mode,
                "compiling template"
            );
            let output = self.compile_file(template, &compiled_path, extends_mode)?;
            return Ok(Compilation {
                compiled_path,
                output,
                recompiled: true,
            });
        }

        debug!(compiled = %compiled_path.display(), "using cached compilation");
        let output = load_compiled(&compiled_path, extends_mode)?;
        Ok(Compilation {
            compiled_path,
            output,
            recompiled: false,
        })
    }

    /// Compile `template` and write the result to `compiled`.
    ///
    /// Nothing is written when compilation fails. The target directory must
    /// already exist.
    pub fn compile_file(&self, template: &Path, compiled: &Path, extends_mode: bool) -> Result<Compiled> {
        if template == compiled {
            return Err(CompileError::SamePath {
                path: template.to_path_buf(),
            });
        }

        let source = fs::read_to_string(template).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => CompileError::SourceNotFound {
                path: template.to_path_buf(),
            },
            _ => CompileError::SourceUnreadable {
                path: template.to_path_buf(),
                source,
            },
        })?;

        let output = self.compile_source(&source, &template.to_string_lossy(), extends_mode)?;

        let contents = match &output {
            Compiled::Code(code) => code.clone(),
            Compiled::Blocks(blocks) => serde_json::to_string(blocks).map_err(|source| CompileError::InvalidCache {
                path: compiled.to_path_buf(),
                source,
            })?,
        };
        fs::write(compiled, contents).map_err(|source| CompileError::CacheWrite {
            path: compiled.to_path_buf(),
            source,
        })?;

        Ok(output)
    }
}

/// The template was modified at or after its compiled form. A template
/// whose mtime can't be read counts as stale so the compile reports it.
fn is_stale(template: &Path, compiled: &fs::Metadata) -> bool {
    let modified = |meta: io::Result<fs::Metadata>| -> Option<SystemTime> { meta.ok()?.modified().ok() };
    match (modified(fs::metadata(template)), compiled.modified().ok()) {
        (Some(template), Some(compiled)) => template >= compiled,
        _ => true,
    }
}

fn load_compiled(path: &Path, extends_mode: bool) -> Result<Compiled> {
    let contents = fs::read_to_string(path).map_err(|source| CompileError::CacheRead {
        path: path.to_path_buf(),
        source,
    })?;

    if !extends_mode {
        return Ok(Compiled::Code(contents));
    }
    if contents.trim().is_empty() {
        return Ok(Compiled::Blocks(BlockMap::new()));
    }
    serde_json::from_str(&contents)
        .map(Compiled::Blocks)
        .map_err(|source| CompileError::InvalidCache {
            path: path.to_path_buf(),
            source,
        })
}

/// Absolute template path folded into one file name.
fn flatten_path(template: &Path, separator: &str) -> String {
    let absolute = fs::canonicalize(template).unwrap_or_else(|_| template.to_path_buf());
    absolute
        .to_string_lossy()
        .replace(['/', '\\', ':'], separator)
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn without_root_the_extension_is_appended() {
        let compiler = Compiler::new();
        let path = compiler.compiled_path(Path::new("views/index.volt"), false).unwrap();
        assert_eq!(path, PathBuf::from("views/index.volt.php"));

        let path = compiler.compiled_path(Path::new("views/layout.volt"), true).unwrap();
        assert_eq!(path, PathBuf::from("views/layout.volt%%e%%.php"));
    }

    #[test]
    fn root_flattens_the_template_path() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("Index.volt");
        fs::write(&template, "[]").unwrap();

        let mut compiler = Compiler::new();
        compiler.set_option("path", "/cache/").unwrap();
        compiler.set_option("prefix", "app_").unwrap();

        let path = compiler.compiled_path(&template, false).unwrap();
        let expected = fs::canonicalize(&template)
            .unwrap()
            .to_string_lossy()
            .replace('/', "%%")
            .to_lowercase();
        assert_eq!(path, PathBuf::from(format!("/cache/app_{}.php", expected)));
        assert!(!path.to_string_lossy()["/cache/".len()..].contains('/'));
    }

    #[test]
    fn resolver_decides_the_path() {
        let mut compiler = Compiler::new();
        compiler
            .options_mut()
            .set_path_resolver(|template, _, extends| Some(format!("/c/{}-{}", template.len(), extends)));
        assert_eq!(
            compiler.compiled_path(Path::new("abc"), true).unwrap(),
            PathBuf::from("/c/3-true")
        );

        compiler.options_mut().set_path_resolver(|_, _, _| Some(String::new()));
        let err = compiler.compiled_path(Path::new("abc"), false).unwrap_err();
        assert!(matches!(err, CompileError::PathResolution { ref template } if template == "abc"));
    }

    #[test]
    fn resolver_sees_the_current_options() {
        let mut compiler = Compiler::new();
        compiler.options_mut().extension = ".compiled".to_string();
        compiler
            .options_mut()
            .set_path_resolver(|template, options, _| Some(format!("/c/{}{}", template, options.extension)));
        assert_eq!(
            compiler.compiled_path(Path::new("index.volt"), false).unwrap(),
            PathBuf::from("/c/index.volt.compiled")
        );
    }

    #[test]
    fn empty_extends_file_loads_as_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, "").unwrap();
        assert_eq!(load_compiled(&path, true).unwrap(), Compiled::Blocks(BlockMap::new()));

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_compiled(&path, true), Err(CompileError::InvalidCache { .. })));
    }

    #[test]
    fn compile_file_rejects_same_path_and_missing_source() {
        let compiler = Compiler::new();
        let path = Path::new("same.volt");
        assert!(matches!(
            compiler.compile_file(path, path, false),
            Err(CompileError::SamePath { .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.volt");
        let err = compiler
            .compile_file(&missing, &dir.path().join("out.php"), false)
            .unwrap_err();
        assert!(matches!(err, CompileError::SourceNotFound { .. }));
        assert!(!dir.path().join("out.php").exists());
    }

    #[test]
    fn failed_compilation_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("bad.volt");
        fs::write(&template, json!([{ "type": "mystery" }]).to_string()).unwrap();

        let compiler = Compiler::new();
        let compiled = dir.path().join("bad.php");
        assert!(compiler.compile_file(&template, &compiled, false).is_err());
        assert!(!compiled.exists());
    }
}
