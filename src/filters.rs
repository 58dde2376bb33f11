//! Filters (`value|name(args)`) and tests (`value is name`).

use crate::ast::{Argument, Expr};
use crate::compiler::Generator;
use crate::error::{CompileError, Result};
use crate::extension::first_handled;

impl<'c> Generator<'c> {
    /// Apply `filter` to the already compiled `left` operand.
    ///
    /// The operand becomes the filter's first argument, except for
    /// `default`, whose arguments are only the fallback.
    pub(crate) fn resolve_filter(&mut self, filter: &Expr, left: String) -> Result<String> {
        let (name, mut raw, call_form) = match filter {
            Expr::Var { name } => (name.as_str(), Vec::new(), false),
            Expr::Call { callee, arguments } => match callee.as_ident() {
                Some(name) => (name, arguments.clone(), true),
                None => return Err(CompileError::InvalidFilter { location: self.location() }),
            },
            _ => return Err(CompileError::InvalidFilter { location: self.location() }),
        };

        if name != "default" {
            raw.insert(0, Argument::positional(Expr::Resolved { code: left.clone() }));
        }
        let arguments = if call_form && !raw.is_empty() {
            self.compile_args(&raw)?
        } else {
            left.clone()
        };

        if let Some(code) = first_handled(&self.compiler.extensions, |ext| {
            ext.compile_filter(name, &arguments, &raw)
        }) {
            return Ok(code);
        }

        if let Some(filter) = self.compiler.filters.get(name) {
            return filter.expand(&arguments, &raw);
        }

        let code = match name {
            "length" => format!("$this->length({})", arguments),
            "e" | "escape" => format!("$this->escaper->escapeHtml({})", arguments),
            "escape_css" => format!("$this->escaper->escapeCss({})", arguments),
            "escape_js" => format!("$this->escaper->escapeJs({})", arguments),
            "escape_attr" => format!("$this->escaper->escapeHtmlAttr({})", arguments),
            "trim" => format!("trim({})", arguments),
            "left_trim" => format!("ltrim({})", arguments),
            "right_trim" => format!("rtrim({})", arguments),
            "striptags" => format!("strip_tags({})", arguments),
            "url_encode" => format!("urlencode({})", arguments),
            "slashes" => format!("addslashes({})", arguments),
            "stripslashes" => format!("stripslashes({})", arguments),
            "nl2br" => format!("nl2br({})", arguments),
            "keys" => format!("array_keys({})", arguments),
            "join" => {
                let glue = match raw.get(1) {
                    Some(glue) => self.compile_expr(&glue.expr)?,
                    None => "''".to_string(),
                };
                format!("join({}, {})", glue, left)
            }
            "lower" | "lowercase" => format!("\\Phalcon\\Text::lower({})", arguments),
            "upper" | "uppercase" => format!("\\Phalcon\\Text::upper({})", arguments),
            "capitalize" => format!("ucwords({})", arguments),
            "sort" => format!("$this->sort({})", arguments),
            "json_encode" => format!("json_encode({})", arguments),
            "json_decode" => format!("json_decode({})", arguments),
            "format" => format!("sprintf({})", arguments),
            "abs" => format!("abs({})", arguments),
            "slice" => format!("$this->slice({})", arguments),
            "default" => format!("(empty({l}) ? ({a}) : ({l}))", l = left, a = arguments),
            "convert_encoding" => format!("$this->convertEncoding({})", arguments),
            _ => {
                return Err(CompileError::UnknownFilter {
                    name: name.to_string(),
                    location: self.location(),
                })
            }
        };
        Ok(code)
    }

    /// `left is test`. Names that aren't built-in tests compare for equality.
    pub(crate) fn resolve_test(&mut self, test: &Expr, left: String) -> Result<String> {
        match test {
            Expr::Var { name } => {
                let code = match name.as_str() {
                    "empty" => format!("empty({})", left),
                    "even" => format!("((({}) % 2) == 0)", left),
                    "odd" => format!("((({}) % 2) != 0)", left),
                    "numeric" => format!("is_numeric({})", left),
                    "scalar" => format!("is_scalar({})", left),
                    "iterable" => format!("(is_array({l}) || ({l}) instanceof Traversable)", l = left),
                    _ => return Ok(format!("{} == {}", left, self.compile_expr(test)?)),
                };
                Ok(code)
            }
            Expr::Call { callee, arguments } => {
                let operand = match callee.as_ident() {
                    Some("divisibleby" | "sameas" | "type") => self.compile_args(arguments)?,
                    _ => return Ok(format!("{} == {}", left, self.compile_expr(test)?)),
                };
                let code = match callee.as_ident() {
                    Some("divisibleby") => format!("((({}) % ({})) == 0)", left, operand),
                    Some("sameas") => format!("({}) === ({})", left, operand),
                    _ => format!("gettype({}) === ({})", left, operand),
                };
                Ok(code)
            }
            _ => Ok(format!("{} == {}", left, self.compile_expr(test)?)),
        }
    }
}
