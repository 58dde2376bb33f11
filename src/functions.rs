//! Function calls: extensions, user functions, built-ins, tag helpers and
//! macro calls.

use std::mem;

use crate::ast::{Argument, Expr};
use crate::blocks::BlockBody;
use crate::compiler::Generator;
use crate::error::Result;
use crate::expression::add_slashes;
use crate::extension::first_handled;

/// Tag helpers exposed as template functions.
const TAG_HELPERS: &[&str] = &[
    "link_to",
    "image",
    "form",
    "end_form",
    "form_legacy",
    "select",
    "select_static",
    "submit_button",
    "radio_field",
    "check_field",
    "file_field",
    "hidden_field",
    "password_field",
    "text_area",
    "text_field",
    "email_field",
    "date_field",
    "tel_field",
    "numeric_field",
    "image_input",
    "javascript_include",
    "stylesheet_link",
    "get_title",
    "get_doctype",
    "friendly_title",
];

/// Helpers that take their arguments as one parameter array.
const ARRAY_HELPERS: &[&str] = &[
    "link_to",
    "image",
    "form",
    "select",
    "select_static",
    "submit_button",
    "radio_field",
    "check_field",
    "file_field",
    "hidden_field",
    "password_field",
    "text_area",
    "text_field",
    "email_field",
    "date_field",
    "tel_field",
    "numeric_field",
    "image_input",
];

impl<'c> Generator<'c> {
    pub(crate) fn compile_call(&mut self, callee: &Expr, raw: &[Argument]) -> Result<String> {
        let arguments = if raw.is_empty() {
            String::new()
        } else {
            self.compile_args(raw)?
        };

        let Some(name) = callee.as_ident() else {
            let callee = self.compile_expr(callee)?;
            return Ok(format!("{}({})", callee, arguments));
        };

        if let Some(code) = first_handled(&self.compiler.extensions, |ext| {
            ext.compile_function(name, &arguments, raw)
        }) {
            return Ok(code);
        }

        if let Some(function) = self.compiler.functions.get(name) {
            return function.expand(&arguments, raw);
        }

        let code = match name {
            "content" | "get_content" => "$this->getContent()".to_string(),
            "partial" => format!("$this->partial({})", arguments),
            "super" => return self.super_block(),
            "url" => format!("$this->url->get({})", arguments),
            "static_url" => format!("$this->url->getStatic({})", arguments),
            "date" => format!("date({})", arguments),
            "time" => "time()".to_string(),
            "dump" => format!("var_dump({})", arguments),
            "version" => "\\Phalcon\\Version::get()".to_string(),
            "version_id" => "\\Phalcon\\Version::getId()".to_string(),
            "preload" => format!("$this->preload({})", arguments),
            "constant" => format!("constant({})", arguments),
            helper if TAG_HELPERS.contains(&helper) => {
                let method = camelize(helper);
                if ARRAY_HELPERS.contains(&helper) {
                    format!("$this->tag->{}([{}])", method, arguments)
                } else {
                    format!("$this->tag->{}({})", method, arguments)
                }
            }
            _ => format!("$this->callMacro('{}', [{}])", name, arguments),
        };
        Ok(code)
    }

    /// Body of the parent's version of the block being overridden.
    ///
    /// Echoed directly the parent body is emitted as template code; used
    /// inside a larger expression it becomes a string literal.
    fn super_block(&mut self) -> Result<String> {
        let Some(name) = self.state.current_block.clone() else {
            return Ok("''".to_string());
        };
        let Some(body) = self
            .state
            .extended_blocks
            .as_ref()
            .and_then(|blocks| blocks.get_named(&name))
            .cloned()
        else {
            return Ok("''".to_string());
        };

        let code = match body {
            BlockBody::Code(code) => code,
            BlockBody::Nodes(nodes) => {
                // The parent body can't refer to its own super().
                let saved = mem::take(&mut self.state.current_block);
                let code = self.compile_list(&nodes, false);
                self.state.current_block = saved;
                code?
            }
        };

        if self.state.expr_level == 1 {
            Ok(code)
        } else {
            Ok(format!("'{}'", add_slashes(&code)))
        }
    }
}

fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
