//! Statement compilation.

use std::mem;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::ast::{AssignOp, Assignment, Expr, Node, NodeKind};
use crate::blocks::BlockBody;
use crate::compiler::Generator;
use crate::error::{CompileError, Result};
use crate::extension::first_handled;

impl<'c> Generator<'c> {
    /// Compile a statement list.
    ///
    /// In block mode (the template extends another, or is itself being
    /// compiled for a child to extend) `block` statements are registered
    /// instead of emitted, and the code between them is collected as
    /// positional segments.
    pub(crate) fn compile_list(&mut self, nodes: &[Node], extends_mode: bool) -> Result<String> {
        if nodes.is_empty() {
            return Ok(String::new());
        }

        let mut block_mode = self.state.extended || extends_mode;
        let counted = block_mode;
        if counted {
            self.state.block_level += 1;
        }
        self.state.level += 1;

        let result = self.compile_nodes(nodes, extends_mode, &mut block_mode);

        // An `extends` switches the list into block mode part way through.
        if block_mode {
            if !counted {
                self.state.block_level += 1;
            }
            if let Ok(trailing) = &result {
                if self.state.block_level == 1 && !trailing.is_empty() {
                    self.state.blocks.push_code(trailing.clone());
                }
            }
            self.state.block_level -= 1;
        }
        self.state.level -= 1;

        result
    }

    fn compile_nodes(&mut self, nodes: &[Node], extends_mode: bool, block_mode: &mut bool) -> Result<String> {
        let mut compilation = String::new();

        for node in nodes {
            let outer = mem::replace(&mut self.pos, node.pos.clone());

            if let Some(code) = first_handled(&self.compiler.extensions, |ext| ext.compile_statement(node)) {
                compilation.push_str(&code);
                self.pos = outer;
                continue;
            }

            trace!(statement = ?mem::discriminant(&node.kind), line = ?node.pos.line, "compiling statement");

            match &node.kind {
                NodeKind::Text { value } => compilation.push_str(value),
                NodeKind::If {
                    condition,
                    body,
                    else_body,
                } => {
                    let code = self.compile_if(condition.as_ref(), body, else_body.as_deref(), extends_mode)?;
                    compilation.push_str(&code);
                }
                NodeKind::ElseIf { condition } => {
                    let condition = self.required(condition.as_ref(), "condition")?;
                    let condition = self.compile_expr(condition)?;
                    compilation.push_str(&format!("<?php }} elseif ({}) {{ ?>", condition));
                }
                NodeKind::Switch { expr, cases } => {
                    let code = self.compile_switch(expr.as_ref(), cases, extends_mode)?;
                    compilation.push_str(&code);
                }
                NodeKind::Case { expr } => {
                    let expr = self.required(expr.as_ref(), "expr")?;
                    let expr = self.compile_expr(expr)?;
                    compilation.push_str(&format!("<?php case {}: ?>", expr));
                }
                NodeKind::Default => compilation.push_str("<?php default: ?>"),
                NodeKind::For {
                    target,
                    key,
                    iterable,
                    guard,
                    body,
                } => {
                    let code = self.compile_for(
                        target,
                        key.as_deref(),
                        iterable.as_ref(),
                        guard.as_ref(),
                        body,
                        extends_mode,
                    )?;
                    compilation.push_str(&code);
                }
                NodeKind::ElseFor => compilation.push_str(&self.compile_else_for()),
                NodeKind::Set { assignments } => {
                    let code = self.compile_set(assignments)?;
                    compilation.push_str(&code);
                }
                NodeKind::Echo { expr } => {
                    let code = self.compile_echo(expr.as_ref())?;
                    compilation.push_str(&code);
                }
                NodeKind::Block { name, body } => {
                    if *block_mode {
                        if !compilation.is_empty() {
                            self.state.blocks.push_code(mem::take(&mut compilation));
                        }
                        self.state
                            .blocks
                            .insert_named(name.clone(), BlockBody::Nodes(body.clone()));
                    } else {
                        let code = self.compile_list(body, extends_mode)?;
                        compilation.push_str(&code);
                    }
                }
                NodeKind::Extends { path } => {
                    self.compile_extends(path.as_ref())?;
                    *block_mode = true;
                }
                NodeKind::Include { path, params } => {
                    let code = self.compile_include(path.as_ref(), params.as_ref())?;
                    compilation.push_str(&code);
                }
                NodeKind::Macro {
                    name,
                    parameters,
                    body,
                } => {
                    let code = self.compile_macro(name, parameters, body, extends_mode)?;
                    compilation.push_str(&code);
                }
                NodeKind::Do { expr } => {
                    let expr = self.required(expr.as_ref(), "expr")?;
                    let expr = self.compile_expr(expr)?;
                    compilation.push_str(&format!("<?php {}; ?>", expr));
                }
                NodeKind::Return { expr } => {
                    let expr = self.required(expr.as_ref(), "expr")?;
                    let expr = self.compile_expr(expr)?;
                    compilation.push_str(&format!("<?php return {}; ?>", expr));
                }
                NodeKind::Autoescape { enabled, body } => {
                    let enabled = *self.required(enabled.as_ref(), "enabled")?;
                    let saved = mem::replace(&mut self.state.autoescape, enabled);
                    let code = self.compile_list(body, extends_mode);
                    self.state.autoescape = saved;
                    compilation.push_str(&code?);
                }
                NodeKind::Continue => compilation.push_str("<?php continue; ?>"),
                NodeKind::Break => compilation.push_str("<?php break; ?>"),
                NodeKind::Cache { key, lifetime, body } => {
                    let code = self.compile_cache(key.as_ref(), lifetime.as_ref(), body, extends_mode)?;
                    compilation.push_str(&code);
                }
                NodeKind::Unknown => {
                    return Err(CompileError::UnknownStatement {
                        location: self.location(),
                    })
                }
            }

            self.pos = outer;
        }

        Ok(compilation)
    }

    fn compile_if(
        &mut self,
        condition: Option<&Expr>,
        body: &[Node],
        else_body: Option<&[Node]>,
        extends_mode: bool,
    ) -> Result<String> {
        let condition = self.required(condition, "condition")?;
        let condition = self.compile_expr(condition)?;

        let mut code = format!("<?php if ({}) {{ ?>", condition);
        code.push_str(&self.compile_list(body, extends_mode)?);
        if let Some(else_body) = else_body {
            code.push_str("<?php } else { ?>");
            code.push_str(&self.compile_list(else_body, extends_mode)?);
        }
        code.push_str("<?php } ?>");
        Ok(code)
    }

    fn compile_switch(&mut self, expr: Option<&Expr>, cases: &[Node], extends_mode: bool) -> Result<String> {
        let expr = self.required(expr, "expr")?;
        let expr = self.compile_expr(expr)?;

        let mut code = format!("<?php switch ({}): ?>", expr);
        let lines = self.compile_list(cases, extends_mode)?;
        // Nothing may be output between `switch:` and the first `case`.
        code.push_str(&normalize_case_whitespace(&lines));
        code.push_str("<?php endswitch ?>");
        Ok(code)
    }

    fn compile_set(&mut self, assignments: &[Assignment]) -> Result<String> {
        if assignments.is_empty() {
            return Err(CompileError::CorruptStatement {
                field: "assignments",
                location: self.location(),
            });
        }

        let mut code = String::from("<?php");
        for assignment in assignments {
            let value = self.required(assignment.value.as_ref(), "value")?;
            let value = self.compile_expr(value)?;
            let target = self.compile_expr(&assignment.target)?;
            let op = match assignment.op {
                AssignOp::Assign => "=",
                AssignOp::AddAssign => "+=",
                AssignOp::SubAssign => "-=",
                AssignOp::MulAssign => "*=",
                AssignOp::DivAssign => "/=",
            };
            code.push_str(&format!(" {} {} {};", target, op, value));
        }
        code.push_str(" ?>");
        Ok(code)
    }

    fn compile_echo(&mut self, expr: Option<&Expr>) -> Result<String> {
        let expr = self.required(expr, "expr")?;
        let code = self.compile_expr(expr)?;

        // super() already decided how to emit the parent block.
        if is_super_call(expr) {
            return Ok(code);
        }
        if self.state.autoescape {
            Ok(format!("<?= $this->escaper->escapeHtml({}) ?>", code))
        } else {
            Ok(format!("<?= {} ?>", code))
        }
    }

    fn compile_extends(&mut self, path: Option<&Expr>) -> Result<()> {
        let Some(Expr::StringLit { value }) = path else {
            return Err(CompileError::CorruptStatement {
                field: "path",
                location: self.location(),
            });
        };

        let parent = self.compiler.resolve_view_path(value);
        debug!(parent = %parent.display(), "compiling extended template");
        let blocks = self
            .compiler
            .compile(&parent, true)?
            .output
            .into_blocks()
            .unwrap_or_default();

        self.state.extended = true;
        self.state.extended_blocks = Some(blocks);
        Ok(())
    }

    fn compile_include(&mut self, path: Option<&Expr>, params: Option<&Expr>) -> Result<String> {
        let path = self.required(path, "path")?;

        if let (Expr::StringLit { value }, None) = (path, params) {
            let included = self.compiler.resolve_view_path(value);
            debug!(template = %included.display(), "including template statically");
            let compilation = self.compiler.compile(&included, false)?;
            return Ok(compilation.output.into_code().unwrap_or_default());
        }

        let path = self.compile_expr(path)?;
        match params {
            Some(params) => {
                let params = self.compile_expr(params)?;
                Ok(format!("<?php $this->partial({}, {}); ?>", path, params))
            }
            None => Ok(format!("<?php $this->partial({}); ?>", path)),
        }
    }

    /// Deprecated fragment cache. Nested caches whose key expressions
    /// compile to the same code share `$_cache`/`$_cacheKey` slots.
    fn compile_cache(
        &mut self,
        key: Option<&Expr>,
        lifetime: Option<&Expr>,
        body: &[Node],
        extends_mode: bool,
    ) -> Result<String> {
        let key = self.required(key, "key")?;
        let key = self.compile_expr(key)?;
        let lifetime = lifetime.map(|lifetime| self.compile_expr(lifetime)).transpose()?;

        let mut code = format!("<?php $_cache[{k}] = $this->di->get('viewCache'); ", k = key);
        match &lifetime {
            Some(lifetime) => code.push_str(&format!(
                "$_cacheKey[{k}] = $_cache[{k}]->start({k}, {l}); ",
                k = key,
                l = lifetime
            )),
            None => code.push_str(&format!("$_cacheKey[{k}] = $_cache[{k}]->start({k}); ", k = key)),
        }
        code.push_str(&format!("if ($_cacheKey[{}] === null) {{ ?>", key));
        code.push_str(&self.compile_list(body, extends_mode)?);
        match &lifetime {
            Some(lifetime) => code.push_str(&format!(
                "<?php $_cache[{k}]->save({k}, null, {l}); ",
                k = key,
                l = lifetime
            )),
            None => code.push_str(&format!("<?php $_cache[{k}]->save({k}); ", k = key)),
        }
        code.push_str(&format!("}} else {{ echo $_cacheKey[{}]; }} ?>", key));
        Ok(code)
    }
}

pub(crate) fn is_super_call(expr: &Expr) -> bool {
    matches!(expr, Expr::Call { callee, .. } if callee.as_ident() == Some("super"))
}

/// Strip indentation and trailing blanks from every line and collapse
/// remaining runs of horizontal whitespace.
fn normalize_case_whitespace(lines: &str) -> String {
    static EDGES: OnceLock<Regex> = OnceLock::new();
    static RUNS: OnceLock<Regex> = OnceLock::new();
    let edges = EDGES.get_or_init(|| Regex::new(r"(?mR)^[\t ]+|[\t ]+$").expect("valid regex"));
    let runs = RUNS.get_or_init(|| Regex::new(r"[\t ]{2,}").expect("valid regex"));

    let trimmed = edges.replace_all(lines, "");
    runs.replace_all(&trimmed, " ").into_owned()
}
