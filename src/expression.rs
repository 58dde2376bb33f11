//! Expression compilation.

use crate::ast::{Argument, BinOp, Expr, UnOp};
use crate::compiler::Generator;
use crate::error::{CompileError, Result};
use crate::extension::first_handled;

impl<'c> Generator<'c> {
    /// Compile an expression to host code.
    pub(crate) fn compile_expr(&mut self, expr: &Expr) -> Result<String> {
        self.state.expr_level += 1;
        let code = self.lower_expr(expr);
        self.state.expr_level -= 1;
        code
    }

    /// `a, 'name' => b`
    pub(crate) fn compile_args(&mut self, arguments: &[Argument]) -> Result<String> {
        let mut items = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let code = self.compile_expr(&argument.expr)?;
            match &argument.name {
                Some(name) => items.push(format!("{} => {}", quote(name), code)),
                None => items.push(code),
            }
        }
        Ok(items.join(", "))
    }

    fn lower_expr(&mut self, expr: &Expr) -> Result<String> {
        if let Some(code) = first_handled(&self.compiler.extensions, |ext| ext.resolve_expression(expr)) {
            return Ok(code);
        }

        match expr {
            Expr::Integer { value } => Ok(value.to_string()),
            Expr::Double { value } => Ok(format!("{:?}", value)),
            Expr::StringLit { value } => Ok(quote(value)),
            Expr::BoolLit { value } => Ok(if *value { "true" } else { "false" }.to_string()),
            Expr::Null => Ok("null".to_string()),
            Expr::Var { name } => self.identifier(name),
            Expr::Attribute { object, attr } => {
                let object = match object.as_ref() {
                    Expr::Var { name } => self.identifier(name)?,
                    other => self.compile_expr(other)?,
                };
                let attr = match attr.as_ref() {
                    Expr::Var { name } => name.clone(),
                    other => self.compile_expr(other)?,
                };
                Ok(format!("{}->{}", object, attr))
            }
            Expr::Index { object, index } => {
                let object = self.compile_expr(object)?;
                let index = self.compile_expr(index)?;
                Ok(format!("{}[{}]", object, index))
            }
            Expr::BinOp { op, left, right } => {
                let left = self.compile_expr(left)?;
                let right = self.compile_expr(right)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::UnaryOp { op, expr } => {
                let operand = self.compile_expr(expr)?;
                Ok(unary(*op, &operand))
            }
            Expr::Call { callee, arguments } => self.compile_call(callee, arguments),
            Expr::Filter { left, filter } => {
                let left = self.compile_expr(left)?;
                self.resolve_filter(filter, left)
            }
            Expr::Is { left, test } => {
                let left = self.compile_expr(left)?;
                self.resolve_test(test, left)
            }
            Expr::IsNot { left, test } => {
                let left = self.compile_expr(left)?;
                Ok(format!("!({})", self.resolve_test(test, left)?))
            }
            Expr::Ternary {
                condition,
                then,
                otherwise,
            } => {
                let condition = self.compile_expr(condition)?;
                let then = self.compile_expr(then)?;
                let otherwise = self.compile_expr(otherwise)?;
                Ok(format!("({} ? {} : {})", condition, then, otherwise))
            }
            Expr::Slice { object, start, end } => {
                let object = self.compile_expr(object)?;
                let start = match start {
                    Some(start) => self.compile_expr(start)?,
                    None => "null".to_string(),
                };
                let end = match end {
                    Some(end) => self.compile_expr(end)?,
                    None => "null".to_string(),
                };
                Ok(format!("$this->slice({}, {}, {})", object, start, end))
            }
            Expr::Array { items } => Ok(format!("[{}]", self.compile_args(items)?)),
            Expr::Enclosed { expr } => Ok(format!("({})", self.compile_expr(expr)?)),
            Expr::Resolved { code } => Ok(code.clone()),
            Expr::Unknown => Err(CompileError::UnknownExpression {
                location: self.location(),
            }),
        }
    }

    fn identifier(&mut self, name: &str) -> Result<String> {
        let depth = self.state.foreach_level;
        if name == "loop" && depth > 0 {
            self.state.loop_pointers.insert(depth, self.state.level);
            return Ok(format!("${}{}loop", self.unique_prefix()?, depth));
        }
        if self.compiler.services.contains(name) {
            return Ok(format!("$this->{}", name));
        }
        Ok(format!("${}", name))
    }
}

fn binary(op: BinOp, l: &str, r: &str) -> String {
    let infix = match op {
        BinOp::And => "&&",
        BinOp::Or => "||",
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Concat => ".",
        BinOp::Equals => "==",
        BinOp::NotEquals => "!=",
        BinOp::Identical => "===",
        BinOp::NotIdentical => "!==",
        BinOp::Less => "<",
        BinOp::Greater => ">",
        BinOp::LessEqual => "<=",
        BinOp::GreaterEqual => ">=",
        BinOp::Pow => return format!("pow({}, {})", l, r),
        BinOp::Range => return format!("range({}, {})", l, r),
        BinOp::In => return format!("$this->isIncluded({}, {})", l, r),
        BinOp::NotIn => return format!("!$this->isIncluded({}, {})", l, r),
    };
    format!("{} {} {}", l, infix, r)
}

fn unary(op: UnOp, operand: &str) -> String {
    match op {
        UnOp::Not => format!("!{}", operand),
        UnOp::Minus => format!("-{}", operand),
        UnOp::Plus => format!("+{}", operand),
        UnOp::Isset => format!("isset({})", operand),
        UnOp::NotIsset => format!("!isset({})", operand),
        UnOp::Empty => format!("empty({})", operand),
        UnOp::NotEmpty => format!("!empty({})", operand),
    }
}

/// Single-quoted host string literal.
pub(crate) fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Backslash-escape quotes, backslashes and NUL bytes.
pub(crate) fn add_slashes(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '\'' | '"' => {
                out.push('\\');
                out.push(c);
            }
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out
}
