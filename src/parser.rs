//! Boundary to the external template parser.
//!
//! Tokenizing and parsing template text is not this crate's job. The
//! compiler only asks a [`TemplateParser`] for the node tree of a source
//! text; [`JsonParser`] reads a tree that the parser already serialized.

use crate::ast::Template;
use crate::error::{CompileError, Result};

pub trait TemplateParser {
    /// Produce the node tree for `source`. `source_id` names the template
    /// (its path, or `eval code` for in-memory sources) for diagnostics.
    fn parse(&self, source: &str, source_id: &str) -> Result<Template>;
}

impl<F> TemplateParser for F
where
    F: Fn(&str, &str) -> Result<Template>,
{
    fn parse(&self, source: &str, source_id: &str) -> Result<Template> {
        self(source, source_id)
    }
}

/// Reads the intermediate representation as a JSON array of statements.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonParser;

impl TemplateParser for JsonParser {
    fn parse(&self, source: &str, source_id: &str) -> Result<Template> {
        serde_json::from_str(source).map_err(|e| CompileError::InvalidIr {
            source_id: source_id.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, Expr, NodeKind};

    #[test]
    fn parses_statements_with_positions() {
        let ir = r#"[
            {"type": "text", "value": "<p>"},
            {"type": "echo", "file": "index.volt", "line": 4,
             "expr": {"type": "bin_op", "op": "add",
                      "left": {"type": "integer", "value": 1},
                      "right": {"type": "var", "name": "x"}}}
        ]"#;

        let nodes = JsonParser.parse(ir, "index.volt").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            nodes[0].kind,
            NodeKind::Text {
                value: "<p>".into()
            }
        );
        assert_eq!(nodes[1].pos.line, Some(4));
        assert_eq!(
            nodes[1].kind,
            NodeKind::Echo {
                expr: Some(Expr::binop(Expr::int(1), BinOp::Add, Expr::var("x")))
            }
        );
    }

    #[test]
    fn unknown_kinds_are_kept_for_the_compiler_to_reject() {
        let ir = r#"[{"type": "spaceless", "line": 9}]"#;
        let nodes = JsonParser.parse(ir, "a.volt").unwrap();
        assert_eq!(nodes[0].kind, NodeKind::Unknown);
        assert_eq!(nodes[0].pos.line, Some(9));
    }

    #[test]
    fn malformed_tree_is_invalid_ir() {
        let err = JsonParser.parse(r#"{"type": "text"}"#, "broken.volt").unwrap_err();
        assert!(matches!(err, CompileError::InvalidIr { ref source_id, .. } if source_id == "broken.volt"));
    }
}
