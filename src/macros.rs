//! Macro definitions.

use crate::ast::{MacroParam, Node};
use crate::compiler::Generator;
use crate::error::{CompileError, Result};
use crate::expression::quote;

impl<'c> Generator<'c> {
    /// Compile a macro into a closure registered on the view.
    ///
    /// Arguments arrive as one array and bind by position first, then by
    /// name, then by the declared default.
    pub(crate) fn compile_macro(
        &mut self,
        name: &str,
        parameters: &[MacroParam],
        body: &[Node],
        extends_mode: bool,
    ) -> Result<String> {
        if self.state.macros.contains_key(name) {
            return Err(CompileError::DuplicateMacro {
                name: name.to_string(),
                location: self.location(),
            });
        }
        let reference = format!("$this->macros[{}]", quote(name));
        self.state.macros.insert(name.to_string(), reference.clone());

        let mut code = String::from("<?php ");
        if parameters.is_empty() {
            code.push_str(&format!("{} = function() {{ ?>", reference));
        } else {
            code.push_str(&format!("{} = function($__p = []) {{ ", reference));
            for (position, param) in parameters.iter().enumerate() {
                code.push_str(&format!(
                    "if (isset($__p[{i}])) {{ ${v} = $__p[{i}]; }} else {{ \
                     if (array_key_exists(\"{v}\", $__p)) {{ ${v} = $__p[\"{v}\"]; }} else {{ ",
                    i = position,
                    v = param.name
                ));
                match &param.default {
                    Some(default) => {
                        let default = self.compile_expr(default)?;
                        code.push_str(&format!("${} = {};", param.name, default));
                    }
                    None => code.push_str(&format!(
                        "throw new \\Phalcon\\Mvc\\View\\Exception(\"Macro '{}' was called without parameter: {}\");",
                        name, param.name
                    )),
                }
                code.push_str(" } } ");
            }
            code.push_str("?>");
        }

        code.push_str(&self.compile_list(body, extends_mode)?);
        code.push_str(&format!(
            "<?php }}; {r} = \\Closure::bind({r}, $this); ?>",
            r = reference
        ));
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Argument, Expr, MacroParam, Node, NodeKind};
    use crate::compiler::{Compiler, Generator};
    use crate::error::CompileError;
    use pretty_assertions::assert_eq;

    fn macro_node(name: &str, parameters: Vec<MacroParam>, body: Vec<Node>) -> Node {
        Node::new(NodeKind::Macro {
            name: name.into(),
            parameters,
            body,
        })
    }

    #[test]
    fn macro_without_parameters() {
        let compiler = Compiler::new();
        let code = Generator::new(&compiler, "m.volt")
            .run(&[macro_node("hr", vec![], vec![Node::text("<hr>")])])
            .unwrap();
        assert_eq!(
            code,
            "<?php $this->macros['hr'] = function() { ?><hr>\
             <?php }; $this->macros['hr'] = \\Closure::bind($this->macros['hr'], $this); ?>"
        );
    }

    #[test]
    fn parameters_bind_by_position_name_or_default() {
        let compiler = Compiler::new();
        let node = macro_node(
            "input",
            vec![
                MacroParam {
                    name: "name".into(),
                    default: None,
                },
                MacroParam {
                    name: "type".into(),
                    default: Some(Expr::string("text")),
                },
            ],
            vec![Node::echo(Expr::var("type"))],
        );
        let code = Generator::new(&compiler, "m.volt").run(&[node]).unwrap();
        assert_eq!(
            code,
            "<?php $this->macros['input'] = function($__p = []) { \
             if (isset($__p[0])) { $name = $__p[0]; } else { \
             if (array_key_exists(\"name\", $__p)) { $name = $__p[\"name\"]; } else { \
             throw new \\Phalcon\\Mvc\\View\\Exception(\"Macro 'input' was called without parameter: name\"); } } \
             if (isset($__p[1])) { $type = $__p[1]; } else { \
             if (array_key_exists(\"type\", $__p)) { $type = $__p[\"type\"]; } else { $type = 'text'; } } \
             ?><?= $type ?>\
             <?php }; $this->macros['input'] = \\Closure::bind($this->macros['input'], $this); ?>"
        );
    }

    #[test]
    fn duplicate_macro_is_rejected() {
        let compiler = Compiler::new();
        let nodes = [
            macro_node("a", vec![], vec![]),
            macro_node("a", vec![], vec![]).at("m.volt", 4),
        ];
        let err = Generator::new(&compiler, "m.volt").run(&nodes).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateMacro { ref name, .. } if name == "a"));
        assert_eq!(err.to_string(), "Macro 'a' is already defined in m.volt on line 4");
    }

    #[test]
    fn calling_a_macro_goes_through_the_view() {
        let compiler = Compiler::new();
        let nodes = [
            macro_node("greet", vec![], vec![Node::text("hi")]),
            Node::echo(Expr::call("greet", vec![Argument::positional(Expr::int(1))])),
        ];
        let code = Generator::new(&compiler, "m.volt").run(&nodes).unwrap();
        assert!(code.ends_with("<?= $this->callMacro('greet', [1]) ?>"));
    }
}
