use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use shimmyvolt::{
    compile_string, Argument, CompileError, Compiler, Expr, Extension, Node, NodeKind, Result, Template,
};

fn compile(ir: Value) -> String {
    compile_string(&ir.to_string()).unwrap()
}

fn compile_with(compiler: &Compiler, ir: Value) -> Result<String> {
    compiler.compile_string(&ir.to_string())
}

fn var(name: &str) -> Value {
    json!({ "type": "var", "name": name })
}

fn echo(expr: Value) -> Value {
    json!({ "type": "echo", "expr": expr })
}

fn attr(object: &str, attr: &str) -> Value {
    json!({ "type": "attribute", "object": var(object), "attr": var(attr) })
}

fn range(from: i64, to: i64) -> Value {
    json!({
        "type": "bin_op", "op": "range",
        "left": { "type": "integer", "value": from },
        "right": { "type": "integer", "value": to }
    })
}

// ── Plain output ──

#[test]
fn empty_template_produces_empty_output() {
    assert_eq!(compile(json!([])), "");
}

#[test]
fn plain_text_template_no_tags() {
    assert_eq!(compile(json!([{ "type": "text", "value": "Hello, world!" }])), "Hello, world!");
}

#[test]
fn compiling_twice_is_identical() {
    let ir = json!([
        { "type": "text", "value": "<ul>" },
        { "type": "for", "target": "i", "iterable": var("items"), "body": [
            echo(attr("loop", "index")),
            { "type": "else_for" },
            { "type": "text", "value": "none" }
        ]},
        { "type": "text", "value": "</ul>" }
    ]);
    assert_eq!(compile(ir.clone()), compile(ir));
}

// ── Expressions ──

#[test]
fn string_filter_compiles_to_text_helper() {
    let ir = json!([echo(json!({
        "type": "filter",
        "left": { "type": "string_lit", "value": "hi" },
        "filter": var("upper")
    }))]);
    assert_eq!(compile(ir), "<?= \\Phalcon\\Text::upper('hi') ?>");
}

#[test]
fn autoescape_toggle_on_string_literal() {
    let ir = json!([echo(json!({ "type": "string_lit", "value": "x" }))]);
    assert_eq!(compile(ir.clone()), "<?= 'x' ?>");

    let mut compiler = Compiler::new();
    compiler.set_option("autoescape", true).unwrap();
    assert_eq!(compile_with(&compiler, ir).unwrap(), "<?= $this->escaper->escapeHtml('x') ?>");
}

#[test]
fn autoescape_option_escapes_echoes() {
    let mut compiler = Compiler::new();
    compiler.set_option("autoescape", true).unwrap();
    let ir = json!([
        echo(var("a")),
        { "type": "autoescape", "enabled": false, "body": [echo(var("b"))] },
        echo(var("c"))
    ]);
    assert_eq!(
        compile_with(&compiler, ir).unwrap(),
        "<?= $this->escaper->escapeHtml($a) ?><?= $b ?><?= $this->escaper->escapeHtml($c) ?>"
    );
}

#[test]
fn in_and_not_in_use_view_helper() {
    let ir = json!([{
        "type": "if",
        "condition": { "type": "bin_op", "op": "not_in", "left": var("x"), "right": var("xs") },
        "body": [{ "type": "text", "value": "missing" }]
    }]);
    assert_eq!(
        compile(ir),
        "<?php if (!$this->isIncluded($x, $xs)) { ?>missing<?php } ?>"
    );
}

// ── Loops ──

#[test]
fn range_loop_without_loop_reference_has_no_metadata() {
    let ir = json!([{ "type": "for", "target": "i", "iterable": range(1, 3), "body": [echo(var("i"))] }]);
    let code = compile(ir);
    assert_eq!(code, "<?php foreach (range(1, 3) as $i) { ?><?= $i ?><?php } ?>");
    assert!(!code.contains("loop"));
}

#[test]
fn loop_first_emits_metadata_for_that_loop() {
    let mut compiler = Compiler::new();
    compiler.set_unique_prefix(|_| "t".to_string());
    let ir = json!([{
        "type": "for", "target": "i", "iterable": range(1, 3),
        "body": [{ "type": "if", "condition": attr("loop", "first"), "body": [{ "type": "text", "value": "F" }] }]
    }]);
    let code = compile_with(&compiler, ir).unwrap();
    assert!(code.starts_with("<?php $t1iterator = range(1, 3); $t1incr = 0; $t1loop = new stdClass();"));
    assert!(code.contains("<?php foreach ($t1iterator as $i) { ?>"));
    assert!(code.contains("$t1loop->first = ($t1incr == 0);"));
    assert!(code.contains("<?php if ($t1loop->first) { ?>F<?php } ?>"));
    assert!(code.ends_with("<?php $t1incr++; } ?>"));
}

#[test]
fn forelse_has_flag_then_else_branch() {
    let mut compiler = Compiler::new();
    compiler.set_unique_prefix(|_| "t".to_string());
    let ir = json!([{
        "type": "for", "target": "p", "iterable": var("posts"),
        "body": [echo(var("p")), { "type": "else_for" }, { "type": "text", "value": "No posts" }]
    }]);
    assert_eq!(
        compile_with(&compiler, ir).unwrap(),
        "<?php $t1iterated = false; ?><?php foreach ($posts as $p) { ?><?php $t1iterated = true; ?>\
         <?= $p ?><?php } if (!$t1iterated) { ?>No posts<?php } ?>"
    );
}

// ── Macros ──

#[test]
fn macro_default_and_missing_parameter() {
    let ir = json!([{
        "type": "macro", "name": "badge",
        "parameters": [{ "name": "label" }, { "name": "color", "default": { "type": "string_lit", "value": "grey" } }],
        "body": [echo(var("label"))]
    }]);
    let code = compile(ir);
    assert!(code.starts_with("<?php $this->macros['badge'] = function($__p = []) { "));
    assert!(code.contains(
        "throw new \\Phalcon\\Mvc\\View\\Exception(\"Macro 'badge' was called without parameter: label\");"
    ));
    assert!(code.contains("} else { $color = 'grey'; } }"));
}

// ── Errors ──

#[test]
fn unknown_statement_names_file_and_line() {
    let ir = json!([{ "type": "spaceless", "file": "views/index.volt", "line": 12 }]);
    let err = compile_string(&ir.to_string()).unwrap_err();
    assert_eq!(err.to_string(), "Unknown statement in views/index.volt on line 12");
}

#[test]
fn unknown_filter_is_reported() {
    let ir = json!([{
        "type": "echo", "line": 2,
        "expr": { "type": "filter", "left": var("x"), "filter": var("nope") }
    }]);
    let err = compile_string(&ir.to_string()).unwrap_err();
    assert!(matches!(err, CompileError::UnknownFilter { ref name, .. } if name == "nope"));
    assert_eq!(err.to_string(), "Unknown filter \"nope\" in eval code on line 2");
}

#[test]
fn malformed_ir_is_rejected() {
    let err = compile_string("not json").unwrap_err();
    assert!(matches!(err, CompileError::InvalidIr { ref source_id, .. } if source_id == "eval code"));
}

// ── Extensions and parsers ──

struct Named(&'static str);

impl Extension for Named {
    fn compile_function(&self, name: &str, arguments: &str, _: &[Argument]) -> Option<String> {
        (name == "greet").then(|| format!("{}({})", self.0, arguments))
    }
}

struct Skips;

impl Extension for Skips {
    fn compile_statement(&self, _: &Node) -> Option<String> {
        None
    }
}

#[test]
fn first_registered_extension_wins() {
    let mut compiler = Compiler::new();
    compiler.add_extension(Skips).add_extension(Named("first")).add_extension(Named("second"));
    let ir = json!([echo(json!({
        "type": "call", "callee": var("greet"),
        "arguments": [{ "expr": { "type": "string_lit", "value": "x" } }]
    }))]);
    assert_eq!(compile_with(&compiler, ir).unwrap(), "<?= first('x') ?>");
}

#[test]
fn custom_parser_closure() {
    let parser = |source: &str, _: &str| -> Result<Template> {
        Ok(vec![Node::text(source.to_uppercase()), Node::echo(Expr::var("name"))])
    };
    let compiler = Compiler::with_parser(parser);
    assert_eq!(compiler.compile_string("hi ").unwrap(), "HI <?= $name ?>");
}

#[test]
fn extension_can_replace_statements() {
    struct Comments;
    impl Extension for Comments {
        fn compile_statement(&self, node: &Node) -> Option<String> {
            match &node.kind {
                NodeKind::Text { value } if value.starts_with('#') => Some(String::new()),
                NodeKind::Text { value } if value.starts_with("//") => Some("<?php /* */ ?>".to_string()),
                _ => None,
            }
        }
    }

    let mut compiler = Compiler::new();
    compiler.add_extension(Comments);
    let ir = json!([
        { "type": "text", "value": "#kept" },
        { "type": "text", "value": "//x" }
    ]);
    // An empty result means "not handled", so the text passes through.
    assert_eq!(compile_with(&compiler, ir).unwrap(), "#kept<?php /* */ ?>");
}
