//! Intermediate node tree handed to the compiler by the template parser.
//!
//! The tree is serde-deserializable: every statement and expression is an
//! object whose `type` field names its kind. Statements additionally carry
//! the `file`/`line` they were parsed from so diagnostics can point back at
//! the template source.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat, // ~
    Range,  // ..
    Equals,
    NotEquals,
    Identical,
    NotIdentical,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnOp {
    Not,
    Minus,
    Plus,
    Isset,
    NotIsset,
    Empty,
    NotEmpty,
}

/// One entry of an argument list or array literal; `name` is set for
/// keyword arguments and keyed array items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub expr: Expr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Argument {
    pub fn positional(expr: Expr) -> Self {
        Self { expr, name: None }
    }

    pub fn named(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            expr,
            name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expr {
    Integer {
        value: i64,
    },
    Double {
        value: f64,
    },
    StringLit {
        value: String,
    },
    BoolLit {
        value: bool,
    },
    Null,
    Var {
        name: String,
    },
    Attribute {
        object: Box<Expr>,
        attr: Box<Expr>,
    }, // foo.bar
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    }, // foo['bar']
    BinOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnOp,
        expr: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        #[serde(default)]
        arguments: Vec<Argument>,
    },
    Filter {
        left: Box<Expr>,
        filter: Box<Expr>,
    }, // left | filter
    Is {
        left: Box<Expr>,
        test: Box<Expr>,
    },
    IsNot {
        left: Box<Expr>,
        test: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Slice {
        object: Box<Expr>,
        #[serde(default)]
        start: Option<Box<Expr>>,
        #[serde(default)]
        end: Option<Box<Expr>>,
    },
    Array {
        #[serde(default)]
        items: Vec<Argument>,
    },
    Enclosed {
        expr: Box<Expr>,
    }, // ( expr )
    /// Code that has already been compiled, spliced back verbatim.
    Resolved {
        code: String,
    },
    #[serde(other)]
    Unknown,
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var { name: name.into() }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::StringLit {
            value: value.into(),
        }
    }

    pub fn int(value: i64) -> Self {
        Expr::Integer { value }
    }

    pub fn binop(left: Expr, op: BinOp, right: Expr) -> Self {
        Expr::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn attr(object: Expr, attr: impl Into<String>) -> Self {
        Expr::Attribute {
            object: Box::new(object),
            attr: Box::new(Expr::var(attr)),
        }
    }

    /// Call of a bare function name.
    pub fn call(name: impl Into<String>, arguments: Vec<Argument>) -> Self {
        Expr::Call {
            callee: Box::new(Expr::var(name)),
            arguments,
        }
    }

    pub fn filter(left: Expr, filter: Expr) -> Self {
        Expr::Filter {
            left: Box::new(left),
            filter: Box::new(filter),
        }
    }

    /// Name of a bare identifier, if this is one.
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Var { name } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOp {
    #[default]
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub target: Expr,
    #[serde(default)]
    pub op: AssignOp,
    #[serde(default)]
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroParam {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Text {
        value: String,
    },
    Echo {
        #[serde(default)]
        expr: Option<Expr>,
    },
    If {
        #[serde(default)]
        condition: Option<Expr>,
        #[serde(default)]
        body: Vec<Node>,
        #[serde(default)]
        else_body: Option<Vec<Node>>,
    },
    ElseIf {
        #[serde(default)]
        condition: Option<Expr>,
    },
    Switch {
        #[serde(default)]
        expr: Option<Expr>,
        #[serde(default)]
        cases: Vec<Node>,
    },
    Case {
        #[serde(default)]
        expr: Option<Expr>,
    },
    Default,
    For {
        target: String,
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        iterable: Option<Expr>,
        #[serde(default)]
        guard: Option<Expr>, // for x in xs if guard
        #[serde(default)]
        body: Vec<Node>,
    },
    ElseFor,
    Set {
        #[serde(default)]
        assignments: Vec<Assignment>,
    },
    Block {
        name: String,
        #[serde(default)]
        body: Vec<Node>,
    },
    Extends {
        #[serde(default)]
        path: Option<Expr>,
    },
    Include {
        #[serde(default)]
        path: Option<Expr>,
        #[serde(default)]
        params: Option<Expr>,
    },
    Macro {
        name: String,
        #[serde(default)]
        parameters: Vec<MacroParam>,
        #[serde(default)]
        body: Vec<Node>,
    },
    Do {
        #[serde(default)]
        expr: Option<Expr>,
    },
    Return {
        #[serde(default)]
        expr: Option<Expr>,
    },
    Autoescape {
        #[serde(default)]
        enabled: Option<bool>,
        #[serde(default)]
        body: Vec<Node>,
    },
    Continue,
    Break,
    /// Deprecated fragment cache.
    Cache {
        #[serde(default)]
        key: Option<Expr>,
        #[serde(default)]
        lifetime: Option<Expr>,
        #[serde(default)]
        body: Vec<Node>,
    },
    #[serde(other)]
    Unknown,
}

/// Where a statement came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(flatten)]
    pub pos: Position,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            pos: Position::default(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Text {
            value: value.into(),
        })
    }

    pub fn echo(expr: Expr) -> Self {
        Self::new(NodeKind::Echo { expr: Some(expr) })
    }

    pub fn block(name: impl Into<String>, body: Vec<Node>) -> Self {
        Self::new(NodeKind::Block {
            name: name.into(),
            body,
        })
    }

    /// Attach a source position.
    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.pos = Position {
            file: Some(file.into()),
            line: Some(line),
        };
        self
    }
}

pub type Template = Vec<Node>;
