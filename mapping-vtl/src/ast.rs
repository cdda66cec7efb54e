//! Syntax tree produced by [`crate::parse`].

/// A parsed template, ready to be rendered any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub(crate) nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, emitted verbatim.
    Text(String),
    /// `$ref` interpolation.
    Reference(Reference),
    /// `#set($target = value)`
    Set { target: Reference, value: Expr },
    /// `#if / #elseif / #else / #end`
    If {
        branches: Vec<(Expr, Vec<Node>)>,
        otherwise: Option<Vec<Node>>,
    },
    /// `#foreach($var in iterable) ... [#else ...] #end`
    Foreach {
        var: String,
        iterable: Expr,
        body: Vec<Node>,
        otherwise: Option<Vec<Node>>,
    },
    Break,
    Stop,
}

/// `$name.segment...`, with the raw source kept for non-silent rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub name: String,
    pub segments: Vec<Segment>,
    /// `$!name`: never echo the source text.
    pub quiet: bool,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Property(String),
    Method(String, Vec<Expr>),
    Index(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// `'single quoted'`
    Str(String),
    /// `"double quoted"`, rendered as a nested template.
    Interpolated(Vec<Node>),
    List(Vec<Expr>),
    Range(Box<Expr>, Box<Expr>),
    Map(Vec<(Expr, Expr)>),
    Ref(Reference),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}
