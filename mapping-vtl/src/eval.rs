//! Tree-walking evaluator: [`Context`], [`EvalOptions`] and
//! [`Template::render`].
//!
//! Every render works on its own copy of the context variables, so `#set`
//! and collection mutators never leak into the caller's [`Context`] or into
//! other renders of the same [`Template`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::{BinaryOp, Expr, Node, Reference, Segment, Template};
use crate::error::EvalError;
use crate::methods;
use crate::ops;
use crate::value::{Map, Value};

/// Loop limit applied by API Gateway to a single `#foreach`.
pub const DEFAULT_MAX_FOREACH_ITERATIONS: usize = 1000;

/// Evaluation switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalOptions {
    /// HTML-escape the output of reference interpolations.
    pub escape: bool,
    /// Render unresolved references as nothing instead of their source text.
    pub silent: bool,
    /// Maximum number of items a single `#foreach` or range may produce.
    pub max_foreach_iterations: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            escape: false,
            silent: true,
            max_foreach_iterations: DEFAULT_MAX_FOREACH_ITERATIONS,
        }
    }
}

/// Root variables visible to a template.
#[derive(Debug, Clone, Default)]
pub struct Context {
    vars: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any previous binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Builder form of [`Context::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }
}

impl Template {
    /// Parse template text. Same as [`crate::parse`].
    pub fn parse(src: &str) -> Result<Template, crate::ParseError> {
        crate::parser::parse(src)
    }

    /// Render against `context`.
    ///
    /// Errors raised by host object methods abort the render whatever the
    /// `silent` setting.
    pub fn render(&self, context: &Context, options: &EvalOptions) -> Result<String, EvalError> {
        let mut evaluator = Evaluator {
            vars: context.vars.clone(),
            options,
        };
        let mut out = String::new();
        evaluator.block(&self.nodes, &mut out, true)?;
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Break,
    Stop,
}

/// One step from a root variable towards a nested value.
#[derive(Debug, Clone)]
enum Key {
    Name(String),
    Index(Value),
}

struct Evaluator<'o> {
    vars: HashMap<String, Value>,
    options: &'o EvalOptions,
}

impl Evaluator<'_> {
    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    fn block(&mut self, nodes: &[Node], out: &mut String, escape: bool) -> Result<Flow, EvalError> {
        for node in nodes {
            let flow = self.node(node, out, escape)?;
            if flow != Flow::Next {
                return Ok(flow);
            }
        }
        Ok(Flow::Next)
    }

    fn node(&mut self, node: &Node, out: &mut String, escape: bool) -> Result<Flow, EvalError> {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Reference(reference) => self.interpolate(reference, out, escape)?,
            Node::Set { target, value } => {
                let value = self.eval(value)?.unwrap_or_default();
                self.assign(target, value)?;
            }
            Node::If { branches, otherwise } => {
                for (cond, body) in branches {
                    if ops::truthy(&self.eval(cond)?) {
                        return self.block(body, out, escape);
                    }
                }
                if let Some(body) = otherwise {
                    return self.block(body, out, escape);
                }
            }
            Node::Foreach { var, iterable, body, otherwise } => {
                return self.foreach(var, iterable, body, otherwise.as_deref(), out, escape);
            }
            Node::Break => return Ok(Flow::Break),
            Node::Stop => return Ok(Flow::Stop),
        }
        Ok(Flow::Next)
    }

    fn interpolate(&mut self, reference: &Reference, out: &mut String, escape: bool) -> Result<(), EvalError> {
        match self.resolve(reference)? {
            Some(value) if !value.is_null() => {
                let text = value.to_string();
                if escape && self.options.escape {
                    push_html_escaped(out, &text);
                } else {
                    out.push_str(&text);
                }
            }
            _ if reference.quiet || self.options.silent => {}
            _ => out.push_str(&reference.source),
        }
        Ok(())
    }

    fn foreach(
        &mut self,
        var: &str,
        iterable: &Expr,
        body: &[Node],
        otherwise: Option<&[Node]>,
        out: &mut String,
        escape: bool,
    ) -> Result<Flow, EvalError> {
        let items = match self.eval(iterable)? {
            Some(Value::List(items)) => items,
            Some(Value::Map(map)) => map.into_values().collect(),
            _ => Vec::new(),
        };
        if items.is_empty() {
            return match otherwise {
                Some(body) => self.block(body, out, escape),
                None => Ok(Flow::Next),
            };
        }
        let limit = self.options.max_foreach_iterations;
        if items.len() > limit {
            return Err(EvalError::LoopLimit { limit });
        }

        let saved: Vec<(&str, Option<Value>)> = [var, "foreach", "velocityCount"]
            .into_iter()
            .map(|name| (name, self.vars.get(name).cloned()))
            .collect();

        let total = items.len();
        let mut flow = Flow::Next;
        for (index, item) in items.into_iter().enumerate() {
            self.vars.insert(var.to_string(), item);
            self.vars.insert("foreach".to_string(), loop_state(index, total));
            self.vars.insert("velocityCount".to_string(), Value::from(index + 1));
            match self.block(body, out, escape)? {
                Flow::Next => {}
                Flow::Break => break,
                Flow::Stop => {
                    flow = Flow::Stop;
                    break;
                }
            }
        }

        for (name, value) in saved.into_iter().rev() {
            match value {
                Some(value) => self.vars.insert(name.to_string(), value),
                None => self.vars.remove(name),
            };
        }
        Ok(flow)
    }

    // -----------------------------------------------------------------------
    // References and assignment
    // -----------------------------------------------------------------------

    /// Walk a reference chain. `None` means unresolved.
    fn resolve(&mut self, reference: &Reference) -> Result<Option<Value>, EvalError> {
        let Some(mut current) = self.vars.get(&reference.name).cloned() else {
            return Ok(None);
        };
        // Keys from the root variable, as long as the chain is still a place
        // a mutator can write through.
        let mut path = Some(Vec::new());

        for segment in &reference.segments {
            let next = match segment {
                Segment::Property(name) => {
                    if let Some(path) = path.as_mut() {
                        path.push(Key::Name(name.clone()));
                    }
                    methods::property(&current, name)
                }
                Segment::Index(expr) => {
                    let Some(index) = self.eval(expr)? else {
                        return Ok(None);
                    };
                    let next = methods::index(&current, &index);
                    if let Some(path) = path.as_mut() {
                        path.push(Key::Index(index));
                    }
                    next
                }
                Segment::Method(name, args) => {
                    let args = self.args(args)?;
                    let collection = matches!(current, Value::List(_) | Value::Map(_));
                    let result = if collection && methods::is_mutator(name) {
                        match path.as_deref().and_then(|p| self.place_mut(&reference.name, p)) {
                            Some(place) => methods::mutate(place, name, &args),
                            None => methods::mutate(&mut current, name, &args),
                        }
                    } else {
                        methods::call(&current, name, &args)?
                    };
                    path = None;
                    result
                }
            };
            match next {
                Some(value) => current = value,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Method arguments; unresolved arguments are passed as `null`.
    fn args(&mut self, args: &[Expr]) -> Result<Vec<Value>, EvalError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?.unwrap_or_default());
        }
        Ok(values)
    }

    fn place_mut(&mut self, name: &str, path: &[Key]) -> Option<&mut Value> {
        let mut place = self.vars.get_mut(name)?;
        for key in path {
            place = step_mut(place, key)?;
        }
        Some(place)
    }

    fn key(&mut self, segment: &Segment) -> Result<Option<Key>, EvalError> {
        Ok(match segment {
            Segment::Property(name) => Some(Key::Name(name.clone())),
            Segment::Index(expr) => self.eval(expr)?.map(Key::Index),
            Segment::Method(..) => None,
        })
    }

    /// `#set`. Assignments through a missing or non-collection parent are
    /// ignored.
    fn assign(&mut self, target: &Reference, value: Value) -> Result<(), EvalError> {
        let Some((last, parents)) = target.segments.split_last() else {
            self.vars.insert(target.name.clone(), value);
            return Ok(());
        };
        let mut path = Vec::with_capacity(parents.len());
        for segment in parents {
            match self.key(segment)? {
                Some(key) => path.push(key),
                None => return Ok(()),
            }
        }
        let Some(last) = self.key(last)? else {
            return Ok(());
        };
        let Some(place) = self.place_mut(&target.name, &path) else {
            return Ok(());
        };
        match (place, last) {
            (Value::Map(map), Key::Name(key)) => {
                map.insert(key, value);
            }
            (Value::Map(map), Key::Index(key)) => {
                map.insert(key.to_string(), value);
            }
            (Value::List(items), Key::Index(at)) => {
                let slot = at
                    .as_index()
                    .and_then(|i| usize::try_from(i).ok())
                    .and_then(|i| items.get_mut(i));
                if let Some(slot) = slot {
                    *slot = value;
                }
            }
            _ => {}
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn eval(&mut self, expr: &Expr) -> Result<Option<Value>, EvalError> {
        let value = match expr {
            Expr::Null => Value::Null,
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Int(i) => Value::Int(*i),
            Expr::Float(f) => Value::Float(*f),
            Expr::Str(s) => Value::String(s.clone()),
            Expr::Interpolated(nodes) => {
                let mut text = String::new();
                self.block(nodes, &mut text, false)?;
                Value::String(text)
            }
            Expr::List(items) => Value::List(self.args(items)?),
            Expr::Range(from, to) => return self.range(from, to),
            Expr::Map(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.eval(key)?.unwrap_or_default().to_string();
                    let value = self.eval(value)?.unwrap_or_default();
                    map.insert(key, value);
                }
                Value::Map(map)
            }
            Expr::Ref(reference) => return self.resolve(reference),
            Expr::Unary(op, operand) => {
                let operand = self.eval(operand)?;
                return Ok(ops::unary(*op, operand));
            }
            Expr::Binary(op @ (BinaryOp::And | BinaryOp::Or), lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                if let Some(decided) = ops::short_circuit(*op, &lhs) {
                    return Ok(Some(Value::Bool(decided)));
                }
                let rhs = self.eval(rhs)?;
                return Ok(ops::binary(*op, lhs, rhs));
            }
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                return Ok(ops::binary(*op, lhs, rhs));
            }
        };
        Ok(Some(value))
    }

    /// `[from..to]`, inclusive in both directions.
    fn range(&mut self, from: &Expr, to: &Expr) -> Result<Option<Value>, EvalError> {
        let from = self.eval(from)?.and_then(|v| v.as_index());
        let to = self.eval(to)?.and_then(|v| v.as_index());
        let (Some(from), Some(to)) = (from, to) else {
            return Ok(None);
        };
        let limit = self.options.max_foreach_iterations;
        if from.abs_diff(to).saturating_add(1) > limit as u64 {
            return Err(EvalError::LoopLimit { limit });
        }
        let items = if from <= to {
            (from..=to).map(Value::Int).collect()
        } else {
            (to..=from).rev().map(Value::Int).collect()
        };
        Ok(Some(Value::List(items)))
    }
}

fn step_mut<'v>(value: &'v mut Value, key: &Key) -> Option<&'v mut Value> {
    match (value, key) {
        (Value::Map(map), Key::Name(name)) => map.get_mut(name.as_str()),
        (Value::Map(map), Key::Index(index)) => map.get_mut(index.to_string().as_str()),
        (Value::List(items), Key::Index(index)) => {
            let at = usize::try_from(index.as_index()?).ok()?;
            items.get_mut(at)
        }
        _ => None,
    }
}

/// `$foreach` inside a loop body.
fn loop_state(index: usize, total: usize) -> Value {
    let mut state = Map::new();
    state.insert("index".to_string(), Value::from(index));
    state.insert("count".to_string(), Value::from(index + 1));
    state.insert("hasNext".to_string(), Value::Bool(index + 1 < total));
    state.insert("first".to_string(), Value::Bool(index == 0));
    state.insert("last".to_string(), Value::Bool(index + 1 == total));
    Value::Map(state)
}

fn push_html_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}
