//! Render Context: the `$input` and `$util` host objects and the variable
//! bindings built fresh for every render.

use mapping_vtl::{Context, EvalError, Map, Object, Value};

use crate::error::UtilError;
use crate::jsonpath;
use crate::request::{RenderRequest, RequestParams};
use crate::util;

// ---------------------------------------------------------------------------
// $util
// ---------------------------------------------------------------------------

/// `$util`: the six helpers, each taking exactly one argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct Util;

impl Util {
    pub const METHODS: &'static [&'static str] = &[
        "base64Encode",
        "base64Decode",
        "urlEncode",
        "urlDecode",
        "escapeJavaScript",
        "parseJson",
    ];

    /// Run helper `method` on `input`. `Ok(None)` for an unknown name.
    pub fn invoke(method: &str, input: &str) -> Result<Option<Value>, UtilError> {
        let value = match method {
            "base64Encode" => Value::from(util::base64_encode(input)?),
            "base64Decode" => Value::from(util::base64_decode(input)?),
            "urlEncode" => Value::from(util::url_encode(input)),
            "urlDecode" => Value::from(util::url_decode(input)?),
            "escapeJavaScript" => Value::from(util::escape_javascript(input)),
            "parseJson" => Value::from(util::parse_json(input)?),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}

impl Object for Util {
    fn call(&self, method: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
        if !Util::METHODS.contains(&method) {
            return Ok(None);
        }
        let qualified = format!("util.{method}");
        EvalError::check_arity(&qualified, 1, args.len())?;
        let input = match &args[0] {
            Value::Null => return Ok(None),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Util::invoke(method, &input).map_err(|e| EvalError::method(qualified, e))
    }
}

// ---------------------------------------------------------------------------
// $input
// ---------------------------------------------------------------------------

/// `$input`: the payload plus request parameters.
#[derive(Debug, Clone, Default)]
pub struct Input {
    body: String,
    params: RequestParams,
}

impl Input {
    pub fn new(body: impl Into<String>, params: RequestParams) -> Self {
        Input { body: body.into(), params }
    }

    fn all_params(&self) -> Value {
        let section = |entries: &std::collections::BTreeMap<String, String>| {
            Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                    .collect(),
            )
        };
        let mut map = Map::new();
        map.insert("path".to_string(), section(&self.params.path));
        map.insert("querystring".to_string(), section(&self.params.querystring));
        map.insert("header".to_string(), section(&self.params.header));
        Value::Map(map)
    }

    fn select(&self, method: &str, expr: &Value) -> Result<serde_json::Value, EvalError> {
        let fail = |e: UtilError| EvalError::method(format!("input.{method}"), e);
        let root = util::parse_json(&self.body).map_err(fail)?;
        jsonpath::select(&root, &expr.to_string()).map_err(fail)
    }
}

impl Object for Input {
    fn property(&self, name: &str) -> Option<Value> {
        (name == "body").then(|| Value::from(self.body.as_str()))
    }

    fn call(&self, method: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
        match (method, args) {
            ("body", []) => Ok(Some(Value::from(self.body.as_str()))),
            ("params", []) => Ok(Some(self.all_params())),
            ("params", [name]) => {
                let found = self.params.lookup(&name.to_string()).unwrap_or_default();
                Ok(Some(Value::from(found)))
            }
            ("path", [expr]) => Ok(Some(Value::from(self.select(method, expr)?))),
            ("json", [expr]) => Ok(Some(Value::from(self.select(method, expr)?.to_string()))),
            ("params" | "path" | "json", _) => {
                Err(EvalError::Arity { method: format!("input.{method}"), expected: 1, found: args.len() })
            }
            _ => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// RenderContext
// ---------------------------------------------------------------------------

/// Per-call variable bindings: `input`, `util`, and when present `context`
/// and `stageVariables`.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub input: Input,
    pub context: Option<serde_json::Value>,
    pub stage_variables: Map,
}

impl RenderContext {
    pub fn from_request(request: &RenderRequest) -> Self {
        RenderContext {
            input: Input::new(request.body.as_str(), request.params.clone()),
            context: (!request.context.is_null()).then(|| request.context.clone()),
            stage_variables: request
                .stage_variables
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect(),
        }
    }

    /// Convert into the evaluator's [`Context`].
    pub fn into_vtl_context(self) -> Context {
        let mut ctx = Context::new()
            .with("input", Value::object(self.input))
            .with("util", Value::object(Util))
            .with("stageVariables", Value::Map(self.stage_variables));
        if let Some(context) = self.context {
            ctx.insert("context", Value::from(context));
        }
        ctx
    }
}
