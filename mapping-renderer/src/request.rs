//! Request data a mapping template is rendered against.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Path, query-string and header parameters of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestParams {
    pub path: BTreeMap<String, String>,
    pub querystring: BTreeMap<String, String>,
    pub header: BTreeMap<String, String>,
}

impl RequestParams {
    /// First match in path, then query string, then headers.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.path
            .get(name)
            .or_else(|| self.querystring.get(name))
            .or_else(|| self.header.get(name))
            .map(String::as_str)
    }
}

/// Everything bound into the render context for one call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderRequest {
    /// Raw payload, exposed as `$input.body`.
    pub body: String,
    pub params: RequestParams,
    /// Exposed as `$context` unless `null`.
    pub context: serde_json::Value,
    /// Exposed as `$stageVariables`.
    pub stage_variables: BTreeMap<String, String>,
}

impl RenderRequest {
    /// A request carrying only a payload.
    pub fn from_body(body: impl Into<String>) -> Self {
        RenderRequest {
            body: body.into(),
            ..RenderRequest::default()
        }
    }
}
