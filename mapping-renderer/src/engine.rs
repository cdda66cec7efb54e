//! Render entry points: [`render`], [`Renderer`] and [`MappingTemplate`].

use mapping_vtl::{EvalOptions, Template};
use tracing::debug;

use crate::context::RenderContext;
use crate::error::RenderError;
use crate::request::RenderRequest;

/// Evaluation options for mapping templates: raw output, silent references
/// and the API Gateway `#foreach` limit by default.
pub type RenderOptions = EvalOptions;

/// Render `template` with `$input.body` bound to `payload`.
///
/// ```rust
/// let out = mapping_renderer::render("$util.base64Encode('Hello, World!')", "").unwrap();
/// assert_eq!(out, "SGVsbG8sIFdvcmxkIQ==");
/// ```
pub fn render(template: &str, payload: &str) -> Result<String, RenderError> {
    Renderer::new().render(template, payload)
}

// ---------------------------------------------------------------------------
// MappingTemplate
// ---------------------------------------------------------------------------

/// A parsed mapping template. Parse once, render against many requests.
#[derive(Debug, Clone)]
pub struct MappingTemplate {
    template: Template,
}

impl MappingTemplate {
    pub fn parse(text: &str) -> Result<Self, RenderError> {
        debug!(template_len = text.len(), "parsing mapping template");
        let template = Template::parse(text)?;
        Ok(MappingTemplate { template })
    }

    /// Render against `request` with a fresh Render Context.
    pub fn render(&self, options: &RenderOptions, request: &RenderRequest) -> Result<String, RenderError> {
        debug!(
            payload_len = request.body.len(),
            escape = options.escape,
            silent = options.silent,
            "rendering mapping template"
        );
        let context = RenderContext::from_request(request).into_vtl_context();
        let output = self.template.render(&context, options)?;
        debug!(output_len = output.len(), "rendered mapping template");
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Parses and renders templates with a fixed set of [`RenderOptions`].
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    /// Renderer with the default options (no escaping, silent mode).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RenderOptions) -> Self {
        Renderer { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render `template` with `$input.body` bound to `payload`.
    pub fn render(&self, template: &str, payload: &str) -> Result<String, RenderError> {
        self.render_request(template, &RenderRequest::from_body(payload))
    }

    /// Render `template` against a full request.
    pub fn render_request(&self, template: &str, request: &RenderRequest) -> Result<String, RenderError> {
        MappingTemplate::parse(template)?.render(&self.options, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_defaults_match_api_gateway() {
        let renderer = Renderer::new();
        assert!(!renderer.options().escape);
        assert!(renderer.options().silent);
    }

    #[test]
    fn parsed_template_renders_many_requests() {
        let template = MappingTemplate::parse("[$input.body]").unwrap();
        let options = RenderOptions::default();
        for body in ["a", "", "{\"k\": 1}"] {
            let out = template.render(&options, &RenderRequest::from_body(body)).unwrap();
            assert_eq!(out, format!("[{body}]"));
        }
    }

    #[test]
    fn parse_errors_surface_as_parse_variant() {
        let err = render("#if($x) never closed", "").unwrap_err();
        assert!(matches!(err, RenderError::Parse(_)));
        assert!(err.util_error().is_none());
    }

    #[test]
    fn helper_errors_surface_as_evaluation_variant() {
        let err = render("$util.base64Decode('***')", "").unwrap_err();
        assert!(matches!(err, RenderError::Evaluation(_)));
        assert!(err.util_error().is_some());
    }
}
