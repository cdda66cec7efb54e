//! `mapping-template render`: render a template against a request.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::debug;

use mapping_renderer::{RenderOptions, RenderRequest, Renderer};

use crate::commands::{read_input, read_template};
use crate::config::Config;

/// Arguments for `mapping-template render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Template file (`-` for stdin), or template text with `--inline`.
    pub template: String,

    /// Treat TEMPLATE as template text rather than a file path.
    #[arg(short = 'e', long)]
    pub inline: bool,

    /// Payload bound to `$input.body`.
    #[arg(long, conflicts_with = "payload_file")]
    pub payload: Option<String>,

    /// Read the payload from a file (`-` for stdin).
    #[arg(long, value_name = "FILE")]
    pub payload_file: Option<String>,

    /// Query-string parameter, `name=value`. Repeatable.
    #[arg(long = "query", value_name = "K=V", value_parser = parse_key_val)]
    pub query: Vec<(String, String)>,

    /// Header, `name=value`. Repeatable.
    #[arg(long = "header", value_name = "K=V", value_parser = parse_key_val)]
    pub header: Vec<(String, String)>,

    /// Path parameter, `name=value`. Repeatable.
    #[arg(long = "path-param", value_name = "K=V", value_parser = parse_key_val)]
    pub path_param: Vec<(String, String)>,

    /// Stage variable, `name=value`. Repeatable.
    #[arg(long = "stage-var", value_name = "K=V", value_parser = parse_key_val)]
    pub stage_var: Vec<(String, String)>,

    /// JSON file bound to `$context`.
    #[arg(long, value_name = "FILE")]
    pub context: Option<PathBuf>,

    /// HTML-escape interpolated references.
    #[arg(long)]
    pub escape: bool,

    /// Render unresolved references as their source text.
    #[arg(long)]
    pub strict: bool,

    /// Maximum items per `#foreach`.
    #[arg(long, value_name = "N")]
    pub max_foreach_iterations: Option<usize>,
}

impl RenderArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let options = self.options(config_path)?;
        if self.template == "-" && !self.inline && self.payload_file.as_deref() == Some("-") {
            bail!("template and payload cannot both be read from stdin");
        }
        let template = read_template(&self.template, self.inline)?;
        let request = self.request()?;
        debug!(?options, "render options");

        let output = Renderer::with_options(options)
            .render_request(&template, &request)
            .context("render failed")?;

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(output.as_bytes()).context("failed to write output")?;
        stdout.flush().context("failed to write output")?;
        Ok(())
    }

    fn options(&self, config_path: Option<&Path>) -> Result<RenderOptions> {
        let mut options = RenderOptions::default();
        Config::load(config_path)?.apply(&mut options);
        if self.escape {
            options.escape = true;
        }
        if self.strict {
            options.silent = false;
        }
        if let Some(limit) = self.max_foreach_iterations {
            options.max_foreach_iterations = limit;
        }
        Ok(options)
    }

    fn request(&self) -> Result<RenderRequest> {
        let body = match (&self.payload, &self.payload_file) {
            (Some(payload), _) => payload.clone(),
            (None, Some(path)) => read_input(path).context("failed to load payload")?,
            (None, None) => String::new(),
        };
        let mut request = RenderRequest::from_body(body);
        request.params.querystring = to_map(&self.query);
        request.params.header = to_map(&self.header);
        request.params.path = to_map(&self.path_param);
        request.stage_variables = to_map(&self.stage_var);
        if let Some(path) = &self.context {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read context {}", path.display()))?;
            request.context = serde_json::from_str(&text)
                .with_context(|| format!("context {} is not valid JSON", path.display()))?;
        }
        Ok(request)
    }
}

fn to_map(pairs: &[(String, String)]) -> BTreeMap<String, String> {
    pairs.iter().cloned().collect()
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{s}'")),
    }
}
