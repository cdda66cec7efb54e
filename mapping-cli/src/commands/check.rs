//! `mapping-template check`: parse only.

use anyhow::{Context, Result};
use clap::Args;

use mapping_renderer::MappingTemplate;

use crate::commands::read_template;

/// Arguments for `mapping-template check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Template file (`-` for stdin), or template text with `--inline`.
    pub template: String,

    /// Treat TEMPLATE as template text rather than a file path.
    #[arg(short = 'e', long)]
    pub inline: bool,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let text = read_template(&self.template, self.inline)?;
        MappingTemplate::parse(&text).context("template does not parse")?;
        println!("ok");
        Ok(())
    }
}
