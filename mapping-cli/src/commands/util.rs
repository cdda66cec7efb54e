//! `mapping-template util`: run one `$util` helper.

use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::Args;

use mapping_renderer::{util, Util};

use crate::commands::read_input;

/// Arguments for `mapping-template util`.
#[derive(Args, Debug)]
pub struct UtilArgs {
    /// Helper name, as called from templates.
    #[arg(value_parser = PossibleValuesParser::new(Util::METHODS.iter().copied()))]
    pub function: String,

    /// Input string (read from stdin when omitted).
    pub input: Option<String>,
}

impl UtilArgs {
    pub fn run(self) -> Result<()> {
        let input = match self.input {
            Some(input) => input,
            None => read_input("-")?,
        };
        let function = self.function.as_str();
        let output = if function == "parseJson" {
            let value = util::parse_json(&input).context("parseJson failed")?;
            serde_json::to_string(&value).context("failed to serialize JSON")?
        } else {
            Util::invoke(function, &input)
                .with_context(|| format!("{function} failed"))?
                .with_context(|| format!("unknown helper '{function}'"))?
                .to_string()
        };
        println!("{output}");
        Ok(())
    }
}
