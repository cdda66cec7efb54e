pub mod check;
pub mod render;
pub mod util;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

/// Read a file, or stdin for `-`.
pub fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(Path::new(path)).with_context(|| format!("failed to read {path}"))
}

/// Template text: `template` itself when `inline`, otherwise the file it names.
pub fn read_template(template: &str, inline: bool) -> Result<String> {
    if inline {
        Ok(template.to_string())
    } else {
        read_input(template).context("failed to load template")
    }
}
