//! cli::commands::normalize
//!
//! Normalize a JSON schema file, printing the result or rewriting the file.

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use serde_json::Value;

use super::Context;
use crate::core::manifest::render;
use crate::core::schema;
use crate::ui::output;

/// Normalize command entry point.
pub fn normalize(ctx: &Context, file: &Path, write: bool) -> Result<()> {
    let path = if file.is_absolute() {
        file.to_path_buf()
    } else {
        ctx.cwd()?.join(file)
    };

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("'{}' is not valid JSON", path.display()))?;

    let normalized = schema::normalize(value.clone());
    let rendered = render(&normalized);

    if write {
        if normalized == value {
            output::print(format!("{} already normalized", path.display()), ctx.verbosity);
            return Ok(());
        }
        fs::write(&path, rendered)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        output::print(format!("Normalized {}", path.display()), ctx.verbosity);
    } else {
        print!("{}", rendered);
    }

    Ok(())
}
