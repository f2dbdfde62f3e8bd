//! cli::commands::schema
//!
//! Print the settings schema extracted from the compiled module.

use anyhow::{Context as _, Result};

use super::Context;
use crate::cli::args::PipelineArgs;
use crate::core::schema::normalize;
use crate::engine::Pipeline;

/// Schema command entry point.
///
/// The schema is the command's result, so it is printed even in quiet mode.
pub fn schema(ctx: &Context, args: &PipelineArgs, raw: bool) -> Result<()> {
    let root = ctx.project_root()?;
    let pipeline = Pipeline::from_config(ctx.load_config(&root, args, false)?);

    let mut schema = pipeline.load_schema()?;
    if !raw {
        schema = normalize(schema);
    }

    let rendered = serde_json::to_string_pretty(&schema).context("failed to render schema")?;
    println!("{}", rendered);
    Ok(())
}
