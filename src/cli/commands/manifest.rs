//! cli::commands::manifest
//!
//! Update the manifest from the compiled schema module. No network.

use anyhow::Result;

use super::Context;
use crate::cli::args::PipelineArgs;
use crate::engine::Pipeline;
use crate::ui::output;

/// Manifest command entry point.
pub fn manifest(ctx: &Context, args: &PipelineArgs) -> Result<()> {
    let root = ctx.project_root()?;
    let pipeline = Pipeline::from_config(ctx.load_config(&root, args, false)?);

    pipeline.prepare_manifest()?;

    output::print(
        format!("Updated {}", pipeline.config().manifest_path.display()),
        ctx.verbosity,
    );
    Ok(())
}
