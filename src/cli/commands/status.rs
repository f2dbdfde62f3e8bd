//! cli::commands::status
//!
//! Show which publishable files differ from `HEAD`.
//!
//! This stages the candidates, exactly like a publish would, but does not
//! regenerate the manifest first.

use anyhow::Result;

use super::Context;
use crate::cli::args::PipelineArgs;
use crate::engine::ChangeDetector;
use crate::ui::output::{self, format_list};

/// Status command entry point.
pub fn status(ctx: &Context, args: &PipelineArgs) -> Result<()> {
    let git = ctx.open_git()?;
    let root = git.work_dir()?.to_path_buf();
    let config = ctx.load_config(&root, args, false)?;

    let changes = ChangeDetector::new(&git).detect(&config.manifest_path, &config.output_dir)?;

    if changes.has_changes() {
        output::print(
            format!("{} file(s) differ from HEAD:", changes.changed.len()),
            ctx.verbosity,
        );
        output::print(format_list(&changes.changed, "  "), ctx.verbosity);
    } else {
        output::print("Nothing to publish.", ctx.verbosity);
    }
    Ok(())
}
