//! cli::commands::publish
//!
//! Run the full pipeline and publish to the remote branch.
//!
//! # Design
//!
//! A dry run stops after staging and never builds a forge, so it needs no
//! token. A real run resolves the token and the hosted repository before
//! touching anything, so a misconfigured run fails without side effects.

use anyhow::Result;

use super::Context;
use crate::cli::args::PipelineArgs;
use crate::core::types::BranchName;
use crate::engine::{Pipeline, PipelineOutcome, Staged};
use crate::forge::github::DEFAULT_API_BASE;
use crate::forge::{create_forge, resolve_repository};
use crate::ui::output::{self, format_commit, format_list};

/// Publish command entry point.
pub fn publish(ctx: &Context, args: &PipelineArgs, dry_run: bool) -> Result<()> {
    let git = ctx.open_git()?;
    let root = git.work_dir()?.to_path_buf();
    let config = ctx.load_config(&root, args, dry_run)?;

    if config.dry_run {
        let pipeline = Pipeline::from_config(config);
        let outcome = match pipeline.stage(&git)? {
            Staged::NoChanges => PipelineOutcome::NoChanges,
            Staged::Ready { changes, unit } => {
                output::debug(
                    format!("changed: {}", changes.changed.join(", ")),
                    ctx.verbosity,
                );
                PipelineOutcome::DryRun {
                    files: unit.paths(),
                }
            }
        };
        output::print(summary(&outcome, &pipeline.config().branch), ctx.verbosity);
        return Ok(());
    }

    let token = config.require_token()?.to_string();
    let origin = git.remote_url("origin")?;
    let repository = resolve_repository(config.repository.as_ref(), origin.as_deref())?;
    let api_base = config
        .api_base
        .clone()
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    output::debug(
        format!("publishing to {} via {}", repository, api_base),
        ctx.verbosity,
    );
    let forge = create_forge(repository, &token, &api_base);

    let pipeline = Pipeline::from_config(config);
    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(pipeline.run(&git, forge.as_ref()))?;

    output::print(summary(&outcome, &pipeline.config().branch), ctx.verbosity);
    Ok(())
}

/// What to tell the user about a finished run.
fn summary(outcome: &PipelineOutcome, branch: &BranchName) -> String {
    match outcome {
        PipelineOutcome::NoChanges => "No changes to publish.".to_string(),
        PipelineOutcome::DryRun { files } => format!(
            "Would publish {} file(s) to '{}':\n{}",
            files.len(),
            branch,
            format_list(files, "  ")
        ),
        PipelineOutcome::Published { commit, files } => format!(
            "Published {} file(s) to '{}' at {}",
            files.len(),
            branch,
            format_commit(commit)
        ),
    }
}
