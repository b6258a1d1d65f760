//! `converge plan` — show what `apply` would change, without changing it.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;

use converge_sync::{pipeline, SyncError};

use super::{action_marker, load_declaration, orphaned};
use crate::context::Context;

/// Arguments for `converge plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Declaration file (YAML).
    pub declaration: PathBuf,

    /// Workspace to plan against (defaults to the declaration's `id`).
    #[arg(long)]
    pub workspace: Option<String>,
}

impl PlanArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let (declared, id) = load_declaration(&self.declaration, self.workspace.as_deref())?;
        let remote = ctx.connect()?;

        let planned = match pipeline::plan(
            remote.api(),
            &ctx.extractor(),
            &declared,
            &id,
            ctx.settings.page_size(),
        ) {
            Ok(planned) => planned,
            Err(SyncError::NotFound { .. }) => return Err(orphaned(&id, &self.declaration)),
            Err(e) => return Err(e).with_context(|| format!("plan failed for '{id}'")),
        };

        let actions = planned.plan.actions();
        if actions.is_empty() {
            println!("✓ '{id}' — no changes");
            return Ok(());
        }

        println!("{} '{id}': {} change(s)", "Plan".bold(), actions.len());
        for action in &actions {
            println!("  {}  {action}", action_marker(action));
        }
        if !planned.plan.patch.is_empty() {
            let body = serde_json::to_string_pretty(&planned.plan.patch)
                .context("failed to render workspace patch")?;
            println!("{}", "workspace attributes:".bright_black());
            for line in body.lines() {
                println!("    {line}");
            }
        }
        Ok(())
    }
}
