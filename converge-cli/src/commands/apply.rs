//! `converge apply` — converge a workspace and record its V4 snapshot.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::Args;

use converge_core::WorkspaceId;
use converge_sync::{
    reconcile, snapshot_store, to_snapshot, ActionOutcome, ReconcileOptions, SyncError,
    WriteResult,
};

use super::{action_marker, load_declaration, orphaned};
use crate::context::Context;

/// Arguments for `converge apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Declaration file (YAML).
    pub declaration: PathBuf,

    /// Workspace to converge (defaults to the declaration's `id`).
    #[arg(long)]
    pub workspace: Option<String>,

    /// List the remote calls without issuing any or saving a snapshot.
    #[arg(long)]
    pub dry_run: bool,
}

impl ApplyArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let (declared, id) = load_declaration(&self.declaration, self.workspace.as_deref())?;
        let remote = ctx.connect()?;
        let options = ReconcileOptions {
            dry_run: self.dry_run,
            page_size: ctx.settings.page_size(),
        };

        let result = reconcile(remote.api(), &ctx.extractor(), &declared, &id, options);
        // Calls issued before a failure still changed the remote.
        if !self.dry_run {
            remote.persist()?;
        }
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(SyncError::NotFound { .. }) => {
                if !self.dry_run
                    && snapshot_store::clear_at(&ctx.home, &id)
                        .with_context(|| format!("failed to clear snapshot for '{id}'"))?
                {
                    eprintln!("cleared stored snapshot for '{id}'");
                }
                return Err(orphaned(&id, &self.declaration));
            }
            Err(e) => return Err(e).with_context(|| format!("apply failed for '{id}'")),
        };

        print_outcomes(&id, &outcome.outcomes, self.dry_run);

        let Some(model) = outcome.model else {
            return Ok(());
        };
        let mut snapshot = to_snapshot(&model, Utc::now())?;
        if let Some(previous) = snapshot_store::load_at(&ctx.home, &id)? {
            if previous.version == snapshot.version && previous.fields == snapshot.fields {
                snapshot.applied_at = previous.applied_at;
            }
        }
        match snapshot_store::save_at(&ctx.home, &id, &snapshot)
            .with_context(|| format!("failed to save snapshot for '{id}'"))?
        {
            WriteResult::Written { path } => println!("  ✎  {}", path.display()),
            WriteResult::Unchanged { path } => println!("  ·  {}", path.display()),
        }
        Ok(())
    }
}

fn print_outcomes(id: &WorkspaceId, outcomes: &[ActionOutcome], dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    if outcomes.is_empty() {
        println!("{prefix}✓ '{id}' — nothing to do");
        return;
    }

    if dry_run {
        println!("{prefix}'{id}': {} call(s) would be issued", outcomes.len());
    } else {
        println!("✓ '{id}' converged ({} call(s) applied)", outcomes.len());
    }
    for outcome in outcomes {
        let action = outcome.action();
        println!("  {}  {action}", action_marker(action));
    }
}
