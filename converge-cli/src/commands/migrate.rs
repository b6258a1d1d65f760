//! `converge migrate` — upgrade stored snapshots to the current schema.

use anyhow::{bail, Context as _, Result};
use clap::Args;

use converge_core::{PersistedSnapshot, WorkspaceId, WorkspaceSnapshot};
use converge_remote::RemoteApi;
use converge_sync::{load_and_migrate, snapshot_store, MigrationOutcome};

use crate::context::Context;

/// Arguments for `converge migrate`.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Workspace whose stored snapshot to migrate (omit when using `--all`).
    pub workspace: Option<String>,

    /// Migrate every stored snapshot.
    #[arg(long, conflicts_with = "workspace")]
    pub all: bool,
}

impl MigrateArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let targets: Vec<(WorkspaceId, PersistedSnapshot)> = if self.all {
            snapshot_store::list_at(&ctx.home).context("failed to list stored snapshots")?
        } else {
            let Some(id) = self.workspace.map(WorkspaceId::from) else {
                bail!("provide a workspace id or use --all");
            };
            let stored = snapshot_store::load_at(&ctx.home, &id)
                .with_context(|| format!("failed to load snapshot for '{id}'"))?
                .with_context(|| format!("no snapshot stored for '{id}'"))?;
            vec![(id, stored)]
        };
        if targets.is_empty() {
            println!("No snapshots stored. Run `converge apply` first.");
            return Ok(());
        }

        let remote = ctx.connect()?;
        for (id, stored) in &targets {
            migrate_one(ctx, remote.api(), id, stored)?;
        }
        Ok(())
    }
}

fn migrate_one(
    ctx: &Context,
    api: &dyn RemoteApi,
    id: &WorkspaceId,
    stored: &PersistedSnapshot,
) -> Result<()> {
    let outcome = load_and_migrate(api, stored)
        .with_context(|| format!("migration failed for '{id}'; stored snapshot left as is"))?;

    match outcome {
        MigrationOutcome::Current(_) => {
            println!("✓ '{id}' — already at v{}", stored.version);
        }
        MigrationOutcome::Migrated { from, path, model } => {
            let snapshot = WorkspaceSnapshot::V4(model).encode(stored.applied_at)?;
            snapshot_store::save_at(&ctx.home, id, &snapshot)
                .with_context(|| format!("failed to save snapshot for '{id}'"))?;
            let steps: Vec<String> = path.iter().map(|v| format!("v{v}")).collect();
            println!("✓ '{id}' migrated v{from} → {}", steps.join(" → "));
        }
        MigrationOutcome::Deleted { workspace } => {
            snapshot_store::clear_at(&ctx.home, id)
                .with_context(|| format!("failed to clear snapshot for '{id}'"))?;
            println!("✗ '{id}' — workspace {workspace} no longer exists; snapshot cleared");
        }
    }
    Ok(())
}
