//! `converge status` — stored snapshots and their schema versions.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use converge_core::CURRENT_VERSION;
use converge_sync::snapshot_store;

use crate::context::Context;

/// Arguments for `converge status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct SnapshotStatus {
    workspace: String,
    version: u32,
    current: bool,
    applied_at: Option<String>,
    age: String,
}

#[derive(Serialize)]
struct StatusReportJson {
    current_version: u32,
    snapshots: Vec<SnapshotStatus>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "workspace")]
    workspace: String,
    #[tabled(rename = "version")]
    version: String,
    #[tabled(rename = "last apply")]
    age: String,
}

impl StatusArgs {
    pub fn run(self, ctx: &Context) -> Result<()> {
        let stored =
            snapshot_store::list_at(&ctx.home).context("failed to read the snapshot store")?;
        let rows: Vec<SnapshotStatus> = stored
            .into_iter()
            .map(|(id, snapshot)| SnapshotStatus {
                workspace: id.to_string(),
                version: snapshot.version,
                current: snapshot.version == CURRENT_VERSION,
                applied_at: snapshot.applied_at.map(|t| t.to_rfc3339()),
                age: snapshot
                    .applied_at
                    .map(format_age)
                    .unwrap_or_else(|| "never".to_string()),
            })
            .collect();

        if self.json {
            let payload = StatusReportJson {
                current_version: CURRENT_VERSION,
                snapshots: rows,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(rows);
        Ok(())
    }
}

fn print_table(rows: Vec<SnapshotStatus>) {
    let outdated = rows.iter().filter(|r| !r.current).count();
    println!(
        "Converge v{} | schema v{CURRENT_VERSION} | {} snapshots | {} outdated",
        env!("CARGO_PKG_VERSION"),
        rows.len(),
        outdated,
    );
    if rows.is_empty() {
        println!("No snapshots stored.");
        return;
    }

    let table_rows: Vec<StatusTableRow> = rows
        .into_iter()
        .map(|row| StatusTableRow {
            workspace: row.workspace,
            version: if row.current {
                format!("v{}", row.version).green().to_string()
            } else {
                format!("v{}", row.version).yellow().bold().to_string()
            },
            age: row.age,
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    if outdated > 0 {
        println!("Run 'converge migrate --all' to upgrade outdated snapshots.");
    }
}

fn format_age(timestamp: DateTime<Utc>) -> String {
    let seconds = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0);
    match seconds {
        s if s < 60 => format!("{s}s ago"),
        s if s < 60 * 60 => format!("{}m ago", s / 60),
        s if s < 60 * 60 * 24 => format!("{}h ago", s / (60 * 60)),
        s => format!("{}d ago", s / (60 * 60 * 24)),
    }
}
