//! Converge — keep remote workspaces in line with their declarations.
//!
//! # Usage
//!
//! ```text
//! converge plan <decl.yaml> [--workspace <id>]
//! converge apply <decl.yaml> [--workspace <id>] [--dry-run]
//! converge migrate <workspace-id> | --all
//! converge status [--json]
//! ```
//!
//! Global: `--hostname`, `--token`, `--account-id` (or `CONVERGE_*`),
//! `--offline <state.json>`, `-v`/`-vv`.

mod commands;
mod context;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{apply::ApplyArgs, migrate::MigrateArgs, plan::PlanArgs, status::StatusArgs};
use context::{Context, GlobalArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "converge",
    version,
    about = "Converge remote workspaces to their declared configuration",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the changes needed to converge a workspace to a declaration.
    Plan(PlanArgs),

    /// Converge a workspace and record its snapshot.
    Apply(ApplyArgs),

    /// Upgrade stored snapshots to the current schema version.
    Migrate(MigrateArgs),

    /// List stored snapshots.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let ctx = Context::load(&cli.global)?;
    match cli.command {
        Commands::Plan(args) => args.run(&ctx),
        Commands::Apply(args) => args.run(&ctx),
        Commands::Migrate(args) => args.run(&ctx),
        Commands::Status(args) => args.run(&ctx),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env = env_logger::Env::default().default_filter_or(default);
    let _ = env_logger::Builder::from_env(env)
        .format_target(false)
        .try_init();
}
