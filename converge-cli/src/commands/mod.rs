pub mod apply;
pub mod migrate;
pub mod plan;
pub mod status;

use std::path::Path;

use anyhow::{bail, Context as _, Result};
use colored::{ColoredString, Colorize};

use converge_core::{declared, DeclaredConfiguration, WorkspaceId};
use converge_sync::Action;

/// Load a declaration and decide which workspace it targets: `--workspace`
/// wins over the declaration's own `id`.
fn load_declaration(
    path: &Path,
    workspace: Option<&str>,
) -> Result<(DeclaredConfiguration, WorkspaceId)> {
    let declared = declared::load_at(path)
        .with_context(|| format!("failed to load declaration {}", path.display()))?;
    let id = match (workspace, &declared.id) {
        (Some(id), _) => WorkspaceId::from(id),
        (None, Some(id)) => id.clone(),
        (None, None) => bail!(
            "{} has no workspace id; pass --workspace <id>",
            path.display()
        ),
    };
    Ok((declared, id))
}

fn orphaned(id: &WorkspaceId, path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "orphaned declaration: workspace {id} declared in {} no longer exists on the remote",
        path.display()
    )
}

fn action_marker(action: &Action) -> ColoredString {
    match action {
        Action::UpdateWorkspace(_) | Action::SetShareFlag(_) => "~".yellow().bold(),
        Action::BulkRemove(..) | Action::Delete(..) | Action::ClearSshKey => "-".red().bold(),
        Action::BulkAdd(..) | Action::Create(..) | Action::SetSshKey(_) => "+".green().bold(),
    }
}
