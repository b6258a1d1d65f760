//! Settings resolution and remote selection shared by every command.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{ArgAction, Args};

use converge_core::{settings, AccountId, Settings};
use converge_remote::{HttpRemote, InMemoryRemote, RemoteApi, RemoteFixture};
use converge_sync::DesiredStateExtractor;

/// Flags accepted by every subcommand. Flags and `CONVERGE_*` variables
/// override `~/.converge/config.yaml`.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Control-plane hostname.
    #[arg(long, global = true, env = "CONVERGE_HOSTNAME")]
    pub hostname: Option<String>,

    /// API token.
    #[arg(long, global = true, env = "CONVERGE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Account used when a declaration names none.
    #[arg(long, global = true, env = "CONVERGE_ACCOUNT_ID")]
    pub account_id: Option<String>,

    /// Use a JSON state file instead of the remote API. Mutations are
    /// written back to the file.
    #[arg(long, global = true, value_name = "STATE_JSON")]
    pub offline: Option<PathBuf>,

    /// Increase log verbosity (`-v` info, `-vv` debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Resolved home directory and settings.
#[derive(Debug)]
pub struct Context {
    pub home: PathBuf,
    pub settings: Settings,
    offline: Option<PathBuf>,
}

impl Context {
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        let settings = settings::load_at(&home)
            .with_context(|| format!("failed to load {}", settings::path_at(&home).display()))?
            .merged(
                global.hostname.clone(),
                global.token.clone(),
                global.account_id.clone().map(AccountId::from),
            );
        Ok(Self {
            home,
            settings,
            offline: global.offline.clone(),
        })
    }

    pub fn extractor(&self) -> DesiredStateExtractor {
        DesiredStateExtractor::new(self.settings.default_account_id.clone())
    }

    /// Open the remote: the offline state file if one was given, otherwise
    /// the HTTP API.
    pub fn connect(&self) -> Result<Remote> {
        if let Some(path) = &self.offline {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read offline state {}", path.display()))?;
            let fixture: RemoteFixture = serde_json::from_str(&contents)
                .with_context(|| format!("invalid offline state {}", path.display()))?;
            tracing::debug!("offline remote loaded from {}", path.display());
            return Ok(Remote::Offline {
                path: path.clone(),
                remote: InMemoryRemote::new(fixture).with_page_size(self.settings.page_size()),
            });
        }

        let hostname = self
            .settings
            .hostname
            .as_deref()
            .context("no hostname configured; pass --hostname or set CONVERGE_HOSTNAME")?;
        let token = self
            .settings
            .token
            .as_deref()
            .context("no API token configured; pass --token or set CONVERGE_TOKEN")?;
        Ok(Remote::Http(HttpRemote::new(hostname, token)))
    }
}

/// The remote a command talks to.
pub enum Remote {
    Http(HttpRemote),
    Offline { path: PathBuf, remote: InMemoryRemote },
}

impl Remote {
    pub fn api(&self) -> &dyn RemoteApi {
        match self {
            Remote::Http(remote) => remote,
            Remote::Offline { remote, .. } => remote,
        }
    }

    /// Write offline state back if anything changed it. No-op for HTTP.
    pub fn persist(&self) -> Result<()> {
        let Remote::Offline { path, remote } = self else {
            return Ok(());
        };
        if remote.mutations().is_empty() {
            return Ok(());
        }
        write_state(path, &remote.fixture())
    }
}

fn write_state(path: &Path, fixture: &RemoteFixture) -> Result<()> {
    let json = serde_json::to_string_pretty(fixture).context("failed to serialize offline state")?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
    tracing::info!("offline state updated: {}", path.display());
    Ok(())
}
