//! `~/.converge/config.yaml` — remote endpoint, credentials, and the default
//! account injected into the desired-state extractor.
//!
//! # API pattern
//!
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::types::AccountId;

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_account_id: Option<AccountId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl Settings {
    pub fn page_size(&self) -> u32 {
        self.page_size.filter(|n| *n > 0).unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Overlay explicitly provided values (flags / environment) on top.
    pub fn merged(
        mut self,
        hostname: Option<String>,
        token: Option<String>,
        default_account_id: Option<AccountId>,
    ) -> Self {
        if hostname.is_some() {
            self.hostname = hostname;
        }
        if token.is_some() {
            self.token = token;
        }
        if default_account_id.is_some() {
            self.default_account_id = default_account_id;
        }
        self
    }
}

/// `<home>/.converge/`
pub fn root_at(home: &Path) -> PathBuf {
    home.join(".converge")
}

/// `<home>/.converge/config.yaml` — pure, no I/O.
pub fn path_at(home: &Path) -> PathBuf {
    root_at(home).join("config.yaml")
}

/// Load settings; a missing file yields defaults.
pub fn load_at(home: &Path) -> Result<Settings, CoreError> {
    let path = path_at(home);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, CoreError> {
    load_at(&home()?)
}

/// Atomically write settings (`.tmp` sibling, then rename).
pub fn save_at(home: &Path, settings: &Settings) -> Result<(), CoreError> {
    let root = root_at(home);
    std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    let path = path_at(home);
    let tmp = path.with_file_name("config.yaml.tmp");
    let yaml = serde_yaml::to_string(settings)?;
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

fn home() -> Result<PathBuf, CoreError> {
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}
