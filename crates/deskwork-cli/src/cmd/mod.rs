//! Subcommand handlers. Each `run_*` takes its parsed arguments and the
//! shared [`Context`].

pub mod catalog;
pub mod comment;
pub mod completions;
pub mod customer;
pub mod init;
pub mod license;
pub mod lifecycle;
pub mod location;
pub mod report;
pub mod ticket;
pub mod user;

use crate::actor;
use crate::output::{CliError, OutputMode, fail};
use crate::validate;
use deskwork_core::config::{DATABASE_FILE, EffectiveConfig, PROJECT_DIR};
use deskwork_core::error::ErrorCode;
use deskwork_core::store::{SqliteStore, StoreError};
use std::path::{Path, PathBuf};

/// Everything a command needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    /// Directory holding `.deskwork/`, or the working directory before `init`.
    pub project_root: PathBuf,
    pub config: EffectiveConfig,
    pub output: OutputMode,
    pub user_flag: Option<String>,
}

/// Find the directory containing `.deskwork/` by walking up from `start`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(PROJECT_DIR).is_dir() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

impl Context {
    pub fn project_dir(&self) -> PathBuf {
        self.project_root.join(PROJECT_DIR)
    }

    /// Open the project's record store.
    pub fn open_store(&self) -> anyhow::Result<SqliteStore> {
        let dir = self.project_dir();
        if !dir.is_dir() {
            return Err(fail(
                self.output,
                &CliError::coded(
                    "Not a deskwork project: .deskwork directory not found",
                    ErrorCode::NotInitialized,
                ),
            ));
        }
        SqliteStore::open(
            &dir.join(DATABASE_FILE),
            self.config.project.store.busy_timeout(),
        )
    }

    /// Acting user for a mutating command.
    pub fn require_user(&self) -> anyhow::Result<String> {
        let user = actor::require_user(self.user_flag.as_deref(), self.config.user.user.as_deref())
            .map_err(|e| {
                fail(
                    self.output,
                    &CliError::with_details(&e.message, "Set --user or DESKWORK_USER", e.code),
                )
            })?;
        validate::validate_user_id(&user).map_err(|e| fail(self.output, &e.to_cli_error()))?;
        Ok(user)
    }

    /// Viewer for read-only projections; anonymous when unresolved.
    pub fn viewer(&self) -> String {
        actor::resolve_user(self.user_flag.as_deref(), self.config.user.user.as_deref())
            .unwrap_or_default()
    }

    /// Render a store failure with its catalogued code.
    pub fn store_failure(&self, err: &StoreError) -> anyhow::Error {
        fail(self.output, &CliError::coded(err.to_string(), err.code()))
    }

    pub fn invalid(&self, err: &validate::ValidationError) -> anyhow::Error {
        fail(self.output, &err.to_cli_error())
    }
}
