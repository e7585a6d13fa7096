//! Acting-user resolution for CLI commands.
//!
//! The resolution chain: `--user` flag > `DESKWORK_USER` env > `user` in the
//! user config > `USER` env (TTY only). Mutating commands require a user;
//! read-only projections fall back to an anonymous viewer.

use std::env;

/// Errors from user resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserResolutionError {
    /// Human-readable description.
    pub message: String,
    /// Machine error code.
    pub code: &'static str,
}

impl std::fmt::Display for UserResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UserResolutionError {}

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

fn resolve_user_with(
    cli_flag: Option<&str>,
    configured: Option<&str>,
    env: &dyn EnvReader,
) -> Option<String> {
    if let Some(user) = cli_flag.map(str::trim).filter(|user| !user.is_empty()) {
        return Some(user.to_string());
    }

    if let Some(val) = env.get("DESKWORK_USER") {
        return Some(val.trim().to_string());
    }

    if let Some(user) = configured.map(str::trim).filter(|user| !user.is_empty()) {
        return Some(user.to_string());
    }

    if env.is_tty() {
        return env.get("USER").map(|val| val.trim().to_string());
    }

    None
}

/// Resolve the acting user id, or `None` when nothing identifies one.
pub fn resolve_user(cli_flag: Option<&str>, configured: Option<&str>) -> Option<String> {
    resolve_user_with(cli_flag, configured, &RealEnv)
}

/// Resolve the acting user, failing when none is set.
///
/// Use this for mutating commands.
pub fn require_user(
    cli_flag: Option<&str>,
    configured: Option<&str>,
) -> Result<String, UserResolutionError> {
    resolve_user(cli_flag, configured).ok_or_else(|| UserResolutionError {
        message: "Acting user required for this command. \
                  Set --user or the DESKWORK_USER environment variable."
            .to_string(),
        code: "missing_user",
    })
}
