use super::Context;
use crate::output::{pretty_kv, render};
use anyhow::{Context as _, Result};
use clap::Args;
use deskwork_core::config::{DATABASE_FILE, PROJECT_DIR};
use deskwork_core::store::SqliteStore;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Re-initialize even if `.deskwork/` already exists. Existing records
    /// are kept.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[store]\n\
    busy_timeout_ms = 5000\n\
    \n\
    [geocoding]\n\
    url = \"https://nominatim.openstreetmap.org/reverse\"\n\
    timeout_secs = 5\n\
    \n\
    [license]\n\
    # url = \"https://licenses.example.com/lookup\"\n\
    # api_key = \"...\"\n\
    timeout_secs = 10\n";

const GITIGNORE: &str = "deskwork.db\ndeskwork.db-wal\ndeskwork.db-shm\n";

#[derive(Debug, Serialize)]
struct InitOutput {
    project_dir: String,
    database: String,
    schema_version: u32,
}

/// Execute `dw init`. Creates the project skeleton:
///
/// ```text
/// .deskwork/
///   config.toml   (default project config)
///   .gitignore    (database files)
///   deskwork.db   (migrated record store)
/// ```
///
/// # Errors
///
/// Returns an error if `.deskwork/` already exists and `--force` is not set,
/// or if any filesystem or database operation fails.
pub fn run_init(args: &InitArgs, ctx: &Context) -> Result<()> {
    let dir = ctx.project_dir();
    if dir.exists() && !args.force {
        anyhow::bail!("{PROJECT_DIR}/ already exists. Use `dw init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        std::fs::write(&config_path, CONFIG_TOML)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
    }
    let gitignore_path = dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    let db_path = dir.join(DATABASE_FILE);
    let store = SqliteStore::open(&db_path, ctx.config.project.store.busy_timeout())?;
    let schema_version: u32 = store
        .connection()
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("Failed to read schema version")?;
    tracing::info!(path = %db_path.display(), schema_version, "initialized project");

    let payload = InitOutput {
        project_dir: dir.display().to_string(),
        database: db_path.display().to_string(),
        schema_version,
    };
    render(ctx.output, &payload, |p, w| {
        writeln!(w, "✓ Initialized {PROJECT_DIR}/")?;
        pretty_kv(w, "Database", &p.database)?;
        pretty_kv(w, "Schema", p.schema_version.to_string())?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  dw user add alice --name \"Alice\"")?;
        writeln!(w, "  dw ticket create --subject \"Printer offline\"")?;
        writeln!(w, "  export DESKWORK_USER=alice && dw start TKT-00001")
    })
}
