use anyhow::{ensure, Context, Result};
use rusqlite::Connection;

/// Schema scripts in order; entry `i` upgrades `user_version` from `i` to `i + 1`.
const MIGRATIONS: &[&str] = &[include_str!("schemas/schema_v1.sql")];

fn current_schema_version() -> i32 {
    MIGRATIONS.len() as i32
}

fn user_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")
}

/// Brings the schema up to date. All pending steps commit together.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let target = current_schema_version();
    let found = user_version(conn)?;

    ensure!(
        found <= target,
        "database version ({found}) is newer than supported schema ({target})"
    );
    if found == target {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;

    for (index, script) in MIGRATIONS.iter().enumerate().skip(found as usize) {
        let next = index as i32 + 1;
        tx.execute_batch(script)
            .with_context(|| format!("migration to schema v{next} failed"))?;
    }

    tx.pragma_update(None, "user_version", target)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")?;

    log::info!("Database schema migrated from v{found} to v{target}");
    Ok(())
}
