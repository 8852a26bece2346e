//! Shared SQLite bootstrap helpers.
//!
//! Each store owns its own database file plus a linear list of SQL
//! migrations. The number of applied migrations is tracked through
//! `PRAGMA user_version`, so opening a database created by an older
//! binary replays only the missing steps.

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// Open (or create) a database file and bring its schema up to date.
pub fn open_database(path: &Path, name: &str, migrations: &[&str]) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open {} database at {:?}", name, path))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    apply_migrations(&conn, name, migrations)?;
    Ok(conn)
}

/// Run any migrations the database has not seen yet.
pub fn apply_migrations(conn: &Connection, name: &str, migrations: &[&str]) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if version < 0 || version as usize > migrations.len() {
        bail!(
            "{} database version {} is not supported by this binary (max {})",
            name,
            version,
            migrations.len()
        );
    }

    for (index, migration) in migrations.iter().enumerate().skip(version as usize) {
        let target = index + 1;
        info!("Migrating {} database to version {}", name, target);
        conn.execute_batch(migration)
            .with_context(|| format!("Failed migrating {} database to version {}", name, target))?;
        conn.pragma_update(None, "user_version", target as i64)
            .with_context(|| format!("Failed to bump {} database version", name))?;
    }

    Ok(())
}
