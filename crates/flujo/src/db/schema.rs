use crate::error::Result;
use rusqlite::Connection;

pub const SCHEMA_VERSION: i32 = 1;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS rules (
            id              INTEGER PRIMARY KEY,
            owner_id        INTEGER NOT NULL,
            name            TEXT NOT NULL,
            side            TEXT NOT NULL CHECK (side IN ('credit', 'debit')),
            keywords        TEXT NOT NULL,
            match_mode      TEXT NOT NULL DEFAULT 'any',
            exclusions      TEXT,
            priority        INTEGER NOT NULL DEFAULT 0,
            active          BOOLEAN NOT NULL DEFAULT 1,
            created_at      TEXT DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_rules_owner ON rules(owner_id, side, active);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [SCHEMA_VERSION],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }
}
