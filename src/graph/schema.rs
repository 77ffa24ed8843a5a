//! SQLite schema for the knowledge graph.

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;

pub const SCHEMA_VERSION: i64 = 1;

const TABLES: &str = "
    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        ord INTEGER NOT NULL,
        start_line INTEGER NOT NULL,
        end_line INTEGER NOT NULL,
        content TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS term_mentions (
        term TEXT NOT NULL,
        chunk_id TEXT NOT NULL,
        count INTEGER NOT NULL,
        PRIMARY KEY (term, chunk_id)
    );

    CREATE TABLE IF NOT EXISTS term_edges (
        source TEXT NOT NULL,
        target TEXT NOT NULL,
        weight INTEGER NOT NULL,
        PRIMARY KEY (source, target)
    );

    CREATE INDEX IF NOT EXISTS idx_term_mentions_chunk ON term_mentions(chunk_id);
";

/// Fresh graph that lives only as long as the connection.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Graph stored in a file, for inspection after a run.
pub fn open_or_create(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let current: Option<i64> =
        conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0)).ok();
    match current {
        None => {
            conn.execute("INSERT INTO schema_version(version) VALUES(?1)", [SCHEMA_VERSION])?;
        }
        Some(version) if version == SCHEMA_VERSION => {}
        Some(version) => {
            // Contents are derived data and every ingest replaces them anyway.
            tracing::warn!(
                "knowledge graph schema version {} != {}; rebuilding tables",
                version,
                SCHEMA_VERSION
            );
            conn.execute_batch(
                "
                DROP TABLE IF EXISTS chunks;
                DROP TABLE IF EXISTS term_mentions;
                DROP TABLE IF EXISTS term_edges;
                ",
            )?;
            conn.execute("UPDATE schema_version SET version = ?1", [SCHEMA_VERSION])?;
        }
    }

    conn.execute_batch(TABLES)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_or_create_inserts_schema_version() {
        let tmp = TempDir::new().expect("temp dir");
        let db = tmp.path().join("graph.db");
        let conn = open_or_create(&db).expect("open db");
        let version: i64 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .expect("query version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn mismatched_schema_version_is_rebuilt() {
        let tmp = TempDir::new().expect("temp dir");
        let db = tmp.path().join("graph.db");
        let conn = Connection::open(&db).expect("open db");
        conn.execute_batch(
            "CREATE TABLE schema_version(version INTEGER NOT NULL);\
             INSERT INTO schema_version(version) VALUES(999);\
             CREATE TABLE chunks(legacy TEXT);",
        )
        .expect("seed legacy schema");
        drop(conn);

        let conn = open_or_create(&db).expect("rebuild");
        let version: i64 = conn
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .expect("query version");
        assert_eq!(version, SCHEMA_VERSION);
        conn.execute(
            "INSERT INTO chunks(id, ord, start_line, end_line, content) VALUES('a', 0, 1, 1, 'x')",
            [],
        )
        .expect("new chunks schema");
    }

    #[test]
    fn in_memory_graph_starts_empty() {
        let conn = open_in_memory().expect("open");
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0)).expect("count");
        assert_eq!(count, 0);
    }
}
