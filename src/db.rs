use rand::{Rng, SeedableRng, distributions::Alphanumeric, rngs::StdRng};
use rusqlite::{Connection, params};
use tracing::debug;

use crate::{config::DatabaseConfig, errors::BenchError};

/// The one query every subject runs per unit of work.
pub const CANONICAL_QUERY: &str = "SELECT id, content FROM messages LIMIT ?1";

pub fn open_connection(config: &DatabaseConfig) -> Result<Connection, BenchError> {
    config.validate()?;
    let conn = match &config.path {
        Some(path) => Connection::open(path),
        None => Connection::open_in_memory(),
    }
    .map_err(|e| BenchError::setup(e.to_string()))?;
    ensure_schema(&conn)?;
    seed_messages(&conn, config)?;
    Ok(conn)
}

pub fn ensure_schema(conn: &Connection) -> Result<(), BenchError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id      INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL
        );
        "#,
    )
    .map_err(|e| BenchError::setup(e.to_string()))
}

/// Fills `messages` with deterministic content unless rows already exist,
/// so several subjects can share one database file.
pub fn seed_messages(conn: &Connection, config: &DatabaseConfig) -> Result<usize, BenchError> {
    let existing: i64 = conn
        .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
        .map_err(|e| BenchError::setup(e.to_string()))?;
    if existing > 0 {
        debug!(existing, "messages already seeded");
        return Ok(0);
    }
    let contents = generate_contents(config.seed_rows, config.content_len, config.seed);
    conn.execute_batch("BEGIN")
        .map_err(|e| BenchError::setup(e.to_string()))?;
    let inserted = insert_contents(conn, &contents);
    match inserted {
        Ok(()) => conn
            .execute_batch("COMMIT")
            .map_err(|e| BenchError::setup(e.to_string()))?,
        Err(err) => {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(err);
        }
    }
    debug!(rows = contents.len(), "seeded messages");
    Ok(contents.len())
}

pub fn generate_contents(count: usize, len: usize, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect()
        })
        .collect()
}

fn insert_contents(conn: &Connection, contents: &[String]) -> Result<(), BenchError> {
    let mut stmt = conn
        .prepare("INSERT INTO messages(content) VALUES(?1)")
        .map_err(|e| BenchError::setup(e.to_string()))?;
    for content in contents {
        stmt.execute(params![content])
            .map_err(|e| BenchError::setup(e.to_string()))?;
    }
    Ok(())
}
