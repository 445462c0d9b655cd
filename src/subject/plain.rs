use rusqlite::{Connection, params};

use super::{Subject, uow, with_transaction};
use crate::{
    config::DatabaseConfig,
    db::{CANONICAL_QUERY, open_connection},
    errors::BenchError,
};

/// Uninstrumented baseline.
pub struct PlainSubject {
    conn: Connection,
    row_limit: i64,
}

impl PlainSubject {
    pub fn open(config: &DatabaseConfig) -> Result<Self, BenchError> {
        Ok(Self {
            conn: open_connection(config)?,
            row_limit: config.row_limit,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Subject for PlainSubject {
    fn name(&self) -> &str {
        "plain"
    }

    fn run_query(&mut self) -> Result<usize, BenchError> {
        let conn = &self.conn;
        let limit = self.row_limit;
        with_transaction(
            || conn.execute_batch("BEGIN DEFERRED").map_err(uow),
            || {
                let mut stmt = conn.prepare_cached(CANONICAL_QUERY).map_err(uow)?;
                let mut rows = stmt.query(params![limit]).map_err(uow)?;
                let mut drained = 0usize;
                while let Some(row) = rows.next().map_err(uow)? {
                    let _id: i64 = row.get(0).map_err(uow)?;
                    let _content: String = row.get(1).map_err(uow)?;
                    drained += 1;
                }
                Ok(drained)
            },
            || conn.execute_batch("COMMIT").map_err(uow),
            || {
                let _ = conn.execute_batch("ROLLBACK");
            },
        )
    }
}
