//! Counter-based wrapper: every prepare, execute, transaction boundary and
//! fetched row bumps a relaxed atomic.

use std::{
    collections::HashSet,
    sync::atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;
use rusqlite::{CachedStatement, Connection, Params, Row, Rows};

use super::{Subject, uow, with_transaction};
use crate::{
    config::DatabaseConfig,
    db::{CANONICAL_QUERY, open_connection},
    errors::BenchError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMetricsSnapshot {
    pub prepare_count: u64,
    pub execute_count: u64,
    pub tx_begin_count: u64,
    pub tx_commit_count: u64,
    pub tx_rollback_count: u64,
    pub prepare_cache_hits: u64,
    pub prepare_cache_misses: u64,
    pub rows_fetched: u64,
}

impl QueryMetricsSnapshot {
    /// Transactions begun but neither committed nor rolled back.
    pub fn open_transactions(&self) -> u64 {
        self.tx_begin_count
            .saturating_sub(self.tx_commit_count + self.tx_rollback_count)
    }

    /// Counter growth between `earlier` and this snapshot.
    pub fn since(&self, earlier: &QueryMetricsSnapshot) -> QueryMetricsSnapshot {
        QueryMetricsSnapshot {
            prepare_count: self.prepare_count.saturating_sub(earlier.prepare_count),
            execute_count: self.execute_count.saturating_sub(earlier.execute_count),
            tx_begin_count: self.tx_begin_count.saturating_sub(earlier.tx_begin_count),
            tx_commit_count: self.tx_commit_count.saturating_sub(earlier.tx_commit_count),
            tx_rollback_count: self.tx_rollback_count.saturating_sub(earlier.tx_rollback_count),
            prepare_cache_hits: self.prepare_cache_hits.saturating_sub(earlier.prepare_cache_hits),
            prepare_cache_misses: self
                .prepare_cache_misses
                .saturating_sub(earlier.prepare_cache_misses),
            rows_fetched: self.rows_fetched.saturating_sub(earlier.rows_fetched),
        }
    }
}

#[derive(Default)]
pub struct QueryMetrics {
    prepares: AtomicU64,
    executes: AtomicU64,
    tx_begin: AtomicU64,
    tx_commit: AtomicU64,
    tx_rollback: AtomicU64,
    prepare_cache_hits: AtomicU64,
    prepare_cache_misses: AtomicU64,
    rows: AtomicU64,
}

impl QueryMetrics {
    pub fn snapshot(&self) -> QueryMetricsSnapshot {
        QueryMetricsSnapshot {
            prepare_count: self.prepares.load(Ordering::Relaxed),
            execute_count: self.executes.load(Ordering::Relaxed),
            tx_begin_count: self.tx_begin.load(Ordering::Relaxed),
            tx_commit_count: self.tx_commit.load(Ordering::Relaxed),
            tx_rollback_count: self.tx_rollback.load(Ordering::Relaxed),
            prepare_cache_hits: self.prepare_cache_hits.load(Ordering::Relaxed),
            prepare_cache_misses: self.prepare_cache_misses.load(Ordering::Relaxed),
            rows_fetched: self.rows.load(Ordering::Relaxed),
        }
    }

    /// Zeroes every counter and returns what they held.
    pub fn take(&self) -> QueryMetricsSnapshot {
        let take = |counter: &AtomicU64| counter.swap(0, Ordering::Relaxed);
        QueryMetricsSnapshot {
            prepare_count: take(&self.prepares),
            execute_count: take(&self.executes),
            tx_begin_count: take(&self.tx_begin),
            tx_commit_count: take(&self.tx_commit),
            tx_rollback_count: take(&self.tx_rollback),
            prepare_cache_hits: take(&self.prepare_cache_hits),
            prepare_cache_misses: take(&self.prepare_cache_misses),
            rows_fetched: take(&self.rows),
        }
    }

    pub fn record_prepare(&self) {
        self.prepares.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_execute(&self, sql: Option<&str>) {
        self.executes.fetch_add(1, Ordering::Relaxed);
        if let Some(keyword) = sql.and_then(leading_keyword) {
            if keyword.eq_ignore_ascii_case("BEGIN") {
                self.tx_begin.fetch_add(1, Ordering::Relaxed);
            } else if keyword.eq_ignore_ascii_case("COMMIT") {
                self.tx_commit.fetch_add(1, Ordering::Relaxed);
            } else if keyword.eq_ignore_ascii_case("ROLLBACK") {
                self.tx_rollback.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_prepare_cache_hit(&self) {
        self.prepare_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_prepare_cache_miss(&self) {
        self.prepare_cache_misses.fetch_add(1, Ordering::Relaxed);
        self.record_prepare();
    }

    pub fn record_row(&self) {
        self.rows.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Default)]
pub struct StatementTracker {
    seen: Mutex<HashSet<String>>,
}

impl StatementTracker {
    pub fn observe(&self, sql: &str) -> CacheObservation {
        let normalized = sql.trim().to_string();
        if self.seen.lock().insert(normalized) {
            CacheObservation::Miss
        } else {
            CacheObservation::Hit
        }
    }
}

pub enum CacheObservation {
    Hit,
    Miss,
}

fn leading_keyword(sql: &str) -> Option<&str> {
    let trimmed = sql.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    let end = trimmed
        .find(|c: char| c.is_ascii_whitespace() || c == ';')
        .unwrap_or(trimmed.len());
    Some(&trimmed[..end])
}

#[derive(Copy, Clone)]
pub struct InstrumentedConnection<'a> {
    conn: &'a Connection,
    metrics: &'a QueryMetrics,
    tracker: &'a StatementTracker,
}

impl<'a> InstrumentedConnection<'a> {
    pub fn new(
        conn: &'a Connection,
        metrics: &'a QueryMetrics,
        tracker: &'a StatementTracker,
    ) -> Self {
        Self {
            conn,
            metrics,
            tracker,
        }
    }

    pub fn execute_batch(&self, sql: &str) -> Result<(), rusqlite::Error> {
        self.metrics.record_execute(Some(sql));
        self.conn.execute_batch(sql)
    }

    pub fn prepare_cached(&self, sql: &str) -> Result<InstrumentedCachedStatement<'a>, rusqlite::Error> {
        match self.tracker.observe(sql) {
            CacheObservation::Hit => self.metrics.record_prepare_cache_hit(),
            CacheObservation::Miss => self.metrics.record_prepare_cache_miss(),
        }
        Ok(InstrumentedCachedStatement {
            stmt: self.conn.prepare_cached(sql)?,
            metrics: self.metrics,
        })
    }
}

pub struct InstrumentedCachedStatement<'conn> {
    stmt: CachedStatement<'conn>,
    metrics: &'conn QueryMetrics,
}

impl<'conn> InstrumentedCachedStatement<'conn> {
    pub fn query<P: Params>(&mut self, params: P) -> Result<InstrumentedRows<'_>, rusqlite::Error> {
        self.metrics.record_execute(None);
        Ok(InstrumentedRows {
            rows: self.stmt.query(params)?,
            metrics: self.metrics,
        })
    }
}

pub struct InstrumentedRows<'stmt> {
    rows: Rows<'stmt>,
    metrics: &'stmt QueryMetrics,
}

impl<'stmt> InstrumentedRows<'stmt> {
    pub fn next(&mut self) -> Result<Option<&Row<'stmt>>, rusqlite::Error> {
        let row = self.rows.next()?;
        if row.is_some() {
            self.metrics.record_row();
        }
        Ok(row)
    }
}

pub struct CountingSubject {
    conn: Connection,
    metrics: QueryMetrics,
    tracker: StatementTracker,
    row_limit: i64,
}

impl CountingSubject {
    pub fn open(config: &DatabaseConfig) -> Result<Self, BenchError> {
        Ok(Self {
            conn: open_connection(config)?,
            metrics: QueryMetrics::default(),
            tracker: StatementTracker::default(),
            row_limit: config.row_limit,
        })
    }

    pub fn metrics_snapshot(&self) -> QueryMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) -> QueryMetricsSnapshot {
        self.metrics.take()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn instrumented(&self) -> InstrumentedConnection<'_> {
        InstrumentedConnection::new(&self.conn, &self.metrics, &self.tracker)
    }
}

impl Subject for CountingSubject {
    fn name(&self) -> &str {
        "counting"
    }

    fn run_query(&mut self) -> Result<usize, BenchError> {
        let conn = self.instrumented();
        let limit = self.row_limit;
        with_transaction(
            || conn.execute_batch("BEGIN DEFERRED").map_err(uow),
            || {
                let mut stmt = conn.prepare_cached(CANONICAL_QUERY).map_err(uow)?;
                let mut rows = stmt.query([limit]).map_err(uow)?;
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
