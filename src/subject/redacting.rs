//! Trace-option wrapper whose argument attributes pass through an explicit
//! redaction policy.

use std::collections::BTreeMap;

use rusqlite::{Connection, params_from_iter, types::Value};
use tracing::{Span, field};

use super::{Subject, with_transaction};
use crate::{
    attribute::{AttrList, KeyValue},
    config::DatabaseConfig,
    db::{CANONICAL_QUERY, open_connection},
    errors::BenchError,
};

pub const SPAN_TARGET: &str = "sqlinstr::redacting";
pub const MASK: &str = "*****";

macro_rules! sql_span {
    ($name:literal) => {
        tracing::debug_span!(
            target: SPAN_TARGET,
            $name,
            attributes = field::Empty,
            rows_affected = field::Empty,
            last_insert_id = field::Empty,
            error = field::Empty,
        )
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgTrace {
    Trace,
    Mask,
}

/// Per-argument trace hints keyed by 1-based ordinal. Arguments without a
/// hint are left off the span entirely.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RedactionPolicy {
    hints: BTreeMap<usize, ArgTrace>,
}

impl RedactionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trace(mut self, ordinal: usize) -> Self {
        self.hints.insert(ordinal, ArgTrace::Trace);
        self
    }

    pub fn mask(mut self, ordinal: usize) -> Self {
        self.hints.insert(ordinal, ArgTrace::Mask);
        self
    }

    pub fn hint(&self, ordinal: usize) -> Option<ArgTrace> {
        self.hints.get(&ordinal).copied()
    }

    pub fn apply(&self, args: &[Value]) -> Vec<KeyValue> {
        args.iter()
            .enumerate()
            .filter_map(|(idx, arg)| {
                let ordinal = idx + 1;
                let key = format!("db.sql.args.{ordinal}");
                match self.hint(ordinal)? {
                    ArgTrace::Trace => Some(KeyValue::from_sql_value(key, arg)),
                    ArgTrace::Mask => Some(KeyValue::string(key, MASK)),
                }
            })
            .collect()
    }
}

pub fn query_attributes(sql: &str, args: &[Value], policy: &RedactionPolicy) -> Vec<KeyValue> {
    let mut attrs = Vec::with_capacity(1 + args.len());
    attrs.push(KeyValue::string("db.query.text", sql));
    attrs.extend(policy.apply(args));
    attrs
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceOptions {
    pub ping: bool,
    pub rows_next: bool,
    pub rows_close: bool,
    pub rows_affected: bool,
    pub last_insert_id: bool,
    /// Leave skippable errors off the span. The error still reaches the
    /// caller.
    pub disable_err_skip: bool,
    /// Create spans even when no parent span is active.
    pub allow_root: bool,
}

impl TraceOptions {
    pub fn records_error(&self, err: &rusqlite::Error) -> bool {
        !(self.disable_err_skip && is_skippable(err))
    }

    pub fn all() -> Self {
        Self {
            ping: true,
            rows_next: true,
            rows_close: true,
            rows_affected: true,
            last_insert_id: true,
            disable_err_skip: true,
            allow_root: true,
        }
    }
}

pub struct RedactingSubject {
    conn: Connection,
    options: TraceOptions,
    policy: RedactionPolicy,
    row_limit: i64,
}

impl RedactingSubject {
    pub fn open(config: &DatabaseConfig) -> Result<Self, BenchError> {
        Self::open_with(config, TraceOptions::all(), RedactionPolicy::new().trace(1))
    }

    pub fn open_with(
        config: &DatabaseConfig,
        options: TraceOptions,
        policy: RedactionPolicy,
    ) -> Result<Self, BenchError> {
        Ok(Self {
            conn: open_connection(config)?,
            options,
            policy,
            row_limit: config.row_limit,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn policy(&self) -> &RedactionPolicy {
        &self.policy
    }

    pub fn ping(&self) -> Result<(), BenchError> {
        let span = self.span_if(self.options.ping, || sql_span!("sql.ping"));
        span.in_scope(|| {
            self.conn
                .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
                .map_err(|e| self.fail(&span, e))
        })
    }

    /// Drains the rows of `sql`, tagging the query span with the arguments
    /// the policy allows.
    pub fn query_with_policy(
        &self,
        sql: &str,
        args: &[Value],
        policy: &RedactionPolicy,
    ) -> Result<usize, BenchError> {
        let span = self.span_if(true, || sql_span!("sql.query"));
        if !span.is_disabled() {
            let attrs = query_attributes(sql, args, policy);
            span.record("attributes", field::display(AttrList(&attrs)));
        }
        let _entered = span.enter();

        let mut stmt = self.conn.prepare_cached(sql).map_err(|e| self.fail(&span, e))?;
        let mut rows = stmt
            .query(params_from_iter(args.iter()))
            .map_err(|e| self.fail(&span, e))?;
        let mut drained = 0usize;
        loop {
            let next_span = self.span_if(self.options.rows_next, || sql_span!("sql.rows.next"));
            let next = {
                let _guard = next_span.enter();
                rows.next().map_err(|e| self.fail(&next_span, e))?
            };
            let Some(row) = next else {
                break;
            };
            let _id: i64 = row.get(0).map_err(|e| self.fail(&span, e))?;
            let _content: String = row.get(1).map_err(|e| self.fail(&span, e))?;
            drained += 1;
        }
        drop(rows);
        let close_span = self.span_if(self.options.rows_close, || sql_span!("sql.rows.close"));
        close_span.in_scope(|| drop(stmt));
        Ok(drained)
    }

    /// Executes a statement that returns no rows.
    pub fn execute_with_policy(
        &self,
        sql: &str,
        args: &[Value],
        policy: &RedactionPolicy,
    ) -> Result<usize, BenchError> {
        let span = self.span_if(true, || sql_span!("sql.exec"));
        if !span.is_disabled() {
            let attrs = query_attributes(sql, args, policy);
            span.record("attributes", field::display(AttrList(&attrs)));
        }
        let affected = span
            .in_scope(|| self.conn.execute(sql, params_from_iter(args.iter())))
            .map_err(|e| self.fail(&span, e))?;
        if self.options.rows_affected {
            span.record("rows_affected", affected as u64);
        }
        if self.options.last_insert_id {
            span.record("last_insert_id", self.conn.last_insert_rowid());
        }
        Ok(affected)
    }

    fn exec_plain(&self, span: Span, sql: &str) -> Result<(), BenchError> {
        span.in_scope(|| self.conn.execute_batch(sql))
            .map_err(|e| self.fail(&span, e))
    }

    // Without `allow_root` a span is only created under an active parent.
    fn span_if<F>(&self, enabled: bool, make: F) -> Span
    where
        F: FnOnce() -> Span,
    {
        if !enabled || (!self.options.allow_root && Span::current().is_none()) {
            return Span::none();
        }
        make()
    }

    fn fail(&self, span: &Span, err: rusqlite::Error) -> BenchError {
        let recorded = self.options.records_error(&err);
        let err = BenchError::unit_of_work(err.to_string());
        if recorded {
            span.record("error", field::display(&err));
        }
        err
    }
}

impl Subject for RedactingSubject {
    fn name(&self) -> &str {
        "redacting"
    }

    fn run_query(&mut self) -> Result<usize, BenchError> {
        let args = [Value::Integer(self.row_limit)];
        with_transaction(
            || self.exec_plain(self.span_if(true, || sql_span!("sql.begin")), "BEGIN DEFERRED"),
            || self.query_with_policy(CANONICAL_QUERY, &args, &self.policy),
            || self.exec_plain(self.span_if(true, || sql_span!("sql.commit")), "COMMIT"),
            || {
                let _ = self.exec_plain(self.span_if(true, || sql_span!("sql.rollback")), "ROLLBACK");
            },
        )
    }
}

/// Errors that only mean "use the other call path", such as running a row
/// producing statement through `execute`.
fn is_skippable(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::ExecuteReturnedResults)
}
