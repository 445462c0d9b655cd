//! Span-per-call wrapper that decorates every span with connection
//! attributes and a typed attribute for each bound argument.

use rusqlite::{Connection, params_from_iter, types::Value};
use tracing::{Span, field};

use super::{Subject, with_transaction};
use crate::{
    attribute::{AttrList, KeyValue},
    config::DatabaseConfig,
    db::{CANONICAL_QUERY, open_connection},
    errors::BenchError,
};

pub const SPAN_TARGET: &str = "sqlinstr::span_attrs";

macro_rules! sql_span {
    ($name:literal) => {
        tracing::debug_span!(
            target: SPAN_TARGET,
            $name,
            db.statement = field::Empty,
            attributes = field::Empty,
            error = field::Empty,
        )
    };
}

/// Which calls get their own span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpanOptions {
    pub ping: bool,
    /// Emit an event for every fetched row.
    pub rows_next: bool,
    /// Leave the statement text off query spans.
    pub disable_query: bool,
    pub omit_conn_prepare: bool,
    pub omit_conn_query: bool,
    pub omit_rows: bool,
    pub omit_connector_connect: bool,
}

impl Default for SpanOptions {
    fn default() -> Self {
        Self {
            ping: true,
            rows_next: true,
            disable_query: false,
            omit_conn_prepare: false,
            omit_conn_query: false,
            omit_rows: false,
            omit_connector_connect: false,
        }
    }
}

/// `db.sql.args.count` followed by one `db.sql.args.<n>.value` per argument,
/// numbered from 1.
pub fn args_attributes(args: &[Value]) -> Vec<KeyValue> {
    let mut kvs = Vec::with_capacity(args.len() + 1);
    kvs.push(KeyValue::int("db.sql.args.count", args.len() as i64));
    for (idx, arg) in args.iter().enumerate() {
        kvs.push(KeyValue::from_sql_value(
            format!("db.sql.args.{}.value", idx + 1),
            arg,
        ));
    }
    kvs
}

pub fn base_attributes(config: &DatabaseConfig) -> Vec<KeyValue> {
    vec![
        KeyValue::string("db.system.name", "sqlite"),
        KeyValue::string("db.namespace", config.namespace()),
    ]
}

pub struct SpanAttrsSubject {
    conn: Connection,
    options: SpanOptions,
    base: Vec<KeyValue>,
    row_limit: i64,
}

impl SpanAttrsSubject {
    pub fn open(config: &DatabaseConfig) -> Result<Self, BenchError> {
        Self::open_with(config, SpanOptions::default())
    }

    pub fn open_with(config: &DatabaseConfig, options: SpanOptions) -> Result<Self, BenchError> {
        let base = base_attributes(config);
        let span = if options.omit_connector_connect {
            Span::none()
        } else {
            sql_span!("sql.connector.connect")
        };
        record_attributes(&span, &base);
        let conn = span
            .in_scope(|| open_connection(config))
            .inspect_err(|err| record_error(&span, err))?;
        Ok(Self {
            conn,
            options,
            base,
            row_limit: config.row_limit,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn options(&self) -> &SpanOptions {
        &self.options
    }

    pub fn ping(&self) -> Result<(), BenchError> {
        let span = if self.options.ping {
            sql_span!("sql.conn.ping")
        } else {
            Span::none()
        };
        self.traced(&span, None, |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
        })
    }

    /// Runs `sql` with `args` and drains the result set, returning the
    /// number of rows read.
    pub fn query_drain(&self, sql: &str, args: &[Value]) -> Result<usize, BenchError> {
        let query_span = if self.options.omit_conn_query {
            Span::none()
        } else {
            sql_span!("sql.conn.query")
        };
        if !self.options.disable_query {
            query_span.record("db.statement", sql);
        }
        let mut attrs = self.base.clone();
        attrs.extend(args_attributes(args));
        record_attributes(&query_span, &attrs);
        let _entered = query_span.enter();

        let prepare_span = if self.options.omit_conn_prepare {
            Span::none()
        } else {
            sql_span!("sql.conn.prepare")
        };
        let mut stmt = self.traced(&prepare_span, Some(sql), |conn| conn.prepare_cached(sql))?;

        let rows_span = if self.options.omit_rows {
            Span::none()
        } else {
            sql_span!("sql.rows")
        };
        let _rows_entered = rows_span.enter();
        let mut rows = stmt
            .query(params_from_iter(args.iter()))
            .map_err(|e| fail(&query_span, e))?;
        let mut drained = 0usize;
        while let Some(row) = rows.next().map_err(|e| fail(&rows_span, e))? {
            if self.options.rows_next {
                tracing::debug!(target: SPAN_TARGET, parent: &rows_span, row = drained, "sql.rows.next");
            }
            let _id: i64 = row.get(0).map_err(|e| fail(&rows_span, e))?;
            let _content: String = row.get(1).map_err(|e| fail(&rows_span, e))?;
            drained += 1;
        }
        Ok(drained)
    }

    fn traced<'c, T, F>(&'c self, span: &Span, sql: Option<&str>, f: F) -> Result<T, BenchError>
    where
        F: FnOnce(&'c Connection) -> Result<T, rusqlite::Error>,
    {
        if let (Some(sql), false) = (sql, self.options.disable_query) {
            span.record("db.statement", sql);
        }
        record_attributes(span, &self.base);
        span.in_scope(|| f(&self.conn)).map_err(|e| fail(span, e))
    }
}

impl Subject for SpanAttrsSubject {
    fn name(&self) -> &str {
        "span-attrs"
    }

    fn run_query(&mut self) -> Result<usize, BenchError> {
        let args = [Value::Integer(self.row_limit)];
        with_transaction(
            || {
                let span = sql_span!("sql.conn.begin_tx");
                self.traced(&span, None, |conn| conn.execute_batch("BEGIN DEFERRED"))
            },
            || self.query_drain(CANONICAL_QUERY, &args),
            || {
                let span = sql_span!("sql.tx.commit");
                self.traced(&span, None, |conn| conn.execute_batch("COMMIT"))
            },
            || {
                let span = sql_span!("sql.tx.rollback");
                let _ = self.traced(&span, None, |conn| conn.execute_batch("ROLLBACK"));
            },
        )
    }
}

fn record_attributes(span: &Span, attrs: &[KeyValue]) {
    if !span.is_disabled() {
        span.record("attributes", field::display(AttrList(attrs)));
    }
}

fn record_error(span: &Span, err: &BenchError) {
    span.record("error", field::display(err));
}

fn fail(span: &Span, err: rusqlite::Error) -> BenchError {
    let err = BenchError::unit_of_work(err.to_string());
    record_error(span, &err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_attributes_are_typed_and_one_based() {
        let attrs = args_attributes(&[
            Value::Integer(7),
            Value::Text("wk1X%".into()),
            Value::Blob(vec![0xde, 0xad]),
            Value::Real(1.5),
            Value::Null,
        ]);
        assert_eq!(attrs[0], KeyValue::int("db.sql.args.count", 5));
        assert_eq!(attrs[1], KeyValue::int("db.sql.args.1.value", 7));
        assert_eq!(attrs[2], KeyValue::string("db.sql.args.2.value", "wk1X%"));
        assert_eq!(attrs[3], KeyValue::string("db.sql.args.3.value", "dead"));
        assert_eq!(
            attrs[4],
            KeyValue::new("db.sql.args.4.value", crate::attribute::AttrValue::Float(1.5))
        );
        assert_eq!(attrs[5], KeyValue::string("db.sql.args.5.value", "NULL"));
    }
}
