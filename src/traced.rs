//! Traced statement wrapper.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::TracingConfig;
use crate::scope::{self, build_scope, OperationKind, TracingScope};
use crate::statement::{
    CurrentResult, FetchDirection, GeneratedKeys, Holdability, ResultSetConcurrency,
    ResultSetType, SqlWarning, Statement,
};

/// A traced wrapper around any [`Statement`].
///
/// `TracedStatement` implements [`Statement`] itself, making it a drop-in
/// replacement for the handle it wraps. Every executing call runs inside a
/// `db.query` span; everything else is forwarded untouched.
///
/// # Span Nesting
///
/// Spans are created as children of the tracer's current span, so
/// statements executed inside a request span show up nested under it. With
/// [`TracingConfig::with_active_span_only`] set, statements executed outside
/// any span are not traced at all.
///
/// # Batches
///
/// Commands passed to [`add_batch`](Statement::add_batch) are remembered
/// alongside the wrapped handle's own queue. [`execute_batch`](Statement::execute_batch)
/// produces a single span whose `db.statement` is the prepared query (if any)
/// followed by every queued command, concatenated as is. The queue is only
/// emptied by [`clear_batch`](Statement::clear_batch).
///
/// # Example
///
/// ```rust,ignore
/// use statement_tracing::{SeaOrmStatement, Statement, TracedStatement, TracingConfig};
///
/// let statement = SeaOrmStatement::new(db);
/// let config = TracingConfig::default().with_db_type(statement.db_system());
/// let mut traced = TracedStatement::new(statement, config);
///
/// let rows = traced.execute_query("SELECT * FROM users").await?;
/// ```
#[derive(Debug)]
pub struct TracedStatement<S> {
    inner: S,
    query: Option<String>,
    batch: Vec<String>,
    config: Arc<TracingConfig>,
}

impl<S: Statement> TracedStatement<S> {
    /// Create a new traced statement with the given configuration.
    pub fn new(statement: S, config: TracingConfig) -> Self {
        Self::with_shared_config(statement, Arc::new(config))
    }

    /// Create a new traced statement with default configuration.
    pub fn wrap(statement: S) -> Self {
        Self::new(statement, TracingConfig::default())
    }

    /// Create a traced statement that shares its configuration with others.
    pub fn with_shared_config(statement: S, config: Arc<TracingConfig>) -> Self {
        Self {
            inner: statement,
            query: None,
            batch: Vec::new(),
            config,
        }
    }

    /// Create a traced statement for a prepared `query`.
    ///
    /// The query text leads the `db.statement` of batch spans.
    pub fn prepared(statement: S, query: impl Into<String>, config: TracingConfig) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::new(statement, config)
        }
    }

    /// Get a reference to the wrapped statement.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get the tracing configuration.
    pub fn config(&self) -> &TracingConfig {
        &self.config
    }

    /// The prepared query this statement was created for, if any.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Commands queued since the last [`clear_batch`](Statement::clear_batch).
    pub fn batch_commands(&self) -> &[String] {
        &self.batch
    }

    /// The SQL recorded for the next batch execution.
    pub fn batch_sql(&self) -> String {
        let mut sql = self.query.clone().unwrap_or_default();
        for command in &self.batch {
            sql.push_str(command);
        }
        sql
    }

    /// Consume the wrapper and return the wrapped statement.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn scope(&self, kind: OperationKind, sql: &str) -> Option<TracingScope> {
        build_scope(kind, sql, &self.config)
    }
}

impl<S: Statement> From<S> for TracedStatement<S> {
    fn from(statement: S) -> Self {
        Self::wrap(statement)
    }
}

impl<S> AsRef<S> for TracedStatement<S> {
    fn as_ref(&self) -> &S {
        &self.inner
    }
}

/// Forwards `&self` methods to the wrapped statement.
macro_rules! forward {
    ($(fn $name:ident(&self $(, $arg:ident: $ty:ty)*) -> $ret:ty;)*) => {
        $(
            fn $name(&self $(, $arg: $ty)*) -> $ret {
                self.inner.$name($($arg),*)
            }
        )*
    };
}

/// Forwards `&mut self` methods to the wrapped statement.
macro_rules! forward_mut {
    ($(fn $name:ident(&mut self $(, $arg:ident: $ty:ty)*) -> $ret:ty;)*) => {
        $(
            fn $name(&mut self $(, $arg: $ty)*) -> $ret {
                self.inner.$name($($arg),*)
            }
        )*
    };
}

#[async_trait]
impl<S: Statement> Statement for TracedStatement<S> {
    type ResultSet = S::ResultSet;
    type Connection = S::Connection;
    type Error = S::Error;

    async fn execute_query(&mut self, sql: &str) -> Result<S::ResultSet, S::Error> {
        let scope = self.scope(OperationKind::Query, sql);
        scope::instrument(scope, self.inner.execute_query(sql), |_| None).await
    }

    async fn execute_update(&mut self, sql: &str) -> Result<u64, S::Error> {
        let scope = self.scope(OperationKind::Update, sql);
        scope::instrument(scope, self.inner.execute_update(sql), |count| Some(*count)).await
    }

    async fn execute_update_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<u64, S::Error> {
        let scope = self.scope(OperationKind::Update, sql);
        scope::instrument(
            scope,
            self.inner.execute_update_with_keys(sql, keys),
            |count| Some(*count),
        )
        .await
    }

    async fn execute(&mut self, sql: &str) -> Result<bool, S::Error> {
        let scope = self.scope(OperationKind::Execute, sql);
        scope::instrument(scope, self.inner.execute(sql), |_| None).await
    }

    async fn execute_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<bool, S::Error> {
        let scope = self.scope(OperationKind::Execute, sql);
        scope::instrument(scope, self.inner.execute_with_keys(sql, keys), |_| None).await
    }

    async fn execute_batch(&mut self) -> Result<Vec<u64>, S::Error> {
        let sql = self.batch_sql();
        let scope = self.scope(OperationKind::Batch, &sql);
        scope::instrument(scope, self.inner.execute_batch(), |counts| {
            Some(counts.iter().sum())
        })
        .await
    }

    fn add_batch(&mut self, sql: &str) -> Result<(), S::Error> {
        self.inner.add_batch(sql)?;
        self.batch.push(sql.to_owned());
        Ok(())
    }

    fn clear_batch(&mut self) -> Result<(), S::Error> {
        self.inner.clear_batch()?;
        self.batch.clear();
        Ok(())
    }

    forward! {
        fn is_closed(&self) -> Result<bool, S::Error>;
        fn cancel(&self) -> Result<(), S::Error>;
        fn max_field_size(&self) -> Result<usize, S::Error>;
        fn max_rows(&self) -> Result<u64, S::Error>;
        fn query_timeout(&self) -> Result<Option<Duration>, S::Error>;
        fn warnings(&self) -> Result<Vec<SqlWarning>, S::Error>;
        fn update_count(&self) -> Result<Option<u64>, S::Error>;
        fn fetch_direction(&self) -> Result<FetchDirection, S::Error>;
        fn fetch_size(&self) -> Result<u32, S::Error>;
        fn result_set_concurrency(&self) -> Result<ResultSetConcurrency, S::Error>;
        fn result_set_type(&self) -> Result<ResultSetType, S::Error>;
        fn result_set_holdability(&self) -> Result<Holdability, S::Error>;
        fn connection(&self) -> Result<&S::Connection, S::Error>;
        fn is_poolable(&self) -> Result<bool, S::Error>;
        fn is_close_on_completion(&self) -> Result<bool, S::Error>;
    }

    forward_mut! {
        fn close(&mut self) -> Result<(), S::Error>;
        fn set_max_field_size(&mut self, max: usize) -> Result<(), S::Error>;
        fn set_max_rows(&mut self, max: u64) -> Result<(), S::Error>;
        fn set_escape_processing(&mut self, enable: bool) -> Result<(), S::Error>;
        fn set_query_timeout(&mut self, timeout: Option<Duration>) -> Result<(), S::Error>;
        fn clear_warnings(&mut self) -> Result<(), S::Error>;
        fn set_cursor_name(&mut self, name: &str) -> Result<(), S::Error>;
        fn result_set(&mut self) -> Result<Option<S::ResultSet>, S::Error>;
        fn more_results(&mut self, current: CurrentResult) -> Result<bool, S::Error>;
        fn set_fetch_direction(&mut self, direction: FetchDirection) -> Result<(), S::Error>;
        fn set_fetch_size(&mut self, rows: u32) -> Result<(), S::Error>;
        fn generated_keys(&mut self) -> Result<S::ResultSet, S::Error>;
        fn set_poolable(&mut self, poolable: bool) -> Result<(), S::Error>;
        fn close_on_completion(&mut self) -> Result<(), S::Error>;
    }
}

/// Extension trait for easy wrapping of statements.
pub trait TracingExt: Statement + Sized {
    /// Wrap this statement with tracing instrumentation.
    fn with_tracing(self) -> TracedStatement<Self>;

    /// Wrap this statement with custom tracing configuration.
    fn with_tracing_config(self, config: TracingConfig) -> TracedStatement<Self>;
}

impl<S: Statement> TracingExt for S {
    fn with_tracing(self) -> TracedStatement<Self> {
        TracedStatement::wrap(self)
    }

    fn with_tracing_config(self, config: TracingConfig) -> TracedStatement<Self> {
        TracedStatement::new(self, config)
    }
}
