//! A [`Statement`] backed by a SeaORM connection.

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, QueryResult};

use crate::error::StatementError;
use crate::statement::{
    CurrentResult, FetchDirection, GeneratedKeys, Holdability, ResultSetConcurrency,
    ResultSetType, SqlWarning, Statement,
};

/// Statement handle over any SeaORM connection or transaction.
///
/// Each execution produces exactly one result: rows for queries, an update
/// count for updates. Batched commands are sent one after another and are
/// kept queued until [`clear_batch`](Statement::clear_batch).
///
/// [`execute`](Statement::execute) runs the SQL once as a query. When no rows
/// come back the update count is reported as `0`, because a row-returning
/// round trip carries no affected-row count and re-sending the SQL to get one
/// would run it twice.
///
/// SQL is always sent verbatim, so escape processing is a no-op. The query
/// timeout is stored for callers to read back but is not enforced, and
/// generated keys and cancellation are reported as unsupported.
pub struct SeaOrmStatement<C> {
    conn: C,
    batch: Vec<String>,
    current: Option<Vec<QueryResult>>,
    update_count: Option<u64>,
    closed: bool,
    close_on_completion: bool,
    poolable: bool,
    max_field_size: usize,
    max_rows: u64,
    query_timeout: Option<Duration>,
    fetch_direction: FetchDirection,
    fetch_size: u32,
    cursor_name: Option<String>,
}

impl<C: ConnectionTrait> SeaOrmStatement<C> {
    /// Create a statement on `conn`.
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            batch: Vec::new(),
            current: None,
            update_count: None,
            closed: false,
            close_on_completion: false,
            poolable: false,
            max_field_size: 0,
            max_rows: 0,
            query_timeout: None,
            fetch_direction: FetchDirection::Forward,
            fetch_size: 0,
            cursor_name: None,
        }
    }

    /// Get the database backend name for span attributes.
    pub fn db_system(&self) -> &'static str {
        match self.conn.get_database_backend() {
            DbBackend::Postgres => "postgresql",
            DbBackend::MySql => "mysql",
            DbBackend::Sqlite => "sqlite",
        }
    }

    /// The cursor name set with [`set_cursor_name`](Statement::set_cursor_name).
    pub fn cursor_name(&self) -> Option<&str> {
        self.cursor_name.as_deref()
    }

    /// Consume the statement and return the connection.
    pub fn into_inner(self) -> C {
        self.conn
    }

    fn ensure_open(&self) -> Result<(), StatementError> {
        if self.closed {
            Err(StatementError::Closed)
        } else {
            Ok(())
        }
    }

    fn sea_statement(&self, sql: &str) -> sea_orm::Statement {
        sea_orm::Statement::from_string(self.conn.get_database_backend(), sql)
    }
}

impl From<DatabaseConnection> for SeaOrmStatement<DatabaseConnection> {
    fn from(conn: DatabaseConnection) -> Self {
        Self::new(conn)
    }
}

impl<C: std::fmt::Debug> std::fmt::Debug for SeaOrmStatement<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeaOrmStatement")
            .field("conn", &self.conn)
            .field("batch", &self.batch)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

fn no_generated_keys(keys: &GeneratedKeys) -> Result<(), StatementError> {
    match keys {
        GeneratedKeys::NoGeneratedKeys => Ok(()),
        _ => Err(StatementError::Unsupported("generated keys")),
    }
}

async fn fetch<C: ConnectionTrait>(
    conn: &C,
    stmt: sea_orm::Statement,
    max_rows: u64,
) -> Result<Vec<QueryResult>, StatementError> {
    let mut rows = conn.query_all(stmt).await?;
    if max_rows > 0 {
        rows.truncate(usize::try_from(max_rows).unwrap_or(usize::MAX));
    }
    Ok(rows)
}

#[async_trait]
impl<C> Statement for SeaOrmStatement<C>
where
    C: ConnectionTrait + Send,
{
    type ResultSet = Vec<QueryResult>;
    type Connection = C;
    type Error = StatementError;

    async fn execute_query(&mut self, sql: &str) -> Result<Vec<QueryResult>, StatementError> {
        self.ensure_open()?;
        let stmt = self.sea_statement(sql);
        let rows = fetch(&self.conn, stmt, self.max_rows).await?;
        self.current = None;
        self.update_count = None;
        Ok(rows)
    }

    async fn execute_update(&mut self, sql: &str) -> Result<u64, StatementError> {
        self.ensure_open()?;
        let stmt = self.sea_statement(sql);
        let rows_affected = self.conn.execute(stmt).await?.rows_affected();
        self.current = None;
        self.update_count = Some(rows_affected);
        Ok(rows_affected)
    }

    async fn execute_update_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<u64, StatementError> {
        no_generated_keys(&keys)?;
        self.execute_update(sql).await
    }

    async fn execute(&mut self, sql: &str) -> Result<bool, StatementError> {
        self.ensure_open()?;
        let stmt = self.sea_statement(sql);
        let rows = fetch(&self.conn, stmt, self.max_rows).await?;
        if rows.is_empty() {
            self.current = None;
            self.update_count = Some(0);
            Ok(false)
        } else {
            self.current = Some(rows);
            self.update_count = None;
            Ok(true)
        }
    }

    async fn execute_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<bool, StatementError> {
        no_generated_keys(&keys)?;
        self.execute(sql).await
    }

    async fn execute_batch(&mut self) -> Result<Vec<u64>, StatementError> {
        self.ensure_open()?;
        let backend = self.conn.get_database_backend();
        let mut counts = Vec::with_capacity(self.batch.len());
        for sql in &self.batch {
            let stmt = sea_orm::Statement::from_string(backend, sql.as_str());
            counts.push(self.conn.execute(stmt).await?.rows_affected());
        }
        self.current = None;
        self.update_count = None;
        Ok(counts)
    }

    fn add_batch(&mut self, sql: &str) -> Result<(), StatementError> {
        self.ensure_open()?;
        self.batch.push(sql.to_owned());
        Ok(())
    }

    fn clear_batch(&mut self) -> Result<(), StatementError> {
        self.ensure_open()?;
        self.batch.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<(), StatementError> {
        self.closed = true;
        self.batch.clear();
        self.current = None;
        self.update_count = None;
        Ok(())
    }

    fn is_closed(&self) -> Result<bool, StatementError> {
        Ok(self.closed)
    }

    fn cancel(&self) -> Result<(), StatementError> {
        self.ensure_open()?;
        Err(StatementError::Unsupported("cancel"))
    }

    fn max_field_size(&self) -> Result<usize, StatementError> {
        self.ensure_open()?;
        Ok(self.max_field_size)
    }

    fn set_max_field_size(&mut self, max: usize) -> Result<(), StatementError> {
        self.ensure_open()?;
        self.max_field_size = max;
        Ok(())
    }

    fn max_rows(&self) -> Result<u64, StatementError> {
        self.ensure_open()?;
        Ok(self.max_rows)
    }

    fn set_max_rows(&mut self, max: u64) -> Result<(), StatementError> {
        self.ensure_open()?;
        self.max_rows = max;
        Ok(())
    }

    fn set_escape_processing(&mut self, _enable: bool) -> Result<(), StatementError> {
        self.ensure_open()
    }

    fn query_timeout(&self) -> Result<Option<Duration>, StatementError> {
        self.ensure_open()?;
        Ok(self.query_timeout)
    }

    fn set_query_timeout(&mut self, timeout: Option<Duration>) -> Result<(), StatementError> {
        self.ensure_open()?;
        self.query_timeout = timeout;
        Ok(())
    }

    fn warnings(&self) -> Result<Vec<SqlWarning>, StatementError> {
        // SeaORM does not surface server notices.
        self.ensure_open()?;
        Ok(Vec::new())
    }

    fn clear_warnings(&mut self) -> Result<(), StatementError> {
        self.ensure_open()
    }

    fn set_cursor_name(&mut self, name: &str) -> Result<(), StatementError> {
        self.ensure_open()?;
        self.cursor_name = Some(name.to_owned());
        Ok(())
    }

    fn result_set(&mut self) -> Result<Option<Vec<QueryResult>>, StatementError> {
        self.ensure_open()?;
        Ok(self.current.take())
    }

    fn update_count(&self) -> Result<Option<u64>, StatementError> {
        self.ensure_open()?;
        Ok(self.update_count)
    }

    fn more_results(&mut self, current: CurrentResult) -> Result<bool, StatementError> {
        self.ensure_open()?;
        if current != CurrentResult::Keep {
            self.current = None;
        }
        self.update_count = None;
        if self.close_on_completion && self.current.is_none() {
            self.close()?;
        }
        Ok(false)
    }

    fn fetch_direction(&self) -> Result<FetchDirection, StatementError> {
        self.ensure_open()?;
        Ok(self.fetch_direction)
    }

    fn set_fetch_direction(&mut self, direction: FetchDirection) -> Result<(), StatementError> {
        self.ensure_open()?;
        self.fetch_direction = direction;
        Ok(())
    }

    fn fetch_size(&self) -> Result<u32, StatementError> {
        self.ensure_open()?;
        Ok(self.fetch_size)
    }

    fn set_fetch_size(&mut self, rows: u32) -> Result<(), StatementError> {
        self.ensure_open()?;
        self.fetch_size = rows;
        Ok(())
    }

    fn result_set_concurrency(&self) -> Result<ResultSetConcurrency, StatementError> {
        self.ensure_open()?;
        Ok(ResultSetConcurrency::ReadOnly)
    }

    fn result_set_type(&self) -> Result<ResultSetType, StatementError> {
        self.ensure_open()?;
        Ok(ResultSetType::ForwardOnly)
    }

    fn result_set_holdability(&self) -> Result<Holdability, StatementError> {
        self.ensure_open()?;
        Ok(Holdability::CloseCursorsAtCommit)
    }

    fn generated_keys(&mut self) -> Result<Vec<QueryResult>, StatementError> {
        self.ensure_open()?;
        Err(StatementError::Unsupported("generated keys"))
    }

    fn connection(&self) -> Result<&C, StatementError> {
        self.ensure_open()?;
        Ok(&self.conn)
    }

    fn set_poolable(&mut self, poolable: bool) -> Result<(), StatementError> {
        self.ensure_open()?;
        self.poolable = poolable;
        Ok(())
    }

    fn is_poolable(&self) -> Result<bool, StatementError> {
        self.ensure_open()?;
        Ok(self.poolable)
    }

    fn close_on_completion(&mut self) -> Result<(), StatementError> {
        self.ensure_open()?;
        self.close_on_completion = true;
        Ok(())
    }

    fn is_close_on_completion(&self) -> Result<bool, StatementError> {
        self.ensure_open()?;
        Ok(self.close_on_completion)
    }
}
