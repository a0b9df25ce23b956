//! The statement-execution surface that traced handles wrap.

use std::time::Duration;

use async_trait::async_trait;

/// How an update or execute call should expose auto-generated keys.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GeneratedKeys {
    /// Do not make generated keys available.
    #[default]
    NoGeneratedKeys,
    /// Make all driver-chosen generated keys available.
    ReturnGeneratedKeys,
    /// Return the generated values of the columns at these (1-based) indexes.
    ColumnIndexes(Vec<usize>),
    /// Return the generated values of the named columns.
    ColumnNames(Vec<String>),
}

/// Direction hint for fetching rows from a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchDirection {
    /// Rows are processed first to last.
    #[default]
    Forward,
    /// Rows are processed last to first.
    Reverse,
    /// Processing order is unknown.
    Unknown,
}

/// How a result set's cursor may move and whether it sees concurrent changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultSetType {
    /// The cursor only moves forward.
    #[default]
    ForwardOnly,
    /// Scrollable, and not affected by changes made by others.
    ScrollInsensitive,
    /// Scrollable, and reflects changes made by others.
    ScrollSensitive,
}

/// Whether a result set can be updated through its cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultSetConcurrency {
    /// Rows cannot be updated through the result set.
    #[default]
    ReadOnly,
    /// Rows can be updated through the result set.
    Updatable,
}

/// Whether open result sets survive a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Holdability {
    /// Result sets stay open after commit.
    HoldCursorsOverCommit,
    /// Result sets are closed on commit.
    #[default]
    CloseCursorsAtCommit,
}

/// What happens to the current result set when moving to the next result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurrentResult {
    /// Close the current result set.
    #[default]
    Close,
    /// Keep the current result set open.
    Keep,
    /// Close every result set that is still open.
    CloseAll,
}

/// A warning reported by the database for a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlWarning {
    /// Human-readable warning text.
    pub message: String,
    /// Five-character SQLSTATE code, when the driver reports one.
    pub sql_state: Option<String>,
    /// Vendor-specific error code. Default: 0
    pub vendor_code: i32,
}

impl SqlWarning {
    /// Create a warning with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql_state: None,
            vendor_code: 0,
        }
    }
}

/// An executable SQL statement handle.
///
/// Implementors are single-owner handles: every mutating operation takes
/// `&mut self`, so a handle is never driven from two places at once. The
/// execution methods are async; queue and metadata accessors are not.
///
/// [`TracedStatement`](crate::TracedStatement) implements this trait itself,
/// so a traced handle can be used anywhere the plain one could.
#[async_trait]
pub trait Statement: Send {
    /// Rows produced by a query.
    type ResultSet: Send;
    /// The connection that produced this statement.
    type Connection;
    /// Error reported by the driver.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Executes a query and returns its rows.
    async fn execute_query(&mut self, sql: &str) -> Result<Self::ResultSet, Self::Error>;

    /// Executes a data-modifying statement and returns the affected row count.
    async fn execute_update(&mut self, sql: &str) -> Result<u64, Self::Error>;

    /// Like [`execute_update`](Statement::execute_update), also requesting generated keys.
    async fn execute_update_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<u64, Self::Error>;

    /// Executes any statement. Returns `true` when the first result is a result set.
    async fn execute(&mut self, sql: &str) -> Result<bool, Self::Error>;

    /// Like [`execute`](Statement::execute), also requesting generated keys.
    async fn execute_with_keys(&mut self, sql: &str, keys: GeneratedKeys)
        -> Result<bool, Self::Error>;

    /// Submits every queued batch command and returns one update count per command.
    async fn execute_batch(&mut self) -> Result<Vec<u64>, Self::Error>;

    /// Queues a command for the next [`execute_batch`](Statement::execute_batch).
    fn add_batch(&mut self, sql: &str) -> Result<(), Self::Error>;

    /// Empties the batch queue.
    fn clear_batch(&mut self) -> Result<(), Self::Error>;

    /// Releases the statement. Closing twice is a no-op.
    fn close(&mut self) -> Result<(), Self::Error>;
    /// Whether [`close`](Statement::close) has been called.
    fn is_closed(&self) -> Result<bool, Self::Error>;

    /// Requests cancellation of the running statement, if the driver supports it.
    fn cancel(&self) -> Result<(), Self::Error>;

    /// Byte limit for character and binary column values; `0` means unlimited.
    fn max_field_size(&self) -> Result<usize, Self::Error>;
    /// Set the column value byte limit.
    fn set_max_field_size(&mut self, max: usize) -> Result<(), Self::Error>;

    /// Row limit for result sets; `0` means unlimited.
    fn max_rows(&self) -> Result<u64, Self::Error>;
    /// Set the result set row limit.
    fn set_max_rows(&mut self, max: u64) -> Result<(), Self::Error>;

    /// Turn driver-side escape processing on or off.
    fn set_escape_processing(&mut self, enable: bool) -> Result<(), Self::Error>;

    /// `None` means no limit.
    fn query_timeout(&self) -> Result<Option<Duration>, Self::Error>;
    /// Set how long the driver waits for a statement to finish.
    fn set_query_timeout(&mut self, timeout: Option<Duration>) -> Result<(), Self::Error>;

    /// Warnings reported since the last [`clear_warnings`](Statement::clear_warnings).
    fn warnings(&self) -> Result<Vec<SqlWarning>, Self::Error>;
    /// Forget every reported warning.
    fn clear_warnings(&mut self) -> Result<(), Self::Error>;

    /// Name the cursor used by subsequent queries.
    fn set_cursor_name(&mut self, name: &str) -> Result<(), Self::Error>;

    /// Takes the current result set, if the last execution produced one.
    fn result_set(&mut self) -> Result<Option<Self::ResultSet>, Self::Error>;

    /// Update count of the current result, `None` if it is a result set or there is none.
    fn update_count(&self) -> Result<Option<u64>, Self::Error>;

    /// Move to the next result. Returns `true` when it is a result set.
    fn more_results(&mut self, current: CurrentResult) -> Result<bool, Self::Error>;

    /// Fetch direction hint.
    fn fetch_direction(&self) -> Result<FetchDirection, Self::Error>;
    /// Set the fetch direction hint.
    fn set_fetch_direction(&mut self, direction: FetchDirection) -> Result<(), Self::Error>;

    /// Number of rows fetched per round trip; `0` lets the driver decide.
    fn fetch_size(&self) -> Result<u32, Self::Error>;
    /// Set the number of rows fetched per round trip.
    fn set_fetch_size(&mut self, rows: u32) -> Result<(), Self::Error>;

    /// Concurrency of result sets this statement produces.
    fn result_set_concurrency(&self) -> Result<ResultSetConcurrency, Self::Error>;
    /// Cursor type of result sets this statement produces.
    fn result_set_type(&self) -> Result<ResultSetType, Self::Error>;
    /// Holdability of result sets this statement produces.
    fn result_set_holdability(&self) -> Result<Holdability, Self::Error>;

    /// Keys generated by the last keyed execution.
    fn generated_keys(&mut self) -> Result<Self::ResultSet, Self::Error>;

    /// The connection that produced this statement.
    fn connection(&self) -> Result<&Self::Connection, Self::Error>;

    /// Hint whether a pool may reuse this statement.
    fn set_poolable(&mut self, poolable: bool) -> Result<(), Self::Error>;
    /// Whether a pool may reuse this statement.
    fn is_poolable(&self) -> Result<bool, Self::Error>;

    /// Close the statement once all of its result sets are closed.
    fn close_on_completion(&mut self) -> Result<(), Self::Error>;
    /// Whether [`close_on_completion`](Statement::close_on_completion) is set.
    fn is_close_on_completion(&self) -> Result<bool, Self::Error>;
}
