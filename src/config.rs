//! Configuration for tracing behavior.

use std::collections::HashSet;
use std::time::Duration;

use tracing::Dispatch;

/// Configuration options for statement tracing.
///
/// # Example
///
/// ```rust
/// use statement_tracing::TracingConfig;
/// use std::time::Duration;
///
/// let config = TracingConfig::default()
///     .with_db_type("postgresql")
///     .with_db_user("app")
///     .with_ignored_statement("SELECT 1")
///     .with_slow_query_threshold(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Database type recorded as `db.system`.
    /// Default: `None` (field left unrecorded)
    pub db_type: Option<String>,

    /// Database user recorded as `db.user`.
    /// Default: `None` (field left unrecorded)
    pub db_user: Option<String>,

    /// Only trace statements executed while a span is already active.
    /// With this set, statements never start a new trace on their own.
    /// Default: `false`
    pub active_span_only: bool,

    /// Statements that are never traced. Matching is on the exact SQL text.
    /// Default: empty
    pub ignored_statements: HashSet<String>,

    /// Tracer used for statement spans.
    /// Default: `None` (resolved on every call, see [`global_tracer`](crate::global_tracer))
    pub tracer: Option<Dispatch>,

    /// Threshold for logging slow statements at WARN level.
    /// Default: 500ms
    pub slow_query_threshold: Duration,

    /// Whether to record the number of rows affected by updates and batches.
    /// Default: `true`
    pub record_row_counts: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            db_type: None,
            db_user: None,
            active_span_only: false,
            ignored_statements: HashSet::new(),
            tracer: None,
            slow_query_threshold: Duration::from_millis(500),
            record_row_counts: true,
        }
    }
}

impl TracingConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database type label (e.g. `"postgresql"`).
    pub fn with_db_type(mut self, db_type: impl Into<String>) -> Self {
        self.db_type = Some(db_type.into());
        self
    }

    /// Set the database user label.
    pub fn with_db_user(mut self, db_user: impl Into<String>) -> Self {
        self.db_user = Some(db_user.into());
        self
    }

    /// Only create spans when called inside an already active span.
    pub fn with_active_span_only(mut self, enabled: bool) -> Self {
        self.active_span_only = enabled;
        self
    }

    /// Exclude a statement from tracing.
    pub fn with_ignored_statement(mut self, sql: impl Into<String>) -> Self {
        self.ignored_statements.insert(sql.into());
        self
    }

    /// Exclude several statements from tracing.
    pub fn with_ignored_statements<I, T>(mut self, statements: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.ignored_statements
            .extend(statements.into_iter().map(Into::into));
        self
    }

    /// Use an explicit tracer instead of the process-wide default.
    pub fn with_tracer(mut self, tracer: impl Into<Dispatch>) -> Self {
        self.tracer = Some(tracer.into());
        self
    }

    /// Set the threshold for slow statement warnings.
    ///
    /// Statements taking longer than this duration will be logged at WARN level
    /// with the `slow_query` field set to `true`.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    /// Enable or disable row count recording.
    pub fn with_row_count_recording(mut self, enabled: bool) -> Self {
        self.record_row_counts = enabled;
        self
    }

    /// Returns `true` when `sql` must not be traced.
    pub fn is_ignored(&self, sql: &str) -> bool {
        self.ignored_statements.contains(sql)
    }

    /// Create a development-friendly configuration that traces everything.
    pub fn development() -> Self {
        Self {
            slow_query_threshold: Duration::from_millis(100),
            ..Self::default()
        }
    }

    /// Create a production configuration that only joins existing traces.
    pub fn production() -> Self {
        Self {
            active_span_only: true,
            slow_query_threshold: Duration::from_secs(1),
            ..Self::default()
        }
    }
}
