//! # statement-tracing
//!
//! Tracing instrumentation for SQL statement handles.
//!
//! This crate wraps a statement handle so that every SQL execution runs inside
//! a tracing span, without changing what the handle does: results, update
//! counts and errors come back exactly as the wrapped handle produced them.
//!
//! ## Features
//!
//! - **Drop-in wrapper**: `TracedStatement` implements the same `Statement` trait it wraps
//! - **One span per call**: queries, updates, executes and whole batches each get one span
//! - **Join, don't start**: optionally trace only inside an already active span
//! - **Ignore lists**: statements like health-check pings can be excluded by exact text
//! - **Never in the way**: tracer failures degrade to "no span", never to a failed statement
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sea_orm::Database;
//! use statement_tracing::{SeaOrmStatement, Statement, TracingExt};
//!
//! let db = Database::connect("postgres://localhost/mydb").await?;
//! let mut statement = SeaOrmStatement::new(db).with_tracing();
//!
//! // Use it exactly like the wrapped statement
//! let rows = statement.execute_query("SELECT * FROM users").await?;
//! ```
//!
//! ## Configuration
//!
//! ```rust,ignore
//! use statement_tracing::{TracedStatement, TracingConfig};
//!
//! let config = TracingConfig::default()
//!     .with_db_type("postgresql")
//!     .with_db_user("app")
//!     .with_active_span_only(true)
//!     .with_ignored_statement("SELECT 1");
//!
//! let traced = TracedStatement::new(statement, config);
//! ```
//!
//! Without an explicit tracer, each call uses the tracer registered with
//! [`register_global_tracer`], or else the current `tracing` default.
//!
//! ## Span Attributes
//!
//! Every span is named `db.query` and carries:
//!
//! | Attribute | Description |
//! |-----------|-------------|
//! | `otel.name` / `db.operation` | "Query", "Update", "Execute" or "Batch" |
//! | `otel.kind` | Always "client" |
//! | `db.statement` | The SQL text (for batches, the prepared query followed by every batched command) |
//! | `db.system` | Database type (when configured) |
//! | `db.user` | Database user (when configured) |
//! | `db.rows_affected` | Update count, or the sum of batch counts |
//! | `db.duration_ms` | Execution time |
//! | `otel.status_code` | "OK" or "ERROR" |
//! | `error.message` | Error details (on failure) |
//! | `slow_query` | Set when the slow query threshold is exceeded |

mod backend;
mod config;
mod error;
mod global;
mod scope;
mod statement;
mod traced;

pub use backend::SeaOrmStatement;
pub use config::TracingConfig;
pub use error::StatementError;
pub use global::{global_tracer, register_global_tracer, unregister_global_tracer};
pub use scope::{build_scope, OperationKind, TracingScope};
pub use statement::{
    CurrentResult, FetchDirection, GeneratedKeys, Holdability, ResultSetConcurrency,
    ResultSetType, SqlWarning, Statement,
};
pub use traced::{TracedStatement, TracingExt};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{SeaOrmStatement, Statement, TracedStatement, TracingConfig, TracingExt};
}
