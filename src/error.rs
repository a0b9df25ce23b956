//! Errors raised by the bundled SeaORM statement.

use sea_orm::DbErr;
use thiserror::Error;

/// Error type for [`SeaOrmStatement`](crate::SeaOrmStatement).
#[derive(Debug, Error)]
pub enum StatementError {
    /// The database rejected or failed the statement.
    #[error(transparent)]
    Db(#[from] DbErr),

    /// The statement was used after [`close`](crate::Statement::close).
    #[error("statement is closed")]
    Closed,

    /// The connection cannot perform this operation.
    #[error("{0} is not supported by this connection")]
    Unsupported(&'static str),
}
