//! Basic example showing how to use statement-tracing.
//!
//! Run with: cargo run --example basic

use sea_orm::Database;
use statement_tracing::prelude::*;
use statement_tracing::StatementError;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,statement_tracing=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Connect to database
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/test".into());

    tracing::info!("Connecting to database...");

    let db = Database::connect(&database_url).await?;
    let statement = SeaOrmStatement::from(db);

    // Option 1: Simple wrapping with defaults
    // let mut traced = statement.with_tracing();

    // Option 2: Only trace inside request spans, skip health checks
    let config = TracingConfig::production()
        .with_db_type(statement.db_system())
        .with_ignored_statement("SELECT 1");
    let mut traced = statement.with_tracing_config(config);

    // Not traced: ignored, and there is no active span yet.
    traced.execute_query("SELECT 1").await?;

    async {
        traced
            .execute_update("CREATE TABLE IF NOT EXISTS demo (id INT)")
            .await?;

        traced.add_batch("INSERT INTO demo VALUES (1);")?;
        traced.add_batch("INSERT INTO demo VALUES (2);")?;
        let counts = traced.execute_batch().await?;
        traced.clear_batch()?;
        tracing::info!(?counts, "Batch executed");

        let rows = traced.execute_query("SELECT id FROM demo").await?;
        tracing::info!(rows = rows.len(), "Query executed");

        Ok::<_, StatementError>(())
    }
    .instrument(tracing::info_span!("request"))
    .await?;

    traced.close()?;
    Ok(())
}
