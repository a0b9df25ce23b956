//! Deciding whether a statement gets a span, and building it.

use std::future::{self, Future};
use std::panic::{self, AssertUnwindSafe};
use std::pin::pin;
use std::time::{Duration, Instant};

use tracing::{dispatcher, field, Span};

use crate::config::TracingConfig;
use crate::global::resolve_tracer;

/// The kind of statement execution a span represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// A call returning a result set.
    Query,
    /// A call returning an update count.
    Update,
    /// A generic execute call.
    Execute,
    /// Submission of the queued batch.
    Batch,
}

impl OperationKind {
    /// Returns the operation name used for spans.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Update => "Update",
            OperationKind::Execute => "Execute",
            OperationKind::Batch => "Batch",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An active span around exactly one statement call.
///
/// Dropping the scope releases the span, so it is closed on every exit path,
/// including when the call future is dropped before completion.
#[derive(Debug)]
#[must_use = "dropping a scope closes its span immediately"]
pub struct TracingScope {
    span: Span,
    slow_query_threshold: Duration,
    record_row_counts: bool,
}

/// Decide whether `sql` should be traced and, if so, create its span.
///
/// Returns `None` without touching any tracer when `sql` is one of the
/// configured ignored statements. Returns `None` when `active_span_only` is
/// set and the resolved tracer has no current span, or when the tracer
/// filters the span out. A tracer that panics while the span is built is
/// treated the same way; the statement itself still runs.
pub fn build_scope(
    kind: OperationKind,
    sql: &str,
    config: &TracingConfig,
) -> Option<TracingScope> {
    if config.is_ignored(sql) {
        return None;
    }

    let tracer = resolve_tracer(config.tracer.as_ref());
    let build = || {
        if config.active_span_only && Span::current().is_none() {
            return None;
        }
        Some(create_span(kind, sql, config))
    };

    let span = panic::catch_unwind(AssertUnwindSafe(|| {
        dispatcher::with_default(&tracer, build)
    }))
    .ok()
    .flatten()?;

    if span.is_disabled() {
        return None;
    }

    Some(TracingScope {
        span,
        slow_query_threshold: config.slow_query_threshold,
        record_row_counts: config.record_row_counts,
    })
}

fn create_span(kind: OperationKind, sql: &str, config: &TracingConfig) -> Span {
    let span = tracing::info_span!(
        "db.query",
        otel.name = %kind,
        otel.kind = "client",
        db.operation = %kind,
        db.statement = sql,
        db.system = field::Empty,
        db.user = field::Empty,
        db.rows_affected = field::Empty,
        db.duration_ms = field::Empty,
        otel.status_code = field::Empty,
        error.message = field::Empty,
        slow_query = field::Empty,
    );

    if let Some(db_type) = &config.db_type {
        span.record("db.system", db_type.as_str());
    }
    if let Some(db_user) = &config.db_user {
        span.record("db.user", db_user.as_str());
    }

    span
}

impl TracingScope {
    /// The span this scope keeps open.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Run `call` inside the span, then record its outcome and release the span.
    ///
    /// The call's result is returned untouched. A tracer that panics while the
    /// span is entered, tagged or closed loses that step; the panic never
    /// reaches the caller. Panics raised by `call` itself are not caught.
    pub async fn instrument<F, T, E>(
        self,
        call: F,
        row_count: impl FnOnce(&T) -> Option<u64>,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start = Instant::now();
        let result = self.in_span(call).await;

        let rows = result.as_ref().ok().and_then(row_count);
        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            self.record_result(&result, start, rows);
            drop(self);
        }));

        result
    }

    /// Poll `call` with the span entered.
    ///
    /// Once entering or exiting the span panics, the rest of the call is polled
    /// outside it.
    async fn in_span<F: Future>(&self, call: F) -> F::Output {
        let mut call = pin!(call);
        let mut healthy = true;
        future::poll_fn(|cx| {
            let entered = if healthy {
                let entered = panic::catch_unwind(AssertUnwindSafe(|| self.span.enter())).ok();
                healthy = entered.is_some();
                entered
            } else {
                None
            };

            let poll = call.as_mut().poll(cx);

            if let Some(entered) = entered {
                healthy = panic::catch_unwind(AssertUnwindSafe(move || drop(entered))).is_ok();
            }
            poll
        })
        .await
    }

    /// Record the result of a statement call in the span.
    fn record_result<T, E: std::fmt::Display>(
        &self,
        result: &Result<T, E>,
        start: Instant,
        row_count: Option<u64>,
    ) {
        let span = &self.span;
        let elapsed = start.elapsed();
        let duration_ms = elapsed.as_millis() as i64;
        span.record("db.duration_ms", duration_ms);

        if self.record_row_counts {
            if let Some(count) = row_count {
                span.record("db.rows_affected", count);
            }
        }

        if elapsed > self.slow_query_threshold {
            span.record("slow_query", true);
            let threshold_ms = self.slow_query_threshold.as_millis() as i64;
            self.emit(|| {
                tracing::warn!(
                    parent: span,
                    duration_ms = duration_ms,
                    threshold_ms = threshold_ms,
                    "Slow query detected"
                );
            });
        }

        match result {
            Ok(_) => {
                span.record("otel.status_code", "OK");
            }
            Err(e) => {
                span.record("otel.status_code", "ERROR");
                span.record("error.message", e.to_string().as_str());
                self.emit(|| {
                    tracing::error!(
                        parent: span,
                        error = %e,
                        "Statement execution failed"
                    );
                });
            }
        }
    }

    /// Emit events to the tracer that owns the span, not the ambient one.
    fn emit(&self, event: impl FnOnce()) {
        self.span
            .with_subscriber(|(_, tracer)| dispatcher::with_default(tracer, event));
    }
}

/// Run `call` inside `scope` when there is one, or bare otherwise.
pub(crate) async fn instrument<F, T, E>(
    scope: Option<TracingScope>,
    call: F,
    row_count: impl FnOnce(&T) -> Option<u64>,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match scope {
        Some(scope) => scope.instrument(call, row_count).await,
        None => call.await,
    }
}
