#![allow(dead_code)]

//! Shared test doubles: a recording tracer and an in-memory statement.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use statement_tracing::{
    CurrentResult, FetchDirection, GeneratedKeys, Holdability, ResultSetConcurrency,
    ResultSetType, SqlWarning, Statement,
};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Dispatch, Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

// ---------------------------------------------------------------------------
// Recording tracer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecordedSpan {
    pub id: u64,
    pub name: &'static str,
    pub parent: Option<&'static str>,
    pub fields: BTreeMap<String, String>,
    pub closed: bool,
}

impl RecordedSpan {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub level: tracing::Level,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct Recording {
    spans: Vec<RecordedSpan>,
    events: Vec<RecordedEvent>,
}

/// Handle for inspecting what the recording tracer saw.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<Recording>>,
}

impl Recorder {
    /// All spans named `db.query`.
    pub fn statement_spans(&self) -> Vec<RecordedSpan> {
        self.spans()
            .into_iter()
            .filter(|span| span.name == "db.query")
            .collect()
    }

    pub fn spans(&self) -> Vec<RecordedSpan> {
        self.inner.lock().unwrap().spans.clone()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.inner.lock().unwrap().events.clone()
    }
}

#[derive(Default)]
struct FieldVisitor(BTreeMap<String, String>);

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

struct RecordingLayer {
    recorder: Recorder,
}

impl<S> Layer<S> for RecordingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        let parent = ctx
            .span(id)
            .and_then(|span| span.parent())
            .map(|parent| parent.name());

        self.recorder.inner.lock().unwrap().spans.push(RecordedSpan {
            id: id.into_u64(),
            name: attrs.metadata().name(),
            parent,
            fields: visitor.0,
            closed: false,
        });
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);

        let mut recording = self.recorder.inner.lock().unwrap();
        if let Some(span) = recording
            .spans
            .iter_mut()
            .rev()
            .find(|span| span.id == id.into_u64() && !span.closed)
        {
            span.fields.extend(visitor.0);
        }
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.recorder
            .inner
            .lock()
            .unwrap()
            .events
            .push(RecordedEvent {
                level: *event.metadata().level(),
                fields: visitor.0,
            });
    }

    fn on_close(&self, id: Id, _ctx: Context<'_, S>) {
        let mut recording = self.recorder.inner.lock().unwrap();
        if let Some(span) = recording
            .spans
            .iter_mut()
            .rev()
            .find(|span| span.id == id.into_u64() && !span.closed)
        {
            span.closed = true;
        }
    }
}

/// A tracer that records every span and event it sees.
pub fn recording_tracer() -> (Recorder, Dispatch) {
    let recorder = Recorder::default();
    let subscriber = tracing_subscriber::registry().with(RecordingLayer {
        recorder: recorder.clone(),
    });
    (recorder, Dispatch::new(subscriber))
}

struct PanickingLayer;

impl<S: Subscriber> Layer<S> for PanickingLayer {
    fn on_new_span(&self, _attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        panic!("tracer backend unavailable");
    }
}

/// A tracer whose span creation always panics.
pub fn panicking_tracer() -> Dispatch {
    Dispatch::new(tracing_subscriber::registry().with(PanickingLayer))
}

/// Panics when the named field is recorded on an existing span.
struct PanicOnRecord(&'static str);

impl<S: Subscriber> Layer<S> for PanicOnRecord {
    fn on_record(&self, _id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        let mut hit = false;
        values.record(&mut |field: &Field, _value: &dyn fmt::Debug| {
            hit |= field.name() == self.0;
        });
        if hit {
            panic!("tracer rejected {}", self.0);
        }
    }
}

/// A tracer that creates spans but panics when `field` is tagged after creation.
pub fn panic_on_record_tracer(field: &'static str) -> Dispatch {
    Dispatch::new(tracing_subscriber::registry().with(PanicOnRecord(field)))
}

struct PanicOnEnter;

impl<S: Subscriber> Layer<S> for PanicOnEnter {
    fn on_enter(&self, _id: &Id, _ctx: Context<'_, S>) {
        panic!("tracer cannot enter spans");
    }
}

/// A tracer that creates spans but panics whenever one is entered.
pub fn panic_on_enter_tracer() -> Dispatch {
    Dispatch::new(tracing_subscriber::registry().with(PanicOnEnter))
}

// ---------------------------------------------------------------------------
// In-memory statement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRows {
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("mock failure: {0}")]
pub struct MockError(pub String);

/// Everything the statement was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Query(String),
    Update(String, GeneratedKeys),
    Execute(String, GeneratedKeys),
    Batch(Vec<String>),
    AddBatch(String),
    ClearBatch,
}

#[derive(Debug, Default)]
pub struct MockConnection {
    pub url: String,
}

/// A statement that answers from memory and records its calls.
#[derive(Debug, Default)]
pub struct MockStatement {
    pub calls: Vec<Call>,
    pub queued: Vec<String>,
    pub update_count: u64,
    pub fail_with: Option<String>,
    pub fail_add_batch: bool,
    pub fail_clear_batch: bool,
    pub delay: Option<Duration>,
    pub last_rows: Option<Arc<MockRows>>,
    pub connection: MockConnection,
    closed: bool,
    max_field_size: usize,
    max_rows: u64,
    query_timeout: Option<Duration>,
    fetch_direction: FetchDirection,
    fetch_size: u32,
    poolable: bool,
    close_on_completion: bool,
    cursor_name: Option<String>,
    warnings: Vec<SqlWarning>,
}

impl MockStatement {
    pub fn new() -> Self {
        Self {
            update_count: 1,
            connection: MockConnection {
                url: "mock://db".to_string(),
            },
            warnings: vec![SqlWarning::new("mock warning")],
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn cursor_name(&self) -> Option<&str> {
        self.cursor_name.as_deref()
    }

    fn outcome(&self) -> Result<(), MockError> {
        match &self.fail_with {
            Some(message) => Err(MockError(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Statement for MockStatement {
    type ResultSet = Arc<MockRows>;
    type Connection = MockConnection;
    type Error = MockError;

    async fn execute_query(&mut self, sql: &str) -> Result<Arc<MockRows>, MockError> {
        self.calls.push(Call::Query(sql.to_string()));
        self.outcome()?;
        let rows = Arc::new(MockRows {
            sql: sql.to_string(),
        });
        self.last_rows = Some(rows.clone());
        Ok(rows)
    }

    async fn execute_update(&mut self, sql: &str) -> Result<u64, MockError> {
        self.execute_update_with_keys(sql, GeneratedKeys::NoGeneratedKeys)
            .await
    }

    async fn execute_update_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<u64, MockError> {
        self.calls.push(Call::Update(sql.to_string(), keys));
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.outcome()?;
        Ok(self.update_count)
    }

    async fn execute(&mut self, sql: &str) -> Result<bool, MockError> {
        self.execute_with_keys(sql, GeneratedKeys::NoGeneratedKeys)
            .await
    }

    async fn execute_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<bool, MockError> {
        self.calls.push(Call::Execute(sql.to_string(), keys));
        self.outcome()?;
        Ok(sql.starts_with("SELECT"))
    }

    async fn execute_batch(&mut self) -> Result<Vec<u64>, MockError> {
        self.calls.push(Call::Batch(self.queued.clone()));
        self.outcome()?;
        Ok(vec![self.update_count; self.queued.len()])
    }

    fn add_batch(&mut self, sql: &str) -> Result<(), MockError> {
        if self.fail_add_batch {
            return Err(MockError(format!("cannot queue {sql}")));
        }
        self.calls.push(Call::AddBatch(sql.to_string()));
        self.queued.push(sql.to_string());
        Ok(())
    }

    fn clear_batch(&mut self) -> Result<(), MockError> {
        if self.fail_clear_batch {
            return Err(MockError("cannot clear batch".to_string()));
        }
        self.calls.push(Call::ClearBatch);
        self.queued.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<(), MockError> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> Result<bool, MockError> {
        Ok(self.closed)
    }

    fn cancel(&self) -> Result<(), MockError> {
        Err(MockError("nothing to cancel".to_string()))
    }

    fn max_field_size(&self) -> Result<usize, MockError> {
        Ok(self.max_field_size)
    }

    fn set_max_field_size(&mut self, max: usize) -> Result<(), MockError> {
        self.max_field_size = max;
        Ok(())
    }

    fn max_rows(&self) -> Result<u64, MockError> {
        Ok(self.max_rows)
    }

    fn set_max_rows(&mut self, max: u64) -> Result<(), MockError> {
        self.max_rows = max;
        Ok(())
    }

    fn set_escape_processing(&mut self, _enable: bool) -> Result<(), MockError> {
        Ok(())
    }

    fn query_timeout(&self) -> Result<Option<Duration>, MockError> {
        Ok(self.query_timeout)
    }

    fn set_query_timeout(&mut self, timeout: Option<Duration>) -> Result<(), MockError> {
        self.query_timeout = timeout;
        Ok(())
    }

    fn warnings(&self) -> Result<Vec<SqlWarning>, MockError> {
        Ok(self.warnings.clone())
    }

    fn clear_warnings(&mut self) -> Result<(), MockError> {
        self.warnings.clear();
        Ok(())
    }

    fn set_cursor_name(&mut self, name: &str) -> Result<(), MockError> {
        self.cursor_name = Some(name.to_string());
        Ok(())
    }

    fn result_set(&mut self) -> Result<Option<Arc<MockRows>>, MockError> {
        Ok(self.last_rows.clone())
    }

    fn update_count(&self) -> Result<Option<u64>, MockError> {
        Ok(Some(self.update_count))
    }

    fn more_results(&mut self, _current: CurrentResult) -> Result<bool, MockError> {
        self.last_rows = None;
        Ok(false)
    }

    fn fetch_direction(&self) -> Result<FetchDirection, MockError> {
        Ok(self.fetch_direction)
    }

    fn set_fetch_direction(&mut self, direction: FetchDirection) -> Result<(), MockError> {
        self.fetch_direction = direction;
        Ok(())
    }

    fn fetch_size(&self) -> Result<u32, MockError> {
        Ok(self.fetch_size)
    }

    fn set_fetch_size(&mut self, rows: u32) -> Result<(), MockError> {
        self.fetch_size = rows;
        Ok(())
    }

    fn result_set_concurrency(&self) -> Result<ResultSetConcurrency, MockError> {
        Ok(ResultSetConcurrency::Updatable)
    }

    fn result_set_type(&self) -> Result<ResultSetType, MockError> {
        Ok(ResultSetType::ScrollInsensitive)
    }

    fn result_set_holdability(&self) -> Result<Holdability, MockError> {
        Ok(Holdability::HoldCursorsOverCommit)
    }

    fn generated_keys(&mut self) -> Result<Arc<MockRows>, MockError> {
        Ok(Arc::new(MockRows {
            sql: "generated keys".to_string(),
        }))
    }

    fn connection(&self) -> Result<&MockConnection, MockError> {
        Ok(&self.connection)
    }

    fn set_poolable(&mut self, poolable: bool) -> Result<(), MockError> {
        self.poolable = poolable;
        Ok(())
    }

    fn is_poolable(&self) -> Result<bool, MockError> {
        Ok(self.poolable)
    }

    fn close_on_completion(&mut self) -> Result<(), MockError> {
        self.close_on_completion = true;
        Ok(())
    }

    fn is_close_on_completion(&self) -> Result<bool, MockError> {
        Ok(self.close_on_completion)
    }
}
