//! Process-wide default tracer.
//!
//! Statements configured without an explicit tracer resolve one on every
//! call: the tracer registered here if there is one, otherwise whatever
//! dispatcher `tracing` considers the current default. Unlike
//! `tracing::dispatcher::set_global_default`, the registration can be
//! replaced or removed at any time, and already-built statements pick the
//! change up on their next call.

use std::sync::{PoisonError, RwLock};

use tracing::{dispatcher, Dispatch};

static GLOBAL_TRACER: RwLock<Option<Dispatch>> = RwLock::new(None);

/// Register `tracer` as the default for statements without an explicit tracer.
///
/// Returns the previously registered tracer.
pub fn register_global_tracer(tracer: impl Into<Dispatch>) -> Option<Dispatch> {
    GLOBAL_TRACER
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(tracer.into())
}

/// Remove the registered tracer, falling back to the `tracing` default.
pub fn unregister_global_tracer() -> Option<Dispatch> {
    GLOBAL_TRACER
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
}

/// The currently registered tracer, if any.
pub fn global_tracer() -> Option<Dispatch> {
    GLOBAL_TRACER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Resolve the tracer for one call.
pub(crate) fn resolve_tracer(explicit: Option<&Dispatch>) -> Dispatch {
    match explicit {
        Some(tracer) => tracer.clone(),
        None => global_tracer().unwrap_or_else(|| dispatcher::get_default(Dispatch::clone)),
    }
}
