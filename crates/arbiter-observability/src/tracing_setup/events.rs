//! Structured events emitted from more than one engine.

/// A best-effort write or an external dependency failed and the caller
/// continued without it.
pub fn degradation_triggered(component: &str, failure: &str, fallback: &str) {
    tracing::warn!(
        component = component,
        failure = failure,
        fallback = fallback,
        "degradation triggered"
    );
}

/// An entity changed lifecycle status.
pub fn status_transition(entity: &str, id: &str, from: &str, to: &str) {
    tracing::info!(entity = entity, id = id, from = from, to = to, "status transition");
}
