//! Deterministic topic and subscription naming.
//!
//! The topic name is the sole discovery mechanism between services — there
//! is no registry — so both functions must be pure: every service instance
//! computes the same name from the same inputs.

/// Transport-level topic for an event type: `<namespace>/<event_type>`.
pub fn topic_for(namespace: &str, event_type: &str) -> String {
    format!("{}/{}", namespace, event_type)
}

/// Per-service subscription name: `<service_name>-<event_type>`.
///
/// Services sharing a subscription name compete for messages; distinct
/// names each receive every message (broadcast).
pub fn subscription_for(service_name: &str, event_type: &str) -> String {
    format!("{}-{}", service_name, event_type)
}
