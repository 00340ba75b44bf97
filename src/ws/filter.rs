//! Interest-based filtering of upstream traffic.
//!
//! The event bus pushes state for every entity in the home. Before a frame
//! reaches the browser it goes through [`filter_inbound`], which keeps only
//! what the current [`InterestSet`] names. Unknown traffic fails open: it is
//! forwarded untouched rather than dropped.

use serde_json::Value;

use crate::domain::InterestSet;
use crate::upstream::{InboundKind, InboundMessage};

/// What to do with one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Auth-phase control message; handled by the session, never forwarded.
    Consumed,
    /// Filtered out.
    Dropped,
    /// Send this text downstream.
    Forward(String),
}

/// Applies the interest filter to one upstream frame.
///
/// Rules, first match wins:
/// 1. auth control messages are consumed;
/// 2. a `result` whose `result` is a list keeps only entries whose
///    `entity_id` is in `interest`, and is dropped when none remain;
/// 3. a `state_changed` event is forwarded verbatim iff its entity is in
///    `interest`;
/// 4. any other `result` is forwarded verbatim;
/// 5. everything else, including unparseable frames, is forwarded verbatim.
///
/// A frame whose shape does not allow filtering (a `result` list holding
/// non-objects, a `state_changed` whose `data` is not an object) falls
/// through to rule 5. A failed `result` carrying an `id` is always logged.
#[must_use]
pub fn filter_inbound(message: InboundMessage, interest: &InterestSet) -> Verdict {
    let kind = message.kind();
    if kind.is_auth() {
        return Verdict::Consumed;
    }

    match (kind, message.body()) {
        (InboundKind::Result, Some(body)) => {
            log_failed_result(body);
            if let Some(Value::Array(entries)) = body.get("result") {
                if entries.iter().all(Value::is_object) {
                    return filter_result_list(body, entries, interest);
                }
            }
        }
        (InboundKind::Event, Some(body)) => {
            if let Some(entity_id) = state_changed_entity(body) {
                return if interest.contains(entity_id) {
                    Verdict::Forward(message.into_raw())
                } else {
                    Verdict::Dropped
                };
            }
        }
        _ => {}
    }

    Verdict::Forward(message.into_raw())
}

/// Rewrites a list-valued `result` down to the entries of interest.
fn filter_result_list(body: &Value, entries: &[Value], interest: &InterestSet) -> Verdict {
    let kept: Vec<Value> = entries
        .iter()
        .filter(|entry| {
            entry
                .get("entity_id")
                .and_then(Value::as_str)
                .is_some_and(|id| interest.contains(id))
        })
        .cloned()
        .collect();

    if kept.is_empty() {
        return Verdict::Dropped;
    }

    let mut filtered = body.clone();
    if let Some(object) = filtered.as_object_mut() {
        object.insert("result".to_string(), Value::Array(kept));
    }
    Verdict::Forward(filtered.to_string())
}

/// Entity id of a `state_changed` event, or `None` for any other event and
/// for a `state_changed` whose `data` is missing or not an object.
///
/// Object `data` without a string entity id yields `Some("")`, which never
/// matches a declared interest.
fn state_changed_entity(body: &Value) -> Option<&str> {
    let event = body.get("event")?;
    if event.get("event_type").and_then(Value::as_str) != Some("state_changed") {
        return None;
    }
    let data = event.get("data")?.as_object()?;
    Some(
        data.get("entity_id")
            .and_then(Value::as_str)
            .unwrap_or_default(),
    )
}

fn log_failed_result(body: &Value) {
    let failed = body.get("success").and_then(Value::as_bool) != Some(true);
    if let Some(id) = body.get("id").filter(|_| failed) {
        let error = body.get("error").cloned().unwrap_or(Value::Null);
        tracing::error!(subscription_id = %id, %error, "upstream subscription failed");
    }
}
