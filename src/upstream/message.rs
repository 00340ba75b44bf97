//! Event-bus message envelopes.
//!
//! Inbound frames are kept as raw text alongside their parsed JSON so a
//! message can be forwarded byte-for-byte when the filter leaves it alone.

use serde::Serialize;
use serde_json::Value;

/// Classification of an inbound upstream frame by its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    /// `auth_required`: upstream is waiting for credentials.
    AuthRequired,
    /// `auth_ok`: credentials accepted.
    AuthOk,
    /// `auth_invalid`: credentials rejected.
    AuthInvalid,
    /// `result`: reply to a client command.
    Result,
    /// `event`: pushed event for a subscription.
    Event,
    /// Any other JSON object.
    Other,
    /// Not a JSON object, or not JSON at all.
    Opaque,
}

impl InboundKind {
    /// Returns `true` for the three auth-phase control messages.
    #[must_use]
    pub const fn is_auth(self) -> bool {
        matches!(self, Self::AuthRequired | Self::AuthOk | Self::AuthInvalid)
    }
}

/// One frame received from the upstream event bus.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    raw: String,
    body: Option<Value>,
    kind: InboundKind,
}

impl InboundMessage {
    /// Parses and classifies a text frame. Never fails: frames that are not
    /// JSON objects become [`InboundKind::Opaque`].
    #[must_use]
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let body = serde_json::from_str::<Value>(&raw)
            .ok()
            .filter(Value::is_object);
        let kind = match &body {
            None => InboundKind::Opaque,
            Some(body) => match body.get("type").and_then(Value::as_str) {
                Some("auth_required") => InboundKind::AuthRequired,
                Some("auth_ok") => InboundKind::AuthOk,
                Some("auth_invalid") => InboundKind::AuthInvalid,
                Some("result") => InboundKind::Result,
                Some("event") => InboundKind::Event,
                _ => InboundKind::Other,
            },
        };
        Self { raw, body, kind }
    }

    /// Message classification.
    #[must_use]
    pub const fn kind(&self) -> InboundKind {
        self.kind
    }

    #[cfg(test)]
    fn raw(&self) -> &str {
        &self.raw
    }

    /// Consumes the message, returning the original text.
    #[must_use]
    pub fn into_raw(self) -> String {
        self.raw
    }

    /// Parsed JSON object, if the frame was one.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// `message` field, as carried by `auth_invalid`.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(Value::as_str)
    }
}

/// First frame a client sends on the event bus.
#[derive(Debug, Serialize)]
pub struct AuthMessage<'a> {
    #[serde(rename = "type")]
    msg_type: &'static str,
    access_token: &'a str,
}

impl<'a> AuthMessage<'a> {
    /// Wraps the bearer credential.
    #[must_use]
    pub const fn new(access_token: &'a str) -> Self {
        Self {
            msg_type: "auth",
            access_token,
        }
    }

    /// Serializes to the wire form.
    #[must_use]
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
