//! Normalizes a raw webhook delivery into an [`InboundEvent`].

use axum::http::HeaderMap;
use serde_json::Value;
use thiserror::Error;

pub const TOPIC_HEADER: &str = "x-topic";
pub const EVENT_ID_HEADER: &str = "x-event-id";
pub const WEBHOOK_ID_HEADER: &str = "x-webhook-id";
pub const SIGNATURE_HEADER: &str = "x-hmac-sha256";
pub const TRIGGERED_AT_HEADER: &str = "x-triggered-at";
pub const API_VERSION_HEADER: &str = "x-api-version";
pub const SHOP_DOMAIN_HEADER: &str = "x-shop-domain";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Product,
    Collection,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Product => "products",
            EntityKind::Collection => "collections",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Create,
    Update,
    Delete,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Create => "create",
            EventAction::Update => "update",
            EventAction::Delete => "delete",
        }
    }
}

/// A webhook topic, e.g. `products/create` or `collections/delete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topic {
    pub entity: EntityKind,
    pub action: EventAction,
}

impl Topic {
    pub fn parse(s: &str) -> Option<Topic> {
        let (entity, action) = s.split_once('/')?;
        let entity = match entity {
            "products" => EntityKind::Product,
            "collections" => EntityKind::Collection,
            _ => return None,
        };
        let action = match action {
            "create" => EventAction::Create,
            "update" => EventAction::Update,
            "delete" => EventAction::Delete,
            _ => return None,
        };
        Some(Topic { entity, action })
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.entity.as_str(), self.action.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed event: {0}")]
    Malformed(String),

    /// Without an event or delivery id the delivery cannot be deduplicated,
    /// so it is rejected rather than silently accepted.
    #[error("missing event identity: X-Event-Id or X-Webhook-Id required")]
    MissingIdentity,
}

/// A normalized inbound change notification. Built per HTTP delivery, never
/// persisted, immutable once parsed.
#[derive(Debug)]
pub struct InboundEvent {
    pub delivery_id: Option<String>,
    pub event_id: Option<String>,
    pub topic: Topic,
    pub triggered_at: Option<String>,
    pub api_version: Option<String>,
    pub shop_domain: Option<String>,
    pub payload: Value,
}

pub fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a raw delivery into an [`InboundEvent`].
///
/// `expected` is the entity family the receiving endpoint serves; a topic
/// addressed to the other family is malformed, not silently re-routed.
pub fn parse(
    expected: EntityKind,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<InboundEvent, ParseError> {
    let topic_value = header_str(headers, TOPIC_HEADER)
        .ok_or_else(|| ParseError::Malformed("missing X-Topic header".to_string()))?;
    let topic = Topic::parse(&topic_value)
        .ok_or_else(|| ParseError::Malformed(format!("unknown topic: {}", topic_value)))?;
    if topic.entity != expected {
        return Err(ParseError::Malformed(format!(
            "topic {} not accepted on the {} endpoint",
            topic,
            expected.as_str()
        )));
    }

    let event_id = header_str(headers, EVENT_ID_HEADER);
    let delivery_id = header_str(headers, WEBHOOK_ID_HEADER);
    if event_id.is_none() && delivery_id.is_none() {
        return Err(ParseError::MissingIdentity);
    }

    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| ParseError::Malformed(format!("invalid JSON body: {}", e)))?;

    Ok(InboundEvent {
        delivery_id,
        event_id,
        topic,
        triggered_at: header_str(headers, TRIGGERED_AT_HEADER),
        api_version: header_str(headers, API_VERSION_HEADER),
        shop_domain: header_str(headers, SHOP_DOMAIN_HEADER),
        payload,
    })
}
