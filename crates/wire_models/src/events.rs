//! Log event batch wire model.
//!
//! Unlike the trace payload, the batch encodes as a keyed object; event
//! order inside the batch must match submission order exactly (no
//! reordering, no dedup).

use crate::EncodeError;
use serde::Serialize;

/// One captured log line with its correlation identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    pub timestamp: i64,
    pub message: String,
    pub level: String,
    #[serde(rename = "span.id")]
    pub span_id: String,
    #[serde(rename = "trace.id")]
    pub trace_id: String,
}

impl LogEvent {
    pub fn new(
        timestamp: i64,
        message: impl Into<String>,
        level: impl Into<String>,
        span_id: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            message: message.into(),
            level: level.into(),
            span_id: span_id.into(),
            trace_id: trace_id.into(),
        }
    }
}

/// An ordered collection of log events tagged with the reporting entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEventBatch {
    #[serde(rename = "EntityName")]
    pub entity_name: String,
    #[serde(rename = "EntityType")]
    pub entity_type: String,
    #[serde(rename = "EntityGuid")]
    pub entity_guid: String,
    #[serde(rename = "Hostname")]
    pub hostname: String,
    #[serde(rename = "PluginType")]
    pub plugin_type: String,
    #[serde(rename = "Events")]
    pub events: Vec<LogEvent>,
}

impl LogEventBatch {
    pub fn new(
        entity_name: impl Into<String>,
        entity_type: impl Into<String>,
        entity_guid: impl Into<String>,
        hostname: impl Into<String>,
        plugin_type: impl Into<String>,
        events: Vec<LogEvent>,
    ) -> Self {
        Self {
            entity_name: entity_name.into(),
            entity_type: entity_type.into(),
            entity_guid: entity_guid.into(),
            hostname: hostname.into(),
            plugin_type: plugin_type.into(),
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Encodes a log event batch to its on-wire byte sequence.
pub fn encode_log_event_batch(batch: &LogEventBatch) -> Result<Vec<u8>, EncodeError> {
    Ok(serde_json::to_vec(batch)?)
}
