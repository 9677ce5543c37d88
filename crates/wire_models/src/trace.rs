//! Trace sample wire model.
//!
//! A trace sample encodes as a fixed-order positional JSON array. The
//! collector parses these arrays by index, not by key; the literal key
//! names of the final attributes object (`agentAttributes`,
//! `userAttributes`, `intrinsics`) are equally load-bearing.

use crate::attributes::AttributeValue;
use crate::EncodeError;
use serde::ser::{SerializeMap, SerializeTuple};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Attribute map used throughout the trace payload.
///
/// Ordered map so repeated encodes of the same sample are byte-identical.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// One timed sub-operation within a trace, nested to form the call tree.
///
/// Offsets are milliseconds relative to the owning sample's start and
/// non-decreasing with depth; the children list preserves creation order.
/// Both invariants are the producer's responsibility.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceSegment {
    pub relative_start_ms: f64,
    pub relative_end_ms: f64,
    pub name: String,
    pub attributes: AttributeMap,
    pub children: Vec<TraceSegment>,
    pub class_name: String,
    pub method_name: String,
}

impl TraceSegment {
    pub fn new(
        relative_start_ms: f64,
        relative_end_ms: f64,
        name: impl Into<String>,
        class_name: impl Into<String>,
        method_name: impl Into<String>,
    ) -> Self {
        Self {
            relative_start_ms,
            relative_end_ms,
            name: name.into(),
            attributes: AttributeMap::new(),
            children: Vec::new(),
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }

    /// Adds an attribute to the segment.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Appends a child segment, preserving creation order.
    pub fn push_child(&mut self, child: TraceSegment) {
        self.children.push(child);
    }
}

// Wire shape: [relative-start, relative-end, name, attributes, children,
// class-name, method-name]
impl Serialize for TraceSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_tuple(7)?;
        seq.serialize_element(&self.relative_start_ms)?;
        seq.serialize_element(&self.relative_end_ms)?;
        seq.serialize_element(&self.name)?;
        seq.serialize_element(&self.attributes)?;
        seq.serialize_element(&self.children)?;
        seq.serialize_element(&self.class_name)?;
        seq.serialize_element(&self.method_name)?;
        seq.end()
    }
}

/// The nested trace payload: start timestamp, two legacy placeholder maps,
/// the segment tree, and the final attributes object.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceTree {
    pub start_time_ms: u64,
    pub root: TraceSegment,
    pub agent_attributes: AttributeMap,
    pub user_attributes: AttributeMap,
    pub intrinsics: AttributeMap,
}

impl TraceTree {
    pub fn new(start_time_ms: u64, root: TraceSegment) -> Self {
        Self {
            start_time_ms,
            root,
            agent_attributes: AttributeMap::new(),
            user_attributes: AttributeMap::new(),
            intrinsics: AttributeMap::new(),
        }
    }

    pub fn with_agent_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.agent_attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_user_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.user_attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_intrinsic(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.intrinsics.insert(key.into(), value.into());
        self
    }
}

/// Always-empty object occupying the two legacy root-attribute slots.
struct EmptyObject;

impl Serialize for EmptyObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_map(Some(0))?.end()
    }
}

/// Final attributes object with its literal, order-sensitive key names.
struct FinalAttributes<'a> {
    tree: &'a TraceTree,
}

impl Serialize for FinalAttributes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("agentAttributes", &self.tree.agent_attributes)?;
        map.serialize_entry("userAttributes", &self.tree.user_attributes)?;
        map.serialize_entry("intrinsics", &self.tree.intrinsics)?;
        map.end()
    }
}

// Wire shape: [start-ms, {}, {}, root-segment, final-attributes]. The two
// empty maps are retired root-attribute slots the collector still expects.
impl Serialize for TraceTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_tuple(5)?;
        seq.serialize_element(&self.start_time_ms)?;
        seq.serialize_element(&EmptyObject)?;
        seq.serialize_element(&EmptyObject)?;
        seq.serialize_element(&self.root)?;
        seq.serialize_element(&FinalAttributes { tree: self })?;
        seq.end()
    }
}

/// One recorded transaction's timing and attribute payload.
///
/// Immutable once handed to the codec; constructed per reporting cycle,
/// encoded once, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceSample {
    pub start_time_ms: u64,
    pub duration_ms: f64,
    pub name: String,
    pub uri: String,
    pub tree: TraceTree,
    pub guid: String,
    pub referring_guid: Option<String>,
    pub is_synthetics: bool,
    pub xray_session_id: Option<u64>,
    pub synthetics_resource_id: Option<String>,
}

impl TraceSample {
    pub fn new(
        start_time_ms: u64,
        duration_ms: f64,
        name: impl Into<String>,
        uri: impl Into<String>,
        tree: TraceTree,
        guid: impl Into<String>,
    ) -> Self {
        Self {
            start_time_ms,
            duration_ms,
            name: name.into(),
            uri: uri.into(),
            tree,
            guid: guid.into(),
            referring_guid: None,
            is_synthetics: false,
            xray_session_id: None,
            synthetics_resource_id: None,
        }
    }

    /// Sets the guid of the transaction that referred this one.
    pub fn with_referring_guid(mut self, guid: impl Into<String>) -> Self {
        self.referring_guid = Some(guid.into());
        self
    }

    /// Marks the sample as synthetics traffic.
    pub fn with_synthetics(mut self, resource_id: impl Into<String>) -> Self {
        self.is_synthetics = true;
        self.synthetics_resource_id = Some(resource_id.into());
        self
    }

    pub fn with_xray_session_id(mut self, session_id: u64) -> Self {
        self.xray_session_id = Some(session_id);
        self
    }
}

// Wire shape: [start, duration, name, uri, tree, guid, referring-or-null,
// synthetic-flag, xray-or-null, resource-or-null]
impl Serialize for TraceSample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_tuple(10)?;
        seq.serialize_element(&self.start_time_ms)?;
        seq.serialize_element(&self.duration_ms)?;
        seq.serialize_element(&self.name)?;
        seq.serialize_element(&self.uri)?;
        seq.serialize_element(&self.tree)?;
        seq.serialize_element(&self.guid)?;
        seq.serialize_element(&self.referring_guid)?;
        seq.serialize_element(&self.is_synthetics)?;
        seq.serialize_element(&self.xray_session_id)?;
        seq.serialize_element(&self.synthetics_resource_id)?;
        seq.end()
    }
}

/// Encodes a trace sample to its on-wire byte sequence.
pub fn encode_trace_sample(sample: &TraceSample) -> Result<Vec<u8>, EncodeError> {
    Ok(serde_json::to_vec(sample)?)
}
