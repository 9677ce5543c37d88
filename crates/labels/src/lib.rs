//! Label configuration grammar parser.
//!
//! Turns a `key1:value1;key2:value2` configuration string into a validated,
//! deduplicated, size-bounded [`LabelSet`] attached to outgoing telemetry
//! payloads. Parsing is pure and stateless: safe for unrestricted
//! concurrent use, never panics, never aborts the process. All degradation
//! is reported through an injected [`WarningSink`] and the parse result
//! collapses to the empty set when any segment is malformed.
//!
//! A parsed set is immutable; a configuration reload parses a fresh one
//! rather than mutating in place.

pub mod parser;
pub mod sink;

pub use parser::{parse, Label, LabelSet, MAX_LABELS, MAX_LENGTH_BYTES};
pub use sink::{CollectingSink, NullSink, TracingSink, WarningSink};
