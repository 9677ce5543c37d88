//! The label grammar.
//!
//! Input is a sequence of `key:value` segments separated by `;`. Keys and
//! values are trimmed. Empty segments created by leading or trailing `;`
//! are dropped silently; any other malformed segment invalidates the whole
//! string (no partial results). Duplicate keys keep the last value at the
//! first key's position. The result is capped at [`MAX_LABELS`] entries
//! and every key and value is truncated to [`MAX_LENGTH_BYTES`] encoded
//! bytes without splitting a code point.

use crate::sink::WarningSink;
use serde::Serialize;
use std::collections::HashMap;

/// Maximum number of distinct labels retained.
pub const MAX_LABELS: usize = 64;

/// Maximum encoded length of a label key or value, in UTF-8 bytes.
pub const MAX_LENGTH_BYTES: usize = 255;

/// A single user-configured key/value tag.
///
/// Serializes in the cross-agent wire shape:
/// `{"label_type": key, "label_value": value}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    #[serde(rename = "label_type")]
    pub key: String,
    #[serde(rename = "label_value")]
    pub value: String,
}

/// An ordered, deduplicated, bounded set of labels.
///
/// Emission order is the first occurrence of each distinct key. Immutable
/// once parsed; serializes as the ordered JSON array of its labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelSet {
    labels: Vec<Label>,
}

impl LabelSet {
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Looks up a label value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|label| label.key == key)
            .map(|label| label.value.as_str())
    }
}

impl<'a> IntoIterator for &'a LabelSet {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}

/// Parses a label configuration string.
///
/// Never fails: malformed input degrades to the empty set with a warning
/// reported through `warnings`.
pub fn parse(input: &str, warnings: &dyn WarningSink) -> LabelSet {
    let segments: Vec<&str> = input.split(';').collect();

    // Runs of blank segments at either end come from leading/trailing
    // semicolons and are not part of the grammar.
    let Some(first) = segments.iter().position(|s| !s.trim().is_empty()) else {
        return LabelSet::default();
    };
    let last = segments
        .iter()
        .rposition(|s| !s.trim().is_empty())
        .unwrap_or(first);

    let mut pairs: Vec<(String, String)> = Vec::new();
    for segment in &segments[first..=last] {
        match split_pair(segment) {
            Some((key, value)) => {
                pairs.push((
                    truncate_checked(key, "key", warnings),
                    truncate_checked(value, "value", warnings),
                ));
            }
            None => {
                // Atomicity: one bad segment poisons the whole string.
                warnings.warn(&format!(
                    "invalid label segment {segment:?}; ignoring all labels"
                ));
                return LabelSet::default();
            }
        }
    }

    let mut labels: Vec<Label> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut duplicates = false;
    for (key, value) in pairs {
        match positions.get(&key) {
            Some(&i) => {
                labels[i].value = value;
                duplicates = true;
            }
            None => {
                positions.insert(key.clone(), labels.len());
                labels.push(Label { key, value });
            }
        }
    }
    if duplicates {
        warnings.warn("duplicate label keys; keeping the last value for each");
    }

    if labels.len() > MAX_LABELS {
        warnings.warn(&format!(
            "{} labels configured; keeping the first {MAX_LABELS}",
            labels.len()
        ));
        labels.truncate(MAX_LABELS);
    }

    LabelSet { labels }
}

/// Splits one segment into its trimmed key and value.
///
/// Returns `None` unless the segment contains exactly one `:` and both
/// sides are non-empty after trimming.
fn split_pair(segment: &str) -> Option<(&str, &str)> {
    let mut parts = segment.split(':');
    let (key, value) = match (parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(value), None) => (key.trim(), value.trim()),
        _ => return None,
    };
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

fn truncate_checked(text: &str, what: &str, warnings: &dyn WarningSink) -> String {
    let truncated = truncate_to_bytes(text, MAX_LENGTH_BYTES);
    if truncated.len() < text.len() {
        warnings.warn(&format!(
            "label {what} exceeds {MAX_LENGTH_BYTES} bytes and was truncated"
        ));
    }
    truncated.to_string()
}

/// Cuts `text` to at most `max` encoded bytes on a character boundary.
fn truncate_to_bytes(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
