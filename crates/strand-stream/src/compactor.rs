//! Delta compaction
//!
//! Reduces a raw sequence of generation parts to the minimal sequence that
//! replays to the same content:
//!
//! 1. parts without end-user content (lifecycle markers, unknown kinds) are dropped,
//!    and binary payloads are stripped from the parts that remain;
//! 2. adjacent continuations of the same run (text, reasoning, ...) are merged.
//!
//! Dropping happens before merging, so a marker between two text deltas does
//! not keep them apart. That makes compaction incremental:
//! `compact(a ++ b) == compact(compact(a) ++ b)`.

use serde_json::Value;

/// A part of one of the supported wire formats
pub trait StreamPart: Clone + Sized {
    /// Returns `None` for parts that carry nothing worth replaying.
    fn retain(self) -> Option<Self>;

    /// Folds `next` into `self` when both continue the same run.
    /// Hands `next` back untouched otherwise.
    fn merge(&mut self, next: Self) -> Option<Self>;

    /// Decodes a stored part. Malformed input decodes to an unknown part,
    /// which `retain` then drops.
    fn from_value(value: Value) -> Self;

    fn to_value(&self) -> Value;
}

/// Compacts a part sequence. Never fails; unusable parts are dropped.
pub fn compact<P: StreamPart>(parts: impl IntoIterator<Item = P>) -> Vec<P> {
    let mut out: Vec<P> = Vec::new();

    for part in parts.into_iter().filter_map(StreamPart::retain) {
        match out.last_mut() {
            Some(last) => {
                if let Some(rest) = last.merge(part) {
                    out.push(rest);
                }
            }
            None => out.push(part),
        }
    }

    out
}

/// Compacts stored (JSON) parts of format `P`.
pub fn compact_values<P: StreamPart>(values: impl IntoIterator<Item = Value>) -> Vec<Value> {
    compact(values.into_iter().map(P::from_value))
        .iter()
        .map(P::to_value)
        .collect()
}
