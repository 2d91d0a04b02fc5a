//! Collection helpers shared across modules.

use rustc_hash::FxHashMap;
use serde_json::Value;

/// Create an empty state map with the hasher used throughout the crate.
///
/// Board base state and chain overlays both use this shape.
#[must_use]
pub fn new_state_map() -> FxHashMap<String, Value> {
    FxHashMap::default()
}
