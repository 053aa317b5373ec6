//! Edge and relationship selection.
//!
//! Two independent selectors with their own thresholds: the connection
//! selector ranks matrix entries for the graph, the relationship list builder
//! ranks the backend's text-keyed relationships for the side list.

mod connections;
mod relationships;

pub use connections::select_connections;
pub use relationships::{build_relationship_list, resolve_display_index, RelationshipEntry};

use std::cmp::Ordering;

/// Descending by strength; equal strengths keep their enumeration order
/// because `sort_by` is stable.
pub(crate) fn sort_by_strength_desc<T>(items: &mut [T], strength: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| {
        strength(b)
            .partial_cmp(&strength(a))
            .unwrap_or(Ordering::Equal)
    });
}
