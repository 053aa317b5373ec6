use serde::{Deserialize, Serialize};

use crate::classifier::{clean_token, is_meaningful};
use crate::config::SelectionLimits;
use crate::types::{clamp_strength, Relationship, Token};

use super::sort_by_strength_desc;

/// One row of the relationship side list.
///
/// Display indices are recovered from token text and may be absent when the
/// text does not match any rendered label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEntry {
    pub from_token: String,
    pub to_token: String,
    pub strength: f64,
    pub from_display_index: Option<usize>,
    pub to_display_index: Option<usize>,
}

impl RelationshipEntry {
    pub fn touches(&self, display_index: usize) -> bool {
        self.from_display_index == Some(display_index)
            || self.to_display_index == Some(display_index)
    }

    pub fn is_pair(&self, from: usize, to: usize) -> bool {
        self.from_display_index == Some(from) && self.to_display_index == Some(to)
    }
}

/// First rendered label whose text equals `text`.
///
/// Duplicate surface tokens ("the ... the") always resolve to the first
/// occurrence; the payload's own indices are not consulted.
pub fn resolve_display_index(text: &str, labels: &[Token]) -> Option<usize> {
    labels
        .iter()
        .find(|label| label.text == text)
        .map(|label| label.display_index)
}

/// Filter, rank and cut the backend's relationships for the side list.
///
/// Independent of the connection selector: it applies its own meaningful-word
/// filter to both ends and its own threshold. Strengths are clamped into
/// [0, 1] first, the same way matrix cells are.
pub fn build_relationship_list(
    relationships: &[Relationship],
    labels: &[Token],
    limits: SelectionLimits,
) -> Vec<RelationshipEntry> {
    let mut kept: Vec<(&Relationship, f64)> = relationships
        .iter()
        .filter(|r| is_meaningful(&r.from_token) && is_meaningful(&r.to_token))
        .map(|r| (r, clamp_strength(r.strength)))
        .filter(|&(_, strength)| strength > limits.threshold)
        .collect();

    sort_by_strength_desc(&mut kept, |&(_, strength)| strength);
    kept.truncate(limits.top_k);

    kept.into_iter()
        .map(|(r, strength)| {
            let from_token = clean_token(&r.from_token);
            let to_token = clean_token(&r.to_token);
            RelationshipEntry {
                from_display_index: resolve_display_index(&from_token, labels),
                to_display_index: resolve_display_index(&to_token, labels),
                from_token,
                to_token,
                strength,
            }
        })
        .collect()
}
