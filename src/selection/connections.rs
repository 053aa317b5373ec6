use crate::config::SelectionLimits;
use crate::error::{VizError, VizResult};
use crate::types::{AttentionMatrix, Connection, NodePosition, Token};

use super::sort_by_strength_desc;

fn label_for(tokens: &[Token], display_index: usize) -> String {
    tokens
        .iter()
        .find(|t| t.display_index == display_index)
        .map(|t| t.text.clone())
        .unwrap_or_default()
}

/// Reduce the attention matrix to the strongest directed edges between displayed tokens.
///
/// Pairs are enumerated row-major over display order, kept when strictly above
/// `limits.threshold`, ranked by strength and cut to `limits.top_k`. Returns
/// `NotEnoughData` when fewer than two nodes are placed or nothing survives.
pub fn select_connections(
    positions: &[NodePosition],
    tokens: &[Token],
    matrix: &AttentionMatrix,
    limits: SelectionLimits,
) -> VizResult<Vec<Connection>> {
    if positions.len() < 2 {
        return Err(VizError::NotEnoughData(format!(
            "{} token(s) placed, at least 2 are needed",
            positions.len()
        )));
    }

    let mut candidates = Vec::new();
    for from in positions {
        for to in positions {
            if from.display_index == to.display_index {
                continue;
            }
            let strength = matrix.get(from.original_index, to.original_index);
            if strength > limits.threshold {
                candidates.push((from, to, strength));
            }
        }
    }

    sort_by_strength_desc(&mut candidates, |(_, _, strength)| *strength);
    candidates.truncate(limits.top_k);

    if candidates.is_empty() {
        return Err(VizError::NotEnoughData(format!(
            "no attention above {:.2} between meaningful tokens",
            limits.threshold
        )));
    }

    Ok(candidates
        .into_iter()
        .map(|(from, to, strength)| Connection {
            from_display_index: from.display_index,
            to_display_index: to.display_index,
            from_text: label_for(tokens, from.display_index),
            to_text: label_for(tokens, to.display_index),
            strength,
        })
        .collect())
}
