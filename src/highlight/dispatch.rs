use serde::{Deserialize, Serialize};

use super::{ElementRole, HighlightOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    Enter,
    Leave,
    Click,
}

/// A pointer event on one element of any view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub role: ElementRole,
    pub index: usize,
    pub kind: PointerKind,
}

impl InteractionEvent {
    pub fn enter(role: ElementRole, index: usize) -> Self {
        Self {
            role,
            index,
            kind: PointerKind::Enter,
        }
    }

    pub fn leave(role: ElementRole, index: usize) -> Self {
        Self {
            role,
            index,
            kind: PointerKind::Leave,
        }
    }

    pub fn click(role: ElementRole, index: usize) -> Self {
        Self {
            role,
            index,
            kind: PointerKind::Click,
        }
    }

    pub fn background_click() -> Self {
        Self::click(ElementRole::Background, 0)
    }
}

/// Turns pointer events into highlight operations.
///
/// Hover highlights follow the pointer. A click pins the current highlight so
/// leave events are ignored; clicking the same element again or the empty
/// background releases it.
#[derive(Debug, Clone, Default)]
pub struct InteractionDispatcher {
    pinned: Option<(ElementRole, usize)>,
}

impl InteractionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }

    /// `edges` and `rows` are the `(from, to)` display index pairs of the
    /// rendered edges and relationship rows, by position.
    pub fn dispatch(
        &mut self,
        event: InteractionEvent,
        edges: &[(usize, usize)],
        rows: &[(Option<usize>, Option<usize>)],
    ) -> Option<HighlightOp> {
        if event.role == ElementRole::Background {
            return match event.kind {
                PointerKind::Click => {
                    self.pinned = None;
                    Some(HighlightOp::Clear)
                }
                _ => None,
            };
        }

        let target = target_op(event.role, event.index, edges, rows)?;
        let key = (event.role, event.index);

        match event.kind {
            PointerKind::Enter if self.pinned.is_none() => Some(target),
            PointerKind::Enter => None,
            PointerKind::Leave if self.pinned.is_none() => Some(HighlightOp::Clear),
            PointerKind::Leave => None,
            PointerKind::Click if self.pinned == Some(key) => {
                self.pinned = None;
                Some(HighlightOp::Clear)
            }
            PointerKind::Click => {
                self.pinned = Some(key);
                Some(target)
            }
        }
    }
}

fn target_op(
    role: ElementRole,
    index: usize,
    edges: &[(usize, usize)],
    rows: &[(Option<usize>, Option<usize>)],
) -> Option<HighlightOp> {
    match role {
        ElementRole::TokenChip | ElementRole::Node | ElementRole::Label => {
            Some(HighlightOp::Node { index })
        }
        ElementRole::Edge => edges
            .get(index)
            .map(|&(from, to)| HighlightOp::Pair { from, to }),
        ElementRole::RelationshipRow => match rows.get(index)? {
            (Some(from), Some(to)) => Some(HighlightOp::Pair {
                from: *from,
                to: *to,
            }),
            (Some(only), None) | (None, Some(only)) => Some(HighlightOp::Node { index: *only }),
            (None, None) => None,
        },
        ElementRole::Background => None,
    }
}
