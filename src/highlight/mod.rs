//! Cross-view interaction highlighting.
//!
//! Three independently rendered views (the token chip list, the graph and
//! the relationship list) share one attribute table. Every highlight
//! operation recomputes the whole table from the baseline captured at attach
//! time and reports the difference as a single batch, so the views never
//! drift apart.
//!
//! Only presentation attributes (classes and opacity) live here. The scene's
//! geometry is never touched.

mod dispatch;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::render::Scene;
use crate::selection::RelationshipEntry;
use crate::types::Token;

pub use dispatch::{InteractionDispatcher, InteractionEvent, PointerKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightStyle {
    /// Opacity of edges and rows pushed into the background.
    pub dim_opacity: f64,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self { dim_opacity: 0.15 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    TokenList,
    Graph,
    RelationshipList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementRole {
    TokenChip,
    Node,
    Label,
    Edge,
    RelationshipRow,
    /// Empty canvas area; carries no index.
    Background,
}

impl ElementRole {
    pub fn view(self) -> View {
        match self {
            ElementRole::TokenChip => View::TokenList,
            ElementRole::Node | ElementRole::Label | ElementRole::Edge | ElementRole::Background => {
                View::Graph
            }
            ElementRole::RelationshipRow => View::RelationshipList,
        }
    }
}

/// Chips, nodes and labels are indexed by display index; edges and rows by
/// their position in the rendered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementKey {
    pub role: ElementRole,
    pub index: usize,
}

impl ElementKey {
    pub fn new(role: ElementRole, index: usize) -> Self {
        Self { role, index }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightClass {
    Active,
    Source,
    Target,
    Incident,
    Dimmed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementStyle {
    pub classes: Vec<HighlightClass>,
    pub opacity: f64,
}

impl ElementStyle {
    pub fn with_opacity(opacity: f64) -> Self {
        Self {
            classes: Vec::new(),
            opacity,
        }
    }

    pub fn has(&self, class: HighlightClass) -> bool {
        self.classes.contains(&class)
    }

    fn add(&mut self, class: HighlightClass) {
        if !self.has(class) {
            self.classes.push(class);
            self.classes.sort();
        }
    }

    fn dim(&mut self, opacity: f64) {
        self.add(HighlightClass::Dimmed);
        self.opacity = opacity;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleChange {
    pub key: ElementKey,
    pub style: ElementStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HighlightOp {
    Node { index: usize },
    Pair { from: usize, to: usize },
    Clear,
}

/// Attribute table for one rendered scene plus its relationship list.
#[derive(Debug, Clone)]
pub struct Highlighter {
    style: HighlightStyle,
    baseline: BTreeMap<ElementKey, ElementStyle>,
    current: BTreeMap<ElementKey, ElementStyle>,
    edges: Vec<(usize, usize)>,
    rows: Vec<(Option<usize>, Option<usize>)>,
    active: HighlightOp,
    dispatcher: InteractionDispatcher,
}

impl Highlighter {
    /// Capture baseline attributes for every element of the three views.
    pub fn attach(scene: &Scene, relationships: &[RelationshipEntry], style: HighlightStyle) -> Self {
        let mut baseline = BTreeMap::new();
        for node in &scene.nodes {
            for role in [ElementRole::TokenChip, ElementRole::Node, ElementRole::Label] {
                baseline.insert(
                    ElementKey::new(role, node.display_index),
                    ElementStyle::with_opacity(1.0),
                );
            }
        }
        for edge in &scene.edges {
            baseline.insert(
                ElementKey::new(ElementRole::Edge, edge.index),
                ElementStyle::with_opacity(edge.opacity),
            );
        }
        let edges = scene
            .edges
            .iter()
            .map(|e| (e.from_display_index, e.to_display_index))
            .collect();
        Self::with_baseline(baseline, edges, relationships, style)
    }

    /// Attach to the token chips and relationship rows alone.
    ///
    /// Used when there is no graph to draw (too few tokens, no edge above the
    /// threshold, or a viewport too small to lay out). Node, label and edge
    /// keys are simply absent, so operations only touch the two lists.
    pub fn attach_lists(
        tokens: &[Token],
        relationships: &[RelationshipEntry],
        style: HighlightStyle,
    ) -> Self {
        let baseline = tokens
            .iter()
            .map(|t| {
                (
                    ElementKey::new(ElementRole::TokenChip, t.display_index),
                    ElementStyle::with_opacity(1.0),
                )
            })
            .collect();
        Self::with_baseline(baseline, Vec::new(), relationships, style)
    }

    fn with_baseline(
        mut baseline: BTreeMap<ElementKey, ElementStyle>,
        edges: Vec<(usize, usize)>,
        relationships: &[RelationshipEntry],
        style: HighlightStyle,
    ) -> Self {
        for index in 0..relationships.len() {
            baseline.insert(
                ElementKey::new(ElementRole::RelationshipRow, index),
                ElementStyle::with_opacity(1.0),
            );
        }

        Self {
            style,
            current: baseline.clone(),
            baseline,
            edges,
            rows: relationships
                .iter()
                .map(|r| (r.from_display_index, r.to_display_index))
                .collect(),
            active: HighlightOp::Clear,
            dispatcher: InteractionDispatcher::new(),
        }
    }

    pub fn style(&self, key: ElementKey) -> Option<&ElementStyle> {
        self.current.get(&key)
    }

    pub fn active(&self) -> HighlightOp {
        self.active
    }

    pub fn is_baseline(&self) -> bool {
        self.current == self.baseline
    }

    pub fn highlight_node(&mut self, index: usize) -> Vec<StyleChange> {
        self.apply(HighlightOp::Node { index })
    }

    pub fn highlight_pair(&mut self, from: usize, to: usize) -> Vec<StyleChange> {
        self.apply(HighlightOp::Pair { from, to })
    }

    pub fn clear(&mut self) -> Vec<StyleChange> {
        self.apply(HighlightOp::Clear)
    }

    /// Route a pointer event through the dispatcher and apply the result.
    pub fn handle(&mut self, event: InteractionEvent) -> Vec<StyleChange> {
        match self.dispatcher.dispatch(event, &self.edges, &self.rows) {
            Some(op) => self.apply(op),
            None => Vec::new(),
        }
    }

    /// Recompute every element's attributes for `op` and return what changed.
    pub fn apply(&mut self, op: HighlightOp) -> Vec<StyleChange> {
        let target = self.target_for(op);
        let changes = target
            .iter()
            .filter(|(key, style)| self.current.get(key) != Some(style))
            .map(|(key, style)| StyleChange {
                key: *key,
                style: style.clone(),
            })
            .collect();
        self.current = target;
        self.active = op;
        changes
    }

    fn mark(
        target: &mut BTreeMap<ElementKey, ElementStyle>,
        index: usize,
        class: HighlightClass,
    ) {
        for role in [ElementRole::TokenChip, ElementRole::Node, ElementRole::Label] {
            if let Some(style) = target.get_mut(&ElementKey::new(role, index)) {
                style.add(class);
            }
        }
    }

    fn target_for(&self, op: HighlightOp) -> BTreeMap<ElementKey, ElementStyle> {
        let mut target = self.baseline.clone();
        let dim = self.style.dim_opacity;
        match op {
            HighlightOp::Clear => {}
            HighlightOp::Node { index } => {
                Self::mark(&mut target, index, HighlightClass::Active);
                for (edge_index, (from, to)) in self.edges.iter().enumerate() {
                    if let Some(style) =
                        target.get_mut(&ElementKey::new(ElementRole::Edge, edge_index))
                    {
                        if *from == index || *to == index {
                            style.add(HighlightClass::Incident);
                        } else {
                            style.dim(dim);
                        }
                    }
                }
                for (row_index, (from, to)) in self.rows.iter().enumerate() {
                    if *from == Some(index) || *to == Some(index) {
                        if let Some(style) = target
                            .get_mut(&ElementKey::new(ElementRole::RelationshipRow, row_index))
                        {
                            style.add(HighlightClass::Active);
                        }
                    }
                }
            }
            HighlightOp::Pair { from, to } => {
                Self::mark(&mut target, from, HighlightClass::Source);
                Self::mark(&mut target, to, HighlightClass::Target);
                for (edge_index, pair) in self.edges.iter().enumerate() {
                    if let Some(style) =
                        target.get_mut(&ElementKey::new(ElementRole::Edge, edge_index))
                    {
                        if *pair == (from, to) {
                            style.add(HighlightClass::Active);
                        } else {
                            style.dim(dim);
                        }
                    }
                }
                for (row_index, pair) in self.rows.iter().enumerate() {
                    if *pair == (Some(from), Some(to)) {
                        if let Some(style) = target
                            .get_mut(&ElementKey::new(ElementRole::RelationshipRow, row_index))
                        {
                            style.add(HighlightClass::Active);
                        }
                    }
                }
            }
        }
        target
    }
}
