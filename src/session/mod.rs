//! Session controller, the single owner of analysis state.
//!
//! The controller is a synchronous state machine. It never performs I/O:
//! each input returns a list of [`Effect`]s that the async
//! [`SessionDriver`] carries out (start or abort a request, emit an event to
//! the host). Keeping time as an explicit `now` argument makes debounce and
//! staleness rules testable without a runtime.

mod driver;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::classifier::TokenClassifier;
use crate::config::VizConfig;
use crate::error::{VizError, VizResult};
use crate::highlight::{HighlightOp, Highlighter, InteractionEvent};
use crate::layout::circular_layout;
use crate::render::{render_scene, Scene};
use crate::selection::{build_relationship_list, select_connections, RelationshipEntry};
use crate::stream::{StreamEvent, StreamOutcome, TRUNCATED_STREAM_MESSAGE};
use crate::types::{
    AttentionMatrix, Connection, NodePosition, Phase, Relationship, RequestId, StreamMessage,
    Token, VizEvent, Viewport,
};

pub use driver::{DriverInput, SessionDriver};

/// Everything known about the current analysis.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: Phase,
    /// Latest input text, untrimmed.
    pub text: String,
    pub raw_token_count: usize,
    pub tokens: Vec<Token>,
    pub matrix: Option<AttentionMatrix>,
    pub relationships: Vec<Relationship>,
    pub relationship_list: Vec<RelationshipEntry>,
    pub is_processing: bool,
    pub request_id: Option<RequestId>,
    pub started_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            text: String::new(),
            raw_token_count: 0,
            tokens: Vec::new(),
            matrix: None,
            relationships: Vec::new(),
            relationship_list: Vec::new(),
            is_processing: false,
            request_id: None,
            started_at: None,
            status: None,
        }
    }
}

impl SessionState {
    fn reset_analysis(&mut self) {
        self.raw_token_count = 0;
        self.tokens.clear();
        self.matrix = None;
        self.relationships.clear();
        self.relationship_list.clear();
    }
}

/// Work requested by the controller.
#[derive(Debug, Clone)]
pub enum Effect {
    StartRequest { request_id: RequestId, text: String },
    AbortRequest { request_id: RequestId },
    Emit(VizEvent),
}

/// Layout, selection and primitives of the graph currently on screen.
#[derive(Debug, Clone)]
pub struct RenderedGraph {
    pub positions: Vec<NodePosition>,
    pub connections: Vec<Connection>,
    pub scene: Scene,
}

pub struct SessionController {
    config: VizConfig,
    classifier: TokenClassifier,
    viewport: Viewport,
    state: SessionState,
    debounce_deadline: Option<Instant>,
    graph: Option<RenderedGraph>,
    highlighter: Option<Highlighter>,
}

impl SessionController {
    pub fn new(config: VizConfig) -> Self {
        Self {
            config,
            classifier: TokenClassifier::new(),
            viewport: Viewport::default(),
            state: SessionState::default(),
            debounce_deadline: None,
            graph: None,
            highlighter: None,
        }
    }

    pub fn with_classifier(mut self, classifier: TokenClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &VizConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.debounce_deadline
    }

    pub fn graph(&self) -> Option<&RenderedGraph> {
        self.graph.as_ref()
    }

    pub fn highlighter(&self) -> Option<&Highlighter> {
        self.highlighter.as_ref()
    }

    // ─── Inputs ─────────────────────────────────────────────────────────────

    /// Input text changed. Invalidates any in-flight request and restarts the
    /// single-slot debounce timer.
    pub fn on_text_changed(&mut self, text: impl Into<String>, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.state.text = text.into();
        self.invalidate_request(&mut effects);

        if self.state.text.trim().is_empty() {
            self.debounce_deadline = None;
            self.clear_visualization(&mut effects);
            self.state.reset_analysis();
            self.state.status = None;
            self.set_phase(Phase::Idle, &mut effects);
            return effects;
        }

        self.debounce_deadline = Some(now + self.config.debounce());
        self.set_phase(Phase::Debouncing, &mut effects);
        effects
    }

    /// Debounce timer check; issues a request once the quiet period is over.
    pub fn on_timer(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        match self.debounce_deadline {
            Some(deadline) if deadline <= now => self.debounce_deadline = None,
            _ => return effects,
        }
        if self.state.phase != Phase::Debouncing || self.state.is_processing {
            return effects;
        }

        let text = self.state.text.trim().to_string();
        if text.is_empty() {
            self.set_phase(Phase::Idle, &mut effects);
            return effects;
        }
        let len = text.chars().count();
        if len > self.config.max_text_length {
            let err = VizError::InputTooLong {
                len,
                max: self.config.max_text_length,
            };
            self.fail(err.user_message(), &mut effects);
            return effects;
        }

        let request_id = RequestId::new();
        info!(%request_id, chars = len, "Starting analysis");
        self.clear_visualization(&mut effects);
        self.state.reset_analysis();
        self.state.is_processing = true;
        self.state.request_id = Some(request_id);
        self.state.started_at = Some(Utc::now());
        self.set_status("Analyzing...", &mut effects);
        self.set_phase(Phase::Requesting, &mut effects);
        effects.push(Effect::StartRequest { request_id, text });
        effects
    }

    /// Apply one event from the stream of `request_id`. Events from any other
    /// request are discarded.
    pub fn on_stream_event(&mut self, request_id: RequestId, event: StreamEvent) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.state.is_processing || self.state.request_id != Some(request_id) {
            debug!(%request_id, ?event, "Discarding stale stream event");
            return effects;
        }

        match event {
            StreamEvent::Opened => self.set_phase(Phase::Streaming, &mut effects),
            StreamEvent::Message(message) => self.apply_message(message, &mut effects),
            StreamEvent::Closed(outcome) => {
                // Terminal messages clear the flag; reaching here means the
                // stream ended without one.
                let message = match outcome {
                    StreamOutcome::Finished => TRUNCATED_STREAM_MESSAGE.to_string(),
                    StreamOutcome::Failed(reason) => reason,
                };
                warn!(%request_id, %message, "Analysis stream closed early");
                self.fail(message, &mut effects);
            }
        }
        effects
    }

    /// Viewport resized. The only input that moves nodes.
    pub fn on_viewport(&mut self, viewport: Viewport) -> Vec<Effect> {
        let mut effects = Vec::new();
        if viewport == self.viewport {
            return effects;
        }
        self.viewport = viewport;
        // Keyed on the analysis data, not on the last graph, so a viewport
        // that was too small once can still be recovered from.
        if self.state.phase != Phase::Complete || self.state.matrix.is_none() {
            return effects;
        }
        match self.build_graph() {
            Ok(graph) => self.show_graph(graph, &mut effects),
            Err(e) => {
                warn!(error = %e, "Re-layout failed, keeping analysis data");
                self.show_lists(&mut effects);
                let message = e.user_message();
                effects.push(Effect::Emit(VizEvent::Announce {
                    message: message.clone(),
                }));
                self.set_status(message, &mut effects);
            }
        }
        effects
    }

    /// Pointer event on any view.
    pub fn on_interaction(&mut self, event: InteractionEvent) -> Vec<Effect> {
        match self.highlighter.as_mut() {
            Some(h) => styles_changed(h.handle(event)),
            None => Vec::new(),
        }
    }

    /// Programmatic highlight, bypassing pointer pinning.
    pub fn on_highlight(&mut self, op: HighlightOp) -> Vec<Effect> {
        match self.highlighter.as_mut() {
            Some(h) => styles_changed(h.apply(op)),
            None => Vec::new(),
        }
    }

    // ─── Messages ───────────────────────────────────────────────────────────

    fn apply_message(&mut self, message: StreamMessage, effects: &mut Vec<Effect>) {
        debug!(kind = message.kind(), "Applying stream message");
        match message {
            StreamMessage::Tokenization { .. } => {
                self.set_status("Tokenizing input...", effects);
            }
            StreamMessage::Tokens { data } => {
                self.state.raw_token_count = data.len();
                self.state.tokens = self.classifier.classify(&data);
                effects.push(Effect::Emit(VizEvent::TokensReady {
                    tokens: self.state.tokens.clone(),
                }));
                let status = format!("Found {} meaningful tokens", self.state.tokens.len());
                self.set_status(status, effects);
            }
            StreamMessage::LayerAttention { layer, .. } => {
                self.set_status(format!("Processing attention layer {}", layer + 1), effects);
            }
            StreamMessage::MeaningfulAttention { data } => {
                match self.validate_matrix(data) {
                    Ok(matrix) => self.state.matrix = Some(matrix),
                    Err(e) => self.fail(e.user_message(), effects),
                }
            }
            StreamMessage::Relationships { data } => {
                self.state.relationship_list = build_relationship_list(
                    &data,
                    &self.state.tokens,
                    self.config.relationships,
                );
                self.state.relationships = data;
                effects.push(Effect::Emit(VizEvent::RelationshipsReady {
                    entries: self.state.relationship_list.clone(),
                }));
            }
            StreamMessage::Complete => self.complete(effects),
            StreamMessage::Error { message } => {
                warn!(%message, "Backend reported an error");
                self.fail(VizError::Backend(message).user_message(), effects);
            }
        }
    }

    fn validate_matrix(&self, rows: Vec<Vec<f64>>) -> VizResult<AttentionMatrix> {
        let matrix = AttentionMatrix::from_rows(rows)?;
        if matrix.size() != self.state.raw_token_count {
            return Err(VizError::InvalidMatrix(format!(
                "matrix is {0}x{0} but {1} tokens were received",
                matrix.size(),
                self.state.raw_token_count
            )));
        }
        Ok(matrix)
    }

    fn complete(&mut self, effects: &mut Vec<Effect>) {
        self.set_phase(Phase::Rendering, effects);
        self.state.is_processing = false;

        match self.build_graph() {
            Ok(graph) => {
                let elapsed = self.elapsed_ms();
                let status = format!(
                    "Analysis complete: {} tokens, {} connections ({elapsed} ms)",
                    graph.positions.len(),
                    graph.connections.len()
                );
                info!(
                    tokens = graph.positions.len(),
                    connections = graph.connections.len(),
                    elapsed_ms = elapsed,
                    "Analysis complete"
                );
                self.show_graph(graph, effects);
                self.set_status(status, effects);
                self.set_phase(Phase::Complete, effects);
            }
            Err(VizError::NotEnoughData(reason)) => {
                let message = VizError::NotEnoughData(reason).user_message();
                info!(%message, "Nothing to visualize");
                effects.push(Effect::Emit(VizEvent::NotEnoughData {
                    message: message.clone(),
                }));
                effects.push(Effect::Emit(VizEvent::Announce {
                    message: message.clone(),
                }));
                self.show_lists(effects);
                self.set_status(message, effects);
                self.set_phase(Phase::Complete, effects);
            }
            Err(e) => self.fail(e.user_message(), effects),
        }
    }

    // ─── Graph ──────────────────────────────────────────────────────────────

    fn build_graph(&self) -> VizResult<RenderedGraph> {
        let tokens = &self.state.tokens;
        if tokens.len() < 2 {
            return Err(VizError::NotEnoughData(format!(
                "{} meaningful token(s), at least 2 are needed",
                tokens.len()
            )));
        }
        let matrix = self
            .state
            .matrix
            .as_ref()
            .ok_or_else(|| VizError::NotEnoughData("no attention matrix received".into()))?;

        let positions = circular_layout(tokens, self.viewport, &self.config.layout)?;
        let connections = select_connections(&positions, tokens, matrix, self.config.connections)?;
        let scene = render_scene(
            &positions,
            &connections,
            tokens,
            self.viewport,
            &self.config.render,
        );
        Ok(RenderedGraph {
            positions,
            connections,
            scene,
        })
    }

    fn show_graph(&mut self, graph: RenderedGraph, effects: &mut Vec<Effect>) {
        self.highlighter = Some(Highlighter::attach(
            &graph.scene,
            &self.state.relationship_list,
            self.config.highlight.clone(),
        ));
        effects.push(Effect::Emit(VizEvent::GraphReady {
            scene: Box::new(graph.scene.clone()),
        }));
        effects.push(Effect::Emit(VizEvent::Announce {
            message: describe(&graph),
        }));
        self.graph = Some(graph);
    }

    /// Drop the graph but keep the chip list and relationship rows linked.
    fn show_lists(&mut self, effects: &mut Vec<Effect>) {
        if self.graph.take().is_some() {
            effects.push(Effect::Emit(VizEvent::VisualizationCleared));
        }
        self.highlighter = Some(Highlighter::attach_lists(
            &self.state.tokens,
            &self.state.relationship_list,
            self.config.highlight.clone(),
        ));
    }

    fn clear_visualization(&mut self, effects: &mut Vec<Effect>) {
        self.highlighter = None;
        if self.graph.take().is_some() || !self.state.tokens.is_empty() {
            effects.push(Effect::Emit(VizEvent::VisualizationCleared));
        }
    }

    // ─── Bookkeeping ────────────────────────────────────────────────────────

    fn invalidate_request(&mut self, effects: &mut Vec<Effect>) {
        if let Some(request_id) = self.state.request_id.take() {
            if self.state.is_processing {
                debug!(%request_id, "Aborting superseded request");
                effects.push(Effect::AbortRequest { request_id });
            }
        }
        self.state.is_processing = false;
    }

    fn fail(&mut self, message: String, effects: &mut Vec<Effect>) {
        self.state.is_processing = false;
        effects.push(Effect::Emit(VizEvent::Error {
            message: message.clone(),
        }));
        effects.push(Effect::Emit(VizEvent::Announce {
            message: format!("Error: {message}"),
        }));
        self.state.status = Some(message);
        self.set_phase(Phase::Error, effects);
    }

    fn set_status(&mut self, message: impl Into<String>, effects: &mut Vec<Effect>) {
        let message = message.into();
        effects.push(Effect::Emit(VizEvent::Status {
            message: message.clone(),
        }));
        self.state.status = Some(message);
    }

    fn set_phase(&mut self, phase: Phase, effects: &mut Vec<Effect>) {
        if self.state.phase == phase {
            return;
        }
        debug!(from = %self.state.phase, to = %phase, "Phase change");
        self.state.phase = phase;
        effects.push(Effect::Emit(VizEvent::PhaseChanged { phase }));
    }

    fn elapsed_ms(&self) -> i64 {
        self.state
            .started_at
            .map(|t| (Utc::now() - t).num_milliseconds())
            .unwrap_or(0)
    }
}

fn styles_changed(changes: Vec<crate::highlight::StyleChange>) -> Vec<Effect> {
    if changes.is_empty() {
        return Vec::new();
    }
    vec![Effect::Emit(VizEvent::StylesChanged { changes })]
}

fn describe(graph: &RenderedGraph) -> String {
    let mut message = format!(
        "Attention graph with {} tokens and {} connections.",
        graph.positions.len(),
        graph.connections.len()
    );
    if let Some(top) = graph.connections.first() {
        message.push_str(&format!(
            " Strongest: {} to {} ({:.2}).",
            top.from_text, top.to_text, top.strength
        ));
    }
    message
}
