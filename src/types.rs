use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{VizError, VizResult};
use crate::highlight::StyleChange;
use crate::render::Scene;
use crate::selection::RelationshipEntry;

// ─── Tokens ─────────────────────────────────────────────────────────────────

/// A token kept for display.
///
/// `original_index` indexes the attention matrix, `display_index` indexes the
/// filtered sequence that is actually rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub original_index: usize,
    pub display_index: usize,
    #[serde(default)]
    pub is_special: bool,
}

impl Token {
    pub fn new(text: impl Into<String>, original_index: usize, display_index: usize) -> Self {
        Self {
            text: text.into(),
            original_index,
            display_index,
            is_special: false,
        }
    }

    pub fn special(mut self) -> Self {
        self.is_special = true;
        self
    }
}

// ─── Attention ──────────────────────────────────────────────────────────────

/// Square matrix of attention strengths, `get(i, j)` = attention from token i to token j.
///
/// Values are clamped into [0, 1] on construction; non-finite values become 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionMatrix {
    size: usize,
    values: Vec<f64>,
}

impl AttentionMatrix {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> VizResult<Self> {
        let size = rows.len();
        let mut values = Vec::with_capacity(size * size);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(VizError::InvalidMatrix(format!(
                    "row {i} has {} columns, expected {size}",
                    row.len()
                )));
            }
            values.extend(row.into_iter().map(clamp_strength));
        }
        Ok(Self { size, values })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Strength from `from` to `to`; out-of-range lookups read as 0.
    pub fn get(&self, from: usize, to: usize) -> f64 {
        if from >= self.size || to >= self.size {
            return 0.0;
        }
        self.values[from * self.size + to]
    }
}

pub(crate) fn clamp_strength(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// A text-keyed relationship as sent by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub from_token: String,
    pub to_token: String,
    pub strength: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_index: Option<usize>,
}

impl Relationship {
    pub fn new(from: impl Into<String>, to: impl Into<String>, strength: f64) -> Self {
        Self {
            from_token: from.into(),
            to_token: to.into(),
            strength,
            from_index: None,
            to_index: None,
        }
    }
}

/// A ranked, directed edge selected for drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from_display_index: usize,
    pub to_display_index: usize,
    pub from_text: String,
    pub to_text: String,
    pub strength: f64,
}

impl Connection {
    pub fn touches(&self, display_index: usize) -> bool {
        self.from_display_index == display_index || self.to_display_index == display_index
    }

    pub fn is_pair(&self, from: usize, to: usize) -> bool {
        self.from_display_index == from && self.to_display_index == to
    }
}

// ─── Geometry ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

/// A placed node. Recomputed only on layout or viewport change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub display_index: usize,
    pub original_index: usize,
    pub x: f64,
    pub y: f64,
}

// ─── Wire Protocol ──────────────────────────────────────────────────────────

/// Body of `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// One `data:` frame of the analysis stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Tokenization {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
    },
    Tokens {
        data: Vec<String>,
    },
    LayerAttention {
        layer: usize,
        // Per-layer payload is accepted but not used.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    MeaningfulAttention {
        data: Vec<Vec<f64>>,
    },
    Relationships {
        data: Vec<Relationship>,
    },
    Complete,
    Error {
        message: String,
    },
}

impl StreamMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            StreamMessage::Tokenization { .. } => "tokenization",
            StreamMessage::Tokens { .. } => "tokens",
            StreamMessage::LayerAttention { .. } => "layer_attention",
            StreamMessage::MeaningfulAttention { .. } => "meaningful_attention",
            StreamMessage::Relationships { .. } => "relationships",
            StreamMessage::Complete => "complete",
            StreamMessage::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamMessage::Complete | StreamMessage::Error { .. })
    }
}

// ─── Session ────────────────────────────────────────────────────────────────

/// Identifies one request; messages tagged with any other id are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Debouncing,
    Requesting,
    Streaming,
    Rendering,
    Complete,
    Error,
}

impl Phase {
    /// Phases during which a request is in flight.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Phase::Requesting | Phase::Streaming)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Debouncing => write!(f, "debouncing"),
            Phase::Requesting => write!(f, "requesting"),
            Phase::Streaming => write!(f, "streaming"),
            Phase::Rendering => write!(f, "rendering"),
            Phase::Complete => write!(f, "complete"),
            Phase::Error => write!(f, "error"),
        }
    }
}

// ─── Host Events ────────────────────────────────────────────────────────────

/// Events emitted to the host for presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VizEvent {
    PhaseChanged {
        phase: Phase,
    },
    Status {
        message: String,
    },
    TokensReady {
        tokens: Vec<Token>,
    },
    RelationshipsReady {
        entries: Vec<RelationshipEntry>,
    },
    GraphReady {
        scene: Box<Scene>,
    },
    NotEnoughData {
        message: String,
    },
    VisualizationCleared,
    Error {
        message: String,
    },
    StylesChanged {
        changes: Vec<StyleChange>,
    },
    Announce {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_rejects_ragged_rows() {
        let err = AttentionMatrix::from_rows(vec![vec![0.1, 0.2], vec![0.3]]).unwrap_err();
        assert!(matches!(err, VizError::InvalidMatrix(_)));
    }

    #[test]
    fn matrix_clamps_values() {
        let m = AttentionMatrix::from_rows(vec![vec![0.0, 1.7], vec![-0.2, f64::NAN]]).unwrap();
        assert_eq!(m.size(), 2);
        assert_eq!(m.get(0, 1), 1.0);
        assert_eq!(m.get(1, 0), 0.0);
        assert_eq!(m.get(1, 1), 0.0);
        assert_eq!(m.get(5, 0), 0.0);
    }

    #[test]
    fn matrix_is_asymmetric() {
        let m = AttentionMatrix::from_rows(vec![vec![0.0, 0.4], vec![0.1, 0.0]]).unwrap();
        assert_eq!(m.get(0, 1), 0.4);
        assert_eq!(m.get(1, 0), 0.1);
    }

    #[test]
    fn stream_message_parses_each_kind() {
        let cases = [
            (r#"{"type":"tokenization","status":"processing"}"#, "tokenization"),
            (r#"{"type":"tokens","data":["[CLS]","hi","[SEP]"]}"#, "tokens"),
            (r#"{"type":"layer_attention","layer":3,"data":{"layer":3}}"#, "layer_attention"),
            (r#"{"type":"meaningful_attention","data":[[0.5,0.5],[0.5,0.5]]}"#, "meaningful_attention"),
            (
                r#"{"type":"relationships","data":[{"from_token":"cat","to_token":"the","strength":0.4,"from_index":2,"to_index":1}]}"#,
                "relationships",
            ),
            (r#"{"type":"complete"}"#, "complete"),
            (r#"{"type":"error","message":"boom"}"#, "error"),
        ];
        for (json, kind) in cases {
            let msg: StreamMessage = serde_json::from_str(json).unwrap();
            assert_eq!(msg.kind(), kind);
        }
    }

    #[test]
    fn relationship_indices_are_optional() {
        let rel: Relationship =
            serde_json::from_str(r#"{"from_token":"a","to_token":"b","strength":0.2}"#).unwrap();
        assert_eq!(rel.from_index, None);
        let json = serde_json::to_string(&rel).unwrap();
        assert!(!json.contains("from_index"));
    }

    #[test]
    fn terminal_messages() {
        assert!(StreamMessage::Complete.is_terminal());
        assert!(StreamMessage::Error {
            message: "x".into()
        }
        .is_terminal());
        assert!(!StreamMessage::Tokens { data: vec![] }.is_terminal());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(serde_json::from_str::<StreamMessage>(r#"{"type":"ping"}"#).is_err());
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn phase_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Phase::Debouncing).unwrap(), r#""debouncing""#);
        assert!(Phase::Streaming.is_in_flight());
        assert!(!Phase::Complete.is_in_flight());
    }

    #[test]
    fn health_status() {
        let health: HealthStatus =
            serde_json::from_str(r#"{"status":"healthy","model":"distilbert-base-uncased"}"#)
                .unwrap();
        assert!(health.is_healthy());
    }

    #[test]
    fn viz_event_serializes_tagged() {
        let event = VizEvent::Status {
            message: "Tokenizing input...".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"status""#));

        let json = serde_json::to_string(&VizEvent::VisualizationCleared).unwrap();
        assert_eq!(json, r#"{"type":"visualization_cleared"}"#);
    }
}
