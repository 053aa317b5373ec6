use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use attention_viz::backend::{AnalysisBackend, HttpBackend};
use attention_viz::config::VizConfig;
use attention_viz::highlight::{
    ElementKey, ElementRole, HighlightClass, HighlightStyle, Highlighter, InteractionEvent,
};
use attention_viz::render::{render_scene, RenderStyle};
use attention_viz::session::{DriverInput, SessionController, SessionDriver};
use attention_viz::*;

// ─── Fixtures ───────────────────────────────────────────────────────────────

const SENTENCE: &str = "The cat chased the mouse.";

fn sse(frames: &[serde_json::Value]) -> String {
    frames.iter().map(|f| format!("data: {f}\n\n")).collect()
}

fn cat_frames() -> Vec<serde_json::Value> {
    let mut matrix = vec![vec![0.01; 8]; 8];
    matrix[2][1] = 0.4;
    matrix[5][3] = 0.25;
    matrix[3][2] = 0.1;
    vec![
        json!({"type": "tokenization", "status": "processing"}),
        json!({"type": "tokens", "data": ["[CLS]", "the", "cat", "chased", "the", "mouse", ".", "[SEP]"]}),
        json!({"type": "layer_attention", "layer": 0, "data": [[0.1]]}),
        json!({"type": "layer_attention", "layer": 5}),
        json!({"type": "meaningful_attention", "data": matrix}),
        json!({"type": "relationships", "data": [
            {"from_token": "cat", "to_token": "the", "strength": 0.4, "from_index": 2, "to_index": 1},
            {"from_token": "mouse", "to_token": "chased", "strength": 0.25},
            {"from_token": "[CLS]", "to_token": "cat", "strength": 0.9},
            {"from_token": "chased", "to_token": "cat", "strength": 0.02}
        ]}),
        json!({"type": "complete"}),
    ]
}

async fn mount_analysis(
    server: &MockServer,
    text: &str,
    frames: &[serde_json::Value],
    delay: Duration,
) {
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .and(body_json(json!({ "text": text })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse(frames))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

fn fast_config() -> VizConfig {
    VizConfig {
        debounce_ms: 10,
        ..VizConfig::default()
    }
}

fn start_driver(
    server: &MockServer,
) -> (
    mpsc::UnboundedSender<DriverInput>,
    mpsc::UnboundedReceiver<VizEvent>,
    JoinHandle<SessionController>,
) {
    let config = fast_config();
    let backend = Arc::new(HttpBackend::from_config(server.uri(), &config));
    let driver = SessionDriver::new(SessionController::new(config), backend);
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(driver.run(input_rx, event_tx));
    (input_tx, event_rx, handle)
}

/// Collect events until the session settles in `Complete` or `Error`.
async fn until_settled(rx: &mut mpsc::UnboundedReceiver<VizEvent>) -> Vec<VizEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("session did not settle")
            .expect("event channel closed");
        let settled = matches!(
            event,
            VizEvent::PhaseChanged {
                phase: Phase::Complete | Phase::Error
            }
        );
        events.push(event);
        if settled {
            return events;
        }
    }
}

// ─── End to End ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn end_to_end_over_http() {
    let server = MockServer::start().await;
    mount_analysis(&server, SENTENCE, &cat_frames(), Duration::ZERO).await;

    let (input, mut events, handle) = start_driver(&server);
    input.send(DriverInput::TextChanged(SENTENCE.into())).unwrap();
    let seen = until_settled(&mut events).await;

    let tokens = seen
        .iter()
        .find_map(|e| match e {
            VizEvent::TokensReady { tokens } => Some(tokens.clone()),
            _ => None,
        })
        .unwrap();
    let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["the", "cat", "chased", "the", "mouse"]);
    let originals: Vec<usize> = tokens.iter().map(|t| t.original_index).collect();
    assert_eq!(originals, vec![1, 2, 3, 4, 5]);

    let entries = seen
        .iter()
        .find_map(|e| match e {
            VizEvent::RelationshipsReady { entries } => Some(entries.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].from_token, "cat");
    assert_eq!(entries[0].to_display_index, Some(0));

    let scene = seen
        .iter()
        .find_map(|e| match e {
            VizEvent::GraphReady { scene } => Some(scene.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(scene.nodes.len(), 5);
    assert_eq!(scene.edges.len(), 3);
    let strongest = &scene.edges[0];
    assert_eq!((strongest.from_display_index, strongest.to_display_index), (1, 0));
    assert_eq!(strongest.strength, 0.4);
    assert!(scene.to_svg().contains(">chased</text>"));

    let statuses: Vec<&str> = seen
        .iter()
        .filter_map(|e| match e {
            VizEvent::Status { message } => Some(message.as_str()),
            _ => None,
        })
        .collect();
    assert!(statuses.contains(&"Tokenizing input..."));
    assert!(statuses.contains(&"Found 5 meaningful tokens"));
    assert!(statuses.contains(&"Processing attention layer 6"));

    // Hovering the "cat" chip lights up the graph and the list together.
    input
        .send(DriverInput::Interaction(InteractionEvent::enter(
            ElementRole::TokenChip,
            1,
        )))
        .unwrap();
    let styles = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    match styles {
        VizEvent::StylesChanged { changes } => {
            let roles: Vec<ElementRole> = changes.iter().map(|c| c.key.role).collect();
            assert!(roles.contains(&ElementRole::TokenChip));
            assert!(roles.contains(&ElementRole::Node));
            assert!(roles.contains(&ElementRole::Edge));
            assert!(roles.contains(&ElementRole::RelationshipRow));
        }
        other => panic!("expected style changes, got {other:?}"),
    }

    input.send(DriverInput::Shutdown).unwrap();
    let controller = handle.await.unwrap();
    assert_eq!(controller.state().phase, Phase::Complete);
    assert!(!controller.state().is_processing);
}

#[tokio::test]
async fn edit_during_request_discards_the_old_stream() {
    let server = MockServer::start().await;
    mount_analysis(&server, SENTENCE, &cat_frames(), Duration::from_millis(400)).await;
    let dog = vec![
        json!({"type": "tokens", "data": ["[CLS]", "a", "dog", "barked", "[SEP]"]}),
        json!({"type": "meaningful_attention", "data": [
            [0.0, 0.1, 0.1, 0.1, 0.0],
            [0.0, 0.0, 0.6, 0.1, 0.0],
            [0.0, 0.3, 0.0, 0.2, 0.0],
            [0.0, 0.1, 0.7, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0]
        ]}),
        json!({"type": "relationships", "data": []}),
        json!({"type": "complete"}),
    ];
    mount_analysis(&server, "A dog barked", &dog, Duration::ZERO).await;

    let (input, mut events, handle) = start_driver(&server);
    input.send(DriverInput::TextChanged(SENTENCE.into())).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    input.send(DriverInput::TextChanged("A dog barked".into())).unwrap();

    let seen = until_settled(&mut events).await;
    let tokens: Vec<Vec<String>> = seen
        .iter()
        .filter_map(|e| match e {
            VizEvent::TokensReady { tokens } => {
                Some(tokens.iter().map(|t| t.text.clone()).collect())
            }
            _ => None,
        })
        .collect();
    assert_eq!(tokens, vec![vec!["a".to_string(), "dog".into(), "barked".into()]]);

    // Give the superseded response time to arrive; nothing from it applies.
    tokio::time::sleep(Duration::from_millis(600)).await;
    input.send(DriverInput::Shutdown).unwrap();
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, VizEvent::TokensReady { .. } | VizEvent::GraphReady { .. }));
    }

    let controller = handle.await.unwrap();
    let texts: Vec<&str> = controller
        .state()
        .tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect();
    assert_eq!(texts, vec!["a", "dog", "barked"]);
}

#[tokio::test]
async fn backend_error_frame_is_surfaced() {
    let server = MockServer::start().await;
    mount_analysis(
        &server,
        "hello",
        &[
            json!({"type": "tokenization", "status": "processing"}),
            json!({"type": "error", "message": "CUDA out of memory"}),
        ],
        Duration::ZERO,
    )
    .await;

    let (input, mut events, handle) = start_driver(&server);
    input.send(DriverInput::TextChanged("hello".into())).unwrap();
    let seen = until_settled(&mut events).await;
    assert!(seen
        .iter()
        .any(|e| matches!(e, VizEvent::Error { message } if message == "CUDA out of memory")));
    assert!(seen.iter().any(|e| matches!(e, VizEvent::Announce { .. })));

    input.send(DriverInput::Shutdown).unwrap();
    let controller = handle.await.unwrap();
    assert_eq!(controller.state().phase, Phase::Error);
    assert!(!controller.state().is_processing);
}

#[tokio::test]
async fn malformed_frames_do_not_abort_the_stream() {
    let server = MockServer::start().await;
    let mut body = String::from("data: {\"type\": \"tokens\", \"data\": [\n\n");
    body.push_str(&sse(&cat_frames()));
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let (input, mut events, handle) = start_driver(&server);
    input.send(DriverInput::TextChanged(SENTENCE.into())).unwrap();
    let seen = until_settled(&mut events).await;
    assert!(seen.iter().any(|e| matches!(e, VizEvent::GraphReady { .. })));

    input.send(DriverInput::Shutdown).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn graph_survives_a_too_small_viewport() {
    let server = MockServer::start().await;
    mount_analysis(&server, SENTENCE, &cat_frames(), Duration::ZERO).await;

    let (input, mut events, handle) = start_driver(&server);
    input.send(DriverInput::TextChanged(SENTENCE.into())).unwrap();
    until_settled(&mut events).await;

    input.send(DriverInput::Viewport(Viewport::new(100.0, 600.0))).unwrap();
    input.send(DriverInput::Viewport(Viewport::new(1000.0, 800.0))).unwrap();

    let mut seen = Vec::new();
    let scene = loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("graph was not rebuilt")
            .expect("event channel closed");
        if let VizEvent::GraphReady { scene } = &event {
            break scene.clone();
        }
        seen.push(event);
    };

    assert!(seen.iter().any(|e| matches!(e, VizEvent::VisualizationCleared)));
    assert!(!seen
        .iter()
        .any(|e| matches!(e, VizEvent::Error { .. } | VizEvent::PhaseChanged { .. })));
    assert_eq!(scene.width, 1000.0);
    assert_eq!(scene.nodes.len(), 5);

    input.send(DriverInput::Shutdown).unwrap();
    let controller = handle.await.unwrap();
    assert_eq!(controller.state().phase, Phase::Complete);
    assert!(controller.graph().is_some());
}

#[tokio::test]
async fn health_probe_reports_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "healthy", "model": "distilbert-base-uncased"})),
        )
        .mount(&server)
        .await;

    let backend = HttpBackend::with_base_url(server.uri());
    let health = backend.health().await.unwrap();
    assert!(health.is_healthy());
    assert_eq!(health.model, "distilbert-base-uncased");
}

// ─── Highlighting ───────────────────────────────────────────────────────────

#[test]
fn highlight_then_clear_restores_every_element() {
    let tokens = classifier::TokenClassifier::new()
        .classify(&["[CLS]", "the", "cat", "chased", "the", "mouse", ".", "[SEP]"]);
    let mut rows = vec![vec![0.02; 8]; 8];
    rows[2][1] = 0.4;
    rows[5][2] = 0.3;
    rows[1][5] = 0.2;
    let matrix = AttentionMatrix::from_rows(rows).unwrap();
    let viewport = Viewport::default();
    let positions =
        layout::circular_layout(&tokens, viewport, &layout::LayoutConfig::default()).unwrap();
    let connections = selection::select_connections(
        &positions,
        &tokens,
        &matrix,
        config::SelectionLimits::connections(),
    )
    .unwrap();
    let scene = render_scene(&positions, &connections, &tokens, viewport, &RenderStyle::default());
    let entries = selection::build_relationship_list(
        &[Relationship::new("cat", "the", 0.4)],
        &tokens,
        config::SelectionLimits::relationships(),
    );

    let mut highlighter = Highlighter::attach(&scene, &entries, HighlightStyle::default());
    let keys: Vec<ElementKey> = (0..tokens.len())
        .flat_map(|i| {
            [ElementRole::TokenChip, ElementRole::Node, ElementRole::Label]
                .into_iter()
                .map(move |role| ElementKey::new(role, i))
        })
        .chain((0..scene.edges.len()).map(|i| ElementKey::new(ElementRole::Edge, i)))
        .chain((0..entries.len()).map(|i| ElementKey::new(ElementRole::RelationshipRow, i)))
        .collect();
    let before: Vec<_> = keys.iter().map(|k| highlighter.style(*k).cloned()).collect();

    for i in 0..tokens.len() {
        highlighter.highlight_node(i);
        assert!(highlighter
            .style(ElementKey::new(ElementRole::Node, i))
            .unwrap()
            .has(HighlightClass::Active));
        highlighter.clear();
        let after: Vec<_> = keys.iter().map(|k| highlighter.style(*k).cloned()).collect();
        assert_eq!(before, after);
    }

    highlighter.highlight_pair(1, 0);
    highlighter.clear();
    assert!(highlighter.is_baseline());
}

#[test]
fn relationship_filter_is_independent_of_connections() {
    let tokens = classifier::TokenClassifier::new().classify(&["[CLS]", "cat", "mouse", "[SEP]"]);
    let matrix = AttentionMatrix::from_rows(vec![
        vec![0.0; 4],
        vec![0.0, 0.0, 0.2, 0.0],
        vec![0.0, 0.2, 0.0, 0.0],
        vec![0.0; 4],
    ])
    .unwrap();
    let positions =
        layout::circular_layout(&tokens, Viewport::default(), &layout::LayoutConfig::default())
            .unwrap();
    let connections = selection::select_connections(
        &positions,
        &tokens,
        &matrix,
        config::SelectionLimits::connections(),
    )
    .unwrap();
    assert_eq!(connections.len(), 2);

    let entries = selection::build_relationship_list(
        &[Relationship::new("cat", "mouse", 0.02), Relationship::new("mouse", "cat", 0.02)],
        &tokens,
        config::SelectionLimits::relationships(),
    );
    assert!(entries.is_empty());
}
