use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::backend::AnalysisBackend;
use crate::highlight::{HighlightOp, InteractionEvent};
use crate::stream::{StreamEvent, StreamOutcome};
use crate::types::{RequestId, VizEvent, Viewport};

use super::{Effect, SessionController};

/// Host-side inputs to the session loop.
#[derive(Debug, Clone)]
pub enum DriverInput {
    TextChanged(String),
    Viewport(Viewport),
    Interaction(InteractionEvent),
    Highlight(HighlightOp),
    Shutdown,
}

type Tagged = (RequestId, StreamEvent);

/// Event loop that owns the controller.
///
/// All state mutation happens on this one task. Requests run on spawned
/// tasks whose events come back tagged with their request id, so anything
/// from a superseded request is recognised and dropped by the controller.
pub struct SessionDriver {
    controller: SessionController,
    backend: Arc<dyn AnalysisBackend>,
    in_flight: Option<(RequestId, JoinHandle<()>)>,
}

impl SessionDriver {
    pub fn new(controller: SessionController, backend: Arc<dyn AnalysisBackend>) -> Self {
        Self {
            controller,
            backend,
            in_flight: None,
        }
    }

    /// Run until `Shutdown` or until the input channel closes. Returns the
    /// controller so the host can inspect the final state.
    pub async fn run(
        mut self,
        mut inputs: mpsc::UnboundedReceiver<DriverInput>,
        events: mpsc::UnboundedSender<VizEvent>,
    ) -> SessionController {
        let (tagged_tx, mut tagged_rx) = mpsc::unbounded_channel::<Tagged>();

        loop {
            let deadline = self.controller.debounce_deadline();
            let effects = tokio::select! {
                biased;
                input = inputs.recv() => match input {
                    None | Some(DriverInput::Shutdown) => break,
                    Some(DriverInput::TextChanged(text)) => {
                        self.controller.on_text_changed(text, Instant::now())
                    }
                    Some(DriverInput::Viewport(viewport)) => self.controller.on_viewport(viewport),
                    Some(DriverInput::Interaction(event)) => self.controller.on_interaction(event),
                    Some(DriverInput::Highlight(op)) => self.controller.on_highlight(op),
                },
                Some((request_id, event)) = tagged_rx.recv() => {
                    self.controller.on_stream_event(request_id, event)
                }
                _ = wait_for(deadline) => self.controller.on_timer(Instant::now()),
            };
            self.apply(effects, &events, &tagged_tx);
        }

        if let Some((request_id, handle)) = self.in_flight.take() {
            debug!(%request_id, "Shutting down with a request in flight");
            handle.abort();
        }
        self.controller
    }

    fn apply(
        &mut self,
        effects: Vec<Effect>,
        events: &mpsc::UnboundedSender<VizEvent>,
        tagged_tx: &mpsc::UnboundedSender<Tagged>,
    ) {
        for effect in effects {
            match effect {
                Effect::Emit(event) => {
                    let _ = events.send(event);
                }
                Effect::AbortRequest { request_id } => {
                    if let Some((id, handle)) = self.in_flight.take() {
                        if id == request_id {
                            debug!(%request_id, "Aborting request task");
                            handle.abort();
                        } else {
                            self.in_flight = Some((id, handle));
                        }
                    }
                }
                Effect::StartRequest { request_id, text } => {
                    if let Some((old, handle)) = self.in_flight.take() {
                        debug!(request_id = %old, "Dropping previous request task");
                        handle.abort();
                    }
                    let handle = spawn_request(
                        self.backend.clone(),
                        request_id,
                        text,
                        tagged_tx.clone(),
                    );
                    self.in_flight = Some((request_id, handle));
                }
            }
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn spawn_request(
    backend: Arc<dyn AnalysisBackend>,
    request_id: RequestId,
    text: String,
    tagged_tx: mpsc::UnboundedSender<Tagged>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let run = async move {
            if let Err(e) = backend.analyze(&text, tx.clone()).await {
                warn!(%request_id, error = %e, "Analysis request failed");
                let _ = tx.send(StreamEvent::Closed(StreamOutcome::Failed(e.user_message())));
            }
        };

        // Forward events as they arrive, tagged with the owning request
        let forward = async move {
            while let Some(event) = rx.recv().await {
                if tagged_tx.send((request_id, event)).is_err() {
                    break;
                }
            }
        };

        tokio::join!(run, forward);
    })
}
