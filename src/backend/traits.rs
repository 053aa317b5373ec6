use tokio::sync::mpsc;

use crate::error::VizResult;
use crate::stream::StreamEvent;
use crate::types::HealthStatus;

/// Abstracts the analysis service.
#[async_trait::async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Run one analysis, forwarding stream events to `sink`.
    ///
    /// Returns `Err` only when the stream could not be opened (validation,
    /// connection or non-2xx failures). Once `Opened` has been sent, every
    /// outcome is reported through the closing `StreamEvent::Closed`.
    async fn analyze(&self, text: &str, sink: mpsc::UnboundedSender<StreamEvent>)
        -> VizResult<()>;

    /// Cheap liveness probe.
    async fn health(&self) -> VizResult<HealthStatus>;
}
