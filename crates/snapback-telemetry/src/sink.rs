//! Telemetry Sink (§3, §5): fire-and-forget, never back-pressures
//! producers. Events are handed to an unbounded channel and drained by a
//! background task that simply turns them into structured tracing events —
//! producers never block on, or learn about, how (or whether) an event is
//! ultimately recorded.

use serde_json::Value;
use tokio::sync::mpsc;

#[derive(Debug, Clone, serde::Serialize)]
pub struct TelemetryEvent {
    pub name: &'static str,
    pub fields: Value,
}

#[derive(Clone)]
pub struct TelemetrySink {
    tx: mpsc::UnboundedSender<TelemetryEvent>,
}

impl TelemetrySink {
    /// Spawns the drain task and returns a handle producers can clone
    /// freely. Dropping every handle stops the drain task.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<TelemetryEvent>();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                tracing::info!(event = event.name, fields = %event.fields, "telemetry");
            }
        });
        Self { tx }
    }

    /// Records an event. Best-effort: if the drain task is gone the event
    /// is silently dropped rather than erroring the caller.
    pub fn record(&self, name: &'static str, fields: Value) {
        let _ = self.tx.send(TelemetryEvent { name, fields });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn record_does_not_block_or_panic_after_long_idle() {
        let sink = TelemetrySink::spawn();
        for _ in 0..100 {
            sink.record("path_rejection", json!({"reason": "nul_byte"}));
        }
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn sink_handles_clone_independently() {
        let sink = TelemetrySink::spawn();
        let cloned = sink.clone();
        cloned.record("tool_call", json!({"name": "snapback.analyze_risk"}));
        drop(sink);
        cloned.record("tool_call", json!({"name": "snapback.check_dependencies"}));
    }
}
