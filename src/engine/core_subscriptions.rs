use futures::{future, Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::{EngineHandle, TelemetryEvent};
use crate::tempo::TickEvent;
use crate::theme::ThemeColor;

/// Adapt a broadcast receiver into a stream that skips over lag gaps
fn lossy_stream<T>(rx: broadcast::Receiver<T>, channel: &'static str) -> impl Stream<Item = T>
where
    T: Clone + Send + 'static,
{
    BroadcastStream::new(rx).filter_map(move |item| {
        future::ready(match item {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("[EngineHandle] {} subscriber: {}", channel, err);
                None
            }
        })
    })
}

impl EngineHandle {
    // ========================================================================
    // STREAM SUBSCRIPTIONS
    // ========================================================================

    pub fn subscribe_ticks(&self) -> broadcast::Receiver<TickEvent> {
        self.scheduler.subscribe_ticks()
    }

    pub fn subscribe_theme(&self) -> broadcast::Receiver<ThemeColor> {
        self.theme.subscribe()
    }

    pub fn subscribe_telemetry(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.telemetry_tx.subscribe()
    }

    /// Ticks as an async stream, for UI pulse animations
    pub fn tick_stream(&self) -> impl Stream<Item = TickEvent> {
        lossy_stream(self.subscribe_ticks(), "tick")
    }

    /// Theme colour changes as an async stream
    pub fn theme_stream(&self) -> impl Stream<Item = ThemeColor> {
        lossy_stream(self.subscribe_theme(), "theme")
    }

    pub fn telemetry_stream(&self) -> impl Stream<Item = TelemetryEvent> {
        lossy_stream(self.subscribe_telemetry(), "telemetry")
    }
}
