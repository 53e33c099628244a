//! Explicit pipeline context shared by queue variants and subscribers.

use tokio::sync::broadcast;
use tracing::debug;

use quadmart_core::events::moderation::ModerationEvent;

/// Shared pipeline context: the moderation outcome event channel.
///
/// Outcomes are emitted as values on a broadcast channel instead of
/// callbacks serialized into job payloads; subscribers (listing updates,
/// user notifications) attach with [`PipelineContext::subscribe`].
#[derive(Debug, Clone)]
pub struct PipelineContext {
    events: broadcast::Sender<ModerationEvent>,
}

impl PipelineContext {
    /// Create a context with the given event buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self { events }
    }

    /// Subscribe to moderation outcome events.
    pub fn subscribe(&self) -> broadcast::Receiver<ModerationEvent> {
        self.events.subscribe()
    }

    /// Emit an outcome event. Best-effort: delivery failure never fails
    /// the moderation decision itself.
    pub fn emit(&self, event: ModerationEvent) {
        if let Err(e) = self.events.send(event) {
            debug!("No subscribers for moderation event: {e}");
        }
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadmart_core::types::id::{ItemId, ModerationRecordId, UserId};

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let context = PipelineContext::new(8);
        let mut rx = context.subscribe();

        let record_id = ModerationRecordId::new();
        context.emit(ModerationEvent::ManualReview {
            record_id,
            item_id: ItemId::new(),
            user_id: UserId::new(),
        });

        let event = rx.recv().await.expect("event delivered");
        assert_eq!(event.record_id(), record_id);
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_harmless() {
        let context = PipelineContext::new(8);
        context.emit(ModerationEvent::ManualReview {
            record_id: ModerationRecordId::new(),
            item_id: ItemId::new(),
            user_id: UserId::new(),
        });
    }
}
