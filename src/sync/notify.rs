//! Change notification for readers of the local store.

use tokio::sync::broadcast;

use crate::model::EntityKind;

/// Buffered notifications per subscriber before the oldest are dropped.
const CHANNEL_CAPACITY: usize = 16;

/// Broadcasts which kind's table changed after a sync batch lands.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<EntityKind>,
}

impl ChangeNotifier {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Announce a change. Having no subscribers is fine.
    pub fn notify(&self, kind: EntityKind) {
        let receivers = self.sender.send(kind).unwrap_or(0);
        tracing::trace!(kind = %kind, receivers, "Change notified");
    }

    /// Receive every notification sent after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EntityKind> {
        self.sender.subscribe()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_reaches_subscribers() {
        let notifier = ChangeNotifier::new();
        notifier.notify(EntityKind::Projects); // nobody listening yet

        let mut rx = notifier.subscribe();
        notifier.notify(EntityKind::Events);

        assert_eq!(rx.recv().await.unwrap(), EntityKind::Events);
        assert!(rx.try_recv().is_err());
    }
}
