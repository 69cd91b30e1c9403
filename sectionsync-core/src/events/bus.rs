use std::fmt;

use sectionsync_model::StatusEvent;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::StatusNotifier;

/// In-process fan-out of status events to any number of subscribers.
///
/// Slow subscribers lose the oldest events rather than holding up updates.
pub struct InProcStatusBus {
    sender: broadcast::Sender<StatusEvent>,
    channel_capacity: usize,
}

impl fmt::Debug for InProcStatusBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcStatusBus")
            .field("channel_capacity", &self.channel_capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl InProcStatusBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            channel_capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }

    /// Subscribe as a [`futures::Stream`]. Lagged receivers yield an error
    /// item and continue with the newest events.
    pub fn stream(&self) -> BroadcastStream<StatusEvent> {
        BroadcastStream::new(self.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl StatusNotifier for InProcStatusBus {
    fn notify(&self, event: &StatusEvent) {
        let _ = self.sender.send(event.clone());
    }
}
