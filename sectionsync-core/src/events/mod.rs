//! Live status notifications.

use sectionsync_model::StatusEvent;

pub mod bus;
pub mod cache;

pub use bus::InProcStatusBus;
pub use cache::StatusCache;

/// Observer informed of every update attempt as it starts and finishes.
///
/// Called inline by the orchestrator, so implementations must not block.
pub trait StatusNotifier: Send + Sync {
    fn notify(&self, event: &StatusEvent);
}
