// Delayed delivery of an event over an mpsc channel.
//
// Used for the paced transitions of the conversation (next question reveal,
// navigation to results) so they can be cancelled and driven under
// `tokio::time::pause()` in tests.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to an event that will be sent after a delay.
///
/// Dropping the handle cancels the send.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Send `event` on `tx` once `delay` has elapsed.
    pub fn spawn<E>(delay: Duration, tx: mpsc::Sender<E>, event: E) -> Self
    where
        E: Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(event).await.is_err() {
                debug!("scheduled event dropped, receiver closed");
            }
        });
        ScheduledTask { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
