//! Cancellable subscription handles over coordinator event streams.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

/// One consumer's view of a coordinator event stream.
///
/// Dropping the handle (or calling [`Subscription::cancel`]) unsubscribes.
/// Events published before the handle was created are never delivered.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    pub(crate) fn new(rx: broadcast::Receiver<T>) -> Self {
        Self { rx }
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once the publishing coordinator is gone. A consumer
    /// that fell behind skips the overwritten events and resumes with the
    /// oldest retained one.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("event=subscription_lagged module=timer skipped={skipped}");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next already-published event without waiting.
    pub fn try_next(&mut self) -> Option<T> {
        loop {
            match self.rx.try_recv() {
                Ok(value) => return Some(value),
                Err(TryRecvError::Lagged(skipped)) => {
                    log::debug!("event=subscription_lagged module=timer skipped={skipped}");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drains every already-published event and returns the most recent one.
    pub fn latest(&mut self) -> Option<T> {
        let mut last = None;
        while let Some(value) = self.try_next() {
            last = Some(value);
        }
        last
    }

    /// Ends this subscription.
    pub fn cancel(self) {}
}
