//! Blocking iterators over controller events.

use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use crate::event::ControllerEvent;

/// Blocking iterator over [`ControllerEvent`]s.
///
/// `next()` blocks until an event is available or the background worker shuts
/// down. Use [`try_recv`](Self::try_recv) or [`recv_timeout`](Self::recv_timeout)
/// for non-blocking and bounded access.
pub struct ControllerEventIter {
    receiver: Arc<Mutex<mpsc::Receiver<ControllerEvent>>>,
}

impl ControllerEventIter {
    pub(crate) fn new(receiver: Arc<Mutex<mpsc::Receiver<ControllerEvent>>>) -> Self {
        Self { receiver }
    }

    /// Receive an event without blocking.
    ///
    /// Returns `None` when no event is pending or the worker is gone.
    pub fn try_recv(&self) -> Option<ControllerEvent> {
        self.receiver.lock().ok()?.try_recv().ok()
    }

    /// Receive an event, waiting at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ControllerEvent> {
        self.receiver.lock().ok()?.recv_timeout(timeout).ok()
    }

    /// Drain all currently pending events without blocking.
    pub fn try_iter(&self) -> Vec<ControllerEvent> {
        let mut drained = Vec::new();
        while let Some(event) = self.try_recv() {
            drained.push(event);
        }
        drained
    }
}

impl Iterator for ControllerEventIter {
    type Item = ControllerEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.lock().ok()?.recv().ok()
    }
}

impl Clone for ControllerEventIter {
    fn clone(&self) -> Self {
        Self {
            receiver: Arc::clone(&self.receiver),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn found() -> ControllerEvent {
        ControllerEvent::Found {
            name: "Milo Living Room".to_string(),
            host: "192.168.1.50".parse::<IpAddr>().unwrap(),
        }
    }

    #[test]
    fn try_recv_returns_pending_events() {
        let (tx, rx) = mpsc::channel();
        let iter = ControllerEventIter::new(Arc::new(Mutex::new(rx)));

        assert!(iter.try_recv().is_none());

        tx.send(found()).unwrap();
        assert_eq!(iter.try_recv(), Some(found()));
        assert!(iter.try_recv().is_none());
    }

    #[test]
    fn blocking_iteration_ends_when_sender_drops() {
        let (tx, rx) = mpsc::channel();
        tx.send(found()).unwrap();
        tx.send(ControllerEvent::Disconnected).unwrap();
        drop(tx);

        let iter = ControllerEventIter::new(Arc::new(Mutex::new(rx)));
        let events: Vec<_> = iter.collect();
        assert_eq!(events, vec![found(), ControllerEvent::Disconnected]);
    }

    #[test]
    fn try_iter_drains_without_blocking() {
        let (tx, rx) = mpsc::channel();
        tx.send(found()).unwrap();
        tx.send(ControllerEvent::Disconnected).unwrap();

        let iter = ControllerEventIter::new(Arc::new(Mutex::new(rx)));
        assert_eq!(iter.try_iter().len(), 2);
        assert!(iter.try_iter().is_empty());
    }

    #[test]
    fn recv_timeout_returns_none_on_empty_channel() {
        let (_tx, rx) = mpsc::channel::<ControllerEvent>();
        let iter = ControllerEventIter::new(Arc::new(Mutex::new(rx)));
        assert!(iter.recv_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn clones_share_the_receiver() {
        let (tx, rx) = mpsc::channel();
        let iter = ControllerEventIter::new(Arc::new(Mutex::new(rx)));
        let clone = iter.clone();

        tx.send(found()).unwrap();
        assert_eq!(clone.try_recv(), Some(found()));
        assert!(iter.try_recv().is_none());
    }
}
