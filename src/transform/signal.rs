//! Parameters-changed notification.

use std::fmt;
use std::sync::Arc;

/// Observer invoked when a transform's parameters change.
pub type ParametersObserver = Arc<dyn Fn() + Send + Sync>;

/// Identifies one observer attached to a [`ParametersChanged`] signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// Publish-only signal emitted when a transform's tunable parameters change.
///
/// The host attaches any number of observers (typically to schedule a
/// recomputation). The transform itself only emits.
///
/// # Example
///
/// ```rust
/// use seriesforge::transform::ParametersChanged;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// let hits = Arc::new(AtomicU32::new(0));
/// let mut signal = ParametersChanged::new();
///
/// let counter = hits.clone();
/// let id = signal.connect(move || {
///     counter.fetch_add(1, Ordering::Relaxed);
/// });
///
/// signal.emit();
/// signal.disconnect(id);
/// signal.emit();
///
/// assert_eq!(hits.load(Ordering::Relaxed), 1);
/// ```
#[derive(Default)]
pub struct ParametersChanged {
    next_id: u64,
    observers: Vec<(ConnectionId, ParametersObserver)>,
}

impl ParametersChanged {
    /// Create a signal with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an observer.
    pub fn connect<F>(&mut self, observer: F) -> ConnectionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Arc::new(observer)));
        id
    }

    /// Detach an observer.
    ///
    /// Returns true if the observer was attached.
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    /// Detach every observer.
    pub fn disconnect_all(&mut self) {
        self.observers.clear();
    }

    /// Number of attached observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Notify every observer, in connection order.
    pub fn emit(&self) {
        for (_, observer) in &self.observers {
            observer();
        }
    }
}

impl fmt::Debug for ParametersChanged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParametersChanged")
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_emit_without_observers() {
        let signal = ParametersChanged::new();
        signal.emit();
        assert_eq!(signal.observer_count(), 0);
    }

    #[test]
    fn test_emit_in_connection_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut signal = ParametersChanged::new();

        for tag in ["first", "second", "third"] {
            let log = log.clone();
            signal.connect(move || log.lock().push(tag));
        }

        signal.emit();
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_disconnect_unknown() {
        let mut signal = ParametersChanged::new();
        let id = signal.connect(|| {});
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
    }

    #[test]
    fn test_disconnect_all() {
        let mut signal = ParametersChanged::new();
        signal.connect(|| {});
        signal.connect(|| {});
        signal.disconnect_all();
        assert_eq!(signal.observer_count(), 0);
    }
}
