use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Callback invoked with the full dotted key of a setting that changed.
pub type ChangeListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

impl SubscriptionId {
    pub(crate) fn next() -> Self {
        SubscriptionId(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
    }
}

/// The listener list behind a store's change stream.
///
/// Stores call [`ChangeNotifier::notify`] only after releasing their own lock. The listener list
/// is cloned out before any listener runs, so listeners may subscribe, unsubscribe or touch the
/// store.
#[derive(Default)]
pub struct ChangeNotifier {
    listeners: Mutex<Vec<(SubscriptionId, ChangeListener)>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.listeners.lock().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn notify(&self, key: &str) {
        let listeners: Vec<ChangeListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(key);
        }
    }

    pub fn notify_all<'a>(&self, keys: impl IntoIterator<Item = &'a str>) {
        for key in keys {
            self.notify(key);
        }
    }

    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, ChangeListener) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener: ChangeListener = Arc::new(move |key: &str| sink.lock().push(key.to_string()));
        (seen, listener)
    }

    #[test]
    fn test_notify_reaches_every_listener() {
        let notifier = ChangeNotifier::new();
        let (first, l1) = recorder();
        let (second, l2) = recorder();
        notifier.subscribe(l1);
        notifier.subscribe(l2);

        notifier.notify("A.B");

        assert_eq!(*first.lock(), vec!["A.B"]);
        assert_eq!(*second.lock(), vec!["A.B"]);
    }

    #[test]
    fn test_unsubscribe() {
        let notifier = ChangeNotifier::new();
        let (seen, listener) = recorder();
        let id = notifier.subscribe(listener);

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify("X");
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let notifier = Arc::new(ChangeNotifier::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let n = notifier.clone();
        let s = slot.clone();
        let id = notifier.subscribe(Arc::new(move |_key: &str| {
            if let Some(id) = *s.lock() {
                n.unsubscribe(id);
            }
        }));
        *slot.lock() = Some(id);

        notifier.notify("X");
        assert!(notifier.is_empty());
    }
}
