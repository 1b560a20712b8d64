use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::types::FrameDevice;

/// Consumer of per-frame device state.
///
/// For every frame the dispatcher calls `handle_buttons`, `handle_axes` and
/// `end_of_frame` in that order, with no other listener called in between.
/// Callbacks run on the dispatching thread and should return quickly.
pub trait DeviceListener: Send + Sync {
    fn handle_buttons(&self, device: &FrameDevice, buttons: &[bool]);
    fn handle_axes(&self, device: &FrameDevice, axes: &[f32]);
    fn end_of_frame(&self);
}

/// Shared handle to a registered listener. Identity is the allocation.
pub type ListenerRef = Arc<dyn DeviceListener>;

/// Immutable view of the subscriber list at one moment.
#[derive(Clone)]
pub struct ListenerSnapshot(Arc<[ListenerRef]>);

impl ListenerSnapshot {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ListenerRef> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ListenerRef> {
        self.0.iter()
    }

    /// Returns true if `listener` is present at least once.
    pub fn contains(&self, listener: &ListenerRef) -> bool {
        self.0.iter().any(|entry| same_listener(entry, listener))
    }

    /// Number of times `listener` is registered.
    pub fn occurrences(&self, listener: &ListenerRef) -> usize {
        self.0.iter().filter(|entry| same_listener(entry, listener)).count()
    }
}

impl<'a> IntoIterator for &'a ListenerSnapshot {
    type Item = &'a ListenerRef;
    type IntoIter = std::slice::Iter<'a, ListenerRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for ListenerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSnapshot")
            .field("len", &self.len())
            .finish()
    }
}

/// Ordered, copy-on-write list of listeners.
///
/// Mutations build a new slice; readers clone the current `Arc` and never
/// hold the lock while iterating.
pub(crate) struct SubscriberList {
    entries: Mutex<Arc<[ListenerRef]>>,
}

impl SubscriberList {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Arc::from(Vec::new())),
        }
    }

    pub(crate) fn push(&self, listener: ListenerRef) {
        let mut entries = self.lock();
        let mut next = Vec::with_capacity(entries.len() + 1);
        next.extend(entries.iter().cloned());
        next.push(listener);
        *entries = Arc::from(next);
    }

    /// Removes the first entry matching `listener`. Returns false if absent.
    pub(crate) fn remove(&self, listener: &ListenerRef) -> bool {
        let mut entries = self.lock();
        let Some(position) = entries.iter().position(|entry| same_listener(entry, listener))
        else {
            return false;
        };
        let mut next: Vec<ListenerRef> = entries.iter().cloned().collect();
        next.remove(position);
        *entries = Arc::from(next);
        true
    }

    pub(crate) fn snapshot(&self) -> ListenerSnapshot {
        ListenerSnapshot(Arc::clone(&self.lock()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Arc<[ListenerRef]>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn same_listener(a: &ListenerRef, b: &ListenerRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
