//! Subscription Hub
//!
//! Fans change notifications out to observers. A subscription is scoped to
//! one path, a subtree, or the whole form, and is released by dropping the
//! returned guard. Same-flush notifications for the same path and kind are
//! batched into a single delivery.
//!
//! Delivery never holds the engine state borrowed, so a callback may call
//! back into the form; notifications produced that way are appended to the
//! in-flight batch and delivered before the flush returns, never
//! reentrantly.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use formic_core::Path;

/// What part of the form a subscription observes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every change anywhere in the form
    All,
    /// Only changes to exactly this path
    Exact(Path),
    /// Changes to this path or any descendant
    Subtree(Path),
}

impl Scope {
    /// Whether a notification for `path` falls inside this scope
    pub fn matches(&self, path: &Path) -> bool {
        match self {
            Scope::All => true,
            Scope::Exact(p) => p == path,
            Scope::Subtree(p) => p == path || p.is_ancestor_of(path),
        }
    }
}

/// Kind of change being announced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The stored value changed
    Value,
    /// The cached validation outcome changed
    Validity,
    /// An array field was restructured (insert/remove/reorder)
    Structure,
    /// Interaction state changed (touched)
    Interaction,
}

/// One delivered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: Path,
    pub kind: ChangeKind,
}

type Callback = Rc<RefCell<dyn FnMut(&Change)>>;

struct Subscriber {
    scope: Scope,
    callback: Callback,
}

/// Publish/subscribe fan-out for one form instance
#[derive(Default)]
pub(crate) struct SubscriptionHub {
    subscribers: RefCell<HashMap<u64, Subscriber>>,
    next_id: Cell<u64>,
    pending: RefCell<Vec<Change>>,
    delivering: Cell<bool>,
}

impl SubscriptionHub {
    pub(crate) fn subscribe<F>(self: &Rc<Self>, scope: Scope, callback: F) -> Subscription
    where
        F: FnMut(&Change) + 'static,
    {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.subscribers.borrow_mut().insert(
            id,
            Subscriber {
                scope,
                callback: Rc::new(RefCell::new(callback)),
            },
        );
        Subscription {
            hub: Rc::downgrade(self),
            id,
        }
    }

    fn remove(&self, id: u64) {
        self.subscribers.borrow_mut().remove(&id);
    }

    /// Queue a notification without delivering yet
    pub(crate) fn enqueue(&self, change: Change) {
        let mut pending = self.pending.borrow_mut();
        if !pending.contains(&change) {
            pending.push(change);
        }
    }

    /// Queue notifications for `path` and every ancestor, then deliver
    /// (unless a delivery is already in progress, in which case the new
    /// notifications join the in-flight batch)
    pub(crate) fn notify(&self, path: &Path, kind: ChangeKind) {
        for ancestor in path.ancestors() {
            self.enqueue(Change {
                path: ancestor,
                kind,
            });
        }
        self.enqueue(Change {
            path: path.clone(),
            kind,
        });
        self.flush();
    }

    /// Deliver every pending notification. Notifications queued by
    /// callbacks during delivery are drained in the same flush.
    pub(crate) fn flush(&self) {
        if self.delivering.get() {
            return;
        }
        self.delivering.set(true);
        loop {
            let batch = std::mem::take(&mut *self.pending.borrow_mut());
            if batch.is_empty() {
                break;
            }
            tracing::trace!(count = batch.len(), "delivering change batch");
            for change in batch {
                // Collect matches first so callbacks may (un)subscribe
                let matches: Vec<(u64, Callback)> = self
                    .subscribers
                    .borrow()
                    .iter()
                    .filter(|(_, s)| s.scope.matches(&change.path))
                    .map(|(id, s)| (*id, s.callback.clone()))
                    .collect();
                for (id, callback) in matches {
                    if self.subscribers.borrow().contains_key(&id) {
                        (callback.borrow_mut())(&change);
                    }
                }
            }
        }
        self.delivering.set(false);
    }
}

/// Scoped handle to an active subscription; dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes it"]
pub struct Subscription {
    hub: Weak<SubscriptionHub>,
    id: u64,
}

impl Subscription {
    /// Release the subscription explicitly
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
