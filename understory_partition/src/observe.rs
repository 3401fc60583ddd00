// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change notification sources.
//!
//! A partition built with [`SpacePartition::observing`][crate::SpacePartition::observing]
//! subscribes every newly added object with its [`ChangeSource`] and
//! unsubscribes it on removal. Pending notifications are pulled by
//! [`SpacePartition::sync`][crate::SpacePartition::sync], which re-indexes each
//! reported object.
//!
//! How notifications are produced is up to the host: a property setter, an
//! event emitter, a polling pass. [`ChangeQueue`] is a ready-made source that
//! hosts feed through a cloneable [`ChangeNotifier`].

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::hash::Hash;

use hashbrown::HashSet;

/// Source of "this object's position changed" notifications.
pub trait ChangeSource<O> {
    /// Start reporting changes for `object`.
    fn subscribe(&mut self, object: O);

    /// Stop reporting changes for `object` and forget any pending report.
    fn unsubscribe(&mut self, object: O);

    /// Hand every pending notification to `f`, leaving none pending.
    fn drain<F: FnMut(O)>(&mut self, f: F);
}

/// No observation: the caller re-adds objects after moving them.
#[derive(Copy, Clone, Debug, Default)]
pub struct Manual;

impl<O> ChangeSource<O> for Manual {
    #[inline]
    fn subscribe(&mut self, _object: O) {}

    #[inline]
    fn unsubscribe(&mut self, _object: O) {}

    #[inline]
    fn drain<F: FnMut(O)>(&mut self, _f: F) {}
}

#[derive(Debug)]
struct Pending<O> {
    watched: HashSet<O>,
    queued: HashSet<O>,
    order: Vec<O>,
}

/// Queue-backed [`ChangeSource`].
///
/// Notifications for unsubscribed objects are dropped, and repeated
/// notifications for one object between drains collapse into one.
///
/// ```rust
/// use understory_partition::{ChangeQueue, ChangeSource};
///
/// let mut queue = ChangeQueue::new();
/// let notifier = queue.notifier();
/// queue.subscribe(7_u32);
///
/// assert!(notifier.notify(7));
/// assert!(notifier.notify(7));
/// assert!(!notifier.notify(8), "8 was never subscribed");
///
/// let mut seen = Vec::new();
/// queue.drain(|o| seen.push(o));
/// assert_eq!(seen, [7]);
/// ```
#[derive(Debug)]
pub struct ChangeQueue<O> {
    shared: Rc<RefCell<Pending<O>>>,
}

/// Host-side handle that records changes into a [`ChangeQueue`].
#[derive(Debug)]
pub struct ChangeNotifier<O> {
    shared: Rc<RefCell<Pending<O>>>,
}

impl<O> Clone for ChangeNotifier<O> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<O: Copy + Eq + Hash> Default for ChangeQueue<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Copy + Eq + Hash> ChangeQueue<O> {
    /// Create an empty queue with no subscriptions.
    pub fn new() -> Self {
        Self {
            shared: Rc::new(RefCell::new(Pending {
                watched: HashSet::new(),
                queued: HashSet::new(),
                order: Vec::new(),
            })),
        }
    }

    /// A handle for reporting changes into this queue.
    pub fn notifier(&self) -> ChangeNotifier<O> {
        ChangeNotifier {
            shared: Rc::clone(&self.shared),
        }
    }

    /// Whether `object` is currently subscribed.
    pub fn is_subscribed(&self, object: O) -> bool {
        self.shared.borrow().watched.contains(&object)
    }

    /// Number of subscribed objects.
    pub fn subscribed_len(&self) -> usize {
        self.shared.borrow().watched.len()
    }

    /// Number of notifications waiting for a drain.
    pub fn pending_len(&self) -> usize {
        self.shared.borrow().order.len()
    }
}

impl<O: Copy + Eq + Hash> ChangeNotifier<O> {
    /// Report that `object` moved. Returns whether the report was recorded.
    pub fn notify(&self, object: O) -> bool {
        let mut p = self.shared.borrow_mut();
        if !p.watched.contains(&object) {
            return false;
        }
        if p.queued.insert(object) {
            p.order.push(object);
        }
        true
    }
}

impl<O: Copy + Eq + Hash> ChangeSource<O> for ChangeQueue<O> {
    fn subscribe(&mut self, object: O) {
        self.shared.borrow_mut().watched.insert(object);
    }

    fn unsubscribe(&mut self, object: O) {
        let mut p = self.shared.borrow_mut();
        p.watched.remove(&object);
        if p.queued.remove(&object) {
            p.order.retain(|&o| o != object);
        }
    }

    fn drain<F: FnMut(O)>(&mut self, mut f: F) {
        // Release the borrow before calling out; `f` may notify again.
        let order = {
            let mut p = self.shared.borrow_mut();
            p.queued.clear();
            core::mem::take(&mut p.order)
        };
        for o in order {
            f(o);
        }
    }
}
