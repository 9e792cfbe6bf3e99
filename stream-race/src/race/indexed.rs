/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Index-ordered cancellables and the single active-watcher slot.

use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// Generation sentinel meaning "already terminated". It outranks every real index.
pub const TERMINATED: u64 = u64::MAX;

/// A cancellable handle tagged with the generation it watches.
///
/// When several are alive at once, the one with the higher index supersedes the rest.
pub trait IndexedCancellable: Send + Sync {
    fn index(&self) -> u64;

    fn cancel(&self);
}

enum WatcherState {
    Armed(Arc<dyn IndexedCancellable>),
    Cancelled,
}

impl WatcherState {
    fn index(&self) -> u64 {
        match self {
            WatcherState::Armed(watcher) => watcher.index(),
            WatcherState::Cancelled => TERMINATED,
        }
    }
}

fn same_state(a: &Option<Arc<WatcherState>>, b: &Option<Arc<WatcherState>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// Holds at most one live watcher. `Cancelled` is permanent: once torn down, every later
/// arm attempt is rejected and the offered watcher is cancelled.
pub(crate) struct WatcherSlot {
    state: ArcSwapOption<WatcherState>,
}

impl WatcherSlot {
    pub(crate) fn new() -> Self {
        Self {
            state: ArcSwapOption::empty(),
        }
    }

    /// Installs `watcher` if its index is higher than the armed one's, cancelling the
    /// superseded watcher. Returns `false` (after cancelling `watcher`) otherwise.
    pub(crate) fn arm(&self, watcher: Arc<dyn IndexedCancellable>) -> bool {
        let next = Some(Arc::new(WatcherState::Armed(watcher.clone())));
        loop {
            let current = self.state.load_full();
            if let Some(state) = current.as_deref() {
                if state.index() >= watcher.index() {
                    watcher.cancel();
                    return false;
                }
            }

            let previous = self.state.compare_and_swap(&current, next.clone());
            if same_state(&previous, &current) {
                if let Some(WatcherState::Armed(superseded)) = current.as_deref() {
                    superseded.cancel();
                }
                return true;
            }
        }
    }

    /// Cancels the armed watcher but leaves the slot open for a successor.
    pub(crate) fn cancel_active(&self) {
        if let Some(WatcherState::Armed(watcher)) = self.state.load().as_deref() {
            watcher.cancel();
        }
    }

    /// Tears the slot down for good.
    pub(crate) fn cancel(&self) {
        if self.is_cancelled() {
            return;
        }
        if let Some(WatcherState::Armed(watcher)) = self
            .state
            .swap(Some(Arc::new(WatcherState::Cancelled)))
            .as_deref()
        {
            watcher.cancel();
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        matches!(self.state.load().as_deref(), Some(WatcherState::Cancelled))
    }

    #[cfg(test)]
    pub(crate) fn armed_index(&self) -> Option<u64> {
        match self.state.load().as_deref() {
            Some(WatcherState::Armed(watcher)) => Some(watcher.index()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{IndexedCancellable, WatcherSlot};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Probe {
        index: u64,
        cancels: AtomicUsize,
    }

    impl Probe {
        fn new(index: u64) -> Arc<Self> {
            Arc::new(Self {
                index,
                cancels: AtomicUsize::new(0),
            })
        }

        fn cancels(&self) -> usize {
            self.cancels.load(Ordering::Relaxed)
        }
    }

    impl IndexedCancellable for Probe {
        fn index(&self) -> u64 {
            self.index
        }

        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn higher_index_supersedes_lower() {
        let slot = WatcherSlot::new();
        let first = Probe::new(0);
        let second = Probe::new(1);

        assert!(slot.arm(first.clone()));
        assert!(slot.arm(second.clone()));

        assert_eq!(first.cancels(), 1);
        assert_eq!(second.cancels(), 0);
        assert_eq!(slot.armed_index(), Some(1));
    }

    #[test]
    fn lower_or_equal_index_is_rejected() {
        let slot = WatcherSlot::new();
        let current = Probe::new(4);
        let stale = Probe::new(3);
        let duplicate = Probe::new(4);

        assert!(slot.arm(current.clone()));
        assert!(!slot.arm(stale.clone()));
        assert!(!slot.arm(duplicate.clone()));

        assert_eq!(stale.cancels(), 1);
        assert_eq!(duplicate.cancels(), 1);
        assert_eq!(current.cancels(), 0);
    }

    #[test]
    fn cancelled_slot_rejects_everything() {
        let slot = WatcherSlot::new();
        let armed = Probe::new(2);
        slot.arm(armed.clone());

        slot.cancel();
        slot.cancel();
        assert_eq!(armed.cancels(), 1);
        assert!(slot.is_cancelled());

        let late = Probe::new(100);
        assert!(!slot.arm(late.clone()));
        assert_eq!(late.cancels(), 1);
    }

    #[test]
    fn cancel_active_keeps_slot_open() {
        let slot = WatcherSlot::new();
        let armed = Probe::new(0);
        slot.arm(armed.clone());

        slot.cancel_active();
        assert_eq!(armed.cancels(), 1);
        assert!(!slot.is_cancelled());
        assert!(slot.arm(Probe::new(1)));
    }
}
