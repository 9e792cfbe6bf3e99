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

//! Subscriber to a deadline source, tagged with the generation it guards.

use super::indexed::IndexedCancellable;
use crate::error::StreamError;
use crate::hooks::{self, DroppedSignal};
use crate::observability::fields;
use crate::protocol::{SetOnce, SharedSubscription, Sink, SubscriptionSlot, UNBOUNDED};
use std::sync::Weak;

const COMPONENT: &str = "deadline_watcher";

/// Narrow callback capability the race subscriber hands to its watchers.
pub(crate) trait DeadlineHandler: Send + Sync {
    /// The deadline source for `index` emitted or completed.
    fn deadline_elapsed(&self, index: u64);

    /// The deadline source for `index` failed.
    fn deadline_failed(&self, index: u64, error: StreamError);
}

/// Watches one deadline source. Any value or completion means "deadline elapsed".
///
/// Holds only a weak handle to its owner; the owner keeps the strong reference to the
/// watcher in its slot.
pub(crate) struct DeadlineWatcher {
    index: u64,
    handler: Weak<dyn DeadlineHandler>,
    upstream: SubscriptionSlot,
}

impl DeadlineWatcher {
    pub(crate) fn new(index: u64, handler: Weak<dyn DeadlineHandler>) -> Self {
        Self {
            index,
            handler,
            upstream: SubscriptionSlot::new(),
        }
    }

    fn elapsed(&self) {
        if let Some(handler) = self.handler.upgrade() {
            handler.deadline_elapsed(self.index);
        }
    }
}

impl<D> Sink<D> for DeadlineWatcher {
    fn on_subscribe(&self, subscription: SharedSubscription) {
        match self.upstream.set_once(subscription.clone()) {
            SetOnce::Installed => subscription.request(UNBOUNDED),
            SetOnce::Duplicate => hooks::signal_dropped(
                COMPONENT,
                fields::REASON_DUPLICATE_SUBSCRIPTION,
                DroppedSignal::Subscription,
            ),
            SetOnce::Cancelled => {}
        }
    }

    fn on_next(&self, _value: D) {
        self.upstream.cancel();
        self.elapsed();
    }

    fn on_error(&self, error: StreamError) {
        match self.handler.upgrade() {
            Some(handler) => handler.deadline_failed(self.index, error),
            None => hooks::signal_dropped(
                COMPONENT,
                fields::REASON_AFTER_TERMINAL,
                DroppedSignal::Error(error),
            ),
        }
    }

    fn on_complete(&self) {
        self.elapsed();
    }
}

impl IndexedCancellable for DeadlineWatcher {
    fn index(&self) -> u64 {
        self.index
    }

    fn cancel(&self) {
        self.upstream.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::{DeadlineHandler, DeadlineWatcher};
    use crate::error::StreamError;
    use crate::protocol::{Sink, Subscription, UNBOUNDED};
    use crate::race::IndexedCancellable;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, Weak};

    #[derive(Default)]
    struct Recorder {
        elapsed: Mutex<Vec<u64>>,
        failed: Mutex<Vec<(u64, StreamError)>>,
    }

    impl DeadlineHandler for Recorder {
        fn deadline_elapsed(&self, index: u64) {
            self.elapsed.lock().unwrap().push(index);
        }

        fn deadline_failed(&self, index: u64, error: StreamError) {
            self.failed.lock().unwrap().push((index, error));
        }
    }

    #[derive(Default)]
    struct CountingSubscription {
        requested: AtomicU64,
        cancels: AtomicUsize,
    }

    impl Subscription for CountingSubscription {
        fn request(&self, n: u64) {
            self.requested.store(n, Ordering::Relaxed);
        }

        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn watcher(index: u64, recorder: &Arc<Recorder>) -> DeadlineWatcher {
        let handler: Arc<dyn DeadlineHandler> = recorder.clone();
        DeadlineWatcher::new(index, Arc::downgrade(&handler))
    }

    #[test]
    fn subscribe_requests_unbounded() {
        let recorder = Arc::new(Recorder::default());
        let watcher = watcher(0, &recorder);
        let upstream = Arc::new(CountingSubscription::default());

        Sink::<()>::on_subscribe(&watcher, upstream.clone());

        assert_eq!(upstream.requested.load(Ordering::Relaxed), UNBOUNDED);
    }

    #[test]
    fn first_value_cancels_source_and_reports_elapsed() {
        let recorder = Arc::new(Recorder::default());
        let watcher = watcher(3, &recorder);
        let upstream = Arc::new(CountingSubscription::default());

        Sink::<u8>::on_subscribe(&watcher, upstream.clone());
        Sink::<u8>::on_next(&watcher, 1);

        assert_eq!(upstream.cancels.load(Ordering::Relaxed), 1);
        assert_eq!(*recorder.elapsed.lock().unwrap(), vec![3]);
    }

    #[test]
    fn completion_counts_as_elapsed_and_error_as_failure() {
        let recorder = Arc::new(Recorder::default());
        let completing = watcher(1, &recorder);
        let failing = watcher(2, &recorder);

        Sink::<()>::on_complete(&completing);
        Sink::<()>::on_error(&failing, StreamError::upstream("clock broke"));

        assert_eq!(*recorder.elapsed.lock().unwrap(), vec![1]);
        assert_eq!(
            *recorder.failed.lock().unwrap(),
            vec![(2, StreamError::upstream("clock broke"))]
        );
    }

    #[test]
    fn cancel_before_subscribe_cancels_late_subscription() {
        let recorder = Arc::new(Recorder::default());
        let watcher = watcher(0, &recorder);
        watcher.cancel();

        let upstream = Arc::new(CountingSubscription::default());
        Sink::<()>::on_subscribe(&watcher, upstream.clone());

        assert_eq!(upstream.cancels.load(Ordering::Relaxed), 1);
        assert_eq!(upstream.requested.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn dropped_owner_makes_signals_inert() {
        let handler: Weak<dyn DeadlineHandler> = {
            let recorder: Arc<dyn DeadlineHandler> = Arc::new(Recorder::default());
            Arc::downgrade(&recorder)
        };
        let watcher = DeadlineWatcher::new(0, handler);

        Sink::<()>::on_complete(&watcher);
        Sink::<()>::on_error(&watcher, StreamError::Timeout);
    }
}
