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

//! Hot-swappable upstream subscription holder that preserves downstream demand.

use crate::observability::events;
use crate::protocol::{add_cap, add_cap_atomic, SharedSubscription, UNBOUNDED};
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "subscription_arbiter";

struct Upstream(SharedSubscription);

/// Owns exactly one live upstream [`Subscription`](crate::Subscription) on behalf of a
/// downstream sink.
///
/// All state changes funnel through a work-in-progress counter: the caller that moves it
/// off zero applies its own change directly and then drains whatever other callers
/// recorded in the `missed_*` cells meanwhile. `current` and `requested` are only ever
/// written by that drainer, so every `request` issued upstream happens inside the
/// serialized section and targets the one live subscription.
pub struct SubscriptionArbiter {
    current: ArcSwapOption<Upstream>,
    requested: AtomicU64,
    missed_subscription: ArcSwapOption<Upstream>,
    missed_requested: AtomicU64,
    missed_produced: AtomicU64,
    wip: AtomicUsize,
    cancelled: AtomicBool,
    unbounded: AtomicBool,
}

impl Default for SubscriptionArbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionArbiter {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            requested: AtomicU64::new(0),
            missed_subscription: ArcSwapOption::empty(),
            missed_requested: AtomicU64::new(0),
            missed_produced: AtomicU64::new(0),
            wip: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            unbounded: AtomicBool::new(false),
        }
    }

    /// Installs `subscription` as the live upstream, cancelling the previous one and
    /// replaying outstanding demand to the new one. After [`cancel`](Self::cancel) the
    /// offered subscription is cancelled instead.
    pub fn set(&self, subscription: SharedSubscription) {
        if self.cancelled.load(Ordering::Acquire) {
            subscription.cancel();
            return;
        }

        if self.try_enter() {
            let upstream = Arc::new(Upstream(subscription.clone()));
            if let Some(previous) = self.current.swap(Some(upstream)) {
                debug!(
                    event = events::ARBITER_SWAP,
                    component = COMPONENT,
                    "replacing live upstream subscription"
                );
                previous.0.cancel();
            }
            let outstanding = self.requested.load(Ordering::Relaxed);
            if outstanding != 0 {
                subscription.request(outstanding);
            }
            if self.leave(1) != 0 {
                self.drain_loop();
            }
            return;
        }

        let upstream = Arc::new(Upstream(subscription));
        if let Some(superseded) = self.missed_subscription.swap(Some(upstream)) {
            superseded.0.cancel();
        }
        self.drain();
    }

    /// Adds `n` to downstream demand and forwards it to the live upstream, or holds it
    /// until one is installed.
    pub fn request(&self, n: u64) {
        if n == 0 || self.unbounded.load(Ordering::Acquire) {
            return;
        }

        if self.try_enter() {
            let requested = self.requested.load(Ordering::Relaxed);
            if requested != UNBOUNDED {
                let updated = add_cap(requested, n);
                self.requested.store(updated, Ordering::Relaxed);
                if updated == UNBOUNDED {
                    self.unbounded.store(true, Ordering::Release);
                }
            }
            if let Some(upstream) = self.current.load_full() {
                upstream.0.request(n);
            }
            if self.leave(1) != 0 {
                self.drain_loop();
            }
            return;
        }

        add_cap_atomic(&self.missed_requested, n);
        self.drain();
    }

    /// Records `n` items delivered downstream so a later swap only replays unfulfilled
    /// demand.
    pub fn produced(&self, n: u64) {
        if n == 0 || self.unbounded.load(Ordering::Acquire) {
            return;
        }

        if self.try_enter() {
            let requested = self.requested.load(Ordering::Relaxed);
            if requested != UNBOUNDED {
                self.requested
                    .store(self.checked_produced(requested, n), Ordering::Relaxed);
            }
            if self.leave(1) != 0 {
                self.drain_loop();
            }
            return;
        }

        add_cap_atomic(&self.missed_produced, n);
        self.drain();
    }

    /// Cancels the live upstream. Terminal and idempotent.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(
            event = events::ARBITER_CANCEL,
            component = COMPONENT,
            "cancelling arbiter"
        );
        self.drain();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Demand requested downstream and not yet produced, as last settled by the drainer.
    pub fn outstanding(&self) -> u64 {
        self.requested.load(Ordering::Acquire)
    }

    pub fn is_unbounded(&self) -> bool {
        self.unbounded.load(Ordering::Acquire)
    }

    fn try_enter(&self) -> bool {
        self.wip.load(Ordering::Acquire) == 0
            && self
                .wip
                .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    fn leave(&self, missed: usize) -> usize {
        self.wip.fetch_sub(missed, Ordering::AcqRel) - missed
    }

    fn drain(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        self.drain_loop();
    }

    fn drain_loop(&self) {
        let mut missed = 1;
        loop {
            let missed_subscription = self.missed_subscription.swap(None);
            let missed_requested = self.missed_requested.swap(0, Ordering::AcqRel);
            let missed_produced = self.missed_produced.swap(0, Ordering::AcqRel);

            if self.cancelled.load(Ordering::Acquire) {
                if let Some(current) = self.current.swap(None) {
                    current.0.cancel();
                }
                if let Some(pending) = missed_subscription {
                    pending.0.cancel();
                }
            } else {
                let mut requested = self.requested.load(Ordering::Relaxed);
                if requested != UNBOUNDED {
                    requested = add_cap(requested, missed_requested);
                    if requested != UNBOUNDED {
                        requested = self.checked_produced(requested, missed_produced);
                    } else {
                        self.unbounded.store(true, Ordering::Release);
                    }
                    self.requested.store(requested, Ordering::Relaxed);
                }

                if let Some(pending) = missed_subscription {
                    if let Some(previous) = self.current.swap(Some(pending.clone())) {
                        debug!(
                            event = events::ARBITER_SWAP,
                            component = COMPONENT,
                            "replacing live upstream subscription"
                        );
                        previous.0.cancel();
                    }
                    if requested != 0 {
                        pending.0.request(requested);
                    }
                } else if missed_requested != 0 {
                    if let Some(current) = self.current.load_full() {
                        current.0.request(missed_requested);
                    }
                }
            }

            missed = self.leave(missed);
            if missed == 0 {
                return;
            }
        }
    }

    fn checked_produced(&self, requested: u64, n: u64) -> u64 {
        if n > requested {
            warn!(
                event = events::ARBITER_OVERPRODUCED,
                component = COMPONENT,
                requested,
                produced = n,
                "upstream produced more than requested"
            );
            return 0;
        }
        requested - n
    }
}
