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

//! Set-once subscription cell with a terminal `Cancelled` variant.

use super::SharedSubscription;
use arc_swap::ArcSwapOption;
use std::sync::Arc;

enum SlotState {
    Live(SharedSubscription),
    Cancelled,
}

/// Outcome of [`SubscriptionSlot::set_once`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SetOnce {
    Installed,
    /// The slot already holds a live subscription; the offered one was cancelled.
    Duplicate,
    /// The slot was cancelled first; the offered one was cancelled.
    Cancelled,
}

/// Holds the single upstream subscription of a sink.
///
/// The first `set_once` wins. Once cancelled the slot stays cancelled and any late
/// subscription offered to it is cancelled on arrival.
pub(crate) struct SubscriptionSlot {
    state: ArcSwapOption<SlotState>,
}

impl SubscriptionSlot {
    pub(crate) fn new() -> Self {
        Self {
            state: ArcSwapOption::empty(),
        }
    }

    pub(crate) fn set_once(&self, subscription: SharedSubscription) -> SetOnce {
        let empty: Option<Arc<SlotState>> = None;
        let next = Arc::new(SlotState::Live(subscription.clone()));
        let previous = self.state.compare_and_swap(&empty, Some(next));

        match previous.as_deref() {
            None => SetOnce::Installed,
            Some(SlotState::Live(_)) => {
                subscription.cancel();
                SetOnce::Duplicate
            }
            Some(SlotState::Cancelled) => {
                subscription.cancel();
                SetOnce::Cancelled
            }
        }
    }

    /// Returns the live subscription, if any.
    pub(crate) fn get(&self) -> Option<SharedSubscription> {
        match self.state.load().as_deref() {
            Some(SlotState::Live(subscription)) => Some(subscription.clone()),
            _ => None,
        }
    }

    pub(crate) fn request(&self, n: u64) {
        if let Some(subscription) = self.get() {
            subscription.request(n);
        }
    }

    /// Moves the slot to `Cancelled` and cancels the live subscription exactly once.
    /// Returns `true` for the call that performed the transition.
    pub(crate) fn cancel(&self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        let previous = self.state.swap(Some(Arc::new(SlotState::Cancelled)));
        match previous.as_deref() {
            Some(SlotState::Cancelled) => false,
            Some(SlotState::Live(subscription)) => {
                subscription.cancel();
                true
            }
            None => true,
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        matches!(self.state.load().as_deref(), Some(SlotState::Cancelled))
    }
}
