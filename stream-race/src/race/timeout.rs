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

//! Timeout/race operator: main source versus per-item deadline sources.

use super::fallback::FallbackSink;
use super::indexed::{WatcherSlot, TERMINATED};
use super::watcher::{DeadlineHandler, DeadlineWatcher};
use crate::arbiter::SubscriptionArbiter;
use crate::error::StreamError;
use crate::hooks::{self, DroppedSignal};
use crate::observability::{events, fields};
use crate::protocol::{
    EmptySubscription, SetOnce, SharedSink, SharedSource, SharedSubscription, Sink, Source,
    Subscription, SubscriptionSlot,
};
use crate::serialized::SerializedSink;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

const COMPONENT: &str = "timeout_race";

/// What a per-item deadline factory returns: a deadline source, `None` when it has none to
/// offer, or an error. Both `None` and `Err` fail the race.
pub type DeadlineResult<V> = Result<Option<SharedSource<V>>, StreamError>;

/// Derives the deadline source for the next item from the item just emitted.
pub type DeadlineFactory<T, V> = Arc<dyn Fn(&T) -> DeadlineResult<V> + Send + Sync>;

/// Lifecycle of one race subscription.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum RaceState {
    /// Forwarding items from the main source.
    Active = 0,
    /// A deadline fired and the fallback source took over.
    Switched = 1,
    /// A terminal signal or cancellation won.
    Terminated = 2,
}

impl RaceState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => RaceState::Active,
            1 => RaceState::Switched,
            _ => RaceState::Terminated,
        }
    }
}

/// Emits the main source's items unless a deadline source fires first.
///
/// The first item races `first_deadline`; every later item races the source that
/// `next_deadline` derives from the item before it. A deadline "fires" when its source
/// emits a value or completes. On fire the race fails with [`StreamError::Timeout`], or,
/// when a fallback is configured, the fallback source takes over for the rest of the
/// sequence with any outstanding demand carried over. A failing deadline source fails
/// the race with its own error and never triggers the fallback.
///
/// Signals from the main source, the deadline sources and the fallback may arrive on
/// any thread; the downstream sink sees them serialized.
pub struct Timeout<T, U, V> {
    source: SharedSource<T>,
    first_deadline: SharedSource<U>,
    next_deadline: DeadlineFactory<T, V>,
    fallback: Option<SharedSource<T>>,
}

impl<T, U, V> Timeout<T, U, V> {
    pub fn new<F>(
        source: SharedSource<T>,
        first_deadline: SharedSource<U>,
        next_deadline: F,
    ) -> Self
    where
        F: Fn(&T) -> DeadlineResult<V> + Send + Sync + 'static,
    {
        Self {
            source,
            first_deadline,
            next_deadline: Arc::new(next_deadline),
            fallback: None,
        }
    }

    /// Switches to `fallback` instead of failing when a deadline fires.
    pub fn with_fallback(mut self, fallback: SharedSource<T>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Read-only view of one race subscription, for diagnostics.
///
/// Holds the race weakly; once every signal path has released it the state reads as
/// [`RaceState::Terminated`].
#[derive(Clone)]
pub struct RaceHandle {
    race_id: String,
    race: Weak<dyn RaceStatus>,
}

impl RaceHandle {
    pub fn race_id(&self) -> &str {
        &self.race_id
    }

    pub fn state(&self) -> RaceState {
        self.race
            .upgrade()
            .map_or(RaceState::Terminated, |race| race.state())
    }
}

impl std::fmt::Debug for RaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaceHandle")
            .field("race_id", &self.race_id)
            .field("state", &self.state())
            .finish()
    }
}

trait RaceStatus: Send + Sync {
    fn state(&self) -> RaceState;
}

impl<T, U, V> Timeout<T, U, V>
where
    T: Send + 'static,
    U: 'static,
    V: 'static,
{
    /// Subscribes like [`Source::subscribe`] and returns a handle to the new race.
    pub fn subscribe_tracked(&self, sink: SharedSink<T>) -> RaceHandle {
        let downstream: SharedSink<T> = Arc::new(SerializedSink::new(sink));
        let race = RaceSubscriber::new(
            downstream.clone(),
            self.next_deadline.clone(),
            self.fallback.clone(),
        );

        debug!(
            event = events::RACE_SUBSCRIBE,
            component = COMPONENT,
            race_id = race.race_id.as_str(),
            has_fallback = self.fallback.is_some(),
            "subscribing timeout race"
        );

        downstream.on_subscribe(race.clone());

        let status: Weak<dyn RaceStatus> = Arc::downgrade(&race) as Weak<dyn RaceStatus>;
        let handle = RaceHandle {
            race_id: race.race_id.clone(),
            race: status,
        };

        // Main owns the arbiter before watcher 0 can fire and hand it to the fallback.
        self.source.subscribe(race.clone());

        if let Some(watcher) = race.arm(0) {
            self.first_deadline.subscribe(watcher);
        }
        handle
    }
}

impl<T, U, V> Source<T> for Timeout<T, U, V>
where
    T: Send + 'static,
    U: 'static,
    V: 'static,
{
    fn subscribe(&self, sink: SharedSink<T>) {
        self.subscribe_tracked(sink);
    }
}

/// Subscriber to the main source; also the subscription the downstream sink holds.
pub(crate) struct RaceSubscriber<T, V> {
    me: Weak<Self>,
    race_id: String,
    downstream: SharedSink<T>,
    arbiter: Arc<SubscriptionArbiter>,
    upstream: SubscriptionSlot,
    generation: AtomicU64,
    state: AtomicU8,
    watcher: WatcherSlot,
    next_deadline: DeadlineFactory<T, V>,
    fallback: Option<SharedSource<T>>,
}

impl<T, V> RaceSubscriber<T, V>
where
    T: Send + 'static,
    V: 'static,
{
    pub(crate) fn new(
        downstream: SharedSink<T>,
        next_deadline: DeadlineFactory<T, V>,
        fallback: Option<SharedSource<T>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            race_id: fields::new_race_id(),
            downstream,
            arbiter: Arc::new(SubscriptionArbiter::new()),
            upstream: SubscriptionSlot::new(),
            generation: AtomicU64::new(0),
            state: AtomicU8::new(RaceState::Active as u8),
            watcher: WatcherSlot::new(),
            next_deadline,
            fallback,
        })
    }

    pub(crate) fn state(&self) -> RaceState {
        RaceState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: RaceState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// `Active -> Switched`; loses to a concurrent cancel that already stored `Terminated`.
    fn switch_state(&self) -> bool {
        self.state
            .compare_exchange(
                RaceState::Active as u8,
                RaceState::Switched as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    fn handler(&self) -> Weak<dyn DeadlineHandler> {
        let handler: Weak<dyn DeadlineHandler> = self.me.clone();
        handler
    }

    /// Arms a watcher for generation `index`; `None` when a newer watcher or a terminal
    /// state already owns the slot.
    pub(crate) fn arm(&self, index: u64) -> Option<Arc<DeadlineWatcher>> {
        let watcher = Arc::new(DeadlineWatcher::new(index, self.handler()));
        if self.watcher.arm(watcher.clone()) {
            trace!(
                event = events::RACE_DEADLINE_ARMED,
                component = COMPONENT,
                race_id = self.race_id.as_str(),
                index,
                "deadline watcher armed"
            );
            Some(watcher)
        } else {
            debug!(
                event = events::RACE_DEADLINE_REJECTED,
                component = COMPONENT,
                race_id = self.race_id.as_str(),
                index,
                "deadline watcher rejected"
            );
            None
        }
    }

    fn terminate_from(&self, expected: u64) -> bool {
        expected != TERMINATED
            && self
                .generation
                .compare_exchange(expected, TERMINATED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    /// Tears everything down and delivers `error`. Callers must have won the generation.
    fn fail(&self, error: StreamError) {
        self.watcher.cancel();
        self.arbiter.cancel();
        self.set_state(RaceState::Terminated);
        self.downstream.on_error(error);
    }

    fn derivation_failed(&self, generation: u64, error: StreamError) {
        if !self.terminate_from(generation) {
            hooks::signal_dropped(
                COMPONENT,
                fields::REASON_AFTER_TERMINAL,
                DroppedSignal::Error(error),
            );
            return;
        }

        warn!(
            event = events::RACE_DERIVATION_FAILED,
            component = COMPONENT,
            race_id = self.race_id.as_str(),
            generation,
            err = %error,
            "per-item deadline derivation failed"
        );
        self.fail(error);
    }

    fn handle_timeout(&self, index: u64) {
        let Some(fallback) = self.fallback.as_ref() else {
            info!(
                event = events::RACE_TIMEOUT,
                component = COMPONENT,
                race_id = self.race_id.as_str(),
                index,
                "deadline elapsed; failing with timeout"
            );
            self.fail(StreamError::Timeout);
            return;
        };

        info!(
            event = events::RACE_SWITCH_FALLBACK,
            component = COMPONENT,
            race_id = self.race_id.as_str(),
            index,
            outstanding = self.arbiter.outstanding(),
            "deadline elapsed; switching to fallback"
        );
        if !self.switch_state() {
            return;
        }
        self.watcher.cancel();
        self.arbiter.set(Arc::new(EmptySubscription));
        fallback.subscribe(Arc::new(FallbackSink::new(
            self.downstream.clone(),
            self.arbiter.clone(),
        )));
    }

    #[cfg(test)]
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl<T, V> RaceStatus for RaceSubscriber<T, V>
where
    T: Send + 'static,
    V: 'static,
{
    fn state(&self) -> RaceState {
        RaceSubscriber::state(self)
    }
}

impl<T, V> Sink<T> for RaceSubscriber<T, V>
where
    T: Send + 'static,
    V: 'static,
{
    fn on_subscribe(&self, subscription: SharedSubscription) {
        match self.upstream.set_once(subscription.clone()) {
            SetOnce::Installed if self.generation.load(Ordering::Acquire) == TERMINATED => {
                debug!(
                    event = events::RACE_LATE_SUBSCRIPTION,
                    component = COMPONENT,
                    race_id = self.race_id.as_str(),
                    "main source subscribed after the race ended"
                );
                subscription.cancel();
            }
            SetOnce::Installed => self.arbiter.set(subscription),
            SetOnce::Duplicate => {
                warn!(
                    event = events::PROTOCOL_VIOLATION,
                    component = COMPONENT,
                    race_id = self.race_id.as_str(),
                    reason = fields::REASON_DUPLICATE_SUBSCRIPTION,
                    "main source subscribed twice"
                );
                hooks::signal_dropped(
                    COMPONENT,
                    fields::REASON_DUPLICATE_SUBSCRIPTION,
                    DroppedSignal::Subscription,
                );
            }
            SetOnce::Cancelled => {}
        }
    }

    fn on_next(&self, value: T) {
        self.watcher.cancel_active();

        let index = self.generation.load(Ordering::Acquire);
        if index == TERMINATED
            || self
                .generation
                .compare_exchange(index, index + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            hooks::next_dropped(COMPONENT, fields::REASON_LATE_ITEM, value);
            return;
        }

        // Derive before handing the value downstream; the observable order stays
        // "item, then deadline failure".
        let deadline = (self.next_deadline)(&value);

        self.downstream.on_next(value);
        self.arbiter.produced(1);

        let next = index + 1;
        let deadline = match deadline {
            Ok(Some(deadline)) => deadline,
            Ok(None) => {
                self.derivation_failed(
                    next,
                    StreamError::Derivation("deadline factory returned no source".to_string()),
                );
                return;
            }
            Err(error) => {
                self.derivation_failed(next, error);
                return;
            }
        };

        if let Some(watcher) = self.arm(next) {
            deadline.subscribe(watcher);
        }
    }

    fn on_error(&self, error: StreamError) {
        let index = self.generation.load(Ordering::Acquire);
        if !self.terminate_from(index) {
            hooks::signal_dropped(
                COMPONENT,
                fields::REASON_AFTER_TERMINAL,
                DroppedSignal::Error(error),
            );
            return;
        }

        debug!(
            event = events::RACE_UPSTREAM_TERMINATED,
            component = COMPONENT,
            race_id = self.race_id.as_str(),
            signal = "error",
            err = %error,
            "main source failed"
        );
        self.watcher.cancel();
        self.set_state(RaceState::Terminated);
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        let index = self.generation.load(Ordering::Acquire);
        if !self.terminate_from(index) {
            hooks::signal_dropped(
                COMPONENT,
                fields::REASON_AFTER_TERMINAL,
                DroppedSignal::Complete,
            );
            return;
        }

        debug!(
            event = events::RACE_UPSTREAM_TERMINATED,
            component = COMPONENT,
            race_id = self.race_id.as_str(),
            signal = "complete",
            "main source completed"
        );
        self.watcher.cancel();
        self.set_state(RaceState::Terminated);
        self.downstream.on_complete();
    }
}

impl<T, V> Subscription for RaceSubscriber<T, V>
where
    T: Send + 'static,
    V: 'static,
{
    fn request(&self, n: u64) {
        if n != 0 {
            self.arbiter.request(n);
            return;
        }

        if self.generation.swap(TERMINATED, Ordering::AcqRel) == TERMINATED {
            return;
        }
        warn!(
            event = events::PROTOCOL_VIOLATION,
            component = COMPONENT,
            race_id = self.race_id.as_str(),
            reason = fields::REASON_ZERO_REQUEST,
            "downstream requested zero items"
        );
        self.fail(StreamError::protocol_violation(
            "request amount must be positive",
        ));
    }

    fn cancel(&self) {
        let previous = self.generation.swap(TERMINATED, Ordering::AcqRel);
        if previous != TERMINATED || self.state() == RaceState::Switched {
            debug!(
                event = events::RACE_CANCELLED,
                component = COMPONENT,
                race_id = self.race_id.as_str(),
                generation = %fields::format_generation(previous),
                "downstream cancelled"
            );
        }
        self.watcher.cancel();
        self.arbiter.cancel();
        self.set_state(RaceState::Terminated);
    }
}

impl<T, V> DeadlineHandler for RaceSubscriber<T, V>
where
    T: Send + 'static,
    V: 'static,
{
    fn deadline_elapsed(&self, index: u64) {
        if self.generation.load(Ordering::Acquire) != index || !self.terminate_from(index) {
            trace!(
                event = events::RACE_DEADLINE_STALE,
                component = COMPONENT,
                race_id = self.race_id.as_str(),
                index,
                "stale deadline ignored"
            );
            return;
        }
        self.handle_timeout(index);
    }

    fn deadline_failed(&self, index: u64, error: StreamError) {
        if self.generation.load(Ordering::Acquire) != index || !self.terminate_from(index) {
            hooks::signal_dropped(
                COMPONENT,
                fields::REASON_AFTER_TERMINAL,
                DroppedSignal::Error(error),
            );
            return;
        }

        warn!(
            event = events::RACE_WATCHER_FAILED,
            component = COMPONENT,
            race_id = self.race_id.as_str(),
            index,
            err = %error,
            "deadline source failed"
        );
        self.fail(error);
    }
}
