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

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use stream_race::{SharedSubscription, Sink, StreamError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedSignal<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

/// Sink that records every signal and checks the protocol as it goes.
///
/// Tracks overlapping calls (two signals in flight at once) and signals that arrive
/// after a terminal one. It requests `initial_request` items on subscribe, and
/// `per_item` more after every item when that is non-zero.
pub struct RecordingSink<T> {
    signals: Mutex<Vec<RecordedSignal<T>>>,
    subscription: Mutex<Option<SharedSubscription>>,
    subscribe_count: AtomicUsize,
    initial_request: u64,
    per_item: AtomicU64,
    in_flight: AtomicBool,
    overlaps: AtomicUsize,
    terminated: AtomicBool,
    after_terminal: AtomicUsize,
}

impl<T: Clone> RecordingSink<T> {
    /// Sink that requests nothing until told to.
    pub fn new() -> Self {
        Self::with_request(0)
    }

    pub fn with_request(initial_request: u64) -> Self {
        Self {
            signals: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
            subscribe_count: AtomicUsize::new(0),
            initial_request,
            per_item: AtomicU64::new(0),
            in_flight: AtomicBool::new(false),
            overlaps: AtomicUsize::new(0),
            terminated: AtomicBool::new(false),
            after_terminal: AtomicUsize::new(0),
        }
    }

    pub fn request_per_item(self, n: u64) -> Self {
        self.per_item.store(n, Ordering::SeqCst);
        self
    }

    pub fn signals(&self) -> Vec<RecordedSignal<T>> {
        self.signals.lock().unwrap().clone()
    }

    pub fn items(&self) -> Vec<T> {
        self.signals
            .lock()
            .unwrap()
            .iter()
            .filter_map(|signal| match signal {
                RecordedSignal::Next(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn error(&self) -> Option<StreamError> {
        self.signals
            .lock()
            .unwrap()
            .iter()
            .find_map(|signal| match signal {
                RecordedSignal::Error(error) => Some(error.clone()),
                _ => None,
            })
    }

    pub fn is_completed(&self) -> bool {
        self.signals
            .lock()
            .unwrap()
            .iter()
            .any(|signal| matches!(signal, RecordedSignal::Complete))
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn terminal_count(&self) -> usize {
        self.signals
            .lock()
            .unwrap()
            .iter()
            .filter(|signal| !matches!(signal, RecordedSignal::Next(_)))
            .count()
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribe_count.load(Ordering::SeqCst)
    }

    pub fn overlapping_calls(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn signals_after_terminal(&self) -> usize {
        self.after_terminal.load(Ordering::SeqCst)
    }

    pub fn request(&self, n: u64) {
        let subscription = self.subscription.lock().unwrap().clone();
        if let Some(subscription) = subscription {
            subscription.request(n);
        }
    }

    pub fn cancel(&self) {
        let subscription = self.subscription.lock().unwrap().clone();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }

    /// Polls until a terminal signal arrives or `limit` elapses. Works under a paused
    /// Tokio clock.
    pub async fn wait_for_terminal(&self, limit: Duration) -> bool {
        let step = Duration::from_millis(1);
        let mut waited = Duration::ZERO;
        while !self.is_terminated() {
            if waited >= limit {
                return false;
            }
            tokio::time::sleep(step).await;
            waited += step;
        }
        true
    }

    fn enter(&self) {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if self.terminated.load(Ordering::SeqCst) {
            self.after_terminal.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn leave(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

impl<T: Clone> Default for RecordingSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Sink<T> for RecordingSink<T>
where
    T: Clone + Send,
{
    fn on_subscribe(&self, subscription: SharedSubscription) {
        self.subscribe_count.fetch_add(1, Ordering::SeqCst);
        *self.subscription.lock().unwrap() = Some(subscription.clone());
        if self.initial_request > 0 {
            subscription.request(self.initial_request);
        }
    }

    fn on_next(&self, value: T) {
        self.enter();
        self.signals
            .lock()
            .unwrap()
            .push(RecordedSignal::Next(value));
        self.leave();

        let per_item = self.per_item.load(Ordering::SeqCst);
        if per_item > 0 {
            self.request(per_item);
        }
    }

    fn on_error(&self, error: StreamError) {
        self.enter();
        self.signals
            .lock()
            .unwrap()
            .push(RecordedSignal::Error(error));
        self.terminated.store(true, Ordering::SeqCst);
        self.leave();
    }

    fn on_complete(&self) {
        self.enter();
        self.signals.lock().unwrap().push(RecordedSignal::Complete);
        self.terminated.store(true, Ordering::SeqCst);
        self.leave();
    }
}
