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

//! Funnels concurrently delivered signals into one sequential protocol stream.

use crate::error::StreamError;
use crate::hooks::{self, DroppedSignal};
use crate::observability::{events, fields};
use crate::protocol::{SharedSink, SharedSubscription, Sink};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::lock::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::trace;

const COMPONENT: &str = "serialized_sink";

enum Signal<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

/// Wraps a sink so that callers on different threads never overlap inside it.
///
/// Every signal is pushed onto a lock-free queue and a work-in-progress counter is
/// bumped. The caller that moves the counter off zero becomes the drainer and delivers
/// queued signals until the counter returns to zero; every other caller returns
/// immediately. Signals are delivered in enqueue order and nothing is delivered after the
/// first terminal signal.
pub struct SerializedSink<T> {
    actual: SharedSink<T>,
    queue_tx: UnboundedSender<Signal<T>>,
    // Only the drainer touches the receiver, so `try_lock` never contends.
    queue_rx: Mutex<UnboundedReceiver<Signal<T>>>,
    wip: AtomicUsize,
    done: AtomicBool,
}

impl<T: Send + 'static> SerializedSink<T> {
    pub fn new(actual: SharedSink<T>) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded();
        Self {
            actual,
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
            wip: AtomicUsize::new(0),
            done: AtomicBool::new(false),
        }
    }

    /// `true` once a terminal signal has been delivered downstream.
    pub fn is_terminated(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    fn enqueue(&self, signal: Signal<T>) {
        if self.done.load(Ordering::Acquire) {
            Self::discard(signal);
            return;
        }

        if let Err(err) = self.queue_tx.unbounded_send(signal) {
            Self::discard(err.into_inner());
            return;
        }

        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        self.drain();
    }

    fn drain(&self) {
        let mut missed = 1;
        loop {
            if let Some(mut queue) = self.queue_rx.try_lock() {
                while let Ok(Some(signal)) = queue.try_next() {
                    self.deliver(signal);
                }
            }

            missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if missed == 0 {
                break;
            }
        }
    }

    fn deliver(&self, signal: Signal<T>) {
        if self.done.load(Ordering::Relaxed) {
            Self::discard(signal);
            return;
        }

        match signal {
            Signal::Next(value) => self.actual.on_next(value),
            Signal::Error(error) => {
                self.done.store(true, Ordering::Release);
                trace!(
                    event = events::SERIALIZED_TERMINAL,
                    component = COMPONENT,
                    signal = "error",
                    err = %error,
                    "delivering terminal signal"
                );
                self.actual.on_error(error);
            }
            Signal::Complete => {
                self.done.store(true, Ordering::Release);
                trace!(
                    event = events::SERIALIZED_TERMINAL,
                    component = COMPONENT,
                    signal = "complete",
                    "delivering terminal signal"
                );
                self.actual.on_complete();
            }
        }
    }

    fn discard(signal: Signal<T>) {
        match signal {
            Signal::Next(value) => {
                hooks::next_dropped(COMPONENT, fields::REASON_AFTER_TERMINAL, value)
            }
            Signal::Error(error) => hooks::signal_dropped(
                COMPONENT,
                fields::REASON_AFTER_TERMINAL,
                DroppedSignal::Error(error),
            ),
            Signal::Complete => hooks::signal_dropped(
                COMPONENT,
                fields::REASON_AFTER_TERMINAL,
                DroppedSignal::Complete,
            ),
        }
    }
}

impl<T: Send + 'static> Sink<T> for SerializedSink<T> {
    fn on_subscribe(&self, subscription: SharedSubscription) {
        self.actual.on_subscribe(subscription);
    }

    fn on_next(&self, value: T) {
        self.enqueue(Signal::Next(value));
    }

    fn on_error(&self, error: StreamError) {
        self.enqueue(Signal::Error(error));
    }

    fn on_complete(&self) {
        self.enqueue(Signal::Complete);
    }
}
