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

use super::SinkCell;
use crate::error::StreamError;
use crate::protocol::{SharedSink, Source, Subscription};
use crate::runtime::timer_runtime;
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;

const REQUESTED: u8 = 0b001;
const FIRED: u8 = 0b010;
const DONE: u8 = 0b100;

/// Emits a single `()` once `delay` has elapsed and demand exists, then completes.
///
/// The usual deadline source for [`Timeout`](crate::race::Timeout).
#[derive(Clone, Copy, Debug)]
pub struct TimerSource {
    delay: Duration,
}

pub fn timer(delay: Duration) -> TimerSource {
    TimerSource { delay }
}

impl TimerSource {
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Source<()> for TimerSource {
    fn subscribe(&self, sink: SharedSink<()>) {
        let subscription = Arc::new(TimerSubscription {
            state: AtomicU8::new(0),
            sink: ArcSwapOption::from_pointee(SinkCell(sink.clone())),
            timer: ArcSwapOption::empty(),
        });

        sink.on_subscribe(subscription.clone());
        if subscription.is_done() {
            return;
        }

        let fired = subscription.clone();
        let handle = timer_runtime::spawn_delay(self.delay, move || fired.fire());
        subscription.timer.store(Some(Arc::new(handle)));
        if subscription.is_done() {
            subscription.abort_timer();
        }
    }
}

struct TimerSubscription {
    state: AtomicU8,
    sink: ArcSwapOption<SinkCell<()>>,
    timer: ArcSwapOption<AbortHandle>,
}

impl TimerSubscription {
    fn is_done(&self) -> bool {
        self.state.load(Ordering::Acquire) & DONE != 0
    }

    fn fire(&self) {
        let previous = self.state.fetch_or(FIRED, Ordering::AcqRel);
        if previous & REQUESTED != 0 {
            self.deliver();
        }
    }

    fn deliver(&self) {
        if self.state.fetch_or(DONE, Ordering::AcqRel) & DONE != 0 {
            return;
        }
        if let Some(sink) = self.sink.swap(None) {
            sink.0.on_next(());
            sink.0.on_complete();
        }
    }

    fn abort_timer(&self) {
        if let Some(handle) = self.timer.swap(None) {
            handle.abort();
        }
    }
}

impl Subscription for TimerSubscription {
    fn request(&self, n: u64) {
        if n == 0 {
            if self.state.fetch_or(DONE, Ordering::AcqRel) & DONE == 0 {
                self.abort_timer();
                if let Some(sink) = self.sink.swap(None) {
                    sink.0.on_error(StreamError::protocol_violation(
                        "request amount must be positive",
                    ));
                }
            }
            return;
        }

        let previous = self.state.fetch_or(REQUESTED, Ordering::AcqRel);
        if previous & FIRED != 0 {
            self.deliver();
        }
    }

    fn cancel(&self) {
        self.state.fetch_or(DONE, Ordering::AcqRel);
        self.sink.store(None);
        self.abort_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::timer;
    use crate::error::StreamError;
    use crate::protocol::{SharedSubscription, Sink, Source, UNBOUNDED};
    use arc_swap::ArcSwapOption;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct Ticks {
        subscription: ArcSwapOption<SharedSubscription>,
        request_on_subscribe: bool,
        next: AtomicUsize,
        complete: AtomicUsize,
    }

    impl Sink<()> for Ticks {
        fn on_subscribe(&self, subscription: SharedSubscription) {
            if self.request_on_subscribe {
                subscription.request(UNBOUNDED);
            }
            self.subscription.store(Some(Arc::new(subscription)));
        }

        fn on_next(&self, _value: ()) {
            self.next.fetch_add(1, Ordering::SeqCst);
        }

        fn on_error(&self, _error: StreamError) {}

        fn on_complete(&self) {
            self.complete.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let sink = Arc::new(Ticks {
            request_on_subscribe: true,
            ..Ticks::default()
        });
        timer(Duration::from_secs(3)).subscribe(sink.clone());

        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert_eq!(sink.next.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(sink.next.load(Ordering::SeqCst), 1);
        assert_eq!(sink.complete.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_demand_after_firing() {
        let sink = Arc::new(Ticks::default());
        timer(Duration::from_millis(10)).subscribe(sink.clone());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.next.load(Ordering::SeqCst), 0);

        if let Some(subscription) = sink.subscription.load_full() {
            subscription.request(1);
        }
        assert_eq!(sink.next.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_stays_silent() {
        let sink = Arc::new(Ticks {
            request_on_subscribe: true,
            ..Ticks::default()
        });
        timer(Duration::from_millis(10)).subscribe(sink.clone());
        if let Some(subscription) = sink.subscription.load_full() {
            subscription.cancel();
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.next.load(Ordering::SeqCst), 0);
        assert_eq!(sink.complete.load(Ordering::SeqCst), 0);
    }
}
