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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use stream_race::Subscription;
use tracing::debug;

/// Subscription that only records what was asked of it.
#[derive(Debug, Default)]
pub struct CountingSubscription {
    requests: Mutex<Vec<u64>>,
    cancels: AtomicUsize,
}

impl CountingSubscription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `request` amount, in call order.
    pub fn requests(&self) -> Vec<u64> {
        self.requests.lock().unwrap().clone()
    }

    /// Saturating sum of all requests.
    pub fn total_requested(&self) -> u64 {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .fold(0u64, |total, n| total.saturating_add(*n))
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_count() > 0
    }
}

impl Subscription for CountingSubscription {
    fn request(&self, n: u64) {
        debug!("counting_subscription request: {n}");
        self.requests.lock().unwrap().push(n);
    }

    fn cancel(&self) {
        debug!("counting_subscription cancel");
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}
