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

//! Spawning helpers for timers and stream-driven sources.

use crate::observability::events;
use lazy_static::lazy_static;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::task::AbortHandle;
use tracing::trace;

const COMPONENT: &str = "timer_runtime";
const TIMER_RUNTIME_THREADS: usize = 2;
const TIMER_RUNTIME_THREAD_NAME: &str = "stream-race-timer";

lazy_static! {
    static ref TIMER_RUNTIME: Runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TIMER_RUNTIME_THREADS)
        .thread_name(TIMER_RUNTIME_THREAD_NAME)
        .enable_all()
        .build()
        .expect("Unable to create timer runtime");
}

fn handle() -> Handle {
    match Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            trace!(
                event = events::RUNTIME_TIMER_FALLBACK,
                component = COMPONENT,
                "no ambient runtime; using crate timer runtime"
            );
            TIMER_RUNTIME.handle().clone()
        }
    }
}

/// Runs `fire` once `delay` has elapsed. Aborting the returned handle before then
/// guarantees `fire` never runs.
pub(crate) fn spawn_delay<F>(delay: Duration, fire: F) -> AbortHandle
where
    F: FnOnce() + Send + 'static,
{
    handle()
        .spawn(async move {
            tokio::time::sleep(delay).await;
            fire();
        })
        .abort_handle()
}

/// Drives `task` to completion on the ambient or crate runtime.
pub(crate) fn spawn_task<F>(task: F) -> AbortHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    trace!(
        event = events::RUNTIME_STREAM_SPAWN,
        component = COMPONENT,
        "spawning source task"
    );
    handle().spawn(task).abort_handle()
}
