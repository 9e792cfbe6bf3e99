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

//! Canonical structured event names used across `stream-race`.

// Signal delivery events.
pub const SIGNAL_DROPPED: &str = "signal_dropped";
pub const SERIALIZED_TERMINAL: &str = "serialized_terminal";
pub const PROTOCOL_VIOLATION: &str = "protocol_violation";

// Arbiter events.
pub const ARBITER_SWAP: &str = "arbiter_swap";
pub const ARBITER_CANCEL: &str = "arbiter_cancel";
pub const ARBITER_OVERPRODUCED: &str = "arbiter_overproduced";

// Race operator lifecycle events.
pub const RACE_SUBSCRIBE: &str = "race_subscribe";
pub const RACE_DEADLINE_ARMED: &str = "race_deadline_armed";
pub const RACE_DEADLINE_REJECTED: &str = "race_deadline_rejected";
pub const RACE_DEADLINE_STALE: &str = "race_deadline_stale";
pub const RACE_TIMEOUT: &str = "race_timeout";
pub const RACE_SWITCH_FALLBACK: &str = "race_switch_fallback";
pub const RACE_WATCHER_FAILED: &str = "race_watcher_failed";
pub const RACE_DERIVATION_FAILED: &str = "race_derivation_failed";
pub const RACE_UPSTREAM_TERMINATED: &str = "race_upstream_terminated";
pub const RACE_CANCELLED: &str = "race_cancelled";
pub const RACE_LATE_SUBSCRIPTION: &str = "race_late_subscription";

// Runtime events.
pub const RUNTIME_TIMER_FALLBACK: &str = "runtime_timer_fallback";
pub const RUNTIME_STREAM_SPAWN: &str = "runtime_stream_spawn";
