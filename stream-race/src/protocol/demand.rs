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

//! Saturating demand arithmetic.

use std::sync::atomic::{AtomicU64, Ordering};

/// Demand value meaning "emit without limit". Once reached it never decreases.
pub const UNBOUNDED: u64 = u64::MAX;

/// Adds two demand values, saturating at [`UNBOUNDED`].
#[inline]
pub fn add_cap(current: u64, n: u64) -> u64 {
    current.saturating_add(n)
}

/// Subtracts emitted items from outstanding demand. Unbounded demand is left untouched
/// and the result never drops below zero.
#[inline]
pub fn produced(current: u64, n: u64) -> u64 {
    if current == UNBOUNDED {
        UNBOUNDED
    } else {
        current.saturating_sub(n)
    }
}

/// Atomically adds `n` to `cell` with saturation and returns the previous value.
pub(crate) fn add_cap_atomic(cell: &AtomicU64, n: u64) -> u64 {
    match cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
        if current == UNBOUNDED {
            None
        } else {
            Some(add_cap(current, n))
        }
    }) {
        Ok(previous) => previous,
        Err(previous) => previous,
    }
}

#[cfg(test)]
mod tests {
    use super::{add_cap, add_cap_atomic, produced, UNBOUNDED};
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn add_cap_saturates_at_unbounded() {
        assert_eq!(add_cap(3, 4), 7);
        assert_eq!(add_cap(UNBOUNDED - 1, 10), UNBOUNDED);
        assert_eq!(add_cap(UNBOUNDED, 1), UNBOUNDED);
    }

    #[test]
    fn produced_keeps_unbounded_and_floors_at_zero() {
        assert_eq!(produced(5, 2), 3);
        assert_eq!(produced(1, 4), 0);
        assert_eq!(produced(UNBOUNDED, 1_000), UNBOUNDED);
    }

    #[test]
    fn add_cap_atomic_returns_previous_value() {
        let cell = AtomicU64::new(0);

        assert_eq!(add_cap_atomic(&cell, 2), 0);
        assert_eq!(add_cap_atomic(&cell, UNBOUNDED), 2);
        assert_eq!(add_cap_atomic(&cell, 1), UNBOUNDED);
        assert_eq!(cell.load(Ordering::Acquire), UNBOUNDED);
    }
}
