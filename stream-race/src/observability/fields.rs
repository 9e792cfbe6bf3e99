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

//! Canonical structured field values and value-format helpers.

use crate::race::TERMINATED;

pub const TERMINATED_LABEL: &str = "terminated";
pub const REASON_LATE_ITEM: &str = "late_item";
pub const REASON_AFTER_TERMINAL: &str = "after_terminal";
pub const REASON_DUPLICATE_SUBSCRIPTION: &str = "duplicate_subscription";
pub const REASON_ZERO_REQUEST: &str = "zero_request";

/// Renders a generation for log fields, naming the terminal sentinel.
pub fn format_generation(generation: u64) -> String {
    if generation == TERMINATED {
        TERMINATED_LABEL.to_string()
    } else {
        generation.to_string()
    }
}

/// Builds a fresh correlation id for one race subscription.
pub fn new_race_id() -> String {
    uuid::Uuid::new_v4().hyphenated().to_string()
}

/// Drops the module path from a type name so log lines stay short.
pub fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::{format_generation, new_race_id, short_type_name, TERMINATED_LABEL};
    use crate::race::TERMINATED;

    #[test]
    fn format_generation_names_sentinel() {
        assert_eq!(format_generation(7), "7");
        assert_eq!(format_generation(TERMINATED), TERMINATED_LABEL);
    }

    #[test]
    fn race_ids_are_unique_hyphenated_uuids() {
        let a = new_race_id();
        let b = new_race_id();

        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
        assert_eq!(a.matches('-').count(), 4);
    }

    #[test]
    fn short_type_name_strips_module_path() {
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<u64>(), "u64");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec<alloc::string::String>");
    }
}
