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

mod config;

use crate::config::{ConfigError, MainSourceConfig, ScenarioConfig};
use clap::Parser;
use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;
use stream_race::{bridge, sources, SharedSource, SourceExt, StreamError};
use tracing::{info, warn};

#[derive(Parser)]
#[command()]
struct RaceArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

#[derive(Serialize, Debug)]
struct Summary {
    items: Vec<String>,
    outcome: &'static str,
    error: Option<String>,
}

/// Replays the configured items, sleeping before each one.
fn main_source(config: &MainSourceConfig) -> SharedSource<String> {
    let items = config.items.clone();
    let fail_with = config.fail_with.clone();

    sources::from_stream(move || {
        let tail = fail_with
            .clone()
            .map(|reason| Err(StreamError::upstream(reason)));
        futures::stream::iter(items.clone())
            .then(|item| async move {
                tokio::time::sleep(Duration::from_millis(item.delay_ms)).await;
                Ok(item.value)
            })
            .chain(futures::stream::iter(tail))
    })
    .into_shared()
}

#[tokio::main]
async fn main() -> Result<(), ConfigError> {
    let _ = tracing_subscriber::fmt::try_init();

    info!("Started stream-race-configurable");

    let args = RaceArgs::parse();
    let config = ScenarioConfig::load(&args.config)?;

    let main = main_source(&config.main);
    let raced = match config.fallback.clone() {
        Some(fallback) => main
            .timeout_after_or(config.timeout, sources::iter(fallback.items).into_shared())
            .into_shared(),
        None => main.timeout_after(config.timeout).into_shared(),
    };
    let raced = if config.first_only {
        raced.next().into_shared()
    } else {
        raced
    };

    let mut summary = Summary {
        items: Vec::new(),
        outcome: "complete",
        error: None,
    };
    let mut signals = bridge::into_stream(&raced);
    while let Some(signal) = signals.next().await {
        match signal {
            Ok(item) => {
                info!(item = item.as_str(), "received item");
                summary.items.push(item);
            }
            Err(error) => {
                warn!(err = %error, kind = error.kind(), "race failed");
                summary.outcome = "error";
                summary.error = Some(error.to_string());
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
