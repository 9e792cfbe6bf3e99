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

use futures::StreamExt;
use integration_test_utils::{init_logging, ManualSource, RecordedSignal, RecordingSink};
use std::sync::Arc;
use std::time::Duration;
use stream_race::{bridge, sources, Source, SourceExt, StreamError, TimeoutConfig};

#[test]
fn first_item_cancels_upstream_and_completes() {
    init_logging();
    let main = Arc::new(ManualSource::<&'static str>::new());
    let sink = Arc::new(RecordingSink::<&'static str>::with_request(1));

    main.clone().next().subscribe(sink.clone());
    assert_eq!(main.subscription().requests(), vec![u64::MAX]);

    main.emit("first");
    main.emit("second");
    main.complete();

    assert_eq!(
        sink.signals(),
        vec![RecordedSignal::Next("first"), RecordedSignal::Complete]
    );
    assert_eq!(main.subscription().cancel_count(), 1);
    assert_eq!(sink.signals_after_terminal(), 0);
}

#[test]
fn nothing_is_requested_before_downstream_asks() {
    let main = Arc::new(ManualSource::<u8>::new());
    let sink = Arc::new(RecordingSink::<u8>::new());

    main.clone().next().subscribe(sink.clone());
    assert!(main.subscription().requests().is_empty());

    sink.request(3);
    sink.request(3);
    assert_eq!(main.subscription().requests(), vec![u64::MAX]);
}

#[test]
fn zero_request_fails_next() {
    let main = Arc::new(ManualSource::<u8>::new());
    let sink = Arc::new(RecordingSink::<u8>::new());

    main.clone().next().subscribe(sink.clone());
    sink.request(0);

    assert!(matches!(
        sink.error(),
        Some(StreamError::ProtocolViolation(_))
    ));
    assert!(main.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn next_of_a_timed_out_race_takes_the_fallback_item() {
    init_logging();
    let raced = sources::never().timeout_after_or(
        TimeoutConfig::uniform(Duration::from_millis(25)),
        sources::iter(["fallback", "unused"]).into_shared(),
    );

    let items: Vec<_> = bridge::into_stream(&raced.next()).collect().await;

    assert_eq!(items, vec![Ok("fallback")]);
}
