use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use stream_race::{
    sources, DeadlineResult, EmptySubscription, SerializedSink, SharedSource, SharedSubscription,
    Sink, Source, StreamError, SubscriptionArbiter, Timeout, UNBOUNDED,
};

const SIGNALS_PER_ITERATION: u64 = 1_000;

#[derive(Default)]
struct CountingSink {
    items: AtomicU64,
}

impl Sink<u64> for CountingSink {
    fn on_subscribe(&self, subscription: SharedSubscription) {
        subscription.request(UNBOUNDED);
    }

    fn on_next(&self, value: u64) {
        self.items.fetch_add(black_box(value) & 1, Ordering::Relaxed);
    }

    fn on_error(&self, _error: StreamError) {}

    fn on_complete(&self) {}
}

fn race_criterion(c: &mut Criterion) {
    let mut serialized_group = c.benchmark_group("serialized_sink");
    serialized_group.bench_function("uncontended_on_next", |b| {
        let sink = SerializedSink::<u64>::new(Arc::new(CountingSink::default()));
        b.iter(|| {
            for value in 0..SIGNALS_PER_ITERATION {
                sink.on_next(value);
            }
        });
    });
    serialized_group.finish();

    let mut arbiter_group = c.benchmark_group("subscription_arbiter");
    arbiter_group.bench_function("request_produce", |b| {
        let arbiter = SubscriptionArbiter::new();
        arbiter.set(Arc::new(EmptySubscription));
        b.iter(|| {
            for _ in 0..SIGNALS_PER_ITERATION {
                arbiter.request(1);
                arbiter.produced(1);
            }
            black_box(arbiter.outstanding());
        });
    });
    arbiter_group.bench_function("swap", |b| {
        let arbiter = SubscriptionArbiter::new();
        arbiter.request(64);
        b.iter(|| arbiter.set(Arc::new(EmptySubscription)));
    });
    arbiter_group.finish();

    let mut timeout_group = c.benchmark_group("timeout_race");
    timeout_group.bench_function("items_with_rearmed_deadlines", |b| {
        b.iter_batched(
            || {
                let items: Vec<u64> = (0..SIGNALS_PER_ITERATION).collect();
                let main: SharedSource<u64> = Arc::new(sources::iter(items));
                Timeout::new(
                    main,
                    Arc::new(sources::never()) as SharedSource<()>,
                    |_item: &u64| -> DeadlineResult<()> {
                        Ok(Some(Arc::new(sources::never()) as SharedSource<()>))
                    },
                )
            },
            |timeout| {
                let sink = Arc::new(CountingSink::default());
                timeout.subscribe(sink.clone());
                black_box(sink.items.load(Ordering::Relaxed));
            },
            BatchSize::SmallInput,
        );
    });
    timeout_group.finish();
}

criterion_group!(benches, race_criterion);
criterion_main!(benches);
