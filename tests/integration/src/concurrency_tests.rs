//! Concurrency Tests - one sink, many delivering threads
//!
//! Event sources may call a sink from any thread of the multithreaded
//! apartment. These tests check that:
//! - concurrent deliveries all reach the listener
//! - handlers run on the calling thread, without serialization
//! - failures on one thread do not disturb the others

mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;

use futures::future::join_all;
use parking_lot::Mutex;

use automation::{ApartmentGuard, ApartmentType, DispId, Variant};
use dcom_events::{EventInterface, EventSink};

use common::*;

const COUNTER_EVENTS_IID: &str = "{5D6E7F80-9A1B-4C2D-8E3F-405162738495}";

/// Listener counting deliveries per thread
#[derive(Default)]
struct Counter {
    total: AtomicUsize,
    sum: AtomicUsize,
    concurrent: AtomicUsize,
    max_concurrent: AtomicUsize,
    threads: Mutex<HashSet<ThreadId>>,
}

impl Counter {
    fn on_count(&self, value: i32) {
        let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);
        self.threads.lock().insert(std::thread::current().id());

        self.sum.fetch_add(value as usize, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        std::thread::yield_now();

        self.concurrent.fetch_sub(1, Ordering::SeqCst);
    }
}

fn counter_sink(reporter: RecordingReporter) -> Arc<EventSink<Counter>> {
    let interface = EventInterface::builder("CounterEvents")
        .iid(COUNTER_EVENTS_IID)
        .callback(1, "on_count", |c: &Counter, (value,): (i32,)| c.on_count(value))
        .build();
    let sink = EventSink::builder(interface, Arc::new(Counter::default()))
        .reporter(reporter)
        .build()
        .unwrap();
    Arc::new(sink)
}

/// Fire `count` events from a fresh MTA thread
async fn fire_from_worker(sink: Arc<EventSink<Counter>>, start: i32, count: i32) {
    tokio::task::spawn_blocking(move || {
        let _apartment = ApartmentGuard::enter(ApartmentType::Mta).unwrap();
        let proxy = source_proxy(&*sink);
        for value in start..start + count {
            proxy.call_method(DispId(1), &[Variant::from(value)]).unwrap();
        }
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_delivery() {
    init_logging();
    let reporter = RecordingReporter::new();
    let sink = counter_sink(reporter.clone());

    const WORKERS: i32 = 8;
    const PER_WORKER: i32 = 250;

    let tasks: Vec<_> = (0..WORKERS)
        .map(|w| fire_from_worker(sink.clone(), w * PER_WORKER, PER_WORKER))
        .collect();
    join_all(tasks).await;

    let counter = sink.listener();
    let n = (WORKERS * PER_WORKER) as usize;
    assert_eq!(counter.total.load(Ordering::SeqCst), n);
    assert_eq!(counter.sum.load(Ordering::SeqCst), n * (n - 1) / 2);
    assert_eq!(reporter.count(), 0);

    tracing::info!(
        "delivered {} events on {} threads, max concurrency {}",
        n,
        counter.threads.lock().len(),
        counter.max_concurrent.load(Ordering::SeqCst)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failures_stay_on_their_thread() {
    init_logging();
    let reporter = RecordingReporter::new();
    let sink = counter_sink(reporter.clone());

    let good: Vec<_> = (0..4)
        .map(|w| fire_from_worker(sink.clone(), w * 100, 100))
        .collect();

    let bad_sink = sink.clone();
    let bad = tokio::task::spawn_blocking(move || {
        let _apartment = ApartmentGuard::enter(ApartmentType::Mta).unwrap();
        let proxy = source_proxy(&*bad_sink);
        for _ in 0..50 {
            // unknown DISPID and wrong arity
            proxy.call_method(DispId(2), &[]).unwrap();
            proxy
                .call_method(DispId(1), &[Variant::from(1i32), Variant::from(2i32)])
                .unwrap();
        }
    });

    let (_, bad) = tokio::join!(join_all(good), bad);
    bad.unwrap();

    assert_eq!(sink.listener().total.load(Ordering::SeqCst), 400);
    assert_eq!(reporter.count(), 100);
    assert!(reporter
        .reports()
        .iter()
        .all(|r| r.message.starts_with("No method found") || r.message.starts_with("Trying to invoke")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_handlers_run_on_calling_thread() {
    init_logging();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();

    let interface = EventInterface::builder("CounterEvents")
        .iid(COUNTER_EVENTS_IID)
        .callback(1, "on_count", move |_: &Counter, (_value,): (i32,)| {
            recorded.lock().push(std::thread::current().id());
        })
        .build();
    let sink = Arc::new(EventSink::new(interface, Arc::new(Counter::default())).unwrap());

    let callers: Vec<_> = (0..3)
        .map(|_| {
            let sink = sink.clone();
            tokio::task::spawn_blocking(move || {
                let _apartment = ApartmentGuard::enter(ApartmentType::Mta).unwrap();
                sink.dispatch(DispId(1), &mut [Variant::from(0i32)]);
                std::thread::current().id()
            })
        })
        .collect();

    let mut caller_ids: Vec<ThreadId> = join_all(callers)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    let mut handler_ids = seen.lock().clone();

    let key = |id: &ThreadId| format!("{:?}", id);
    caller_ids.sort_by_key(key);
    handler_ids.sort_by_key(key);
    assert_eq!(caller_ids, handler_ids);
}
