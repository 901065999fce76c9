//! Common test utilities for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use automation::{DispatchProxy, DispId, Guid};
use dcom_events::{EventInterface, EventSink, EventSinkError, ErrorReporter, SinkConfig};

/// IID of the clock event interface used across tests
pub const CLOCK_EVENTS_IID: &str = "{6E8F2C4A-1B3D-4F5E-9A7C-2D4E6F8A0B1C}";

pub const DISPID_TICK: DispId = DispId(1);
pub const DISPID_MOVE: DispId = DispId(2);
pub const DISPID_TRIPLE: DispId = DispId(3);
pub const DISPID_RESET: DispId = DispId(4);

/// Initialize test logging
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

/// One delivered event
#[derive(Clone, Debug, PartialEq)]
pub enum ClockEvent {
    Tick(i32),
    Move { y: i32, x: i32 },
    Triple(i32, i32, i32),
    Reset,
}

/// Listener that records every event it receives
#[derive(Default)]
pub struct ClockListener {
    events: Mutex<Vec<ClockEvent>>,
}

impl ClockListener {
    pub fn on_tick(&self, count: i32) {
        self.events.lock().push(ClockEvent::Tick(count));
    }

    pub fn on_move(&self, y: i32, x: i32) {
        self.events.lock().push(ClockEvent::Move { y, x });
    }

    pub fn on_triple(&self, a: i32, b: i32, c: i32) {
        self.events.lock().push(ClockEvent::Triple(a, b, c));
    }

    pub fn on_reset(&self) {
        self.events.lock().push(ClockEvent::Reset);
    }

    pub fn events(&self) -> Vec<ClockEvent> {
        self.events.lock().clone()
    }
}

/// The clock event interface
pub fn clock_interface() -> EventInterface<ClockListener> {
    EventInterface::builder("ClockEvents")
        .iid(CLOCK_EVENTS_IID)
        .callback(DISPID_TICK, "on_tick", |l: &ClockListener, (count,): (i32,)| {
            l.on_tick(count)
        })
        .callback(DISPID_MOVE, "on_move", |l: &ClockListener, (y, x): (i32, i32)| {
            l.on_move(y, x)
        })
        .callback(
            DISPID_TRIPLE,
            "on_triple",
            |l: &ClockListener, (a, b, c): (i32, i32, i32)| l.on_triple(a, b, c),
        )
        .callback(DISPID_RESET, "on_reset", |l: &ClockListener, (): ()| l.on_reset())
        .build()
}

pub fn clock_iid() -> Guid {
    Guid::parse(CLOCK_EVENTS_IID).unwrap()
}

/// A reported dispatch failure
#[derive(Clone, Debug)]
pub struct Report {
    pub message: String,
    pub cause: Option<String>,
}

/// Reporter that keeps every report
#[derive(Clone, Default)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<Report>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.reports.lock().len()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, message: &str, cause: Option<&EventSinkError>) {
        self.reports.lock().push(Report {
            message: message.to_string(),
            cause: cause.map(|c| c.to_string()),
        });
    }
}

/// Clock sink reporting into the returned recorder
pub fn clock_sink() -> (EventSink<ClockListener>, RecordingReporter) {
    clock_sink_with_config(SinkConfig::default())
}

pub fn clock_sink_with_config(config: SinkConfig) -> (EventSink<ClockListener>, RecordingReporter) {
    let reporter = RecordingReporter::new();
    let sink = EventSink::builder(clock_interface(), Arc::new(ClockListener::default()))
        .reporter(reporter.clone())
        .config(config)
        .build()
        .unwrap();
    (sink, reporter)
}

/// `IDispatch` proxy over a sink, as an event source would hold it
pub fn source_proxy<L: Send + Sync + 'static>(sink: &EventSink<L>) -> DispatchProxy {
    // SAFETY: the sink outlives every proxy created in tests.
    unsafe { DispatchProxy::from_borrowed(sink.as_raw()) }.unwrap()
}

/// Short delay to let interleaved work run
pub async fn short_delay() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}
