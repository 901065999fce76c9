//! Marshaling Tests - native argument cells to typed handler parameters
//!
//! Every test fires events through the native vtable with hand-built
//! VARIANT cells and checks what the listener receives:
//! - scalar coercion and range checks
//! - BSTR, byte SAFEARRAY and by-reference cells
//! - out-parameters written back through `NativeVariant`
//! - object references wrapped as `DispatchProxy` or left as `ComPtr`

mod common;

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use automation::{
    ApartmentGuard, ApartmentType, AutomationError, Bstr, ComPtr, DispId, DispatchProxy, NativeVariant,
    SafeByteArray, Value, VarType, Variant,
};
use dcom_events::{EventInterface, EventSink, SinkConfig};

use common::*;

/// Listener recording a description of each event
#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, entry: String) {
        self.seen.lock().push(entry);
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

const DOCUMENT_EVENTS_IID: &str = "{A0B1C2D3-E4F5-4A6B-8C7D-9E0F1A2B3C4D}";

fn document_interface() -> EventInterface<Recorder> {
    EventInterface::builder("DocumentEvents")
        .iid(DOCUMENT_EVENTS_IID)
        .callback(1, "on_title", |r: &Recorder, (title, saved): (String, bool)| {
            r.push(format!("title {} {}", title, saved));
        })
        .callback(2, "on_progress", |r: &Recorder, (done, total): (u8, f64)| {
            r.push(format!("progress {} {}", done, total));
        })
        .callback(3, "on_optional", |r: &Recorder, (page,): (Option<i32>,)| {
            r.push(format!("optional {:?}", page));
        })
        .callback(4, "on_payload", |r: &Recorder, (payload,): (Bytes,)| {
            r.push(format!("payload {:?}", &payload[..]));
        })
        .callback(5, "on_query", |r: &Recorder, (id, answer): (i32, NativeVariant)| {
            r.push(format!("query {}", id));
            answer.write(Value::I32(id * 2))
        })
        .callback(6, "on_any", |r: &Recorder, (value,): (Value,)| {
            r.push(format!("any {} {}", value.type_name(), value));
        })
        .callback(7, "on_source", |r: &Recorder, (source,): (DispatchProxy,)| {
            r.push("source".to_string());
            source.call_method(DISPID_TICK, &[Variant::from(11i32)])?;
            Ok::<(), automation::AutomationError>(())
        })
        .callback(8, "on_object", |r: &Recorder, (object,): (ComPtr,)| {
            r.push(format!("object {}", !object.as_raw().is_null()));
        })
        .build()
}

fn document_sink(config: SinkConfig) -> (EventSink<Recorder>, RecordingReporter) {
    let reporter = RecordingReporter::new();
    let sink = EventSink::builder(document_interface(), Arc::new(Recorder::default()))
        .reporter(reporter.clone())
        .config(config)
        .build()
        .unwrap();
    (sink, reporter)
}

#[test]
fn test_string_and_bool() {
    init_logging();
    let _apartment = ApartmentGuard::enter(ApartmentType::Sta).unwrap();
    let (sink, reporter) = document_sink(SinkConfig::default());
    let proxy = source_proxy(&sink);
    let title = Bstr::new("Quarterly report");

    proxy
        .call_method(DispId(1), &[Variant::from_bstr(&title), Variant::from(true)])
        .unwrap();

    assert_eq!(sink.listener().seen(), vec!["title Quarterly report true"]);
    assert_eq!(reporter.count(), 0);
}

#[test]
fn test_numeric_coercion() {
    init_logging();
    let _apartment = ApartmentGuard::enter(ApartmentType::Sta).unwrap();
    let (sink, reporter) = document_sink(SinkConfig::default());
    let proxy = source_proxy(&sink);

    // i16 -> u8, f32 -> f64
    proxy
        .call_method(DispId(2), &[Variant::from(42i16), Variant::from(100.5f32)])
        .unwrap();
    // 300 does not fit u8
    proxy
        .call_method(DispId(2), &[Variant::from(300i32), Variant::from(1.0f64)])
        .unwrap();

    assert_eq!(sink.listener().seen(), vec!["progress 42 100.5"]);
    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].message,
        "Failed to invoke method DocumentEvents::on_progress(u8, f64) supplied: [f64]"
    );
    assert!(reports[0].cause.as_deref().unwrap().contains("overflow"));
}

#[test]
fn test_optional_parameter() {
    init_logging();
    let _apartment = ApartmentGuard::enter(ApartmentType::Sta).unwrap();
    let (sink, _reporter) = document_sink(SinkConfig::default());
    let proxy = source_proxy(&sink);

    proxy.call_method(DispId(3), &[Variant::empty()]).unwrap();
    proxy.call_method(DispId(3), &[Variant::null()]).unwrap();
    proxy.call_method(DispId(3), &[Variant::from(9i32)]).unwrap();

    assert_eq!(
        sink.listener().seen(),
        vec!["optional None", "optional None", "optional Some(9)"]
    );
}

#[test]
fn test_byte_array() {
    init_logging();
    let _apartment = ApartmentGuard::enter(ApartmentType::Sta).unwrap();
    let (sink, _reporter) = document_sink(SinkConfig::default());
    let proxy = source_proxy(&sink);
    let array = SafeByteArray::new(Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]));

    proxy
        .call_method(DispId(4), &[Variant::from_safearray(VarType::UI1, array.as_ptr())])
        .unwrap();

    assert_eq!(sink.listener().seen(), vec!["payload [222, 173, 190, 239]"]);
}

#[test]
fn test_by_ref_input_and_output() {
    init_logging();
    let _apartment = ApartmentGuard::enter(ApartmentType::Sta).unwrap();
    let (sink, reporter) = document_sink(SinkConfig::default());
    let proxy = source_proxy(&sink);

    let mut id = 21i32;
    let mut answer = 0i32;
    proxy
        .call_method(
            DispId(5),
            &[
                Variant::by_ref(VarType::I4, &mut id),
                Variant::by_ref(VarType::I4, &mut answer),
            ],
        )
        .unwrap();

    assert_eq!(sink.listener().seen(), vec!["query 21"]);
    assert_eq!(answer, 42);
    assert_eq!(reporter.count(), 0);
}

thread_local! {
    static KEPT_CELL: std::cell::RefCell<Option<NativeVariant>> = const { std::cell::RefCell::new(None) };
}

#[test]
fn test_native_cell_kept_past_callback_is_expired() {
    init_logging();
    let _apartment = ApartmentGuard::enter(ApartmentType::Sta).unwrap();
    let interface = EventInterface::builder("DocumentEvents")
        .iid(DOCUMENT_EVENTS_IID)
        .callback(9, "on_keep", |r: &Recorder, (cell,): (NativeVariant,)| {
            r.push(format!("keep {}", cell.vt().unwrap()));
            KEPT_CELL.with(|kept| *kept.borrow_mut() = Some(cell));
        })
        .build();
    let reporter = RecordingReporter::new();
    let sink = EventSink::builder(interface, Arc::new(Recorder::default()))
        .reporter(reporter.clone())
        .build()
        .unwrap();

    let mut args = vec![Variant::from(7i32)];
    sink.dispatch(DispId(9), &mut args);
    drop(args);
    let _reused = vec![Variant::from(123_456i32)];

    let kept = KEPT_CELL.with(|kept| kept.borrow_mut().take()).unwrap();
    assert!(matches!(kept.get(), Err(AutomationError::CellExpired)));
    assert!(matches!(kept.write(Value::I32(1)), Err(AutomationError::CellExpired)));
    assert_eq!(sink.listener().seen(), vec!["keep VT_I4"]);
    assert_eq!(reporter.count(), 0);
}

#[test]
fn test_out_parameter_on_by_value_cell_is_reported() {
    init_logging();
    let _apartment = ApartmentGuard::enter(ApartmentType::Sta).unwrap();
    let (sink, reporter) = document_sink(SinkConfig::default());
    let proxy = source_proxy(&sink);

    proxy
        .call_method(DispId(5), &[Variant::from(1i32), Variant::from(0i32)])
        .unwrap();

    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].message,
        "Failed to invoke method DocumentEvents::on_query(i32, NativeVariant) supplied: [i32, NativeVariant]"
    );
}

#[test]
fn test_natural_values() {
    init_logging();
    let _apartment = ApartmentGuard::enter(ApartmentType::Sta).unwrap();
    let (sink, _reporter) = document_sink(SinkConfig::default());
    let proxy = source_proxy(&sink);

    proxy.call_method(DispId(6), &[Variant::from_currency(12_345)]).unwrap();
    proxy.call_method(DispId(6), &[Variant::from(-3i8)]).unwrap();
    proxy.call_method(DispId(6), &[Variant::null()]).unwrap();

    assert_eq!(
        sink.listener().seen(),
        vec!["any Currency 1.2345", "any i8 -3", "any NULL Null"]
    );
}

#[test]
fn test_dispatch_argument_is_wrapped() {
    init_logging();
    let _apartment = ApartmentGuard::enter(ApartmentType::Sta).unwrap();
    let (sink, reporter) = document_sink(SinkConfig::default());
    let (clock, _clock_reporter) = clock_sink();
    let proxy = source_proxy(&sink);

    proxy
        .call_method(DispId(7), &[Variant::from_dispatch(clock.as_raw())])
        .unwrap();

    assert_eq!(sink.listener().seen(), vec!["source"]);
    assert_eq!(clock.listener().events(), vec![ClockEvent::Tick(11)]);
    assert_eq!(reporter.count(), 0);
}

#[test]
fn test_unwrapped_object_reference() {
    init_logging();
    let _apartment = ApartmentGuard::enter(ApartmentType::Sta).unwrap();
    let (sink, reporter) =
        document_sink(SinkConfig::new().with_wrap_object_references(false));
    let (clock, _clock_reporter) = clock_sink();
    let proxy = source_proxy(&sink);

    proxy
        .call_method(DispId(8), &[Variant::from_dispatch(clock.as_raw())])
        .unwrap();
    // a raw reference still converts to a proxy through QueryInterface
    proxy
        .call_method(DispId(7), &[Variant::from_dispatch(clock.as_raw())])
        .unwrap();

    assert_eq!(sink.listener().seen(), vec!["object true", "source"]);
    assert_eq!(clock.listener().events(), vec![ClockEvent::Tick(11)]);
    assert_eq!(reporter.count(), 0);
}

#[test]
fn test_type_mismatch_names_runtime_types() {
    init_logging();
    let _apartment = ApartmentGuard::enter(ApartmentType::Sta).unwrap();
    let (sink, reporter) = document_sink(SinkConfig::default());
    let proxy = source_proxy(&sink);

    // null title: converts, but cannot become a String
    proxy
        .call_method(DispId(1), &[Variant::null(), Variant::from(false)])
        .unwrap();

    assert!(sink.listener().seen().is_empty());
    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].message,
        "Failed to invoke method DocumentEvents::on_title(String, bool) supplied: [NULL, bool]"
    );
}
