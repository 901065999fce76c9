//! Clock Events Demo
//!
//! Builds an event sink for a small clock event interface and plays the role
//! of the event source: it holds the sink as a plain `IDispatch*` and fires
//! events through the native vtable, exactly as a COM connection point would.
//!
//! USAGE:
//!   clock-events [OPTIONS]
//!
//! EXAMPLES:
//!   clock-events                          # 5 ticks in an MTA
//!   clock-events --ticks 20 --interval-ms 100
//!   clock-events --apartment sta          # deliver from a single-threaded apartment
//!   clock-events --stray 3                # also fire 3 events nobody listens to
//!   RUST_LOG=dcom_events=trace clock-events

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use automation::{ApartmentGuard, ApartmentType, Bstr, DispatchProxy, DispId, Variant};
use clap::{Parser, ValueEnum};
use dcom_events::{EventInterface, EventSink, EventSinkError, SinkConfig};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// `{B7E1C3A5-2F4D-4B6E-9C8A-1D3F5E7A9B2C}`
const CLOCK_EVENTS_IID: &str = "B7E1C3A5-2F4D-4B6E-9C8A-1D3F5E7A9B2C";

const DISPID_TICK: DispId = DispId(1);
const DISPID_ALARM: DispId = DispId(2);
const DISPID_MOVED: DispId = DispId(3);

/// Apartment the source delivers from
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Apartment {
    /// Multi-threaded apartment (default)
    Mta,
    /// Single-threaded apartment
    Sta,
}

impl From<Apartment> for ApartmentType {
    fn from(apartment: Apartment) -> Self {
        match apartment {
            Apartment::Mta => ApartmentType::Mta,
            Apartment::Sta => ApartmentType::Sta,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "clock-events")]
#[command(version)]
#[command(about = "Fire clock events at a COM event sink through its IDispatch vtable")]
struct Args {
    /// Number of tick events to fire
    #[arg(short, long, default_value_t = 5)]
    ticks: u32,

    /// Delay between ticks in milliseconds
    #[arg(long, default_value_t = 250)]
    interval_ms: u64,

    /// Fire the alarm every N ticks (0 disables it)
    #[arg(long, default_value_t = 3)]
    alarm_every: u32,

    /// Number of events to fire with a DISPID the listener does not handle
    #[arg(long, default_value_t = 0)]
    stray: u32,

    /// Drop unhandled events silently instead of reporting them
    #[arg(long)]
    quiet_unknown: bool,

    /// COM apartment to deliver from
    #[arg(long, value_enum, default_value = "mta")]
    apartment: Apartment,
}

/// The listener: what an application would implement
#[derive(Default)]
struct ClockDisplay {
    ticks: AtomicU32,
}

impl ClockDisplay {
    fn on_tick(&self, count: i32) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        info!("tick #{}", count);
    }

    fn on_alarm(&self, label: String, snooze: Option<bool>) -> Result<(), String> {
        if label.is_empty() {
            return Err("alarm without a label".to_string());
        }
        info!("alarm '{}' (snooze: {})", label, snooze.unwrap_or(false));
        Ok(())
    }

    fn on_moved(&self, y: i32, x: i32) {
        info!("hands moved to ({}, {})", y, x);
    }
}

fn clock_interface() -> EventInterface<ClockDisplay> {
    EventInterface::builder("ClockEvents")
        .iid(CLOCK_EVENTS_IID)
        .callback(DISPID_TICK, "on_tick", |c: &ClockDisplay, (count,): (i32,)| {
            c.on_tick(count)
        })
        .callback(
            DISPID_ALARM,
            "on_alarm",
            |c: &ClockDisplay, (label, snooze): (String, Option<bool>)| c.on_alarm(label, snooze),
        )
        .callback(DISPID_MOVED, "on_moved", |c: &ClockDisplay, (y, x): (i32, i32)| {
            c.on_moved(y, x)
        })
        .build()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let _apartment = ApartmentGuard::enter(args.apartment.into())?;

    let sink = EventSink::builder(clock_interface(), Arc::new(ClockDisplay::default()))
        .config(SinkConfig::new().with_report_unknown_dispids(!args.quiet_unknown))
        .reporter(|message: &str, cause: Option<&EventSinkError>| match cause {
            Some(cause) => warn!("event not delivered: {} ({})", message, cause),
            None => warn!("event not delivered: {}", message),
        })
        .build()?;

    info!("Event sink for {} ready", sink.interface_name());
    info!("Interface ID: {}", sink.interface_id());
    info!("Handled DISPIDs: {:?}", sink.dispids());

    // The source only ever sees the raw interface pointer
    // SAFETY: the sink outlives the proxy.
    let source = unsafe { DispatchProxy::from_borrowed(sink.as_raw()) }
        .ok_or("event sink returned a null interface pointer")?;

    for tick in 1..=args.ticks {
        source.call_method(DISPID_TICK, &[Variant::from(tick as i32)])?;

        if args.alarm_every > 0 && tick % args.alarm_every == 0 {
            let label = Bstr::new(&format!("alarm {}", tick / args.alarm_every));
            source.call_method(DISPID_ALARM, &[Variant::from_bstr(&label), Variant::null()])?;
        }

        let minutes = (tick * 6 % 60) as i32;
        source.call_method(DISPID_MOVED, &[Variant::from(minutes / 5), Variant::from(minutes)])?;

        thread::sleep(Duration::from_millis(args.interval_ms));
    }

    for stray in 0..args.stray {
        source.call_method(DispId(100 + stray as i32), &[])?;
    }

    // An empty label makes the listener fail; the source still sees S_OK
    let empty = Bstr::new("");
    source.call_method(DISPID_ALARM, &[Variant::from_bstr(&empty), Variant::from(true)])?;

    info!(
        "Delivered {} ticks",
        sink.listener().ticks.load(Ordering::Relaxed)
    );
    Ok(())
}
