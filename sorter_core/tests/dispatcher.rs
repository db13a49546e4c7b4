//! Sort dispatcher: FIFO order, refuse fallback and busy tracking.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use sorter_core::mocks::{GatedPositioner, RecordingSink};
use sorter_core::{BinMap, SortDispatcher, SorterError};
use sorter_traits::MonotonicClock;

fn bins() -> BinMap {
    BinMap::new(BTreeMap::from([
        ("resistor".to_string(), 400),
        ("diode".to_string(), 3_600),
        ("led".to_string(), 4_400),
        ("refuse".to_string(), 7_600),
    ]))
    .unwrap()
}

fn dispatcher(positioner: &Arc<GatedPositioner>, sink: &Arc<RecordingSink>) -> SortDispatcher {
    SortDispatcher::spawn(
        Arc::clone(positioner) as _,
        bins(),
        Arc::clone(sink) as _,
        Arc::new(MonotonicClock::new()),
    )
    .unwrap()
}

#[test]
fn entries_are_moved_in_fifo_order() {
    let positioner = Arc::new(GatedPositioner::new(false));
    let sink = Arc::new(RecordingSink::default());
    let d = dispatcher(&positioner, &sink);

    for label in ["diode", "resistor", "led", "diode"] {
        d.add(label).unwrap();
    }
    assert!(d.is_busy());
    assert_eq!(d.pending(), 4);

    positioner.release();
    assert!(d.wait_idle_timeout(Duration::from_secs(5)));
    assert_eq!(positioner.targets(), vec![3_600, 400, 4_400, 3_600]);
    assert!(sink.contains("position: 3600"));
}

#[test]
fn unknown_labels_go_to_refuse() {
    let positioner = Arc::new(GatedPositioner::new(true));
    let sink = Arc::new(RecordingSink::default());
    let d = dispatcher(&positioner, &sink);
    d.add("flux_capacitor").unwrap();
    d.wait_idle();
    assert_eq!(positioner.targets(), vec![7_600]);
}

#[test]
fn busy_until_the_last_move_finishes() {
    let positioner = Arc::new(GatedPositioner::new(false));
    let sink = Arc::new(RecordingSink::default());
    let d = dispatcher(&positioner, &sink);
    assert!(!d.is_busy());

    d.add("led").unwrap();
    // queued or moving, both count as busy
    assert!(d.is_busy());
    assert!(!d.wait_idle_timeout(Duration::from_millis(50)));

    positioner.release();
    d.wait_idle();
    assert!(!d.is_busy());
}

#[test]
fn add_after_shutdown_fails() {
    let positioner = Arc::new(GatedPositioner::new(true));
    let sink = Arc::new(RecordingSink::default());
    let d = dispatcher(&positioner, &sink);
    d.add("led").unwrap();
    d.shutdown();
    // queued work drains before the worker exits
    assert_eq!(positioner.targets(), vec![4_400]);
    assert_eq!(d.add("led").unwrap_err(), SorterError::Shutdown);
    assert!(!d.is_busy());
}
