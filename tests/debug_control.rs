use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use mazeroute::{debug::DebugControl, settings::DebugSettings};

fn single_step(net_filter: &[&str]) -> DebugSettings {
    DebugSettings {
        single_step: true,
        net_filter: net_filter.iter().map(|net| net.to_string()).collect(),
        ..Default::default()
    }
}

#[test]
fn test_disabled_control_never_stops() {
    let control = DebugControl::new(DebugSettings::default());

    assert!(!control.is_paused());
    assert!(!control.check(1, "GND"));
    assert!(!control.check_message("Net #1, Trace #456"));
}

#[test]
fn test_filtered_out_net_passes() {
    let control = DebugControl::new(single_step(&["GND"]));
    assert!(control.is_paused());

    let start = Instant::now();
    assert!(!control.check(2, "VCC"));
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_filtered_in_net_blocks_until_resumed() {
    let control = Arc::new(DebugControl::new(single_step(&["GND"])));

    let checker = {
        let control = control.clone();
        thread::spawn(move || control.check(1, "GND"))
    };

    thread::sleep(Duration::from_millis(200));
    assert!(!checker.is_finished());

    control.resume();
    assert!(checker.join().unwrap());
    assert!(!control.is_paused());
}

#[test]
fn test_next_lets_one_check_through() {
    let control = Arc::new(DebugControl::new(single_step(&[])));

    control.next();
    assert!(control.check(1, "GND"));
    assert!(control.is_paused());

    let checker = {
        let control = control.clone();
        thread::spawn(move || control.check(1, "GND"))
    };

    thread::sleep(Duration::from_millis(200));
    assert!(!checker.is_finished());

    control.next();
    assert!(checker.join().unwrap());
    assert!(control.is_paused());
}

#[test]
fn test_net_references() {
    let control = DebugControl::new(DebugSettings {
        trace_insertion_delay_ms: 1,
        net_filter: vec!["Net #1".to_string()],
        ..Default::default()
    });

    assert!(control.is_net_permitted(Some(1), None));
    assert!(!control.is_net_permitted(Some(2), Some("VCC")));
    assert!(control.check_message("Net #1, Trace #456"));
    assert!(!control.check_message("Net #2, Trace #5"));
    assert!(control.check_message("pass 3 started"));
}
