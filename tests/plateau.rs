use mazeroute::{autoroute::plateau::PlateauDetector, settings::PlateauSettings};

#[test]
fn test_stops_when_nothing_changes() {
    let mut detector = PlateauDetector::new(PlateauSettings::default());

    // The window grows by 20 each time it fills with zeros; it passes 200 on its tenth
    // growth, after 10 * 21 passes.
    for pass_no in 1..210 {
        assert!(!detector.record(pass_no, 0), "stopped at pass {}", pass_no);
    }

    assert_eq!(detector.window(), 200);
    assert!(detector.record(210, 0));
    assert!(detector.is_interrupted());
}

#[test]
fn test_progress_resets_window() {
    let mut detector = PlateauDetector::new(PlateauSettings::default());

    for pass_no in 1..=21 {
        detector.record(pass_no, 0);
    }

    assert_eq!(detector.window(), 40);

    for pass_no in 22..=41 {
        detector.record(pass_no, 100);
    }

    assert_eq!(detector.window(), 40);
    detector.record(42, 100);

    assert_eq!(detector.window(), 20);
    assert!(detector.average() >= 20.0);
    assert!(!detector.is_interrupted());
}

#[test]
fn test_reset() {
    let mut detector = PlateauDetector::new(PlateauSettings {
        window: 2,
        window_growth: 1,
        window_ceiling: 2,
        threshold: 5.0,
    });

    assert!(!detector.record(1, 0));
    assert!(!detector.record(2, 0));
    assert!(detector.record(3, 0));

    detector.reset();
    assert!(!detector.is_interrupted());
    assert_eq!(detector.window(), 2);
    assert_eq!(detector.average(), 0.0);
}
