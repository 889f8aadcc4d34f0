use mazeroute::rules::{ClearanceError, ClearanceMatrix};

#[test]
fn test_default_instance() {
    let matrix = ClearanceMatrix::default_instance(2, 100);

    assert_eq!(matrix.class_count(), 2);
    assert_eq!(matrix.class_no("default"), Some(1));
    assert_eq!(matrix.value(1, 1, 0), 100);
    assert_eq!(matrix.value(1, 1, 1), 100);
    assert_eq!(matrix.value(0, 1, 0), 0);
}

#[test]
fn test_value_is_symmetric() {
    let mut matrix = ClearanceMatrix::new(
        vec!["null".to_string(), "signal".to_string(), "power".to_string()],
        2,
    );

    matrix.set_value(1, 2, 0, 300).unwrap();

    assert_eq!(matrix.value(1, 2, 0), 300);
    assert_eq!(matrix.value(2, 1, 0), 300);
    assert_eq!(matrix.value(2, 1, 1), 0);
    assert!(matrix.is_layer_dependent(1, 2));
}

#[test]
fn test_values_are_even_and_not_negative() {
    let mut matrix = ClearanceMatrix::default_instance(1, 101);
    assert_eq!(matrix.value(1, 1, 0), 102);
    assert_eq!(matrix.clearance_compensation_value(1, 0), 51);

    matrix.set_value(1, 1, 0, -5).unwrap();
    assert_eq!(matrix.value(1, 1, 0), 0);

    matrix.set_value(1, 1, 0, i64::MAX).unwrap();
    let value = matrix.value(1, 1, 0);
    assert_eq!(value % 2, 0);
    assert!(value <= i32::MAX as i64);
}

#[test]
fn test_max_value() {
    let mut matrix = ClearanceMatrix::new(
        vec!["null".to_string(), "signal".to_string(), "power".to_string()],
        2,
    );

    matrix.set_value_on_all_layers(1, 1, 100).unwrap();
    matrix.set_value(1, 2, 1, 400).unwrap();

    assert_eq!(matrix.max_value(1), 400);
    assert_eq!(matrix.max_value(2), 400);
    assert_eq!(matrix.max_value_on_layer(1, 0), 100);

    matrix.set_value(1, 2, 1, 0).unwrap();
    assert_eq!(matrix.max_value(1), 400);

    matrix.reset_max_values();
    assert_eq!(matrix.max_value(1), 100);
    assert_eq!(matrix.max_value(2), 0);
}

#[test]
fn test_out_of_range() {
    let mut matrix = ClearanceMatrix::default_instance(2, 100);

    assert_eq!(
        matrix.try_value(5, 1, 0),
        Err(ClearanceError::ClassOutOfRange {
            class: 5,
            class_count: 2
        })
    );
    assert_eq!(
        matrix.set_value(1, 1, 2, 100),
        Err(ClearanceError::LayerOutOfRange {
            layer: 2,
            layer_count: 2
        })
    );
}

#[test]
fn test_append_class() {
    let mut matrix = ClearanceMatrix::default_instance(2, 100);

    assert!(matrix.append_class("power"));
    assert!(!matrix.append_class("power"));

    assert_eq!(matrix.class_count(), 3);
    assert_eq!(matrix.class_name(2), Some("power"));
    assert_eq!(matrix.value(1, 1, 1), 100);
    assert_eq!(matrix.value(2, 1, 0), 0);

    matrix.set_value(2, 1, 0, 250).unwrap();
    assert_eq!(matrix.value(1, 2, 0), 250);
}
