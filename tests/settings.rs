mod common;

use mazeroute::{
    board::{Layer, RoutingBoard},
    geometry::IntBox,
    rules::{BoardRules, ClearanceMatrix, Nets},
    settings::{PreferredDirection, RouterSettings, TestLevel},
};

#[test]
fn test_partial_json() {
    let settings = RouterSettings::from_json_str(
        r#"{
            "stop_pass_no": 7,
            "vias_allowed": false,
            "plateau": { "window": 5 },
            "debug": { "net_filter": ["GND"], "test_level": "AllDebugging" }
        }"#,
    )
    .unwrap();

    assert_eq!(settings.stop_pass_no, 7);
    assert!(!settings.vias_allowed);
    assert_eq!(settings.plateau.window, 5);
    assert_eq!(settings.plateau.window_ceiling, 200);
    assert_eq!(settings.debug.net_filter, vec!["GND".to_string()]);
    assert_eq!(settings.debug.test_level, TestLevel::AllDebugging);
    assert_eq!(settings.start_ripup_costs, RouterSettings::default().start_ripup_costs);
}

#[test]
fn test_bad_json() {
    assert!(RouterSettings::from_json_str("{ \"stop_pass_no\": \"many\" }").is_err());
    assert!(RouterSettings::from_json_file("/nonexistent/settings.json").is_err());
}

#[test]
fn test_time_limit_doubles() {
    let settings = RouterSettings {
        connection_time_limit_ms: 100,
        ..Default::default()
    };

    assert_eq!(settings.connection_time_limit_ms(1), 100);
    assert_eq!(settings.connection_time_limit_ms(2), 200);
    assert_eq!(settings.connection_time_limit_ms(4), 800);
    assert_eq!(settings.connection_time_limit_ms(1000), 100 << 32);
}

#[test]
fn test_layer_directions_alternate() {
    let layers = vec![
        Layer {
            name: "F.Cu".to_string(),
            is_signal: true,
        },
        Layer {
            name: "In1.Cu".to_string(),
            is_signal: true,
        },
        Layer {
            name: "In2.Cu".to_string(),
            is_signal: false,
        },
        Layer {
            name: "B.Cu".to_string(),
            is_signal: true,
        },
    ];
    let rules = BoardRules::new(
        ClearanceMatrix::default_instance(4, 100),
        Nets::new(),
        vec![common::net_class()],
    );
    let board = RoutingBoard::new(IntBox::from_coords(0, 0, 20000, 10000), layers, rules);

    let settings = RouterSettings::for_board(&board);

    assert_eq!(settings.layers.len(), 4);
    assert_eq!(settings.layers[0].preferred_direction, PreferredDirection::Horizontal);
    assert_eq!(settings.layers[1].preferred_direction, PreferredDirection::Vertical);
    assert!(!settings.layers[2].active);
    assert_eq!(settings.layers[3].preferred_direction, PreferredDirection::Horizontal);

    // Three signal layers make the outer ones more expensive.
    assert!(settings.layers[0].preferred_cost > settings.layers[1].preferred_cost);
    assert!(settings.layers[3].preferred_cost > settings.layers[1].preferred_cost);
    assert!(settings.layers[1].against_preferred_cost > settings.layers[1].preferred_cost);
}

#[test]
fn test_unlisted_layers_use_defaults() {
    let settings = RouterSettings::default();

    assert!(settings.is_layer_active(3));
    assert_eq!(settings.trace_costs(2).len(), 2);
}
