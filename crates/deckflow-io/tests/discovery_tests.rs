use deckflow_core::{
    ConnectorMapping, KeyingModes, LinkModes, ManagerSettings, SimulatedCard, VideoDeviceType,
};
use deckflow_io::decklink::sim::SimulatedSdk;
use deckflow_io::decklink::{
    CardDiscovery, CompatibilityRefresh, DiscoveryEvent, DETECTION_ERROR_CARD,
};
use deckflow_io::IoError;
use std::sync::Arc;

fn card(name: &str, logical_devices: usize) -> SimulatedCard {
    SimulatedCard {
        name: name.to_string(),
        logical_devices,
    }
}

fn drain(discovery: &mut CardDiscovery, settings: &ManagerSettings) {
    for event in discovery.poll_events() {
        match event {
            DiscoveryEvent::Arrived { name, types } => {
                discovery.handle_arrival(&name, types, &settings.connector_mappings);
            }
            DiscoveryEvent::Removed { name, types } => {
                discovery.handle_removal(&name, types, &settings.connector_mappings);
            }
        }
    }
}

fn start(sdk: &Arc<SimulatedSdk>, settings: &mut ManagerSettings) -> CardDiscovery {
    let mut discovery = CardDiscovery::new(sdk.clone());
    discovery.initialize(settings);
    drain(&mut discovery, settings);
    discovery
}

#[test]
fn test_placeholder_card_without_hardware() {
    let sdk = Arc::new(SimulatedSdk::new(&[]));
    let mut settings = ManagerSettings {
        card_index: 3,
        ..Default::default()
    };

    let mut discovery = CardDiscovery::new(sdk);
    let found = discovery.initialize(&mut settings);

    assert_eq!(found, 0);
    assert!(discovery.no_card_detected());
    assert_eq!(discovery.cards().len(), 1);
    assert_eq!(discovery.cards()[0].name, DETECTION_ERROR_CARD);
    assert_eq!(settings.card_index, 0);
    assert_eq!(settings.connector_mappings.len(), 1);
    assert!(discovery.poll_events().is_empty());
}

#[test]
fn test_arrivals_build_names_and_capabilities() {
    let sdk = Arc::new(SimulatedSdk::new(&[card("DeckLink Quad", 4)]));
    let mut settings = ManagerSettings::default();
    let discovery = start(&sdk, &mut settings);

    assert!(!discovery.no_card_detected());
    assert_eq!(discovery.api_version(), Some("12.9 (simulated)"));
    assert_eq!(
        discovery.device_names(VideoDeviceType::Output),
        &[
            "DeckLink Quad (1)",
            "DeckLink Quad (2)",
            "DeckLink Quad (3)",
            "DeckLink Quad (4)"
        ]
    );
    assert_eq!(discovery.device_names(VideoDeviceType::Input).len(), 4);

    let quad = discovery.card(0).unwrap();
    assert_eq!(quad.compatible_mappings, ConnectorMapping::ALL.to_vec());
    assert_eq!(quad.used_input_devices, 4);
    assert_eq!(quad.used_output_devices, 4);
    assert_eq!(quad.compatible_link_modes, LinkModes::SINGLE);
    assert_eq!(quad.compatible_keying_modes, KeyingModes::empty());
    assert_eq!(
        discovery.compatibility_refresh(),
        CompatibilityRefresh::Consumed
    );
}

#[test]
fn test_first_scan_caches_flags_for_selected_mapping() {
    let sdk = Arc::new(SimulatedSdk::new(&[card("DeckLink Quad", 4)]));

    // single link is always offered, so the four device mapping is judged
    let mut four = ManagerSettings::default();
    let discovery = start(&sdk, &mut four);
    let quad = discovery.card(0).unwrap();
    assert_eq!(quad.compatible_link_modes, LinkModes::SINGLE);
    assert!(!quad.is_link_mode_compatible);
    assert!(!quad.is_keying_compatible);
    assert_eq!(discovery.is_keying_and_link_mode_supported(0), (false, false));

    let sdk = Arc::new(SimulatedSdk::new(&[card("DeckLink Quad", 4)]));
    let mut one = ManagerSettings {
        connector_mappings: vec![ConnectorMapping::OneSubDeviceFullDuplex],
        ..Default::default()
    };
    let discovery = start(&sdk, &mut one);
    let quad = discovery.card(0).unwrap();
    assert_eq!(quad.connector_mapping, ConnectorMapping::OneSubDeviceFullDuplex);
    assert!(quad.is_link_mode_compatible);
    assert!(quad.is_keying_compatible);
    assert_eq!(discovery.device_names(VideoDeviceType::Output).len(), 1);
}

#[test]
fn test_switch_recomputes_flags() {
    let sdk = Arc::new(SimulatedSdk::new(&[card("DeckLink Quad", 4)]));
    let mut settings = ManagerSettings::default();
    let mut discovery = start(&sdk, &mut settings);

    let changed = discovery
        .changed_devices_duplex_mode(ConnectorMapping::TwoSubDevicesFullDuplex, 0)
        .unwrap();
    assert!(changed);

    let quad = discovery.card(0).unwrap();
    assert_eq!(quad.connector_mapping, ConnectorMapping::TwoSubDevicesFullDuplex);
    assert!(!quad.is_link_mode_compatible);
    assert!(quad.is_keying_compatible);
    assert_eq!(quad.used_input_devices, 0);
    assert_eq!(
        sdk.hardware_mapping(0),
        Some(ConnectorMapping::TwoSubDevicesFullDuplex)
    );
}

#[test]
fn test_incompatible_switch_keeps_hardware_mapping() {
    let sdk = Arc::new(SimulatedSdk::new(&[card("DeckLink Quad", 4)]));
    sdk.set_compatible_mappings(
        0,
        vec![
            ConnectorMapping::FourSubDevicesHalfDuplex,
            ConnectorMapping::TwoSubDevicesHalfDuplex,
        ],
    );
    let mut settings = ManagerSettings::default();
    let mut discovery = start(&sdk, &mut settings);

    let changed = discovery
        .changed_devices_duplex_mode(ConnectorMapping::OneSubDeviceHalfDuplex, 0)
        .unwrap();

    assert!(!changed);
    let quad = discovery.card(0).unwrap();
    assert_eq!(quad.connector_mapping, ConnectorMapping::FourSubDevicesHalfDuplex);
    assert!(quad.is_link_mode_compatible);
    assert!(!discovery.is_current_mapping_compatible(0, ConnectorMapping::OneSubDeviceHalfDuplex));
    assert!(discovery.is_current_mapping_compatible(0, ConnectorMapping::TwoSubDevicesHalfDuplex));
    assert_eq!(
        sdk.hardware_mapping(0),
        Some(ConnectorMapping::FourSubDevicesHalfDuplex)
    );

    // devices are reported again after the reload
    drain(&mut discovery, &settings);
    assert_eq!(discovery.device_names(VideoDeviceType::Output).len(), 4);
}

#[test]
fn test_switch_on_missing_card_is_rejected() {
    let sdk = Arc::new(SimulatedSdk::new(&[card("DeckLink Quad", 4)]));
    let mut settings = ManagerSettings::default();
    let mut discovery = start(&sdk, &mut settings);

    let err = discovery
        .changed_devices_duplex_mode(ConnectorMapping::OneSubDeviceFullDuplex, 5)
        .unwrap_err();
    assert!(matches!(err, IoError::InvalidParameter(_)));
}

#[test]
fn test_removal_and_unnamed_devices() {
    let sdk = Arc::new(SimulatedSdk::new(&[card("DeckLink Quad", 4)]));
    let mut settings = ManagerSettings::default();
    let mut discovery = start(&sdk, &mut settings);

    sdk.unplug("DeckLink Quad (2)");
    drain(&mut discovery, &settings);
    assert_eq!(
        discovery.device_names(VideoDeviceType::Input),
        &["DeckLink Quad (1)", "DeckLink Quad (3)", "DeckLink Quad (4)"]
    );
    assert_eq!(
        discovery.device_index("DeckLink Quad (3)", VideoDeviceType::Input),
        Some(1)
    );

    let both = deckflow_core::DeviceTypes::INPUT | deckflow_core::DeviceTypes::OUTPUT;
    assert!(!discovery.handle_arrival("", both, &settings.connector_mappings));
    assert!(!discovery.handle_removal("", both, &settings.connector_mappings));
}

#[test]
fn test_replugging_keeps_used_counts() {
    let sdk = Arc::new(SimulatedSdk::new(&[card("Alpha", 4), card("Beta", 4)]));
    let mut settings = ManagerSettings {
        connector_mappings: vec![
            ConnectorMapping::TwoSubDevicesHalfDuplex,
            ConnectorMapping::FourSubDevicesHalfDuplex,
        ],
        ..Default::default()
    };
    let mut discovery = start(&sdk, &mut settings);

    for _ in 0..3 {
        sdk.unplug("Beta (1)");
        drain(&mut discovery, &settings);
        assert_eq!(discovery.card(1).unwrap().used_input_devices, 3);
        sdk.plug("Beta (1)");
        drain(&mut discovery, &settings);
    }
    // a device reported twice is counted once
    sdk.plug("Alpha (1)");
    drain(&mut discovery, &settings);

    let alpha = discovery.card(0).unwrap();
    assert_eq!(alpha.used_input_devices, 2);
    assert_eq!(alpha.used_output_devices, 2);
    let beta = discovery.card(1).unwrap();
    assert_eq!(beta.used_input_devices, 4);
    assert_eq!(beta.used_output_devices, 4);

    assert_eq!(discovery.device_names(VideoDeviceType::Input).len(), 6);
    assert_eq!(
        discovery.offset_from_device_index(2, VideoDeviceType::Input),
        2
    );
}

#[test]
fn test_card_lookups_across_cards() {
    let sdk = Arc::new(SimulatedSdk::new(&[card("Alpha", 4), card("Beta", 4)]));
    let mut settings = ManagerSettings {
        connector_mappings: vec![
            ConnectorMapping::TwoSubDevicesHalfDuplex,
            ConnectorMapping::FourSubDevicesHalfDuplex,
        ],
        ..Default::default()
    };
    let discovery = start(&sdk, &mut settings);

    let names = discovery.device_names(VideoDeviceType::Output);
    assert_eq!(names.len(), 6);
    assert_eq!(names[2], "Beta (1)");

    assert_eq!(discovery.card_from_logical_device(2).unwrap().name, "Beta");
    assert_eq!(discovery.card_from_logical_device(0).unwrap().name, "Alpha");
    assert!(discovery.card_from_logical_device(-1).is_none());

    // Alpha exposes two of its four devices
    assert_eq!(
        discovery.offset_from_device_index(2, VideoDeviceType::Output),
        2
    );
    assert_eq!(
        discovery.offset_from_device_index(0, VideoDeviceType::Output),
        0
    );

    assert_eq!(discovery.is_keying_and_link_mode_supported(99), (false, false));
    assert_eq!(discovery.is_keying_and_link_mode_supported(2), (false, false));
}

#[test]
fn test_shutdown_clears_state() {
    let sdk = Arc::new(SimulatedSdk::new(&[card("DeckLink Quad", 4)]));
    let mut settings = ManagerSettings::default();
    let mut discovery = start(&sdk, &mut settings);

    discovery.shutdown();
    assert!(discovery.cards().is_empty());
    assert!(discovery.device_names(VideoDeviceType::Input).is_empty());

    sdk.plug("DeckLink Quad (1)");
    assert!(discovery.poll_events().is_empty());
}
