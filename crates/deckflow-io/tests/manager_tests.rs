use deckflow_core::{
    registry, ConnectorMapping, DeviceStatus, FrameRate, InputSettings, ManagerSettings,
    OutputSettings, OutputTimecodeMode, Resolution, ScanMode, SimulatedCard, StatusType,
    VideoDeviceType, VideoModeSetting,
};
use deckflow_io::decklink::sim::{SimFrameSource, SimulatedGpu, SimulatedSdk};
use deckflow_io::{DeckLinkManager, IoError};
use std::sync::Arc;
use std::time::Duration;

fn quad() -> (Arc<SimulatedSdk>, Arc<SimulatedGpu>) {
    let sdk = Arc::new(SimulatedSdk::new(&[SimulatedCard {
        name: "DeckLink Quad".to_string(),
        logical_devices: 4,
    }]));
    (sdk, Arc::new(SimulatedGpu::new()))
}

fn output(name: &str, device_selection: i32) -> OutputSettings {
    OutputSettings {
        device_selection,
        video_mode: VideoModeSetting {
            resolution: Resolution::Hd1080,
            frame_rate: FrameRate::Fps50,
            scan_mode: ScanMode::Progressive,
        },
        ..OutputSettings::named(name)
    }
}

fn input(name: &str, device_selection: i32) -> InputSettings {
    InputSettings {
        device_selection,
        ..InputSettings::named(name)
    }
}

fn manager_with(
    settings: ManagerSettings,
    sdk: &Arc<SimulatedSdk>,
    gpu: &Arc<SimulatedGpu>,
) -> DeckLinkManager {
    let outputs: Vec<String> = settings.outputs.iter().map(|o| o.name.clone()).collect();
    let mut manager = DeckLinkManager::new(settings, sdk.clone(), gpu.clone());
    for name in outputs {
        manager
            .set_frame_source(&name, Box::new(SimFrameSource::new()))
            .unwrap();
    }
    manager.enable();
    manager
}

fn index_of(manager: &DeckLinkManager, name: &str, device_type: VideoDeviceType) -> i32 {
    manager
        .device_by_name(name, device_type)
        .unwrap()
        .current_index()
}

#[test]
fn test_half_duplex_index_taken_over_across_types() {
    let (sdk, gpu) = quad();
    let settings = ManagerSettings {
        inputs: vec![input("Camera", 1)],
        outputs: vec![output("Program", 0)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);
    assert_eq!(sdk.open_inputs(), 1);

    let bound = manager
        .set_device_index("Program", VideoDeviceType::Output, 1)
        .unwrap();
    assert_eq!(bound, 1);
    assert_eq!(index_of(&manager, "Camera", VideoDeviceType::Input), -1);
    assert_eq!(
        manager
            .device_by_name("Camera", VideoDeviceType::Input)
            .unwrap()
            .old_index(),
        -1
    );

    manager.tick(Duration::from_millis(20));
    assert_eq!(sdk.open_inputs(), 0);
    assert_eq!(sdk.open_outputs(), 1);
    assert!(!manager.is_logical_device_bound_twice(1));
}

#[test]
fn test_input_taking_over_output_index_opens_after_output_closes() {
    let (sdk, gpu) = quad();
    let settings = ManagerSettings {
        inputs: vec![input("Camera", -1)],
        outputs: vec![output("Program", 0)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);
    assert_eq!(sdk.open_outputs(), 1);
    assert_eq!(sdk.open_inputs(), 0);

    let bound = manager
        .set_device_index("Camera", VideoDeviceType::Input, 0)
        .unwrap();
    assert_eq!(bound, 0);
    assert_eq!(index_of(&manager, "Program", VideoDeviceType::Output), -1);

    manager.tick(Duration::from_millis(20));
    assert_eq!(sdk.open_outputs(), 0);
    assert_eq!(sdk.open_inputs(), 1);
    assert!(sdk.port_collisions().is_empty());
}

#[test]
fn test_full_duplex_allows_input_and_output_on_one_index() {
    let (sdk, gpu) = quad();
    let settings = ManagerSettings {
        connector_mappings: vec![ConnectorMapping::TwoSubDevicesFullDuplex],
        inputs: vec![input("Camera", 1)],
        outputs: vec![output("Program", 0), output("Backup", 1)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);

    // only devices of the same type compete for an index
    assert_eq!(index_of(&manager, "Camera", VideoDeviceType::Input), 1);
    manager
        .set_device_index("Program", VideoDeviceType::Output, 1)
        .unwrap();
    assert_eq!(index_of(&manager, "Camera", VideoDeviceType::Input), 1);
    assert_eq!(index_of(&manager, "Backup", VideoDeviceType::Output), -1);

    assert!(manager.is_logical_device_bound_twice(1));
    assert!(!manager.is_logical_device_bound_twice(0));
    assert!(!manager.is_logical_device_bound_twice(-1));
    assert!(!DeckLinkManager::is_unique_index_device(
        ConnectorMapping::TwoSubDevicesFullDuplex
    ));
}

#[test]
fn test_out_of_range_index_unbinds() {
    let (sdk, gpu) = quad();
    let settings = ManagerSettings {
        outputs: vec![output("Program", 0)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);

    let bound = manager
        .set_device_index("Program", VideoDeviceType::Output, 9)
        .unwrap();
    assert_eq!(bound, -1);
    assert_eq!(index_of(&manager, "Program", VideoDeviceType::Output), -1);

    let err = manager
        .set_device_index("Nowhere", VideoDeviceType::Output, 0)
        .unwrap_err();
    assert!(matches!(err, IoError::DeviceNotFound(_)));
}

#[test]
fn test_saved_index_beyond_available_devices_is_dropped() {
    let (sdk, gpu) = quad();
    let settings = ManagerSettings {
        outputs: vec![output("Program", 7)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);

    assert_eq!(index_of(&manager, "Program", VideoDeviceType::Output), -1);
    assert_eq!(sdk.open_outputs(), 0);
}

#[test]
fn test_get_or_create_device_instance() {
    let (sdk, gpu) = quad();
    let mut manager = manager_with(ManagerSettings::default(), &sdk, &gpu);

    let first = manager
        .get_or_create_device_instance("Camera", VideoDeviceType::Input)
        .unwrap();
    let again = manager
        .get_or_create_device_instance("Camera", VideoDeviceType::Input)
        .unwrap();
    assert!(first.handle.ptr_eq(&again.handle));
    assert_eq!(manager.devices(VideoDeviceType::Input).len(), 1);
    assert_eq!(first.current_index(), -1);

    // same name, other type
    let output = manager
        .get_or_create_device_instance("Camera", VideoDeviceType::Output)
        .unwrap();
    assert!(!output.handle.ptr_eq(&first.handle));

    assert!(matches!(
        manager.get_or_create_device_instance("", VideoDeviceType::Input),
        Err(IoError::InvalidParameter(_))
    ));
    assert!(matches!(
        manager.add_input(InputSettings::named("Camera")),
        Err(IoError::InvalidOperation(_))
    ));
}

#[test]
fn test_removing_device_releases_everything() {
    let (sdk, gpu) = quad();
    gpu.set_readback_latency(5);
    let settings = ManagerSettings {
        outputs: vec![output("Program", 0)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    for i in 0..3 {
        manager.tick(Duration::from_millis(i * 20));
    }
    assert!(gpu.pending_readbacks() > 0);

    let handle = manager.devices(VideoDeviceType::Output)[0].handle.clone();
    let name = manager
        .remove_device_instance(0, VideoDeviceType::Output)
        .unwrap();
    assert_eq!(name, "Program");

    // a second dispose is harmless
    handle.dispose();

    assert_eq!(gpu.live_textures(), 0);
    assert_eq!(gpu.pending_readbacks(), 0);
    assert_eq!(gpu.bad_releases(), 0);
    assert_eq!(sdk.open_outputs(), 0);
    assert!(manager.scheduler().is_empty());
    assert!(!manager.scheduler().is_hook_installed());
    assert!(manager.store().is_empty());

    assert!(matches!(
        manager.remove_device_instance(0, VideoDeviceType::Output),
        Err(IoError::InvalidParameter(_))
    ));
}

#[test]
fn test_remove_all_devices() {
    let (sdk, gpu) = quad();
    let settings = ManagerSettings {
        inputs: vec![input("Camera", 1)],
        outputs: vec![output("Program", 0)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);

    manager.remove_all_devices();

    assert!(manager.devices(VideoDeviceType::Input).is_empty());
    assert!(manager.devices(VideoDeviceType::Output).is_empty());
    assert!(manager.store().is_empty());
    assert_eq!(sdk.open_inputs(), 0);
    assert_eq!(sdk.open_outputs(), 0);
}

#[test]
fn test_mapping_switch_swaps_device_containers() {
    let (sdk, gpu) = quad();
    let settings = ManagerSettings {
        outputs: vec![output("Program", 0)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);
    assert_eq!(sdk.open_outputs(), 1);

    let changed = manager
        .change_connector_mapping(ConnectorMapping::OneSubDeviceFullDuplex)
        .unwrap();
    assert!(changed);
    assert!(manager.devices(VideoDeviceType::Output).is_empty());
    assert_eq!(sdk.open_outputs(), 0);
    assert_eq!(manager.logical_device_names(VideoDeviceType::Output).len(), 1);
    assert!(manager.is_current_mapping_compatible());

    manager.add_output(output("Solo", 0)).unwrap();
    manager
        .set_frame_source("Solo", Box::new(SimFrameSource::new()))
        .unwrap();
    manager.tick(Duration::from_millis(20));
    assert_eq!(index_of(&manager, "Solo", VideoDeviceType::Output), 0);
    assert_eq!(sdk.open_outputs(), 1);

    let changed = manager
        .change_connector_mapping(ConnectorMapping::FourSubDevicesHalfDuplex)
        .unwrap();
    assert!(changed);
    let names: Vec<&str> = manager
        .devices(VideoDeviceType::Output)
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(names, vec!["Program"]);
    assert_eq!(manager.store().len(), 2);

    manager.tick(Duration::from_millis(40));
    assert_eq!(sdk.open_outputs(), 1);
    assert_eq!(manager.logical_device_names(VideoDeviceType::Output).len(), 4);
    assert_eq!(
        sdk.output_params().last().unwrap().device_selection,
        0
    );

    // selecting the current mapping again is a no-op
    assert!(!manager
        .change_connector_mapping(ConnectorMapping::FourSubDevicesHalfDuplex)
        .unwrap());
}

#[test]
fn test_incompatible_mapping_is_recorded_but_not_applied() {
    let (sdk, gpu) = quad();
    sdk.set_compatible_mappings(0, vec![ConnectorMapping::FourSubDevicesHalfDuplex]);
    let settings = ManagerSettings {
        inputs: vec![input("Camera", 1)],
        outputs: vec![output("Program", 0)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);
    assert!(manager.is_current_mapping_compatible());
    assert_eq!(sdk.open_inputs(), 1);
    assert_eq!(sdk.open_outputs(), 1);

    let camera = manager
        .device_by_name("Camera", VideoDeviceType::Input)
        .unwrap()
        .clone();
    let program = manager
        .device_by_name("Program", VideoDeviceType::Output)
        .unwrap()
        .clone();
    let camera_old = camera.old_index();
    let program_old = program.old_index();

    let changed = manager
        .change_connector_mapping(ConnectorMapping::OneSubDeviceHalfDuplex)
        .unwrap();

    assert!(!changed);
    // the devices of the four device mapping are parked with their bindings
    assert!(manager.devices(VideoDeviceType::Input).is_empty());
    assert!(manager.devices(VideoDeviceType::Output).is_empty());
    manager.tick(Duration::from_millis(20));
    assert_eq!(sdk.open_inputs(), 0);
    assert_eq!(sdk.open_outputs(), 0);
    assert_eq!(camera.current_index(), 1);
    assert_eq!(camera.old_index(), camera_old);
    assert_eq!(program.current_index(), 0);
    assert_eq!(program.old_index(), program_old);
    assert_eq!(
        manager.selected_connector_mapping(),
        ConnectorMapping::OneSubDeviceHalfDuplex
    );
    assert!(!manager.is_current_mapping_compatible());
    assert_eq!(
        sdk.hardware_mapping(0),
        Some(ConnectorMapping::FourSubDevicesHalfDuplex)
    );
    assert_eq!(manager.logical_device_names(VideoDeviceType::Input).len(), 4);
    assert_eq!(
        manager.settings_snapshot().connector_mappings,
        vec![ConnectorMapping::OneSubDeviceHalfDuplex]
    );

    assert!(manager
        .change_connector_mapping(ConnectorMapping::FourSubDevicesHalfDuplex)
        .unwrap());
    assert!(manager.is_current_mapping_compatible());
    manager.tick(Duration::from_millis(40));
    assert_eq!(index_of(&manager, "Camera", VideoDeviceType::Input), 1);
    assert_eq!(index_of(&manager, "Program", VideoDeviceType::Output), 0);
    assert_eq!(sdk.open_inputs(), 1);
    assert_eq!(sdk.open_outputs(), 1);
    assert!(sdk.port_collisions().is_empty());
}

#[test]
fn test_mapping_change_requires_discovered_card() {
    let (sdk, gpu) = quad();
    let mut manager = DeckLinkManager::new(ManagerSettings::default(), sdk, gpu);

    assert!(matches!(
        manager.change_connector_mapping(ConnectorMapping::OneSubDeviceFullDuplex),
        Err(IoError::InvalidParameter(_))
    ));
}

#[test]
fn test_placeholder_card_without_hardware() {
    let sdk = Arc::new(SimulatedSdk::new(&[]));
    let gpu = Arc::new(SimulatedGpu::new());
    let settings = ManagerSettings {
        outputs: vec![output("Program", 0)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);

    assert!(manager.discovery().no_card_detected());
    assert_eq!(index_of(&manager, "Program", VideoDeviceType::Output), -1);
    assert_eq!(sdk.open_outputs(), 0);
}

#[test]
fn test_next_device_name_fills_gaps() {
    let (sdk, gpu) = quad();
    let mut manager = manager_with(ManagerSettings::default(), &sdk, &gpu);

    assert_eq!(
        manager.next_device_name(VideoDeviceType::Input),
        "Input Device 1"
    );
    manager.add_input(InputSettings::named("Input Device 1")).unwrap();
    manager.add_input(InputSettings::named("Input Device 3")).unwrap();

    assert_eq!(
        manager.next_device_name(VideoDeviceType::Input),
        "Input Device 2"
    );
    assert_eq!(
        manager.next_device_name(VideoDeviceType::Output),
        "Output Device 1"
    );
}

#[test]
fn test_signal_status() {
    let (sdk, gpu) = quad();
    let settings = ManagerSettings {
        inputs: vec![input("Spare", -1)],
        outputs: vec![output("Program", 0)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);

    assert_eq!(
        manager.signal_status("Spare", VideoDeviceType::Input),
        Some(DeviceStatus::new("", StatusType::Unused))
    );
    assert_eq!(
        manager.signal_status("Program", VideoDeviceType::Output),
        Some(DeviceStatus::default())
    );
    assert_eq!(
        manager.signal_status("Program", VideoDeviceType::Input),
        None
    );
}

#[test]
fn test_unplugged_device_is_rebound_when_it_returns() {
    let (sdk, gpu) = quad();
    let settings = ManagerSettings {
        outputs: vec![output("Program", 3)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);
    assert_eq!(sdk.open_outputs(), 1);

    sdk.unplug("DeckLink Quad (4)");
    manager.tick(Duration::from_millis(20));

    let record = manager
        .device_by_name("Program", VideoDeviceType::Output)
        .unwrap()
        .clone();
    assert_eq!(record.current_index(), -1);
    assert_eq!(record.old_index(), 3);
    assert_eq!(sdk.open_outputs(), 0);

    sdk.plug("DeckLink Quad (4)");
    manager.tick(Duration::from_millis(40));

    assert_eq!(record.current_index(), 3);
    assert_eq!(sdk.open_outputs(), 1);
}

#[test]
fn test_rebinding_skips_taken_index() {
    let (sdk, gpu) = quad();
    let settings = ManagerSettings {
        outputs: vec![output("Program", 3)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);

    sdk.unplug("DeckLink Quad (4)");
    manager.tick(Duration::from_millis(20));

    // claimed by an input before the old holder comes back
    manager.add_input(input("Camera", -1)).unwrap();
    manager
        .change_video_device_name_data("Camera", VideoDeviceType::Input, 3)
        .unwrap();
    sdk.plug("DeckLink Quad (4)");
    manager.tick(Duration::from_millis(40));

    assert_eq!(index_of(&manager, "Program", VideoDeviceType::Output), -1);
    assert_eq!(index_of(&manager, "Camera", VideoDeviceType::Input), 3);
    assert_eq!(sdk.open_outputs(), 0);
    assert_eq!(sdk.open_inputs(), 1);
}

#[test]
fn test_output_mirrors_input_mode() {
    let (sdk, gpu) = quad();
    let p50 = registry()
        .mode(Resolution::Hd1080, FrameRate::Fps50, ScanMode::Progressive)
        .unwrap();
    let p25 = registry()
        .mode(Resolution::Hd1080, FrameRate::Fps25, ScanMode::Progressive)
        .unwrap();
    sdk.set_input_signal("DeckLink Quad (1)", Some(p50));

    let mut program = output("Program", 1);
    program.same_as_input = Some("Camera".to_string());
    program.timecode_mode = OutputTimecodeMode::SameAsInput;
    program.video_mode.frame_rate = FrameRate::Fps24;
    let settings = ManagerSettings {
        inputs: vec![input("Camera", 0)],
        outputs: vec![program],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);

    let camera = manager.input_device("Camera").unwrap();
    let output = manager.output_device("Program").unwrap();
    assert_eq!(output.lock().format_name(), "HD1080p50");
    assert_eq!(camera.lock().format_name(), "HD1080p50");

    let fed = sdk.fed_frames();
    assert_eq!(Some(fed[0].timecode), camera.lock().timestamp());

    sdk.set_input_signal("DeckLink Quad (1)", Some(p25));
    manager.tick(Duration::from_millis(20));
    assert_eq!(output.lock().format_name(), "HD1080p25");
    assert_eq!(
        sdk.output_params().last().unwrap().mode_code,
        p25.sdk_code
    );

    // mirroring stops
    manager.link_same_video_mode("Program", None).unwrap();
    manager.tick(Duration::from_millis(40));
    assert_eq!(output.lock().format_name(), "HD1080p24");
    assert!(manager.link_same_video_mode("Ghost", None).is_err());
}

#[test]
fn test_removing_mirrored_input_reports_missing_link() {
    let (sdk, gpu) = quad();
    sdk.set_input_signal(
        "DeckLink Quad (1)",
        registry().mode(Resolution::Hd1080, FrameRate::Fps50, ScanMode::Progressive),
    );

    let mut program = output("Program", 1);
    program.same_as_input = Some("Camera".to_string());
    let settings = ManagerSettings {
        inputs: vec![input("Camera", 0)],
        outputs: vec![program],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);
    assert_eq!(sdk.open_outputs(), 1);

    manager
        .remove_device_instance(0, VideoDeviceType::Input)
        .unwrap();
    manager.tick(Duration::from_millis(20));

    let status = manager
        .device_by_name("Program", VideoDeviceType::Output)
        .unwrap()
        .handle
        .status();
    assert_eq!(status.kind, StatusType::Error);
    assert_eq!(
        status.message,
        "Same as Input Video Mode requested but no target input device set."
    );
    assert_eq!(
        manager.signal_status("Program", VideoDeviceType::Output),
        Some(DeviceStatus::new("", StatusType::Unused))
    );
}

#[test]
fn test_input_without_signal() {
    let (sdk, gpu) = quad();
    let settings = ManagerSettings {
        inputs: vec![input("Camera", 0)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);

    let camera = manager.input_device("Camera").unwrap();
    assert_eq!(camera.lock().format_name(), "Not defined");
    assert_eq!(camera.lock().frame_duration(), 0);
    assert_eq!(
        manager.signal_status("Camera", VideoDeviceType::Input),
        Some(DeviceStatus::warning("No input source"))
    );

    let p25 = registry().mode(Resolution::Hd1080, FrameRate::Fps25, ScanMode::Progressive);
    sdk.set_input_signal("DeckLink Quad (1)", p25);
    manager.tick(Duration::from_millis(40));
    manager.tick(Duration::from_millis(80));

    let camera = camera.lock();
    assert_eq!(camera.format_name(), "HD1080p25");
    assert_eq!(camera.queued_frames(), 2);
    assert_eq!(camera.presented_sequence(), Some(1));
}

#[test]
fn test_busy_input_reports_error() {
    let (sdk, gpu) = quad();
    sdk.set_busy("DeckLink Quad (2)", true);
    let settings = ManagerSettings {
        inputs: vec![input("Camera", 1)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);

    let status = manager
        .device_by_name("Camera", VideoDeviceType::Input)
        .unwrap()
        .handle
        .status();
    assert_eq!(
        status,
        DeviceStatus::error("Can't start input device (possibly already used)")
    );
    assert_eq!(sdk.open_inputs(), 0);
}

#[test]
fn test_playback_starts_disabled_devices() {
    let (sdk, gpu) = quad();
    let mut program = output("Program", 0);
    program.enabled = false;
    let settings = ManagerSettings {
        outputs: vec![program],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);
    assert_eq!(sdk.open_outputs(), 0);

    manager.set_playing(true);
    manager.tick(Duration::from_millis(20));
    assert!(manager.is_playing());
    assert_eq!(sdk.open_outputs(), 1);

    manager.set_playing(false);
    manager.tick(Duration::from_millis(40));
    assert_eq!(sdk.open_outputs(), 0);
}

#[test]
fn test_disable_stops_everything() {
    let (sdk, gpu) = quad();
    let settings = ManagerSettings {
        inputs: vec![input("Camera", 1)],
        outputs: vec![output("Program", 0)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager.tick(Duration::ZERO);

    manager.disable();

    assert!(!manager.is_enabled());
    assert!(manager.scheduler().is_empty());
    assert_eq!(sdk.open_inputs(), 0);
    assert_eq!(sdk.open_outputs(), 0);
    assert_eq!(manager.tick(Duration::from_millis(20)), None);
    assert!(manager.discovery().cards().is_empty());

    // enabling again restores the bindings
    manager.enable();
    manager.tick(Duration::from_millis(40));
    assert_eq!(sdk.open_outputs(), 1);
    assert_eq!(sdk.open_inputs(), 1);
}

#[test]
fn test_settings_snapshot_reflects_live_state() {
    let (sdk, gpu) = quad();
    let settings = ManagerSettings {
        inputs: vec![input("Camera", 1)],
        outputs: vec![output("Program", 0)],
        ..Default::default()
    };
    let mut manager = manager_with(settings, &sdk, &gpu);
    manager
        .set_device_index("Program", VideoDeviceType::Output, 2)
        .unwrap();

    let snapshot = manager.settings_snapshot();
    assert_eq!(snapshot.outputs.len(), 1);
    assert_eq!(snapshot.outputs[0].device_selection, 2);
    assert_eq!(snapshot.inputs[0].name, "Camera");
    assert_eq!(snapshot.inputs[0].device_selection, 1);
    assert_eq!(
        snapshot.connector_mappings,
        vec![ConnectorMapping::FourSubDevicesHalfDuplex]
    );
}
