use deckflow_core::settings::{AppSettings, ManagerSettings, OutputSettings, SyncMode};
use deckflow_core::{ConnectorMapping, InputSettings, KeyingMode, PixelFormat};

#[test]
fn test_app_settings_default() {
    let settings = AppSettings::default();
    assert_eq!(settings.manager, ManagerSettings::default());
    assert_eq!(settings.simulation.cards.len(), 1);
    assert!(!settings.dirty);
}

#[test]
fn test_app_settings_serialization() {
    let mut settings = AppSettings::default();
    settings.manager.card_index = 0;
    settings
        .manager
        .set_connector_mapping(0, ConnectorMapping::TwoSubDevicesFullDuplex);

    let mut output = OutputSettings::named("Output Device 1");
    output.device_selection = 2;
    output.pixel_format = PixelFormat::Bgra8Bit;
    output.keying_mode = KeyingMode::External;
    output.sync_mode = SyncMode::Async;
    output.same_as_input = Some("Input Device 1".to_string());
    settings.manager.outputs.push(output);
    settings.manager.inputs.push(InputSettings::named("Input Device 1"));
    settings.dirty = true;

    let json = serde_json::to_string(&settings).expect("Failed to serialize AppSettings");
    let deserialized: AppSettings =
        serde_json::from_str(&json).expect("Failed to deserialize AppSettings");

    assert!(!deserialized.dirty);
    settings.dirty = false;
    assert_eq!(settings, deserialized);
}
