//! Plain-text status report on stdout.

use deckflow_core::{VideoDeviceType, VideoModeRegistry};
use deckflow_io::DeckLinkManager;
use std::time::Duration;

pub fn print_modes(registry: &VideoModeRegistry) {
    println!("{:<16} {:>10} {:>6}", "MODE", "SIZE", "CODE");
    for mode in registry.modes() {
        let (width, height) = mode.dimensions();
        let code: String = mode
            .sdk_code
            .to_be_bytes()
            .iter()
            .map(|&b| char::from(b))
            .collect();
        println!(
            "{:<16} {:>10} {:>6}",
            mode.name,
            format!("{width}x{height}"),
            code
        );
    }
    println!("{} modes", registry.len());
}

pub fn print_manager(manager: &DeckLinkManager, elapsed: Duration) {
    let discovery = manager.discovery();
    println!(
        "DeckLink API {} | {:.3}s simulated",
        discovery.api_version().unwrap_or("unavailable"),
        elapsed.as_secs_f64()
    );

    for card in discovery.cards() {
        println!(
            "Card {:<24} mapping {:<10} inputs {} outputs {}",
            card.name, card.connector_mapping, card.used_input_devices, card.used_output_devices
        );
    }

    for record in manager.devices(VideoDeviceType::Input) {
        let Some(input) = manager.input_device(&record.name) else {
            continue;
        };
        let index = record.current_index();
        let status = record.handle.status();
        let input = input.lock();
        println!(
            "  in  {:<16} #{:<3} {:<14} queued {:<3} dropped {:<4} {}",
            record.name,
            index,
            input.format_name(),
            input.queued_frames(),
            input.dropped_frame_count(),
            status
        );
    }

    for record in manager.devices(VideoDeviceType::Output) {
        let Some(output) = manager.output_device(&record.name) else {
            continue;
        };
        let index = record.current_index();
        let status = record.handle.status();
        let output = output.lock();
        let stats = output.stats();
        println!(
            "  out {:<16} #{:<3} {:<14} fed {:<5} skipped {:<4} late {:<4} {}",
            record.name,
            index,
            output.format_name(),
            stats.frames_fed,
            stats.frames_skipped,
            output.late_frame_count(),
            status
        );
    }

    if let Some(issue) = manager.scheduler().last_issue() {
        println!("Scheduler: {}", issue);
    }
}
