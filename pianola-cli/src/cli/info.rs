//! Non-playback subcommands: `info` and `create`.

use std::path::Path;

use pianola_lib::{song, KeyMapping, PlayerConfig, Result, Timeline};

use crate::controls::format_time;

/// Summarize a song file as printable lines.
pub fn song_summary(path: &Path) -> Result<String> {
    let records = song::load_song_file(path)?;
    let (timeline, report) = Timeline::build_with_report(&records);
    let mapping = KeyMapping::default();
    let unmapped = timeline
        .timestamps()
        .into_iter()
        .flat_map(|ms| timeline.actions_at(ms).iter())
        .filter(|action_id| mapping.resolve(action_id).is_none())
        .count();

    Ok(format!(
        "File: {}\nNotes: {}\nDropped: {}\nTimestamps: {}\nDuration: {} ({} ms)\nUnmapped actions: {}",
        path.display(),
        report.accepted,
        report.dropped,
        timeline.timestamp_count(),
        format_time(timeline.max_timestamp_ms()),
        timeline.max_timestamp_ms(),
        unmapped
    ))
}

/// Default configuration, pretty-printed.
pub fn default_config_json() -> String {
    serde_json::to_string_pretty(&PlayerConfig::with_default_mapping())
        .unwrap_or_else(|_| "{}".to_string())
}
