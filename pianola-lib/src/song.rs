//! Song file loading and format detection.
//!
//! Song files are JSON, usually saved as UTF-16. Three layouts are accepted:
//! a song object carrying `songNotes`, an array of such songs (the first one is
//! used), or a bare array of `{key, time}` notes.

use std::fs;
use std::path::Path;

use log::debug;
use serde_json::Value;

use crate::error::SongError;
use crate::timeline::NoteRecord;

const NOTES_FIELD: &str = "songNotes";
const FORMAT_PROBE_LEN: usize = 5;

/// Read a song file and return its raw note records.
pub fn load_song_file(path: impl AsRef<Path>) -> Result<Vec<NoteRecord>, SongError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| SongError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = decode_text(&bytes)?;
    parse_song(&text)
}

/// Parse song JSON text and return its raw note records.
pub fn parse_song(text: &str) -> Result<Vec<NoteRecord>, SongError> {
    let root: Value = serde_json::from_str(text)?;
    let notes = find_notes(&root).ok_or(SongError::UnrecognizedFormat)?;

    let total = notes.len();
    let records: Vec<NoteRecord> = notes
        .iter()
        .filter_map(|note| serde_json::from_value(note.clone()).ok())
        .collect();
    if records.len() < total {
        debug!(
            "song: skipped {} entries that are not {{key, time}} objects",
            total - records.len()
        );
    }
    Ok(records)
}

fn find_notes(root: &Value) -> Option<&Vec<Value>> {
    match root {
        Value::Object(song) => song.get(NOTES_FIELD)?.as_array(),
        Value::Array(items) => match items.first() {
            Some(Value::Object(first)) if first.contains_key(NOTES_FIELD) => {
                first.get(NOTES_FIELD)?.as_array()
            }
            _ if looks_like_note_list(items) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

fn looks_like_note_list(items: &[Value]) -> bool {
    items.iter().take(FORMAT_PROBE_LEN).all(|item| {
        item.as_object()
            .map(|note| note.contains_key("key") && note.contains_key("time"))
            .unwrap_or(false)
    })
}

/// Decode UTF-16 (either byte order) or UTF-8 text, with or without a BOM.
fn decode_text(bytes: &[u8]) -> Result<String, SongError> {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => {
            String::from_utf8(rest.to_vec()).map_err(|_| SongError::Encoding)
        }
        [_, 0, ..] => decode_utf16(bytes, u16::from_le_bytes),
        [0, _, ..] => decode_utf16(bytes, u16::from_be_bytes),
        _ => String::from_utf8(bytes.to_vec()).map_err(|_| SongError::Encoding),
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Result<String, SongError> {
    if bytes.len() % 2 != 0 {
        return Err(SongError::Encoding);
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| SongError::Encoding)
}
