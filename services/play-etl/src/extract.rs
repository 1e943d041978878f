//!
//! src/extract.rs  Andrew Belles  Oct 12th, 2026
//!
//! Flattens raw recently-played items into PlayRecords, one for one
//!

use serde_json::Value;

use crate::errors::EtlError;
use crate::types::{PlayRecord, RawItem};

const SONG_NAME: &str   = "/track/name";
const ARTIST_NAME: &str = "/track/album/artists/0/name";
const PLAYED_AT: &str   = "/played_at";

/// Keeps order and count of the input. A json null leaf is carried as ""
/// so the validator reports it, a missing path fails here
pub fn extract(items: &[RawItem]) -> Result<Vec<PlayRecord>, EtlError> {
    items.iter()
        .enumerate()
        .map(|(index, item)| extract_one(index, item))
        .collect()
}

fn extract_one(index: usize, item: &RawItem) -> Result<PlayRecord, EtlError> {
    let song_name   = text_at(index, item, SONG_NAME)?;
    let artist_name = text_at(index, item, ARTIST_NAME)?;
    let played_at   = text_at(index, item, PLAYED_AT)?;
    let date = played_at.get(..10).unwrap_or(played_at.as_str()).to_string();

    Ok( PlayRecord { song_name, artist_name, played_at, date } )
}

fn text_at(index: usize, item: &RawItem, pointer: &str) -> Result<String, EtlError> {
    match item.pointer(pointer) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Err(EtlError::MalformedItem(
            format!("item {index}: {pointer} is not a string ({other})")
        )),
        None => Err(EtlError::MalformedItem(
            format!("item {index}: {pointer} missing")
        ))
    }
}
