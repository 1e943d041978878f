use serde::{Deserialize, Serialize};

/// One element of the `items` array of the recently-played response,
/// kept as raw json until extraction
pub type RawItem = serde_json::Value;

/// A single observed play, flattened out of a RawItem
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayRecord {
    pub song_name: String,
    pub artist_name: String,
    pub played_at: String,
    pub date: String,   // YYYY-MM-DD, stored in the `timestamp` column
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSong {
    pub song_name: String,
    pub artist_name: String,
    pub play_count: i64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub incremented: usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The api returned nothing for the window, store untouched
    NoData,
    Loaded(UpsertSummary)
}
