//! Scripted stand-ins shared by the unit tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde_json::json;

use crate::config::SpotifyCredentials;
use crate::errors::EtlError;
use crate::fetch::{ApiReply, SpotifyApi};
use crate::types::{PlayRecord, RawItem};

/// Replays queued replies in order; an empty queue is an http error
#[derive(Default)]
pub struct ScriptedApi {
    played: Mutex<VecDeque<ApiReply>>,
    token: Mutex<VecDeque<ApiReply>>,
    played_calls: Mutex<Vec<(i64, String)>>,
    refresh_calls: AtomicUsize
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_played(&self, status: u16, body: String) {
        self.played.lock().unwrap().push_back(ApiReply { status, body });
    }

    pub fn push_token(&self, status: u16, body: String) {
        self.token.lock().unwrap().push_back(ApiReply { status, body });
    }

    /// (after_ms, bearer) of every recently-played call
    pub fn played_calls(&self) -> Vec<(i64, String)> {
        self.played_calls.lock().unwrap().clone()
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpotifyApi for ScriptedApi {
    async fn recently_played(&self, after_ms: i64, bearer: &str) ->
        Result<ApiReply, EtlError> {
        self.played_calls.lock().unwrap().push((after_ms, bearer.to_string()));
        self.played.lock().unwrap()
            .pop_front()
            .ok_or_else(|| EtlError::Http("no scripted recently-played reply".into()))
    }

    async fn exchange_refresh_token(&self, _credentials: &SpotifyCredentials) ->
        Result<ApiReply, EtlError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.token.lock().unwrap()
            .pop_front()
            .ok_or_else(|| EtlError::Http("no scripted token reply".into()))
    }
}

/// Item shaped like the recently-played api returns it
pub fn raw_item(song: &str, artist: &str, played_at: &str) -> RawItem {
    json!({
        "track": {
            "name": song,
            "album": { "artists": [ { "name": artist } ] }
        },
        "played_at": played_at
    })
}

pub fn record(song: &str, artist: &str, played_at: &str) -> PlayRecord {
    PlayRecord {
        song_name: song.to_string(),
        artist_name: artist.to_string(),
        played_at: played_at.to_string(),
        date: played_at.get(..10).unwrap_or(played_at).to_string(),
    }
}

/// played_at string for noon `days_ago` days before `today`
pub fn played_at_days_ago(today: NaiveDate, days_ago: i64) -> String {
    format!("{}T12:00:00.000Z", (today - Duration::days(days_ago)).format("%Y-%m-%d"))
}
