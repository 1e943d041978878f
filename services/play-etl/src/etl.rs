//!
//! src/etl.rs  Andrew Belles  Oct 12th, 2026
//!
//! One extract, transform, load pass over the recently-played window
//!

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::JobConfig;
use crate::errors::EtlError;
use crate::extract::extract;
use crate::fetch::{lookback_boundary, TrackFetcher};
use crate::persistent::PlayStore;
use crate::types::RunOutcome;
use crate::validate::validate_as_of;

pub struct EtlJob {
    fetcher: TrackFetcher,
    store: Arc<PlayStore>,
    job: JobConfig
}

impl EtlJob {
    pub fn new(fetcher: TrackFetcher, store: Arc<PlayStore>, job: JobConfig) -> Self {
        Self { fetcher, store, job }
    }

    /// Fetch, extract, validate, then upsert. Nothing is written unless the
    /// whole batch validates
    pub async fn run_once(&self) -> Result<RunOutcome, EtlError> {
        let span = info_span!("etl.run", run_id = %Uuid::new_v4());
        async {
            let result = self.pipeline(Utc::now()).await;
            match &result {
                Ok(RunOutcome::NoData) => info!("etl.no_data"),
                Ok(RunOutcome::Loaded(s)) => info!(
                    inserted = s.inserted,
                    incremented = s.incremented,
                    "etl.loaded"
                ),
                Err(e) if e.is_validation() => {
                    warn!(error.kind = e.kind(), error = %e, "etl.rejected")
                }
                Err(e) => error!(error.kind = e.kind(), error = %e, "etl.failed")
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn pipeline(&self, now: DateTime<Utc>) -> Result<RunOutcome, EtlError> {
        let since_ms = lookback_boundary(now, self.job.lookback_days)?;
        let items = self.fetcher.fetch(since_ms).await?;
        let records = extract(&items)?;

        if !validate_as_of(&records, now.date_naive(), self.job.validation_window_days)? {
            return Ok(RunOutcome::NoData);
        }

        self.store.ensure_schema().await?;
        let summary = self.store.upsert(&records).await?;
        Ok(RunOutcome::Loaded(summary))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::auth::TokenProvider;
    use crate::config::test_spotify_config;
    use crate::testkit::{played_at_days_ago, raw_item, ScriptedApi};
    use crate::types::UpsertSummary;

    async fn job(api: Arc<ScriptedApi>) -> (EtlJob, Arc<PlayStore>) {
        let tokens = Arc::new(TokenProvider::new(api.clone(), &test_spotify_config()));
        let store = Arc::new(PlayStore::init("sqlite::memory:").await.unwrap());
        let job = EtlJob::new(TrackFetcher::new(api, tokens), store.clone(), JobConfig::default());
        (job, store)
    }

    fn days_ago(days: i64) -> String {
        played_at_days_ago(Utc::now().date_naive(), days)
    }

    #[tokio::test]
    async fn loads_then_counts_repeat_plays() {
        let api = Arc::new(ScriptedApi::new());
        api.push_played(200, json!({ "items": [
            raw_item("A", "X", &days_ago(1)),
            raw_item("B", "Y", &days_ago(2)),
        ]}).to_string());
        api.push_played(200, json!({ "items": [
            raw_item("A", "X", &days_ago(0)),
        ]}).to_string());

        let (job, store) = job(api.clone()).await;
        assert_eq!(
            job.run_once().await.unwrap(),
            RunOutcome::Loaded(UpsertSummary { inserted: 2, incremented: 0 })
        );
        assert_eq!(
            job.run_once().await.unwrap(),
            RunOutcome::Loaded(UpsertSummary { inserted: 0, incremented: 1 })
        );

        let top = store.top_songs(60, None).await.unwrap();
        assert_eq!(top[0].song_name, "A");
        assert_eq!(top[0].play_count, 2);

        let (since_ms, bearer) = &api.played_calls()[0];
        assert_eq!(bearer, "stale-token");
        assert!(*since_ms <= lookback_boundary(Utc::now(), 60).unwrap());
    }

    #[tokio::test]
    async fn empty_window_is_no_data() {
        let api = Arc::new(ScriptedApi::new());
        api.push_played(200, json!({ "items": [] }).to_string());

        let (job, _store) = job(api).await;
        assert_eq!(job.run_once().await.unwrap(), RunOutcome::NoData);
    }

    #[tokio::test]
    async fn invalid_batch_writes_nothing() {
        let api = Arc::new(ScriptedApi::new());
        let played_at = days_ago(1);
        api.push_played(200, json!({ "items": [
            raw_item("A", "X", &played_at),
            raw_item("B", "Y", &played_at),
        ]}).to_string());

        let (job, store) = job(api).await;
        let err = job.run_once().await.unwrap_err();
        assert!(matches!(err, EtlError::DuplicateKey(_)));

        store.ensure_schema().await.unwrap();
        assert!(store.top_songs(60, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_plays_fail_validation() {
        let api = Arc::new(ScriptedApi::new());
        api.push_played(200, json!({ "items": [
            raw_item("A", "X", &days_ago(90)),
        ]}).to_string());

        let (job, _store) = job(api).await;
        let err = job.run_once().await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let api = Arc::new(ScriptedApi::new());
        api.push_played(500, "oops".into());

        let (job, _store) = job(api).await;
        assert!(matches!(job.run_once().await, Err(EtlError::Fetch { status: 500 })));
    }
}
