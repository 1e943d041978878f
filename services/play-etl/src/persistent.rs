//!
//! src/persistent.rs  Andrew Belles  Oct 12th, 2026
//!
//! Defines the sqlite play store. Plays are counted per (song, artist);
//! played_at is the declared primary key of the first observed play
//!

use std::str::FromStr;

use chrono::{Duration, NaiveDate, Utc};
use sqlx::{sqlite::SqlitePoolOptions, sqlite::SqliteConnectOptions, Pool, Row, Sqlite};
use tracing::{debug, info};

use crate::errors::EtlError;
use crate::types::{PlayRecord, TopSong, UpsertSummary};
use crate::validate::DATE_FORMAT;

pub const TABLE: &str = "my_played_tracks";

pub struct PlayStore {
    pool: Pool<Sqlite>
}

impl PlayStore {

    pub async fn init(database_url: &str) -> Result<Self, EtlError> {
        let is_memory = database_url.starts_with("sqlite::memory:");

        let mut opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true);

        // WAL is file-only; don't set it for in-memory
        if !is_memory {
            opts = opts.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                       .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        }

        // an in-memory database lives and dies with its single connection
        let mut pool_opts = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(if is_memory {1} else {4});
        if is_memory {
            pool_opts = pool_opts.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_opts.connect_with(opts).await?;

        debug!(database_url, "store.open");
        Ok(Self { pool })
    }

    /// Creates the play table if absent. Safe to call on every run
    pub async fn ensure_schema(&self) -> Result<(), EtlError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS my_played_tracks (
              song_name    VARCHAR(200),
              artist_name  VARCHAR(200),
              played_at    VARCHAR(200),
              timestamp    VARCHAR(200),
              play_count   INTEGER DEFAULT 1,
              CONSTRAINT primary_key_constraint PRIMARY KEY (played_at)
            );
            "
        ).execute(&self.pool).await?;

        debug!(table = TABLE, "store.schema");
        Ok(())
    }

    ///
    /// Walks the batch in order: a known (song, artist) gets its play_count
    /// bumped, an unknown one is inserted with play_count 1. The existing
    /// row keeps its original played_at. All of it commits or none of it does
    ///
    pub async fn upsert(&self, records: &[PlayRecord]) -> Result<UpsertSummary, EtlError> {
        let mut summary = UpsertSummary::default();
        let mut tx = self.pool.begin().await?;

        for record in records {
            let existing = sqlx::query(
                r"
                SELECT played_at FROM my_played_tracks
                 WHERE song_name = ?1 AND artist_name = ?2
                 LIMIT 1;
                "
            )
            .bind(&record.song_name)
            .bind(&record.artist_name)
            .fetch_optional(&mut *tx)
            .await?;

            if existing.is_some() {
                sqlx::query(
                    r"
                    UPDATE my_played_tracks
                       SET play_count = play_count + 1
                     WHERE song_name = ?1 AND artist_name = ?2;
                    "
                )
                .bind(&record.song_name)
                .bind(&record.artist_name)
                .execute(&mut *tx)
                .await?;
                summary.incremented += 1;
            } else {
                sqlx::query(
                    r"
                    INSERT INTO my_played_tracks (song_name, artist_name, played_at, timestamp)
                    VALUES (?1, ?2, ?3, ?4);
                    "
                )
                .bind(&record.song_name)
                .bind(&record.artist_name)
                .bind(&record.played_at)
                .bind(&record.date)
                .execute(&mut *tx)
                .await?;
                summary.inserted += 1;
            }
        }

        tx.commit().await?;
        info!(inserted = summary.inserted, incremented = summary.incremented, "store.upsert");
        Ok(summary)
    }

    /// Songs dated within the last `window_days` days, most played first
    pub async fn top_songs(&self, window_days: i64, limit: Option<u32>) ->
        Result<Vec<TopSong>, EtlError> {
        self.top_songs_as_of(window_days, Utc::now().date_naive(), limit).await
    }

    pub async fn top_songs_as_of(
        &self,
        window_days: i64,
        today: NaiveDate,
        limit: Option<u32>
    ) -> Result<Vec<TopSong>, EtlError> {
        let start = Duration::try_days(window_days)
            .and_then(|d| today.checked_sub_signed(d))
            .ok_or_else(|| EtlError::Config(format!("window of {window_days} days is out of range")))?;
        let rows = sqlx::query(
            r"
            SELECT song_name, artist_name, play_count
              FROM my_played_tracks
             WHERE DATE(timestamp) BETWEEN ?1 AND ?2
             ORDER BY play_count DESC, song_name ASC
             LIMIT ?3;
            "
        )
        .bind(start.format(DATE_FORMAT).to_string())
        .bind(today.format(DATE_FORMAT).to_string())
        .bind(limit.map(i64::from).unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;

        let top = rows.iter()
            .map(|r| Ok(TopSong {
                song_name: r.try_get("song_name")?,
                artist_name: r.try_get("artist_name")?,
                play_count: r.try_get("play_count")?,
            }))
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(top)
    }
}
