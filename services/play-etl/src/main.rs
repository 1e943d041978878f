//!
//! src/main.rs  Andrew Belles  Oct 12th, 2026
//!
//! Entry point of the recently-played etl job. Runs one pass, runs on a
//! schedule, or prints the most played songs of the window
//!

mod auth;
mod config;
mod errors;
mod etl;
mod extract;
mod fetch;
mod logging;
mod persistent;
mod scheduler;
mod types;
mod validate;

#[cfg(test)]
mod testkit;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::auth::TokenProvider;
use crate::errors::EtlError;
use crate::etl::EtlJob;
use crate::fetch::{SpotifyApi, SpotifyClient, TrackFetcher};
use crate::persistent::PlayStore;
use crate::scheduler::Scheduler;
use crate::types::RunOutcome;

#[derive(Parser, Debug)]
#[command(name = "play-etl", version, about = "Spotify recently-played etl job")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single extract, validate, load pass (default)
    Run,
    /// Run the job on ETL_SCHEDULE_INTERVAL_SECS until ctrl-c
    Schedule,
    /// Print the most played songs of the trailing window
    Top {
        #[arg(
            long,
            default_value_t = 60,
            value_parser = clap::value_parser!(i64).range(1..=config::MAX_WINDOW_DAYS)
        )]
        days: i64,
        #[arg(long, default_value_t = 10)]
        limit: u32
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), EtlError> {
    let cli = Cli::parse();

    // the report only reads the store, so it needs no spotify credentials
    if let Some(Command::Top { days, limit }) = cli.command {
        let cfgs = config::load_report_config();
        let _logger = logging::init_logging(&cfgs.logging)?;
        let store = PlayStore::init(&cfgs.persistence.database_url).await?;
        print!("{}", top_report(&store, days, limit).await?);
        return Ok(());
    }

    let cfgs = config::load_config()?;
    let _logger = logging::init_logging(&cfgs.logging)?;

    info!(
        service = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        database = %cfgs.persistence.database_location,
        "play_etl.start"
    );

    let store = Arc::new(PlayStore::init(&cfgs.persistence.database_url).await?);

    let spotify: Arc<dyn SpotifyApi> = Arc::new(SpotifyClient::new(&cfgs.http, &cfgs.spotify)?);
    let tokens  = Arc::new(TokenProvider::new(spotify.clone(), &cfgs.spotify));
    let fetcher = TrackFetcher::new(spotify, tokens);
    let job = EtlJob::new(fetcher, store, cfgs.job);

    match cli.command.unwrap_or(Command::Run) {
        Command::Schedule => {
            Scheduler::new(job, cfgs.schedule, cfgs.persistence.clone()).run().await?;
        }
        _ => match job.run_once().await? {
            RunOutcome::NoData => info!("no songs downloaded, finishing execution"),
            RunOutcome::Loaded(s) => info!(
                inserted = s.inserted,
                incremented = s.incremented,
                "play_etl.done"
            )
        }
    }

    Ok(())
}

/// Ranked "song - artist (count)" lines, one per song
async fn top_report(store: &PlayStore, days: i64, limit: u32) -> Result<String, EtlError> {
    store.ensure_schema().await?;
    let top = store.top_songs(days, Some(limit)).await?;
    Ok(top.iter()
        .enumerate()
        .map(|(rank, song)| format!(
            "{:>3}. {} - {} ({})\n",
            rank + 1, song.song_name, song.artist_name, song.play_count
        ))
        .collect())
}
