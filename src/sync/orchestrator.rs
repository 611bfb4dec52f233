//! Runs the synchronization pipeline for every configured
//! (account, playlist) pair.
//!
//! Each pair moves through `Pending → Extracting → Matching → Materializing →
//! Done | Failed`. A pair whose weekly destination playlist already exists
//! goes straight from `Pending` to `Done`. Failures never escape a pair: they
//! become a failed [`SyncOutcome`] and the run continues with the next pair or
//! account.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use futures::{StreamExt, stream};

use crate::{
    config::{Account, SyncSettings},
    error::SyncError,
    info,
    management::TrackCacheManager,
    success,
    sync::{
        extractor::TrackExtractor,
        matcher,
        materializer::{self, Destination},
    },
    types::{PlaylistRef, SyncOutcome, SyncResult, SyncState},
    utils, warning,
};

/// Services of one authenticated account.
pub struct Connection {
    pub extractor: Arc<dyn TrackExtractor>,
    pub destination: Arc<dyn Destination>,
}

/// Supplies authenticated service handles per account.
#[async_trait]
pub trait AccountConnector: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SyncError::Auth`] when the account cannot be authenticated.
    async fn connect(&self, account: &Account) -> Result<Connection, SyncError>;
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Any day of the sync period to run for.
    pub today: NaiveDate,
    pub concurrency: usize,
    /// Where extracted tracks are dumped, `None` disables the dump.
    pub cache_dir: Option<PathBuf>,
    /// Restrict the run to these account indexes (all when empty).
    pub accounts: Vec<String>,
    /// Restrict the run to these logical playlist names (all when empty).
    pub playlists: Vec<String>,
}

impl SyncOptions {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            today: Local::now().date_naive(),
            concurrency: settings.concurrency.max(1),
            cache_dir: settings.write_cache.then(|| settings.cache_dir.clone()),
            accounts: Vec::new(),
            playlists: Vec::new(),
        }
    }

    fn includes_account(&self, index: &str) -> bool {
        self.accounts.is_empty() || self.accounts.iter().any(|a| a == index)
    }

    fn includes_playlist(&self, name: &str) -> bool {
        self.playlists.is_empty() || self.playlists.iter().any(|p| p == name)
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    /// Label of the sync period, see [`utils::sync_period_label`].
    pub period: String,
    /// One outcome per pair, in configuration order.
    pub outcomes: Vec<SyncOutcome>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn total_added(&self) -> usize {
        self.outcomes.iter().map(|o| o.result.tracks_added).sum()
    }
}

enum Job {
    Ready(SyncOutcome),
    Run {
        account: String,
        playlist: PlaylistRef,
        connection: Arc<Connection>,
    },
}

pub struct Orchestrator<C> {
    connector: C,
    options: SyncOptions,
}

impl<C: AccountConnector> Orchestrator<C> {
    pub fn new(connector: C, options: SyncOptions) -> Self {
        Self { connector, options }
    }

    /// Syncs every selected playlist of every selected account.
    ///
    /// Accounts are connected one after another in configuration order. An
    /// account that fails to connect produces one failed outcome per selected
    /// playlist. Pairs then run with at most `concurrency` in flight; the
    /// report keeps configuration order.
    pub async fn run(&self, accounts: &[Account]) -> RunReport {
        let mut jobs = Vec::new();

        for account in accounts
            .iter()
            .filter(|a| self.options.includes_account(&a.index))
        {
            let playlists: Vec<&PlaylistRef> = account
                .playlists
                .iter()
                .filter(|p| self.options.includes_playlist(&p.name))
                .collect();
            if playlists.is_empty() {
                continue;
            }

            match self.connector.connect(account).await {
                Ok(connection) => {
                    let connection = Arc::new(connection);
                    for playlist in playlists {
                        jobs.push(Job::Run {
                            account: account.index.clone(),
                            playlist: playlist.clone(),
                            connection: Arc::clone(&connection),
                        });
                    }
                }
                Err(e) => {
                    warning!("Account {}: {}", account.index, e);
                    for playlist in playlists {
                        let name = utils::weekly_playlist_name(&playlist.name, self.options.today);
                        jobs.push(Job::Ready(failed(
                            &account.index,
                            &playlist.name,
                            SyncState::Pending,
                            SyncResult::new(name),
                            &e,
                        )));
                    }
                }
            }
        }

        let outcomes = stream::iter(jobs)
            .map(|job| async move {
                match job {
                    Job::Ready(outcome) => outcome,
                    Job::Run {
                        account,
                        playlist,
                        connection,
                    } => self.sync_playlist(&account, &playlist, &connection).await,
                }
            })
            .buffered(self.options.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        RunReport {
            period: utils::sync_period_label(self.options.today),
            outcomes,
        }
    }

    /// Runs the pipeline for a single (account, playlist) pair.
    pub async fn sync_playlist(
        &self,
        account: &str,
        playlist: &PlaylistRef,
        connection: &Connection,
    ) -> SyncOutcome {
        let today = self.options.today;
        let name = utils::weekly_playlist_name(&playlist.name, today);
        let description = utils::weekly_playlist_description(&playlist.name, today);
        let mut result = SyncResult::new(&name);

        match connection.destination.find_playlist(&name).await {
            Ok(Some(existing)) => {
                info!(
                    "[{}] Playlist '{}' already exists, skipping",
                    account, existing.name
                );
                return SyncOutcome {
                    account: account.to_string(),
                    playlist: playlist.name.clone(),
                    state: SyncState::Done,
                    failed_in: None,
                    result,
                    destination: Some(existing),
                    skipped_existing: true,
                    failure: None,
                };
            }
            Ok(None) => {}
            Err(e) => {
                return failed(account, &playlist.name, SyncState::Pending, result, &e);
            }
        }

        info!("[{}] Extracting '{}'", account, playlist.name);
        let tracks = match connection.extractor.extract(playlist).await {
            Ok(tracks) => tracks,
            Err(e) => {
                return failed(account, &playlist.name, SyncState::Extracting, result, &e);
            }
        };
        result.tracks_found = tracks.len();

        if let Some(cache_dir) = &self.options.cache_dir {
            let mut cache = TrackCacheManager::for_playlist(cache_dir, account, &playlist.name);
            if let Err(e) = cache.set_tracks(tracks.clone()).persist().await {
                warning!("[{}] Failed to cache tracks of '{}': {}", account, playlist.name, e);
            }
        }

        info!(
            "[{}] Matching {} tracks of '{}'",
            account,
            tracks.len(),
            playlist.name
        );
        let matches = matcher::match_all(&tracks, connection.destination.as_ref()).await;
        result.tracks_matched = matches.ids.len();
        if !matches.unmatched.is_empty() {
            info!(
                "[{}] {} tracks of '{}' have no match",
                account,
                matches.unmatched.len(),
                playlist.name
            );
        }

        info!("[{}] Creating '{}'", account, name);
        match materializer::materialize(
            connection.destination.as_ref(),
            &name,
            &description,
            &matches.ids,
        )
        .await
        {
            Ok(materialized) => {
                result.tracks_added = materialized.added;
                success!(
                    "[{}] '{}': {} of {} tracks added",
                    account,
                    name,
                    result.tracks_added,
                    result.tracks_found
                );
                SyncOutcome {
                    account: account.to_string(),
                    playlist: playlist.name.clone(),
                    state: SyncState::Done,
                    failed_in: None,
                    result,
                    destination: Some(materialized.playlist),
                    skipped_existing: false,
                    failure: None,
                }
            }
            Err(e) => failed(account, &playlist.name, SyncState::Materializing, result, &e),
        }
    }
}

fn failed(
    account: &str,
    playlist: &str,
    state: SyncState,
    result: SyncResult,
    error: &SyncError,
) -> SyncOutcome {
    warning!("[{}] '{}' failed while {}: {}", account, playlist, state, error);
    SyncOutcome {
        account: account.to_string(),
        playlist: playlist.to_string(),
        state: SyncState::Failed,
        failed_in: Some(state),
        result,
        destination: None,
        skipped_existing: false,
        failure: Some(error.to_string()),
    }
}
