use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use discover_sync::{
    config::{Account, Credentials},
    error::SyncError,
    management::TrackCacheManager,
    sync::{
        AccountConnector, Connection, Destination, Orchestrator, PlaylistOptions, PlaylistWriter,
        SyncOptions, TrackExtractor, TrackQuery, TrackSearch,
    },
    types::{DestinationKind, PlaylistRef, SyncState, Track},
};

/// Source side: tracks per playlist id, optionally delayed.
#[derive(Default)]
struct StubExtractor {
    tracks: HashMap<String, Vec<Track>>,
    failing: Vec<String>,
    delays: HashMap<String, u64>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubExtractor {
    fn with(mut self, id: &str, tracks: Vec<Track>) -> Self {
        self.tracks.insert(id.to_string(), tracks);
        self
    }
}

#[async_trait]
impl TrackExtractor for StubExtractor {
    async fn extract(&self, playlist: &PlaylistRef) -> Result<Vec<Track>, SyncError> {
        self.calls.lock().unwrap().push(playlist.id.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(ms) = self.delays.get(&playlist.id) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&playlist.id) {
            return Err(SyncError::Extraction("page did not render".to_string()));
        }
        Ok(self.tracks.get(&playlist.id).cloned().unwrap_or_default())
    }
}

/// Destination side: a title keyed catalogue and an in-memory playlist store.
#[derive(Default)]
struct StubDestination {
    catalogue: HashMap<String, String>,
    existing: Vec<String>,
    lookup_fails: bool,
    created: Mutex<Vec<String>>,
    added: Mutex<HashMap<String, Vec<String>>>,
}

impl StubDestination {
    fn knows(mut self, titles: &[&str]) -> Self {
        for title in titles {
            self.catalogue
                .insert(title.to_string(), format!("uri:{}", title.to_lowercase()));
        }
        self
    }
}

#[async_trait]
impl TrackSearch for StubDestination {
    async fn search_tracks(
        &self,
        query: &TrackQuery,
        _limit: u32,
    ) -> Result<Vec<String>, SyncError> {
        Ok(self.catalogue.get(&query.title).cloned().into_iter().collect())
    }
}

#[async_trait]
impl PlaylistWriter for StubDestination {
    fn max_items_per_call(&self) -> usize {
        2
    }

    async fn find_playlist(&self, name: &str) -> Result<Option<PlaylistRef>, SyncError> {
        if self.lookup_fails {
            return Err(SyncError::Materialization("lookup failed".to_string()));
        }
        let created = self.created.lock().unwrap();
        Ok(self
            .existing
            .iter()
            .chain(created.iter())
            .find(|n| n.as_str() == name)
            .map(|n| PlaylistRef::destination(format!("id-{n}"), n.clone())))
    }

    async fn create_playlist(
        &self,
        name: &str,
        _description: &str,
        _options: &PlaylistOptions,
    ) -> Result<PlaylistRef, SyncError> {
        self.created.lock().unwrap().push(name.to_string());
        Ok(PlaylistRef::destination(format!("id-{name}"), name))
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<(), SyncError> {
        self.added
            .lock()
            .unwrap()
            .entry(playlist_id.to_string())
            .or_default()
            .extend(track_ids.iter().cloned());
        Ok(())
    }
}

#[derive(Default)]
struct StubConnector {
    services: HashMap<String, (Arc<StubExtractor>, Arc<StubDestination>)>,
    unauthorized: Vec<String>,
    connects: Mutex<Vec<String>>,
}

impl StubConnector {
    fn with(
        mut self,
        account: &str,
        extractor: &Arc<StubExtractor>,
        destination: &Arc<StubDestination>,
    ) -> Self {
        self.services.insert(
            account.to_string(),
            (Arc::clone(extractor), Arc::clone(destination)),
        );
        self
    }
}

#[async_trait]
impl AccountConnector for StubConnector {
    async fn connect(&self, account: &Account) -> Result<Connection, SyncError> {
        self.connects.lock().unwrap().push(account.index.clone());
        if self.unauthorized.contains(&account.index) {
            return Err(SyncError::Auth("invalid_grant".to_string()));
        }
        let (extractor, destination) = self
            .services
            .get(&account.index)
            .ok_or_else(|| SyncError::Auth("unknown account".to_string()))?;
        Ok(Connection {
            extractor: Arc::clone(extractor) as Arc<dyn TrackExtractor>,
            destination: Arc::clone(destination) as Arc<dyn Destination>,
        })
    }
}

fn account(index: &str, playlists: &[(&str, &str)]) -> Account {
    Account {
        index: index.to_string(),
        credentials: Credentials {
            spotify_client_id: format!("client-{index}"),
            spotify_client_secret: None,
            qobuz: None,
        },
        playlists: playlists
            .iter()
            .map(|(name, id)| PlaylistRef::source(*id, *name))
            .collect(),
        destination: DestinationKind::Spotify,
    }
}

fn options(concurrency: usize) -> SyncOptions {
    SyncOptions {
        // Wednesday, the period starts on Monday 2025-10-13
        today: NaiveDate::from_ymd_opt(2025, 10, 15).unwrap(),
        concurrency,
        cache_dir: None,
        accounts: Vec::new(),
        playlists: Vec::new(),
    }
}

fn tracks(titles: &[&str]) -> Vec<Track> {
    titles.iter().map(|t| Track::new(*t, "Artist")).collect()
}

#[tokio::test]
async fn test_sync_creates_weekly_playlist() {
    let extractor = Arc::new(StubExtractor::default().with("dw", tracks(&["One", "Two", "Three"])));
    let destination = Arc::new(StubDestination::default().knows(&["One", "Three"]));
    let connector = StubConnector::default().with("1", &extractor, &destination);
    let orchestrator = Orchestrator::new(connector, options(1));

    let report = orchestrator
        .run(&[account("1", &[("Discover Weekly", "dw")])])
        .await;

    assert_eq!(report.period, "13-10-25");
    assert_eq!(report.outcomes.len(), 1);
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.state, SyncState::Done);
    assert!(!outcome.skipped_existing);
    assert_eq!(outcome.result.playlist_name, "Discover Weekly 13-10-25");
    assert_eq!(outcome.result.tracks_found, 3);
    assert_eq!(outcome.result.tracks_matched, 2);
    assert_eq!(outcome.result.tracks_added, 2);
    assert!(outcome.result.is_consistent());
    assert!(!report.has_failures());
    assert_eq!(report.total_added(), 2);

    assert_eq!(
        *destination.created.lock().unwrap(),
        vec!["Discover Weekly 13-10-25".to_string()]
    );
    assert_eq!(
        destination.added.lock().unwrap()["id-Discover Weekly 13-10-25"],
        ["uri:one", "uri:three"]
    );
}

#[tokio::test]
async fn test_second_run_in_same_week_is_skipped() {
    let extractor = Arc::new(StubExtractor::default().with("dw", tracks(&["One"])));
    let destination = Arc::new(StubDestination::default().knows(&["One"]));
    let connector = StubConnector::default().with("1", &extractor, &destination);
    let accounts = [account("1", &[("Discover Weekly", "dw")])];

    let first = Orchestrator::new(connector, options(1)).run(&accounts).await;
    assert_eq!(first.outcomes[0].result.tracks_added, 1);

    let connector = StubConnector::default().with("1", &extractor, &destination);
    let mut later = options(1);
    later.today = NaiveDate::from_ymd_opt(2025, 10, 19).unwrap();
    let second = Orchestrator::new(connector, later).run(&accounts).await;

    let outcome = &second.outcomes[0];
    assert_eq!(outcome.state, SyncState::Done);
    assert!(outcome.skipped_existing);
    assert_eq!(outcome.result.tracks_found, 0);
    assert_eq!(outcome.result.tracks_added, 0);
    assert_eq!(destination.created.lock().unwrap().len(), 1);
    // guard runs before extraction
    assert_eq!(extractor.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_existing_playlist_skips_extraction() {
    let extractor = Arc::new(StubExtractor::default().with("dw", tracks(&["One"])));
    let destination = Arc::new(StubDestination {
        existing: vec!["Discover Weekly 13-10-25".to_string()],
        ..StubDestination::default()
    });
    let connector = StubConnector::default().with("1", &extractor, &destination);

    let report = Orchestrator::new(connector, options(1))
        .run(&[account("1", &[("Discover Weekly", "dw")])])
        .await;

    let outcome = &report.outcomes[0];
    assert!(outcome.skipped_existing);
    assert_eq!(
        outcome.destination.as_ref().map(|p| p.id.as_str()),
        Some("id-Discover Weekly 13-10-25")
    );
    assert!(extractor.calls.lock().unwrap().is_empty());
    assert!(destination.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_account_does_not_stop_others() {
    let extractor = Arc::new(StubExtractor::default().with("dw2", tracks(&["One"])));
    let destination = Arc::new(StubDestination::default().knows(&["One"]));
    let connector = StubConnector {
        unauthorized: vec!["1".to_string()],
        ..StubConnector::default()
    }
    .with("2", &extractor, &destination);

    let report = Orchestrator::new(connector, options(2))
        .run(&[
            account("1", &[("Discover Weekly", "dw1"), ("Release Radar", "rr1")]),
            account("2", &[("Discover Weekly", "dw2")]),
        ])
        .await;

    assert_eq!(report.outcomes.len(), 3);
    for failed in &report.outcomes[..2] {
        assert_eq!(failed.account, "1");
        assert_eq!(failed.state, SyncState::Failed);
        assert_eq!(failed.failed_in, Some(SyncState::Pending));
        assert!(failed.failure.as_deref().unwrap().contains("invalid_grant"));
        assert_eq!(failed.result.tracks_added, 0);
    }
    assert_eq!(report.outcomes[0].playlist, "Discover Weekly");
    assert_eq!(report.outcomes[1].playlist, "Release Radar");

    let ok = &report.outcomes[2];
    assert_eq!(ok.account, "2");
    assert_eq!(ok.state, SyncState::Done);
    assert_eq!(ok.result.tracks_added, 1);
    assert_eq!(report.failures().count(), 2);
}

#[tokio::test]
async fn test_extraction_failure_is_recorded() {
    let extractor = Arc::new(StubExtractor {
        failing: vec!["broken".to_string()],
        ..StubExtractor::default().with("ok", tracks(&["One"]))
    });
    let destination = Arc::new(StubDestination::default().knows(&["One"]));
    let connector = StubConnector::default().with("1", &extractor, &destination);

    let report = Orchestrator::new(connector, options(1))
        .run(&[account("1", &[("Broken", "broken"), ("Working", "ok")])])
        .await;

    let broken = &report.outcomes[0];
    assert_eq!(broken.state, SyncState::Failed);
    assert_eq!(broken.failed_in, Some(SyncState::Extracting));
    assert!(broken.failure.as_deref().unwrap().starts_with("extraction failed"));
    assert_eq!(report.outcomes[1].state, SyncState::Done);

    // nothing was created for the broken playlist
    assert_eq!(
        *destination.created.lock().unwrap(),
        vec!["Working 13-10-25".to_string()]
    );
}

#[tokio::test]
async fn test_failed_lookup_is_not_treated_as_absent() {
    let extractor = Arc::new(StubExtractor::default().with("dw", tracks(&["One"])));
    let destination = Arc::new(StubDestination {
        lookup_fails: true,
        ..StubDestination::default()
    });
    let connector = StubConnector::default().with("1", &extractor, &destination);

    let report = Orchestrator::new(connector, options(1))
        .run(&[account("1", &[("Discover Weekly", "dw")])])
        .await;

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.state, SyncState::Failed);
    assert_eq!(outcome.failed_in, Some(SyncState::Pending));
    assert!(destination.created.lock().unwrap().is_empty());
    assert!(extractor.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_match_creates_empty_playlist() {
    let extractor = Arc::new(StubExtractor::default().with("dw", tracks(&["Unknown"])));
    let destination = Arc::new(StubDestination::default());
    let connector = StubConnector::default().with("1", &extractor, &destination);

    let report = Orchestrator::new(connector, options(1))
        .run(&[account("1", &[("Discover Weekly", "dw")])])
        .await;

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.state, SyncState::Done);
    assert_eq!(outcome.result.tracks_found, 1);
    assert_eq!(outcome.result.tracks_matched, 0);
    assert_eq!(outcome.result.tracks_added, 0);
    assert_eq!(destination.created.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_runs_keep_configuration_order() {
    let mut extractor = StubExtractor::default()
        .with("a", tracks(&["One"]))
        .with("b", tracks(&["Two"]))
        .with("c", tracks(&["Three"]));
    extractor.delays.insert("a".to_string(), 60);
    extractor.delays.insert("b".to_string(), 30);
    let extractor = Arc::new(extractor);
    let destination = Arc::new(StubDestination::default().knows(&["One", "Two", "Three"]));
    let connector = StubConnector::default().with("1", &extractor, &destination);

    let report = Orchestrator::new(connector, options(3))
        .run(&[account("1", &[("A", "a"), ("B", "b"), ("C", "c")])])
        .await;

    let playlists: Vec<&str> = report.outcomes.iter().map(|o| o.playlist.as_str()).collect();
    assert_eq!(playlists, ["A", "B", "C"]);
    assert!(report.outcomes.iter().all(|o| o.result.tracks_added == 1));
    assert_eq!(extractor.max_in_flight.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_default_concurrency_is_sequential() {
    let mut extractor = StubExtractor::default()
        .with("a", tracks(&["One"]))
        .with("b", tracks(&["Two"]));
    extractor.delays.insert("a".to_string(), 20);
    let extractor = Arc::new(extractor);
    let destination = Arc::new(StubDestination::default().knows(&["One", "Two"]));
    let connector = StubConnector::default().with("1", &extractor, &destination);

    Orchestrator::new(connector, options(1))
        .run(&[account("1", &[("A", "a"), ("B", "b")])])
        .await;

    assert_eq!(extractor.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(*extractor.calls.lock().unwrap(), ["a", "b"]);
}

#[tokio::test]
async fn test_filters_select_accounts_and_playlists() {
    let extractor = Arc::new(
        StubExtractor::default()
            .with("dw", tracks(&["One"]))
            .with("rr", tracks(&["Two"])),
    );
    let destination = Arc::new(StubDestination::default().knows(&["One", "Two"]));
    let connector = StubConnector::default()
        .with("1", &extractor, &destination)
        .with("2", &extractor, &destination);
    let mut opts = options(1);
    opts.accounts = vec!["2".to_string()];
    opts.playlists = vec!["Release Radar".to_string()];
    let orchestrator = Orchestrator::new(connector, opts);

    let report = orchestrator
        .run(&[
            account("1", &[("Release Radar", "rr")]),
            account("2", &[("Discover Weekly", "dw"), ("Release Radar", "rr")]),
            account("3", &[("Discover Weekly", "dw")]),
        ])
        .await;

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].account, "2");
    assert_eq!(report.outcomes[0].playlist, "Release Radar");
    assert_eq!(*extractor.calls.lock().unwrap(), ["rr"]);
}

#[tokio::test]
async fn test_extracted_tracks_are_cached() {
    let dir = tempfile::tempdir().unwrap();
    let extracted = tracks(&["One", "Two"]);
    let extractor = Arc::new(StubExtractor::default().with("dw", extracted.clone()));
    let destination = Arc::new(StubDestination::default());
    let connector = StubConnector::default().with("1", &extractor, &destination);
    let mut opts = options(1);
    opts.cache_dir = Some(dir.path().to_path_buf());

    Orchestrator::new(connector, opts)
        .run(&[account("1", &[("Discover Weekly", "dw")])])
        .await;

    let cached = TrackCacheManager::for_playlist(dir.path(), "1", "Discover Weekly")
        .load()
        .await
        .unwrap();
    assert_eq!(cached.tracks(), extracted.as_slice());
}
