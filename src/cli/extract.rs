use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::Config,
    error,
    management::TrackCacheManager,
    success,
    sync::{AccountConnector, LiveConnector},
    types::ExtractMode,
    warning,
};

/// Extracts playlists of one account and writes them to the track cache.
///
/// The cache files can be inspected by hand and are read back by a sync run
/// in `cache` mode.
pub async fn extract(
    config: &Config,
    account: String,
    playlists: Vec<String>,
    mode: Option<ExtractMode>,
) -> bool {
    let Some(account) = config.account(&account) else {
        error!("Account {} is not configured.", account);
    };

    let mode = mode.unwrap_or(config.sync.extract_mode);
    if mode == ExtractMode::Cache {
        error!("Extracting from the cache would only copy it, use api or scrape mode.");
    }

    let connector = match LiveConnector::new(config, mode) {
        Ok(connector) => connector,
        Err(e) => error!("{}", e),
    };
    let connection = match connector.connect(account).await {
        Ok(connection) => connection,
        Err(e) => error!("{}", e),
    };

    let mut ok = true;
    for playlist in account
        .playlists
        .iter()
        .filter(|p| playlists.is_empty() || playlists.contains(&p.name))
    {
        let pb = ProgressBar::new_spinner();
        pb.set_message(format!("Extracting {}...", playlist.name));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.blue} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        let result = connection.extractor.extract(playlist).await;
        pb.finish_and_clear();

        let tracks = match result {
            Ok(tracks) => tracks,
            Err(e) => {
                warning!("{}: {}", playlist.name, e);
                ok = false;
                continue;
            }
        };

        let mut cache =
            TrackCacheManager::for_playlist(&config.sync.cache_dir, &account.index, &playlist.name);
        let count = tracks.len();
        match cache.set_tracks(tracks).persist().await {
            Ok(()) => success!(
                "Saved {} tracks of {} to {}",
                count,
                playlist.name,
                cache.path().display()
            ),
            Err(e) => {
                warning!("Failed to save tracks of {}: {}", playlist.name, e);
                ok = false;
            }
        }
    }

    ok
}
