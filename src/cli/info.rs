use chrono::Utc;
use tabled::Table;

use crate::{
    config::Config,
    error, info,
    management::TokenManager,
    types::AccountTableRow,
    utils,
};

/// Displays the configured accounts and the current sync period.
///
/// Every source playlist of every account is listed with its destination and
/// the state of the cached Spotify token:
///
/// - `missing` - `discover-sync auth` has not been run for the account
/// - `expired` - the token will be refreshed on the next run
/// - `valid` - the token can be used as is
///
/// # Arguments
///
/// * `config` - Loaded configuration
/// * `date` - Optional `YYYY-MM-DD` date to compute the period for, defaults to today
pub async fn info(config: &Config, date: Option<String>) {
    let today = match utils::get_date_from_string(date.as_deref()) {
        Ok(date) => date,
        Err(e) => error!("{}", e),
    };
    let now = Utc::now().timestamp() as u64;

    let mut rows: Vec<AccountTableRow> = Vec::new();
    for account in &config.accounts {
        let token = match TokenManager::load(&account.index).await {
            Ok(tokens) if tokens.is_expired(now) => "expired",
            Ok(_) => "valid",
            Err(_) => "missing",
        };

        for playlist in &account.playlists {
            rows.push(AccountTableRow {
                account: account.index.clone(),
                playlist: playlist.name.clone(),
                id: playlist.id.clone(),
                destination: account.destination.to_string(),
                token: token.to_string(),
            });
        }
    }

    println!("{}", Table::new(rows));
    info!(
        "Sync period: week of {} (playlists named '<name> {}')",
        utils::start_of_week(today),
        utils::sync_period_label(today)
    );
    info!("Extract mode: {}", config.sync.extract_mode);
    info!("Track cache: {}", config.sync.cache_dir.display());
}
