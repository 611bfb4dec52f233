use tabled::Table;

use crate::{
    config::Config,
    error, info, success,
    sync::{LiveConnector, Orchestrator, RunReport, SyncOptions},
    types::{ExtractMode, SyncOutcome, SyncTableRow},
    utils, warning,
};

/// Options of a sync run given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SyncArgs {
    pub accounts: Vec<String>,
    pub playlists: Vec<String>,
    pub mode: Option<ExtractMode>,
    pub date: Option<String>,
    pub concurrency: Option<usize>,
}

/// Syncs all configured (or selected) playlists and prints a summary.
///
/// Returns `false` if any playlist failed, so the caller can exit non-zero.
pub async fn sync(config: &Config, args: SyncArgs) -> bool {
    let today = match utils::get_date_from_string(args.date.as_deref()) {
        Ok(date) => date,
        Err(e) => error!("{}", e),
    };
    for index in &args.accounts {
        if config.account(index).is_none() {
            error!("Account {} is not configured.", index);
        }
    }

    let mode = args.mode.unwrap_or(config.sync.extract_mode);
    let connector = match LiveConnector::new(config, mode) {
        Ok(connector) => connector,
        Err(e) => error!("{}", e),
    };

    let mut options = SyncOptions::from_settings(&config.sync);
    options.today = today;
    if let Some(concurrency) = args.concurrency {
        options.concurrency = concurrency.max(1);
    }
    options.accounts = args.accounts;
    options.playlists = args.playlists;

    info!(
        "Syncing week of {} ({} mode)",
        utils::start_of_week(options.today),
        mode
    );

    let orchestrator = Orchestrator::new(connector, options);
    let report = orchestrator.run(&config.accounts).await;
    print_report(&report);

    !report.has_failures()
}

pub fn print_report(report: &RunReport) {
    if report.outcomes.is_empty() {
        warning!("Nothing to sync, no playlist matched the selection.");
        return;
    }

    let rows: Vec<SyncTableRow> = report.outcomes.iter().map(table_row).collect();
    println!("{}", Table::new(rows));

    let failed = report.failures().count();
    if failed == 0 {
        success!(
            "Sync {} finished, {} tracks added.",
            report.period,
            report.total_added()
        );
    } else {
        warning!(
            "Sync {} finished with {} failed playlist(s), {} tracks added.",
            report.period,
            failed,
            report.total_added()
        );
    }
}

fn table_row(outcome: &SyncOutcome) -> SyncTableRow {
    let note = match (&outcome.failure, &outcome.destination) {
        (Some(reason), _) => reason.clone(),
        (None, Some(playlist)) if outcome.skipped_existing => {
            format!("'{}' already exists", playlist.name)
        }
        (None, Some(playlist)) => format!("created '{}'", playlist.name),
        (None, None) => String::new(),
    };

    SyncTableRow {
        account: outcome.account.clone(),
        playlist: outcome.playlist.clone(),
        state: match outcome.failed_in {
            Some(state) => format!("failed ({state})"),
            None => outcome.state.to_string(),
        },
        found: outcome.result.tracks_found,
        matched: outcome.result.tracks_matched,
        added: outcome.result.tracks_added,
        note,
    }
}
