//! # CLI Module
//!
//! User-facing commands of discover-sync. Each command loads what it needs
//! from the [`Config`](crate::config::Config), delegates to the
//! [`sync`](crate::sync) pipeline or the service clients and reports
//! progress with the crate's logging macros, spinners and tables.
//!
//! ## Commands
//!
//! - [`auth`] - Runs the Spotify OAuth PKCE flow for one account
//! - [`sync`] - Copies every selected playlist into this week's destination playlist
//! - [`extract`] - Extracts playlists into the local track cache without syncing
//! - [`info`] - Shows configured accounts, token state and the current period
//!
//! ## Usage
//!
//! ```bash
//! discover-sync auth --account 1        # Authenticate account 1
//! discover-sync sync                    # Sync all accounts
//! discover-sync sync --account 2 --playlist discover --mode scrape
//! discover-sync extract --account 1     # Refresh the track cache
//! discover-sync info
//! ```
//!
//! Failures of single playlists never abort a sync; [`sync`] returns `false`
//! when any playlist failed so the binary can exit non-zero.

mod auth;
mod extract;
mod info;
mod sync;

pub use auth::auth;
pub use extract::extract;
pub use info::info;
pub use sync::{SyncArgs, print_report, sync};
