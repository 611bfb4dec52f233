//! Weekly Playlist Sync Library
//!
//! This library copies curated, weekly-rotating playlists (such as Spotify's
//! "Discover Weekly") from a source service to a destination service. It
//! contains the synchronization pipeline itself as well as the thin service
//! adapters, configuration handling and CLI commands built on top of it.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints for the local OAuth callback server
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration loading and parsing into [`config::Config`]
//! - `error` - The [`error::SyncError`] taxonomy used by the pipeline
//! - `management` - Token and track cache persistence
//! - `qobuz` - Qobuz API client (destination service)
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Spotify Web API client (source and destination service)
//! - `sync` - Extraction, matching, materialization and orchestration
//! - `types` - Data structures and wire types
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use discover_sync::{config, cli};
//!
//! #[tokio::main]
//! async fn main() -> discover_sync::Res<()> {
//!     config::load_env().await?;
//!     // Use CLI functions...
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod qobuz;
pub mod server;
pub mod spotify;
pub mod sync;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Provides a standard error handling pattern for the CLI glue code using a
/// boxed dynamic error trait object. The pipeline itself uses
/// [`error::SyncError`] so failures can be classified per playlist.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Extracting playlist {}...", name);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Added {} tracks", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only used for fatal start-up problems such as an unusable configuration.
/// Per-playlist failures are collected into the run report instead.
///
/// # Example
///
/// ```
/// error!("No accounts configured");
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// # Example
///
/// ```
/// warning!("Search failed for '{}', treating as no match", title);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
