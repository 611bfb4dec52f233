//! # API Module
//!
//! HTTP endpoints of the short-lived local server that runs during
//! `discover-sync auth`.
//!
//! ## Endpoints
//!
//! - [`callback`] - Receives the authorization code from Spotify's
//!   authorization server and exchanges it, together with the PKCE code
//!   verifier, for an access token. The token is stored in the shared state
//!   the `auth` command is polling.
//! - [`health`] - Reports status, name and version of the running binary.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use discover_sync::api::{callback, health};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
