use axum::{Extension, Router, routing::get};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::sync::Mutex;

use crate::{Res, api, types::PkceToken};

/// Serves `/health` and the OAuth `/callback` on `address` until aborted.
pub async fn start_api_server(state: Arc<Mutex<Option<PkceToken>>>, address: &str) -> Res<()> {
    let app = Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback).layer(Extension(state)));

    let addr = SocketAddr::from_str(address)
        .map_err(|e| format!("Failed to parse server address {address}: {e}"))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
