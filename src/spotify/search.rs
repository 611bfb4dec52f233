use async_trait::async_trait;

use crate::{
    error::SyncError,
    spotify::SpotifyClient,
    sync::{TrackQuery, TrackSearch},
    types::SearchResponse,
};

#[async_trait]
impl TrackSearch for SpotifyClient {
    /// Searches with `track:` and `artist:` field filters and returns track
    /// URIs, which is what the add-tracks endpoint expects.
    async fn search_tracks(
        &self,
        query: &TrackQuery,
        limit: u32,
    ) -> Result<Vec<String>, SyncError> {
        let params = [
            ("q", query.field_filtered()),
            ("type", "track".to_string()),
            ("limit", limit.to_string()),
        ];

        let response: SearchResponse = self
            .get_json(&self.endpoint("search"), &params, false)
            .await
            .map_err(|e| SyncError::Search(e.to_string()))?;

        Ok(response
            .tracks
            .map(|t| t.items.into_iter().map(|item| item.uri).collect())
            .unwrap_or_default())
    }
}
