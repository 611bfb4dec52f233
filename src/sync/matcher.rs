use async_trait::async_trait;

use crate::{error::SyncError, types::Track, warning};

/// Structured search for a single track.
///
/// Destinations render it into their own query syntax; services with field
/// filters search title and artist separately to favour precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackQuery {
    pub title: String,
    pub artist: String,
}

impl TrackQuery {
    /// `track:<title> artist:<artist>`
    pub fn field_filtered(&self) -> String {
        if self.artist.is_empty() {
            format!("track:{}", self.title)
        } else {
            format!("track:{} artist:{}", self.title, self.artist)
        }
    }

    /// `<title> <artist>` for services without field filters.
    pub fn free_text(&self) -> String {
        format!("{} {}", self.title, self.artist).trim().to_string()
    }
}

impl From<&Track> for TrackQuery {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
        }
    }
}

/// Track search capability of a destination service.
#[async_trait]
pub trait TrackSearch: Send + Sync {
    /// Returns the ids of at most `limit` results, best match first.
    async fn search_tracks(&self, query: &TrackQuery, limit: u32) -> Result<Vec<String>, SyncError>;
}

/// Resolves a track to the id of the first search result.
///
/// Issues exactly one query with `limit = 1`. No results is `Ok(None)`, not an
/// error. Titles and artists are passed through unchanged.
pub async fn match_track<S: TrackSearch + ?Sized>(
    track: &Track,
    search: &S,
) -> Result<Option<String>, SyncError> {
    let ids = search.search_tracks(&TrackQuery::from(track), 1).await?;
    Ok(ids.into_iter().next())
}

#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    /// Matched ids in source order.
    pub ids: Vec<String>,
    pub unmatched: Vec<Track>,
    pub failed_searches: usize,
}

/// Matches every track in order.
///
/// A failed search only affects its own track: it is reported and the track
/// counts as unmatched.
pub async fn match_all<S: TrackSearch + ?Sized>(tracks: &[Track], search: &S) -> MatchReport {
    let mut report = MatchReport::default();
    for track in tracks {
        match match_track(track, search).await {
            Ok(Some(id)) => report.ids.push(id),
            Ok(None) => report.unmatched.push(track.clone()),
            Err(e) => {
                warning!(
                    "Search failed for '{}' by '{}': {}",
                    track.title,
                    track.artist,
                    e
                );
                report.failed_searches += 1;
                report.unmatched.push(track.clone());
            }
        }
    }
    report
}
