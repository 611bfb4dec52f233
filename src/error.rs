use thiserror::Error;

/// Failure taxonomy of the synchronization pipeline.
///
/// Every variant except [`SyncError::Config`] is caught at the
/// (account, playlist) granularity and turned into a failure record of the
/// run report. A track without a match is not an error at all; the matcher
/// returns `None` for it.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Credential exchange or refresh failed, or no cached token exists.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Fetching or rendering the source playlist failed.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// A destination track search failed. Only affects the searched track.
    #[error("search failed: {0}")]
    Search(String),

    /// Looking up, creating or populating the destination playlist failed.
    #[error("materialization failed: {0}")]
    Materialization(String),

    /// Unusable configuration. Fatal for the whole run.
    #[error("invalid configuration: {0}")]
    Config(String),
}
