use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Datelike, Duration, Local, NaiveDate};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Monday that starts the week `date` belongs to.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    let days_since_monday = date.weekday().num_days_from_monday();
    date - Duration::days(days_since_monday as i64)
}

/// Label of the sync period, e.g. `13-10-25` for the week starting
/// Monday 2025-10-13.
pub fn sync_period_label(date: NaiveDate) -> String {
    start_of_week(date).format("%d-%m-%y").to_string()
}

/// Name of the destination playlist for a logical playlist in the sync
/// period containing `date`.
pub fn weekly_playlist_name(logical_name: &str, date: NaiveDate) -> String {
    format!("{} {}", logical_name, sync_period_label(date))
}

pub fn weekly_playlist_description(logical_name: &str, date: NaiveDate) -> String {
    format!(
        "Copy of {} for the week of {}",
        logical_name,
        start_of_week(date).format("%Y-%m-%d")
    )
}

/// Parses an optional `YYYY-MM-DD` date, defaulting to today.
///
/// # Errors
///
/// Returns a message naming the expected format for malformed input.
pub fn get_date_from_string(date: Option<&str>) -> Result<NaiveDate, String> {
    match date {
        Some(date_str) => NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
            .map_err(|e| format!("invalid date '{date_str}', expected YYYY-MM-DD: {e}")),
        None => Ok(Local::now().date_naive()),
    }
}

/// Bare playlist id of a Spotify playlist reference.
///
/// Accepts `spotify:playlist:<id>` URIs and `https://open.spotify.com/playlist/<id>`
/// links (query and fragment are dropped); anything else is returned as is.
pub fn spotify_playlist_id(raw: &str) -> String {
    if let Some(id) = raw.strip_prefix("spotify:playlist:") {
        return id.to_string();
    }
    if raw.contains("open.spotify.com/") {
        if let Some((_, rest)) = raw.split_once("/playlist/") {
            return rest.split(['?', '#', '/']).next().unwrap_or_default().to_string();
        }
    }
    raw.to_string()
}

/// Joins artist names the way track rows display them.
pub fn join_artists<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|n| n.as_ref().trim().to_string())
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// File name safe variant of a logical playlist name.
pub fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "playlist".to_string()
    } else {
        stem
    }
}
