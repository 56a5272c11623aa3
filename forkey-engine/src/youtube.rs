/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Video title lookup against the YouTube Data API.
//!
//! [`YoutubeFetcher`] runs on the fetch worker: it downloads the video
//! resource and reduces it to the one-line summary posted to the channel.

use forkey_core::error::FetchError;
use forkey_worker::dispatch::Fetcher;
use forkey_worker::http::HttpFetcher;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

const VIDEOS_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/videos";

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^PT(?:(\d+)H(\d+)M(\d+)S|(\d+)M(\d+)S|(\d+)S)$")
        .expect("DURATION should compile")
});

#[derive(Debug, Deserialize)]
struct VideoList {
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    snippet: Snippet,
    #[serde(rename = "contentDetails")]
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

/// Builds the lookup URL for one video id.
#[must_use]
pub fn video_url(id: &str, key: &str) -> String {
    format!("{VIDEOS_ENDPOINT}?id={id}&part=snippet,contentDetails&key={key}")
}

/// Converts an ISO 8601 duration to `#h#m#s`, `#m#s` or `#s`.
///
/// Returns `None` for any other shape.
#[must_use]
pub fn format_duration(iso: &str) -> Option<String> {
    let caps = DURATION.captures(iso)?;
    let group = |i: usize| caps.get(i).map(|m| m.as_str());

    if let (Some(h), Some(m), Some(s)) = (group(1), group(2), group(3)) {
        return Some(format!("{h}h{m}m{s}s"));
    }
    if let (Some(m), Some(s)) = (group(4), group(5)) {
        return Some(format!("{m}m{s}s"));
    }
    group(6).map(|s| format!("{s}s"))
}

/// Reduces a videos API response to `\x02youtube\x02: <title> (<duration>)`.
///
/// # Errors
/// Returns `FetchError::Parse` if the body is not a video list or the list
/// is empty.
pub fn summarize(body: &str) -> Result<String, FetchError> {
    let list: VideoList =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    let video = list
        .items
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::Parse("no items in response".into()))?;

    let title = video.snippet.title;
    Ok(match format_duration(&video.content_details.duration) {
        Some(duration) => format!("\x02youtube\x02: {title} ({duration})"),
        None => format!("\x02youtube\x02: {title}"),
    })
}

/// Fetches a video resource and returns its summary line.
#[derive(Debug)]
pub struct YoutubeFetcher {
    http: HttpFetcher,
}

impl YoutubeFetcher {
    /// Wraps `http`.
    #[must_use]
    pub const fn new(http: HttpFetcher) -> Self {
        Self { http }
    }
}

impl Fetcher for YoutubeFetcher {
    fn fetch(&mut self, target: &str) -> Result<String, FetchError> {
        let body = self.http.fetch(target)?;
        summarize(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_url() {
        assert_eq!(
            video_url("abc", "KEY"),
            "https://www.googleapis.com/youtube/v3/videos?id=abc&part=snippet,contentDetails&key=KEY"
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration("PT1H2M3S").as_deref(), Some("1h2m3s"));
        assert_eq!(format_duration("PT4M13S").as_deref(), Some("4m13s"));
        assert_eq!(format_duration("PT59S").as_deref(), Some("59s"));
        assert_eq!(format_duration("PT1H5S"), None);
        assert_eq!(format_duration("P1DT2H"), None);
        assert_eq!(format_duration(""), None);
    }

    #[test]
    fn test_summarize_with_duration() {
        let body = r#"{"items":[{"snippet":{"title":"Never Gonna"},"contentDetails":{"duration":"PT3M33S"}}]}"#;
        assert_eq!(
            summarize(body).unwrap(),
            "\x02youtube\x02: Never Gonna (3m33s)"
        );
    }

    #[test]
    fn test_summarize_without_duration() {
        let body = r#"{"items":[{"snippet":{"title":"Live"},"contentDetails":{"duration":"P0D"}}]}"#;
        assert_eq!(summarize(body).unwrap(), "\x02youtube\x02: Live");
    }

    #[test]
    fn test_summarize_rejects_empty_or_malformed() {
        assert!(matches!(summarize(r#"{"items":[]}"#), Err(FetchError::Parse(_))));
        assert!(matches!(summarize("<html>"), Err(FetchError::Parse(_))));
    }
}
