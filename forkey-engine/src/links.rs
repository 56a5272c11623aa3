/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Video link extraction.

use regex::Regex;
use std::sync::LazyLock;

/// Ids this long or longer are ignored.
pub const MAX_ID_LENGTH: usize = 16;

static VIDEO_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"youtu(?:\.be/|be\.com/watch\?\S*?v=|be\.com/embed/)([A-Za-z0-9_-]+)")
        .expect("VIDEO_LINK should compile")
});

/// Finds video ids in `text`, in order of appearance.
///
/// Recognizes `youtu.be/<id>`, `youtube.com/watch?...v=<id>` and
/// `youtube.com/embed/<id>`.
#[must_use]
pub fn find_youtube_ids(text: &str) -> Vec<&str> {
    VIDEO_LINK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|id| id.as_str())
        .filter(|id| id.len() < MAX_ID_LENGTH)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_link() {
        assert_eq!(find_youtube_ids("look https://youtu.be/dQw4w9WgXcQ"), vec!["dQw4w9WgXcQ"]);
    }

    #[test]
    fn test_watch_link_with_extra_params() {
        assert_eq!(
            find_youtube_ids("https://www.youtube.com/watch?feature=share&v=a-b_c123 ok"),
            vec!["a-b_c123"]
        );
    }

    #[test]
    fn test_embed_link() {
        assert_eq!(find_youtube_ids("youtube.com/embed/XyZ"), vec!["XyZ"]);
    }

    #[test]
    fn test_multiple_links_in_order() {
        let text = "youtu.be/first and https://youtube.com/watch?v=second";
        assert_eq!(find_youtube_ids(text), vec!["first", "second"]);
    }

    #[test]
    fn test_overlong_id_skipped() {
        assert!(find_youtube_ids("youtu.be/0123456789abcdef").is_empty());
        assert_eq!(find_youtube_ids("youtu.be/0123456789abcde"), vec!["0123456789abcde"]);
    }

    #[test]
    fn test_no_links() {
        assert!(find_youtube_ids("youtube is great").is_empty());
        assert!(find_youtube_ids("").is_empty());
    }
}
