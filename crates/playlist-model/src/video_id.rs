//! External video identifier normalization.

/// Reduce a URL or bare identifier to the video identifier.
///
/// Bare identifiers (no `/`, `?` or `&`, at least 8 characters) are kept.
/// Recognized URL shapes:
/// - `https://youtu.be/<id>`
/// - `https://www.youtube.com/watch?v=<id>&...`
/// - `https://www.youtube.com/{embed,shorts,live,v}/<id>`
///
/// A YouTube URL without a recognizable id yields an empty string. Anything
/// else is returned trimmed but otherwise unchanged.
pub fn extract_video_id(url_or_id: &str) -> String {
    let s = url_or_id.trim();
    if s.is_empty() {
        return String::new();
    }
    if !s.contains(['/', '?', '&']) && s.chars().count() >= 8 {
        return s.to_string();
    }

    let without_scheme = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s);
    let (host, rest) = match without_scheme.find('/') {
        Some(pos) => (&without_scheme[..pos], &without_scheme[pos..]),
        None => (without_scheme, ""),
    };
    let host = host.to_ascii_lowercase();
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, query),
        None => (rest, ""),
    };
    let path = path.split('#').next().unwrap_or("");
    let query = query.split('#').next().unwrap_or("");

    if host.ends_with("youtu.be") {
        let id = path.trim_matches('/');
        return id.split('/').next().unwrap_or(id).to_string();
    } else if host.ends_with("youtube.com") || host.ends_with("youtube-nocookie.com") {
        if let Some(id) = query_param(query, "v") {
            return id.to_string();
        }
        let mut segments = path.split('/').filter(|seg| !seg.is_empty());
        if let (Some(kind), Some(id)) = (segments.next(), segments.next()) {
            if matches!(kind, "embed" | "shorts" | "live" | "v") {
                return id.to_string();
            }
        }
        return String::new();
    }

    s.to_string()
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, v)| *k == key && !v.is_empty())
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_id_is_kept() {
        assert_eq!(extract_video_id("  dQw4w9WgXcQ "), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL123&index=2"),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://m.youtube.com/watch?feature=share&v=abcdefghijk"),
            "abcdefghijk"
        );
    }

    #[test]
    fn test_short_link() {
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ?t=42"), "dQw4w9WgXcQ");
        assert_eq!(extract_video_id("youtu.be/dQw4w9WgXcQ"), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_path_forms() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://youtube.com/shorts/abcdefghijk?feature=share"),
            "abcdefghijk"
        );
    }

    #[test]
    fn test_unrecognized_input_is_passed_through() {
        assert_eq!(extract_video_id("short"), "short");
        assert_eq!(
            extract_video_id("https://vimeo.com/123456789"),
            "https://vimeo.com/123456789"
        );
        assert_eq!(extract_video_id("   "), "");
    }

    #[test]
    fn test_youtube_url_without_id_is_empty() {
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v="), "");
        assert_eq!(extract_video_id("https://youtu.be/"), "");
        assert_eq!(extract_video_id("https://www.youtube.com/channel/UC123"), "");
    }

    proptest::proptest! {
        #[test]
        fn prop_every_url_form_yields_the_id(id in "[A-Za-z0-9_-]{11}") {
            let forms = [
                id.clone(),
                format!("https://www.youtube.com/watch?v={id}"),
                format!("https://youtube.com/watch?list=PL1&v={id}&t=3"),
                format!("https://youtu.be/{id}"),
                format!("http://www.youtube.com/embed/{id}?autoplay=1"),
            ];
            for form in forms {
                proptest::prop_assert_eq!(extract_video_id(&form), id.clone());
            }
        }
    }
}
