/// Snippet extraction and match highlighting
///
/// All output is HTML-escaped; the only markup emitted is `<mark>` around
/// case-insensitive occurrences of the query.
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

pub const DEFAULT_SNIPPET_LENGTH: usize = 200;

const ELLIPSIS: &str = "...";

lazy_static! {
    static ref TAG_PATTERN: Regex = Regex::new(r"<[^>]+>").expect("valid tag pattern");
}

/// Remove anything that looks like an HTML tag
pub fn strip_html(text: &str) -> String {
    TAG_PATTERN.replace_all(text, "").into_owned()
}

fn query_matcher(query: &str) -> Option<Regex> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .ok()
}

/// HTML-escape `text` and wrap every occurrence of `query` in `<mark>`
///
/// Matching runs on the raw text so a query can never land inside an entity.
pub fn highlight(text: &str, query: &str) -> String {
    let Some(matcher) = query_matcher(query) else {
        return html_escape::encode_text(text).into_owned();
    };

    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;
    for found in matcher.find_iter(text) {
        out.push_str(&html_escape::encode_text(&text[last..found.start()]));
        out.push_str("<mark>");
        out.push_str(&html_escape::encode_text(found.as_str()));
        out.push_str("</mark>");
        last = found.end();
    }
    out.push_str(&html_escape::encode_text(&text[last..]));
    out
}

/// Build a highlighted excerpt of `content` around the first match of `query`
///
/// The window reaches `max_length / 3` characters either side of the match.
/// Without a match the excerpt is the first `max_length` characters.
pub fn build_snippet(content: &str, query: &str, max_length: usize) -> String {
    let text = strip_html(content);
    let chars: Vec<char> = text.chars().collect();

    let first_match = query_matcher(query).and_then(|matcher| {
        matcher.find(&text).map(|found| {
            let start = text[..found.start()].chars().count();
            let len = found.as_str().chars().count();
            (start, len)
        })
    });

    let (start, end) = match first_match {
        Some((position, len)) => {
            let radius = max_length / 3;
            (
                position.saturating_sub(radius),
                (position + len + radius).min(chars.len()),
            )
        }
        None => (0, max_length.min(chars.len())),
    };

    let mut excerpt: String = chars[start..end].iter().collect();
    if start > 0 {
        excerpt.insert_str(0, ELLIPSIS);
    }
    if end < chars.len() {
        excerpt.push_str(ELLIPSIS);
    }

    highlight(&excerpt, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
    }

    #[test]
    fn test_highlight_case_insensitive() {
        assert_eq!(
            highlight("ROS2 and ros2", "Ros2"),
            "<mark>ROS2</mark> and <mark>ros2</mark>"
        );
    }

    #[test]
    fn test_highlight_escapes_html() {
        assert_eq!(
            highlight("<b>a & b</b>", "a & b"),
            "&lt;b&gt;<mark>a &amp; b</mark>&lt;/b&gt;"
        );
    }

    #[test]
    fn test_highlight_never_splits_entities() {
        assert_eq!(
            highlight("Tom & Jerry amplifier", "amp"),
            "Tom &amp; Jerry <mark>amp</mark>lifier"
        );
        assert_eq!(
            build_snippet("x < y alternative", "lt", 200),
            "x &lt; y a<mark>lt</mark>ernative"
        );
    }

    #[test]
    fn test_highlight_treats_query_literally() {
        assert_eq!(highlight("cost (usd)", "(usd)"), "cost <mark>(usd)</mark>");
        assert_eq!(highlight("abc", "a.c"), "abc");
    }

    #[test]
    fn test_snippet_short_content_untouched() {
        assert_eq!(
            build_snippet("<p>Intro to ROS2</p>", "ros2", 200),
            "Intro to <mark>ROS2</mark>"
        );
    }

    #[test]
    fn test_snippet_window_around_match() {
        let content = format!("{}needle{}", "a".repeat(300), "b".repeat(300));
        let snippet = build_snippet(&content, "needle", 30);

        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.contains(&format!("{}<mark>needle</mark>{}", "a".repeat(10), "b".repeat(10))));
        assert!(!snippet.contains(&"a".repeat(11)));
    }

    #[test]
    fn test_snippet_without_match_takes_prefix() {
        let content = "x".repeat(500);
        let snippet = build_snippet(&content, "missing", 200);
        assert_eq!(snippet, format!("{}...", "x".repeat(200)));
    }

    #[test]
    fn test_snippet_handles_multibyte_text() {
        let content = format!("{}Überblick{}", "ä".repeat(100), "ö".repeat(100));
        let snippet = build_snippet(&content, "überblick", 30);
        assert!(snippet.contains("<mark>Überblick</mark>"));
    }
}
