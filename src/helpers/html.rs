//! HTML helper functions

/// Escape HTML special characters
///
/// Also installed as the template engine's escape function, so `/` in
/// URLs is left alone.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Count words in plain text
pub fn count_words(text: &str) -> usize {
    text.split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="/x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;/x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("Olá, mundo  —  tudo bem?"), 4);
        assert_eq!(count_words(""), 0);
    }
}
