use regex::Regex;
use std::sync::OnceLock;

/// Longest prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn source_paren_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[(（]\s*(source|出典|reference|ソース)\s*[:：][^)）]*[)）]")
            .expect("valid source annotation regex")
    })
}

/// A line that is nothing but a citation.
fn source_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*(source|出典|reference|ソース)[ \t]*[:：].*$")
            .expect("valid source line regex")
    })
}

/// A citation trailing the last sentence of the text on the same line.
fn source_tail_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([.。!?！？])[ \t]*(source|出典|reference|ソース)[ \t]*[:：][^\n]*$")
            .expect("valid trailing source regex")
    })
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s)）]+").expect("valid url regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s{2,}").expect("valid whitespace regex"))
}

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag regex"))
}

/// Removes citations and links the model inserted on its own, then appends
/// the one canonical citation for `url`.
pub fn clean_explanation(explanation: &str, url: &str) -> String {
    let cleaned = source_paren_re().replace_all(explanation, "");
    let cleaned = source_line_re().replace_all(&cleaned, "");
    let cleaned = source_tail_re().replace(cleaned.trim_end(), "$1");
    let cleaned = url_re().replace_all(&cleaned, "");
    let cleaned = whitespace_re().replace_all(&cleaned, " ");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        format!("(Source: {})", url)
    } else {
        format!("{} (Source: {})", cleaned, url)
    }
}

pub fn strip_html_tags(s: &str) -> String {
    html_tag_re().replace_all(s, "").into_owned()
}

/// First sentence of `content`, cut at the first `.`/`。` or line break.
pub fn first_sentence(content: &str) -> &str {
    let trimmed = content.trim_start();
    let end = trimmed
        .char_indices()
        .find(|(i, c)| {
            *c == '。'
                || *c == '\n'
                || (*c == '.'
                    && trimmed[i + 1..]
                        .chars()
                        .next()
                        .map_or(true, char::is_whitespace))
        })
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[..end].trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://en.wikipedia.org/wiki/Astronomy";

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("天文学です", 2), "天文");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn explanation_drops_inline_sources_and_urls() {
        let raw = "Jupiter is the largest planet.  (Source: https://example.com/x) See https://foo.bar/baz for more";
        assert_eq!(
            clean_explanation(raw, URL),
            format!("Jupiter is the largest planet. See for more (Source: {})", URL)
        );
    }

    #[test]
    fn explanation_drops_japanese_annotations() {
        let raw = "木星は最大の惑星です。（出典：ウィキペディア）";
        assert_eq!(
            clean_explanation(raw, URL),
            format!("木星は最大の惑星です。 (Source: {})", URL)
        );
    }

    #[test]
    fn explanation_drops_trailing_source_line() {
        let raw = "Mars has two moons.\nReference: NASA fact sheet";
        assert_eq!(
            clean_explanation(raw, URL),
            format!("Mars has two moons. (Source: {})", URL)
        );
    }

    #[test]
    fn explanation_drops_citation_after_last_sentence() {
        let raw = "Saturn has rings. Source: NASA";
        assert_eq!(
            clean_explanation(raw, URL),
            format!("Saturn has rings. (Source: {})", URL)
        );
    }

    #[test]
    fn explanation_keeps_prose_mentioning_source_or_resource() {
        let fusion = "Fusion is the Sun's main energy source: it turns hydrogen into helium.";
        assert_eq!(clean_explanation(fusion, URL), format!("{} (Source: {})", fusion, URL));

        let water = "Water is a vital resource: all known life depends on it.";
        assert_eq!(clean_explanation(water, URL), format!("{} (Source: {})", water, URL));

        let refs = "Its cross-reference: the Messier catalogue lists M31.";
        assert_eq!(clean_explanation(refs, URL), format!("{} (Source: {})", refs, URL));
    }

    #[test]
    fn empty_explanation_still_cites() {
        assert_eq!(clean_explanation("  ", URL), format!("(Source: {})", URL));
    }

    #[test]
    fn strips_search_highlight_markup() {
        assert_eq!(
            strip_html_tags(r#"the <span class="searchmatch">Foo</span> bar"#),
            "the Foo bar"
        );
    }

    #[test]
    fn first_sentence_stops_at_period() {
        assert_eq!(
            first_sentence("Astronomy is a natural science. It studies stars."),
            "Astronomy is a natural science"
        );
        assert_eq!(first_sentence("天文学は自然科学。星を研究する。"), "天文学は自然科学");
        assert_eq!(first_sentence("Version 2.5 of it"), "Version 2.5 of it");
    }
}
