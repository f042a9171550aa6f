use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

pub const UNKNOWN_TITLE: &str = "Unknown";

pub struct PageExtractor;

impl PageExtractor {
    /// Text of the first `<title>`, entity-decoded with any markup removed.
    ///
    /// Falls back to "Unknown" when there is no title or it is blank.
    pub fn extract_title(html: &str) -> String {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = SELECTOR.get_or_init(|| Selector::parse("title").unwrap());

        let document = Html::parse_document(html);
        document
            .select(selector)
            .next()
            .map(|el| strip_tags(&el.text().collect::<String>()))
            .map(|title| title.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
    }
}

/// `<title>` is raw text to the parser, so tags written inside it survive as text.
fn strip_tags(text: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").unwrap());
    tag.replace_all(text, "").into_owned()
}
