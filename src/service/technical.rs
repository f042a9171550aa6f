//! Technical Analyzer - deterministic structural checks on page HTML.
//!
//! Complements the AI scoring with facts that must be exact: heading counts,
//! image alt attributes, meta description length and title presence.
//! Never errors; malformed HTML is parsed leniently by `scraper`.

use scraper::{Html, Selector};
use std::sync::OnceLock;

use crate::domain::models::Suggestion;

const META_DESCRIPTION_MIN: usize = 120;
const META_DESCRIPTION_MAX: usize = 160;

/// Stateless analyzer. All checks run in a fixed order.
pub struct TechnicalAnalyzer;

impl TechnicalAnalyzer {
    pub fn analyze(html: &str) -> Vec<Suggestion> {
        let document = Html::parse_document(html);
        let mut suggestions = Vec::new();

        Self::check_h1(&document, &mut suggestions);
        Self::check_image_alt(&document, &mut suggestions);
        Self::check_meta_description(&document, &mut suggestions);
        Self::check_title(&document, &mut suggestions);

        suggestions
    }

    fn check_h1(document: &Html, out: &mut Vec<Suggestion>) {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = SELECTOR.get_or_init(|| Selector::parse("h1").unwrap());

        match document.select(selector).count() {
            0 => out.push(Suggestion::warning(
                "No H1 heading found - every page should have exactly one H1",
            )),
            1 => {}
            n => out.push(Suggestion::warning(format!(
                "Multiple H1 headings found ({}x) - use only one H1 per page",
                n
            ))),
        }
    }

    fn check_image_alt(document: &Html, out: &mut Vec<Suggestion>) {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = SELECTOR.get_or_init(|| Selector::parse("img").unwrap());

        let (missing, empty) = document
            .select(selector)
            .fold((0usize, 0usize), |(missing, empty), img| {
                match img.value().attr("alt") {
                    None => (missing + 1, empty),
                    Some(alt) if alt.trim().is_empty() => (missing, empty + 1),
                    Some(_) => (missing, empty),
                }
            });

        if missing > 0 {
            out.push(Suggestion::warning(format!(
                "{} image(s) missing alt attributes - add descriptive alt text for accessibility",
                missing
            )));
        }
        if empty > 0 {
            out.push(Suggestion::info(format!(
                "{} image(s) with empty alt text - ensure these are truly decorative",
                empty
            )));
        }
    }

    fn check_meta_description(document: &Html, out: &mut Vec<Suggestion>) {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = SELECTOR.get_or_init(|| Selector::parse("meta[name]").unwrap());

        let content = document
            .select(selector)
            .find(|el| {
                el.value()
                    .attr("name")
                    .is_some_and(|name| name.trim().eq_ignore_ascii_case("description"))
            })
            .map(|el| el.value().attr("content").unwrap_or_default().trim().to_string());

        let Some(content) = content else {
            out.push(Suggestion::warning(
                "No meta description found - add a description for better SEO",
            ));
            return;
        };

        let len = content.chars().count();
        if len < META_DESCRIPTION_MIN {
            out.push(Suggestion::warning(format!(
                "Meta description too short ({} chars) - aim for 150-160 characters",
                len
            )));
        } else if len > META_DESCRIPTION_MAX {
            out.push(Suggestion::warning(format!(
                "Meta description too long ({} chars) - may be truncated in search results",
                len
            )));
        }
    }

    fn check_title(document: &Html, out: &mut Vec<Suggestion>) {
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        let selector = SELECTOR.get_or_init(|| Selector::parse("title").unwrap());

        let has_title = document
            .select(selector)
            .next()
            .is_some_and(|el| !el.text().collect::<String>().trim().is_empty());

        if !has_title {
            out.push(Suggestion::warning("No title tag found - critical for SEO"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SuggestionKind;
    use crate::test_utils::mocks;
    use crate::{assert_has_suggestion, assert_no_suggestion};

    fn messages(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.message.as_str()).collect()
    }

    #[test]
    fn test_clean_page_yields_nothing() {
        let html = mocks::html_page("Welcome", Some(&"a".repeat(140)), "<h1>Hi</h1><img src=a.png alt=\"Logo\">");
        assert!(TechnicalAnalyzer::analyze(&html).is_empty());
    }

    #[test]
    fn test_two_h1_and_one_missing_alt() {
        let html = mocks::html_page(
            "Welcome",
            Some(&"a".repeat(150)),
            "<h1>One</h1><H1>Two</H1><img src=a.png>",
        );

        let suggestions = TechnicalAnalyzer::analyze(&html);

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].kind, SuggestionKind::Warning);
        assert!(suggestions[0].message.contains("(2x)"));
        assert_eq!(suggestions[1].kind, SuggestionKind::Warning);
        assert_has_suggestion!(&suggestions, "1 image(s) missing alt");
        assert_no_suggestion!(&suggestions, "No meta description");
        assert_no_suggestion!(&suggestions, "No title tag");
    }

    #[test]
    fn test_missing_h1_and_empty_alt() {
        let html = mocks::html_page("T", Some(&"a".repeat(130)), "<img src=a alt=\"  \"><img src=b alt=\"\">");
        let suggestions = TechnicalAnalyzer::analyze(&html);

        assert_eq!(
            messages(&suggestions),
            vec![
                "No H1 heading found - every page should have exactly one H1",
                "2 image(s) with empty alt text - ensure these are truly decorative",
            ]
        );
        assert_eq!(suggestions[1].kind, SuggestionKind::Info);
    }

    #[test]
    fn test_meta_description_lengths() {
        let ok = mocks::html_page("T", Some(&"x".repeat(140)), "<h1>a</h1>");
        assert!(TechnicalAnalyzer::analyze(&ok).is_empty());

        let short = mocks::html_page("T", Some(&"x".repeat(100)), "<h1>a</h1>");
        let suggestions = TechnicalAnalyzer::analyze(&short);
        assert_eq!(suggestions.len(), 1);
        assert_has_suggestion!(&suggestions, "Meta description too short (100 chars)");
        assert!(suggestions[0].message.contains("100"));

        let long = mocks::html_page("T", Some(&"x".repeat(200)), "<h1>a</h1>");
        let suggestions = TechnicalAnalyzer::analyze(&long);
        assert!(suggestions[0].message.contains("too long (200 chars)"));

        let missing = mocks::html_page("T", None, "<h1>a</h1>");
        assert_eq!(
            messages(&TechnicalAnalyzer::analyze(&missing)),
            vec!["No meta description found - add a description for better SEO"]
        );
    }

    #[test]
    fn test_meta_name_is_case_insensitive() {
        let html = format!(
            "<html><head><title>T</title><meta NAME=\"Description\" content=\"{}\"></head><body><h1>a</h1></body></html>",
            "x".repeat(150)
        );
        assert!(TechnicalAnalyzer::analyze(&html).is_empty());
    }

    #[test]
    fn test_blank_title_is_reported() {
        let html = mocks::html_page("   ", Some(&"x".repeat(150)), "<h1>a</h1>");
        assert_eq!(
            messages(&TechnicalAnalyzer::analyze(&html)),
            vec!["No title tag found - critical for SEO"]
        );
    }

    #[test]
    fn test_malformed_html_is_deterministic() {
        let html = "<html><h1>unclosed <img src=x <title>broken";
        let first = TechnicalAnalyzer::analyze(html);
        let second = TechnicalAnalyzer::analyze(html);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
