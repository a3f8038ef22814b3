//! Small HTML helpers shared by the extractor modules

use scraper::ElementRef;
use url::Url;

use crate::normalize::collapse_whitespace;

macro_rules! selector {
    ($css:expr) => {
        scraper::Selector::parse($css).expect(concat!("invalid selector: ", $css))
    };
}
pub(crate) use selector;

/// Visible text of an element, whitespace-collapsed
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Resolve a possibly relative href against the page it appeared on
pub(crate) fn absolute_url(page_url: &str, href: &str) -> Option<String> {
    Url::parse(page_url)
        .ok()?
        .join(href)
        .ok()
        .map(|u| u.to_string())
}

/// True if the element's class attribute contains any of the given hints
pub(crate) fn class_hint(el: ElementRef<'_>, hints: &[&str]) -> bool {
    el.value()
        .attr("class")
        .map(|c| {
            let lowered = c.to_lowercase();
            hints.iter().any(|h| lowered.contains(h))
        })
        .unwrap_or(false)
}

/// First descendant with one of the given tag names and a class hint
///
/// An empty hint list matches on tag name alone.
pub(crate) fn find_descendant<'a>(
    root: ElementRef<'a>,
    tags: &[&str],
    hints: &[&str],
) -> Option<ElementRef<'a>> {
    root.descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| {
            tags.contains(&el.value().name()) && (hints.is_empty() || class_hint(*el, hints))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_text_of_collapses_whitespace() {
        let html = Html::parse_fragment("<p>  one\n  <b>two</b>\tthree </p>");
        let p = html
            .select(&selector!("p"))
            .next()
            .unwrap();
        assert_eq!(text_of(p), "one two three");
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("https://example.org/wiki/Film", "/wiki/Titanic").as_deref(),
            Some("https://example.org/wiki/Titanic")
        );
        assert!(absolute_url("not a url", "/wiki/Titanic").is_none());
    }

    #[test]
    fn test_find_descendant_by_class_hint() {
        let html = Html::parse_fragment(
            r#"<div><span class="price-tag">$9.99</span><a class="product-title">Name</a></div>"#,
        );
        let root = html.select(&selector!("div")).next().unwrap();
        let title = find_descendant(root, &["a"], &["title", "name"]).unwrap();
        assert_eq!(text_of(title), "Name");
        assert!(find_descendant(root, &["h2"], &["title"]).is_none());
    }
}
