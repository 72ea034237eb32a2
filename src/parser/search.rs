use std::sync::LazyLock;

use indexmap::IndexMap;
use scraper::{Html, Selector};
use url::Url;

use super::fields::trim_internal;

static RESULT_ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.SearchResult-container").unwrap());
static LEGACY_ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".listContentBottom a").unwrap());
static HEADER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".MetadataFields-header").unwrap());

/// Result URL → title for every item on a listing page, in page order.
/// `None` when the page lists nothing.
pub fn search_results(doc: &Html, base: &Url) -> Option<IndexMap<String, String>> {
    let mut rows: Vec<_> = doc.select(&RESULT_ROW_SEL).collect();
    if rows.is_empty() {
        rows = doc.select(&LEGACY_ROW_SEL).collect();
    }

    let mut items = IndexMap::new();
    for row in rows {
        let Some(href) = row.value().attr("href").and_then(|h| base.join(h).ok()) else {
            continue;
        };
        let header = row
            .select(&HEADER_SEL)
            .next()
            .map(|h| trim_internal(&h.text().collect::<String>()))
            .filter(|t| !t.is_empty());
        let title = header.unwrap_or_else(|| trim_internal(&row.text().collect::<String>()));
        if title.is_empty() {
            continue;
        }
        items.insert(href.to_string(), title);
    }

    (!items.is_empty()).then_some(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://cdm.example.org/digital/search/searchterm/cookbook").unwrap()
    }

    #[test]
    fn modern_rows_use_header_text() {
        let doc = Html::parse_document(
            &std::fs::read_to_string("tests/fixtures/search_results.html").unwrap(),
        );
        let items = search_results(&doc, &base()).unwrap();
        let entries: Vec<_> = items.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            (
                &"https://cdm.example.org/digital/collection/cook/id/12".to_string(),
                &"The Household Cookbook".to_string()
            )
        );
        assert_eq!(entries[1].1, "Recipes, 1890");
    }

    #[test]
    fn legacy_rows_when_no_modern_rows() {
        let doc = Html::parse_document(
            r#"<div class="listContentBottom">
                 <a href="/cdm/ref/collection/amar/id/1">  Anau
                   excavations </a>
                 <a href="/cdm/ref/collection/amar/id/2"></a>
                 <a>No link</a>
               </div>"#,
        );
        let items = search_results(&doc, &base()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            items.get("https://cdm.example.org/cdm/ref/collection/amar/id/1").map(String::as_str),
            Some("Anau excavations")
        );
    }

    #[test]
    fn empty_listing_is_none() {
        let doc = Html::parse_document("<html><body><p>No results</p></body></html>");
        assert!(search_results(&doc, &base()).is_none());
    }
}
