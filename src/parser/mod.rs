pub mod attachments;
pub mod classify;
pub mod dates;
pub mod fields;
pub mod mapper;
pub mod names;
pub mod record;
pub mod search;
pub mod sources;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use tracing::debug;
use url::Url;

use crate::error::{Result, ScrapeError};
use classify::{detect_type, ItemType};
use record::{Attachment, Record};

static ITEM_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/digital/collection/([^/]+)/id/([^/]+).*$").unwrap());

/// What a page is, as far as extraction is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Listing page with at least one result.
    Multiple,
    /// Single item of the detected type.
    Item(ItemType),
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageKind::Multiple => f.write_str("multiple"),
            PageKind::Item(t) => t.fmt(f),
        }
    }
}

/// Classify a page. `None` means it is not a page we can extract from.
pub fn classify_page(doc: &Html, url: &Url) -> Option<PageKind> {
    let href = url.as_str();
    if href.contains("/search/") && search::search_results(doc, url).is_some() {
        return Some(PageKind::Multiple);
    }
    if !href.contains("/collection/") {
        return None;
    }
    if href.contains("/cdm/") && sources::has_details_table(doc) {
        return Some(PageKind::Item(detect_type(&sources::from_document(doc))));
    }

    let script = sources::initial_state_script(doc)?;
    let item_type = sources::decode_embedded_state(&script)
        .and_then(|state| sources::item_model_from_state(&state))
        .map(|model| detect_type(&sources::from_model(&model)))
        .unwrap_or_else(|e| {
            debug!("Error when detecting type of {}: {}", url, e);
            ItemType::Document
        });
    Some(PageKind::Item(item_type))
}

/// JSON API endpoint for a modern item page URL.
pub fn item_api_url(url: &str) -> Option<String> {
    ITEM_URL_RE.is_match(url).then(|| {
        ITEM_URL_RE
            .replace(url, "/digital/api/collections/$1/items/$2/false")
            .into_owned()
    })
}

/// Outcome of reading an item page.
#[derive(Debug)]
pub enum Pending {
    /// Legacy page: everything was on the page.
    Complete(Record),
    /// Modern page: the metadata has to be fetched from `api_url`.
    NeedsItemJson { record: Record, api_url: String },
}

/// Read what the item page itself offers: snapshot, PDF and, for legacy
/// pages, the full metadata.
pub fn begin_record(html: &str, url: &Url) -> Pending {
    let doc = Html::parse_document(html);
    let mut record = Record::new(url.as_str());
    record.attachments.push(Attachment::snapshot(html));
    if let Some(pdf) = attachments::find_pdf(&doc, url) {
        record.attachments.push(pdf);
    }

    match item_api_url(url.as_str()) {
        Some(api_url) => Pending::NeedsItemJson { record, api_url },
        None => {
            mapper::map_record(&sources::from_document(&doc), &mut record);
            Pending::Complete(record)
        }
    }
}

/// Complete a modern-page record from the item API response body.
pub fn finish_record(mut record: Record, json: &str) -> Result<Record> {
    let model = sources::parse_model(json)?;
    let store = sources::from_model(&model);
    debug!(
        "Item {} has {} fields (collection-level fields: {})",
        record.url,
        store.len(),
        store.parent().map_or(0, |p| p.len())
    );
    mapper::map_record(&store, &mut record);
    Ok(record)
}

/// Extract a record from a saved page without network access. Modern pages
/// fall back to the item model embedded in the page state.
pub fn extract_offline(html: &str, url: &Url) -> Result<Record> {
    match begin_record(html, url) {
        Pending::Complete(record) => Ok(record),
        Pending::NeedsItemJson { mut record, .. } => {
            let doc = Html::parse_document(html);
            let model = sources::embedded_item_model(&doc)
                .map_err(|e| ScrapeError::NotAnItem(format!("{}: {}", url, e)))?;
            mapper::map_record(&sources::from_model(&model), &mut record);
            Ok(record)
        }
    }
}
