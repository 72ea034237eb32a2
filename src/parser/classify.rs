use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::fields::FieldStore;

pub(crate) static TITLE_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)title").unwrap());
// word boundaries are ASCII-only: "Interviewé" still counts
static INTERVIEW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[^A-Za-z0-9_])interview(?:[^A-Za-z0-9_]|$)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemType {
    Document,
    Artwork,
    Interview,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Document => "document",
            ItemType::Artwork => "artwork",
            ItemType::Interview => "interview",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Combine two differently-sourced fragments: `x (y)` when both are present
/// and differ, otherwise whichever one is non-empty.
pub fn join(x: &str, y: &str) -> String {
    if x == y || y.is_empty() {
        x.to_string()
    } else if x.is_empty() {
        y.to_string()
    } else {
        format!("{} ({})", x, y)
    }
}

pub fn raw_title(store: &FieldStore) -> String {
    join(&store.query_by_name(&TITLE_LABEL_RE), &store.query("title"))
}

pub fn detect_type(store: &FieldStore) -> ItemType {
    if INTERVIEW_RE.is_match(&raw_title(store)) {
        return ItemType::Interview;
    }

    let mut data_type = store.query("typea");
    if data_type.is_empty() {
        data_type = store.query("type");
    }
    match data_type.to_lowercase().as_str() {
        "image" | "photograph" | "engraved portrait" | "negative" => ItemType::Artwork,
        "interview" => ItemType::Interview,
        _ => ItemType::Document,
    }
}
