use serde::Serialize;

use super::classify::ItemType;
use super::names::Creator;

pub const SNAPSHOT_TITLE: &str = "Snapshot";
pub const PDF_TITLE: &str = "Full Text PDF";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub mime_type: String,
    /// Page markup for snapshots; kept in memory for the save step only.
    #[serde(skip)]
    pub document: Option<String>,
}

impl Attachment {
    pub fn snapshot(html: &str) -> Self {
        Self {
            title: SNAPSHOT_TITLE.to_string(),
            url: None,
            mime_type: "text/html".to_string(),
            document: Some(html.to_string()),
        }
    }

    pub fn pdf(url: impl Into<String>) -> Self {
        Self {
            title: PDF_TITLE.to_string(),
            url: Some(url.into()),
            mime_type: "application/pdf".to_string(),
            document: None,
        }
    }
}

/// Normalized citation record for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub item_type: ItemType,
    pub title: String,
    pub creators: Vec<Creator>,
    pub abstract_note: String,
    pub language: String,
    pub archive: String,
    pub archive_location: String,
    pub publisher: String,
    pub rights: String,
    pub date: String,
    pub place: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artwork_medium: Option<String>,
    pub tags: Vec<Tag>,
    pub attachments: Vec<Attachment>,
    pub url: String,
}

impl Record {
    /// Empty record for `url`; metadata fields are filled in by the mapper.
    pub fn new(url: &str) -> Self {
        Self {
            item_type: ItemType::Document,
            title: String::new(),
            creators: Vec::new(),
            abstract_note: String::new(),
            language: String::new(),
            archive: String::new(),
            archive_location: String::new(),
            publisher: String::new(),
            rights: String::new(),
            date: String::new(),
            place: String::new(),
            artwork_medium: None,
            tags: Vec::new(),
            attachments: Vec::new(),
            url: url.to_string(),
        }
    }
}
