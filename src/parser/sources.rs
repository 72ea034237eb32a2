use std::sync::{Arc, LazyLock};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::fields::{trim_internal, Field, FieldStore};
use crate::error::{Result, ScrapeError};

const NICKNAME_PREFIX: &str = "metadata_nickname_";
pub const INITIAL_STATE_MARKER: &str = "window.__INITIAL_STATE__";

static DETAIL_ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#details table tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static BREADCRUMB_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#breadcrumb_top .action_link_10").unwrap());
static INLINE_SCRIPT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script:not([src])").unwrap());
static JSON_PARSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"JSON\.parse\(['"](.+)['"]\);?"#).unwrap());

/// Item payload as served by `/digital/api/collections/.../items/...`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemModel {
    #[serde(default)]
    pub fields: Vec<FieldModel>,
    #[serde(default)]
    pub parent: Option<Box<ItemModel>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub collection_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldModel {
    #[serde(default, deserialize_with = "lenient_string")]
    pub key: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
}

/// Accept strings, numbers and null where the platform promises a string.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Build a store from an item model, linking the collection-level parent.
pub fn from_model(model: &ItemModel) -> FieldStore {
    let parent = model.parent.as_deref().map(|p| Arc::new(from_model(p)));
    let fields = model.fields.iter().map(|f| Field {
        key: f.key.clone(),
        label: f.label.clone(),
        value: f.value.clone(),
    });
    FieldStore::new(fields, parent, model.collection_name.clone())
}

pub fn parse_model(json: &str) -> Result<ItemModel> {
    Ok(serde_json::from_str(json)?)
}

/// Build a store from a legacy `/cdm/` details table.
pub fn from_document(doc: &Html) -> FieldStore {
    let mut fields = Vec::new();
    for row in doc.select(&DETAIL_ROW_SEL) {
        let mut label_cell = None;
        let mut value = None;
        for cell in row.select(&CELL_SEL) {
            if has_class(&cell, "description_col1") {
                label_cell = Some(cell);
            } else if has_class(&cell, "description_col2") {
                value = Some(cell_text(&cell));
            }
        }
        if let (Some(label_cell), Some(value)) = (label_cell, value) {
            let id = label_cell.value().id().unwrap_or_default();
            fields.push(Field {
                key: id.strip_prefix(NICKNAME_PREFIX).unwrap_or(id).to_string(),
                label: cell_text(&label_cell),
                value,
            });
        }
    }

    let collection_name = doc
        .select(&BREADCRUMB_SEL)
        .nth(1)
        .map(|e| cell_text(&e))
        .unwrap_or_default();

    FieldStore::new(fields, None, collection_name)
}

pub fn has_details_table(doc: &Html) -> bool {
    doc.select(&DETAIL_ROW_SEL).next().is_some()
}

fn has_class(element: &ElementRef, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn cell_text(element: &ElementRef) -> String {
    trim_internal(&element.text().collect::<String>())
}

/// Text of the first inline script that assigns the initial application state.
pub fn initial_state_script(doc: &Html) -> Option<String> {
    doc.select(&INLINE_SCRIPT_SEL)
        .map(|s| s.text().collect::<String>())
        .map(|code| code.trim().to_string())
        .find(|code| code.starts_with(INITIAL_STATE_MARKER))
}

/// Recover the object passed to `JSON.parse('...')` inside a state script.
///
/// The argument is a JS string literal using `\xHH` and `\'` escapes, so it
/// is normalized to JSON escapes, decoded once as a string literal, and the
/// result decoded again as JSON.
pub fn decode_embedded_state(script: &str) -> Result<Value> {
    let literal = JSON_PARSE_RE
        .captures(script)
        .and_then(|c| c.get(1))
        .ok_or_else(|| ScrapeError::EmbeddedState("no JSON.parse call in script".into()))?
        .as_str()
        .replace(r"\x", r"\u00")
        .replace(r"\'", "'");

    let unescaped: String = serde_json::from_str(&format!("\"{}\"", literal))?;
    Ok(serde_json::from_str(&unescaped)?)
}

/// The item model inside a decoded initial state (`item.item`).
pub fn item_model_from_state(state: &Value) -> Result<ItemModel> {
    let item = state
        .get("item")
        .and_then(|i| i.get("item"))
        .ok_or_else(|| ScrapeError::EmbeddedState("state has no item.item".into()))?;
    Ok(ItemModel::deserialize(item)?)
}

/// Item model embedded in a modern item page, if it can be recovered.
pub fn embedded_item_model(doc: &Html) -> Result<ItemModel> {
    let script = initial_state_script(doc)
        .ok_or_else(|| ScrapeError::EmbeddedState("no initial state script".into()))?;
    item_model_from_state(&decode_embedded_state(&script)?)
}
