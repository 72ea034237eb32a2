use std::sync::LazyLock;

use regex::Regex;

use super::classify::{detect_type, join, raw_title, ItemType};
use super::dates::str_to_iso;
use super::fields::FieldStore;
use super::names::{clean_creators, CreatorType};
use super::record::{Record, Tag};

type Slot = fn(&mut Record) -> &mut String;

fn label(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){}", pattern)).unwrap()
}

/// Creator groups, in output order.
static CREATOR_LABELS: LazyLock<Vec<(Regex, CreatorType)>> = LazyLock::new(|| {
    vec![
        (label("creator|author"), CreatorType::Author),
        (label("translator"), CreatorType::Translator),
        (label("series editor"), CreatorType::SeriesEditor),
        (label(r"^\s*editor"), CreatorType::Editor),
        (label("contributor"), CreatorType::Contributor),
        (label("interviewer"), CreatorType::Interviewer),
    ]
});

/// Plain text fields copied straight from the first matching label.
static TEXT_LABELS: LazyLock<Vec<(Regex, Slot)>> = LazyLock::new(|| {
    let slots: [(&str, Slot); 4] = [
        ("language", |r| &mut r.language),
        ("publisher", |r| &mut r.publisher),
        ("rights", |r| &mut r.rights),
        ("place", |r| &mut r.place),
    ];
    slots.into_iter().map(|(p, slot)| (label(p), slot)).collect()
});

static IDENTIFIER_LABEL: LazyLock<Regex> = LazyLock::new(|| label("identifier"));
static TYPE_LABEL: LazyLock<Regex> = LazyLock::new(|| label("type"));
static TAG_LABEL: LazyLock<Regex> = LazyLock::new(|| label("keywords|subjects"));
static PARENTHETICAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());

const DATE_KEYS: [&str; 3] = ["date", "dated", "period"];
const SUBJECT_KEYS: [&str; 4] = ["subject", "subjea", "subjeb", "subjec"];

/// Fill the metadata fields of `record` from `store`. Attachments and the
/// URL are left as they are.
pub fn map_record(store: &FieldStore, record: &mut Record) {
    record.item_type = detect_type(store);
    record.title = raw_title(store).replacen(" : ", ": ", 1);

    record.creators = CREATOR_LABELS
        .iter()
        .flat_map(|(re, kind)| clean_creators(&store.query_by_name(re), *kind))
        .collect();

    record.abstract_note = store.query("descri");
    for (re, slot) in TEXT_LABELS.iter() {
        *slot(record) = store.query_by_name(re);
    }

    record.archive_location = store.query_by_name(&IDENTIFIER_LABEL);
    if record.archive_location.is_empty() {
        record.archive_location = join(&store.query("identi"), &store.query("locala"));
    }
    record.archive = store.collection_name.clone();

    record.artwork_medium =
        (record.item_type == ItemType::Artwork).then(|| store.query_by_name(&TYPE_LABEL));

    record.date = DATE_KEYS
        .iter()
        .map(|k| store.query(k))
        .find(|v| !v.is_empty())
        .map(|v| str_to_iso(&v))
        .unwrap_or_default();

    record.tags = collect_tags(store);
}

fn collect_tags(store: &FieldStore) -> Vec<Tag> {
    let keywords = store.query_by_name(&TAG_LABEL);
    let raw: Vec<String> = if keywords.is_empty() {
        SUBJECT_KEYS.iter().map(|k| store.query(k)).collect()
    } else {
        keywords.split(';').map(str::to_string).collect()
    };
    split_tags(&raw)
}

/// Strip parentheticals, join every list with `;`, then split again on `.`
/// or `;`. Periods inside subject headings split too.
pub fn split_tags<S: AsRef<str>>(raw: &[S]) -> Vec<Tag> {
    raw.iter()
        .map(|t| t.as_ref())
        .filter(|t| !t.is_empty())
        .map(|t| PARENTHETICAL_RE.replace_all(t, "").into_owned())
        .collect::<Vec<_>>()
        .join(";")
        .split(['.', ';'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| Tag { tag: t.to_string() })
        .collect()
}
