use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static ANNOTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]|;$").unwrap());
static HONORIFIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r", Sir |, Dr ").unwrap());
static LEADING_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s\u{a0}.,/\[\]:]+").unwrap());
static TRAILING_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\u{a0}.,/\[\]:]+$").unwrap());
static FIRST_GAP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\u{a0}:]+").unwrap());
static COMMA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,，] ?").unwrap());
static GIVEN_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s.]+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CreatorType {
    Author,
    Translator,
    SeriesEditor,
    Editor,
    Contributor,
    Interviewer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    pub last_name: String,
    pub creator_type: CreatorType,
    /// `1` marks a single-field (institutional) name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_mode: Option<u8>,
}

impl Creator {
    #[cfg(test)]
    pub fn is_single_field(&self) -> bool {
        self.field_mode == Some(1)
    }
}

/// Split a semicolon-separated creator list into creators of one type.
pub fn clean_creators(raw: &str, creator_type: CreatorType) -> Vec<Creator> {
    raw.split(';')
        .filter_map(|segment| clean_single(segment, creator_type))
        .collect()
}

fn clean_single(segment: &str, creator_type: CreatorType) -> Option<Creator> {
    let stripped = ANNOTATION_RE.replace_all(segment, "");
    let name = HONORIFIC_RE.replace_all(&stripped, ", ");
    let (first, last) = split_name(&name);
    if first.is_empty() && last.is_empty() {
        return None;
    }
    Some(if first.is_empty() {
        Creator {
            first_name: None,
            last_name: last,
            creator_type,
            field_mode: Some(1),
        }
    } else {
        Creator {
            first_name: Some(first),
            last_name: last,
            creator_type,
            field_mode: None,
        }
    })
}

/// Comma-aware name split: `Last, First`. Without a comma the whole text is
/// the last name and the first name is empty.
pub fn split_name(raw: &str) -> (String, String) {
    let name = LEADING_NOISE_RE.replace(raw, "");
    let name = TRAILING_NOISE_RE.replace(&name, "");
    let name = FIRST_GAP_RE.replace(&name, " ");

    let parts: Vec<&str> = COMMA_RE.split(&name).collect();
    let (last, mut first) = match parts.as_slice() {
        [last, first, ..] => (last.to_string(), first.to_string()),
        _ => (name.to_string(), String::new()),
    };

    let first_len = first.chars().count();
    if is_all_caps(&first)
        && first_len < 4
        && (first_len == 1 || last.to_uppercase() != last)
    {
        // bare initials such as "JR"
        first = first.chars().map(|c| format!(" {}.", c)).collect();
    }
    if !first.is_empty() {
        first = punctuate_initials(&first);
    }
    (first, last)
}

fn is_all_caps(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_uppercase() || ('\u{400}'..='\u{42f}').contains(&c))
}

fn is_initial(part: &str) -> bool {
    let mut chars = part.strip_prefix('-').unwrap_or(part).chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if is_all_caps(&c.to_string()))
}

/// Put a period after every single-letter given name.
fn punctuate_initials(first: &str) -> String {
    let trimmed = first.trim_start_matches(|c: char| c.is_whitespace() || c == '.');
    let trimmed = trimmed.trim_end_matches(|c: char| c.is_whitespace() || c == ',');
    let mut out = String::new();
    for token in GIVEN_SPLIT_RE.split(trimmed) {
        for (i, piece) in split_before_hyphens(token).into_iter().enumerate() {
            if i == 0 && !out.is_empty() {
                out.push(' ');
            }
            out.push_str(piece);
            if is_initial(piece) {
                out.push('.');
            }
        }
    }
    out.trim().to_string()
}

/// "Jean-Paul" -> ["Jean", "-Paul"]
fn split_before_hyphens(token: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, c) in token.char_indices() {
        if c == '-' && i > start {
            pieces.push(&token[start..i]);
            start = i;
        }
    }
    pieces.push(&token[start..]);
    pieces
}
