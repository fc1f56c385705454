//! Field identifiers: structural parsing of `<base>-<instance>.<array>` column names,
//! the pending-request worklist, and header-to-request matching.

use crate::config::CombineMode;
use crate::error::ConfigError;
use anyhow::{bail, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+)-(\d+)\.(\d+)$").unwrap())
}

/// Split a column name into its base field id and the optional `(instance, array)` suffix.
///
/// `"50-2.0"` gives `("50", Some(("2", "0")))`; `"eid"` gives `("eid", None)`.
/// Multi-digit instance/array numbers are accepted (`"20002-0.12"`).
pub fn split_field_id(column: &str) -> (&str, Option<(&str, &str)>) {
    match suffix_re().captures(column) {
        Some(caps) => {
            // captures are slices of `column`; the groups always participate on a match
            let base = caps.get(1).map_or(column, |m| m.as_str());
            let inst = caps.get(2).map_or("", |m| m.as_str());
            let arr = caps.get(3).map_or("", |m| m.as_str());
            (base, Some((inst, arr)))
        }
        None => (column, None),
    }
}

/// Base field id of a column name (the whole name if it has no suffix).
#[inline]
pub fn base_field_id(column: &str) -> &str {
    split_field_id(column).0
}

/// The set of requested field identifiers that no file has satisfied yet.
///
/// Owned by the extraction run and threaded through each file step; it only
/// ever shrinks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Worklist {
    pending: BTreeSet<String>,
}

impl Worklist {
    /// Build from user input. Entries are trimmed and deduplicated.
    pub fn new<I, S>(fields: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pending = BTreeSet::new();
        for f in fields {
            let f = f.as_ref().trim();
            if f.is_empty() {
                return Err(ConfigError::EmptyField);
            }
            pending.insert(f.to_string());
        }
        if pending.is_empty() {
            return Err(ConfigError::NoFields);
        }
        Ok(Self { pending })
    }

    pub fn is_empty(&self) -> bool { self.pending.is_empty() }
    pub fn len(&self) -> usize { self.pending.len() }
    pub fn contains(&self, id: &str) -> bool { self.pending.contains(id) }
    pub fn iter(&self) -> impl Iterator<Item = &str> { self.pending.iter().map(String::as_str) }

    /// Remove satisfied requests. Returns how many were actually pending.
    pub fn satisfy<'a, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        ids.into_iter().filter(|id| self.pending.remove(*id)).count()
    }

    pub fn into_remaining(self) -> BTreeSet<String> {
        self.pending
    }
}

/// Decide whether `column` satisfies a pending request; returns that request.
///
/// Exact mode compares the full column name. Combine mode compares the parsed
/// base id. Neither mode ever does substring matching, so `"1"` does not match
/// `"12-0.0"`.
pub fn match_column<'w>(column: &str, mode: CombineMode, worklist: &'w Worklist) -> Option<&'w str> {
    let key = if mode.is_combining() { base_field_id(column) } else { column };
    worklist.pending.get(key).map(String::as_str)
}

/// One header column picked for extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedColumn {
    /// Position in the file header.
    pub index: usize,
    /// Column name as it appears in the header.
    pub name: String,
    /// The request it satisfies (the base id in combine mode).
    pub field: String,
}

/// Result of the header-only pass over one file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnSelection {
    pub subject_index: usize,
    /// Matched columns in header order.
    pub columns: Vec<SelectedColumn>,
}

impl ColumnSelection {
    pub fn is_empty(&self) -> bool { self.columns.is_empty() }

    /// Requests satisfied by this file.
    pub fn fields(&self) -> BTreeSet<&str> {
        self.columns.iter().map(|c| c.field.as_str()).collect()
    }

    /// Header indices to pull from each row: subject first, then matched columns.
    pub fn read_indices(&self) -> Vec<usize> {
        std::iter::once(self.subject_index).chain(self.columns.iter().map(|c| c.index)).collect()
    }
}

/// Intersect a file header with the worklist.
///
/// The subject column never counts as a field. Repeated header names are only
/// taken once. A header that matches something but lacks the subject column
/// is an error; a header that matches nothing yields an empty selection.
pub fn select_columns(
    header: &[String],
    subject_column: &str,
    mode: CombineMode,
    worklist: &Worklist,
) -> Result<ColumnSelection> {
    let subject_index = header.iter().position(|h| h == subject_column);

    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut columns = Vec::new();
    for (index, name) in header.iter().enumerate() {
        if Some(index) == subject_index || !seen.insert(name.as_str()) {
            continue;
        }
        if let Some(field) = match_column(name, mode, worklist) {
            columns.push(SelectedColumn { index, name: name.clone(), field: field.to_string() });
        }
    }

    if columns.is_empty() {
        return Ok(ColumnSelection { subject_index: subject_index.unwrap_or(0), columns });
    }
    match subject_index {
        Some(subject_index) => Ok(ColumnSelection { subject_index, columns }),
        None => bail!("header has matching fields but no subject column '{}'", subject_column),
    }
}
