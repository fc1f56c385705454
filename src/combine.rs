//! Collapse repeated-measurement columns (`50-0.0`, `50-1.0`, ...) into one column
//! per base field id, and the missing-value rules shared with the writer.

use crate::config::CombineMode;
use crate::field::base_field_id;
use crate::table::{Chunk, Row};

/// Tokens read as missing, in addition to the empty string.
const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[inline]
pub fn is_missing(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || NA_TOKENS.contains(&v)
}

/// Column grouping for one file, computed once from the selected header columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CombinePlan {
    mode: CombineMode,
    /// (base id, positions within the chunk's columns), in first-appearance order.
    groups: Vec<(String, Vec<usize>)>,
}

impl CombinePlan {
    pub fn new(columns: &[String], mode: CombineMode) -> Self {
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for (pos, col) in columns.iter().enumerate() {
            let base = base_field_id(col);
            match groups.iter_mut().find(|(b, _)| b == base) {
                Some((_, positions)) => positions.push(pos),
                None => groups.push((base.to_string(), vec![pos])),
            }
        }
        Self { mode, groups }
    }

    /// Output column names: one per base id.
    pub fn output_columns(&self) -> Vec<String> {
        self.groups.iter().map(|(b, _)| b.clone()).collect()
    }

    fn pick<'a>(&self, values: &'a [String], positions: &[usize]) -> &'a str {
        let non_missing = |&&p: &&usize| values.get(p).is_some_and(|v| !is_missing(v));
        let hit = match self.mode {
            CombineMode::First => positions.iter().find(non_missing),
            _ => positions.iter().rev().find(non_missing),
        };
        hit.and_then(|&p| values.get(p)).map_or("", String::as_str)
    }

    /// Replace each row's values with one value per group.
    /// Suffix precedence follows header order, not a numeric sort.
    pub fn apply(&self, chunk: Chunk) -> Chunk {
        let rows = chunk
            .rows
            .into_iter()
            .map(|row| {
                let values = self
                    .groups
                    .iter()
                    .map(|(_, positions)| self.pick(&row.values, positions).to_string())
                    .collect();
                Row { subject: row.subject, values }
            })
            .collect();
        Chunk { columns: self.output_columns(), rows }
    }
}
