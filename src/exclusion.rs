use ahash::AHashSet;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Subject ids to drop from every output file. Loaded once; read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct ExclusionSet {
    ids: AHashSet<String>,
}

impl ExclusionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read the first column of a header-less, comma-delimited file.
    /// Blank lines and blank ids are skipped; extra columns are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let f = File::open(path).with_context(|| format!("open exclusion file {}", path.display()))?;
        Self::from_reader(BufReader::new(f))
            .with_context(|| format!("read exclusion file {}", path.display()))
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(rdr);
        let mut ids = AHashSet::new();
        for rec in reader.records() {
            let rec = rec?;
            if let Some(id) = rec.get(0).map(str::trim) {
                if !id.is_empty() {
                    ids.insert(id.to_string());
                }
            }
        }
        Ok(Self { ids })
    }

    #[inline]
    pub fn contains(&self, subject: &str) -> bool {
        self.ids.contains(subject)
    }

    pub fn len(&self) -> usize { self.ids.len() }
    pub fn is_empty(&self) -> bool { self.ids.is_empty() }
}

impl<S: Into<String>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self { ids: iter.into_iter().map(Into::into).collect() }
    }
}
