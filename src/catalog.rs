use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, instrument};

/// One observed association between a tourist site and a nearby café.
///
/// A site appears in as many rows as it has café observations, so
/// `site_name` is not unique. Review fields may be absent in the source
/// data; an empty CSV field deserializes to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    #[serde(rename = "site_name", alias = "t_name")]
    pub site_name: String,
    #[serde(rename = "cafe_name", alias = "c_name")]
    pub cafe_name: String,
    #[serde(rename = "cafe_rating", alias = "c_value")]
    pub cafe_rating: f64,
    #[serde(rename = "cafe_review", alias = "c_review")]
    pub cafe_review: Option<String>,
    #[serde(rename = "site_review", alias = "t_review")]
    pub site_review: Option<String>,
}

impl CatalogRow {
    // f64 has no Eq, so keys carry the bit pattern instead.
    fn dedup_key(&self) -> (String, String, u64, Option<String>, Option<String>) {
        (
            self.site_name.clone(),
            self.cafe_name.clone(),
            self.cafe_rating.to_bits(),
            self.cafe_review.clone(),
            self.site_review.clone(),
        )
    }
}

/// The site-to-café reference table, loaded once at startup and read-only
/// thereafter.
pub struct Catalog {
    rows: Vec<CatalogRow>,
}

impl Catalog {
    /// Load the catalog from a CSV file.
    ///
    /// The source data ships in the legacy Korean code page (CP949), but
    /// re-exports are often UTF-8, so bytes that already form valid UTF-8
    /// are taken as-is and everything else goes through the EUC-KR
    /// decoder. A lossy decode or malformed CSV is a hard error: the
    /// service cannot answer café questions from a broken catalog.
    #[instrument(err)]
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| {
            format!("Failed to read catalog file '{}'", path.display())
        })?;
        let text = decode_catalog_bytes(&bytes).with_context(|| {
            format!("Failed to decode catalog file '{}'", path.display())
        })?;

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            let row: CatalogRow =
                record.context("Malformed catalog row")?;
            rows.push(row);
        }

        let catalog = Self::from_rows(rows);
        info!(
            "Loaded catalog from '{}': {} rows after deduplication",
            path.display(),
            catalog.rows.len()
        );
        Ok(catalog)
    }

    /// Build a catalog from in-memory rows, deduplicating on full-row
    /// equality and preserving first-seen order.
    pub fn from_rows(rows: Vec<CatalogRow>) -> Self {
        let mut seen = HashSet::new();
        let rows = rows
            .into_iter()
            .filter(|row| seen.insert(row.dedup_key()))
            .collect();
        Self { rows }
    }

    /// Every row whose site name contains `query` as a substring, in
    /// catalog order. Matching is case-sensitive with no normalization;
    /// an empty result is a valid "no match" outcome, not an error.
    pub fn matches(&self, query: &str) -> Vec<&CatalogRow> {
        self.rows
            .iter()
            .filter(|row| row.site_name.contains(query))
            .collect()
    }

    /// Distinct site names in first-seen order.
    pub fn site_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|row| row.site_name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn decode_catalog_bytes(bytes: &[u8]) -> Result<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }
    let (text, _, had_errors) = encoding_rs::EUC_KR.decode(bytes);
    if had_errors {
        anyhow::bail!("Catalog is neither valid UTF-8 nor valid CP949");
    }
    Ok(text.into_owned())
}
