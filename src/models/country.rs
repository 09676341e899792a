//! Known country pairs, used to offer selections.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Country always offered, and the whole list when no catalog file exists.
pub const DEFAULT_COUNTRY: &str = "Poland";

/// A (source, mission) pair seen in the listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CountryPair {
    pub source_country: String,
    pub mission_country: String,
}

/// Country pairs loaded from `countries.json`.
///
/// The file may be a saved copy of the listing itself: only the two country
/// fields of each element are read.
#[derive(Debug, Clone, Default)]
pub struct CountryCatalog {
    pairs: Vec<CountryPair>,
}

impl CountryCatalog {
    pub fn new(mut pairs: Vec<CountryPair>) -> Self {
        pairs.sort();
        pairs.dedup();
        Self { pairs }
    }

    /// Load the catalog from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let pairs: Vec<CountryPair> = serde_json::from_str(&content)?;
        Ok(Self::new(pairs))
    }

    /// Load the catalog or fall back to the single default entry.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::debug!(
                "Country list unavailable at {:?}: {}. Using default.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    pub fn pairs(&self) -> &[CountryPair] {
        &self.pairs
    }

    /// Sorted, de-duplicated country names from both sides of every pair.
    pub fn countries(&self) -> Vec<String> {
        let mut names: BTreeSet<&str> = self
            .pairs
            .iter()
            .flat_map(|p| [p.source_country.as_str(), p.mission_country.as_str()])
            .collect();
        names.insert(DEFAULT_COUNTRY);
        names.into_iter().map(str::to_string).collect()
    }

    pub fn contains(&self, country: &str) -> bool {
        country == DEFAULT_COUNTRY
            || self
                .pairs
                .iter()
                .any(|p| p.source_country == country || p.mission_country == country)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = CountryCatalog::load_or_default("/no/such/countries.json");
        assert_eq!(catalog.countries(), vec![DEFAULT_COUNTRY.to_string()]);
        assert!(catalog.pairs().is_empty());
    }

    #[test]
    fn test_load_from_listing_copy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"source_country": "Turkey", "mission_country": "Germany", "people_looking": 3}},
                {{"source_country": "Turkey", "mission_country": "France"}},
                {{"source_country": "Turkey", "mission_country": "Germany"}}
            ]"#
        )
        .unwrap();

        let catalog = CountryCatalog::load_or_default(file.path());
        assert_eq!(catalog.pairs().len(), 2);
        assert_eq!(
            catalog.countries(),
            vec!["France", "Germany", "Poland", "Turkey"]
        );
        assert!(catalog.contains("France"));
        assert!(!catalog.contains("Spain"));
    }
}
