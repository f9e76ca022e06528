//! Fuel-type normalization.
//!
//! MIMIT price listings name the same product in dozens of ways (branded,
//! regional, accented). [`FuelTable`] folds those spellings into a handful of
//! canonical categories so prices can be compared per category.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

/// Canonical categories and the raw spellings that belong to each.
///
/// Order matters only if a spelling were listed twice: the first category wins.
static FUEL_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Benzina",
        &[
            "Benzina",
            "Benzina speciale",
            "Benzina 100 ottani",
            "Benzina 102 Ottani",
            "Benzina Plus 98",
            "Benzina Speciale 98 Ottani",
            "Benzina Energy 98 ottani",
            "Benzina Shell V Power",
            "Benzina WR 100",
            "Blue Super",
            "Verde speciale",
            "F-101",
            "F101",
            "V-Power",
        ],
    ),
    (
        "Gasolio",
        &[
            "Gasolio",
            "Gasolio Alpino",
            "Gasolio Artico",
            "Gasolio speciale",
            "Gasolio Artico Igloo",
            "Gasolio Ecoplus",
            "Gasolio Energy D",
            "Gasolio Gelo",
            "Gasolio Oro Diesel",
            "Gasolio Plus",
            "Gasolio Premium",
            "Gasolio Prestazionale",
            "Gasolio artico",
            "Blu Diesel Alpino",
            "Blue Diesel",
            "Diesel Shell V Power",
            "DieselMax",
            "E-DIESEL",
            "Excellium Diesel",
            "Excellium diesel",
            "GP DIESEL",
            "Hi-Q Diesel",
            "HiQ Perform+",
            "S-Diesel",
            "Supreme Diesel",
            "V-Power Diesel",
        ],
    ),
    (
        "Gasolio HVO",
        &[
            "HVO",
            "HVO100",
            "HVOlution",
            "HVOvolution",
            "Diesel HVO",
            "Diesel HVO Energy",
            "Gasolio Bio HVO",
            "Gasolio HVO",
            "HVO Future",
            "HVO eco diesel",
            "REHVO",
            "BCHVO",
        ],
    ),
    ("GPL", &["GPL"]),
    ("Metano", &["Metano", "L-GNC"]),
    ("GNL", &["GNL"]),
];

/// Names of the six built-in categories, in table order.
pub const CANONICAL_CATEGORIES: [&str; 6] =
    ["Benzina", "Gasolio", "Gasolio HVO", "GPL", "Metano", "GNL"];

static DEFAULT_TABLE: LazyLock<FuelTable> = LazyLock::new(FuelTable::default);

/// The built-in table, built once on first use.
pub fn default_table() -> &'static FuelTable {
    &DEFAULT_TABLE
}

/// Lookup table from raw fuel spellings to category names.
///
/// Stored as ordered `(category, aliases)` pairs plus an alias index built
/// once on construction. Extra aliases can be loaded from a JSON file shaped
/// like:
/// ```json
/// {
///   "Benzina": ["Benzina Super"],
///   "Idrogeno": ["H2", "Idrogeno"]
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FuelTable {
    categories: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl Default for FuelTable {
    fn default() -> Self {
        let categories = FUEL_CATEGORIES
            .iter()
            .map(|(name, aliases)| {
                (
                    name.to_string(),
                    aliases.iter().map(|a| a.to_string()).collect(),
                )
            })
            .collect();
        Self::from_categories(categories)
    }
}

impl FuelTable {
    fn from_categories(categories: Vec<(String, Vec<String>)>) -> Self {
        let mut index = HashMap::new();
        for (pos, (_, aliases)) in categories.iter().enumerate() {
            for alias in aliases {
                index.entry(alias.clone()).or_insert(pos);
            }
        }
        Self { categories, index }
    }

    /// Loads the default table and layers the aliases in the JSON file at `path` on top.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fuel alias file '{path}'"))?;
        let extra: HashMap<String, Vec<String>> = serde_json::from_str(&content)
            .with_context(|| format!("invalid fuel alias file '{path}'"))?;
        Ok(Self::default().with_aliases(extra))
    }

    /// Returns a table with `extra` aliases merged in.
    ///
    /// Aliases for a known category are appended to it; unknown categories are
    /// appended after the existing ones, sorted by name so the result does not
    /// depend on map iteration order.
    pub fn with_aliases(self, extra: HashMap<String, Vec<String>>) -> Self {
        let mut categories = self.categories;
        let mut extra: Vec<_> = extra.into_iter().collect();
        extra.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, aliases) in extra {
            debug!(category = %name, aliases = aliases.len(), "Adding fuel aliases");
            match categories.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, known)) => known.extend(aliases),
                None => categories.push((name, aliases)),
            }
        }

        Self::from_categories(categories)
    }

    /// Maps a raw fuel name to its category, or returns it unchanged if unknown.
    pub fn categorize<'a>(&'a self, raw: &'a str) -> &'a str {
        match self.index.get(raw) {
            Some(&pos) => &self.categories[pos].0,
            None => raw,
        }
    }

    /// Returns `true` if `raw` is a known spelling of some category.
    pub fn is_known(&self, raw: &str) -> bool {
        self.index.contains_key(raw)
    }

    /// Iterates over `(category, aliases)` in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.categories
            .iter()
            .map(|(name, aliases)| (name.as_str(), aliases.as_slice()))
    }
}

/// Maps a raw fuel name using the built-in table.
///
/// Unknown names come back unchanged and become their own category.
pub fn categorize(raw: &str) -> &str {
    default_table().categorize(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_table_entry_maps_to_its_category() {
        let table = FuelTable::default();
        for (category, aliases) in FUEL_CATEGORIES {
            for alias in *aliases {
                assert_eq!(table.categorize(alias), *category, "alias {alias}");
            }
        }
    }

    #[test]
    fn test_unknown_name_is_returned_unchanged() {
        let table = FuelTable::default();
        assert_eq!(table.categorize("Idrogeno"), "Idrogeno");
        assert_eq!(table.categorize(""), "");
        assert!(!table.is_known("Idrogeno"));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let table = FuelTable::default();
        assert_eq!(table.categorize("gpl"), "gpl");
        assert_eq!(table.categorize("GPL"), "GPL");
    }

    #[test]
    fn test_branded_names() {
        assert_eq!(categorize("V-Power Diesel"), "Gasolio");
        assert_eq!(categorize("V-Power"), "Benzina");
        assert_eq!(categorize("HVOlution"), "Gasolio HVO");
        assert_eq!(categorize("L-GNC"), "Metano");
    }

    #[test]
    fn test_default_table_is_shared() {
        assert!(std::ptr::eq(default_table(), default_table()));
        assert_eq!(default_table().iter().count(), CANONICAL_CATEGORIES.len());
    }

    #[test]
    fn test_canonical_categories_match_table_order() {
        let table = FuelTable::default();
        let names: Vec<&str> = table.iter().map(|(name, _)| name).collect();
        assert_eq!(names, CANONICAL_CATEGORIES);
    }

    #[test]
    fn test_with_aliases_extends_existing_and_adds_new() {
        let mut extra = HashMap::new();
        extra.insert("Benzina".to_string(), vec!["Benzina Super".to_string()]);
        extra.insert("Idrogeno".to_string(), vec!["H2".to_string()]);
        // already owned by Gasolio, keeps its first owner
        extra.insert("Diesel".to_string(), vec!["Gasolio".to_string()]);

        let table = FuelTable::default().with_aliases(extra);

        assert_eq!(table.categorize("Benzina Super"), "Benzina");
        assert_eq!(table.categorize("H2"), "Idrogeno");
        assert_eq!(table.categorize("Gasolio"), "Gasolio");
        assert_eq!(table.iter().count(), 8);
    }

    #[test]
    fn test_load_alias_file() {
        let path = format!(
            "{}/fuel_finder_test_aliases.json",
            std::env::temp_dir().display()
        );
        std::fs::write(&path, r#"{"GPL": ["Autogas"]}"#).unwrap();

        let table = FuelTable::load(&path).unwrap();
        assert_eq!(table.categorize("Autogas"), "GPL");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(FuelTable::load("/nonexistent/fuel_aliases.json").is_err());
    }
}
