use serde::{Deserialize, Serialize};

use crate::filter::CatalogField;

/// Read-only catalog record. `index` is the opaque row identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub index: i64,
    pub title: String,
    pub authors: String,
    pub description: String,
    pub category: String,
    pub publisher: String,
    pub price: f64,
    pub publish_year: i64,
}

impl CatalogEntry {
    /// Text of a searchable column.
    pub fn field(&self, field: CatalogField) -> &str {
        match field {
            CatalogField::Title => &self.title,
            CatalogField::Authors => &self.authors,
            CatalogField::Description => &self.description,
            CatalogField::Category => &self.category,
        }
    }

    /// First `max_words` words of the description, with "..." when cut.
    pub fn summary(&self, max_words: usize) -> String {
        let words: Vec<&str> = self.description.split_whitespace().collect();
        if words.len() <= max_words {
            words.join(" ")
        } else {
            format!("{}...", words[..max_words].join(" "))
        }
    }
}
