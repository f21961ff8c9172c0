use crate::extractor::Article;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub name: String,
    pub articles: Vec<u32>,
}

/// Static mapping from category name to the article numbers it covers.
/// Entries are ordered; tags come back in declaration order so tagging is
/// deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(rename = "category")]
    pub entries: Vec<TaxonomyEntry>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        let entry = |name: &str, articles: &[u32]| TaxonomyEntry {
            name: name.to_string(),
            articles: articles.to_vec(),
        };
        Taxonomy {
            entries: vec![
                entry("time_periods", &[4, 7, 9, 10, 28, 29, 40, 43, 47, 48]),
                entry("costs", &[7, 49, 50, 51]),
                entry("tribunal", &[16, 17, 18, 19, 20, 21, 24]),
                entry(
                    "proceedings",
                    &[
                        22, 23, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40,
                    ],
                ),
                entry("awards", &[41, 42, 43, 44, 45, 46, 47, 48]),
                entry("commencement", &[6, 7, 8, 9, 10, 11, 12, 13, 14, 15]),
            ],
        }
    }
}

impl Taxonomy {
    /// Load a taxonomy from a TOML file with `[[category]]` entries.
    pub fn load(path: &Path) -> anyhow::Result<Taxonomy> {
        let content = fs::read_to_string(path)?;
        let taxonomy: Taxonomy = toml::from_str(&content)?;
        Ok(taxonomy)
    }

    /// Category names whose ranges contain `number`, in declaration order.
    /// No match yields exactly `["general"]`, so every article always has
    /// at least one category.
    pub fn categories_for(&self, number: u32) -> Vec<String> {
        let matched: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.articles.contains(&number))
            .map(|e| e.name.clone())
            .collect();
        if matched.is_empty() {
            vec!["general".to_string()]
        } else {
            matched
        }
    }

    pub fn tag(&self, articles: &mut [Article]) {
        for article in articles {
            article.categories = self.categories_for(article.number);
        }
    }
}
