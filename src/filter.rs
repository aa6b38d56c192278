//! Filter Model: structured include/exclude criteria over the catalog.
//!
//! Six optional token lists. An absent list means "no constraint on that
//! dimension"; an empty list (or one holding only blank tokens) is normalised
//! to absent so that it can never compile into a contradiction.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_FILTER_TOKENS;
use crate::{ShopError, ShopResult};

/// Catalog columns a filter dimension can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogField {
    Title,
    Authors,
    Description,
    Category,
}

impl CatalogField {
    /// Column name in the `BOOKS` relation.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Title => "TITLE",
            Self::Authors => "AUTHORS",
            Self::Description => "DESCRIPTION",
            Self::Category => "CATEGORY",
        }
    }
}

/// Whether a dimension narrows towards (`Include`) or away from (`Exclude`) its tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Include,
    Exclude,
}

/// One of the six filter dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterDimension {
    IncludedAuthors,
    ExcludedAuthors,
    IncludedCategories,
    ExcludedCategories,
    IncludedKeywords,
    ExcludedKeywords,
}

impl FilterDimension {
    pub const ALL: [FilterDimension; 6] = [
        Self::IncludedAuthors,
        Self::ExcludedAuthors,
        Self::IncludedCategories,
        Self::ExcludedCategories,
        Self::IncludedKeywords,
        Self::ExcludedKeywords,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncludedAuthors => "included_authors",
            Self::ExcludedAuthors => "excluded_authors",
            Self::IncludedCategories => "included_categories",
            Self::ExcludedCategories => "excluded_categories",
            Self::IncludedKeywords => "included_keywords",
            Self::ExcludedKeywords => "excluded_keywords",
        }
    }

    pub fn polarity(&self) -> Polarity {
        match self {
            Self::IncludedAuthors | Self::IncludedCategories | Self::IncludedKeywords => {
                Polarity::Include
            }
            Self::ExcludedAuthors | Self::ExcludedCategories | Self::ExcludedKeywords => {
                Polarity::Exclude
            }
        }
    }

    /// Columns searched by this dimension. Keywords span title and description.
    pub fn fields(&self) -> &'static [CatalogField] {
        match self {
            Self::IncludedAuthors | Self::ExcludedAuthors => &[CatalogField::Authors],
            Self::IncludedCategories | Self::ExcludedCategories => &[CatalogField::Category],
            Self::IncludedKeywords | Self::ExcludedKeywords => {
                &[CatalogField::Title, CatalogField::Description]
            }
        }
    }
}

impl std::fmt::Display for FilterDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterModel {
    #[serde(default)]
    pub included_authors: Option<Vec<String>>,
    #[serde(default)]
    pub excluded_authors: Option<Vec<String>>,
    #[serde(default)]
    pub included_categories: Option<Vec<String>>,
    #[serde(default)]
    pub excluded_categories: Option<Vec<String>>,
    #[serde(default)]
    pub included_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub excluded_keywords: Option<Vec<String>>,
}

impl FilterModel {
    /// Build a validated, normalised filter model.
    pub fn new(
        included_authors: Option<Vec<String>>,
        excluded_authors: Option<Vec<String>>,
        included_categories: Option<Vec<String>>,
        excluded_categories: Option<Vec<String>>,
        included_keywords: Option<Vec<String>>,
        excluded_keywords: Option<Vec<String>>,
    ) -> ShopResult<Self> {
        let model = Self {
            included_authors,
            excluded_authors,
            included_categories,
            excluded_categories,
            included_keywords,
            excluded_keywords,
        };
        model.validate()?;
        Ok(model.normalized())
    }

    /// Parse the JSON argument object produced by an extractor (or logged as
    /// `FUNC_ARGUMENTS`). Unknown keys are ignored; oversized lists are rejected.
    pub fn from_json(json: &str) -> ShopResult<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model.normalized())
    }

    /// Same as [`FilterModel::from_json`] for an already-parsed value.
    pub fn from_value(value: serde_json::Value) -> ShopResult<Self> {
        let model: Self = serde_json::from_value(value)?;
        model.validate()?;
        Ok(model.normalized())
    }

    /// Serialized form stored in the outcome log.
    pub fn to_json(&self) -> ShopResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reject any list longer than [`MAX_FILTER_TOKENS`].
    pub fn validate(&self) -> ShopResult<()> {
        for dim in FilterDimension::ALL {
            if let Some(tokens) = self.get(dim) {
                if tokens.len() > MAX_FILTER_TOKENS {
                    return Err(ShopError::Validation(format!(
                        "{} has {} entries (max {})",
                        dim,
                        tokens.len(),
                        MAX_FILTER_TOKENS
                    )));
                }
            }
        }
        Ok(())
    }

    /// Trim tokens, drop blank ones and turn empty lists into "unconstrained".
    pub fn normalized(mut self) -> Self {
        for dim in FilterDimension::ALL {
            let slot = self.slot_mut(dim);
            if let Some(tokens) = slot.take() {
                let cleaned: Vec<String> = tokens
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                if !cleaned.is_empty() {
                    *slot = Some(cleaned);
                }
            }
        }
        self
    }

    /// Tokens for a dimension, or `None` when that dimension is unconstrained.
    pub fn get(&self, dim: FilterDimension) -> Option<&[String]> {
        let slot = match dim {
            FilterDimension::IncludedAuthors => &self.included_authors,
            FilterDimension::ExcludedAuthors => &self.excluded_authors,
            FilterDimension::IncludedCategories => &self.included_categories,
            FilterDimension::ExcludedCategories => &self.excluded_categories,
            FilterDimension::IncludedKeywords => &self.included_keywords,
            FilterDimension::ExcludedKeywords => &self.excluded_keywords,
        };
        slot.as_deref().filter(|tokens| !tokens.is_empty())
    }

    fn slot_mut(&mut self, dim: FilterDimension) -> &mut Option<Vec<String>> {
        match dim {
            FilterDimension::IncludedAuthors => &mut self.included_authors,
            FilterDimension::ExcludedAuthors => &mut self.excluded_authors,
            FilterDimension::IncludedCategories => &mut self.included_categories,
            FilterDimension::ExcludedCategories => &mut self.excluded_categories,
            FilterDimension::IncludedKeywords => &mut self.included_keywords,
            FilterDimension::ExcludedKeywords => &mut self.excluded_keywords,
        }
    }

    /// Builder-style setter used by the CLI and tests. Validation still applies
    /// through [`FilterModel::validate`].
    pub fn with(mut self, dim: FilterDimension, tokens: &[&str]) -> Self {
        *self.slot_mut(dim) = Some(tokens.iter().map(|t| t.to_string()).collect());
        self.normalized()
    }

    /// Copy of this model with one dimension made unconstrained.
    pub fn without(&self, dim: FilterDimension) -> Self {
        let mut relaxed = self.clone();
        *relaxed.slot_mut(dim) = None;
        relaxed
    }

    /// Dimensions that currently carry a constraint.
    pub fn constrained_dimensions(&self) -> Vec<FilterDimension> {
        FilterDimension::ALL
            .into_iter()
            .filter(|d| self.get(*d).is_some())
            .collect()
    }

    pub fn constraint_count(&self) -> usize {
        self.constrained_dimensions().len()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.constraint_count() == 0
    }

    /// True when `self` matches at least everything `previous` matches and
    /// differs from it. A dimension may be dropped; an inclusion list may
    /// only gain tokens and an exclusion list may only lose them. Tokens
    /// compare ASCII case-insensitively, like the predicate.
    pub fn is_relaxation_of(&self, previous: &FilterModel) -> bool {
        if self == previous {
            return false;
        }
        FilterDimension::ALL.into_iter().all(|dim| {
            let Some(next) = self.get(dim) else {
                return true;
            };
            let Some(prev) = previous.get(dim) else {
                return false;
            };
            match dim.polarity() {
                Polarity::Include => prev.iter().all(|t| contains_token(next, t)),
                Polarity::Exclude => next.iter().all(|t| contains_token(prev, t)),
            }
        })
    }
}

fn contains_token(tokens: &[String], token: &str) -> bool {
    tokens.iter().any(|t| t.eq_ignore_ascii_case(token))
}
