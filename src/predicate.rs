//! Predicate compiler: filter model to typed predicate tree to parameterised SQL.
//!
//! Rules:
//!   included_X → OR over tokens (and over fields for keywords) of `Contains`
//!   excluded_X → AND over tokens (and over fields for keywords) of `NotContains`
//!   every present group is conjoined; absent groups contribute nothing.
//!
//! Matching is a case-insensitive substring test, so excluding author "Lee"
//! also excludes "Leeds". Upper-casing is ASCII-only on both the SQL side
//! (SQLite `UPPER`) and the in-memory side, so both evaluations agree.
//!
//! Tokens only ever travel as bound parameters; the SQL text is built from
//! static column names and operators.

use crate::book::CatalogEntry;
use crate::constants::MAX_FILTER_TOKENS;
use crate::filter::{CatalogField, FilterDimension, FilterModel, Polarity};

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Contains(CatalogField, String),
    NotContains(CatalogField, String),
    /// Empty `And` matches everything.
    And(Vec<Predicate>),
    /// Empty `Or` matches nothing.
    Or(Vec<Predicate>),
}

/// Output of [`compile`]: the tree plus whether any clause was emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    pub predicate: Predicate,
    pub constrained: bool,
}

/// SQL condition text with its positional parameters (`?1`, `?2`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct SqlCondition {
    pub sql: String,
    pub params: Vec<String>,
}

/// Compile a filter model. Lists longer than [`MAX_FILTER_TOKENS`] are
/// truncated here even though [`FilterModel::validate`] already rejects them.
pub fn compile(filters: &FilterModel) -> CompiledPredicate {
    let mut groups = Vec::new();

    for dim in FilterDimension::ALL {
        let Some(tokens) = filters.get(dim) else {
            continue;
        };
        if tokens.len() > MAX_FILTER_TOKENS {
            tracing::warn!(
                dimension = %dim,
                count = tokens.len(),
                "Filter list over cap, truncating"
            );
        }

        let mut clauses = Vec::new();
        for token in tokens.iter().take(MAX_FILTER_TOKENS) {
            for field in dim.fields() {
                clauses.push(match dim.polarity() {
                    Polarity::Include => Predicate::Contains(*field, token.clone()),
                    Polarity::Exclude => Predicate::NotContains(*field, token.clone()),
                });
            }
        }
        if clauses.is_empty() {
            continue;
        }

        groups.push(match dim.polarity() {
            Polarity::Include => Predicate::Or(clauses),
            Polarity::Exclude => Predicate::And(clauses),
        });
    }

    let constrained = !groups.is_empty();
    tracing::debug!(groups = groups.len(), constrained, "Predicate compiled");
    CompiledPredicate {
        predicate: Predicate::And(groups),
        constrained,
    }
}

impl CompiledPredicate {
    /// `WHERE ...` clause, or an empty clause when nothing is constrained.
    pub fn where_clause(&self) -> SqlCondition {
        if !self.constrained {
            return SqlCondition {
                sql: String::new(),
                params: Vec::new(),
            };
        }
        let cond = self.predicate.to_sql();
        SqlCondition {
            sql: format!("WHERE {}", cond.sql),
            params: cond.params,
        }
    }

    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        self.predicate.matches(entry)
    }
}

impl Predicate {
    /// Render as a parameterised SQL condition.
    pub fn to_sql(&self) -> SqlCondition {
        let mut params = Vec::new();
        let sql = self.render(&mut params);
        SqlCondition { sql, params }
    }

    fn render(&self, params: &mut Vec<String>) -> String {
        match self {
            Self::Contains(field, token) => {
                params.push(like_pattern(token));
                format!(
                    "UPPER({}) LIKE ?{} ESCAPE '\\'",
                    field.column(),
                    params.len()
                )
            }
            Self::NotContains(field, token) => {
                params.push(like_pattern(token));
                format!(
                    "UPPER({}) NOT LIKE ?{} ESCAPE '\\'",
                    field.column(),
                    params.len()
                )
            }
            Self::And(children) => render_group(children, " AND ", "1 = 1", params),
            Self::Or(children) => render_group(children, " OR ", "1 = 0", params),
        }
    }

    /// In-memory evaluation with the same semantics as the SQL rendering.
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        match self {
            Self::Contains(field, token) => contains_ci(entry.field(*field), token),
            Self::NotContains(field, token) => !contains_ci(entry.field(*field), token),
            Self::And(children) => children.iter().all(|p| p.matches(entry)),
            Self::Or(children) => children.iter().any(|p| p.matches(entry)),
        }
    }
}

fn render_group(
    children: &[Predicate],
    joiner: &str,
    empty: &str,
    params: &mut Vec<String>,
) -> String {
    if children.is_empty() {
        return empty.to_string();
    }
    let parts: Vec<String> = children.iter().map(|c| c.render(params)).collect();
    format!("({})", parts.join(joiner))
}

/// Case-insensitive substring test (ASCII case folding, like SQLite `UPPER`).
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_uppercase()
        .contains(&needle.to_ascii_uppercase())
}

/// `%TOKEN%` with LIKE wildcards in the token escaped, so tokens match literally.
fn like_pattern(token: &str) -> String {
    let mut escaped = String::with_capacity(token.len() + 2);
    escaped.push('%');
    for c in token.to_ascii_uppercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
