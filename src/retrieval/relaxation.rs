//! Relaxation policies: how the next attempt loosens the previous one.

use crate::filter::{FilterDimension, FilterModel};

/// Order in which whole dimensions are dropped. Positive constraints go
/// first since they narrow the result the most; exclusions carry explicit
/// dislikes and are given up last.
pub const RELAXATION_ORDER: [FilterDimension; 6] = [
    FilterDimension::IncludedKeywords,
    FilterDimension::IncludedCategories,
    FilterDimension::IncludedAuthors,
    FilterDimension::ExcludedKeywords,
    FilterDimension::ExcludedCategories,
    FilterDimension::ExcludedAuthors,
];

pub trait RelaxationPolicy: Send + Sync {
    /// Strictly looser model than `previous`, or `None` when nothing is left
    /// to loosen.
    fn relax(&self, previous: &FilterModel) -> Option<FilterModel>;
}

/// Drops the first constrained dimension in [`RELAXATION_ORDER`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DropDimension;

impl RelaxationPolicy for DropDimension {
    fn relax(&self, previous: &FilterModel) -> Option<FilterModel> {
        let dim = RELAXATION_ORDER
            .into_iter()
            .find(|d| previous.get(*d).is_some())?;
        tracing::debug!(dropped = %dim, "Relaxing filters");
        Some(previous.without(dim))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_covers_every_dimension_once() {
        for dim in FilterDimension::ALL {
            assert_eq!(RELAXATION_ORDER.iter().filter(|d| **d == dim).count(), 1);
        }
    }

    #[test]
    fn test_drops_keywords_before_authors() {
        let f = FilterModel::default()
            .with(FilterDimension::IncludedAuthors, &["Stanley"])
            .with(FilterDimension::IncludedKeywords, &["space"]);
        let relaxed = DropDimension.relax(&f).unwrap();
        assert!(relaxed.get(FilterDimension::IncludedKeywords).is_none());
        assert!(relaxed.get(FilterDimension::IncludedAuthors).is_some());
    }

    #[test]
    fn test_each_step_strictly_loosens() {
        let mut f = FilterModel::default();
        for dim in FilterDimension::ALL {
            f = f.with(dim, &["x"]);
        }
        let mut seen = vec![f.clone()];
        while let Some(next) = DropDimension.relax(&f) {
            assert_eq!(next.constraint_count() + 1, f.constraint_count());
            for dim in next.constrained_dimensions() {
                assert_eq!(next.get(dim), f.get(dim), "relaxation must not alter kept tokens");
            }
            assert!(!seen.contains(&next));
            seen.push(next.clone());
            f = next;
        }
        assert!(f.is_unconstrained());
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn test_unconstrained_cannot_relax() {
        assert!(DropDimension.relax(&FilterModel::default()).is_none());
    }
}
