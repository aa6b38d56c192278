//! Retrieval state machine.
//!
//! ```text
//! Extracting -> Compiling -> Querying -> Terminal(Success)
//!                   ^            |
//!                   |            v  (no matches, budget left)
//!                   +------- Relaxing -> Terminal(Exhausted)  (nothing left to drop)
//!
//! A relaxed model must be looser than the one before it and must not repeat
//! any model already queried; a policy that breaks either rule ends the
//! request as exhausted.
//! ```
//!
//! At most `max_attempts` queries run per request. Store faults abort at once
//! and surface as errors; no matches is recovered here until the budget or
//! the relaxation policy runs out.

pub mod relaxation;

use serde::Serialize;

use crate::book::CatalogEntry;
use crate::constants::MAX_ATTEMPTS;
use crate::extraction::FilterExtractor;
use crate::filter::FilterModel;
use crate::predicate;
use crate::query::{BookQueryService, QueryOutcome};
use crate::ShopResult;

use relaxation::RelaxationPolicy;

#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalState {
    Extracting,
    Compiling(FilterModel),
    Querying(FilterModel),
    Relaxing(FilterModel),
    Terminal(Termination),
}

impl RetrievalState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Extracting => "extracting",
            Self::Compiling(_) => "compiling",
            Self::Querying(_) => "querying",
            Self::Relaxing(_) => "relaxing",
            Self::Terminal(_) => "terminal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Termination {
    Success,
    Exhausted,
}

/// One executed query.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// 1-based.
    pub number: usize,
    pub filters: FilterModel,
    pub outcome: QueryOutcome,
}

#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub termination: Termination,
    /// Filter model as extracted, before any relaxation.
    pub original: FilterModel,
    pub attempts: Vec<Attempt>,
}

impl RetrievalOutcome {
    pub fn is_success(&self) -> bool {
        self.termination == Termination::Success
    }

    pub fn final_attempt(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    /// Candidate set of the terminal attempt (empty when exhausted).
    pub fn candidates(&self) -> &[CatalogEntry] {
        self.final_attempt().map(|a| a.outcome.books()).unwrap_or(&[])
    }

    /// Failed attempts, in order. Includes the terminal one when exhausted.
    pub fn failed_attempts(&self) -> impl Iterator<Item = &Attempt> {
        self.attempts.iter().filter(|a| !a.outcome.is_success())
    }
}

pub struct RetrievalMachine<'a> {
    service: &'a dyn BookQueryService,
    policy: &'a dyn RelaxationPolicy,
    max_attempts: usize,
}

impl<'a> RetrievalMachine<'a> {
    pub fn new(service: &'a dyn BookQueryService, policy: &'a dyn RelaxationPolicy) -> Self {
        Self {
            service,
            policy,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Clamped to 1..=3.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.clamp(1, MAX_ATTEMPTS);
        self
    }

    /// Drive one request from text to a terminal state.
    pub fn run(
        &self,
        request_id: &str,
        extractor: &dyn FilterExtractor,
        text: &str,
    ) -> ShopResult<RetrievalOutcome> {
        let mut state = RetrievalState::Extracting;
        let mut original = FilterModel::default();
        let mut attempts: Vec<Attempt> = Vec::with_capacity(self.max_attempts);

        loop {
            tracing::debug!(request_id, state = state.name(), "Retrieval transition");
            state = match state {
                RetrievalState::Extracting => {
                    let filters = extractor.extract(text)?;
                    original = filters.clone();
                    RetrievalState::Compiling(filters)
                }

                RetrievalState::Compiling(filters) => {
                    // Rejects bad models before any query. The service compiles
                    // again on its own side of the boundary, since a remote
                    // server only ever receives the filter model.
                    filters.validate()?;
                    let compiled = predicate::compile(&filters);
                    tracing::debug!(
                        request_id,
                        constrained = compiled.constrained,
                        condition = %compiled.where_clause().sql,
                        "Filters compiled"
                    );
                    RetrievalState::Querying(filters)
                }

                RetrievalState::Querying(filters) => {
                    let number = attempts.len() + 1;
                    let outcome = match self.service.query(&filters) {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            if e.is_store_fault() {
                                tracing::error!(request_id, attempt = number, "Store fault, aborting retrieval: {}", e);
                            } else {
                                tracing::warn!(request_id, attempt = number, "Query failed: {}", e);
                            }
                            return Err(e);
                        }
                    };
                    let success = outcome.is_success();
                    tracing::info!(
                        request_id,
                        attempt = number,
                        status = outcome.status(),
                        candidates = outcome.books().len(),
                        "Query attempt finished"
                    );
                    attempts.push(Attempt {
                        number,
                        filters: filters.clone(),
                        outcome,
                    });

                    if success {
                        RetrievalState::Terminal(Termination::Success)
                    } else if attempts.len() >= self.max_attempts {
                        RetrievalState::Terminal(Termination::Exhausted)
                    } else {
                        RetrievalState::Relaxing(filters)
                    }
                }

                RetrievalState::Relaxing(filters) => match self.policy.relax(&filters) {
                    None => {
                        tracing::info!(request_id, "Nothing left to relax");
                        RetrievalState::Terminal(Termination::Exhausted)
                    }
                    Some(next) if !next.is_relaxation_of(&filters) => {
                        tracing::warn!(request_id, "Relaxation did not loosen the filters, stopping");
                        RetrievalState::Terminal(Termination::Exhausted)
                    }
                    Some(next) if attempts.iter().any(|a| a.filters == next) => {
                        tracing::warn!(request_id, "Relaxation repeated an earlier model, stopping");
                        RetrievalState::Terminal(Termination::Exhausted)
                    }
                    Some(next) => RetrievalState::Compiling(next),
                },

                RetrievalState::Terminal(termination) => {
                    if termination == Termination::Exhausted {
                        tracing::warn!(request_id, attempts = attempts.len(), "Retrieval exhausted");
                    }
                    return Ok(RetrievalOutcome {
                        termination,
                        original,
                        attempts,
                    });
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::relaxation::DropDimension;
    use super::*;
    use crate::extraction::StaticExtractor;
    use crate::filter::FilterDimension;
    use crate::predicate::contains_ci;
    use crate::query::CatalogExecutor;
    use crate::test_helpers::{sample_catalog, seeded_store, BookBuilder, FailingExtractor, ScriptedQueryService};
    use crate::ShopError;

    fn fully_constrained() -> FilterModel {
        let mut f = FilterModel::default();
        for dim in FilterDimension::ALL {
            f = f.with(dim, &["zzz"]);
        }
        f
    }

    #[test]
    fn test_first_attempt_success() {
        let service = ScriptedQueryService::new(vec![Ok(QueryOutcome::Success {
            books: vec![BookBuilder::new().build()],
        })]);
        let extractor = StaticExtractor::new(fully_constrained());
        let out = RetrievalMachine::new(&service, &DropDimension)
            .run("r1", &extractor, "text")
            .unwrap();
        assert!(out.is_success());
        assert_eq!(out.attempts.len(), 1);
        assert_eq!(out.candidates().len(), 1);
        assert_eq!(service.calls().len(), 1);
    }

    #[test]
    fn test_never_more_than_three_attempts_and_each_loosens() {
        let service = ScriptedQueryService::always_empty();
        let extractor = StaticExtractor::new(fully_constrained());
        let out = RetrievalMachine::new(&service, &DropDimension)
            .run("r2", &extractor, "text")
            .unwrap();
        assert_eq!(out.termination, Termination::Exhausted);
        assert_eq!(out.attempts.len(), MAX_ATTEMPTS);
        assert_eq!(service.calls().len(), MAX_ATTEMPTS);
        assert_eq!(out.original, fully_constrained());
        assert_eq!(out.attempts[0].filters, out.original);
        for pair in out.attempts.windows(2) {
            assert!(pair[1].filters.constraint_count() < pair[0].filters.constraint_count());
            for dim in pair[1].filters.constrained_dimensions() {
                assert_eq!(pair[1].filters.get(dim), pair[0].filters.get(dim));
            }
        }
        assert!(matches!(
            out.final_attempt().unwrap().outcome,
            QueryOutcome::Error { .. }
        ));
    }

    #[test]
    fn test_max_attempts_clamped() {
        let service = ScriptedQueryService::always_empty();
        let extractor = StaticExtractor::new(fully_constrained());
        let out = RetrievalMachine::new(&service, &DropDimension)
            .with_max_attempts(10)
            .run("r3", &extractor, "text")
            .unwrap();
        assert_eq!(out.attempts.len(), 3);

        let service = ScriptedQueryService::always_empty();
        let out = RetrievalMachine::new(&service, &DropDimension)
            .with_max_attempts(1)
            .run("r3b", &extractor, "text")
            .unwrap();
        assert_eq!(out.attempts.len(), 1);
    }

    #[test]
    fn test_exhausts_early_when_nothing_to_relax() {
        let service = ScriptedQueryService::always_empty();
        let single = FilterModel::default().with(FilterDimension::IncludedAuthors, &["Nobody"]);
        let out = RetrievalMachine::new(&service, &DropDimension)
            .run("r4", &StaticExtractor::new(single), "text")
            .unwrap();
        // Constrained attempt, then the unconstrained one, then nothing to drop.
        assert_eq!(out.attempts.len(), 2);
        assert!(out.attempts[1].filters.is_unconstrained());
        assert_eq!(out.termination, Termination::Exhausted);

        let service = ScriptedQueryService::always_empty();
        let out = RetrievalMachine::new(&service, &DropDimension)
            .run("r5", &StaticExtractor::default(), "text")
            .unwrap();
        assert_eq!(out.attempts.len(), 1);
    }

    #[test]
    fn test_store_fault_aborts_without_retry() {
        let service = ScriptedQueryService::new(vec![
            Ok(QueryOutcome::no_matches()),
            Err(ShopError::StoreUnavailable("disk gone".into())),
            Ok(QueryOutcome::no_matches()),
        ]);
        let err = RetrievalMachine::new(&service, &DropDimension)
            .run("r6", &StaticExtractor::new(fully_constrained()), "text")
            .unwrap_err();
        assert!(matches!(err, ShopError::StoreUnavailable(_)));
        assert_eq!(service.calls().len(), 2);
    }

    #[test]
    fn test_extraction_failure_runs_no_query() {
        let service = ScriptedQueryService::always_empty();
        let err = RetrievalMachine::new(&service, &DropDimension)
            .run("r7", &FailingExtractor, "text")
            .unwrap_err();
        assert!(matches!(err, ShopError::Extraction(_)));
        assert!(service.calls().is_empty());
    }

    #[test]
    fn test_oversized_extraction_rejected_before_query() {
        let service = ScriptedQueryService::always_empty();
        let mut raw = FilterModel::default();
        raw.included_authors = Some((0..11).map(|i| i.to_string()).collect());
        let err = RetrievalMachine::new(&service, &DropDimension)
            .run("r8", &StaticExtractor::new(raw), "text")
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
        assert!(service.calls().is_empty());
    }

    #[test]
    fn test_unknown_author_relaxed_against_real_catalog() {
        let (_dir, store) = seeded_store(&sample_catalog());
        let executor = CatalogExecutor::new(store);
        let f = FilterModel::default()
            .with(FilterDimension::IncludedAuthors, &["Nobody Atall"])
            .with(FilterDimension::ExcludedCategories, &["politics"]);
        let out = RetrievalMachine::new(&executor, &DropDimension)
            .run("r9", &StaticExtractor::new(f), "text")
            .unwrap();
        assert!(out.is_success());
        assert_eq!(out.attempts.len(), 2);
        assert!(out.attempts[1].filters.get(FilterDimension::IncludedAuthors).is_none());
        for b in out.candidates() {
            assert!(!contains_ci(&b.category, "politics"));
        }
    }

    /// Swaps between two fixed models, adding constraints on the way out.
    struct SwapPolicy {
        first: FilterModel,
        second: FilterModel,
    }

    impl RelaxationPolicy for SwapPolicy {
        fn relax(&self, previous: &FilterModel) -> Option<FilterModel> {
            if *previous == self.first {
                Some(self.second.clone())
            } else {
                Some(self.first.clone())
            }
        }
    }

    #[test]
    fn test_policy_that_tightens_or_cycles_is_stopped() {
        let first = FilterModel::default().with(FilterDimension::IncludedAuthors, &["a"]);
        let second = FilterModel::default()
            .with(FilterDimension::IncludedKeywords, &["x"])
            .with(FilterDimension::ExcludedAuthors, &["y"]);
        let policy = SwapPolicy {
            first: first.clone(),
            second: second.clone(),
        };

        let service = ScriptedQueryService::always_empty();
        let out = RetrievalMachine::new(&service, &policy)
            .run("r10", &StaticExtractor::new(first.clone()), "text")
            .unwrap();
        assert_eq!(out.termination, Termination::Exhausted);
        assert_eq!(out.attempts.len(), 1);
        assert_eq!(service.calls(), vec![first]);

        // Starting from the wider side: the swap back adds a dimension.
        let service = ScriptedQueryService::always_empty();
        let out = RetrievalMachine::new(&service, &policy)
            .run("r11", &StaticExtractor::new(second.clone()), "text")
            .unwrap();
        assert_eq!(out.attempts.len(), 1);
        assert_eq!(service.calls(), vec![second]);
    }

    #[test]
    fn test_attempts_never_repeat_a_model() {
        let service = ScriptedQueryService::always_empty();
        let out = RetrievalMachine::new(&service, &DropDimension)
            .run("r12", &StaticExtractor::new(fully_constrained()), "text")
            .unwrap();
        for (i, a) in out.attempts.iter().enumerate() {
            for b in &out.attempts[i + 1..] {
                assert_ne!(a.filters, b.filters);
                assert!(b.filters.is_relaxation_of(&a.filters));
            }
        }
    }
}
