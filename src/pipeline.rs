//! Request orchestrator.
//!
//! One request runs these stages in order, each called directly:
//! augment (session dislikes) -> extract -> compile/query/relax -> select -> log.
//! Everything a stage needs about the request travels in [`RequestContext`].

use std::sync::Arc;

use serde::Serialize;

use crate::config::ShopConfig;
use crate::extraction::FilterExtractor;
use crate::id_gen;
use crate::outcome_log::{LogReport, OutcomeLogger};
use crate::query::BookQueryService;
use crate::retrieval::relaxation::{DropDimension, RelaxationPolicy};
use crate::retrieval::{RetrievalMachine, Termination};
use crate::selection::{Recommendation, SelectionStage};
use crate::session::DislikeMemory;
use crate::ShopResult;

#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlates log lines and outcome rows of one request.
    pub request_id: String,
    pub user_text: String,
    pub session_id: Option<String>,
}

impl RequestContext {
    pub fn new(user_text: impl Into<String>) -> Self {
        Self {
            request_id: id_gen::request_id(),
            user_text: user_text.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResponse {
    pub request_id: String,
    pub termination: Termination,
    pub attempts: usize,
    pub recommendation: Recommendation,
    /// User-facing text.
    pub text: String,
    #[serde(skip)]
    pub logged: LogReport,
}

pub struct RecommendationPipeline {
    service: Arc<dyn BookQueryService>,
    extractor: Arc<dyn FilterExtractor>,
    memory: Option<Arc<dyn DislikeMemory>>,
    relaxation: Box<dyn RelaxationPolicy>,
    selection: SelectionStage,
    logger: OutcomeLogger,
    max_attempts: usize,
}

impl RecommendationPipeline {
    pub fn new(
        service: Arc<dyn BookQueryService>,
        extractor: Arc<dyn FilterExtractor>,
        logger: OutcomeLogger,
    ) -> Self {
        Self {
            service,
            extractor,
            memory: None,
            relaxation: Box::new(DropDimension),
            selection: SelectionStage::default(),
            logger,
            max_attempts: crate::constants::MAX_ATTEMPTS,
        }
    }

    /// Apply the retrieval and selection sections of `config`.
    pub fn configured(mut self, config: &ShopConfig) -> Self {
        self.max_attempts = config.retrieval.effective_max_attempts();
        self.logger = self
            .logger
            .log_every_failed_attempt(config.retrieval.log_every_failed_attempt);
        self.with_selection(SelectionStage::new(
            config.selection.effective_max_recommendations(),
            config.selection.summary_words,
        ))
    }

    pub fn with_memory(mut self, memory: Arc<dyn DislikeMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_relaxation(mut self, policy: Box<dyn RelaxationPolicy>) -> Self {
        self.relaxation = policy;
        self
    }

    pub fn with_selection(mut self, selection: SelectionStage) -> Self {
        self.selection = selection;
        self
    }

    pub fn logger(&self) -> &OutcomeLogger {
        &self.logger
    }

    /// Run one request end to end.
    ///
    /// `Err` means a fault (store unavailable, extraction failed, invalid
    /// filters) and carries no partial recommendation. Nothing is logged to
    /// the outcome tables in that case.
    pub fn handle(&self, ctx: &RequestContext) -> ShopResult<PipelineResponse> {
        let request_id = ctx.request_id.as_str();
        tracing::info!(request_id, session = ?ctx.session_id, "Request received");

        let text = self.augment(ctx);

        let retrieval = RetrievalMachine::new(self.service.as_ref(), self.relaxation.as_ref())
            .with_max_attempts(self.max_attempts)
            .run(request_id, self.extractor.as_ref(), &text)?;

        let logged = self.logger.record(request_id, &ctx.user_text, &retrieval);

        let recommendation = self.selection.recommend(&retrieval);
        let text = self.selection.render(&recommendation);

        tracing::info!(
            request_id,
            termination = ?retrieval.termination,
            attempts = retrieval.attempts.len(),
            recommended = recommendation.books().len(),
            "Request finished"
        );

        Ok(PipelineResponse {
            request_id: ctx.request_id.clone(),
            termination: retrieval.termination,
            attempts: retrieval.attempts.len(),
            recommendation,
            text,
            logged,
        })
    }

    /// Session augmentation is best effort: on failure the raw text is used.
    fn augment(&self, ctx: &RequestContext) -> String {
        let (Some(memory), Some(session_id)) = (&self.memory, &ctx.session_id) else {
            return ctx.user_text.clone();
        };
        match memory.augment_with_dislikes(session_id, &ctx.user_text) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(request_id = %ctx.request_id, "Session memory unavailable: {}", e);
                ctx.user_text.clone()
            }
        }
    }
}
