use std::sync::Arc;

use anyhow::{Context, Result};

use bookshop_search::config::ShopConfig;
use bookshop_search::extraction::{FilterExtractor, HttpExtractor, StaticExtractor};
use bookshop_search::filter::FilterModel;
use bookshop_search::id_gen;
use bookshop_search::outcome_log::OutcomeLogger;
use bookshop_search::pipeline::{RecommendationPipeline, RequestContext};
use bookshop_search::session::SessionLedger;

/// `recommend "<text>"`: full pipeline. `session` is `Some(None)` for a
/// bare `--session`, which starts a new conversation.
pub fn run(
    text: &str,
    filters: Option<&str>,
    session: Option<Option<String>>,
    remote: bool,
    json: bool,
) -> Result<()> {
    let config = ShopConfig::load();

    let extractor: Arc<dyn FilterExtractor> = match filters {
        Some(raw) => Arc::new(StaticExtractor::new(
            FilterModel::from_json(raw).context("Invalid --filters JSON")?,
        )),
        None => Arc::new(HttpExtractor::from_config(&config.extractor)?),
    };

    let logger = OutcomeLogger::open(&config.storage.telemetry_path(), &config.telemetry);
    let mut pipeline = RecommendationPipeline::new(super::query_service(&config, remote), extractor, logger)
        .configured(&config);

    let mut ctx = RequestContext::new(text);
    if let Some(id) = session {
        let id = id.unwrap_or_else(|| {
            let fresh = id_gen::session_id();
            eprintln!("Session: {} (pass --session {} to continue it)", fresh, fresh);
            fresh
        });
        ctx = ctx.with_session(id);
        pipeline = pipeline.with_memory(Arc::new(SessionLedger::default_location()));
    }

    let response = pipeline
        .handle(&ctx)
        .with_context(|| format!("Request {} could not be completed", ctx.request_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", response.text);
    }
    Ok(())
}
