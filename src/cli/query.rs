use anyhow::{Context, Result};
use clap::Args;

use bookshop_search::config::ShopConfig;
use bookshop_search::filter::FilterModel;

/// Filter model as command-line flags. Each flag may be repeated.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    #[arg(long = "include-author")]
    pub included_authors: Vec<String>,
    #[arg(long = "exclude-author")]
    pub excluded_authors: Vec<String>,
    #[arg(long = "include-category")]
    pub included_categories: Vec<String>,
    #[arg(long = "exclude-category")]
    pub excluded_categories: Vec<String>,
    #[arg(long = "include-keyword")]
    pub included_keywords: Vec<String>,
    #[arg(long = "exclude-keyword")]
    pub excluded_keywords: Vec<String>,
}

fn present(tokens: Vec<String>) -> Option<Vec<String>> {
    (!tokens.is_empty()).then_some(tokens)
}

impl FilterArgs {
    pub fn into_model(self) -> Result<FilterModel> {
        let model = FilterModel::new(
            present(self.included_authors),
            present(self.excluded_authors),
            present(self.included_categories),
            present(self.excluded_categories),
            present(self.included_keywords),
            present(self.excluded_keywords),
        )?;
        Ok(model)
    }
}

/// `query [filters] [--remote]`: one attempt, raw JSON out.
pub fn run(args: FilterArgs, remote: bool) -> Result<()> {
    let config = ShopConfig::load();
    let filters = args.into_model()?;
    let service = super::query_service(&config, remote);

    let outcome = service.query(&filters).context("Query failed")?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
