// oracle_cli/src/main.rs
//
// Thin shell per the crate-boundary split: reads the four C1/C2 source
// documents from disk, builds one `AnalysisEngine`, and runs it against
// every URL given on the command line, printing each `AnalysisOutput`
// (plus the C5 parameter predictions and any consistency warnings) as
// pretty JSON. All decision logic lives in `oracle_core`.

use clap::Parser;
use oracle_core::gtm;
use oracle_core::logging;
use oracle_core::model::{EventName, ParameterPrediction};
use oracle_core::page_context::{signals::NoDomSignals, RuntimeSignalInputs};
use oracle_core::param_predictor::{self, CallerProvidedContext};
use oracle_core::spec_store::{load_site_config_bundle, SpecStore};
use oracle_core::{AnalysisEngine, AnalysisOutput, OracleError};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;

/// Predicts GA4/GTM event admissibility and parameter values for one or
/// more pages, given a GTM container export and the written tracking spec.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the GTM container export (containerVersion JSON).
    #[arg(long)]
    container: String,

    /// Path to the written development guide (event definitions).
    #[arg(long)]
    guide: String,

    /// Path to the parameter mapping CSV.
    #[arg(long)]
    parameters: String,

    /// Path to the site configuration bundle JSON. Defaults to an empty
    /// bundle (`{"sites": {}}`) if omitted.
    #[arg(long)]
    site_config: Option<String>,

    /// One or more URLs to analyze.
    #[arg(required = true)]
    urls: Vec<String>,

    /// Product name the driver observed on the page, if any (feeds C5
    /// value-derivation step 5 for `item_name`).
    #[arg(long)]
    product_name: Option<String>,

    /// Promotion name the driver observed on the page, if any.
    #[arg(long)]
    promotion_name: Option<String>,

    /// Search term the driver observed on the page, if any.
    #[arg(long)]
    search_term: Option<String>,

    /// Live-broadcast title the driver observed on the page, if any.
    #[arg(long)]
    live_title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisReport<'a> {
    #[serde(flatten)]
    output: &'a AnalysisOutput,
    predicted_parameters: &'a HashMap<EventName, Vec<ParameterPrediction>>,
    consistency_warnings: &'a Vec<oracle_core::errors::ConsistencyWarning>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logger().ok();

    let cli = Cli::parse();

    let container_json = fs::read_to_string(&cli.container)
        .map_err(|e| OracleError::config("cli_read_container", e.to_string(), cli.container.clone()))?;
    let guide_text = fs::read_to_string(&cli.guide)
        .map_err(|e| OracleError::config("cli_read_guide", e.to_string(), cli.guide.clone()))?;
    let parameter_csv = fs::read_to_string(&cli.parameters)
        .map_err(|e| OracleError::config("cli_read_parameters", e.to_string(), cli.parameters.clone()))?;
    let site_config_json = match &cli.site_config {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| OracleError::config("cli_read_site_config", e.to_string(), path.clone()))?,
        None => "{\"sites\": {}}".to_string(),
    };

    let container = gtm::parse(&container_json)?;
    let site_bundle = load_site_config_bundle(&site_config_json)?;
    let spec_store = SpecStore::new(&guide_text, &parameter_csv, site_bundle)?;
    let engine = AnalysisEngine::new(&container, &spec_store);

    let caller_ctx = CallerProvidedContext {
        product_name: cli.product_name.clone(),
        promotion_name: cli.promotion_name.clone(),
        search_term: cli.search_term.clone(),
        live_title: cli.live_title.clone(),
        spa_content_group_override: None,
    };

    for url in &cli.urls {
        let runtime = RuntimeSignalInputs::default();
        let result = engine
            .analyze(
                url,
                &runtime,
                &NoDomSignals,
                None,
                None,
                None,
                &caller_ctx,
                None,
            )
            .await;

        let report = AnalysisReport {
            output: &result.output,
            predicted_parameters: &result.predicted_parameters,
            consistency_warnings: &result.consistency_warnings,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
