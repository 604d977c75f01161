//! Mirrors the status-code table of a web page into a spreadsheet,
//! writing only when the table content changed.
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use log::LevelFilter;
use mirror_engine::{
    load_access_token, FetchSettings, HeadlessChromeRenderer, MirrorConfig, PageFetcher, Pipeline,
    ReqwestFetcher, RunOutcome, SheetsStore, TableExtractor, CONFIG_FILENAME,
};
use mirror_logging::{mirror_error, mirror_info, LogDestination};
use tokio_util::sync::CancellationToken;

fn main() -> ExitCode {
    mirror_logging::initialize(LogDestination::Terminal, LevelFilter::Info);

    match run(Path::new(CONFIG_FILENAME)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            mirror_error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = MirrorConfig::load(config_path).context("loading configuration")?;
    let pipeline = build_pipeline(&config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let outcome = runtime.block_on(pipeline.run(&CancellationToken::new()))?;

    match outcome {
        RunOutcome::Unchanged { .. } => {}
        RunOutcome::Published { row_count, .. } => mirror_info!(
            "Table data ({} rows) has been transferred to Google Sheets: https://docs.google.com/spreadsheets/d/{}/edit",
            row_count,
            config.spreadsheet_id
        ),
    }
    Ok(())
}

fn build_pipeline(config: &MirrorConfig) -> anyhow::Result<Pipeline> {
    let token = load_access_token(&config.credentials_file).context("loading credentials")?;
    let store = SheetsStore::new(config.sheets_settings(), &config.spreadsheet_id, token)
        .context("creating Sheets client")?;

    let fetcher: Arc<dyn PageFetcher> = match config.render_settings() {
        Some(settings) => Arc::new(HeadlessChromeRenderer::new(settings)),
        None => Arc::new(ReqwestFetcher::new(FetchSettings {
            request_timeout: std::time::Duration::from_secs(config.fetch_timeout_secs),
            ..FetchSettings::default()
        })),
    };
    let extractor = TableExtractor::new(&config.table_selector)
        .context("configuring table extractor")?;

    Ok(Pipeline::new(
        config.pipeline_settings()?,
        fetcher,
        Arc::new(store),
        extractor,
    ))
}
