//! Fetch subcommand - retrieve page text and write the channel files

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use pagestream_core::{partition, RetrievalMode, RunSummary};
use pagestream_dataapi::DataApiService;

use crate::config::Config;
use crate::sink::JsonlSink;

#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub input: super::InputArgs,

    /// Output directory for the three channel files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Retrieve whole-volume text instead of per-page text
    #[arg(long)]
    pub whole_volumes: bool,

    /// Override the configured endpoint URL
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Maximum volume ids per request (0 = one request per endpoint)
    #[arg(short = 'm', long)]
    pub max_per_request: Option<usize>,

    /// Override wrap_stream from config
    #[arg(long)]
    pub wrap_stream: Option<bool>,

    /// Override stream_per_volume from config
    #[arg(long)]
    pub stream_per_volume: Option<bool>,
}

pub fn run(args: FetchArgs, config: &Config) -> Result<()> {
    let mut default_endpoint = config.endpoint();
    if let Some(url) = &args.endpoint {
        default_endpoint = default_endpoint.with_address(url);
    }

    let assignments = args.input.load(config.stream.delimiter, &default_endpoint)?;
    if assignments.is_empty() {
        anyhow::bail!("no volume ids in input");
    }

    let max_per_request = args
        .max_per_request
        .unwrap_or(config.stream.max_volumes_per_request);
    let units = partition(assignments, &default_endpoint, max_per_request);

    let mode = if args.whole_volumes {
        RetrievalMode::Volumes
    } else {
        RetrievalMode::Pages
    };
    let mut options = config.options(mode);
    if let Some(wrap) = args.wrap_stream {
        options.wrap_stream = wrap;
    }
    if let Some(per_volume) = args.stream_per_volume {
        options.stream_per_volume = per_volume;
    }

    let output_dir = args.output.unwrap_or_else(|| config.output.dir.clone());

    log::info!("Fetching {} work units", units.len());
    log::info!("  Endpoint: {}", default_endpoint.address);
    log::info!("  Mode: {mode:?}");
    log::info!("  Output: {}", output_dir.display());

    let mut sink = JsonlSink::create(&output_dir)
        .with_context(|| format!("Failed to create output in {}", output_dir.display()))?;

    let service = DataApiService::new();
    let summary = pagestream_core::run(&service, &units, &options, &mut sink)?;

    sink.finalize()
        .with_context(|| format!("Failed to finalize output in {}", output_dir.display()))?;

    summary.log();
    print_summary(&summary);

    if summary.total_failed_requests() > 0 {
        anyhow::bail!("{} request(s) failed", summary.total_failed_requests());
    }
    Ok(())
}

/// Print a per-endpoint summary table on stderr
fn print_summary(summary: &RunSummary) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Endpoint").fg(Color::Cyan),
            Cell::new("Volumes").fg(Color::Cyan),
            Cell::new("Pages").fg(Color::Cyan),
            Cell::new("Dropped").fg(Color::Cyan),
            Cell::new("Failed").fg(Color::Cyan),
        ]);
    for ep in &summary.endpoints {
        table.add_row(vec![
            Cell::new(&ep.address),
            Cell::new(ep.volumes),
            Cell::new(ep.pages),
            Cell::new(ep.dropped),
            Cell::new(ep.failed_requests),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total"),
        Cell::new(summary.total_volumes()),
        Cell::new(summary.total_pages()),
        Cell::new(summary.total_dropped()),
        Cell::new(summary.total_failed_requests()),
    ]);
    eprintln!("\n{table}");
}
