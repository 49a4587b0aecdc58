//! Plan subcommand - preview the work units a fetch would execute

use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use pagestream_core::partition;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub input: super::InputArgs,

    /// Override the configured endpoint URL
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Maximum volume ids per request (0 = one request per endpoint)
    #[arg(short = 'm', long)]
    pub max_per_request: Option<usize>,
}

pub fn run(args: PlanArgs, config: &Config) -> anyhow::Result<()> {
    let mut default_endpoint = config.endpoint();
    if let Some(url) = &args.endpoint {
        default_endpoint = default_endpoint.with_address(url);
    }

    let assignments = args.input.load(config.stream.delimiter, &default_endpoint)?;
    let max_per_request = args
        .max_per_request
        .unwrap_or(config.stream.max_volumes_per_request);
    let units = partition(assignments, &default_endpoint, max_per_request);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Unit").fg(Color::Cyan),
            Cell::new("Endpoint").fg(Color::Cyan),
            Cell::new("Ids").fg(Color::Cyan),
            Cell::new("Volume ids").fg(Color::Cyan),
        ]);

    for (i, unit) in units.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&unit.endpoint.address),
            Cell::new(unit.ids.len()),
            Cell::new(preview_ids(&unit.ids)),
        ]);
    }
    eprintln!("\n{table}");

    let total: usize = units.iter().map(|u| u.ids.len()).sum();
    log::info!("{} work units over {} volume ids", units.len(), total);
    Ok(())
}

/// Shorten long id lists for display
fn preview_ids(ids: &[String]) -> String {
    const SHOWN: usize = 5;
    if ids.len() <= SHOWN {
        ids.join(", ")
    } else {
        format!("{}, … ({} more)", ids[..SHOWN].join(", "), ids.len() - SHOWN)
    }
}
