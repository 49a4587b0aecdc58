//! pagestream - retrieve volume page text as aligned output channels
//!
//! Partitions volume ids across content-service endpoints, retrieves
//! page or whole-volume text, and writes three aligned JSON-lines
//! channels (text, volume id, page id) with stream boundary markers.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;
mod sink;

use config::Config;

#[derive(Parser)]
#[command(name = "pagestream")]
#[command(about = "Retrieve volume page text as aligned output channels")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file path (default: ./pagestream.toml or ~/.config/pagestream/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Retrieve pages and write the channel files
    Fetch(cmd::fetch::FetchArgs),
    /// Show the work units a fetch would execute
    Plan(cmd::plan::PlanArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    pagestream_core::init_logging(cli.quiet, cli.debug);

    // Load configuration
    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Fetch(args) => cmd::fetch::run(args, &config),
        Command::Plan(args) => cmd::plan::run(args, &config),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec!["Endpoint URL", &config.dataapi.endpoint_url]);
            table.add_row(vec![
                "Auth token",
                if config.dataapi.auth_token.is_some() {
                    "configured"
                } else {
                    "not set"
                },
            ]);
            table.add_row(vec![
                "Accept self-signed",
                &config.dataapi.auth_selfsigned.to_string(),
            ]);
            table.add_row(vec![
                "Connection timeout",
                &format!("{}ms", config.http.connection_timeout_ms),
            ]);
            table.add_row(vec![
                "Read timeout",
                &format!("{}ms", config.http.read_timeout_ms),
            ]);
            table.add_row(vec!["Wrap stream", &config.stream.wrap_stream.to_string()]);
            table.add_row(vec![
                "Stream per volume",
                &config.stream.stream_per_volume.to_string(),
            ]);
            table.add_row(vec!["Stream id", &config.stream.stream_id.to_string()]);
            table.add_row(vec!["Delimiter", &config.stream.delimiter.to_string()]);
            table.add_row(vec![
                "Max volumes per request",
                &config.stream.max_volumes_per_request.to_string(),
            ]);
            table.add_row(vec![
                "Output directory",
                &config.output.dir.display().to_string(),
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
