//! CLI subcommand implementations

pub mod fetch;
pub mod plan;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pagestream_core::{parse_tuples, split_id_list, EndpointConfig, VolumeAssignment};

/// Volume id input, shared by `fetch` and `plan`
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Delimited volume id list (see the `delimiter` setting)
    #[arg(long, conflicts_with_all = ["input", "tuples"])]
    pub ids: Option<String>,

    /// File containing a delimited volume id list
    #[arg(long, conflicts_with = "tuples")]
    pub input: Option<PathBuf>,

    /// Tab-separated tuple file; the header names the volume_id and
    /// optional endpoint columns
    #[arg(long)]
    pub tuples: Option<PathBuf>,
}

impl InputArgs {
    pub fn load(
        &self,
        delimiter: char,
        default_endpoint: &EndpointConfig,
    ) -> Result<Vec<VolumeAssignment>> {
        if let Some(list) = &self.ids {
            return Ok(split_id_list(list, delimiter));
        }
        if let Some(path) = &self.input {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read id list: {}", path.display()))?;
            return Ok(split_id_list(content.trim_end(), delimiter));
        }
        if let Some(path) = &self.tuples {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read tuple file: {}", path.display()))?;
            let assignments = parse_tuples(&content, default_endpoint)
                .with_context(|| format!("Failed to parse tuple file: {}", path.display()))?;
            return Ok(assignments);
        }
        anyhow::bail!("one of --ids, --input, or --tuples is required")
    }
}
