//! Identifier partitioner - endpoint grouping and request chunking

use rustc_hash::FxHashMap;

use crate::endpoint::EndpointConfig;
use crate::error::PipelineError;

/// Tuple-input field naming the volume id (required)
pub const FIELD_VOLUME_ID: &str = "volume_id";
/// Tuple-input field naming the serving endpoint (optional)
pub const FIELD_ENDPOINT: &str = "endpoint";

/// One input volume with an optional explicit endpoint assignment
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeAssignment {
    pub id: String,
    pub endpoint: Option<EndpointConfig>,
}

impl VolumeAssignment {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            endpoint: None,
        }
    }
}

/// One bounded request: an endpoint plus at most `max_per_request` ids
#[derive(Debug, Clone, PartialEq)]
pub struct WorkUnit {
    pub endpoint: EndpointConfig,
    pub ids: Vec<String>,
}

/// Group assignments by resolved endpoint and split each group into chunks
/// of at most `max_per_request` ids (`0` = one unit per endpoint).
///
/// Endpoint groups keep the order of their first appearance in the input;
/// ids keep input order within a group.
pub fn partition(
    assignments: Vec<VolumeAssignment>,
    default_endpoint: &EndpointConfig,
    max_per_request: usize,
) -> Vec<WorkUnit> {
    let mut groups: Vec<(EndpointConfig, Vec<String>)> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();

    for assignment in assignments {
        let endpoint = assignment
            .endpoint
            .unwrap_or_else(|| default_endpoint.clone());
        let slot = *index.entry(endpoint.address.clone()).or_insert_with(|| {
            groups.push((endpoint.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(assignment.id);
    }

    let mut units = Vec::new();
    for (endpoint, ids) in groups {
        if max_per_request == 0 {
            units.push(WorkUnit { endpoint, ids });
        } else {
            for chunk in ids.chunks(max_per_request) {
                units.push(WorkUnit {
                    endpoint: endpoint.clone(),
                    ids: chunk.to_vec(),
                });
            }
        }
    }
    units
}

/// Split a flat delimited id list into assignments (default endpoint).
///
/// Ids are trimmed; ids empty after trimming are skipped with a warning.
pub fn split_id_list(list: &str, delimiter: char) -> Vec<VolumeAssignment> {
    list.split(delimiter)
        .filter_map(|raw| {
            let id = raw.trim();
            if id.is_empty() {
                log::warn!("skipping empty volume id in input list");
                None
            } else {
                Some(VolumeAssignment::new(id))
            }
        })
        .collect()
}

/// Parse structured tuple input: a tab-separated header line naming the
/// fields, then one row per volume.
///
/// A header without `volume_id` is a fatal [`PipelineError::MissingField`].
/// A header without `endpoint` is non-fatal: every row falls back to the
/// default endpoint. Explicit endpoints inherit the default's timeouts and
/// credentials.
pub fn parse_tuples(
    input: &str,
    default_endpoint: &EndpointConfig,
) -> Result<Vec<VolumeAssignment>, PipelineError> {
    let mut lines = input.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().unwrap_or("");
    let fields: Vec<&str> = header.split('\t').map(str::trim).collect();

    let id_idx = fields.iter().position(|f| *f == FIELD_VOLUME_ID).ok_or(
        PipelineError::MissingField {
            field: FIELD_VOLUME_ID,
        },
    )?;
    let endpoint_idx = fields.iter().position(|f| *f == FIELD_ENDPOINT);
    if endpoint_idx.is_none() {
        log::warn!("missing {FIELD_ENDPOINT} from input tuples - assuming default");
    }

    let mut assignments = Vec::new();
    for line in lines {
        let values: Vec<&str> = line.split('\t').collect();
        let id = values.get(id_idx).map_or("", |v| v.trim());
        if id.is_empty() {
            log::warn!("skipping tuple with empty volume id");
            continue;
        }
        let endpoint = endpoint_idx
            .and_then(|i| values.get(i))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|addr| default_endpoint.with_address(addr));
        assignments.push(VolumeAssignment {
            id: id.to_string(),
            endpoint,
        });
    }
    log::debug!("parsed {} volume assignments from tuples", assignments.len());
    Ok(assignments)
}
