//! Sequential pipeline driver

use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::client::{PageClient, PageService};
use crate::emitter::{Emitter, UnitStats};
use crate::error::PipelineError;
use crate::options::{RetrievalMode, StreamOptions};
use crate::partition::WorkUnit;
use crate::sink::{MarkerKind, PageSink, StreamMarker};

/// Per-endpoint diagnostics, aggregated over that endpoint's work units
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointCounts {
    pub address: String,
    pub volumes: usize,
    pub pages: usize,
    pub dropped: usize,
    /// Requests that could not be serviced at all (treated as zero pages)
    pub failed_requests: usize,
}

/// Summary of one pipeline invocation (advisory; not part of the data contract)
#[derive(Debug, Default)]
pub struct RunSummary {
    pub endpoints: Vec<EndpointCounts>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn total_volumes(&self) -> usize {
        self.endpoints.iter().map(|e| e.volumes).sum()
    }

    pub fn total_pages(&self) -> usize {
        self.endpoints.iter().map(|e| e.pages).sum()
    }

    pub fn total_dropped(&self) -> usize {
        self.endpoints.iter().map(|e| e.dropped).sum()
    }

    pub fn total_failed_requests(&self) -> usize {
        self.endpoints.iter().map(|e| e.failed_requests).sum()
    }

    pub fn log(&self) {
        log::info!("=== Retrieval Summary ===");
        for ep in &self.endpoints {
            log::info!(
                "{}: {} volumes, {} pages ({} dropped, {} failed requests)",
                ep.address,
                ep.volumes,
                ep.pages,
                ep.dropped,
                ep.failed_requests
            );
        }
        log::info!(
            "Total: {} volumes, {} pages in {:.1}s",
            self.total_volumes(),
            self.total_pages(),
            self.elapsed.as_secs_f64()
        );
    }
}

/// Run the retrieval pipeline over the partitioned work units.
///
/// Units are processed one at a time, in partition order. Each unit gets a
/// fresh client bound to its endpoint, released after the unit regardless
/// of outcome. When batch markers are on, one BatchStart/BatchEnd pair
/// wraps the entire invocation, not each unit.
pub fn run<SV: PageService, SK: PageSink>(
    service: &SV,
    units: &[WorkUnit],
    options: &StreamOptions,
    sink: &mut SK,
) -> Result<RunSummary, PipelineError> {
    let start = Instant::now();
    log::debug!(
        "wrap_stream: {} stream_per_volume: {}",
        options.wrap_stream,
        options.stream_per_volume
    );

    if options.batch_markers() {
        sink.marker(StreamMarker::new(MarkerKind::BatchStart, options.stream_id))
            .map_err(PipelineError::Output)?;
    }

    let mut endpoints: Vec<EndpointCounts> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();

    for unit in units {
        let (stats, failed) = process_unit(service, unit, options, sink)?;

        let slot = *index.entry(unit.endpoint.address.clone()).or_insert_with(|| {
            endpoints.push(EndpointCounts {
                address: unit.endpoint.address.clone(),
                ..Default::default()
            });
            endpoints.len() - 1
        });
        let counts = &mut endpoints[slot];
        counts.volumes += stats.volumes;
        counts.pages += stats.pages;
        counts.dropped += stats.dropped;
        if failed {
            counts.failed_requests += 1;
        }
    }

    if options.batch_markers() {
        sink.marker(StreamMarker::new(MarkerKind::BatchEnd, options.stream_id))
            .map_err(PipelineError::Output)?;
    }

    Ok(RunSummary {
        endpoints,
        elapsed: start.elapsed(),
    })
}

/// Process one work unit: connect, fetch, emit, finish, release.
///
/// Returns the unit's counters and whether the request failed outright.
fn process_unit<SV: PageService, SK: PageSink>(
    service: &SV,
    unit: &WorkUnit,
    options: &StreamOptions,
    sink: &mut SK,
) -> Result<(UnitStats, bool), PipelineError> {
    let address = &unit.endpoint.address;
    log::debug!("requesting {} ids from {address}", unit.ids.len());

    let mut client = match service.connect(&unit.endpoint) {
        Ok(client) => client,
        Err(e) => {
            log::warn!("{address}: could not connect: {e}");
            return Ok((UnitStats::default(), true));
        }
    };

    let mut emitter = Emitter::new(options);
    let mut failed = false;

    let fetch = match options.mode {
        RetrievalMode::Pages => client.fetch_pages(&unit.ids),
        RetrievalMode::Volumes => client.fetch_volumes(&unit.ids),
    };

    let emit_result: Result<(), PipelineError> = match fetch {
        Ok(pages) => {
            let mut result = Ok(());
            for item in pages {
                match item {
                    Ok(pair) => {
                        if let Err(e) = emitter.emit(sink, &pair) {
                            result = Err(PipelineError::Output(e));
                            break;
                        }
                    }
                    Err(e) => {
                        // Mid-stream transport error: keep what was emitted,
                        // close the open volume below.
                        log::warn!("{address}: page sequence ended early: {e}");
                        failed = true;
                        break;
                    }
                }
            }
            result
        }
        Err(e) => {
            log::warn!("{address}: no results - possible communication error: {e}");
            failed = true;
            Ok(())
        }
    };

    let finish_result = if emit_result.is_ok() {
        emitter.finish(sink).map_err(PipelineError::Output)
    } else {
        emit_result
    };

    // Release happens regardless of outcome; a release error is reported
    // only once the unit's output is fully emitted.
    let close_result = client.close();

    finish_result?;
    if let Err(e) = close_result {
        return Err(PipelineError::Release(e));
    }

    let stats = emitter.stats();
    log::info!(
        "{address}: pushed {} volumes with a total of {} pages",
        stats.volumes,
        stats.pages
    );
    Ok((stats, failed))
}
