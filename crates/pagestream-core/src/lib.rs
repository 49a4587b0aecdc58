//! Pagestream Core - volume page retrieval pipeline
//!
//! This crate provides the endpoint partitioner, the stream-delimited
//! emitter, and the sequential driver that turn a set of volume ids into
//! three aligned output channels (page text, volume id, page id).

pub mod client;
pub mod driver;
pub mod emitter;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod options;
pub mod partition;
pub mod sink;

// Re-exports for convenience
pub use client::{FetchError, PageClient, PagePair, PageService, ScriptedService};
pub use driver::{run, EndpointCounts, RunSummary};
pub use emitter::{Emitter, UnitStats};
pub use endpoint::EndpointConfig;
pub use error::PipelineError;
pub use logging::init_logging;
pub use options::{RetrievalMode, StreamOptions};
pub use partition::{partition, parse_tuples, split_id_list, VolumeAssignment, WorkUnit};
pub use sink::{Frame, MarkerKind, MemorySink, PageSink, StreamMarker};
