//! Per-invocation stream options

/// Which retrieval operation the driver issues per work unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrievalMode {
    /// Page-level text: one record per page, grouped by volume
    #[default]
    Pages,
    /// Whole-volume text: one record per volume
    Volumes,
}

/// Immutable options for one pipeline invocation, built once and passed down.
///
/// Marker semantics: `stream_per_volume` only has effect while `wrap_stream`
/// is on. With both on, every volume is wrapped in VolumeStart/VolumeEnd;
/// with only `wrap_stream`, one BatchStart/BatchEnd wraps the whole run.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub wrap_stream: bool,
    pub stream_per_volume: bool,
    /// Stream identity token shared by all three output channels
    pub stream_id: u64,
    pub mode: RetrievalMode,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            wrap_stream: true,
            stream_per_volume: true,
            stream_id: 0,
            mode: RetrievalMode::Pages,
        }
    }
}

impl StreamOptions {
    /// VolumeStart/VolumeEnd around every volume?
    pub fn volume_markers(&self) -> bool {
        self.wrap_stream && self.stream_per_volume
    }

    /// One BatchStart/BatchEnd around the whole invocation?
    pub fn batch_markers(&self) -> bool {
        self.wrap_stream && !self.stream_per_volume
    }
}
