//! Output channel seam - stream markers and the in-memory recorder

use std::io;

/// Boundary marker kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    BatchStart,
    BatchEnd,
    VolumeStart,
    VolumeEnd,
}

impl MarkerKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::BatchStart => "batch_start",
            Self::BatchEnd => "batch_end",
            Self::VolumeStart => "volume_start",
            Self::VolumeEnd => "volume_end",
        }
    }
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Out-of-band boundary signal, tagged with the invocation's stream identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamMarker {
    pub kind: MarkerKind,
    pub stream_id: u64,
}

impl StreamMarker {
    pub fn new(kind: MarkerKind, stream_id: u64) -> Self {
        Self { kind, stream_id }
    }
}

/// The three aligned output channels of a retrieval run.
///
/// Implementations must mirror every marker to all three channels and write
/// the page triple consecutively, so the channels stay in lockstep.
pub trait PageSink {
    /// Emit a boundary marker on every channel
    fn marker(&mut self, marker: StreamMarker) -> io::Result<()>;

    /// Emit one page: text, volume id, and 1-based page id, as an atomic
    /// triple across the three channels
    fn page(&mut self, text: &str, volume_id: &str, page_id: u32) -> io::Result<()>;
}

/// One frame on a single output channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Marker(StreamMarker),
    Data(String),
}

/// In-memory [`PageSink`] recording each channel's frame sequence.
///
/// Used by tests and by library consumers that post-process the channels
/// themselves; the per-channel vectors make alignment checks direct.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub text: Vec<Frame>,
    pub volume_id: Vec<Frame>,
    pub page_id: Vec<Frame>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three channels, in (text, volume id, page id) order
    pub fn channels(&self) -> [&[Frame]; 3] {
        [&self.text, &self.volume_id, &self.page_id]
    }
}

impl PageSink for MemorySink {
    fn marker(&mut self, marker: StreamMarker) -> io::Result<()> {
        self.text.push(Frame::Marker(marker));
        self.volume_id.push(Frame::Marker(marker));
        self.page_id.push(Frame::Marker(marker));
        Ok(())
    }

    fn page(&mut self, text: &str, volume_id: &str, page_id: u32) -> io::Result<()> {
        self.text.push(Frame::Data(text.to_string()));
        self.volume_id.push(Frame::Data(volume_id.to_string()));
        self.page_id.push(Frame::Data(page_id.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_mirrors_to_all_channels() {
        let mut sink = MemorySink::new();
        sink.marker(StreamMarker::new(MarkerKind::BatchStart, 7)).unwrap();

        for channel in sink.channels() {
            assert_eq!(
                channel,
                &[Frame::Marker(StreamMarker::new(MarkerKind::BatchStart, 7))]
            );
        }
    }

    #[test]
    fn page_writes_one_frame_per_channel() {
        let mut sink = MemorySink::new();
        sink.page("some text", "V1", 3).unwrap();

        assert_eq!(sink.text, vec![Frame::Data("some text".to_string())]);
        assert_eq!(sink.volume_id, vec![Frame::Data("V1".to_string())]);
        assert_eq!(sink.page_id, vec![Frame::Data("3".to_string())]);
    }

    #[test]
    fn channels_stay_equal_length() {
        let mut sink = MemorySink::new();
        sink.marker(StreamMarker::new(MarkerKind::VolumeStart, 0)).unwrap();
        sink.page("a", "V1", 1).unwrap();
        sink.page("b", "V1", 2).unwrap();
        sink.marker(StreamMarker::new(MarkerKind::VolumeEnd, 0)).unwrap();

        let [text, vol, page] = sink.channels();
        assert_eq!(text.len(), 4);
        assert_eq!(vol.len(), 4);
        assert_eq!(page.len(), 4);
    }

    #[test]
    fn marker_kind_names() {
        assert_eq!(MarkerKind::BatchStart.name(), "batch_start");
        assert_eq!(MarkerKind::VolumeEnd.to_string(), "volume_end");
    }
}
