//! Stream-delimited emitter - volume boundary detection and page numbering

use std::io;

use crate::client::PagePair;
use crate::options::StreamOptions;
use crate::sink::{MarkerKind, PageSink, StreamMarker};

/// Per-unit emission counters (advisory only)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitStats {
    pub volumes: usize,
    pub pages: usize,
    pub dropped: usize,
}

/// Boundary state machine for one work unit's page sequence.
///
/// Tracks the previous volume id by value, derives 1-based page ids from
/// position within each contiguous run, and opens/closes per-volume markers
/// when the options call for them. [`finish`](Emitter::finish) must be
/// called at the end of the sequence, including after failures, so no
/// volume stream is left open.
#[derive(Debug)]
pub struct Emitter<'a> {
    options: &'a StreamOptions,
    prev_volume: Option<String>,
    page_id: u32,
    volume_open: bool,
    stats: UnitStats,
}

impl<'a> Emitter<'a> {
    pub fn new(options: &'a StreamOptions) -> Self {
        Self {
            options,
            prev_volume: None,
            page_id: 1,
            volume_open: false,
            stats: UnitStats::default(),
        }
    }

    /// Relay one raw record to the sink.
    ///
    /// Records with a missing volume id or missing text are logged and
    /// dropped; they contribute no output and leave boundary state alone.
    pub fn emit<S: PageSink>(&mut self, sink: &mut S, pair: &PagePair) -> io::Result<()> {
        let (volume_id, text) = match (&pair.volume_id, &pair.text) {
            (Some(v), Some(t)) => (v, t),
            (None, None) => {
                log::error!("page record missing volume_id and text; ignoring page");
                self.stats.dropped += 1;
                return Ok(());
            }
            (None, Some(_)) => {
                log::error!("page record missing volume_id; ignoring page");
                self.stats.dropped += 1;
                return Ok(());
            }
            (Some(v), None) => {
                log::error!("page record missing text for volume id {v}; ignoring page");
                self.stats.dropped += 1;
                return Ok(());
            }
        };

        // Value comparison: a new contiguous run starts whenever the id
        // differs from the immediately preceding record's id.
        if self.prev_volume.as_deref() != Some(volume_id.as_str()) {
            if self.options.volume_markers() {
                if self.volume_open {
                    sink.marker(StreamMarker::new(
                        MarkerKind::VolumeEnd,
                        self.options.stream_id,
                    ))?;
                }
                sink.marker(StreamMarker::new(
                    MarkerKind::VolumeStart,
                    self.options.stream_id,
                ))?;
                self.volume_open = true;
            }
            self.stats.volumes += 1;
            self.prev_volume = Some(volume_id.clone());
            self.page_id = 1;
        } else {
            self.page_id += 1;
        }

        log::trace!("pushing volume_id: {volume_id}  page_id: {}", self.page_id);
        self.stats.pages += 1;
        sink.page(text, volume_id, self.page_id)
    }

    /// Close a still-open volume stream. Runs at the end of every unit,
    /// whether the sequence completed, was empty, or failed part-way.
    pub fn finish<S: PageSink>(&mut self, sink: &mut S) -> io::Result<()> {
        if self.options.volume_markers() && self.volume_open {
            sink.marker(StreamMarker::new(
                MarkerKind::VolumeEnd,
                self.options.stream_id,
            ))?;
            self.volume_open = false;
        }
        Ok(())
    }

    pub fn stats(&self) -> UnitStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{Frame, MemorySink};

    fn marker(kind: MarkerKind) -> Frame {
        Frame::Marker(StreamMarker::new(kind, 0))
    }

    fn data(s: &str) -> Frame {
        Frame::Data(s.to_string())
    }

    fn run_emitter(options: &StreamOptions, pairs: &[PagePair]) -> (MemorySink, UnitStats) {
        let mut sink = MemorySink::new();
        let mut emitter = Emitter::new(options);
        for pair in pairs {
            emitter.emit(&mut sink, pair).unwrap();
        }
        emitter.finish(&mut sink).unwrap();
        (sink, emitter.stats())
    }

    #[test]
    fn per_volume_markers_wrap_each_run() {
        let options = StreamOptions::default();
        let (sink, stats) = run_emitter(
            &options,
            &[
                PagePair::new("V1", "a"),
                PagePair::new("V1", "b"),
                PagePair::new("V2", "c"),
            ],
        );

        assert_eq!(
            sink.text,
            vec![
                marker(MarkerKind::VolumeStart),
                data("a"),
                data("b"),
                marker(MarkerKind::VolumeEnd),
                marker(MarkerKind::VolumeStart),
                data("c"),
                marker(MarkerKind::VolumeEnd),
            ]
        );
        assert_eq!(
            sink.page_id,
            vec![
                marker(MarkerKind::VolumeStart),
                data("1"),
                data("2"),
                marker(MarkerKind::VolumeEnd),
                marker(MarkerKind::VolumeStart),
                data("1"),
                marker(MarkerKind::VolumeEnd),
            ]
        );
        assert_eq!(stats.volumes, 2);
        assert_eq!(stats.pages, 3);
    }

    #[test]
    fn page_ids_count_up_within_a_run() {
        let options = StreamOptions {
            wrap_stream: false,
            ..Default::default()
        };
        let (sink, _) = run_emitter(
            &options,
            &[
                PagePair::new("V1", "a"),
                PagePair::new("V1", "b"),
                PagePair::new("V1", "c"),
                PagePair::new("V2", "d"),
                PagePair::new("V1", "e"), // new run of V1, restarts at 1
            ],
        );

        assert_eq!(
            sink.page_id,
            vec![data("1"), data("2"), data("3"), data("1"), data("1")]
        );
    }

    #[test]
    fn boundary_uses_value_equality() {
        // Same id text via separate allocations must be one contiguous run
        let options = StreamOptions::default();
        let id_a = String::from("V1");
        let id_b = String::from("V1");
        let (sink, stats) = run_emitter(
            &options,
            &[
                PagePair {
                    volume_id: Some(id_a),
                    text: Some("a".to_string()),
                },
                PagePair {
                    volume_id: Some(id_b),
                    text: Some("b".to_string()),
                },
            ],
        );

        assert_eq!(stats.volumes, 1);
        assert_eq!(
            sink.page_id,
            vec![
                marker(MarkerKind::VolumeStart),
                data("1"),
                data("2"),
                marker(MarkerKind::VolumeEnd),
            ]
        );
    }

    #[test]
    fn missing_text_dropped_without_state_change() {
        let options = StreamOptions {
            wrap_stream: false,
            ..Default::default()
        };
        let (sink, stats) = run_emitter(
            &options,
            &[
                PagePair::new("V1", "a"),
                PagePair {
                    volume_id: Some("V2".to_string()),
                    text: None,
                },
                PagePair::new("V3", "c"),
            ],
        );

        // The dropped V2 record must not disturb run tracking: V3 is simply
        // the next volume after V1.
        assert_eq!(sink.volume_id, vec![data("V1"), data("V3")]);
        assert_eq!(sink.page_id, vec![data("1"), data("1")]);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.pages, 2);
        assert_eq!(stats.volumes, 2);
    }

    #[test]
    fn missing_volume_id_dropped() {
        let options = StreamOptions {
            wrap_stream: false,
            ..Default::default()
        };
        let (sink, stats) = run_emitter(
            &options,
            &[
                PagePair {
                    volume_id: None,
                    text: Some("orphan".to_string()),
                },
                PagePair {
                    volume_id: None,
                    text: None,
                },
            ],
        );

        assert!(sink.text.is_empty());
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.pages, 0);
    }

    #[test]
    fn dropped_record_between_same_volume_keeps_run() {
        let options = StreamOptions::default();
        let (_, stats) = run_emitter(
            &options,
            &[
                PagePair::new("V1", "a"),
                PagePair {
                    volume_id: Some("V1".to_string()),
                    text: None,
                },
                PagePair::new("V1", "b"),
            ],
        );

        // Still one volume, and the valid pages number 1, 2
        assert_eq!(stats.volumes, 1);
        assert_eq!(stats.pages, 2);
    }

    #[test]
    fn finish_without_pages_emits_nothing() {
        let options = StreamOptions::default();
        let (sink, stats) = run_emitter(&options, &[]);
        assert!(sink.text.is_empty());
        assert_eq!(stats, UnitStats::default());
    }

    #[test]
    fn finish_is_idempotent() {
        let options = StreamOptions::default();
        let mut sink = MemorySink::new();
        let mut emitter = Emitter::new(&options);
        emitter.emit(&mut sink, &PagePair::new("V1", "a")).unwrap();
        emitter.finish(&mut sink).unwrap();
        emitter.finish(&mut sink).unwrap();

        assert_eq!(
            sink.text,
            vec![
                marker(MarkerKind::VolumeStart),
                data("a"),
                marker(MarkerKind::VolumeEnd),
            ]
        );
    }

    #[test]
    fn no_markers_when_wrap_stream_off() {
        let options = StreamOptions {
            wrap_stream: false,
            stream_per_volume: true,
            ..Default::default()
        };
        let (sink, _) = run_emitter(
            &options,
            &[PagePair::new("V1", "a"), PagePair::new("V2", "b")],
        );
        assert_eq!(sink.text, vec![data("a"), data("b")]);
    }

    #[test]
    fn markers_carry_stream_id() {
        let options = StreamOptions {
            stream_id: 42,
            ..Default::default()
        };
        let (sink, _) = run_emitter(&options, &[PagePair::new("V1", "a")]);
        assert_eq!(
            sink.text[0],
            Frame::Marker(StreamMarker::new(MarkerKind::VolumeStart, 42))
        );
    }
}
