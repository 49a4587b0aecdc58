//! JSON-lines channel files with atomic tmp-to-rename finalize

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use pagestream_core::{PageSink, StreamMarker};

const CHANNEL_FILES: [&str; 3] = ["text.jsonl", "volume_id.jsonl", "page_id.jsonl"];

#[derive(Serialize)]
struct MarkerLine<'a> {
    marker: &'a str,
    stream_id: u64,
}

#[derive(Serialize)]
struct DataLine<'a> {
    data: &'a str,
}

struct ChannelFile {
    writer: BufWriter<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
}

impl ChannelFile {
    fn create(dir: &Path, filename: &str) -> io::Result<Self> {
        let final_path = dir.join(filename);
        let tmp_path = dir.join(format!("{filename}.tmp"));

        // Clean up stale tmp file
        if tmp_path.exists() {
            fs::remove_file(&tmp_path)?;
        }

        let writer = BufWriter::new(File::create(&tmp_path)?);
        Ok(Self {
            writer,
            tmp_path,
            final_path,
        })
    }

    fn write_line<T: Serialize>(&mut self, line: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, line).map_err(io::Error::other)?;
        self.writer.write_all(b"\n")
    }

    fn finalize(self) -> io::Result<()> {
        self.writer.into_inner()?.sync_all()?;
        fs::rename(&self.tmp_path, &self.final_path)
    }
}

/// [`PageSink`] writing one JSON-lines file per output channel.
///
/// Data frames are `{"data": ...}` objects, markers are
/// `{"marker": ..., "stream_id": ...}` objects on all three files, so the
/// files line up row for row.
pub struct JsonlSink {
    text: ChannelFile,
    volume_id: ChannelFile,
    page_id: ChannelFile,
}

impl JsonlSink {
    pub fn create(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let [text, volume_id, page_id] = CHANNEL_FILES;
        Ok(Self {
            text: ChannelFile::create(dir, text)?,
            volume_id: ChannelFile::create(dir, volume_id)?,
            page_id: ChannelFile::create(dir, page_id)?,
        })
    }

    /// Flush all three channels and rename tmp files into place
    pub fn finalize(self) -> io::Result<()> {
        self.text.finalize()?;
        self.volume_id.finalize()?;
        self.page_id.finalize()
    }
}

impl PageSink for JsonlSink {
    fn marker(&mut self, marker: StreamMarker) -> io::Result<()> {
        let line = MarkerLine {
            marker: marker.kind.name(),
            stream_id: marker.stream_id,
        };
        self.text.write_line(&line)?;
        self.volume_id.write_line(&line)?;
        self.page_id.write_line(&line)
    }

    fn page(&mut self, text: &str, volume_id: &str, page_id: u32) -> io::Result<()> {
        self.text.write_line(&DataLine { data: text })?;
        self.volume_id.write_line(&DataLine { data: volume_id })?;
        self.page_id.write_line(&DataLine {
            data: &page_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagestream_core::MarkerKind;
    use tempfile::TempDir;

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn writes_aligned_channel_files() {
        let dir = TempDir::new().unwrap();
        let mut sink = JsonlSink::create(dir.path()).unwrap();

        sink.marker(StreamMarker::new(MarkerKind::VolumeStart, 4)).unwrap();
        sink.page("first page", "vol.1", 1).unwrap();
        sink.page("second page", "vol.1", 2).unwrap();
        sink.marker(StreamMarker::new(MarkerKind::VolumeEnd, 4)).unwrap();
        sink.finalize().unwrap();

        let text = read_lines(&dir.path().join("text.jsonl"));
        let vol = read_lines(&dir.path().join("volume_id.jsonl"));
        let page = read_lines(&dir.path().join("page_id.jsonl"));

        assert_eq!(text.len(), 4);
        assert_eq!(vol.len(), 4);
        assert_eq!(page.len(), 4);

        assert_eq!(text[0]["marker"], "volume_start");
        assert_eq!(text[0]["stream_id"], 4);
        assert_eq!(text[1]["data"], "first page");
        assert_eq!(vol[1]["data"], "vol.1");
        assert_eq!(page[2]["data"], "2");
        assert_eq!(page[3]["marker"], "volume_end");
    }

    #[test]
    fn finalize_removes_tmp_files() {
        let dir = TempDir::new().unwrap();
        let sink = JsonlSink::create(dir.path()).unwrap();
        sink.finalize().unwrap();

        for name in CHANNEL_FILES {
            assert!(dir.path().join(name).exists());
            assert!(!dir.path().join(format!("{name}.tmp")).exists());
        }
    }

    #[test]
    fn create_replaces_stale_tmp() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("text.jsonl.tmp"), b"stale").unwrap();

        let mut sink = JsonlSink::create(dir.path()).unwrap();
        sink.page("fresh", "v", 1).unwrap();
        sink.finalize().unwrap();

        let text = read_lines(&dir.path().join("text.jsonl"));
        assert_eq!(text, vec![serde_json::json!({"data": "fresh"})]);
    }
}
