use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use thiserror::Error;

use crate::record::{PaperRecord, Venue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Overwrite,
    Append,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write records: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where finished record sets go. The core calls `save` exactly once per
/// venue run, after all fallback escalation has resolved; it never reads
/// back. Downstream persistence lives behind this boundary.
pub trait Sink {
    fn save(&self, venue: Venue, records: &[PaperRecord], mode: SaveMode) -> Result<(), SinkError>;
}

/// Reference sink: one JSON-lines file per venue id, records in wire order.
pub struct JsonlSink {
    dir: PathBuf,
}

impl JsonlSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, venue: Venue) -> PathBuf {
        self.dir.join(format!("{}.jsonl", venue.id()))
    }
}

impl Sink for JsonlSink {
    fn save(&self, venue: Venue, records: &[PaperRecord], mode: SaveMode) -> Result<(), SinkError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(venue);
        let file = match mode {
            SaveMode::Overwrite => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)?,
            SaveMode::Append => OpenOptions::new().append(true).create(true).open(&path)?,
        };
        let mut writer = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        tracing::info!(venue = venue.id(), records = records.len(), path = %path.display(), "saved");
        Ok(())
    }
}
