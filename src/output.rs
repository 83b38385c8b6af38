//! Record assembly and the CSV sink

use std::path::PathBuf;

use chrono::Local;
use tracing::info;

use crate::error::ScraperError;
use crate::soccer::MatchRecord;
use crate::traits::RecordSink;

/// Collects records in arrival order.
#[derive(Debug, Default)]
pub struct RecordAssembler {
    records: Vec<MatchRecord>,
}

impl RecordAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = MatchRecord>) {
        self.records.extend(records);
    }

    pub fn into_records(self) -> Vec<MatchRecord> {
        self.records
    }

    /// Give the dataset to `sink`. The records come back whatever the sink did.
    pub fn hand_off<S: RecordSink + ?Sized>(
        self,
        sink: &mut S,
    ) -> (Vec<MatchRecord>, Result<PathBuf, ScraperError>) {
        let result = sink.write(&self.records);
        (self.records, result)
    }
}

const FILE_PREFIX: &str = "soccer_matches";

/// Writes `soccer_matches_<YYYYmmdd_HHMMSS>.csv` into a directory.
#[derive(Debug, Clone)]
pub struct CsvSink {
    output_dir: PathBuf,
}

impl CsvSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn next_path(&self) -> PathBuf {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        self.output_dir
            .join(format!("{}_{}.csv", FILE_PREFIX, timestamp))
    }
}

impl RecordSink for CsvSink {
    fn write(&mut self, records: &[MatchRecord]) -> Result<PathBuf, ScraperError> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| ScraperError::SinkWrite(format!("{:?}: {}", self.output_dir, e)))?;

        let path = self.next_path();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)?;

        writer.write_record(MatchRecord::CSV_HEADERS)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer
            .flush()
            .map_err(|e| ScraperError::SinkWrite(e.to_string()))?;

        info!("Saved {} matches to {:?}", records.len(), path);
        Ok(path)
    }
}
