//! Per-sample metadata (habitat annotations).

use crate::error::{NicheError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Habitat annotation for a single sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub sample_id: String,
    pub habitat: String,
}

impl SampleRecord {
    pub fn new(sample_id: impl Into<String>, habitat: impl Into<String>) -> Self {
        Self {
            sample_id: sample_id.into(),
            habitat: habitat.into(),
        }
    }
}

/// Collection of sample records with lookup by sample ID.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleMetadata {
    records: Vec<SampleRecord>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl SampleMetadata {
    /// Build from records. A later record for the same sample replaces an
    /// earlier one.
    pub fn new(records: Vec<SampleRecord>) -> Self {
        let mut deduped: Vec<SampleRecord> = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        for record in records {
            match index.get(&record.sample_id) {
                Some(&pos) => deduped[pos] = record,
                None => {
                    index.insert(record.sample_id.clone(), deduped.len());
                    deduped.push(record);
                }
            }
        }
        Self {
            records: deduped,
            index,
        }
    }

    /// Load from a TSV file.
    ///
    /// The header must contain a `habitat` column; the sample ID is taken from
    /// a `sample_id` column if present, otherwise from the first column.
    /// Other columns are ignored. Rows with an empty or `NA` habitat are
    /// skipped.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| NicheError::EmptyData("Empty metadata file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').map(str::trim).collect();
        let habitat_col = header
            .iter()
            .position(|&h| h == "habitat")
            .ok_or_else(|| NicheError::MissingColumn("habitat".to_string()))?;
        let id_col = header.iter().position(|&h| h == "sample_id").unwrap_or(0);

        let mut records = Vec::new();
        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            let (Some(id), Some(habitat)) = (fields.get(id_col), fields.get(habitat_col)) else {
                continue;
            };
            if habitat.is_empty() || habitat.eq_ignore_ascii_case("na") {
                continue;
            }
            records.push(SampleRecord::new(*id, *habitat));
        }

        Ok(Self::new(records))
    }

    /// Write to a two-column TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "sample_id\thabitat")?;
        for record in &self.records {
            writeln!(writer, "{}\t{}", record.sample_id, record.habitat)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Habitat for a sample, if annotated.
    pub fn habitat(&self, sample_id: &str) -> Option<&str> {
        // The index is not serialized; fall back to a scan after deserialization.
        match self.index.get(sample_id) {
            Some(&pos) => Some(self.records[pos].habitat.as_str()),
            None if self.index.is_empty() => self
                .records
                .iter()
                .find(|r| r.sample_id == sample_id)
                .map(|r| r.habitat.as_str()),
            None => None,
        }
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct habitats in first-seen order.
    pub fn habitats(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for record in &self.records {
            if !out.contains(&record.habitat.as_str()) {
                out.push(&record.habitat);
            }
        }
        out
    }
}

impl From<Vec<SampleRecord>> for SampleMetadata {
    fn from(records: Vec<SampleRecord>) -> Self {
        Self::new(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_lookup_and_dedup() {
        let metadata = SampleMetadata::new(vec![
            SampleRecord::new("S1", "soil"),
            SampleRecord::new("S2", "gut"),
            SampleRecord::new("S1", "marine"),
        ]);
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.habitat("S1"), Some("marine"));
        assert_eq!(metadata.habitat("S2"), Some("gut"));
        assert_eq!(metadata.habitat("S3"), None);
        assert_eq!(metadata.habitats(), vec!["marine", "gut"]);
    }

    #[test]
    fn test_from_tsv_extra_columns() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tdepth\thabitat").unwrap();
        writeln!(file, "S1\t100\tsoil").unwrap();
        writeln!(file, "S2\t200\tNA").unwrap();
        writeln!(file, "S3\t300\tgut").unwrap();
        file.flush().unwrap();

        let metadata = SampleMetadata::from_tsv(file.path()).unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.habitat("S3"), Some("gut"));
        assert_eq!(metadata.habitat("S2"), None);
    }

    #[test]
    fn test_from_tsv_missing_habitat_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tgroup").unwrap();
        writeln!(file, "S1\tcontrol").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            SampleMetadata::from_tsv(file.path()),
            Err(NicheError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_serde_roundtrip_keeps_lookup() {
        let metadata = SampleMetadata::new(vec![SampleRecord::new("S1", "soil")]);
        let json = serde_json::to_string(&metadata).unwrap();
        let restored: SampleMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.habitat("S1"), Some("soil"));
    }
}
