//! Taxon abundance table (taxa × samples).

use crate::error::{NicheError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Abundances of taxa across environmental samples.
///
/// Rows represent taxa (e.g. phages), columns represent samples. Counts are
/// usually integers but any non-negative finite value is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbundanceTable {
    taxa: Vec<String>,
    samples: Vec<String>,
    counts: Vec<Vec<f64>>,
}

impl AbundanceTable {
    /// Create a table, validating shape and values.
    ///
    /// Fails on ragged rows, a row count that differs from the number of
    /// taxa, duplicate identifiers, and negative or non-finite counts.
    pub fn new(taxa: Vec<String>, samples: Vec<String>, counts: Vec<Vec<f64>>) -> Result<Self> {
        if counts.len() != taxa.len() {
            return Err(NicheError::DimensionMismatch {
                expected: taxa.len(),
                actual: counts.len(),
            });
        }
        for (row, values) in counts.iter().enumerate() {
            if values.len() != samples.len() {
                return Err(NicheError::DimensionMismatch {
                    expected: samples.len(),
                    actual: values.len(),
                });
            }
            for (col, &value) in values.iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(NicheError::InvalidCount {
                        value: value.to_string(),
                        row,
                        col,
                    });
                }
            }
        }
        check_unique(&taxa, "taxon")?;
        check_unique(&samples, "sample")?;

        Ok(Self {
            taxa,
            samples,
            counts,
        })
    }

    /// Load a table from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with sample IDs (first column is the taxon ID header)
    /// - Subsequent rows: taxon ID followed by counts
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| NicheError::EmptyData("Empty TSV file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(NicheError::EmptyData(
                "TSV must have at least one sample".to_string(),
            ));
        }
        let samples: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();

        let mut taxa = Vec::new();
        let mut counts = Vec::new();
        for (row_idx, line_result) in lines.enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            taxa.push(fields[0].trim().to_string());

            let row = fields[1..]
                .iter()
                .enumerate()
                .map(|(col_idx, raw)| {
                    raw.trim().parse::<f64>().map_err(|_| NicheError::InvalidCount {
                        value: raw.to_string(),
                        row: row_idx,
                        col: col_idx,
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            counts.push(row);
        }

        Self::new(taxa, samples, counts)
    }

    /// Write the table to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "taxon")?;
        for sample in &self.samples {
            write!(writer, "\t{}", sample)?;
        }
        writeln!(writer)?;

        for (taxon, row) in self.taxa.iter().zip(&self.counts) {
            write!(writer, "{}", taxon)?;
            for value in row {
                write!(writer, "\t{}", value)?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Value at (taxon, sample).
    #[inline]
    pub fn get(&self, taxon: usize, sample: usize) -> f64 {
        self.counts[taxon][sample]
    }

    /// Number of taxa (rows).
    #[inline]
    pub fn n_taxa(&self) -> usize {
        self.taxa.len()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Whether the table has no taxa.
    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty()
    }

    /// Taxon identifiers.
    #[inline]
    pub fn taxa(&self) -> &[String] {
        &self.taxa
    }

    /// Sample identifiers.
    #[inline]
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// Raw count rows.
    #[inline]
    pub fn counts(&self) -> &[Vec<f64>] {
        &self.counts
    }

    /// Dense copy of the counts.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.n_taxa(), self.n_samples(), |i, j| self.counts[i][j])
    }

    /// Total abundance per taxon.
    pub fn row_sums(&self) -> Vec<f64> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    /// Sequencing depth per sample.
    pub fn col_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_samples()];
        for row in &self.counts {
            for (sum, value) in sums.iter_mut().zip(row) {
                *sum += value;
            }
        }
        sums
    }

    /// Row-relative abundances with a pseudocount added first.
    pub fn normalized(&self, pseudocount: f64) -> Result<DMatrix<f64>> {
        let normalized = crate::normalize::normalize_abundance(&self.counts, pseudocount)?;
        if normalized.nrows() == 0 {
            // Keep the sample dimension for tables without taxa.
            return Ok(DMatrix::zeros(0, self.n_samples()));
        }
        Ok(normalized)
    }

    /// Subset the table to the given sample columns (repeats allowed).
    ///
    /// Repeated samples get a `#n` suffix so identifiers stay unique.
    pub fn select_samples(&self, indices: &[usize]) -> Result<Self> {
        let mut seen = vec![0usize; self.n_samples()];
        let mut samples = Vec::with_capacity(indices.len());
        for &idx in indices {
            if idx >= self.n_samples() {
                return Err(NicheError::InvalidParameter(format!(
                    "Sample index {} out of bounds",
                    idx
                )));
            }
            let id = if seen[idx] == 0 {
                self.samples[idx].clone()
            } else {
                format!("{}#{}", self.samples[idx], seen[idx])
            };
            seen[idx] += 1;
            samples.push(id);
        }
        let counts = self
            .counts
            .iter()
            .map(|row| indices.iter().map(|&j| row[j]).collect())
            .collect();

        Self::new(self.taxa.clone(), samples, counts)
    }
}

fn check_unique(ids: &[String], kind: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(NicheError::DuplicateId(format!("{} '{}'", kind, id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    fn create_test_table() -> AbundanceTable {
        AbundanceTable::new(
            ids("phage_", 2),
            ids("S", 3),
            vec![vec![10.0, 20.0, 0.0], vec![5.0, 0.0, 15.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_new_and_accessors() {
        let table = create_test_table();
        assert_eq!(table.n_taxa(), 2);
        assert_eq!(table.n_samples(), 3);
        assert_eq!(table.get(1, 2), 15.0);
        assert_eq!(table.row_sums(), vec![30.0, 20.0]);
        assert_eq!(table.col_sums(), vec![15.0, 20.0, 15.0]);
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let result = AbundanceTable::new(
            ids("t", 2),
            ids("S", 3),
            vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0]],
        );
        assert!(matches!(
            result,
            Err(NicheError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_rejects_taxa_count_mismatch() {
        let result = AbundanceTable::new(ids("t", 3), ids("S", 1), vec![vec![1.0], vec![2.0]]);
        assert!(matches!(result, Err(NicheError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_rejects_negative_and_nan() {
        assert!(AbundanceTable::new(ids("t", 1), ids("S", 2), vec![vec![1.0, -1.0]]).is_err());
        assert!(AbundanceTable::new(ids("t", 1), ids("S", 2), vec![vec![f64::NAN, 1.0]]).is_err());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let result = AbundanceTable::new(
            vec!["a".into(), "a".into()],
            ids("S", 1),
            vec![vec![1.0], vec![2.0]],
        );
        assert!(matches!(result, Err(NicheError::DuplicateId(_))));
    }

    #[test]
    fn test_empty_table_is_valid() {
        let table = AbundanceTable::new(vec![], ids("S", 2), vec![]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.normalized(1.0).unwrap().shape(), (0, 2));
    }

    #[test]
    fn test_tsv_roundtrip() {
        let table = create_test_table();
        let file = NamedTempFile::new().unwrap();
        table.to_tsv(file.path()).unwrap();
        let loaded = AbundanceTable::from_tsv(file.path()).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_from_tsv_invalid_value() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "taxon\tS1\tS2").unwrap();
        writeln!(file, "phage_a\t3\tmany").unwrap();
        file.flush().unwrap();
        let result = AbundanceTable::from_tsv(file.path());
        assert!(matches!(result, Err(NicheError::InvalidCount { row: 0, col: 1, .. })));
    }

    #[test]
    fn test_select_samples_with_repeats() {
        let table = create_test_table();
        let resampled = table.select_samples(&[2, 0, 2]).unwrap();
        assert_eq!(resampled.samples(), &["S2", "S0", "S2#1"]);
        assert_eq!(resampled.counts()[0], vec![0.0, 10.0, 0.0]);
        assert!(table.select_samples(&[3]).is_err());
    }
}
