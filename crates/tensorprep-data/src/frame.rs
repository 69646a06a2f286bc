//! In-memory numeric table parsed from CSV.

use std::collections::HashMap;
use std::path::Path;
use tensorprep_core::{Result, TensorPrepError};

/// A column-addressable numeric table.
///
/// Cells hold `Option<f64>`: blank or unparseable CSV fields become `None`
/// and are expected to be filled via [`RawFrame::forward_fill`] before any
/// column is selected for training.
#[derive(Debug, Clone)]
pub struct RawFrame {
    columns: Vec<String>,
    column_index: HashMap<String, usize>,
    /// Row-major cells, one inner vec per row.
    cells: Vec<Vec<Option<f64>>>,
}

impl RawFrame {
    /// Parse a CSV file with a header row into a frame.
    ///
    /// The first column is treated like any other; callers that use a
    /// date index simply never select it.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_path(path.as_ref())
            .map_err(|e| {
                TensorPrepError::Parse(format!(
                    "failed to open CSV {}: {}",
                    path.as_ref().display(),
                    e
                ))
            })?;

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| TensorPrepError::Parse(format!("failed to read CSV header: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let column_index = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let mut cells = Vec::new();
        for (row_num, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                TensorPrepError::Parse(format!("CSV row {}: {}", row_num + 2, e))
            })?;
            let row: Vec<Option<f64>> = record
                .iter()
                .map(|field| {
                    let field = field.trim();
                    if field.is_empty() {
                        None
                    } else {
                        field.parse::<f64>().ok()
                    }
                })
                .collect();
            cells.push(row);
        }

        tracing::debug!(
            "Parsed {} rows x {} columns",
            cells.len(),
            columns.len()
        );

        Ok(Self {
            columns,
            column_index,
            cells,
        })
    }

    /// Build a frame directly from column names and row-major cells.
    pub fn from_cells(columns: Vec<String>, cells: Vec<Vec<Option<f64>>>) -> Self {
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            columns,
            column_index,
            cells,
        }
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.cells.len()
    }

    /// Column names in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index.contains_key(name)
    }

    fn column_pos(&self, name: &str) -> Result<usize> {
        self.column_index.get(name).copied().ok_or_else(|| {
            TensorPrepError::Parse(format!(
                "column '{}' not found (available: {})",
                name,
                self.columns.join(", ")
            ))
        })
    }

    /// Raw cells of one column, missing values included.
    pub fn column_raw(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let pos = self.column_pos(name)?;
        Ok(self.cells.iter().map(|row| row[pos]).collect())
    }

    /// One fully-populated column.
    ///
    /// Returns a parse error if any cell is still missing, so callers must
    /// forward-fill (or otherwise clean) first.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let pos = self.column_pos(name)?;
        self.cells
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                cells[pos].ok_or_else(|| {
                    TensorPrepError::Parse(format!(
                        "column '{}' has a missing value at row {}",
                        name, row
                    ))
                })
            })
            .collect()
    }

    /// Replace a column's values, adding the column if it does not exist.
    pub fn set_column(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.cells.len() {
            return Err(TensorPrepError::InvalidArgument(format!(
                "column '{}' has {} values but the frame has {} rows",
                name,
                values.len(),
                self.cells.len()
            )));
        }
        match self.column_index.get(name) {
            Some(&pos) => {
                for (row, value) in self.cells.iter_mut().zip(values) {
                    row[pos] = Some(value);
                }
            }
            None => {
                let pos = self.columns.len();
                self.columns.push(name.to_string());
                self.column_index.insert(name.to_string(), pos);
                for (row, value) in self.cells.iter_mut().zip(values) {
                    row.push(Some(value));
                }
            }
        }
        Ok(())
    }

    /// Drop the last `n` rows.
    pub fn truncate_tail(&mut self, n: usize) {
        let keep = self.cells.len().saturating_sub(n);
        self.cells.truncate(keep);
    }

    /// Fill missing cells with the most recent value above them in the
    /// same column. Leading gaps (nothing above) stay missing.
    pub fn forward_fill(&mut self) {
        let num_cols = self.columns.len();
        let mut last: Vec<Option<f64>> = vec![None; num_cols];
        for row in &mut self.cells {
            for (col, cell) in row.iter_mut().enumerate() {
                match cell {
                    Some(v) => last[col] = Some(*v),
                    None => *cell = last[col],
                }
            }
        }
    }

    /// Select named columns into a row-major matrix.
    pub fn select(&self, names: &[&str]) -> Result<Vec<Vec<f64>>> {
        let positions: Vec<usize> = names
            .iter()
            .map(|name| self.column_pos(name))
            .collect::<Result<_>>()?;
        self.cells
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                positions
                    .iter()
                    .zip(names)
                    .map(|(&pos, name)| {
                        cells[pos].ok_or_else(|| {
                            TensorPrepError::Parse(format!(
                                "column '{}' has a missing value at row {}",
                                name, row
                            ))
                        })
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_basic_csv() {
        let file = write_csv("date,tmax,tmin\n2020-01-01,10.5,2.0\n2020-01-02,11.0,3.5\n");
        let frame = RawFrame::from_csv_path(file.path()).unwrap();

        assert_eq!(frame.num_rows(), 2);
        assert_eq!(frame.columns(), &["date", "tmax", "tmin"]);
        assert_eq!(frame.column("tmax").unwrap(), vec![10.5, 11.0]);
    }

    #[test]
    fn test_non_numeric_cells_become_missing() {
        let file = write_csv("date,tmax\n2020-01-01,10.5\n2020-01-02,\n");
        let frame = RawFrame::from_csv_path(file.path()).unwrap();

        let raw = frame.column_raw("tmax").unwrap();
        assert_eq!(raw, vec![Some(10.5), None]);
        // Date strings are not numbers either.
        assert_eq!(frame.column_raw("date").unwrap(), vec![None, None]);
    }

    #[test]
    fn test_forward_fill() {
        let mut frame = RawFrame::from_cells(
            vec!["a".into()],
            vec![vec![Some(1.0)], vec![None], vec![None], vec![Some(4.0)]],
        );
        frame.forward_fill();
        assert_eq!(frame.column("a").unwrap(), vec![1.0, 1.0, 1.0, 4.0]);
    }

    #[test]
    fn test_forward_fill_leading_gap_stays_missing() {
        let mut frame = RawFrame::from_cells(
            vec!["a".into()],
            vec![vec![None], vec![Some(2.0)]],
        );
        frame.forward_fill();
        assert!(frame.column("a").is_err());
        assert_eq!(frame.column_raw("a").unwrap(), vec![None, Some(2.0)]);
    }

    #[test]
    fn test_select_builds_row_major_matrix() {
        let file = write_csv("a,b,c\n1,2,3\n4,5,6\n");
        let frame = RawFrame::from_csv_path(file.path()).unwrap();

        let matrix = frame.select(&["c", "a"]).unwrap();
        assert_eq!(matrix, vec![vec![3.0, 1.0], vec![6.0, 4.0]]);
    }

    #[test]
    fn test_set_column_shifts_values_for_targets() {
        let file = write_csv("tmax\n10\n11\n12\n");
        let mut frame = RawFrame::from_csv_path(file.path()).unwrap();

        let tmax = frame.column("tmax").unwrap();
        let tomorrow: Vec<f64> = tmax[1..].to_vec();
        frame.truncate_tail(1);
        frame.set_column("tmax_tomorrow", tomorrow).unwrap();

        assert_eq!(frame.num_rows(), 2);
        assert_eq!(frame.column("tmax_tomorrow").unwrap(), vec![11.0, 12.0]);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let file = write_csv("a\n1\n");
        let frame = RawFrame::from_csv_path(file.path()).unwrap();
        assert!(frame.column("b").is_err());
        assert!(frame.select(&["a", "b"]).is_err());
    }
}
