use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tracing::debug;

use crate::error::{IoError, IoResult};

/// Header-addressed string table as read from a survey export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Column indices for `names`, in order. Lists every absent name on failure.
    pub fn require_columns(&self, names: &[&str]) -> IoResult<Vec<usize>> {
        let mut found = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column(name) {
                Some(idx) => found.push(idx),
                None => missing.push(name.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(found)
        } else {
            Err(IoError::MissingColumns(missing))
        }
    }

    /// Trimmed cell text; `None` for cells past the end of a short row.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(|s| s.trim())
    }

    /// Numeric cell. Empty, unparseable or non-finite text reads as NaN.
    pub fn number(&self, row: usize, col: usize) -> f64 {
        self.cell(row, col)
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(f64::NAN)
    }
}

/// Read a table whose first physical line is a preamble, followed by
/// `#` comment lines, a header row and data rows.
pub fn read_table(path: impl AsRef<Path>) -> IoResult<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| IoError::io(path, e))?;
    let table = read_table_from(file).map_err(|e| match e {
        IoError::Io { source, .. } => IoError::io(path, source),
        other => other,
    })?;
    debug!(path = %path.display(), rows = table.len(), columns = table.headers.len(), "read table");
    Ok(table)
}

pub fn read_table_from<R: Read>(reader: R) -> IoResult<Table> {
    let mut reader = BufReader::new(reader);
    let mut preamble = String::new();
    reader
        .read_line(&mut preamble)
        .map_err(|e| IoError::io("<table>", e))?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }

    Ok(Table { headers, rows })
}
