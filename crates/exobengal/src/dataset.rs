use std::path::Path;

use exobengal_io::{read_table, Table};
use tracing::{info, warn};

use crate::error::{ExoError, ExoResult};
use crate::features::{FeatureFrame, FEATURE_COLUMNS};
use crate::labels::Disposition;

pub const DISPOSITION_COLUMN: &str = "koi_disposition";

/// Labelled feature frame ready for any of the three adapters.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub frame: FeatureFrame,
    /// Binary targets aligned with `frame` rows.
    pub labels: Vec<f64>,
    /// Rows excluded because their disposition did not map.
    pub dropped: usize,
}

impl TrainingSet {
    pub fn load(path: impl AsRef<Path>) -> ExoResult<Self> {
        let path = path.as_ref();
        let table = read_table(path)?;
        let set = TrainingSet::from_table(&table)?;
        info!(
            path = %path.display(),
            rows = set.len(),
            dropped = set.dropped,
            positives = set.positives(),
            "loaded training set"
        );
        Ok(set)
    }

    pub fn from_table(table: &Table) -> ExoResult<Self> {
        table.require_columns(&FEATURE_COLUMNS)?;
        let disposition = table.require_columns(&[DISPOSITION_COLUMN])?[0];

        let mut rows = Vec::with_capacity(table.len());
        let mut labels = Vec::with_capacity(table.len());
        let mut dropped = 0;
        for row in 0..table.len() {
            let cell = table.cell(row, disposition).unwrap_or("");
            match cell.parse::<Disposition>() {
                Ok(d) => {
                    rows.push(row);
                    labels.push(d.label().target());
                }
                Err(_) => {
                    warn!(row, disposition = cell, "dropping row with unmapped disposition");
                    dropped += 1;
                }
            }
        }

        if rows.is_empty() {
            return Err(ExoError::DataFormat(format!(
                "no rows with a recognised {DISPOSITION_COLUMN} ({dropped} dropped)"
            )));
        }

        Ok(TrainingSet {
            frame: FeatureFrame::from_table(table, &rows)?,
            labels,
            dropped,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&y| y == 1.0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exobengal_io::read_table_from;

    const HEADER: &str = "koi_disposition,koi_period,koi_prad,koi_teq,koi_srad,koi_slogg,koi_steff,koi_impact,koi_duration,koi_depth";

    fn table(body: &str) -> Table {
        let text = format!("preamble\n{HEADER}\n{body}");
        read_table_from(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_unmapped_rows_are_dropped() {
        let set = TrainingSet::from_table(&table(
            "CONFIRMED,1,1,300,1,4,5778,0.1,2,100\n\
             NOT DISPOSITIONED,1,1,300,1,4,5778,0.1,2,100\n\
             FALSE POSITIVE,2,20,1500,2,4,6000,0.9,5,900\n\
             ,3,3,300,1,4,5778,0.1,2,100\n\
             CANDIDATE,4,2,250,1,4,5500,0.2,3,150\n",
        ))
        .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.dropped, 2);
        assert_eq!(set.labels, vec![1.0, 0.0, 1.0]);
        assert_eq!(set.positives(), 2);
        assert_eq!(set.frame.features.row_slice(2).unwrap()[0], 4.0);
    }

    #[test]
    fn test_missing_disposition_column() {
        let text = "preamble\nkoi_period,koi_prad,koi_teq,koi_srad,koi_slogg,koi_steff,koi_impact,koi_duration,koi_depth\n1,1,1,1,1,1,1,1,1\n";
        let table = read_table_from(text.as_bytes()).unwrap();
        assert!(matches!(TrainingSet::from_table(&table), Err(ExoError::DataFormat(_))));
    }

    #[test]
    fn test_all_rows_unmapped_is_an_error() {
        let result = TrainingSet::from_table(&table("UNKNOWN,1,1,300,1,4,5778,0.1,2,100\n"));
        assert!(matches!(result, Err(ExoError::DataFormat(_))));
    }
}
