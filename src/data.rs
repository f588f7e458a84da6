use std::collections::BTreeMap;
use std::path::Path;

use csv::Reader;
use log::{info, warn};
use ndarray::{Array1, Array2, Axis};

use crate::error::{OptiGradeError, Result};
use crate::features::AliasTable;

pub const TARGET_COLUMN: &str = "target_CGPA";

/// Historical records laid out in model feature order.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub feature_names: Vec<String>,
    pub records: Array2<f64>,
    pub targets: Array1<f64>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn feature_means(&self) -> BTreeMap<String, f64> {
        match self.records.mean_axis(Axis(0)) {
            Some(means) => self.feature_names.iter().cloned().zip(means.iter().copied()).collect(),
            None => BTreeMap::new(),
        }
    }
}

pub fn load_training_data(
    path: impl AsRef<Path>,
    feature_names: &[String],
    aliases: &AliasTable,
) -> Result<TrainingSet> {
    let path = path.as_ref();
    let rdr = Reader::from_path(path)?;
    let set = read_training_data(rdr, feature_names, aliases)?;
    info!("Loaded {} student records from {}", set.len(), path.display());
    Ok(set)
}

/// Columns are matched through the alias table; canonical features with no
/// column are filled with 0.0. Cells that are not numbers are errors.
pub fn read_training_data<R: std::io::Read>(
    mut rdr: Reader<R>,
    feature_names: &[String],
    aliases: &AliasTable,
) -> Result<TrainingSet> {
    let headers = rdr.headers()?.clone();

    let target_idx = headers
        .iter()
        .position(|h| h.trim() == TARGET_COLUMN)
        .ok_or_else(|| OptiGradeError::TrainingData(format!("missing '{}' column", TARGET_COLUMN)))?;

    let mut column_for: Vec<Option<usize>> = vec![None; feature_names.len()];
    for (idx, header) in headers.iter().enumerate() {
        if let Some(canonical) = aliases.resolve(header.trim(), feature_names) {
            if let Some(slot) = feature_names.iter().position(|n| n == canonical) {
                column_for[slot].get_or_insert(idx);
            }
        }
    }
    for (name, column) in feature_names.iter().zip(&column_for) {
        if column.is_none() {
            warn!("Training data has no '{}' column, filling with 0.0", name);
        }
    }

    let mut data = Vec::new();
    let mut targets = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let cell = |idx: usize| -> Result<f64> {
            let raw = record.get(idx).unwrap_or("").trim();
            raw.parse::<f64>().map_err(|_| {
                OptiGradeError::TrainingData(format!(
                    "row {}: '{}' is not a number in column '{}'",
                    row + 1,
                    raw,
                    &headers[idx]
                ))
            })
        };

        for column in &column_for {
            data.push(match column {
                Some(idx) => cell(*idx)?,
                None => 0.0,
            });
        }
        targets.push(cell(target_idx)?);
    }

    let num_rows = targets.len();
    let records = Array2::from_shape_vec((num_rows, feature_names.len()), data)
        .map_err(|e| OptiGradeError::TrainingData(e.to_string()))?;

    Ok(TrainingSet {
        feature_names: feature_names.to_vec(),
        records,
        targets: Array1::from_vec(targets),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::default_feature_names;
    use pretty_assertions::assert_eq;

    fn read(csv_text: &str) -> Result<TrainingSet> {
        let rdr = Reader::from_reader(csv_text.as_bytes());
        read_training_data(rdr, &default_feature_names(), &AliasTable::standard())
    }

    #[test]
    fn renames_legacy_headers_and_fills_gaps() {
        let set = read(
            "GPA_last_semester,current_CGPA,study_hours,Attendance,Lecture_Engagement,Midterm_Score,target_CGPA\n\
             3.0,3.1,12,80,70,65,3.2\n\
             2.0,2.2,6,60,50,45,2.1\n",
        )
        .unwrap();

        assert_eq!(set.len(), 2);
        // credit_load has no column
        assert_eq!(set.records.row(0).to_vec(), vec![3.0, 0.0, 3.1, 12.0, 80.0, 70.0, 65.0]);
        assert_eq!(set.targets.to_vec(), vec![3.2, 2.1]);
        assert_eq!(set.feature_means()["study_hours"], 9.0);
    }

    #[test]
    fn target_column_is_required() {
        let err = read("study_hours,attendance\n10,80\n").unwrap_err();
        assert!(err.to_string().contains(TARGET_COLUMN));
    }

    #[test]
    fn bad_cells_are_reported_with_their_row() {
        let err = read("study_hours,target_CGPA\n10,3.0\nlots,2.5\n").unwrap_err();
        assert!(err.to_string().contains("row 2"), "{}", err);
    }
}
