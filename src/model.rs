use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{OptiGradeError, Result};
use crate::features::{default_feature_names, FeatureVector};

/// Lowest and highest CGPA on this grading scale.
pub const CGPA_MIN: f64 = 0.0;
pub const CGPA_MAX: f64 = 5.0;

pub const UNAVAILABLE_MESSAGE: &str =
    "CGPA prediction is unavailable right now: the trained model could not be loaded.";

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestSettings {
    pub n_trees: usize,
    pub seed: u64,
}

impl Default for ForestSettings {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
        }
    }
}

/// Random forest over a fixed number of input columns.
#[derive(Serialize, Deserialize)]
pub struct CgpaRegressor {
    forest: Forest,
    n_features: usize,
}

impl fmt::Debug for CgpaRegressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CgpaRegressor")
            .field("n_features", &self.n_features)
            .finish_non_exhaustive()
    }
}

impl CgpaRegressor {
    pub fn fit(records: &Array2<f64>, targets: &Array1<f64>, settings: ForestSettings) -> Result<Self> {
        if records.nrows() == 0 || records.nrows() != targets.len() {
            return Err(OptiGradeError::Training(format!(
                "{} feature rows for {} targets",
                records.nrows(),
                targets.len()
            )));
        }

        let x = to_dense(records);
        let y = targets.to_vec();
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(settings.n_trees)
            .with_seed(settings.seed);

        let forest = RandomForestRegressor::fit(&x, &y, params)
            .map_err(|e| OptiGradeError::Training(e.to_string()))?;

        Ok(Self {
            forest,
            n_features: records.ncols(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn predict_rows(&self, records: &Array2<f64>) -> Result<Array1<f64>> {
        if records.ncols() != self.n_features {
            return Err(OptiGradeError::Inference(format!(
                "model expects {} columns, got {}",
                self.n_features,
                records.ncols()
            )));
        }
        let predictions = self
            .forest
            .predict(&to_dense(records))
            .map_err(|e| OptiGradeError::Inference(e.to_string()))?;
        Ok(Array1::from_vec(predictions))
    }

    pub fn predict_one(&self, values: &[f64]) -> Result<f64> {
        let row = Array2::from_shape_vec((1, values.len()), values.to_vec())
            .map_err(|e| OptiGradeError::Inference(e.to_string()))?;
        self.predict_rows(&row)?
            .first()
            .copied()
            .ok_or_else(|| OptiGradeError::Inference("model returned no prediction".to_string()))
    }
}

fn to_dense(records: &Array2<f64>) -> DenseMatrix<f64> {
    let rows: Vec<Vec<f64>> = records.outer_iter().map(|row| row.to_vec()).collect();
    DenseMatrix::from_2d_vec(&rows)
}

/// Hold-out scores recorded when the model was fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub r2: f64,
    pub mean_absolute_error: f64,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub trained_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
pub struct ModelEnvelope {
    pub model: CgpaRegressor,
    pub feature_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_means: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<TrainingMetrics>,
}

/// On-disk shapes of a trained model. Older artifacts hold the bare
/// regressor with no record of the columns it was fitted on.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelArtifact {
    Enveloped(ModelEnvelope),
    Legacy(CgpaRegressor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    Legacy,
    Enveloped,
}

#[derive(Debug)]
pub struct TrainedModel {
    regressor: CgpaRegressor,
    feature_names: Vec<String>,
    feature_means: Option<BTreeMap<String, f64>>,
    metrics: Option<TrainingMetrics>,
    format: ArtifactFormat,
}

impl TrainedModel {
    pub fn new(
        regressor: CgpaRegressor,
        feature_names: Vec<String>,
        feature_means: Option<BTreeMap<String, f64>>,
        metrics: Option<TrainingMetrics>,
    ) -> Result<Self> {
        Self::from_artifact(ModelArtifact::Enveloped(ModelEnvelope {
            model: regressor,
            feature_names,
            feature_means,
            metrics,
        }))
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        let model = match artifact {
            ModelArtifact::Enveloped(envelope) => TrainedModel {
                regressor: envelope.model,
                feature_names: envelope.feature_names,
                feature_means: envelope.feature_means,
                metrics: envelope.metrics,
                format: ArtifactFormat::Enveloped,
            },
            ModelArtifact::Legacy(regressor) => TrainedModel {
                regressor,
                feature_names: default_feature_names(),
                feature_means: None,
                metrics: None,
                format: ArtifactFormat::Legacy,
            },
        };

        if model.feature_names.is_empty() {
            return Err(OptiGradeError::Artifact("artifact lists no feature names".to_string()));
        }
        if model.feature_names.len() != model.regressor.n_features() {
            return Err(OptiGradeError::Artifact(format!(
                "artifact names {} features but the regressor was fitted on {}",
                model.feature_names.len(),
                model.regressor.n_features()
            )));
        }
        Ok(model)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let artifact: ModelArtifact = serde_json::from_reader(reader)?;
        let model = Self::from_artifact(artifact)?;
        if model.format == ArtifactFormat::Legacy {
            warn!(
                "{} is a bare model without feature names, assuming {:?}",
                path.display(),
                model.feature_names
            );
        }
        Ok(model)
    }

    /// Always writes the enveloped format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        #[derive(Serialize)]
        struct EnvelopeRef<'a> {
            model: &'a CgpaRegressor,
            feature_names: &'a [String],
            #[serde(skip_serializing_if = "Option::is_none")]
            feature_means: Option<&'a BTreeMap<String, f64>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            metrics: Option<&'a TrainingMetrics>,
        }

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(
            writer,
            &EnvelopeRef {
                model: &self.regressor,
                feature_names: &self.feature_names,
                feature_means: self.feature_means.as_ref(),
                metrics: self.metrics.as_ref(),
            },
        )?;
        info!("Model saved to {}", path.display());
        Ok(())
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn feature_means(&self) -> Option<&BTreeMap<String, f64>> {
        self.feature_means.as_ref()
    }

    pub fn metrics(&self) -> Option<&TrainingMetrics> {
        self.metrics.as_ref()
    }

    pub fn format(&self) -> ArtifactFormat {
        self.format
    }

    pub fn regressor(&self) -> &CgpaRegressor {
        &self.regressor
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResult> {
        if features.names() != self.feature_names.as_slice() {
            return Err(OptiGradeError::FeatureMismatch {
                expected: self.feature_names.clone(),
                actual: features.names().to_vec(),
            });
        }
        let predicted_cgpa = self.regressor.predict_one(features.values())?;
        Ok(PredictionResult { predicted_cgpa })
    }
}

/// Process-wide handle on the model; disabled when loading failed.
#[derive(Debug)]
pub enum Predictor {
    Ready(TrainedModel),
    Disabled { reason: String },
}

impl Predictor {
    /// Never fails: an unreadable artifact yields a disabled predictor.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match TrainedModel::load(path) {
            Ok(model) => {
                info!(
                    "Loaded {:?} model from {} with features {:?}",
                    model.format(),
                    path.display(),
                    model.feature_names()
                );
                Predictor::Ready(model)
            }
            Err(e) => {
                error!("Could not load ML model from {}: {}", path.display(), e);
                Predictor::Disabled {
                    reason: format!("{}: {}", path.display(), e),
                }
            }
        }
    }

    pub fn model(&self) -> Option<&TrainedModel> {
        match self {
            Predictor::Ready(model) => Some(model),
            Predictor::Disabled { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.model().is_some()
    }

    /// Empty while disabled.
    pub fn feature_names(&self) -> &[String] {
        self.model().map(TrainedModel::feature_names).unwrap_or(&[])
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            Predictor::Ready(_) => None,
            Predictor::Disabled { reason } => Some(reason),
        }
    }
}

impl From<TrainedModel> for Predictor {
    fn from(model: TrainedModel) -> Self {
        Predictor::Ready(model)
    }
}

/// Raw model output. The model itself does not respect the CGPA scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub predicted_cgpa: f64,
}

impl PredictionResult {
    pub fn display_cgpa(&self) -> f64 {
        self.predicted_cgpa.clamp(CGPA_MIN, CGPA_MAX)
    }

    /// Fraction of the scale reached, for progress bars.
    pub fn progress(&self) -> f64 {
        (self.display_cgpa() / CGPA_MAX).min(1.0)
    }

    /// Change against `previous_cgpa`, measured on the raw forecast.
    pub fn delta_from(&self, previous_cgpa: f64) -> f64 {
        self.predicted_cgpa - previous_cgpa
    }
}
