use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;

use crate::error::{OptiGradeError, Result};
use crate::features::{
    AliasTable, FeatureMapper, MappedFeatures, MissingFeaturePolicy, PolicyKind, RawStudentInput,
    SessionContext, CURRENT_CGPA,
};
use crate::feedback::{generate_feedback, Feedback, Standing};
use crate::model::{PredictionResult, Predictor, UNAVAILABLE_MESSAGE};

/// Everything the results page shows for one prediction.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub features: MappedFeatures,
    pub prediction: PredictionResult,
    pub display_cgpa: f64,
    pub progress: f64,
    pub previous_cgpa: Option<f64>,
    pub delta: Option<f64>,
    pub standing: Standing,
    pub standing_label: &'static str,
    pub feedback: Feedback,
    pub generated_at: DateTime<Utc>,
}

/// Mapper and predictor, built once at start-up and shared read-only.
pub struct Forecaster {
    predictor: Predictor,
    mapper: FeatureMapper,
    policy_kind: PolicyKind,
}

impl Forecaster {
    pub fn new(predictor: Predictor, policy_kind: PolicyKind) -> Self {
        let means = predictor.model().and_then(|model| model.feature_means());
        let policy = MissingFeaturePolicy::from_kind(policy_kind, means);
        Self {
            predictor,
            mapper: FeatureMapper::new(AliasTable::standard(), policy),
            policy_kind,
        }
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    pub fn mapper(&self) -> &FeatureMapper {
        &self.mapper
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.policy_kind
    }

    pub fn forecast(&self, raw: &RawStudentInput, context: &SessionContext) -> Result<ForecastReport> {
        let model = self.predictor.model().ok_or_else(|| {
            OptiGradeError::Unavailable(
                self.predictor
                    .unavailable_reason()
                    .unwrap_or(UNAVAILABLE_MESSAGE)
                    .to_string(),
            )
        })?;

        let features = self.mapper.map(raw, model.feature_names(), context)?;
        debug!("Mapped features: {}", features.vector);

        let prediction = model.predict(&features.vector)?;
        let display_cgpa = prediction.display_cgpa();
        // Only a value the student supplied; a filled-in gap is not a CGPA.
        let previous_cgpa = context
            .current_cgpa
            .or_else(|| self.mapper.aliases().number(raw, CURRENT_CGPA));
        let standing = Standing::from_cgpa(display_cgpa);
        info!("Predicted CGPA {:.2} ({:?})", prediction.predicted_cgpa, standing);

        Ok(ForecastReport {
            feedback: generate_feedback(&prediction, raw, self.mapper.aliases()),
            display_cgpa,
            progress: prediction.progress(),
            previous_cgpa,
            delta: previous_cgpa.map(|previous| prediction.delta_from(previous)),
            standing,
            standing_label: standing.label(),
            prediction,
            features,
            generated_at: Utc::now(),
        })
    }
}
