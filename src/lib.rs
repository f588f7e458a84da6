//! OptiGrade CGPA forecasting: feature mapping, model loading and
//! prediction, plus the HTTP API that serves them.

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod feedback;
pub mod forecast;
pub mod model;
pub mod recommendation;
pub mod session;
pub mod training;

pub use error::{MappingError, OptiGradeError, Result};
pub use features::{
    AliasTable, FeatureMapper, FeatureVector, MappedFeatures, MissingFeaturePolicy, PolicyKind,
    RawStudentInput, RawValue, SessionContext,
};
pub use forecast::{ForecastReport, Forecaster};
pub use model::{PredictionResult, Predictor, TrainedModel};
