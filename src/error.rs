use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptiGradeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Training data error: {0}")]
    TrainingData(String),

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] linfa::Error),

    #[error("Model artifact error: {0}")]
    Artifact(String),

    #[error("Prediction unavailable: {0}")]
    Unavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Feature vector does not match the model: expected {expected:?}, got {actual:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error(transparent)]
    Mapping(#[from] MappingError),
}

/// Raised by the feature mapper when the active policy refuses to fill gaps.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("missing required features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),
}

pub type Result<T> = std::result::Result<T, OptiGradeError>;
