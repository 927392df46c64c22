use ort::Error as OrtError;
use std::fmt;

/// Represents the different types of errors that can occur while loading or querying a classifier.
#[derive(Debug)]
pub enum ClassifierError {
    /// Error occurred while loading or using the tokenizer
    TokenizerError(String),
    /// Error occurred while loading or running the ONNX model
    ModelError(String),
    /// Error occurred while reading or validating the model artifact
    ArtifactError(String),
    /// Error occurred while making predictions
    PredictionError(String),
    /// Error occurred due to invalid input parameters
    ValidationError(String),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenizerError(msg) => write!(f, "Tokenizer error: {}", msg),
            Self::ModelError(msg) => write!(f, "Model error: {}", msg),
            Self::ArtifactError(msg) => write!(f, "Artifact error: {}", msg),
            Self::PredictionError(msg) => write!(f, "Prediction error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelError(err.to_string())
    }
}

impl From<std::io::Error> for ClassifierError {
    fn from(err: std::io::Error) -> Self {
        ClassifierError::ArtifactError(err.to_string())
    }
}

impl From<serde_json::Error> for ClassifierError {
    fn from(err: serde_json::Error) -> Self {
        ClassifierError::ArtifactError(format!("Invalid manifest: {}", err))
    }
}
