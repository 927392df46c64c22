use std::collections::HashMap;
use std::sync::Arc;

use ndarray::Array2;
use ort::session::{Session, SessionOutputs};
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::classifier::{Label, LabelPredictor, MarginScorer, ProbabilityEstimator};
use super::encoding::TextEncoding;
use super::error::ClassifierError;
use crate::artifact::Capability;

/// A spam classifier backed by an ONNX Runtime session and a Hugging Face tokenizer.
///
/// Each text is run as its own batch of one. The model must accept an `input_ids`
/// tensor of shape `[1, sequence_length]`; `attention_mask` and `token_type_ids`
/// are fed when the model declares them.
///
/// Output contract by capability:
/// - `Probabilities`: float tensor `[1, 2]` holding `[ham, spam]`
/// - `DecisionScores`: float tensor `[1]` or `[1, 1]`
/// - `Labels`: int64 tensor `[1]` holding 0 or 1
#[derive(Debug)]
pub struct OnnxModel {
    pub name: String,
    pub model_path: String,
    pub tokenizer: Arc<Tokenizer>,
    pub session: Arc<Session>,
    pub max_sequence_length: usize,
    pub capability: Capability,
    pub label_output: Option<String>,
    pub(crate) feeds_attention_mask: bool,
    pub(crate) feeds_token_type_ids: bool,
}

impl TextEncoding for OnnxModel {
    fn tokenizer(&self) -> Option<&Tokenizer> {
        Some(&self.tokenizer)
    }

    fn max_sequence_length(&self) -> usize {
        self.max_sequence_length
    }
}

impl OnnxModel {
    /// Tokenizes `text`, runs the session and hands the outputs to `extract`.
    fn run<T>(
        &self,
        text: &str,
        extract: impl FnOnce(&SessionOutputs<'_, '_>) -> Result<T, ClassifierError>,
    ) -> Result<T, ClassifierError> {
        let tokens = self.tokenize(text)?;
        let len = tokens.len();

        let mut input_tensors = HashMap::new();
        input_tensors.insert("input_ids", Self::tensor_from(tokens, len, "input_ids")?);
        if self.feeds_attention_mask {
            input_tensors.insert("attention_mask", Self::tensor_from(vec![1i64; len], len, "attention_mask")?);
        }
        if self.feeds_token_type_ids {
            input_tensors.insert("token_type_ids", Self::tensor_from(vec![0i64; len], len, "token_type_ids")?);
        }

        let outputs = self.session.run(input_tensors)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to run model: {}", e)))?;
        extract(&outputs)
    }

    fn tensor_from(values: Vec<i64>, len: usize, name: &str) -> Result<Tensor<i64>, ClassifierError> {
        let array = Array2::from_shape_vec((1, len), values)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create {} array: {}", name, e)))?;
        let array_dyn = array.into_dyn();
        let standard = array_dyn.as_standard_layout();
        Tensor::from_array(&standard)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to create {} tensor: {}", name, e)))
    }

    fn extract_floats(outputs: &SessionOutputs<'_, '_>, name: &str) -> Result<Vec<f64>, ClassifierError> {
        let tensor = outputs[name].try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::ModelError(format!("Failed to extract output '{}': {}", name, e)))?;
        Ok(tensor.iter().map(|&v| f64::from(v)).collect())
    }

    fn extract_ints(outputs: &SessionOutputs<'_, '_>, name: &str) -> Result<Vec<i64>, ClassifierError> {
        let tensor = outputs[name].try_extract_tensor::<i64>()
            .map_err(|e| ClassifierError::ModelError(format!("Failed to extract output '{}': {}", name, e)))?;
        Ok(tensor.iter().copied().collect())
    }

    fn probabilities_for(&self, text: &str, output: &str) -> Result<[f64; 2], ClassifierError> {
        self.run(text, |outputs| probability_pair(&Self::extract_floats(outputs, output)?, output))
    }

    fn score_for(&self, text: &str, output: &str) -> Result<f64, ClassifierError> {
        self.run(text, |outputs| single_score(&Self::extract_floats(outputs, output)?, output))
    }

    fn label_for(&self, text: &str) -> Result<Label, ClassifierError> {
        match label_route(&self.capability, self.label_output.as_deref()) {
            LabelRoute::Raw(output) => {
                self.run(text, |outputs| raw_label(&Self::extract_ints(outputs, output)?, output))
            }
            LabelRoute::Probabilities(output) => Ok(label_from_probabilities(self.probabilities_for(text, output)?)),
            LabelRoute::Score(output) => Ok(label_from_score(self.score_for(text, output)?)),
        }
    }
}

/// How a label is read from the model outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelRoute<'a> {
    /// Integer class index from the named output
    Raw(&'a str),
    /// Larger of the `[ham, spam]` probabilities
    Probabilities(&'a str),
    /// Sign of the decision score
    Score(&'a str),
}

/// An explicit label output always wins over the capability output.
fn label_route<'a>(capability: &'a Capability, label_output: Option<&'a str>) -> LabelRoute<'a> {
    if let Some(output) = label_output {
        return LabelRoute::Raw(output);
    }
    match capability {
        Capability::Labels { output } => LabelRoute::Raw(output),
        Capability::Probabilities { output } => LabelRoute::Probabilities(output),
        Capability::DecisionScores { output } => LabelRoute::Score(output),
    }
}

fn probability_pair(values: &[f64], output: &str) -> Result<[f64; 2], ClassifierError> {
    match values {
        [ham, spam] => Ok([*ham, *spam]),
        other => Err(ClassifierError::PredictionError(format!(
            "Expected 2 probabilities from '{}', got {}",
            output,
            other.len()
        ))),
    }
}

fn single_score(values: &[f64], output: &str) -> Result<f64, ClassifierError> {
    match values {
        [score] => Ok(*score),
        other => Err(ClassifierError::PredictionError(format!(
            "Expected a single decision score from '{}', got {} values",
            output,
            other.len()
        ))),
    }
}

fn raw_label(values: &[i64], output: &str) -> Result<Label, ClassifierError> {
    match values {
        [raw] => Label::try_from(*raw),
        other => Err(ClassifierError::PredictionError(format!(
            "Expected a single label from '{}', got {} values",
            output,
            other.len()
        ))),
    }
}

// Ties go to ham
fn label_from_probabilities([ham, spam]: [f64; 2]) -> Label {
    if spam > ham { Label::Spam } else { Label::Ham }
}

fn label_from_score(score: f64) -> Label {
    if score > 0.0 { Label::Spam } else { Label::Ham }
}

impl LabelPredictor for OnnxModel {
    fn predict(&self, batch: &[&str]) -> Result<Vec<Label>, ClassifierError> {
        batch.iter().map(|text| self.label_for(text)).collect()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl ProbabilityEstimator for OnnxModel {
    fn predict_proba(&self, batch: &[&str]) -> Result<Vec<[f64; 2]>, ClassifierError> {
        let Capability::Probabilities { output } = &self.capability else {
            return Err(ClassifierError::PredictionError(
                format!("Model '{}' does not expose probabilities", self.name)
            ));
        };
        batch.iter().map(|text| self.probabilities_for(text, output)).collect()
    }
}

impl MarginScorer for OnnxModel {
    fn decision_function(&self, batch: &[&str]) -> Result<Vec<f64>, ClassifierError> {
        let Capability::DecisionScores { output } = &self.capability else {
            return Err(ClassifierError::PredictionError(
                format!("Model '{}' does not expose decision scores", self.name)
            ));
        };
        batch.iter().map(|text| self.score_for(text, output)).collect()
    }
}
