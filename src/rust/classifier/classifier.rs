use std::fmt;
use std::sync::Arc;

use super::error::ClassifierError;

/// Discrete prediction of a binary spam classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Ham,
    Spam,
}

impl Label {
    /// Raw class index used by classifiers (0 = ham, 1 = spam)
    pub fn as_index(self) -> i64 {
        match self {
            Label::Ham => 0,
            Label::Spam => 1,
        }
    }

    pub fn is_spam(self) -> bool {
        self == Label::Spam
    }
}

impl TryFrom<i64> for Label {
    type Error = ClassifierError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Label::Ham),
            1 => Ok(Label::Spam),
            other => Err(ClassifierError::PredictionError(format!(
                "Unknown class label {} (expected 0 = ham or 1 = spam)",
                other
            ))),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Ham => write!(f, "ham"),
            Label::Spam => write!(f, "spam"),
        }
    }
}

/// Predicts discrete labels for a batch of texts. Every classifier supports this.
pub trait LabelPredictor: Send + Sync {
    fn predict(&self, batch: &[&str]) -> Result<Vec<Label>, ClassifierError>;

    /// Name reported in logs and CLI output
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// A classifier that estimates `[ham_probability, spam_probability]` per text.
pub trait ProbabilityEstimator: LabelPredictor {
    fn predict_proba(&self, batch: &[&str]) -> Result<Vec<[f64; 2]>, ClassifierError>;
}

/// A classifier that returns a signed distance from its decision boundary per text.
/// Positive scores lean towards spam.
pub trait MarginScorer: LabelPredictor {
    fn decision_function(&self, batch: &[&str]) -> Result<Vec<f64>, ClassifierError>;
}

/// A loaded spam classifier, tagged by the strongest confidence capability it exposes.
///
/// The variant is fixed when the classifier is loaded. A model able to produce both
/// probabilities and margins is always loaded as [`Classifier::Probabilistic`].
///
/// ```rust
/// # use std::sync::Arc;
/// use spamsift::{Classifier, KeywordClassifier};
///
/// let classifier = Classifier::LabelOnly(Arc::new(KeywordClassifier::default()));
/// assert_eq!(classifier.capability(), "label-only");
/// ```
#[derive(Clone)]
pub enum Classifier {
    Probabilistic(Arc<dyn ProbabilityEstimator>),
    MarginScoring(Arc<dyn MarginScorer>),
    LabelOnly(Arc<dyn LabelPredictor>),
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    #[allow(dead_code)]
    fn verify_thread_safety() {
        assert_send_sync::<Classifier>();
    }
};

impl Classifier {
    /// Creates a new ClassifierBuilder for loading a classifier from a model artifact
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Predicts labels through whichever backend this classifier wraps
    pub fn predict(&self, batch: &[&str]) -> Result<Vec<Label>, ClassifierError> {
        match self {
            Self::Probabilistic(model) => model.predict(batch),
            Self::MarginScoring(model) => model.predict(batch),
            Self::LabelOnly(model) => model.predict(batch),
        }
    }

    /// Predicts the label of a single text
    pub fn predict_one(&self, text: &str) -> Result<Label, ClassifierError> {
        self.predict(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| ClassifierError::PredictionError("Classifier returned no labels".into()))
    }

    /// Name of the underlying model
    pub fn name(&self) -> &str {
        match self {
            Self::Probabilistic(model) => model.name(),
            Self::MarginScoring(model) => model.name(),
            Self::LabelOnly(model) => model.name(),
        }
    }

    /// Short human-readable name of the confidence capability
    pub fn capability(&self) -> &'static str {
        match self {
            Self::Probabilistic(_) => "probabilistic",
            Self::MarginScoring(_) => "margin-scoring",
            Self::LabelOnly(_) => "label-only",
        }
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Classifier").field(&self.capability()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLabel(Label);

    impl LabelPredictor for FixedLabel {
        fn predict(&self, batch: &[&str]) -> Result<Vec<Label>, ClassifierError> {
            Ok(vec![self.0; batch.len()])
        }
    }

    struct Silent;

    impl LabelPredictor for Silent {
        fn predict(&self, _batch: &[&str]) -> Result<Vec<Label>, ClassifierError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_label_from_raw_index() {
        assert_eq!(Label::try_from(0).unwrap(), Label::Ham);
        assert_eq!(Label::try_from(1).unwrap(), Label::Spam);
        assert!(matches!(Label::try_from(2), Err(ClassifierError::PredictionError(_))));
        assert!(Label::try_from(-1).is_err());
        assert_eq!(Label::Spam.as_index(), 1);
    }

    #[test]
    fn test_predict_one() {
        let classifier = Classifier::LabelOnly(Arc::new(FixedLabel(Label::Spam)));
        assert_eq!(classifier.predict_one("anything").unwrap(), Label::Spam);
        assert_eq!(classifier.capability(), "label-only");
    }

    #[test]
    fn test_predict_one_empty_batch_is_error() {
        let classifier = Classifier::LabelOnly(Arc::new(Silent));
        assert!(classifier.predict_one("anything").is_err());
    }

    #[test]
    fn test_label_serialization() {
        assert_eq!(serde_json::to_string(&Label::Spam).unwrap(), "\"spam\"");
        assert_eq!(Label::Ham.to_string(), "ham");
    }
}
