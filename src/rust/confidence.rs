//! Confidence normalization.
//!
//! Every caller consumes a fixed `[ham_probability, spam_probability]` pair, whatever the
//! loaded classifier can actually report. Resolution order:
//!
//! 1. no classifier: the policy's absent-model pair (`[0.1, 0.9]` by default)
//! 2. [`Classifier::Probabilistic`]: first row of `predict_proba`, unmodified
//! 3. [`Classifier::MarginScoring`]: logistic of the first `decision_function` score
//! 4. [`Classifier::LabelOnly`]: fixed stand-in pair for the predicted label
//! 5. any failure in 2-4: the neutral pair `[0.5, 0.5]`
//!
//! The absent-model pair is a product policy, not an estimate: without a model, content is
//! treated as likely spam. All stand-in pairs are configurable through [`ConfidencePolicy`].

use serde::{Deserialize, Serialize};

use crate::classifier::utils::{check_probability_row, logistic};
use crate::classifier::{Classifier, ClassifierError, Label};

/// Normalized `[ham, spam]` distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub ham: f64,
    pub spam: f64,
}

impl Confidence {
    pub const fn new(ham: f64, spam: f64) -> Self {
        Self { ham, spam }
    }

    /// Builds a pair from a spam probability in `[0, 1]`
    pub fn from_spam(spam: f64) -> Self {
        Self { ham: 1.0 - spam, spam }
    }

    pub fn from_pair(pair: [f64; 2]) -> Self {
        Self { ham: pair[0], spam: pair[1] }
    }

    /// The ordered `[ham_probability, spam_probability]` pair
    pub fn pair(&self) -> [f64; 2] {
        [self.ham, self.spam]
    }

    /// The label this distribution favours; ties go to ham
    pub fn leaning(&self) -> Label {
        if self.spam > self.ham {
            Label::Spam
        } else {
            Label::Ham
        }
    }
}

/// Where a [`Confidence`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    /// No classifier was loaded
    AbsentModel,
    /// Direct probability estimate
    Probability,
    /// Logistic of a decision score
    Margin,
    /// Fixed stand-in for a discrete label
    LabelStandIn,
    /// The classifier failed; total uncertainty
    Neutral,
}

/// A confidence together with how it was obtained
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub confidence: Confidence,
    pub source: ConfidenceSource,
}

/// Fixed pairs used where no real probability is available
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidencePolicy {
    pub absent: Confidence,
    pub label_spam: Confidence,
    pub label_ham: Confidence,
    pub neutral: Confidence,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            absent: Confidence::new(0.1, 0.9),
            label_spam: Confidence::new(0.1, 0.9),
            label_ham: Confidence::new(0.9, 0.1),
            neutral: Confidence::new(0.5, 0.5),
        }
    }
}

impl ConfidencePolicy {
    /// Derives the absent-model and label pairs from one stand-in confidence in `[0.5, 1]`.
    ///
    /// ```rust
    /// use spamsift::ConfidencePolicy;
    ///
    /// let policy = ConfidencePolicy::with_stand_in(0.75).unwrap();
    /// assert_eq!(policy.label_ham.pair(), [0.75, 0.25]);
    /// ```
    pub fn with_stand_in(confidence: f64) -> Result<Self, ClassifierError> {
        if !(0.5..=1.0).contains(&confidence) {
            return Err(ClassifierError::ValidationError(format!(
                "Stand-in confidence must be between 0.5 and 1.0, got {}",
                confidence
            )));
        }
        let spam = Confidence::from_spam(confidence);
        Ok(Self {
            absent: spam,
            label_spam: spam,
            label_ham: Confidence::new(confidence, 1.0 - confidence),
            ..Self::default()
        })
    }

    fn for_label(&self, label: Label) -> Confidence {
        match label {
            Label::Spam => self.label_spam,
            Label::Ham => self.label_ham,
        }
    }
}

/// Produces a [`Confidence`] for any classifier shape under a [`ConfidencePolicy`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceNormalizer {
    policy: ConfidencePolicy,
}

impl ConfidenceNormalizer {
    pub fn new(policy: ConfidencePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ConfidencePolicy {
        &self.policy
    }

    /// Resolves the confidence, reporting classifier failures as `Err`.
    pub fn try_normalize(&self, classifier: Option<&Classifier>, text: &str) -> Result<Estimate, ClassifierError> {
        let Some(classifier) = classifier else {
            return Ok(Estimate { confidence: self.policy.absent, source: ConfidenceSource::AbsentModel });
        };

        let batch = [text];
        let estimate = match classifier {
            Classifier::Probabilistic(model) => {
                let row = first(model.predict_proba(&batch)?, "predict_proba")?;
                Estimate {
                    confidence: Confidence::from_pair(check_probability_row(row)?),
                    source: ConfidenceSource::Probability,
                }
            }
            Classifier::MarginScoring(model) => {
                let score = first(model.decision_function(&batch)?, "decision_function")?;
                if score.is_nan() {
                    return Err(ClassifierError::PredictionError("Decision score is NaN".into()));
                }
                Estimate {
                    confidence: Confidence::from_spam(logistic(score)),
                    source: ConfidenceSource::Margin,
                }
            }
            Classifier::LabelOnly(model) => {
                let label = first(model.predict(&batch)?, "predict")?;
                Estimate {
                    confidence: self.policy.for_label(label),
                    source: ConfidenceSource::LabelStandIn,
                }
            }
        };
        Ok(estimate)
    }

    /// Resolves the confidence; never fails. Classifier errors yield the neutral pair.
    pub fn normalize(&self, classifier: Option<&Classifier>, text: &str) -> Estimate {
        match self.try_normalize(classifier, text) {
            Ok(estimate) => estimate,
            Err(e) => {
                log::warn!("Confidence estimation failed, reporting neutral confidence: {}", e);
                Estimate { confidence: self.policy.neutral, source: ConfidenceSource::Neutral }
            }
        }
    }
}

fn first<T>(rows: Vec<T>, method: &str) -> Result<T, ClassifierError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| ClassifierError::PredictionError(format!("{} returned no rows", method)))
}

/// Normalizes confidence with the default policy.
///
/// ```rust
/// use spamsift::normalize_confidence;
///
/// assert_eq!(normalize_confidence(None, "anything").pair(), [0.1, 0.9]);
/// ```
pub fn normalize_confidence(classifier: Option<&Classifier>, text: &str) -> Confidence {
    ConfidenceNormalizer::default().normalize(classifier, text).confidence
}
