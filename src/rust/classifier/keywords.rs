use super::classifier::{Label, LabelPredictor};
use super::error::ClassifierError;

/// Keywords flagged when no trained model is available
pub const DEFAULT_SPAM_KEYWORDS: [&str; 3] = ["win", "prize", "claim"];

/// A label-only classifier that flags text containing any of its keywords.
///
/// Matching is a case-insensitive substring search, so `"win"` also matches `"Winner"`.
/// It has no confidence signal of its own.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    name: String,
    keywords: Vec<String>,
}

impl KeywordClassifier {
    /// Creates a keyword classifier, dropping blank keywords
    pub fn new(name: impl Into<String>, keywords: Vec<impl Into<String>>) -> Result<Self, ClassifierError> {
        let keywords: Vec<String> = keywords.into_iter()
            .map(Into::into)
            .map(|k: String| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(ClassifierError::ValidationError("At least one keyword is required".into()));
        }
        Ok(Self { name: name.into(), keywords })
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    fn label_for(&self, text: &str) -> Label {
        let lowered = text.to_lowercase();
        if self.keywords.iter().any(|k| lowered.contains(k.as_str())) {
            Label::Spam
        } else {
            Label::Ham
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self {
            name: "keywords".to_string(),
            keywords: DEFAULT_SPAM_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl LabelPredictor for KeywordClassifier {
    fn predict(&self, batch: &[&str]) -> Result<Vec<Label>, ClassifierError> {
        Ok(batch.iter().map(|text| self.label_for(text)).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keywords() {
        let classifier = KeywordClassifier::default();
        let labels = classifier.predict(&[
            "Claim your PRIZE today",
            "Hi David, reminder for our meeting tomorrow at 10 AM.",
        ]).unwrap();
        assert_eq!(labels, vec![Label::Spam, Label::Ham]);
    }

    #[test]
    fn test_custom_keywords_are_normalized() {
        let classifier = KeywordClassifier::new("custom", vec!["  Lottery ", ""]).unwrap();
        assert_eq!(classifier.keywords(), ["lottery".to_string()]);
        assert_eq!(classifier.predict(&["You won the LOTTERY"]).unwrap(), vec![Label::Spam]);
    }

    #[test]
    fn test_rejects_blank_keywords() {
        let result = KeywordClassifier::new("blank", vec![" ", ""]);
        assert!(matches!(result, Err(ClassifierError::ValidationError(_))));
    }
}
