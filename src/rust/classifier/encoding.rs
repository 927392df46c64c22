use tokenizers::{Tokenizer, TruncationParams};

use super::error::ClassifierError;

/// Makes the tokenizer truncate to `max_length` ids. Special tokens such as
/// `[CLS]`/`[SEP]` are counted and kept.
pub(crate) fn configure_truncation(tokenizer: &mut Tokenizer, max_length: usize) -> Result<(), ClassifierError> {
    if max_length == 0 {
        return Err(ClassifierError::ValidationError("max_sequence_length must be positive".into()));
    }
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..TruncationParams::default()
        }))
        .map_err(|e| ClassifierError::TokenizerError(format!("Failed to configure truncation: {}", e)))?;
    Ok(())
}

/// Turns text into model-ready token ids.
///
/// Email bodies are often longer than the model's context, so the tokenizer is
/// expected to truncate (see [`configure_truncation`]) rather than reject them.
pub(crate) trait TextEncoding {
    /// Returns the initialized tokenizer if available
    fn tokenizer(&self) -> Option<&Tokenizer>;

    /// Returns the maximum sequence length the model can handle
    fn max_sequence_length(&self) -> usize;

    /// Converts text into token ids, special tokens included.
    ///
    /// # Errors
    /// - `TokenizerError` if the tokenizer is not initialized
    /// - `TokenizerError` if the text cannot be encoded
    /// - `ValidationError` if the text produces no tokens
    /// - `ValidationError` if the tokenizer does not truncate to `max_sequence_length`
    fn tokenize(&self, text: &str) -> Result<Vec<i64>, ClassifierError> {
        let tokenizer = self.tokenizer()
            .ok_or_else(|| ClassifierError::TokenizerError("Tokenizer not initialized".into()))?;
        let max_length = self.max_sequence_length();

        let encoding = tokenizer.encode(text, true)
            .map_err(|e| ClassifierError::TokenizerError(e.to_string()))?;
        let token_ids = encoding.get_ids();

        if token_ids.is_empty() {
            return Err(ClassifierError::ValidationError("Text produced no tokens".into()));
        }
        if token_ids.len() > max_length {
            return Err(ClassifierError::ValidationError(format!(
                "Text produced {} tokens, more than the maximum of {}",
                token_ids.len(),
                max_length
            )));
        }
        if !encoding.get_overflowing().is_empty() {
            log::debug!("Truncated input to {} tokens", max_length);
        }

        Ok(token_ids.iter().map(|&id| i64::from(id)).collect())
    }
}
