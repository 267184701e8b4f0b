use crate::error::AnalysisError;

/// A validated message in both its original and normalized forms.
///
/// Extractors match case-insensitively against `original` so that match
/// spans stay valid byte offsets into the caller's text and keyword
/// casing is preserved. The normalized form (lowercased, whitespace
/// collapsed) is the canonical rendering for consumers that want one;
/// validation itself runs on the raw input.
#[derive(Debug, Clone)]
pub struct MessageText {
    original: String,
    normalized: String,
}

impl MessageText {
    /// Validates and normalizes raw input. Empty, whitespace-only and
    /// over-length messages are rejected before any extractor runs.
    pub fn new(raw: &str, max_chars: usize) -> Result<Self, AnalysisError> {
        if raw.trim().is_empty() {
            return Err(AnalysisError::invalid_input(
                "message is empty or whitespace-only",
            ));
        }
        let char_count = raw.chars().count();
        if char_count > max_chars {
            return Err(AnalysisError::invalid_input(format!(
                "message too long: {char_count} characters (max {max_chars})"
            )));
        }

        let normalized = normalize(raw);
        Ok(Self {
            original: raw.to_string(),
            normalized,
        })
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

/// Lowercases and collapses runs of whitespace to single spaces.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            last_was_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            MessageText::new("", 5000),
            Err(AnalysisError::InvalidInput { .. })
        ));
    }

    #[test]
    fn rejects_whitespace_only_input() {
        assert!(matches!(
            MessageText::new("   \n\t  ", 5000),
            Err(AnalysisError::InvalidInput { .. })
        ));
    }

    #[test]
    fn rejects_over_length_input() {
        let long = "a".repeat(5001);
        assert!(matches!(
            MessageText::new(&long, 5000),
            Err(AnalysisError::InvalidInput { .. })
        ));
    }

    #[test]
    fn accepts_input_at_the_bound() {
        let text = "a".repeat(5000);
        assert!(MessageText::new(&text, 5000).is_ok());
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        let text = MessageText::new("  URGENT!\n\n  Act   NOW  ", 5000).unwrap();
        assert_eq!(text.normalized(), "urgent! act now");
        assert_eq!(text.original(), "  URGENT!\n\n  Act   NOW  ");
    }

    #[test]
    fn length_bound_counts_characters_not_bytes() {
        let text = "é".repeat(5000);
        assert!(MessageText::new(&text, 5000).is_ok());
    }
}
