//! Shared utility functions for token estimation and text budgeting.

// =============================================================================
// Token Estimation
// =============================================================================

/// Token estimation configuration for different content types
#[derive(Debug, Clone, Copy)]
pub struct TokenEstimator {
    /// Characters per token for ASCII text (default: 4.0)
    pub ascii_chars_per_token: f32,
    /// Characters per token for non-ASCII text (default: 1.5)
    pub non_ascii_chars_per_token: f32,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self {
            ascii_chars_per_token: 4.0,
            non_ascii_chars_per_token: 1.5,
        }
    }
}

impl TokenEstimator {
    /// Estimate token count for content
    pub fn estimate(&self, content: &str) -> usize {
        if content.is_empty() {
            return 0;
        }

        let (ascii_chars, non_ascii_chars) =
            content.chars().fold((0usize, 0usize), |(a, n), c| {
                if c.is_ascii() { (a + 1, n) } else { (a, n + 1) }
            });

        let ascii_tokens = (ascii_chars as f32 / self.ascii_chars_per_token).ceil() as usize;
        let non_ascii_tokens =
            (non_ascii_chars as f32 / self.non_ascii_chars_per_token).ceil() as usize;

        ascii_tokens + non_ascii_tokens
    }
}

/// Estimate token count from content (convenience function)
#[inline]
pub fn estimate_tokens(content: &str) -> usize {
    TokenEstimator::default().estimate(content)
}

/// Keep the end of `content` so that it fits within `max_tokens`.
///
/// Cuts at a paragraph or line boundary when one exists inside the kept
/// window; always cuts on a char boundary.
pub fn tail_to_token_limit(content: &str, max_tokens: usize) -> &str {
    if estimate_tokens(content) <= max_tokens {
        return content;
    }

    let max_chars = max_tokens * 4;
    let start = content
        .char_indices()
        .rev()
        .nth(max_chars.saturating_sub(1))
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let window = &content[start..];

    if let Some(pos) = window.find("\n\n") {
        return &window[pos + 2..];
    }
    if let Some(pos) = window.find('\n') {
        return &window[pos + 1..];
    }
    window
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_empty() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_estimate_tokens_ascii() {
        let result = estimate_tokens("hello world!");
        assert_eq!(result, 3);
    }

    #[test]
    fn test_estimate_tokens_non_ascii() {
        let welsh = estimate_tokens("ŵŷâ");
        assert_eq!(welsh, 2);
    }

    #[test]
    fn test_tail_no_truncation() {
        let content = "Short content.";
        assert_eq!(tail_to_token_limit(content, 1000), content);
    }

    #[test]
    fn test_tail_cuts_at_paragraph() {
        let content = "First paragraph is rather long.\n\nSecond.\n\nThird.";
        let tail = tail_to_token_limit(content, 5);
        assert!(content.ends_with(tail));
        assert!(!tail.contains("First"));
        assert!(tail.ends_with("Third."));
    }

    #[test]
    fn test_tail_respects_char_boundaries() {
        let content = "é".repeat(100);
        let tail = tail_to_token_limit(&content, 3);
        assert!(tail.chars().all(|c| c == 'é'));
        assert!(!tail.is_empty());
    }
}
