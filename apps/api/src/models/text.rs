//! Deterministic sentence splitting shared by the JD and resume embedding
//! stages (spec §4.5.4).

/// Splits on `.`, `?`, `!` followed by whitespace, trims each piece, and
/// discards anything shorter than `min_chars`. The last sentence in a string
/// with no trailing terminator is still captured.
pub fn split_sentences(text: &str, min_chars: usize) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '?' | '!') {
            if chars.peek().map(|n| n.is_whitespace()).unwrap_or(true) {
                push_if_long_enough(&mut sentences, &current, min_chars);
                current.clear();
            }
        }
    }
    push_if_long_enough(&mut sentences, &current, min_chars);
    sentences
}

fn push_if_long_enough(out: &mut Vec<String>, candidate: &str, min_chars: usize) {
    let trimmed = candidate.trim();
    if trimmed.chars().count() >= min_chars {
        out.push(trimmed.to_string());
    }
}

/// Truncates to roughly `max_chars`, cutting on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_terminators() {
        let out = split_sentences("Led a team of five. Built an API! Is it scalable?", 3);
        assert_eq!(
            out,
            vec![
                "Led a team of five.".to_string(),
                "Built an API!".to_string(),
                "Is it scalable?".to_string(),
            ]
        );
    }

    #[test]
    fn test_discards_short_fragments() {
        let out = split_sentences("Ok. This one is long enough.", 5);
        assert_eq!(out, vec!["This one is long enough.".to_string()]);
    }

    #[test]
    fn test_captures_trailing_fragment_without_terminator() {
        let out = split_sentences("First sentence. trailing fragment", 3);
        assert_eq!(
            out,
            vec!["First sentence.".to_string(), "trailing fragment".to_string()]
        );
    }

    #[test]
    fn test_empty_input_yields_no_sentences() {
        assert!(split_sentences("", 3).is_empty());
        assert!(split_sentences("   ", 3).is_empty());
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        let s = truncate_chars("hello world", 5);
        assert_eq!(s, "hello");
    }
}
