//! Token normalization shared by live speech and script lines.
//!
//! Lowercase everything, map every char other than letters, digits, apostrophe and hyphen
//! to a separator, then split on whitespace. Empty tokens never appear in the output.

/// Normalize `text` into comparable word tokens.
pub fn normalize_tokens(text: &str) -> Vec<String> {
    let mapped: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if is_token_char(c) { c } else { ' ' })
        .collect();
    mapped.split_whitespace().map(str::to_owned).collect()
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\'' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lowercases_and_splits_on_punctuation() {
        assert_eq!(
            normalize_tokens("Hello, World! It's a well-known fact."),
            vec!["hello", "world", "it's", "a", "well-known", "fact"]
        );
    }

    #[test]
    fn punctuation_only_input_has_no_tokens() {
        assert!(normalize_tokens(" ,.;: ").is_empty());
        // Hyphens are token chars, so a bare dash run survives.
        assert_eq!(normalize_tokens("... !? --"), vec!["--"]);
    }

    #[test]
    fn digits_survive() {
        assert_eq!(normalize_tokens("Chapter 12:3"), vec!["chapter", "12", "3"]);
        assert_eq!(normalize_tokens("  spaced   out  "), vec!["spaced", "out"]);
    }
}
