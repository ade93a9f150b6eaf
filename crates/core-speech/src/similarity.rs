//! Per-word similarity used by fuzzy phrase matching.
//!
//! Two tokens are similar when any of these hold:
//! 1. they are equal;
//! 2. one is a substring (prefix included) of the other;
//! 3. both are at most [`FUZZY_MAX_TOKEN_LEN`] chars and their edit distance is at most
//!    [`FUZZY_DISTANCE_RATIO`] of the shorter token's length.

/// Longest token (in chars) eligible for the edit-distance check.
pub const FUZZY_MAX_TOKEN_LEN: usize = 7;
/// Allowed edits relative to the shorter token's length.
pub const FUZZY_DISTANCE_RATIO: f64 = 0.3;

pub fn is_similar(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.contains(b) || b.contains(a) {
        return true;
    }
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len.max(b_len) > FUZZY_MAX_TOKEN_LEN {
        return false;
    }
    let bound = (a_len.min(b_len) as f64 * FUZZY_DISTANCE_RATIO).floor() as usize;
    bound > 0 && bounded_levenshtein(a, b, bound).is_some()
}

/// Levenshtein distance between `a` and `b` if it does not exceed `max`.
pub fn bounded_levenshtein(a: &str, b: &str, max: usize) -> Option<usize> {
    if a.chars().count().abs_diff(b.chars().count()) > max {
        return None;
    }
    let distance = strsim::levenshtein(a, b);
    (distance <= max).then_some(distance)
}
