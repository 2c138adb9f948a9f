//! Token-level symmetric name similarity
//!
//! Pairwise token similarity is Sørensen–Dice bigram overlap rather than
//! edit distance: partial substring overlap should score well even across
//! transliteration differences. The overall measure is symmetric and
//! order-independent across tokens, so "John Doe" and "Doe, John" match.

use strsim::sorensen_dice;

/// Symmetric token similarity between two strings, in [0.0, 1.0]
///
/// Each query token takes its best Dice similarity against all candidate
/// tokens; the per-token maxima are averaged to a directional score. The
/// final score is the greater of the two directional averages.
pub fn token_similarity(a: &str, b: &str) -> f64 {
    let a_tokens = tokenize(a);
    let b_tokens = tokenize(b);
    if a_tokens.is_empty() || b_tokens.is_empty() {
        return 0.0;
    }

    let forward = directional_average(&a_tokens, &b_tokens);
    let backward = directional_average(&b_tokens, &a_tokens);
    forward.max(backward)
}

/// Token similarity as a percentage with two-decimal precision
pub fn similarity_percentage(a: &str, b: &str) -> f64 {
    (token_similarity(a, b) * 10_000.0).round() / 100.0
}

/// Average of each `from` token's best match among `to` tokens
pub(crate) fn directional_average(from: &[String], to: &[String]) -> f64 {
    let total: f64 = from
        .iter()
        .map(|f| {
            to.iter()
                .map(|t| sorensen_dice(f, t))
                .fold(0.0, f64::max)
        })
        .sum();
    total / from.len() as f64
}

/// Split on whitespace and normalize each token: lowercase, alphanumeric only
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| {
            token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(|c| c.to_lowercase())
                .collect::<String>()
        })
        .filter(|token| !token.is_empty())
        .collect()
}
