use crate::estimator::TokenEstimator;

/// Longest prefix of `text` whose estimate is `<= max_tokens`.
///
/// Cuts on a character boundary with no regard for words or sentences.
/// Returns `text` unchanged when it already fits, and `""` for whitespace-only
/// input or when not even a single character fits.
pub fn trim_to_token_limit<'a>(
    estimator: &dyn TokenEstimator,
    text: &'a str,
    max_tokens: usize,
) -> &'a str {
    if text.trim().is_empty() {
        return "";
    }
    if estimator.estimate_tokens(text) <= max_tokens {
        return text;
    }

    // ends[k - 1] is the byte offset just past the k-th character.
    let ends: Vec<usize> = text
        .char_indices()
        .skip(1)
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();

    let mut lo = 1usize;
    let mut hi = ends.len();
    let mut best = "";

    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let candidate = &text[..ends[mid - 1]];
        if estimator.estimate_tokens(candidate) <= max_tokens {
            best = candidate;
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }

    best
}
