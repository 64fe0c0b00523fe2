//! Fuzzy series folder resolution.
//!
//! Maps a parsed series title onto an existing library folder so that
//! minor punctuation, spacing or typo differences between a release name
//! and a previously created folder do not spawn a second folder for the
//! same series.

use tracing::debug;

/// Maximum normalized edit distance at which an existing folder is
/// considered the same series.
const MATCH_THRESHOLD: f64 = 0.125;

/// Pick the library folder name for `candidate`.
///
/// Compares the punctuation-stripped, lowercased candidate against every
/// existing folder name using normalized Damerau-Levenshtein distance.
/// A match strictly below the threshold returns the existing folder's
/// original name (first minimum wins); otherwise the candidate is
/// returned title-cased.
pub fn resolve_series(candidate: &str, existing: &[String]) -> String {
    let candidate = title_case(candidate);
    let key = comparison_key(&candidate);

    let mut min_distance = 1.0_f64;
    let mut min_name: Option<&str> = None;

    for name in existing {
        let distance = normalized_distance(&key, &comparison_key(name));
        if distance < min_distance {
            min_distance = distance;
            min_name = Some(name);
        }
    }

    if let Some(name) = min_name {
        debug!("Closest series match ({:.3}): {}", min_distance, name);
        if min_distance < MATCH_THRESHOLD {
            return name.to_string();
        }
    }

    candidate
}

/// Strip punctuation and lowercase, producing the comparison form.
pub fn comparison_key(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .to_lowercase()
}

/// Edit distance divided by the longer string's length, in [0, 1].
/// Two empty strings are identical (0.0).
pub fn normalized_distance(a: &str, b: &str) -> f64 {
    let longer = a.chars().count().max(b.chars().count());
    if longer == 0 {
        return 0.0;
    }
    damerau_levenshtein(a, b) as f64 / longer as f64
}

/// Damerau-Levenshtein distance: Levenshtein plus adjacent transposition.
fn damerau_levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut dp = vec![vec![0usize; n + 1]; m + 1];

    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=n {
        dp[0][j] = j;
    }

    for i in 1..=m {
        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);

            if i > 1
                && j > 1
                && a_chars[i - 1] == b_chars[j - 2]
                && a_chars[i - 2] == b_chars[j - 1]
            {
                dp[i][j] = dp[i][j].min(dp[i - 2][j - 2] + 1);
            }
        }
    }

    dp[m][n]
}

/// Uppercase the first letter of each word, lowercasing the rest.
/// Small connector words stay lowercase except at the start.
pub fn title_case(s: &str) -> String {
    const SMALL_WORDS: &[&str] = &["a", "an", "and", "in", "of", "on", "or", "the", "to"];

    s.split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_lowercase();
            if i > 0 && SMALL_WORDS.contains(&lower.as_str()) {
                lower
            } else {
                let mut chars = lower.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
