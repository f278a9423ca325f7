//! String helpers for error hints.
//!
//! Query attributes are usually single letters, so the matching here is
//! tuned for very short names: a misspelled ordering entry such as `"bb"`
//! should still point at `"b"`.

/// Edit distance between two strings (insertions, deletions, substitutions).
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Largest edit distance still worth suggesting for a query of this length.
fn max_distance(len: usize) -> usize {
    match len {
        0..=2 => 1,
        3..=5 => 2,
        _ => 3,
    }
}

/// Finds the candidate closest to `query`, if any is close enough.
///
/// Ties keep the earliest candidate, so callers that pass names in query
/// order get a stable suggestion.
///
/// # Examples
///
/// ```
/// use vfengine_common::utils::strings::find_similar;
///
/// let known = ["a", "b", "src"];
/// assert_eq!(find_similar("sr", &known), Some("src"));
/// assert_eq!(find_similar("zzzz", &known), None);
/// ```
pub fn find_similar<'a, S: AsRef<str>>(query: &str, candidates: &'a [S]) -> Option<&'a str> {
    let mut best: Option<(&str, usize)> = None;
    for candidate in candidates {
        let candidate = candidate.as_ref();
        if candidate == query {
            return Some(candidate);
        }
        let distance = edit_distance(query, candidate);
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((candidate, distance));
        }
    }
    best.filter(|&(_, d)| d <= max_distance(query.chars().count()))
        .map(|(name, _)| name)
}

/// Formats a suggestion hint for error messages.
///
/// ```
/// use vfengine_common::utils::strings::format_suggestion;
///
/// assert_eq!(format_suggestion("b"), "Did you mean 'b'?");
/// ```
#[must_use]
pub fn format_suggestion(suggestion: &str) -> String {
    format!("Did you mean '{suggestion}'?")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("b", "b"), 0);
        assert_eq!(edit_distance("bb", "b"), 1);
    }

    #[test]
    fn test_find_similar_short_names() {
        let known = ["a", "b", "c"];
        assert_eq!(find_similar("bb", &known), Some("b"));
        assert_eq!(find_similar("b", &known), Some("b"));
        assert_eq!(find_similar("xyz", &known), None);
    }

    #[test]
    fn test_find_similar_prefers_first_on_tie() {
        let known = ["ab", "ac"];
        assert_eq!(find_similar("a", &known), Some("ab"));
    }

    #[test]
    fn test_find_similar_empty_candidates() {
        let known: [&str; 0] = [];
        assert_eq!(find_similar("a", &known), None);
    }
}
