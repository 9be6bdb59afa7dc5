//! Approximate string matching used to turn a mistyped parameter name into a
//! "did you mean" hint.
//!
//! Candidates are compared case-insensitively by Damerau-Levenshtein distance
//! (optimal string alignment). A candidate is only suggested when it lies
//! within [`max_edits`] of the input; ties go to the earliest candidate.

/// Maximum number of edits tolerated for an input of the given length.
fn max_edits(len: usize) -> usize {
    (len / 3).max(1)
}

/// Returns the candidate closest to `input`, if any is close enough.
pub fn suggest<'a, I, S>(input: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    let needle = input.to_lowercase();
    let threshold = max_edits(needle.chars().count());

    let mut best: Option<(usize, &str)> = None;
    for candidate in candidates {
        let candidate = candidate.as_ref();
        let distance = edit_distance(&needle, &candidate.to_lowercase());
        if distance > threshold {
            continue;
        }
        match best {
            Some((best_distance, _)) if best_distance <= distance => {}
            _ => best = Some((distance, candidate)),
        }
    }
    best.map(|(_, candidate)| candidate.to_string())
}

/// Optimal string alignment distance between `a` and `b`.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Three rolling rows: i-2, i-1 and i.
    let width = b.len() + 1;
    let mut two_back: Vec<usize> = vec![0; width];
    let mut previous: Vec<usize> = (0..width).collect();
    let mut current: Vec<usize> = vec![0; width];

    for i in 1..=a.len() {
        current[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut value = (previous[j] + 1)
                .min(current[j - 1] + 1)
                .min(previous[j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                value = value.min(two_back[j - 2] + 1);
            }
            current[j] = value;
        }
        std::mem::swap(&mut two_back, &mut previous);
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances() {
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("beta", "beta"), 0);
        assert_eq!(edit_distance("betta", "beta"), 1);
        assert_eq!(edit_distance("n_dyas", "n_days"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn suggests_closest_key() {
        let keys = ["seed", "n_days", "pop_size", "beta"];
        assert_eq!(suggest("n_dyas", &keys), Some("n_days".to_string()));
        assert_eq!(suggest("SEED", &keys), Some("seed".to_string()));
        assert_eq!(suggest("bta", &keys), Some("beta".to_string()));
    }

    #[test]
    fn no_suggestion_when_too_far() {
        let keys = ["seed", "n_days"];
        assert_eq!(suggest("population", &keys), None);
    }

    #[test]
    fn ties_prefer_first_candidate() {
        let keys = ["r0", "r1"];
        assert_eq!(suggest("r2", &keys), Some("r0".to_string()));
    }
}
