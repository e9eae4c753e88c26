//! Glob matching for key scans.
//!
//! Patterns support `*` (any run of characters, including empty) and `?`
//! (exactly one character); everything else matches literally. This is the
//! subset of Redis `MATCH` syntax the engine relies on -- identifiers and
//! relationship names are validated to never contain the metacharacters, so
//! patterns built from them cannot over-match.

/// Whether `key` matches the glob `pattern`.
///
/// # Examples
///
/// ```
/// use lattice_store::key_matches;
///
/// assert!(key_matches("customer:*:object", "customer:c1:object"));
/// assert!(!key_matches("customer:*:object", "customer:c1:settings"));
/// assert!(key_matches("v?", "v1"));
/// ```
pub fn key_matches(pattern: &str, key: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = key.chars().collect();

    // Two-pointer match with single-level backtracking for `*`.
    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while t < txt.len() {
        if p < pat.len() && (pat[p] == '?' || pat[p] == txt[t]) {
            p += 1;
            t += 1;
        } else if p < pat.len() && pat[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            // Let the last `*` swallow one more character and retry.
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    // Remaining pattern must be all `*`.
    pat[p..].iter().all(|&c| c == '*')
}
