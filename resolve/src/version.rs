use std::cmp::Ordering;
use std::fmt;

/// A dotted version number, e.g. the `2.34` in `GLIBC_2.34`.
///
/// Extracted from any string by taking the longest run of digits and dots;
/// an empty extraction is represented as an empty component list and is
/// falsy. Ordering is a full total order: equal-length sequences compare
/// component-wise, and when one sequence is a strict prefix of the other
/// the shorter one is less (matching the convention recorded in DESIGN.md
/// for the spec's open total-order question).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Version(Vec<u64>);

impl Version {
    /// Parse the first `\d+(\.\d+)+` run found in `s`.
    pub fn parse(s: &str) -> Self {
        let bytes = s.as_bytes();
        let mut best: Option<(usize, usize)> = None;
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i].is_ascii_digit() {
                let start = i;
                let mut has_dot = false;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    has_dot |= bytes[i] == b'.';
                    i += 1;
                }
                // Trim a trailing dot that isn't followed by a digit.
                let mut end = i;
                while end > start && bytes[end - 1] == b'.' {
                    end -= 1;
                }
                if has_dot && end > start {
                    let len = end - start;
                    if best.is_none_or(|(_, best_len)| len > best_len) {
                        best = Some((start, len));
                    }
                }
            } else {
                i += 1;
            }
        }
        let Some((start, len)) = best else {
            return Self(Vec::new());
        };
        let run = &s[start..start + len];
        let components = run
            .split('.')
            .filter_map(|part| part.parse::<u64>().ok())
            .collect();
        Self(components)
    }

    /// `true` iff at least one component was extracted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first component, if any.
    pub fn major(&self) -> Option<u64> {
        self.0.first().copied()
    }

    /// The second component, if any.
    pub fn minor(&self) -> Option<u64> {
        self.0.get(1).copied()
    }

    /// The third component, if any.
    pub fn patch(&self) -> Option<u64> {
        self.0.get(2).copied()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                ordering => return ordering,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_version() {
        assert_eq!(Version(vec![2, 34]), Version::parse("GLIBC_2.34"));
    }

    #[test]
    fn non_numeric_string_is_empty_and_falsy() {
        let v = Version::parse("abc");
        assert!(v.is_empty());
    }

    #[test]
    fn skips_leading_non_dotted_run() {
        assert_eq!(Version(vec![3, 4, 0]), Version::parse("v3.4.0-rc1"));
    }

    #[test]
    fn ordering_is_total_and_irreflexive() {
        let a = Version::parse("2.31");
        let b = Version::parse("2.34");
        assert!(a < b);
        assert!(!(a > a));
        assert_eq!(Ordering::Equal, a.cmp(&a));
    }

    #[test]
    fn shorter_prefix_is_less() {
        let short = Version::parse("2.34");
        let long = Version::parse("2.34.1");
        assert!(short < long);
    }

    #[test]
    fn major_minor_patch_positions() {
        let v = Version::parse("2.34.5");
        assert_eq!(Some(2), v.major());
        assert_eq!(Some(34), v.minor());
        assert_eq!(Some(5), v.patch());
    }
}
