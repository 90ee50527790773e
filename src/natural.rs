/// Natural-order string comparison
///
/// Embedded runs of ASCII digits compare by numeric value and text runs
/// compare case-insensitively, so `"item2"` sorts before `"item10"`. Strings
/// that are equal under this rule fall back to plain ordinal comparison,
/// which makes the result a total order that never fails.
///
/// # Examples
///
/// ```
/// use collview::natural::{natural_cmp, ordinal_cmp};
/// use std::cmp::Ordering;
///
/// assert_eq!(natural_cmp("test3", "test100"), Ordering::Less);
/// assert_eq!(ordinal_cmp("test3", "test100"), Ordering::Greater);
/// ```

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk<'a> {
    Text(&'a str),
    Digits(&'a str),
}

/// Splits into alternating text/digit runs, always starting and ending with
/// a (possibly empty) text run, so chunks at equal positions have equal kinds.
fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut rest = s;
    loop {
        let text_end = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        out.push(Chunk::Text(&rest[..text_end]));
        rest = &rest[text_end..];
        if rest.is_empty() {
            break;
        }
        let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        out.push(Chunk::Digits(&rest[..digits_end]));
        rest = &rest[digits_end..];
    }
    out
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Natural-order comparison with ordinal tie-break
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);

    for (x, y) in left.iter().zip(right.iter()) {
        let ord = match (x, y) {
            (Chunk::Text(x), Chunk::Text(y)) => compare_text(x, y),
            (Chunk::Digits(x), Chunk::Digits(y)) => compare_digits(x, y),
            // Positions always agree on kind
            (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Less,
            (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len()
        .cmp(&right.len())
        .then_with(|| ordinal_cmp(a, b))
}

/// Plain code-point comparison
pub fn ordinal_cmp(a: &str, b: &str) -> Ordering {
    a.cmp(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_runs_compare_numerically() {
        assert_eq!(natural_cmp("test3", "test100"), Ordering::Less);
        assert_eq!(natural_cmp("item10", "item2"), Ordering::Greater);
        assert_eq!(natural_cmp("a2b10", "a2b9"), Ordering::Greater);
    }

    #[test]
    fn test_ordinal_differs_on_digit_runs() {
        assert_eq!(ordinal_cmp("test3", "test100"), Ordering::Greater);
    }

    #[test]
    fn test_case_insensitive_text() {
        assert_eq!(natural_cmp("Apple", "banana"), Ordering::Less);
        assert_eq!(ordinal_cmp("Apple", "banana"), Ordering::Less);
        assert_eq!(natural_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(ordinal_cmp("apple", "Banana"), Ordering::Greater);
    }

    #[test]
    fn test_leading_digits_and_zeros() {
        assert_eq!(natural_cmp("2x", "10x"), Ordering::Less);
        assert_eq!(natural_cmp("x", "1"), Ordering::Greater);
        // Equal numerically, resolved ordinally so the order stays total
        assert_eq!(natural_cmp("v01", "v1"), Ordering::Less);
        assert_eq!(natural_cmp("v1", "v1"), Ordering::Equal);
    }

    #[test]
    fn test_huge_digit_runs_do_not_overflow() {
        let big = "n99999999999999999999999999";
        let bigger = "n100000000000000000000000000";
        assert_eq!(natural_cmp(big, bigger), Ordering::Less);
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(natural_cmp("abc", "abc1"), Ordering::Less);
        assert_eq!(natural_cmp("", "a"), Ordering::Less);
    }

    #[test]
    fn test_sorting_a_list() {
        let mut names = vec!["x10", "x9", "X1", "y", "x100"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["X1", "x9", "x10", "x100", "y"]);
    }
}
