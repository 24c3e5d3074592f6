//! Number-aware string ordering, so that `img2` sorts before `img10`.

use std::cmp::Ordering;

/// Split into alternating digit and non-digit runs.
fn chunks(s: &str) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Compare two strings treating runs of digits as numbers and letters case-insensitively.
///
/// Ties (e.g. `a01` vs `a1`) fall back to plain byte order so the result is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let x_num = x.starts_with(|c: char| c.is_ascii_digit());
                let y_num = y.starts_with(|c: char| c.is_ascii_digit());
                let ord = match (x_num, y_num) {
                    (true, true) => compare_numbers(x, y),
                    _ => compare_text(x, y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_compare_by_value() {
        let mut names = vec!["img10.png", "img2.png", "img1.png", "img02b.png"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, ["img1.png", "img2.png", "img02b.png", "img10.png"]);
    }

    #[test]
    fn test_case_insensitive_text() {
        assert_eq!(natural_cmp("Beta", "alpha"), Ordering::Greater);
        assert_eq!(natural_cmp("frame", "Frame"), "frame".cmp("Frame"));
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(natural_cmp("shot", "shot_1"), Ordering::Less);
        assert_eq!(natural_cmp("", "a"), Ordering::Less);
    }

    #[test]
    fn test_leading_zeros_tie_break() {
        assert_eq!(natural_cmp("a01", "a1"), "a01".cmp("a1"));
        assert_eq!(natural_cmp("a1", "a1"), Ordering::Equal);
    }

    #[test]
    fn test_large_numbers_do_not_overflow() {
        assert_eq!(
            natural_cmp("x99999999999999999999999", "x100000000000000000000000"),
            Ordering::Less
        );
    }
}
