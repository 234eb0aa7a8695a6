/// Classic Levenshtein edit distance over arbitrary comparable units.
///
/// Returns the minimum number of single-unit insertions, deletions, or
/// substitutions needed to transform `s1` into `s2`. Computed with the
/// standard O(len(s1) * len(s2)) dynamic-programming table; only two rows
/// are kept live at a time.
///
/// Pure and deterministic. Empty inputs are valid and yield the length of
/// the other sequence.
pub fn edit_distance<T: PartialEq>(s1: &[T], s2: &[T]) -> usize {
    if s1.is_empty() {
        return s2.len();
    }
    if s2.is_empty() {
        return s1.len();
    }

    // prev_row holds dp[i-1][..], curr_row is dp[i][..] being filled in.
    let mut prev_row: Vec<usize> = (0..=s2.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; s2.len() + 1];

    for (i, unit_a) in s1.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, unit_b) in s2.iter().enumerate() {
            let cost = usize::from(unit_a != unit_b);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[s2.len()]
}

/// Convenience wrapper for byte-string callers.
pub fn edit_distance_bytes(s1: &[u8], s2: &[u8]) -> usize {
    edit_distance(s1, s2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_have_zero_distance() {
        assert_eq!(edit_distance_bytes(b"", b""), 0);
        assert_eq!(edit_distance_bytes(b"a", b"a"), 0);
        assert_eq!(
            edit_distance_bytes(b"GET / HTTP/1.1\r\n", b"GET / HTTP/1.1\r\n"),
            0
        );
    }

    #[test]
    fn empty_input_yields_other_length() {
        assert_eq!(edit_distance_bytes(b"", b"kitten"), 6);
        assert_eq!(edit_distance_bytes(b"kitten", b""), 6);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs: &[(&[u8], &[u8])] = &[
            (b"kitten", b"sitting"),
            (b"flaw", b"lawn"),
            (b"GET / HTTP/1.1", b"GET /index HTTP/1.0"),
            (b"", b"x"),
        ];
        for (a, b) in pairs {
            assert_eq!(edit_distance_bytes(a, b), edit_distance_bytes(b, a));
        }
    }

    #[test]
    fn known_distances() {
        assert_eq!(edit_distance_bytes(b"kitten", b"sitting"), 3);
        assert_eq!(edit_distance_bytes(b"flaw", b"lawn"), 2);
        assert_eq!(edit_distance_bytes(b"abc", b"abd"), 1);
    }

    #[test]
    fn works_over_non_byte_units() {
        let a = ['h', 'o', 's', 't'];
        let b = ['h', 'o', 's', 't', 's'];
        assert_eq!(edit_distance(&a, &b), 1);
    }
}
