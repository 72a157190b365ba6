use crate::errors::{MutkitError, Result};

/// Number of index-wise differing positions. Only the overlapping prefix is compared.
pub fn hamming_distance(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b.iter()).filter(|(x, y)| x != y).count()
}

/// Sequence and residue numbers must pair up one to one before matching.
pub fn check_aligned(sequence: &[char], res_nums: &[i32]) -> Result<()> {
    if sequence.len() != res_nums.len() {
        return Err(MutkitError::MisalignedSequence {
            sequence: sequence.len(),
            numbers: res_nums.len(),
        });
    }
    Ok(())
}

/// Slide `query` along `sequence` and report every window within `max_mismatches`.
///
/// Returns `(start residue number, end residue number, mismatches)` in scan order.
/// Overlapping windows are all reported. `sequence` and `res_nums` must be index aligned.
pub fn find_matches(
    sequence: &[char],
    res_nums: &[i32],
    query: &[char],
    max_mismatches: usize,
) -> Vec<(i32, i32, usize)> {
    let qlen = query.len();
    if qlen == 0 || sequence.len() < qlen {
        return Vec::new();
    }

    sequence
        .windows(qlen)
        .enumerate()
        .filter_map(|(i, window)| {
            let mismatches = hamming_distance(query, window);
            if mismatches > max_mismatches {
                return None;
            }
            Some((res_nums[i], res_nums[i + qlen - 1], mismatches))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn numbered(s: &str, first: i32) -> (Vec<char>, Vec<i32>) {
        let seq = chars(s);
        let nums = (first..first + seq.len() as i32).collect();
        (seq, nums)
    }

    #[test]
    fn misaligned_numbers_are_rejected() {
        let (seq, nums) = numbered("GFTFSRAS", 31);
        assert!(check_aligned(&seq, &nums).is_ok());
        assert!(matches!(
            check_aligned(&seq, &[31, 32]),
            Err(MutkitError::MisalignedSequence { sequence: 8, numbers: 2 })
        ));
    }

    #[test]
    fn exact_match() {
        let (seq, nums) = numbered("GFTFSRAS", 31);
        assert_eq!(find_matches(&seq, &nums, &chars("GFTF"), 0), vec![(31, 34, 0)]);
    }

    #[test]
    fn single_mismatch_allowed() {
        let (seq, nums) = numbered("GFTFSRAS", 31);
        assert_eq!(find_matches(&seq, &nums, &chars("GFTX"), 1), vec![(31, 34, 1)]);
        assert!(find_matches(&seq, &nums, &chars("GFTX"), 0).is_empty());
    }

    #[test]
    fn query_longer_than_sequence() {
        let (seq, nums) = numbered("GFT", 1);
        assert!(find_matches(&seq, &nums, &chars("GFTFS"), 5).is_empty());
    }

    #[test]
    fn full_budget_accepts_every_window() {
        let (seq, nums) = numbered("MKTAYIAKQRQISFVKSHFSRQ", 1);
        let query = chars("WWWWW");
        let hits = find_matches(&seq, &nums, &query, query.len());
        assert_eq!(hits.len(), seq.len() - query.len() + 1);
        assert!(hits.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn every_substring_is_found_exactly() {
        let (seq, nums) = numbered("ACDEFGHIKL", 10);
        for len in 1..=seq.len() {
            for i in 0..=seq.len() - len {
                let hits = find_matches(&seq, &nums, &seq[i..i + len], 0);
                assert!(hits.contains(&(nums[i], nums[i + len - 1], 0)));
            }
        }
    }

    #[test]
    fn budget_is_monotone() {
        let (seq, nums) = numbered("AAGAAGAAGTTA", 1);
        let query = chars("AAGT");
        let counts: Vec<usize> = (0..=query.len())
            .map(|k| find_matches(&seq, &nums, &query, k).len())
            .collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn overlapping_windows_are_kept() {
        let (seq, nums) = numbered("AAAA", 1);
        assert_eq!(
            find_matches(&seq, &nums, &chars("AA"), 0),
            vec![(1, 2, 0), (2, 3, 0), (3, 4, 0)]
        );
    }

    #[test]
    fn residue_numbers_follow_gaps() {
        let seq = chars("GFTF");
        let nums = vec![52, 52, 53, 60];
        assert_eq!(find_matches(&seq, &nums, &chars("FTF"), 0), vec![(52, 60, 0)]);
    }
}
