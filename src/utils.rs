//! Utility methods
use std::ops::RangeInclusive;

/// Groups positions into runs of consecutive positions
///
/// The positions are sorted and deduplicated first.
///
/// # Examples
/// ```
/// use mutation_weights::utils::contiguous_blocks;
///
/// let blocks = contiguous_blocks([7, 1, 2, 3, 9, 8, 2, 20]);
/// assert_eq!(blocks, vec![1..=3, 7..=9, 20..=20]);
///
/// assert!(contiguous_blocks(Vec::new()).is_empty());
/// ```
pub fn contiguous_blocks<I: IntoIterator<Item = u64>>(positions: I) -> Vec<RangeInclusive<u64>> {
    let mut positions: Vec<u64> = positions.into_iter().collect();
    positions.sort_unstable();
    positions.dedup();

    let mut blocks: Vec<RangeInclusive<u64>> = Vec::new();
    for pos in positions {
        match blocks.last_mut() {
            Some(block) if *block.end() + 1 == pos => *block = *block.start()..=pos,
            _ => blocks.push(pos..=pos),
        }
    }
    blocks
}

/// We have to frequently do divisions starting with u64 values
/// and need to return f64 values. To ensure some kind of safety
/// we use this method to panic in case of overflows.
///
/// # Panics
///
/// If `n` is larger than `u32::MAX`
pub fn f64_from_u64(n: u64) -> f64 {
    let intermediate: u32 = n
        .try_into()
        .expect("cannot safely create f64 from large u64");
    intermediate.into()
}

/// Same as [`f64_from_u64`], for counts of items
///
/// # Panics
///
/// If `n` is larger than `u32::MAX`
pub fn f64_from_usize(n: usize) -> f64 {
    let intermediate: u32 = n
        .try_into()
        .expect("cannot safely create f64 from large usize");
    intermediate.into()
}

/// Truncates a non-negative float to an integer count
///
/// Negative and `NaN` values give 0, values that are too large saturate.
///
/// ```
/// use mutation_weights::utils::u64_from_f64;
///
/// assert_eq!(u64_from_f64(12.9), 12);
/// assert_eq!(u64_from_f64(-1.5), 0);
/// assert_eq!(u64_from_f64(f64::NAN), 0);
/// ```
pub fn u64_from_f64(x: f64) -> u64 {
    // float to int casts truncate and saturate
    x.trunc() as u64
}
