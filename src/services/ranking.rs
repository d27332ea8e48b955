//! Competition ranking ("1224"): equal totals share a rank and the next
//! distinct total skips the shared places.

/// Ranks for `totals`, which must already be sorted best first.
pub(crate) fn competition_ranks(totals: &[f64]) -> Vec<usize> {
    let mut ranks = Vec::with_capacity(totals.len());
    let mut previous: Option<f64> = None;
    let mut current_rank = 0;

    for (position, total) in totals.iter().copied().enumerate() {
        if previous != Some(total) {
            current_rank = position + 1;
            previous = Some(total);
        }
        ranks.push(current_rank);
    }

    ranks
}
