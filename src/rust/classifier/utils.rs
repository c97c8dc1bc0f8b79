use std::cmp::Ordering;

/// Sort key that puts NaN at the bottom.
fn rank_key(probability: f32) -> f32 {
    if probability.is_nan() {
        f32::NEG_INFINITY
    } else {
        probability
    }
}

/// Pairs each taxonomy position with its probability and sorts descending.
///
/// The sort is stable, so equal probabilities keep taxonomy order. NaN outputs
/// keep their value but rank last.
pub(crate) fn rank_positions(probabilities: &[f32], positions: &[usize]) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = positions
        .iter()
        .map(|&p| (p, probabilities[p]))
        .collect();
    ranked.sort_by(|a, b| {
        let order = rank_key(b.1)
            .partial_cmp(&rank_key(a.1))
            .unwrap_or(Ordering::Equal);
        // Negative infinity still ranks above NaN
        order.then_with(|| a.1.is_nan().cmp(&b.1.is_nan()))
    });
    ranked
}
