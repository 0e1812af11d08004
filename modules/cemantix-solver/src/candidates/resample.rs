use rand::Rng;

/// Randomly thin a ranked list. Element `i` of `n` survives with probability
/// `(n - i) / n * retention`, so higher-ranked items are kept more often.
pub fn resample<T: Clone, R: Rng>(items: &[T], retention: f64, rng: &mut R) -> Vec<T> {
    let n = items.len();
    items
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let weight = (n - i) as f64 / n as f64;
            rng.random::<f64>() < weight * retention
        })
        .map(|(_, item)| item.clone())
        .collect()
}
