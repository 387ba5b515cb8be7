//! Binary classification metrics

/// Area under the ROC curve from the rank-sum statistic.
///
/// Tied scores share their average rank. `None` when either class is absent
/// or the inputs disagree in length.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Option<f64> {
    if labels.len() != scores.len() {
        return None;
    }
    let positives = labels.iter().filter(|&&label| label == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        // 1-based ranks start..=end share their mean
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for &index in &order[start..=end] {
            ranks[index] = rank;
        }
        start = end + 1;
    }

    let positive_rank_sum: f64 = labels
        .iter()
        .zip(ranks.iter())
        .filter(|(&label, _)| label == 1)
        .map(|(_, &rank)| rank)
        .sum();

    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Mean binary cross-entropy, probabilities clamped to avoid infinities
pub fn log_loss(labels: &[u8], probabilities: &[f64]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let total: f64 = labels
        .iter()
        .zip(probabilities.iter())
        .map(|(&label, &p)| {
            let p = p.clamp(1e-15, 1.0 - 1e-15);
            if label == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / labels.len() as f64
}

/// Percent of rows classified correctly at `threshold`
pub fn accuracy(labels: &[u8], probabilities: &[f64], threshold: f64) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = labels
        .iter()
        .zip(probabilities.iter())
        .filter(|(&label, &p)| (p >= threshold) == (label == 1))
        .count();
    correct as f64 / labels.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_ranking() {
        let labels = [0, 0, 1, 1];
        let scores = [0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&labels, &scores), Some(1.0));
    }

    #[test]
    fn test_inverted_ranking() {
        let labels = [1, 1, 0, 0];
        let scores = [0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&labels, &scores), Some(0.0));
    }

    #[test]
    fn test_constant_scores() {
        let labels = [0, 1, 0, 1, 1];
        let scores = [0.5; 5];
        assert_eq!(roc_auc(&labels, &scores), Some(0.5));
    }

    #[test]
    fn test_partial_ranking() {
        // pairs (pos, neg): (0.35 vs 0.1 ok), (0.35 vs 0.4 wrong), (0.8 vs both ok)
        let labels = [0, 1, 0, 1];
        let scores = [0.1, 0.35, 0.4, 0.8];
        assert_eq!(roc_auc(&labels, &scores), Some(0.75));
    }

    #[test]
    fn test_single_class_has_no_auc() {
        assert_eq!(roc_auc(&[1, 1], &[0.2, 0.3]), None);
        assert_eq!(roc_auc(&[0, 1], &[0.2]), None);
    }

    #[test]
    fn test_log_loss_and_accuracy() {
        let labels = [0, 1];
        let probabilities = [0.2, 0.9];
        let expected = (-(0.8f64).ln() - (0.9f64).ln()) / 2.0;
        assert!((log_loss(&labels, &probabilities) - expected).abs() < 1e-12);
        assert_eq!(accuracy(&labels, &probabilities, 0.5), 100.0);
        assert_eq!(accuracy(&labels, &[0.6, 0.4], 0.5), 0.0);
    }
}
